//! Tracker operations
//!
//! Each operation reads the caller's last stored state, computes the next
//! state with the domain functions from `crowns-common`, and writes it back
//! as a full overwrite. The private copy is always written first; the public
//! mirror is a second, independent write that only happens while the
//! profile is public. If the mirror write fails after the private write
//! succeeded the two copies diverge until the next successful save.

use crowns_common::csv_codec::{decode_text, export_file_name, CsvCodec, TextEncoding};
use crowns_common::reconcile::{reconcile, ImportReport};
use crowns_common::record::{Collection, Crown, Record};
use crowns_common::store::{CrownDocument, CrownStore, Namespace, ProfileEntry, PublicProfile};
use crowns_common::{Error, Identity, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// File name recorded for collections seeded from the template
pub const TEMPLATE_FILE_NAME: &str = "template.csv";

#[derive(Clone)]
pub struct Tracker {
    store: Arc<dyn CrownStore>,
    codec: CsvCodec,
    template_path: Option<PathBuf>,
}

/// Private document as loaded for display
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub document: CrownDocument,
    /// The store could not be read and an empty collection stands in
    pub degraded: bool,
}

#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub document: CrownDocument,
    pub report: ImportReport,
}

/// What another user sees when opening someone's public progress
#[derive(Debug, Clone)]
pub enum PublicView {
    /// No such profile, or not published
    Unavailable,
    /// Published profile without any mirrored rows yet
    Empty { profile: PublicProfile },
    Available {
        profile: PublicProfile,
        rows: Collection,
    },
}

impl Tracker {
    pub fn new(store: Arc<dyn CrownStore>) -> Self {
        Self {
            store,
            codec: CsvCodec::default(),
            template_path: None,
        }
    }

    /// Use other header labels for import, export and the template
    pub fn with_codec(mut self, codec: CsvCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_template(mut self, template_path: Option<PathBuf>) -> Self {
        self.template_path = template_path;
        self
    }

    /// Create the user's private document on first use
    ///
    /// The new collection is seeded from the template table with every
    /// crown cleared. A missing or malformed template yields an empty
    /// document instead.
    pub async fn ensure_user_document(&self, uid: &str) -> Result<()> {
        if self.store.load_document(uid, Namespace::Private).await?.is_some() {
            return Ok(());
        }

        let mut doc = match self.seed_from_template().await {
            Ok(rows) => CrownDocument::new(rows, TEMPLATE_FILE_NAME),
            Err(e) => {
                warn!("Seeding new collection for {} failed: {}", uid, e);
                CrownDocument::new(Collection::new(), "")
            }
        };

        doc.created_at = doc.updated_at;
        self.store.save_document(uid, Namespace::Private, &doc).await?;
        info!("Created collection for {} with {} records", uid, doc.rows.len());
        Ok(())
    }

    async fn seed_from_template(&self) -> Result<Collection> {
        let path = self
            .template_path
            .as_ref()
            .ok_or_else(|| Error::Config("no template configured".to_string()))?;
        let bytes = tokio::fs::read(path).await?;
        let text = decode_text(&bytes, TextEncoding::Auto)?;
        let rows = self
            .codec
            .decode(&text)?
            .into_iter()
            .enumerate()
            .map(|(i, c)| Record::new(c.name, i, false, false));
        Ok(Collection::from_records(rows))
    }

    /// Whether the store currently answers
    pub async fn store_ready(&self) -> bool {
        match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Store health check failed: {}", e);
                false
            }
        }
    }

    /// Private document for display; read failures degrade to empty
    pub async fn load_for_display(&self, uid: &str) -> LoadedDocument {
        match self.store.load_document(uid, Namespace::Private).await {
            Ok(Some(document)) => LoadedDocument {
                document,
                degraded: false,
            },
            Ok(None) => LoadedDocument {
                document: CrownDocument::default(),
                degraded: false,
            },
            Err(e) => {
                warn!("Loading collection for {} failed, showing empty: {}", uid, e);
                LoadedDocument {
                    document: CrownDocument::default(),
                    degraded: true,
                }
            }
        }
    }

    /// Public flag for display; read failures degrade to private
    pub async fn is_public(&self, uid: &str) -> bool {
        match self.store.load_profile(uid).await {
            Ok(profile) => profile.is_some_and(|p| p.is_public),
            Err(e) => {
                warn!("Loading public flag for {} failed: {}", uid, e);
                false
            }
        }
    }

    async fn load_strict(&self, uid: &str) -> Result<CrownDocument> {
        Ok(self
            .store
            .load_document(uid, Namespace::Private)
            .await?
            .unwrap_or_default())
    }

    async fn persist(&self, uid: &str, doc: &CrownDocument) -> Result<()> {
        self.store.save_document(uid, Namespace::Private, doc).await?;

        if self.store.load_profile(uid).await?.is_some_and(|p| p.is_public) {
            self.store
                .save_document(uid, Namespace::Public, doc)
                .await
                .inspect_err(|e| {
                    warn!("Private copy for {} saved but public mirror failed: {}", uid, e);
                })?;
        }
        Ok(())
    }

    /// Replace the collection with an uploaded table, keeping known progress
    ///
    /// Nothing is written when the table cannot be decoded.
    pub async fn import(
        &self,
        uid: &str,
        bytes: &[u8],
        file_name: &str,
        encoding: TextEncoding,
    ) -> Result<ImportOutcome> {
        let text = decode_text(bytes, encoding)?;
        let decoded = self.codec.decode(&text)?;

        let existing = self.load_strict(uid).await?;
        let (rows, report) = reconcile(&decoded, &existing.rows);

        let mut document = CrownDocument::new(rows, file_name);
        document.created_at = existing.created_at;
        self.persist(uid, &document).await?;

        info!(
            uid,
            file_name,
            total = report.total,
            matched = report.matched,
            added = report.added,
            dropped = report.dropped,
            "Imported collection"
        );
        Ok(ImportOutcome { document, report })
    }

    /// Flip one crown and save; unknown ids change nothing
    pub async fn toggle(&self, uid: &str, id: &str, crown: Crown) -> Result<Record> {
        let mut document = self.load_strict(uid).await?;
        document
            .rows
            .toggle(id, crown)
            .ok_or_else(|| Error::NotFound(format!("record {}", id)))?;

        let record = document
            .rows
            .find(id)
            .cloned()
            .ok_or_else(|| Error::Internal(format!("record {} vanished after toggle", id)))?;

        let mut next = CrownDocument::new(document.rows, document.file_name);
        next.created_at = document.created_at;
        self.persist(uid, &next).await?;
        Ok(record)
    }

    /// Publish or hide the user's progress
    ///
    /// The profile is written first. Enabling also uploads the current
    /// collection to the public namespace; disabling leaves the old mirror
    /// in place, unreadable while the profile stays private.
    pub async fn set_public(&self, identity: &Identity, is_public: bool) -> Result<PublicProfile> {
        let profile = PublicProfile::from_identity(identity, is_public);
        self.store.save_profile(&identity.uid, &profile).await?;

        if is_public {
            let current = self.load_strict(&identity.uid).await?;
            let mirror = CrownDocument::new(current.rows, current.file_name);
            self.store
                .save_document(&identity.uid, Namespace::Public, &mirror)
                .await?;
        }

        info!(uid = identity.uid.as_str(), is_public, "Updated public profile");
        Ok(profile)
    }

    /// Table text and suggested file name for download
    pub async fn export(&self, uid: &str) -> Result<(String, String)> {
        let document = self.load_strict(uid).await?;
        let body = self.codec.encode(&document.rows);
        Ok((export_file_name(&document.file_name), body))
    }

    pub async fn list_public(&self) -> Result<Vec<ProfileEntry>> {
        self.store.list_public_profiles().await
    }

    pub async fn public_view(&self, uid: &str) -> Result<PublicView> {
        let profile = match self.store.load_profile(uid).await? {
            Some(profile) if profile.is_public => profile,
            _ => return Ok(PublicView::Unavailable),
        };

        let rows = self
            .store
            .load_document(uid, Namespace::Public)
            .await?
            .map(|doc| doc.rows)
            .unwrap_or_default();

        if rows.is_empty() {
            Ok(PublicView::Empty { profile })
        } else {
            Ok(PublicView::Available { profile, rows })
        }
    }
}
