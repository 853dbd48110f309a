//! Per-user document persistence
//!
//! Two document kinds are stored per user:
//! - a crown document `{rows, fileName, createdAt, updatedAt}`, kept once in
//!   the private namespace and optionally mirrored to the public namespace
//! - a public profile `{isPublic, displayName, email, photoURL, updatedAt}`
//!
//! Documents are schema-on-read: every field has a default, so anything an
//! older writer left behind still decodes into a valid value. Writes are
//! unconditional overwrites (last write wins).

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::csv_codec::is_truthy_value;
use crate::identity::Identity;
use crate::record::{derive_id, Collection, Record};
use crate::time::now_millis;
use crate::Result;

mod memory;
#[cfg(feature = "sqlx")]
pub mod sqlite;

pub use memory::MemoryStore;
#[cfg(feature = "sqlx")]
pub use sqlite::SqliteStore;

/// Version written into every new document
pub const SCHEMA_VERSION: u32 = 1;

/// Where a crown document lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Owner-only copy
    Private,
    /// Read-only mirror visible to other users while the profile is public
    Public,
}

impl Namespace {
    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Private => "private",
            Namespace::Public => "public",
        }
    }
}

/// A user's collection plus the metadata stored with it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrownDocument {
    /// 0 when read from a document that predates versioning
    pub schema_version: u32,
    pub rows: Collection,
    /// Name of the last imported file, used for export naming
    pub file_name: String,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredCrownDocument<'a> {
    schema_version: u32,
    rows: &'a Collection,
    file_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<i64>,
}

impl CrownDocument {
    /// Fresh document stamped with the current time
    pub fn new(rows: Collection, file_name: impl Into<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            rows,
            file_name: file_name.into(),
            created_at: None,
            updated_at: Some(now_millis()),
        }
    }

    /// Decode a stored document, defaulting anything missing or mistyped
    pub fn from_value(value: &Value) -> Self {
        Self {
            schema_version: schema_version(value),
            rows: value.get("rows").map(decode_rows).unwrap_or_default(),
            file_name: string_field(value, "fileName"),
            created_at: value.get("createdAt").and_then(Value::as_i64),
            updated_at: value.get("updatedAt").and_then(Value::as_i64),
        }
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(StoredCrownDocument {
            schema_version: SCHEMA_VERSION,
            rows: &self.rows,
            file_name: &self.file_name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })?)
    }
}

/// Opt-in flag plus the identity fields shown in the public directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublicProfile {
    pub schema_version: u32,
    pub is_public: bool,
    pub display_name: String,
    pub email: String,
    pub photo_url: String,
    pub updated_at: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredPublicProfile<'a> {
    schema_version: u32,
    is_public: bool,
    display_name: &'a str,
    email: &'a str,
    #[serde(rename = "photoURL")]
    photo_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<i64>,
}

impl PublicProfile {
    /// Profile carrying the identity's fields and the given visibility
    pub fn from_identity(identity: &Identity, is_public: bool) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            is_public,
            display_name: identity.display_name.clone(),
            email: identity.email.clone(),
            photo_url: identity.photo_url.clone(),
            updated_at: Some(now_millis()),
        }
    }

    /// Decode a stored profile; only a literal `true` makes it public
    pub fn from_value(value: &Value) -> Self {
        Self {
            schema_version: schema_version(value),
            is_public: value.get("isPublic") == Some(&Value::Bool(true)),
            display_name: string_field(value, "displayName"),
            email: string_field(value, "email"),
            photo_url: string_field(value, "photoURL"),
            updated_at: value.get("updatedAt").and_then(Value::as_i64),
        }
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(StoredPublicProfile {
            schema_version: SCHEMA_VERSION,
            is_public: self.is_public,
            display_name: &self.display_name,
            email: &self.email,
            photo_url: &self.photo_url,
            updated_at: self.updated_at,
        })?)
    }
}

/// A public profile together with its owner's uid
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileEntry {
    pub uid: String,
    #[serde(flatten)]
    pub profile: PublicProfile,
}

/// Remote document store used by the tracker
#[async_trait]
pub trait CrownStore: Send + Sync {
    async fn load_document(&self, uid: &str, namespace: Namespace) -> Result<Option<CrownDocument>>;

    /// Overwrite a crown document; `created_at` of the first write is kept
    async fn save_document(&self, uid: &str, namespace: Namespace, doc: &CrownDocument) -> Result<()>;

    async fn load_profile(&self, uid: &str) -> Result<Option<PublicProfile>>;

    async fn save_profile(&self, uid: &str, profile: &PublicProfile) -> Result<()>;

    /// Profiles with `is_public` set, ordered by display name
    async fn list_public_profiles(&self) -> Result<Vec<ProfileEntry>>;

    /// Cheap round trip proving the backend answers
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

fn schema_version(value: &Value) -> u32 {
    value
        .get("schemaVersion")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0)
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Lenient decode of a stored `rows` array
///
/// Non-arrays become an empty collection. Entries without a usable name are
/// dropped; entries without an id get one derived from their position.
fn decode_rows(rows: &Value) -> Collection {
    let Some(items) = rows.as_array() else {
        return Collection::new();
    };

    let records = items.iter().enumerate().filter_map(|(i, item)| {
        let name = item.get("name")?.as_str()?.trim();
        if name.is_empty() {
            return None;
        }
        let id = match item.get("id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => derive_id(name, i),
        };
        let flag = |key: &str| item.get(key).map_or(false, is_truthy_value);
        Some(Record {
            id,
            name: name.to_string(),
            small: flag("small"),
            large: flag("large"),
        })
    });

    Collection::from_records(records)
}
