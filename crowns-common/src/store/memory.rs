//! In-process store
//!
//! Keeps documents as JSON values so reads go through the same lenient
//! decoding as the database-backed store. Failure switches let callers
//! exercise the tracker's degraded paths.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::{CrownDocument, CrownStore, Namespace, ProfileEntry, PublicProfile};
use crate::{Error, Result};

#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<(String, Namespace), (Value, Option<i64>)>>,
    profiles: RwLock<HashMap<String, Value>>,
    fail_reads: AtomicBool,
    fail_public_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw JSON document, bypassing the current schema
    pub async fn insert_raw(&self, uid: &str, namespace: Namespace, value: Value) {
        self.documents
            .write()
            .await
            .insert((uid.to_string(), namespace), (value, None));
    }

    /// Make every subsequent read fail
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make writes to the public namespace (documents and profiles) fail
    pub fn set_fail_public_writes(&self, fail: bool) {
        self.fail_public_writes.store(fail, Ordering::SeqCst);
    }

    fn check_read(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Internal("store unavailable for reads".to_string()));
        }
        Ok(())
    }

    fn check_public_write(&self) -> Result<()> {
        if self.fail_public_writes.load(Ordering::SeqCst) {
            return Err(Error::Internal("permission denied for public write".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CrownStore for MemoryStore {
    async fn load_document(&self, uid: &str, namespace: Namespace) -> Result<Option<CrownDocument>> {
        self.check_read()?;
        let documents = self.documents.read().await;
        Ok(documents
            .get(&(uid.to_string(), namespace))
            .map(|(value, created_at)| {
                let mut doc = CrownDocument::from_value(value);
                doc.created_at = (*created_at).or(doc.created_at);
                doc
            }))
    }

    async fn save_document(&self, uid: &str, namespace: Namespace, doc: &CrownDocument) -> Result<()> {
        if namespace == Namespace::Public {
            self.check_public_write()?;
        }
        let value = doc.to_value()?;
        let mut documents = self.documents.write().await;
        let key = (uid.to_string(), namespace);
        let created_at = documents
            .get(&key)
            .and_then(|(_, created)| *created)
            .or(doc.created_at)
            .or(doc.updated_at);
        documents.insert(key, (value, created_at));
        Ok(())
    }

    async fn load_profile(&self, uid: &str) -> Result<Option<PublicProfile>> {
        self.check_read()?;
        Ok(self.profiles.read().await.get(uid).map(PublicProfile::from_value))
    }

    async fn save_profile(&self, uid: &str, profile: &PublicProfile) -> Result<()> {
        self.check_public_write()?;
        let value = profile.to_value()?;
        self.profiles.write().await.insert(uid.to_string(), value);
        Ok(())
    }

    async fn list_public_profiles(&self) -> Result<Vec<ProfileEntry>> {
        self.check_read()?;
        let mut entries: Vec<ProfileEntry> = self
            .profiles
            .read()
            .await
            .iter()
            .map(|(uid, value)| ProfileEntry {
                uid: uid.clone(),
                profile: PublicProfile::from_value(value),
            })
            .filter(|entry| entry.profile.is_public)
            .collect();
        entries.sort_by(|a, b| a.profile.display_name.cmp(&b.profile.display_name));
        Ok(entries)
    }

    async fn ping(&self) -> Result<()> {
        self.check_read()
    }
}
