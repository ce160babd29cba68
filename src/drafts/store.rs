use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::{DraftError, Result};
use super::keys::{decode_draft_key, encode_draft_key, is_sensitive_field};

/// Saved values of one form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub form_id: Option<String>,
    pub fields: BTreeMap<String, String>,
    pub saved_at: DateTime<Utc>,
}

/// Fjall-backed store for unsent form drafts
#[derive(Clone)]
pub struct DraftStore {
    keyspace: Keyspace,
    drafts: PartitionHandle,
}

impl DraftStore {
    /// Open or create a draft store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening draft store at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;
        let drafts = keyspace.open_partition("drafts", PartitionCreateOptions::default())?;

        Ok(Self { keyspace, drafts })
    }

    /// Save a form's fields, replacing any earlier draft. Password fields are
    /// dropped before anything is written.
    pub fn save<I, K, V>(&self, form_id: Option<&str>, fields: I) -> Result<Draft>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let fields: BTreeMap<String, String> = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(name, _)| !is_sensitive_field(name))
            .collect();

        let draft = Draft {
            form_id: form_id
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(String::from),
            fields,
            saved_at: Utc::now(),
        };

        let key = encode_draft_key(form_id);
        self.drafts.insert(key, serde_json::to_vec(&draft)?)?;
        debug!(form = ?draft.form_id, fields = draft.fields.len(), "Draft saved");
        Ok(draft)
    }

    /// Get the draft of a form, if one was saved
    pub fn load(&self, form_id: Option<&str>) -> Result<Option<Draft>> {
        match self.drafts.get(encode_draft_key(form_id))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// Remove a form's draft (after a successful submit). Returns whether one existed.
    pub fn clear(&self, form_id: Option<&str>) -> Result<bool> {
        let key = encode_draft_key(form_id);
        let existed = self.drafts.contains_key(&key)?;
        if existed {
            self.drafts.remove(key)?;
            debug!(form = ?form_id, "Draft cleared");
        }
        Ok(existed)
    }

    /// All saved drafts in key order
    pub fn list(&self) -> Result<Vec<Draft>> {
        let mut drafts = Vec::new();
        for item in self.drafts.iter() {
            let (key, value) = item?;
            if decode_draft_key(&key).is_none() {
                return Err(DraftError::InvalidKey(
                    String::from_utf8_lossy(&key).to_string(),
                ));
            }
            drafts.push(serde_json::from_slice(&value)?);
        }
        Ok(drafts)
    }

    /// Persist all pending writes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }
}
