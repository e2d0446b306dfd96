//! On-device key-value fallback store.
//!
//! # Responsibility
//! - Keep a local JSON copy of echoes when the primary store is unreachable.
//! - Read legacy/malformed records leniently so they stay listable.
//!
//! # Invariants
//! - A missing store file is an empty store, not an error.
//! - Writes replace the whole document through temp-file + rename.
//! - A record whose `unlock_at` is missing or not an integer is read back
//!   with `unlock_at = None`; the unlock scheduler treats it as available.

use crate::model::echo::{Echo, EchoId};
use crate::store::{EchoRepository, StoreError, StoreResult};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Reverse;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    echoes: Vec<StoredEcho>,
}

/// Wire shape of one record inside the JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEcho {
    id: EchoId,
    user_id: String,
    audio_ref: String,
    created_at: i64,
    #[serde(default)]
    unlock_at: Value,
    #[serde(default)]
    mood_tag: Option<String>,
}

impl StoredEcho {
    fn from_echo(echo: &Echo) -> Self {
        Self {
            id: echo.id,
            user_id: echo.user_id.clone(),
            audio_ref: echo.audio_ref.clone(),
            created_at: echo.created_at,
            unlock_at: echo.unlock_at.map_or(Value::Null, Value::from),
            mood_tag: echo.mood_tag.clone(),
        }
    }

    fn into_echo(self) -> Echo {
        let unlock_at = self.unlock_at.as_i64();
        if unlock_at.is_none() {
            warn!(
                "event=kv_read module=store status=degraded echo_id={} reason=malformed_unlock_at",
                self.id
            );
        }
        Echo {
            id: self.id,
            user_id: self.user_id,
            audio_ref: self.audio_ref,
            created_at: self.created_at,
            unlock_at,
            mood_tag: self.mood_tag,
        }
    }
}

/// JSON-file backed echo repository.
#[derive(Debug, Clone)]
pub struct JsonFileEchoRepository {
    path: PathBuf,
}

impl JsonFileEchoRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StoreResult<StoreDocument> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(StoreDocument::default()),
            Err(err) => {
                return Err(StoreError::Connectivity(format!(
                    "failed to read `{}`: {err}",
                    self.path.display()
                )))
            }
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(StoreDocument::default());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn persist(&self, document: &StoreDocument) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| {
                StoreError::Connectivity(format!(
                    "failed to create `{}`: {err}",
                    parent.display()
                ))
            })?;
        }

        let bytes = serde_json::to_vec_pretty(document)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, bytes).map_err(|err| {
            StoreError::Connectivity(format!("failed to write `{}`: {err}", tmp_path.display()))
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|err| {
            StoreError::Connectivity(format!(
                "failed to replace `{}`: {err}",
                self.path.display()
            ))
        })
    }
}

impl EchoRepository for JsonFileEchoRepository {
    fn create_echo(&self, echo: &Echo) -> StoreResult<EchoId> {
        echo.validate()?;

        let mut document = self.load()?;
        if document.echoes.iter().any(|stored| stored.id == echo.id) {
            return Err(StoreError::DuplicateId(echo.id));
        }
        document.version = DOCUMENT_VERSION;
        document.echoes.push(StoredEcho::from_echo(echo));
        self.persist(&document)?;
        Ok(echo.id)
    }

    fn get_echo(&self, id: EchoId) -> StoreResult<Option<Echo>> {
        let document = self.load()?;
        Ok(document
            .echoes
            .into_iter()
            .find(|stored| stored.id == id)
            .map(StoredEcho::into_echo))
    }

    fn list_echoes(&self, user_id: &str) -> StoreResult<Vec<Echo>> {
        let document = self.load()?;
        // Reverse first so the stable sort keeps later insertions ahead on ties.
        let mut echoes = document
            .echoes
            .into_iter()
            .rev()
            .filter(|stored| stored.user_id == user_id)
            .map(StoredEcho::into_echo)
            .collect::<Vec<_>>();
        echoes.sort_by_key(|echo| Reverse(echo.created_at));
        Ok(echoes)
    }
}

#[cfg(test)]
mod tests {
    use super::JsonFileEchoRepository;
    use crate::store::{EchoRepository, StoreError};

    #[test]
    fn missing_file_reads_as_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileEchoRepository::new(dir.path().join("absent.json"));
        assert!(repo.list_echoes("anonymous").unwrap().is_empty());
    }

    #[test]
    fn corrupt_document_is_a_serialization_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("echoes.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonFileEchoRepository::new(path)
            .list_echoes("anonymous")
            .unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn malformed_unlock_at_reads_back_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("echoes.json");
        std::fs::write(
            &path,
            r#"{"version":1,"echoes":[{
                "id":"6f1c7f7e-8d1b-4e43-9d3e-2f1b1f0a9a11",
                "user_id":"anonymous",
                "audio_ref":"/a.m4a",
                "created_at":10,
                "unlock_at":"Invalid Date"
            }]}"#,
        )
        .unwrap();

        let echoes = JsonFileEchoRepository::new(path)
            .list_echoes("anonymous")
            .unwrap();
        assert_eq!(echoes.len(), 1);
        assert_eq!(echoes[0].unlock_at, None);
    }
}
