//! Filesystem-backed asset store.
//!
//! Copies capture files into a durable app directory. The directory is
//! created on first use; existing files are never replaced.

use super::{AssetError, AssetRef, AssetResult, AssetStore};
use log::{error, info, warn};
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

/// Durable local audio directory.
#[derive(Debug, Clone)]
pub struct LocalAssetStore {
    root: PathBuf,
}

impl LocalAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_root(&self) -> AssetResult<()> {
        std::fs::create_dir_all(&self.root).map_err(|source| AssetError::DestinationUnavailable {
            path: self.root.clone(),
            source,
        })
    }
}

impl AssetStore for LocalAssetStore {
    fn store(&self, source: &Path, suggested_name: &str) -> AssetResult<AssetRef> {
        let started_at = Instant::now();
        validate_name(suggested_name)?;
        let source_len = validate_source(source)?;
        self.ensure_root()?;

        let destination = self.root.join(suggested_name);
        let mut output = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&destination)
            .map_err(|err| match err.kind() {
                ErrorKind::AlreadyExists => AssetError::TransferFailure {
                    name: suggested_name.to_string(),
                    reason: "destination name already exists".to_string(),
                },
                _ => AssetError::DestinationUnavailable {
                    path: destination.clone(),
                    source: err,
                },
            })?;

        let copied = File::open(source).and_then(|mut input| std::io::copy(&mut input, &mut output));
        drop(output);

        match copied {
            Ok(bytes) if bytes == source_len => {
                info!(
                    "event=asset_store module=asset status=ok bytes={} duration_ms={}",
                    bytes,
                    started_at.elapsed().as_millis()
                );
                Ok(destination.to_string_lossy().into_owned())
            }
            Ok(bytes) => {
                discard_partial(&destination);
                error!(
                    "event=asset_store module=asset status=error error_code=short_copy expected={} copied={}",
                    source_len, bytes
                );
                Err(AssetError::TransferFailure {
                    name: suggested_name.to_string(),
                    reason: format!("copied {bytes} of {source_len} bytes"),
                })
            }
            Err(err) => {
                discard_partial(&destination);
                error!(
                    "event=asset_store module=asset status=error error_code=copy_failed error={}",
                    err
                );
                Err(AssetError::TransferFailure {
                    name: suggested_name.to_string(),
                    reason: err.to_string(),
                })
            }
        }
    }

    fn remove(&self, asset: &AssetRef) -> AssetResult<()> {
        let name = Path::new(asset)
            .strip_prefix(&self.root)
            .ok()
            .and_then(|relative| relative.to_str())
            .ok_or_else(|| AssetError::TransferFailure {
                name: asset.clone(),
                reason: "asset is not stored under this root".to_string(),
            })?;
        validate_name(name)?;

        match std::fs::remove_file(self.root.join(name)) {
            Ok(()) => {
                info!("event=asset_remove module=asset status=ok");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(AssetError::DestinationUnavailable {
                path: self.root.join(name),
                source,
            }),
        }
    }
}

fn discard_partial(destination: &Path) {
    if let Err(err) = std::fs::remove_file(destination) {
        warn!(
            "event=asset_store module=asset status=degraded reason=partial_not_removed error={}",
            err
        );
    }
}

fn validate_source(source: &Path) -> AssetResult<u64> {
    let metadata = std::fs::metadata(source).map_err(|err| AssetError::SourceNotFound {
        path: source.to_path_buf(),
        reason: err.to_string(),
    })?;
    if !metadata.is_file() {
        return Err(AssetError::SourceNotFound {
            path: source.to_path_buf(),
            reason: "not a regular file".to_string(),
        });
    }
    if metadata.len() == 0 {
        return Err(AssetError::SourceNotFound {
            path: source.to_path_buf(),
            reason: "file is empty".to_string(),
        });
    }
    Ok(metadata.len())
}

fn validate_name(name: &str) -> AssetResult<()> {
    let mut components = Path::new(name).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if name.trim().is_empty() || !single_normal {
        return Err(AssetError::TransferFailure {
            name: name.to_string(),
            reason: "asset name must be a plain file name".to_string(),
        });
    }
    Ok(())
}
