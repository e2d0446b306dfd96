//! Durable audio asset storage.
//!
//! # Responsibility
//! - Turn a temporary capture file into a durable, retrievable reference.
//! - Generate collision-resistant asset names at capture time.
//!
//! # Invariants
//! - Stores never rename or overwrite: a name collision is a failure.
//! - A failed transfer leaves no partial asset behind.

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod local;

pub use local::LocalAssetStore;

const ASSET_NAME_PREFIX: &str = "echo";
const ASSET_SUFFIX_LEN: usize = 6;
/// Extension used when the capture file carries none.
pub const DEFAULT_AUDIO_EXTENSION: &str = "m4a";

pub type AssetResult<T> = Result<T, AssetError>;

/// Durable reference (absolute path or URL) to a stored asset.
pub type AssetRef = String;

/// Failure taxonomy for asset transfers.
#[derive(Debug)]
pub enum AssetError {
    /// Source file is missing, unreadable or empty.
    SourceNotFound { path: PathBuf, reason: String },
    /// Destination container could not be created or opened.
    DestinationUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Copy failed, or the destination name is taken or invalid.
    TransferFailure { name: String, reason: String },
}

impl Display for AssetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SourceNotFound { path, reason } => {
                write!(f, "audio source `{}` unusable: {reason}", path.display())
            }
            Self::DestinationUnavailable { path, source } => write!(
                f,
                "asset destination `{}` unavailable: {source}",
                path.display()
            ),
            Self::TransferFailure { name, reason } => {
                write!(f, "failed to store asset `{name}`: {reason}")
            }
        }
    }
}

impl Error for AssetError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::DestinationUnavailable { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Durable blob storage for recorded audio.
///
/// Implemented by the local filesystem store; a remote object-storage
/// adapter plugs in behind the same contract.
pub trait AssetStore {
    /// Copies/uploads `source` under `suggested_name` and returns a durable
    /// reference to it.
    fn store(&self, source: &std::path::Path, suggested_name: &str) -> AssetResult<AssetRef>;

    /// Deletes an asset previously returned by [`AssetStore::store`].
    ///
    /// Removing an asset that is already gone succeeds.
    fn remove(&self, asset: &AssetRef) -> AssetResult<()>;
}

/// Builds a unique asset file name: `echo_<epoch_ms>_<6 alphanumerics>.<ext>`.
///
/// `extension` is taken without the leading dot; blank values fall back to
/// [`DEFAULT_AUDIO_EXTENSION`].
pub fn generate_asset_name<R: Rng + ?Sized>(now_ms: i64, extension: &str, rng: &mut R) -> String {
    let suffix: String = (0..ASSET_SUFFIX_LEN)
        .map(|_| char::from(rng.sample(Alphanumeric)).to_ascii_lowercase())
        .collect();
    let extension = extension.trim().trim_start_matches('.');
    let extension = if extension.is_empty() {
        DEFAULT_AUDIO_EXTENSION
    } else {
        extension
    };
    format!("{ASSET_NAME_PREFIX}_{now_ms}_{suffix}.{extension}")
}
