//! Asset upload into a deployed asset canister.
//!
//! Every regular file under the build root becomes a single `store` call whose
//! key is the file path relative to the root, `/`-prefixed and with forward
//! slashes. Uploads are sequential, and the first failure stops the remaining ones.

use std::{error, fmt, fs, io, path::Path};

use async_trait::async_trait;
use candid::{CandidType, Deserialize, Encode, Principal};
use derive_more::{Display, Error, From};
use ic_agent::{Agent, AgentError};
use indicatif::ProgressBar;
use serde::Serialize;
use tracing::info;

use crate::walker::{AssetFile, AssetTree, WalkError};

/// Content encoding of uploaded assets; files are stored as-is.
pub(crate) const IDENTITY_ENCODING: &str = "identity";

/// MIME type used for unknown extensions.
const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Known file name suffixes and their MIME types.
const MIME_TYPES: &[(&str, &str)] = &[
    (".html", "text/html"),
    (".css", "text/css"),
    (".js", "application/javascript"),
    (".svg", "image/svg+xml"),
    (".png", "image/png"),
    (".jpg", "image/jpeg"),
    (".jpeg", "image/jpeg"),
];

/// Determine the MIME type of a file by its name suffix.
pub(crate) fn mime_type(file_name: &str) -> &'static str {
    MIME_TYPES
        .iter()
        .find(|(suffix, _)| file_name.ends_with(suffix))
        .map_or(DEFAULT_MIME_TYPE, |&(_, mime)| mime)
}

/// Derive a store key from a path relative to the build root.
///
/// Returns [`None`] if the path is not valid unicode.
pub(crate) fn asset_key(relative: &Path) -> Option<String> {
    relative
        .to_str()
        .map(|path| format!("/{}", path.replace('\\', "/")))
}

/// `store` method argument of the asset canister.
#[derive(CandidType, Deserialize, Clone, Debug)]
pub(crate) struct StoreArg {
    /// Asset key.
    pub key: String,

    /// Raw file contents.
    #[serde(with = "serde_bytes")]
    pub content: Vec<u8>,

    /// MIME type.
    pub content_type: String,

    /// Content encoding name.
    pub content_encoding: String,

    /// Expected content hash, verified by the canister if present.
    pub sha256: Option<Vec<u8>>,

    /// Whether the asset is also served under alias paths.
    pub aliased: Option<bool>,
}

impl StoreArg {
    /// Create an unencoded asset record without hash or aliasing.
    pub(crate) fn new(key: String, content: Vec<u8>, content_type: &str) -> Self {
        Self {
            key,
            content,
            content_type: String::from(content_type),
            content_encoding: String::from(IDENTITY_ENCODING),
            sha256: None,
            aliased: None,
        }
    }
}

/// `store` call errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum StoreError {
    /// Agent transport or canister rejection.
    Agent(AgentError),

    /// Unable to encode the request.
    Candid(candid::Error),
}

/// Asset canister interface.
#[async_trait]
pub(crate) trait AssetStore {
    /// Store a single asset.
    async fn store(&self, arg: &StoreArg) -> Result<(), StoreError>;
}

/// Agent-backed asset canister client.
pub(crate) struct AssetCanister<'a> {
    /// Agent used to issue calls.
    agent: &'a Agent,

    /// Asset canister identifier.
    canister_id: Principal,
}

impl<'a> AssetCanister<'a> {
    /// Create a new client for `canister_id`.
    pub(crate) fn new(agent: &'a Agent, canister_id: Principal) -> Self {
        Self { agent, canister_id }
    }
}

#[async_trait]
impl AssetStore for AssetCanister<'_> {
    async fn store(&self, arg: &StoreArg) -> Result<(), StoreError> {
        self.agent
            .update(&self.canister_id, "store")
            .with_arg(Encode!(arg)?)
            .call_and_wait()
            .await?;

        Ok(())
    }
}

/// Errors that stop the asset upload.
#[derive(Debug, Display, From, Error)]
pub(crate) enum UploadError {
    /// Unable to walk the build directory.
    Walk(WalkError),

    /// Unable to read an asset file.
    #[display(fmt = "unable to read {}: {}", path, source)]
    #[from(ignore)]
    Read {
        /// Asset file path.
        path: String,

        /// Underlying IO error.
        source: io::Error,
    },

    /// Asset path cannot be used as a key.
    #[display(fmt = "file {} contains non-unicode symbols in path", _0)]
    #[from(ignore)]
    NonUnicodePath(#[error(ignore)] String),

    /// The canister rejected a `store` call.
    #[display(fmt = "unable to store {}: {}", key, source)]
    #[from(ignore)]
    Store {
        /// Asset key.
        key: String,

        /// Underlying call error.
        source: StoreError,
    },
}

/// Assets uploaded during a single run.
#[derive(Debug, Default, Serialize)]
pub(crate) struct UploadSummary {
    /// Stored keys, in upload order.
    pub keys: Vec<String>,

    /// Total number of uploaded content bytes.
    pub bytes: u64,
}

/// Upload that stopped part-way through.
#[derive(Debug)]
pub(crate) struct PartialUpload {
    /// Assets stored before the failure.
    pub summary: UploadSummary,

    /// Failure that stopped the upload.
    pub error: UploadError,
}

impl fmt::Display for PartialUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} assets stored before the failure)",
            self.error,
            self.summary.keys.len()
        )
    }
}

impl error::Error for PartialUpload {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Upload every file of `tree` into `store`, one at a time, in walk order.
pub(crate) async fn upload_assets<S: AssetStore + ?Sized>(
    store: &S,
    tree: &AssetTree,
    progress: &ProgressBar,
) -> Result<UploadSummary, PartialUpload> {
    let mut summary = UploadSummary::default();

    for file in tree.files() {
        let result = match file {
            Ok(file) => upload_file(store, file, progress).await,
            Err(error) => Err(error.into()),
        };

        match result {
            Ok((key, bytes)) => {
                summary.keys.push(key);
                summary.bytes += bytes;
            }
            Err(error) => return Err(PartialUpload { summary, error }),
        }
    }

    Ok(summary)
}

/// Read and store a single file, returning its key and size.
async fn upload_file<S: AssetStore + ?Sized>(
    store: &S,
    AssetFile { path, relative }: AssetFile,
    progress: &ProgressBar,
) -> Result<(String, u64), UploadError> {
    let key = asset_key(&relative)
        .ok_or_else(|| UploadError::NonUnicodePath(path.display().to_string()))?;

    let content = fs::read(&path).map_err(|source| UploadError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let bytes = content.len() as u64;
    let content_type = mime_type(&key);

    progress.set_message(format!("Uploading {key}..."));

    store
        .store(&StoreArg::new(key.clone(), content, content_type))
        .await
        .map_err(|source| UploadError::Store {
            key: key.clone(),
            source,
        })?;

    info!(%key, bytes, content_type, "asset stored");

    Ok((key, bytes))
}
