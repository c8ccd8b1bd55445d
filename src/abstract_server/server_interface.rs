use std::convert::TryFrom;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::file_format::{
    template::{CalcRequest, CalcResult},
    DataError,
};

pub type Result<T> = std::result::Result<T, ServerError>;

// JSON parse errors are sticky data problems.
impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> ServerError {
        ServerError::StickyProblem(ErrorDetails {
            layer: ErrorLayer::DataLayer,
            message: err.to_string(),
        })
    }
}

/// Keys and navigation strings come from the user; everything else we parse
/// came back from the server.
impl From<DataError> for ServerError {
    fn from(err: DataError) -> ServerError {
        let layer = match err {
            DataError::MalformedSelectionKey { .. } | DataError::MalformedNavState(_) => {
                ErrorLayer::BadInput
            }
            _ => ErrorLayer::DataLayer,
        };
        ServerError::StickyProblem(ErrorDetails {
            layer,
            message: err.to_string(),
        })
    }
}

/// Express whether the error seems to be happening in the server or the data.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorLayer {
    /// The request itself has structural issues, like a selection key that
    /// doesn't decode or an instrument nobody registered.
    BadInput,
    /// The error seems to involve server logic, so it may or may not be an
    /// issue with the underlying data.
    ServerLayer,
    /// The error seems to be related to the data files in question rather
    /// than the server, like a file that isn't there (anymore).
    DataLayer,
}

/// ServerError payload to provide details about what went wrong for
/// investigation purposes.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorDetails {
    /// Attempt to distinguish failures due to server bugs from failures due to
    /// data problems.  For example a 500 response from a server would be a
    /// `ServerLayer` problem, but if a 404 was instead returned, that would be
    /// a `DataLayer` problem.
    pub layer: ErrorLayer,
    /// Stringified version of the lower level error.
    pub message: String,
}

/// Does a retry makes sense or not?
///
/// Nothing in this crate retries; the distinction is surfaced so that the
/// caller who triggered the browse or plot can decide.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerError {
    /// An error that will persist if the same request is repeated.  For
    /// example a 404.
    StickyProblem(ErrorDetails),
    /// An error that might go away if retried later.  For example a 504
    /// "Gateway timeout".
    TransientProblem(ErrorDetails),
}

/// One file in a directory listing.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FileMetadata {
    pub name: String,
    pub mtime: i64,
}

/// A directory listing.  On the wire `files_metadata` is an object mapping
/// filename to mtime; we keep it as a list in the order the server sent it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFileListing")]
pub struct FileListing {
    pub files_metadata: Vec<FileMetadata>,
    #[serde(default)]
    pub subdirs: Vec<String>,
}

#[derive(Deserialize)]
struct RawFileListing {
    #[serde(default)]
    files_metadata: Map<String, Value>,
    #[serde(default)]
    subdirs: Vec<String>,
}

impl TryFrom<RawFileListing> for FileListing {
    type Error = String;

    fn try_from(raw: RawFileListing) -> std::result::Result<Self, Self::Error> {
        let files_metadata = raw
            .files_metadata
            .into_iter()
            .map(|(name, mtime)| match mtime.as_i64() {
                Some(mtime) => Ok(FileMetadata { name, mtime }),
                None => Err(format!("file {:?} has non-integer mtime {}", name, mtime)),
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(FileListing {
            files_metadata,
            subdirs: raw.subdirs,
        })
    }
}

/// Unified exposure for the remote reduction server's file listing and
/// calculation API, whether over HTTP or from an in-memory fixture.
///
/// ## Runtime Assumptions
///
/// We assume that we are operating in a tokio multi-threaded runtime.  The
/// browser issues at most one listing call per browse, and one calculation
/// call per browse or plot, and it never retries.
#[async_trait]
pub trait AbstractServer {
    /// List the data files and subdirectories of `pathlist` in `source`.
    async fn get_file_metadata(&self, source: &str, pathlist: &[String]) -> Result<FileListing>;

    /// Evaluate a template terminal.  Loader templates yield one result per
    /// file in their filelist, in filelist order.
    async fn calculate(&self, request: &CalcRequest) -> Result<Vec<CalcResult>>;
}
