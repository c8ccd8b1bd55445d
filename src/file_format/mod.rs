pub mod entry;
pub mod key_path;
pub mod template;

use thiserror::Error;

/// Problems with the shape of data handed to us by the server or by the
/// user.  These never come from a missing field inside an entry; those are
/// rendered as `key_path::ABSENT_CATEGORY` instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("entry record is not a JSON object")]
    EntryNotObject,

    #[error("entry record lacks a string `entry` name")]
    MissingEntryName,

    #[error("entry record `{0}` lacks an integer `mtime`")]
    MissingMtime(String),

    #[error("invalid key path {0:?}: {1}")]
    InvalidKeyPath(Vec<String>, &'static str),

    #[error("category key list must have at least one level")]
    EmptyCategories,

    #[error("malformed selection key {key:?}: {message}")]
    MalformedSelectionKey { key: String, message: String },

    #[error("malformed navigation state: {0}")]
    MalformedNavState(String),
}
