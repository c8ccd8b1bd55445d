use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::file_format::{
    entry::FileInfo,
    template::FileListItem,
    DataError,
};

/// Everything needed to address one entry: datasource, file path, entry
/// name and file mtime.  Encoded as the compact JSON array
/// `["source","path","entry",mtime]`, which doubles as the tree leaf id and
/// as the key the tree widget reports for checked leaves.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SelectionKey {
    pub source: String,
    pub path: String,
    pub entryname: String,
    pub mtime: i64,
}

impl SelectionKey {
    pub fn encode(&self) -> String {
        json!([self.source, self.path, self.entryname, self.mtime]).to_string()
    }

    pub fn decode(key: &str) -> Result<SelectionKey, DataError> {
        let malformed = |message: &str| DataError::MalformedSelectionKey {
            key: key.to_string(),
            message: message.to_string(),
        };

        let parts: Vec<Value> =
            serde_json::from_str(key).map_err(|err| malformed(&err.to_string()))?;
        match parts.as_slice() {
            [Value::String(source), Value::String(path), Value::String(entryname), mtime] => {
                let mtime = mtime
                    .as_i64()
                    .ok_or_else(|| malformed("mtime is not an integer"))?;
                Ok(SelectionKey {
                    source: source.clone(),
                    path: path.clone(),
                    entryname: entryname.clone(),
                    mtime,
                })
            }
            _ => Err(malformed("expected [source, path, entry, mtime]")),
        }
    }

    pub fn fileinfo(&self) -> FileInfo {
        FileInfo {
            filename: self.path.clone(),
            entryname: self.entryname.clone(),
            mtime: self.mtime,
            source: self.source.clone(),
        }
    }

    pub fn loader_fileinfo(&self) -> LoaderFileInfo {
        LoaderFileInfo {
            source: self.source.clone(),
            path: self.path.clone(),
            mtime: self.mtime,
            entries: vec![self.entryname.clone()],
        }
    }
}

impl From<&FileInfo> for SelectionKey {
    fn from(fi: &FileInfo) -> Self {
        SelectionKey {
            source: fi.source.clone(),
            path: fi.filename.clone(),
            entryname: fi.entryname.clone(),
            mtime: fi.mtime,
        }
    }
}

/// The fileinfo shape reduction modules take: one file plus the entries in
/// it that are wanted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoaderFileInfo {
    pub source: String,
    pub path: String,
    pub mtime: i64,
    #[serde(default)]
    pub entries: Vec<String>,
}

impl LoaderFileInfo {
    /// The selection key for the first listed entry, if there is one.
    pub fn first_key(&self) -> Option<SelectionKey> {
        Some(SelectionKey {
            source: self.source.clone(),
            path: self.path.clone(),
            entryname: self.entries.first()?.clone(),
            mtime: self.mtime,
        })
    }

    pub fn file_list_item(&self) -> FileListItem {
        FileListItem {
            path: self.path.clone(),
            source: self.source.clone(),
            mtime: self.mtime,
        }
    }
}

pub fn decode_keys<S: AsRef<str>>(keys: &[S]) -> Result<Vec<SelectionKey>, DataError> {
    keys.iter().map(|k| SelectionKey::decode(k.as_ref())).collect()
}

/// Selection keys for fileinfo that came from a module's configuration,
/// one per file; files listing no entries are dropped.
pub fn keys_for_fileinfo(infos: &[LoaderFileInfo]) -> Vec<String> {
    infos
        .iter()
        .filter_map(LoaderFileInfo::first_key)
        .map(|k| k.encode())
        .collect()
}

/// Ticket handed out when a selection-to-plot request starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlotTicket(u64);

/// Generation counter for selection-to-plot requests.  Overlapping requests
/// are not cancelled, but only the most recently started one may publish
/// its result; older ones find their ticket stale when they complete.
#[derive(Debug, Default)]
pub struct PlotRequests {
    latest: AtomicU64,
}

impl PlotRequests {
    pub fn new() -> Self {
        PlotRequests {
            latest: AtomicU64::new(0),
        }
    }

    pub fn begin(&self) -> PlotTicket {
        PlotTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: PlotTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}
