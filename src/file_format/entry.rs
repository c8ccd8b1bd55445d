use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{key_path::KeyPath, DataError};

/// One named measurement/scan from an instrument data file.  The full
/// record is kept as JSON so instrument code can address arbitrary nested
/// fields through `KeyPath`s; `name` and `mtime` are pulled out because the
/// tree and selection machinery always need them.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    name: String,
    mtime: i64,
    fields: Value,
}

impl Entry {
    /// Wrap a record that already carries its `entry` name and `mtime`.
    pub fn from_value(fields: Value) -> Result<Entry, DataError> {
        let obj = fields.as_object().ok_or(DataError::EntryNotObject)?;
        let name = obj
            .get("entry")
            .and_then(Value::as_str)
            .ok_or(DataError::MissingEntryName)?
            .to_string();
        let mtime = obj
            .get("mtime")
            .and_then(Value::as_i64)
            .ok_or_else(|| DataError::MissingMtime(name.clone()))?;
        Ok(Entry {
            name,
            mtime,
            fields,
        })
    }

    /// Wrap a record loaded from a file whose modification time is `mtime`.
    /// Loaders don't know the file's mtime, so it is stamped on here and
    /// overrides anything the record carried.
    pub fn from_loaded_value(mut fields: Value, mtime: i64) -> Result<Entry, DataError> {
        match fields.as_object_mut() {
            Some(obj) => {
                obj.insert("mtime".to_string(), Value::from(mtime));
            }
            None => return Err(DataError::EntryNotObject),
        }
        Entry::from_value(fields)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mtime(&self) -> i64 {
        self.mtime
    }

    pub fn fields(&self) -> &Value {
        &self.fields
    }

    pub fn lookup(&self, path: &KeyPath) -> super::key_path::Lookup<'_> {
        path.resolve(&self.fields)
    }
}

impl Serialize for Entry {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.fields.serialize(serializer)
    }
}

/// All entries loaded from one file.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FileEntries {
    pub path: String,
    pub entries: Vec<Entry>,
}

/// File path -> entries, in the order the files were listed.  Built fresh
/// for every browse of a (datasource, path) pair.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FileObjs {
    pub by_file: Vec<FileEntries>,
}

impl FileObjs {
    pub fn new() -> Self {
        FileObjs { by_file: vec![] }
    }

    /// Append entries for `path`, merging with an existing file of the same
    /// path so that paths stay unique.
    pub fn insert(&mut self, path: &str, entries: Vec<Entry>) {
        match self.by_file.iter_mut().find(|f| f.path == path) {
            Some(existing) => existing.entries.extend(entries),
            None => self.by_file.push(FileEntries {
                path: path.to_string(),
                entries,
            }),
        }
    }

    pub fn get(&self, path: &str) -> Option<&FileEntries> {
        self.by_file.iter().find(|f| f.path == path)
    }

    /// Resolve a leaf's fileinfo back to the entry it was built from.
    pub fn find_entry(&self, fileinfo: &FileInfo) -> Option<&Entry> {
        self.get(&fileinfo.filename)?
            .entries
            .iter()
            .find(|e| e.name == fileinfo.entryname)
    }

    pub fn entry_count(&self) -> usize {
        self.by_file.iter().map(|f| f.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_file.is_empty()
    }
}

/// Minimal addressable reference to one entry; carried on tree leaves.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileInfo {
    pub filename: String,
    pub entryname: String,
    pub mtime: i64,
    pub source: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_requires_name_and_mtime() {
        assert_eq!(
            Entry::from_value(json!([1, 2])),
            Err(DataError::EntryNotObject)
        );
        assert_eq!(
            Entry::from_value(json!({"mtime": 3})),
            Err(DataError::MissingEntryName)
        );
        assert_eq!(
            Entry::from_value(json!({"entry": "e1"})),
            Err(DataError::MissingMtime("e1".to_string()))
        );

        let e = Entry::from_loaded_value(json!({"entry": "e1", "mtime": 5}), 100).unwrap();
        assert_eq!(e.name(), "e1");
        assert_eq!(e.mtime(), 100);
        assert_eq!(e.fields()["mtime"], json!(100));
    }

    #[test]
    fn test_find_entry_by_fileinfo() {
        let mut objs = FileObjs::new();
        let e1 = Entry::from_value(json!({"entry": "e1", "mtime": 1})).unwrap();
        let e2 = Entry::from_value(json!({"entry": "e2", "mtime": 1})).unwrap();
        objs.insert("data/a.nxz", vec![e1]);
        objs.insert("data/a.nxz", vec![e2]);
        assert_eq!(objs.by_file.len(), 1);
        assert_eq!(objs.entry_count(), 2);

        let fi = FileInfo {
            filename: "data/a.nxz".to_string(),
            entryname: "e2".to_string(),
            mtime: 1,
            source: "ncnr".to_string(),
        };
        assert_eq!(objs.find_entry(&fi).map(Entry::name), Some("e2"));

        let missing = FileInfo {
            entryname: "e3".to_string(),
            ..fi
        };
        assert!(objs.find_entry(&missing).is_none());
    }
}
