use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{from_str, Value};
use tokio::{fs::File, io::AsyncReadExt};

use super::server_interface::{
    AbstractServer, ErrorDetails, ErrorLayer, FileListing, FileMetadata, Result, ServerError,
};
use crate::file_format::template::{CalcRequest, CalcResult};

/// IO errors amount to a 404 for our purposes which means a sticky problem.
impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> ServerError {
        ServerError::StickyProblem(ErrorDetails {
            layer: ErrorLayer::ServerLayer,
            message: err.to_string(),
        })
    }
}

#[derive(Deserialize)]
struct FixtureDirectory {
    source: String,
    path: String,
    #[serde(flatten)]
    listing: FileListing,
}

#[derive(Deserialize)]
struct FixtureFile {
    source: String,
    path: String,
    datatype: String,
    #[serde(default)]
    values: Vec<Value>,
}

/// On-disk form of a `MemoryServer`.
#[derive(Deserialize)]
struct Fixture {
    #[serde(default)]
    directories: Vec<FixtureDirectory>,
    #[serde(default)]
    files: Vec<FixtureFile>,
}

/// A server whose directories and file contents are all known up front.
/// Used for tests and for running the tool against canned data.
///
/// Every file loads to the same result regardless of the requested return
/// type; reduction is out of scope here.
#[derive(Debug, Default)]
pub struct MemoryServer {
    directories: BTreeMap<(String, String), FileListing>,
    files: BTreeMap<(String, String), CalcResult>,
    listing_calls: AtomicUsize,
    calc_calls: AtomicUsize,
}

impl MemoryServer {
    pub fn new() -> Self {
        MemoryServer::default()
    }

    /// Add a directory listing; files are listed in the order given.
    pub fn with_directory(
        mut self,
        source: &str,
        path: &str,
        files: &[(&str, i64)],
        subdirs: &[&str],
    ) -> Self {
        let listing = FileListing {
            files_metadata: files
                .iter()
                .map(|(name, mtime)| FileMetadata {
                    name: name.to_string(),
                    mtime: *mtime,
                })
                .collect(),
            subdirs: subdirs.iter().map(|s| s.to_string()).collect(),
        };
        self.directories
            .insert((source.to_string(), path.to_string()), listing);
        self
    }

    /// Add what loading the file at `path` (directory and filename) yields.
    pub fn with_file(
        mut self,
        source: &str,
        path: &str,
        datatype: &str,
        values: Vec<Value>,
    ) -> Self {
        self.files.insert(
            (source.to_string(), path.to_string()),
            CalcResult {
                datatype: datatype.to_string(),
                values,
            },
        );
        self
    }

    pub fn listing_calls(&self) -> usize {
        self.listing_calls.load(Ordering::SeqCst)
    }

    pub fn calc_calls(&self) -> usize {
        self.calc_calls.load(Ordering::SeqCst)
    }

    fn from_fixture(fixture: Fixture) -> Self {
        let mut server = MemoryServer::new();
        for dir in fixture.directories {
            server.directories.insert((dir.source, dir.path), dir.listing);
        }
        for file in fixture.files {
            server.files.insert(
                (file.source, file.path),
                CalcResult {
                    datatype: file.datatype,
                    values: file.values,
                },
            );
        }
        server
    }
}

fn missing(what: &str, source: &str, path: &str) -> ServerError {
    ServerError::StickyProblem(ErrorDetails {
        layer: ErrorLayer::DataLayer,
        message: format!("no such {} {}:{}", what, source, path),
    })
}

#[async_trait]
impl AbstractServer for MemoryServer {
    async fn get_file_metadata(&self, source: &str, pathlist: &[String]) -> Result<FileListing> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        let path = pathlist.join("/");
        match self.directories.get(&(source.to_string(), path.clone())) {
            Some(listing) => Ok(listing.clone()),
            None => Err(missing("directory", source, &path)),
        }
    }

    async fn calculate(&self, request: &CalcRequest) -> Result<Vec<CalcResult>> {
        self.calc_calls.fetch_add(1, Ordering::SeqCst);
        request
            .filelist()
            .iter()
            .map(|item| {
                self.files
                    .get(&(item.source.clone(), item.path.clone()))
                    .cloned()
                    .ok_or_else(|| missing("file", &item.source, &item.path))
            })
            .collect()
    }
}

/// Load a server from a JSON fixture of the form
/// `{"directories": [{source, path, files_metadata, subdirs}],
///   "files": [{source, path, datatype, values}]}`.
pub async fn make_memory_server(
    fixture_path: &str,
) -> Result<Box<dyn AbstractServer + Send + Sync>> {
    let mut f = File::open(fixture_path).await?;
    let mut raw_str = String::new();
    f.read_to_string(&mut raw_str).await?;

    let fixture: Fixture = from_str(&raw_str)?;
    Ok(Box::new(MemoryServer::from_fixture(fixture)))
}

/// Convenience for tests that want to describe a directory's entries
/// without building a listing by hand: each `(filename, mtime, entries)`
/// becomes a listed file whose load yields `entries` as `datatype`.
pub fn server_for_directory(
    source: &str,
    path: &str,
    datatype: &str,
    files: Vec<(&str, i64, Vec<Value>)>,
) -> MemoryServer {
    let listed: Vec<(&str, i64)> = files.iter().map(|(name, mtime, _)| (*name, *mtime)).collect();
    let mut server = MemoryServer::new().with_directory(source, path, &listed, &[]);
    for (name, _, entries) in files {
        let full_path = if path.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", path, name)
        };
        server = server.with_file(source, &full_path, datatype, entries);
    }
    server
}
