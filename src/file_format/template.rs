use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// A reduction template: a dataflow of modules and the wires between them.
/// We only ever build or inspect these; evaluating them is the server's job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub modules: Vec<ModuleInstance>,
    #[serde(default)]
    pub wires: Vec<Value>,
    pub instrument: String,
    pub version: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModuleInstance {
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub config: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub id: String,
    pub datatype: String,
}

/// The parts of a module definition we care about: which of its fields hold
/// file references.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModuleDef {
    pub id: String,
    pub fields: Vec<FieldDef>,
}

pub const FILEINFO_DATATYPE: &str = "fileinfo";

/// One file in a loader module's `filelist`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileListItem {
    pub path: String,
    pub source: String,
    pub mtime: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnType {
    /// The full data objects, as needed to categorize and decorate.
    Metadata,
    /// Values already reduced to something the plot front-end can draw.
    Plottable,
}

/// Evaluate `terminal_id` of module `module_id` in `template`, with
/// `config` overriding per-module configuration (keyed by module index).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalcRequest {
    pub template: Template,
    pub config: BTreeMap<String, Value>,
    pub module_id: usize,
    pub terminal_id: String,
    pub return_type: ReturnType,
}

impl CalcRequest {
    /// The files the evaluated module is being asked to load.
    pub fn filelist(&self) -> Vec<FileListItem> {
        self.config
            .get(&self.module_id.to_string())
            .and_then(|c| c.get("filelist"))
            .and_then(|fl| serde_json::from_value(fl.clone()).ok())
            .unwrap_or_default()
    }

    pub fn with_filelist(mut self, files: &[FileListItem]) -> Self {
        self.config.insert(
            self.module_id.to_string(),
            json!({ "filelist": files }),
        );
        self
    }
}

/// One output of a calculation.  Loaders produce one result per input file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalcResult {
    pub datatype: String,
    #[serde(default)]
    pub values: Vec<Value>,
}

/// Filenames grouped by directory, grouped by datasource.
pub type SourcePathFiles = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// Collect every file referenced by a `fileinfo` field of any module in
/// `template`, grouped by source and then by directory.  Paths with no
/// directory part, or that end in `/`, name no file and are skipped.
pub fn template_source_paths(
    template: &Template,
    module_defs: &BTreeMap<String, ModuleDef>,
) -> SourcePathFiles {
    lazy_static! {
        static ref RE_DIR_AND_FILE: Regex = Regex::new(r"^(.*)/([^/]+)$").unwrap();
    }

    let mut grouped: SourcePathFiles = BTreeMap::new();
    for module in &template.modules {
        let def = match module_defs.get(&module.module) {
            Some(def) => def,
            None => {
                trace!(module = %module.module, "no module definition");
                continue;
            }
        };
        let fileinfo_fields = def
            .fields
            .iter()
            .filter(|f| f.datatype == FILEINFO_DATATYPE)
            .map(|f| f.id.as_str());
        for field in fileinfo_fields {
            let finfos = match module.config.get(field).and_then(Value::as_array) {
                Some(finfos) => finfos,
                None => continue,
            };
            for finfo in finfos {
                let (source, path) = match (
                    finfo.get("source").and_then(Value::as_str),
                    finfo.get("path").and_then(Value::as_str),
                ) {
                    (Some(source), Some(path)) => (source, path),
                    _ => continue,
                };
                if let Some(caps) = RE_DIR_AND_FILE.captures(path) {
                    grouped
                        .entry(source.to_string())
                        .or_default()
                        .entry(caps[1].to_string())
                        .or_default()
                        .push(caps[2].to_string());
                }
            }
        }
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loader_def() -> BTreeMap<String, ModuleDef> {
        let mut defs = BTreeMap::new();
        defs.insert(
            "ncnr.refl.ncnr_load".to_string(),
            ModuleDef {
                id: "ncnr.refl.ncnr_load".to_string(),
                fields: vec![
                    FieldDef {
                        id: "filelist".to_string(),
                        datatype: "fileinfo".to_string(),
                    },
                    FieldDef {
                        id: "intent".to_string(),
                        datatype: "opt".to_string(),
                    },
                ],
            },
        );
        defs
    }

    #[test]
    fn test_template_source_paths_groups_by_source_and_dir() {
        let template: Template = serde_json::from_value(json!({
            "name": "t",
            "modules": [
                {"module": "ncnr.refl.ncnr_load", "config": {"filelist": [
                    {"source": "ncnr", "path": "ncnrdata/cgd/201511/a.nxz.cgd", "mtime": 1},
                    {"source": "ncnr", "path": "ncnrdata/cgd/201511/b.nxz.cgd", "mtime": 1},
                    {"source": "charlotte", "path": "x/c.nxz", "mtime": 1},
                    {"source": "ncnr", "path": "nodirectory", "mtime": 1}
                ], "intent": "specular"}},
                {"module": "ncnr.refl.unknown", "config": {"filelist": [
                    {"source": "ncnr", "path": "ignored/d.nxz", "mtime": 1}
                ]}},
                {"module": "ncnr.refl.ncnr_load"}
            ],
            "instrument": "ncnr.refl",
            "version": "0.0"
        }))
        .unwrap();

        let grouped = template_source_paths(&template, &loader_def());
        assert_eq!(grouped.len(), 2);
        assert_eq!(
            grouped["ncnr"]["ncnrdata/cgd/201511"],
            vec!["a.nxz.cgd".to_string(), "b.nxz.cgd".to_string()]
        );
        assert_eq!(grouped["charlotte"]["x"], vec!["c.nxz".to_string()]);
        assert!(!grouped["ncnr"].contains_key("ignored"));
    }

    #[test]
    fn test_filelist_round_trips_through_config() {
        let template = Template {
            name: "loader_template".to_string(),
            description: String::new(),
            modules: vec![],
            wires: vec![],
            instrument: "ncnr.magik".to_string(),
            version: "0.0".to_string(),
        };
        let files = vec![FileListItem {
            path: "a/b.nxz".to_string(),
            source: "ncnr".to_string(),
            mtime: 12,
        }];
        let req = CalcRequest {
            template,
            config: BTreeMap::new(),
            module_id: 0,
            terminal_id: "output".to_string(),
            return_type: ReturnType::Metadata,
        }
        .with_filelist(&files);
        assert_eq!(req.filelist(), files);
        assert_eq!(req.config["0"]["filelist"][0]["mtime"], json!(12));
    }
}
