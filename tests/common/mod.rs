#![allow(dead_code)]

use serde_json::{json, Value};
use webreduce::{
    abstract_server::MemoryServer,
    instrument::{ncnr_refl::REFLDATA_DATATYPE, InstrumentRegistry, NcnrReflOptions},
    selection::SelectionKey,
};

pub const SOURCE: &str = "ncnr";
pub const DIR: &str = "ncnrdata/cgd/201511";
pub const OTHER_DIR: &str = "ncnrdata/cgd/201512";

pub fn refl_entry(entry: &str, sample: Value, intent: &str, name: &str, x: Vec<f64>) -> Value {
    let v: Vec<f64> = x.iter().map(|xi| 100.0 - xi).collect();
    let dv: Vec<f64> = x.iter().map(|_| 1.0).collect();
    json!({
        "entry": entry,
        "sample": sample,
        "intent": intent,
        "name": name,
        "x": x,
        "v": v,
        "dv": dv,
        "xlabel": "Qz", "xunits": "1/Ang",
        "vlabel": "counts", "vunits": "counts",
        "xscale": "linear", "vscale": "log"
    })
}

/// Two directories: the first with two files (three entries), the second
/// with one.
pub fn fixture_server() -> MemoryServer {
    MemoryServer::new()
        .with_directory(SOURCE, DIR, &[("a.nxz.cgd", 100), ("b.nxz.cgd", 200)], &["sub"])
        .with_directory(SOURCE, OTHER_DIR, &[("c.nxz.cgd", 300)], &[])
        .with_file(
            SOURCE,
            &format!("{}/a.nxz.cgd", DIR),
            REFLDATA_DATATYPE,
            vec![
                refl_entry(
                    "e1",
                    json!({"name": "S1", "description": "silicon"}),
                    "specular",
                    "run1",
                    vec![1.0, 2.0, 3.0, 9.0],
                ),
                refl_entry("e2", json!({"name": "S1"}), "slit", "run1", vec![0.0, 5.0]),
            ],
        )
        .with_file(
            SOURCE,
            &format!("{}/b.nxz.cgd", DIR),
            REFLDATA_DATATYPE,
            vec![refl_entry(
                "e1",
                json!({"name": "S2"}),
                "specular",
                "run2",
                vec![0.1, 0.2],
            )],
        )
        .with_file(
            SOURCE,
            &format!("{}/c.nxz.cgd", OTHER_DIR),
            REFLDATA_DATATYPE,
            vec![refl_entry("e1", json!({"name": "S3"}), "specular", "run3", vec![4.0])],
        )
}

pub fn registry() -> InstrumentRegistry {
    InstrumentRegistry::with_defaults(NcnrReflOptions::default())
}

pub fn key(dir: &str, file: &str, entry: &str, mtime: i64) -> String {
    SelectionKey {
        source: SOURCE.to_string(),
        path: format!("{}/{}", dir, file),
        entryname: entry.to_string(),
        mtime,
    }
    .encode()
}

pub fn pathlist(dir: &str) -> Vec<String> {
    dir.split('/').map(str::to_string).collect()
}
