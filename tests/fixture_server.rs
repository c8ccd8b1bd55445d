mod common;

use std::sync::Arc;

use serde_json::json;
use tokio::fs::write;
use webreduce::{
    abstract_server::{make_memory_server, AbstractServer},
    session::BrowserSession,
};

use common::{refl_entry, registry};

#[tokio::test]
async fn test_fixture_file_serves_a_browse() -> Result<(), std::io::Error> {
    let fixture = json!({
        "directories": [{
            "source": "ncnr",
            "path": "ncnrdata/magik",
            "files_metadata": {"z10.nxz": 20, "z9.nxz": 10},
            "subdirs": ["2016"]
        }],
        "files": [
            {"source": "ncnr", "path": "ncnrdata/magik/z10.nxz", "datatype": "ncnr.refl.refldata",
             "values": [refl_entry("e1", json!({"name": "Au"}), "specular", "z10", vec![1.0])]},
            {"source": "ncnr", "path": "ncnrdata/magik/z9.nxz", "datatype": "ncnr.refl.refldata",
             "values": [refl_entry("e1", json!({"name": "Au"}), "specular", "z9", vec![2.0])]}
        ]
    });
    let path = std::env::temp_dir().join(format!("webreduce-fixture-{}.json", std::process::id()));
    write(&path, fixture.to_string()).await?;

    let server = make_memory_server(&path.to_string_lossy()).await.unwrap();
    let server: Arc<dyn AbstractServer + Send + Sync> = Arc::from(server);
    let session = BrowserSession::new(server, registry(), "ncnr.refl").unwrap();
    let view = session
        .browse("ncnr", &["ncnrdata".to_string(), "magik".to_string()])
        .await
        .unwrap();

    // Files keep the listing's order; the builder never sorts.
    let names: Vec<&str> = view.treedata[0].children[0]
        .children
        .iter()
        .map(|n| n.id.as_str())
        .collect();
    assert_eq!(names, vec!["root:Au:specular:z10", "root:Au:specular:z9"]);
    assert_eq!(view.subdirs, vec!["2016".to_string()]);

    tokio::fs::remove_file(&path).await?;
    assert!(make_memory_server(&path.to_string_lossy()).await.is_err());
    Ok(())
}
