mod common;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;
use webreduce::{
    abstract_server::{AbstractServer, FileListing, MemoryServer, Result},
    decorate::DecorationPipeline,
    file_format::{
        key_path::CategoryKeyList,
        template::{CalcRequest, CalcResult, FileListItem, ReturnType},
    },
    instrument::{Instrument, NcnrRefl, NcnrReflOptions},
    nav_state::{NavState, SourcePath},
    plottable::Plottable,
    session::{BrowserSession, PlotOutcome},
};

use common::{fixture_server, key, registry, DIR, OTHER_DIR, SOURCE};

/// Holds back any calculation touching `slow_path` until released, so a
/// later selection can overtake it.
struct GatedServer {
    inner: MemoryServer,
    slow_path: String,
    started: Notify,
    release: Notify,
}

#[async_trait]
impl AbstractServer for GatedServer {
    async fn get_file_metadata(&self, source: &str, pathlist: &[String]) -> Result<FileListing> {
        self.inner.get_file_metadata(source, pathlist).await
    }

    async fn calculate(&self, request: &CalcRequest) -> Result<Vec<CalcResult>> {
        if request.filelist().iter().any(|f| f.path == self.slow_path) {
            self.started.notify_one();
            self.release.notified().await;
        }
        self.inner.calculate(request).await
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stale_plot_is_superseded() {
    let gate = Arc::new(GatedServer {
        inner: fixture_server(),
        slow_path: format!("{}/a.nxz.cgd", DIR),
        started: Notify::new(),
        release: Notify::new(),
    });
    let session = Arc::new(BrowserSession::new(gate.clone(), registry(), "ncnr.refl").unwrap());

    let slow = tokio::spawn({
        let session = session.clone();
        let keys = vec![key(DIR, "a.nxz.cgd", "e1", 100)];
        async move { session.handle_checked(&keys).await }
    });
    gate.started.notified().await;

    let fast = session
        .handle_checked(&[key(OTHER_DIR, "c.nxz.cgd", "e1", 300)])
        .await
        .unwrap();
    let fast_plot = match fast {
        PlotOutcome::Rendered(plottable) => plottable,
        other => panic!("expected the later selection to render, got {:?}", other),
    };

    gate.release.notify_one();
    let slow = slow.await.unwrap().unwrap();
    assert_eq!(slow, PlotOutcome::Superseded);

    // The overtaken request must not clobber what the later one showed.
    assert_eq!(session.active_plot(), Some(fast_plot));
}

#[tokio::test]
async fn test_sequential_plots_each_render() {
    let session = BrowserSession::new(Arc::new(fixture_server()), registry(), "ncnr.refl").unwrap();
    for k in &[
        key(DIR, "a.nxz.cgd", "e1", 100),
        key(OTHER_DIR, "c.nxz.cgd", "e1", 300),
    ] {
        match session.handle_checked(&[k.clone()]).await.unwrap() {
            PlotOutcome::Rendered(plottable) => {
                assert_eq!(session.active_plot(), Some(plottable))
            }
            other => panic!("expected a plot, got {:?}", other),
        }
    }
}

/// The reflectometry instrument under another id, so a session has two to
/// switch between.
#[derive(Debug)]
struct Renamed(NcnrRefl);

impl Instrument for Renamed {
    fn id(&self) -> &str {
        "ncnr.refl.alt"
    }

    fn categories(&self) -> &CategoryKeyList {
        self.0.categories()
    }

    fn decorators(&self) -> &DecorationPipeline {
        self.0.decorators()
    }

    fn loader_request(&self, files: &[FileListItem], return_type: ReturnType) -> CalcRequest {
        self.0.loader_request(files, return_type)
    }

    fn plot(&self, result: &CalcResult) -> Option<Plottable> {
        self.0.plot(result)
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_restore_switches_instrument_only_when_done() {
    let gate = Arc::new(GatedServer {
        inner: fixture_server(),
        slow_path: format!("{}/a.nxz.cgd", DIR),
        started: Notify::new(),
        release: Notify::new(),
    });
    let mut instruments = registry();
    instruments.register(Arc::new(Renamed(NcnrRefl::new(NcnrReflOptions::default()))));
    let session = Arc::new(BrowserSession::new(gate.clone(), instruments, "ncnr.refl").unwrap());

    let restore = tokio::spawn({
        let session = session.clone();
        let nav = NavState {
            instrument: "ncnr.refl.alt".to_string(),
            sources: vec![SourcePath::new(SOURCE, DIR)],
        };
        async move { session.restore(&nav).await }
    });
    gate.started.notified().await;

    // Mid-restore, everything else still sees the old instrument.
    assert_eq!(session.instrument_id(), "ncnr.refl");
    assert!(session.datasources().is_empty());

    gate.release.notify_one();
    restore.await.unwrap().unwrap();
    assert_eq!(session.instrument_id(), "ncnr.refl.alt");
    assert_eq!(session.datasources().len(), 1);
}
