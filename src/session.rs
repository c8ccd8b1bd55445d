//! One user's browsing session: the open datasources with their decorated
//! trees, the active instrument, and the plot currently on display.
//!
//! Every operation computes its result first and only then swaps it into
//! the session state, so a failed browse or plot leaves whatever was shown
//! before untouched.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::Instrument as _;

use crate::{
    abstract_server::{AbstractServer, ErrorDetails, ErrorLayer, FileListing, Result, ServerError},
    category_tree::{builder::file_objs_to_tree, node::CategoryNode},
    file_format::{
        entry::{Entry, FileObjs},
        template::{CalcResult, FileListItem, ReturnType},
    },
    instrument::{Instrument, InstrumentRegistry},
    nav_state::{NavState, SourcePath},
    plottable::Plottable,
    selection::{decode_keys, keys_for_fileinfo, LoaderFileInfo, PlotRequests},
};

/// What the browser shows for one datasource.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DataSourceView {
    pub name: String,
    pub pathlist: Vec<String>,
    pub treedata: Vec<CategoryNode>,
    pub subdirs: Vec<String>,
}

impl DataSourceView {
    pub fn source_path(&self) -> SourcePath {
        SourcePath {
            source: self.name.clone(),
            path: self.pathlist.join("/"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PlotOutcome {
    /// The plot is now the active plot.
    Rendered(Plottable),
    /// A later selection started before this one finished; the result was
    /// dropped.
    Superseded,
    /// The instrument has nothing to draw for this selection.
    NoPlot,
}

#[derive(Debug)]
struct SessionState {
    instrument_id: String,
    datasources: Vec<DataSourceView>,
    active_plot: Option<Plottable>,
}

pub struct BrowserSession {
    server: Arc<dyn AbstractServer + Send + Sync>,
    instruments: InstrumentRegistry,
    state: Mutex<SessionState>,
    plot_requests: PlotRequests,
}

fn bad_input(message: String) -> ServerError {
    ServerError::StickyProblem(ErrorDetails {
        layer: ErrorLayer::BadInput,
        message,
    })
}

/// Full path of a listed file, relative to its datasource.
fn join_path(path: &str, filename: &str) -> String {
    if path.is_empty() {
        filename.to_string()
    } else {
        format!("{}/{}", path, filename)
    }
}

impl BrowserSession {
    pub fn new(
        server: Arc<dyn AbstractServer + Send + Sync>,
        instruments: InstrumentRegistry,
        instrument_id: &str,
    ) -> Result<BrowserSession> {
        if instruments.get(instrument_id).is_none() {
            return Err(bad_input(format!("unknown instrument: {}", instrument_id)));
        }
        Ok(BrowserSession {
            server,
            instruments,
            state: Mutex::new(SessionState {
                instrument_id: instrument_id.to_string(),
                datasources: vec![],
                active_plot: None,
            }),
            plot_requests: PlotRequests::new(),
        })
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn instrument_id(&self) -> String {
        self.state().instrument_id.clone()
    }

    pub fn instrument(&self) -> Result<Arc<dyn Instrument>> {
        let id = self.instrument_id();
        self.instruments
            .get(&id)
            .ok_or_else(|| bad_input(format!("unknown instrument: {}", id)))
    }

    /// Switch instruments.  Trees already on display keep the categories
    /// they were built with until they're next browsed.
    pub fn set_instrument(&self, instrument_id: &str) -> Result<()> {
        if self.instruments.get(instrument_id).is_none() {
            return Err(bad_input(format!("unknown instrument: {}", instrument_id)));
        }
        self.state().instrument_id = instrument_id.to_string();
        Ok(())
    }

    /// Load every file in `listing` with the instrument's loader in a single
    /// calculation, keyed by `<path>/<filename>`, with each entry stamped
    /// with its file's mtime.  Records that aren't usable entries are
    /// skipped so the rest of the directory still shows.
    pub async fn load_metadata(
        &self,
        listing: &FileListing,
        datasource: &str,
        path: &str,
    ) -> Result<FileObjs> {
        let instrument = self.instrument()?;
        self.load_with(instrument.as_ref(), listing, datasource, path).await
    }

    async fn load_with(
        &self,
        instrument: &dyn Instrument,
        listing: &FileListing,
        datasource: &str,
        path: &str,
    ) -> Result<FileObjs> {
        let files: Vec<FileListItem> = listing
            .files_metadata
            .iter()
            .map(|f| FileListItem {
                path: join_path(path, &f.name),
                source: datasource.to_string(),
                mtime: f.mtime,
            })
            .collect();

        let mut file_objs = FileObjs::new();
        if files.is_empty() {
            return Ok(file_objs);
        }

        let request = instrument.loader_request(&files, ReturnType::Metadata);
        let results = self
            .server
            .calculate(&request)
            .instrument(trace_span!("calculate", files = files.len()))
            .await?;
        if results.len() != files.len() {
            return Err(ServerError::StickyProblem(ErrorDetails {
                layer: ErrorLayer::ServerLayer,
                message: format!(
                    "loader returned {} results for {} files",
                    results.len(),
                    files.len()
                ),
            }));
        }

        for (file, result) in files.iter().zip(results) {
            let mut entries = vec![];
            for value in result.values {
                match Entry::from_loaded_value(value, file.mtime) {
                    Ok(entry) => entries.push(entry),
                    Err(err) => {
                        warn!(path = %file.path, err = %err, "skipping malformed record")
                    }
                }
            }
            trace!(path = %file.path, entries = entries.len());
            file_objs.insert(&file.path, entries);
        }
        Ok(file_objs)
    }

    /// Load, categorize and decorate the files of one listing.
    pub async fn categorize_files(
        &self,
        listing: &FileListing,
        datasource: &str,
        path: &str,
    ) -> Result<Vec<CategoryNode>> {
        let instrument = self.instrument()?;
        self.categorize_with(instrument.as_ref(), listing, datasource, path).await
    }

    async fn categorize_with(
        &self,
        instrument: &dyn Instrument,
        listing: &FileListing,
        datasource: &str,
        path: &str,
    ) -> Result<Vec<CategoryNode>> {
        let file_objs = self.load_with(instrument, listing, datasource, path).await?;
        let tree = file_objs_to_tree(&file_objs, instrument.categories(), datasource);
        Ok(instrument.decorators().decorate_tree(tree, &file_objs))
    }

    /// Fetch and build the view of one datasource path without touching
    /// session state.
    pub async fn browse(&self, source: &str, pathlist: &[String]) -> Result<DataSourceView> {
        let instrument = self.instrument()?;
        self.browse_with(instrument.as_ref(), source, pathlist).await
    }

    async fn browse_with(
        &self,
        instrument: &dyn Instrument,
        source: &str,
        pathlist: &[String],
    ) -> Result<DataSourceView> {
        let span = trace_span!("browse", source, path = %pathlist.join("/"));
        match self.build_view(instrument, source, pathlist).instrument(span).await {
            Ok(view) => Ok(view),
            Err(err) => {
                trace!(err = ?err);
                Err(err)
            }
        }
    }

    async fn build_view(
        &self,
        instrument: &dyn Instrument,
        source: &str,
        pathlist: &[String],
    ) -> Result<DataSourceView> {
        let path = pathlist.join("/");
        let listing = self.server.get_file_metadata(source, pathlist).await?;
        let treedata = self.categorize_with(instrument, &listing, source, &path).await?;
        info!(
            files = listing.files_metadata.len(),
            subdirs = listing.subdirs.len(),
            "browsed"
        );
        Ok(DataSourceView {
            name: source.to_string(),
            pathlist: pathlist.to_vec(),
            treedata,
            subdirs: listing.subdirs,
        })
    }

    /// Open a datasource; the newest one is listed first.
    pub async fn add_data_source(&self, source: &str, pathlist: &[String]) -> Result<()> {
        let view = self.browse(source, pathlist).await?;
        self.state().datasources.insert(0, view);
        Ok(())
    }

    /// Point the datasource at `index` somewhere else.
    pub async fn path_change(&self, index: usize, source: &str, pathlist: &[String]) -> Result<()> {
        let view = self.browse(source, pathlist).await?;
        let mut state = self.state();
        match state.datasources.get_mut(index) {
            Some(slot) => {
                *slot = view;
                Ok(())
            }
            None => Err(bad_input(format!("no datasource at index {}", index))),
        }
    }

    pub fn datasources(&self) -> Vec<DataSourceView> {
        self.state().datasources.clone()
    }

    pub fn all_browser_source_paths(&self) -> Vec<SourcePath> {
        self.state()
            .datasources
            .iter()
            .map(DataSourceView::source_path)
            .collect()
    }

    pub fn navigation_state(&self) -> NavState {
        let state = self.state();
        NavState {
            instrument: state.instrument_id.clone(),
            sources: state
                .datasources
                .iter()
                .map(DataSourceView::source_path)
                .collect(),
        }
    }

    /// Rebuild the session a navigation string describes.  Everything is
    /// fetched with the requested instrument before anything is replaced;
    /// the session keeps its current instrument until then.
    pub async fn restore(&self, nav: &NavState) -> Result<()> {
        let instrument = self
            .instruments
            .get(&nav.instrument)
            .ok_or_else(|| bad_input(format!("unknown instrument: {}", nav.instrument)))?;

        let mut views = vec![];
        for sp in &nav.sources {
            let view = self
                .browse_with(instrument.as_ref(), &sp.source, &sp.pathlist())
                .await?;
            views.push(view);
        }

        let mut state = self.state();
        state.instrument_id = nav.instrument.clone();
        state.datasources = views;
        Ok(())
    }

    pub fn active_plot(&self) -> Option<Plottable> {
        self.state().active_plot.clone()
    }

    /// Plot the checked leaves.  Each key names one entry; its file is loaded
    /// through the instrument loader, the named entry is picked out of the
    /// result, and the instrument's plot function draws all of them.
    ///
    /// Only the most recently started call may change the active plot.
    pub async fn handle_checked<S: AsRef<str>>(&self, keys: &[S]) -> Result<PlotOutcome> {
        let ticket = self.plot_requests.begin();
        let span = trace_span!("handle_checked", keys = keys.len());
        let plottable = match self.plot_selection(keys).instrument(span).await {
            Ok(plottable) => plottable,
            Err(err) => {
                trace!(err = ?err);
                return Err(err);
            }
        };

        let mut state = self.state();
        if !self.plot_requests.is_current(ticket) {
            warn!("superseded by a later selection");
            return Ok(PlotOutcome::Superseded);
        }
        match plottable {
            Some(plottable) => {
                state.active_plot = Some(plottable.clone());
                Ok(PlotOutcome::Rendered(plottable))
            }
            None => {
                if keys.is_empty() {
                    state.active_plot = None;
                }
                Ok(PlotOutcome::NoPlot)
            }
        }
    }

    async fn plot_selection<S: AsRef<str>>(&self, keys: &[S]) -> Result<Option<Plottable>> {
        let instrument = self.instrument()?;
        let fileinfo: Vec<LoaderFileInfo> = decode_keys(keys)?
            .iter()
            .map(|k| k.loader_fileinfo())
            .collect();
        if fileinfo.is_empty() {
            return Ok(None);
        }

        let files: Vec<FileListItem> =
            fileinfo.iter().map(LoaderFileInfo::file_list_item).collect();
        let request = instrument.loader_request(&files, ReturnType::Plottable);
        let results = self.server.calculate(&request).await?;
        Ok(instrument.plot(&pick_entries(&fileinfo, results)))
    }

    /// Plot the files a module's configuration refers to, using the first
    /// listed entry of each.
    pub async fn fileinfo_update(&self, infos: &[LoaderFileInfo]) -> Result<PlotOutcome> {
        let keys = keys_for_fileinfo(infos);
        self.handle_checked(&keys).await
    }
}

/// From per-file loader results, keep the one entry each selection asked
/// for.  The combined result takes the first file's datatype.
fn pick_entries(fileinfo: &[LoaderFileInfo], results: Vec<CalcResult>) -> CalcResult {
    let datatype = results
        .first()
        .map(|r| r.datatype.clone())
        .unwrap_or_default();
    let values = fileinfo
        .iter()
        .zip(results)
        .filter_map(|(fi, result)| {
            let wanted = fi.entries.first()?;
            let found = result
                .values
                .into_iter()
                .find(|v| v.get("entry").and_then(|e| e.as_str()) == Some(wanted.as_str()));
            if found.is_none() {
                warn!(path = %fi.path, entry = %wanted, "entry missing from loaded file");
            }
            found
        })
        .collect();
    CalcResult { datatype, values }
}
