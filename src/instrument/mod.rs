//! Instrument plugins: how a given instrument's entries are categorized,
//! decorated, loaded and plotted.
//!
//! Instruments are looked up through an explicit `InstrumentRegistry` owned
//! by whoever drives the browser, rather than a process-wide table.

use std::{collections::BTreeMap, fmt::Debug, sync::Arc};

use crate::{
    decorate::DecorationPipeline,
    file_format::{
        key_path::CategoryKeyList,
        template::{CalcRequest, CalcResult, FileListItem, ReturnType},
    },
    plottable::Plottable,
};

pub mod ncnr_refl;

pub use ncnr_refl::{NcnrRefl, NcnrReflOptions};

pub trait Instrument: Debug + Send + Sync {
    fn id(&self) -> &str;

    /// One key-path list per tree level; the last level labels the leaves.
    fn categories(&self) -> &CategoryKeyList;

    /// Decorators to run over every freshly built tree, in order.
    fn decorators(&self) -> &DecorationPipeline;

    /// A calculation that loads every file in `files` and yields one result
    /// per file, in the same order.
    fn loader_request(&self, files: &[FileListItem], return_type: ReturnType) -> CalcRequest;

    /// Turn a calculation result into something drawable, if this instrument
    /// knows how to draw its datatype.
    fn plot(&self, result: &CalcResult) -> Option<Plottable>;
}

/// The instruments a session can switch between, keyed by id.
#[derive(Clone, Debug, Default)]
pub struct InstrumentRegistry {
    instruments: BTreeMap<String, Arc<dyn Instrument>>,
}

impl InstrumentRegistry {
    pub fn new() -> Self {
        InstrumentRegistry {
            instruments: BTreeMap::new(),
        }
    }

    /// A registry holding every built-in instrument.
    pub fn with_defaults(refl_options: NcnrReflOptions) -> Self {
        let mut registry = InstrumentRegistry::new();
        registry.register(Arc::new(NcnrRefl::new(refl_options)));
        registry
    }

    /// Add an instrument, replacing any previous one with the same id.
    pub fn register(&mut self, instrument: Arc<dyn Instrument>) {
        self.instruments
            .insert(instrument.id().to_string(), instrument);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Instrument>> {
        self.instruments.get(id).cloned()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.instruments.keys().map(String::as_str).collect()
    }
}
