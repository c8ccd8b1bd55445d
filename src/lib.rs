extern crate serde;
extern crate serde_json;

extern crate itertools;
#[macro_use]
extern crate lazy_static;
extern crate lexical_sort;
extern crate regex;
#[macro_use]
extern crate tracing;

#[cfg(not(target_arch = "wasm32"))]
extern crate tracing_subscriber;
#[cfg(not(target_arch = "wasm32"))]
extern crate uuid;

pub mod category_tree;
pub mod decorate;
pub mod file_format;
pub mod instrument;
pub mod nav_state;
pub mod plottable;
pub mod selection;

#[cfg(not(target_arch = "wasm32"))]
pub mod abstract_server;
#[cfg(not(target_arch = "wasm32"))]
pub mod config;
#[cfg(not(target_arch = "wasm32"))]
pub mod logging;
#[cfg(not(target_arch = "wasm32"))]
pub mod session;
