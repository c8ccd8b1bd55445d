//! Post-build passes that annotate a category tree with display metadata
//! (range indicators, titles, viewer links) without the builder knowing
//! about any of them.
//!
//! Decorators never mutate the tree.  Each one reads a `TreeWalk` snapshot
//! plus the annotations produced so far and returns the next annotations;
//! `render_annotations` folds the final result into the tree once all of
//! them have run.

pub mod markup;
pub mod pipeline;
pub mod range;
pub mod sample_description;
pub mod viewer_link;

pub use markup::NodeMarkup;
pub use pipeline::{
    render_annotations, Annotations, AxisRange, DecorationContext, DecorationPipeline, Decorator,
    NodeAnnotation,
};
