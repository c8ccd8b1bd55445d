use crate::file_format::key_path::KeyPath;

use super::{
    markup::NodeMarkup,
    pipeline::{Annotations, AxisRange, DecorationContext, Decorator},
};

pub const DEFAULT_PROPAGATE_UP_LEVELS: usize = 2;
pub const DEFAULT_ICON_WIDTH: f64 = 75.0;

/// Record each leaf's extent along `axis`, then widen the ranges of up to
/// `propagate_up_levels` of its ancestors to cover it.  Leaves with no
/// numeric axis data are skipped.
#[derive(Debug)]
pub struct PropagateAxisRange {
    pub axis: KeyPath,
    pub propagate_up_levels: usize,
}

impl Decorator for PropagateAxisRange {
    fn name(&self) -> &'static str {
        "propagate_axis_range"
    }

    fn decorate(&self, ctx: &DecorationContext, mut annotations: Annotations) -> Annotations {
        for (idx, leaf, entry) in ctx.leaf_entries() {
            let extent = match AxisRange::of(&entry.lookup(&self.axis).numbers()) {
                Some(extent) => extent,
                None => {
                    trace!(leaf = %leaf.id, axis = %self.axis, "no axis values");
                    continue;
                }
            };

            annotations.node_mut(idx).range = Some(extent);
            for ancestor in ctx.walk.ancestors(idx, self.propagate_up_levels) {
                let node = annotations.node_mut(ancestor);
                node.range = Some(match node.range {
                    Some(existing) => existing.union(extent),
                    None => extent,
                });
            }
        }
        annotations
    }
}

/// The bar for a node whose range is `own` inside a parent spanning
/// `parent`; width and offset are proportional to the parent's span.  A
/// parent with zero span gets a full-width bar.
pub fn range_bar(parent: AxisRange, own: AxisRange, icon_width: f64) -> NodeMarkup {
    let span = parent.span();
    let (rel_width, rel_offset) = if span == 0.0 {
        (1.0, 0.0)
    } else {
        (
            (own.span() / span).abs(),
            ((own.min - parent.min) / span).abs(),
        )
    };
    NodeMarkup::RangeBar {
        icon_width,
        width: icon_width * rel_width,
        offset: icon_width * rel_offset,
    }
}

/// For every node whose own and parent's ranges are known, add a range bar
/// showing where the node sits within its parent.  Needs the ranges from
/// `PropagateAxisRange`, so it must be registered after it.
#[derive(Debug)]
pub struct RangeBars {
    pub icon_width: f64,
}

impl Decorator for RangeBars {
    fn name(&self) -> &'static str {
        "range_bars"
    }

    fn decorate(&self, ctx: &DecorationContext, mut annotations: Annotations) -> Annotations {
        for (idx, _node) in ctx.walk.node_list() {
            let parent = match ctx.walk.parent(idx) {
                Some(parent) => parent,
                None => continue,
            };
            if let (Some(own), Some(parent_range)) =
                (annotations.range(idx), annotations.range(parent))
            {
                let bar = range_bar(parent_range, own, self.icon_width);
                annotations.node_mut(idx).markup.push(bar);
            }
        }
        annotations
    }
}
