use crate::file_format::key_path::KeyPath;

use super::pipeline::{Annotations, DecorationContext, Decorator};

/// Use the entry's sample description as the hover title of its leaf and of
/// the leaf's parent.  When several leaves share a parent, the last one
/// visited wins.
#[derive(Debug)]
pub struct SampleDescription {
    pub description: KeyPath,
}

impl Default for SampleDescription {
    fn default() -> Self {
        SampleDescription {
            description: KeyPath::literal(&["sample", "description"]),
        }
    }
}

impl Decorator for SampleDescription {
    fn name(&self) -> &'static str {
        "sample_description"
    }

    fn decorate(&self, ctx: &DecorationContext, mut annotations: Annotations) -> Annotations {
        for (idx, _leaf, entry) in ctx.leaf_entries() {
            let description = match entry.lookup(&self.description).as_str() {
                Some(d) => d.to_string(),
                None => continue,
            };
            if let Some(parent) = ctx.walk.parent(idx) {
                annotations.node_mut(parent).title = Some(description.clone());
            }
            annotations.node_mut(idx).title = Some(description);
        }
        annotations
    }
}
