use std::{collections::BTreeMap, fmt::Debug};

use serde::Serialize;

use crate::{
    category_tree::{
        node::CategoryNode,
        walk::{for_each_pre_order_mut, NodeIndex, TreeWalk},
    },
    file_format::entry::{Entry, FileObjs},
};

use super::markup::NodeMarkup;

/// Closed interval of axis values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    /// Extent of `values`, ignoring NaNs; `None` if nothing is left.
    pub fn of(values: &[f64]) -> Option<AxisRange> {
        values
            .iter()
            .filter(|v| !v.is_nan())
            .fold(None, |acc: Option<AxisRange>, &v| {
                Some(match acc {
                    Some(r) => AxisRange {
                        min: r.min.min(v),
                        max: r.max.max(v),
                    },
                    None => AxisRange { min: v, max: v },
                })
            })
    }

    pub fn union(self, other: AxisRange) -> AxisRange {
        AxisRange {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// What decorators have decided about one node so far.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct NodeAnnotation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<AxisRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub markup: Vec<NodeMarkup>,
}

/// Accumulated annotations, keyed by pre-order position.  Each decorator
/// receives the map its predecessors produced and returns the next one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Annotations {
    by_node: BTreeMap<NodeIndex, NodeAnnotation>,
}

impl Annotations {
    pub fn new() -> Self {
        Annotations {
            by_node: BTreeMap::new(),
        }
    }

    pub fn get(&self, idx: NodeIndex) -> Option<&NodeAnnotation> {
        self.by_node.get(&idx)
    }

    pub fn node_mut(&mut self, idx: NodeIndex) -> &mut NodeAnnotation {
        self.by_node.entry(idx).or_default()
    }

    pub fn range(&self, idx: NodeIndex) -> Option<AxisRange> {
        self.get(idx).and_then(|a| a.range)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeIndex, &NodeAnnotation)> {
        self.by_node.iter()
    }

    pub fn len(&self) -> usize {
        self.by_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_node.is_empty()
    }
}

/// Read-only view of the built tree plus the file objects it came from.
pub struct DecorationContext<'a> {
    pub walk: &'a TreeWalk<'a>,
    pub file_objs: &'a FileObjs,
}

impl<'a> DecorationContext<'a> {
    /// Leaves paired with the entries they were built from.  Leaves whose
    /// entry can't be found are skipped so one bad record can't blank the
    /// whole tree.
    pub fn leaf_entries(&self) -> Vec<(NodeIndex, &'a CategoryNode, &'a Entry)> {
        let file_objs = self.file_objs;
        self.walk
            .leaf_list()
            .filter_map(|(idx, leaf)| {
                let fileinfo = leaf.fileinfo.as_ref()?;
                match file_objs.find_entry(fileinfo) {
                    Some(entry) => Some((idx, leaf, entry)),
                    None => {
                        trace!(leaf = %leaf.id, "no entry for leaf; skipping");
                        None
                    }
                }
            })
            .collect()
    }
}

/// A post-build pass that derives display metadata for tree nodes.
pub trait Decorator: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn decorate(&self, ctx: &DecorationContext, annotations: Annotations) -> Annotations;
}

/// Ordered list of decorators.  They run synchronously in registration
/// order and each sees everything the earlier ones produced.
#[derive(Debug, Default)]
pub struct DecorationPipeline {
    decorators: Vec<Box<dyn Decorator>>,
}

impl DecorationPipeline {
    pub fn new() -> Self {
        DecorationPipeline { decorators: vec![] }
    }

    pub fn register(&mut self, decorator: Box<dyn Decorator>) -> &mut Self {
        self.decorators.push(decorator);
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.decorators.iter().map(|d| d.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.decorators.is_empty()
    }

    /// Run every decorator over `tree`, threading the annotations through.
    pub fn run(&self, tree: &[CategoryNode], file_objs: &FileObjs) -> Annotations {
        let walk = TreeWalk::new(tree);
        let ctx = DecorationContext {
            walk: &walk,
            file_objs,
        };

        let mut annotations = Annotations::new();
        for decorator in &self.decorators {
            let span = trace_span!("run_decorator", decorator = decorator.name());
            let _span_guard = span.enter();
            annotations = decorator.decorate(&ctx, annotations);
            trace!(annotated = annotations.len());
        }
        annotations
    }

    /// Run the pipeline and fold its annotations into the tree.
    pub fn decorate_tree(
        &self,
        mut tree: Vec<CategoryNode>,
        file_objs: &FileObjs,
    ) -> Vec<CategoryNode> {
        let annotations = self.run(&tree, file_objs);
        render_annotations(&mut tree, &annotations);
        tree
    }
}

/// Apply annotations to the tree they were computed for: markup is appended
/// to the node text in order and titles replace any existing title.
pub fn render_annotations(tree: &mut [CategoryNode], annotations: &Annotations) {
    for_each_pre_order_mut(tree, &mut |idx, node| {
        if let Some(annotation) = annotations.get(idx) {
            for markup in &annotation.markup {
                node.text.push_str(&markup.render_html());
            }
            if let Some(title) = &annotation.title {
                node.title = Some(title.clone());
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        category_tree::builder::file_objs_to_tree,
        decorate::{range::PropagateAxisRange, sample_description::SampleDescription},
        file_format::key_path::{CategoryKeyList, KeyPath},
    };
    use serde_json::{json, Value};

    #[test]
    fn test_axis_range() {
        assert_eq!(
            AxisRange::of(&[1.0, 2.0, 3.0, 9.0]),
            Some(AxisRange { min: 1.0, max: 9.0 })
        );
        assert_eq!(AxisRange::of(&[]), None);
        assert_eq!(AxisRange::of(&[f64::NAN]), None);
        let merged = AxisRange { min: 1.0, max: 9.0 }.union(AxisRange { min: 0.0, max: 5.0 });
        assert_eq!(merged, AxisRange { min: 0.0, max: 9.0 });
    }

    #[derive(Debug)]
    struct Tag(&'static str);

    impl Decorator for Tag {
        fn name(&self) -> &'static str {
            self.0
        }

        fn decorate(&self, ctx: &DecorationContext, mut annotations: Annotations) -> Annotations {
            for (idx, _) in ctx.walk.node_list() {
                let prior = annotations
                    .get(idx)
                    .and_then(|a| a.title.clone())
                    .unwrap_or_default();
                annotations.node_mut(idx).title = Some(format!("{}{}", prior, self.0));
            }
            annotations
        }
    }

    #[test]
    fn test_decorators_run_in_registration_order() {
        let tree = vec![CategoryNode::branch("root:a".to_string(), "a".to_string())];
        let mut pipeline = DecorationPipeline::new();
        pipeline.register(Box::new(Tag("1"))).register(Box::new(Tag("2")));
        assert_eq!(pipeline.names(), vec!["1", "2"]);

        let decorated = pipeline.decorate_tree(tree, &FileObjs::new());
        assert_eq!(decorated[0].title.as_deref(), Some("12"));
    }

    #[test]
    fn test_leaf_without_entry_is_skipped() {
        let entry = |description: &str, x: Value| {
            Entry::from_value(json!({
                "entry": "e1", "mtime": 1, "x": x,
                "sample": {"name": "S1", "description": description}
            }))
            .unwrap()
        };
        let mut objs = FileObjs::new();
        objs.insert("a.nxz", vec![entry("kept", json!([1, 2]))]);
        objs.insert("b.nxz", vec![entry("gone", json!([5, 9]))]);
        let categories = CategoryKeyList::from_paths(&["sample/name", "entry"]).unwrap();
        let tree = file_objs_to_tree(&objs, &categories, "ncnr");

        // Decorate against file objects that no longer have b.nxz.
        let mut reloaded = FileObjs::new();
        reloaded.insert("a.nxz", objs.get("a.nxz").unwrap().entries.clone());

        let mut pipeline = DecorationPipeline::new();
        pipeline
            .register(Box::new(PropagateAxisRange {
                axis: KeyPath::parse("x").unwrap(),
                propagate_up_levels: 2,
            }))
            .register(Box::new(SampleDescription::default()));
        let annotations = pipeline.run(&tree, &reloaded);

        let walk = TreeWalk::new(&tree);
        let s1 = walk.index_of("root:S1").unwrap();
        let a = walk.index_of(r#"["ncnr","a.nxz","e1",1]"#).unwrap();
        let b = walk.index_of(r#"["ncnr","b.nxz","e1",1]"#).unwrap();
        let title = |idx| annotations.get(idx).and_then(|n| n.title.as_deref());

        assert_eq!(annotations.range(a), Some(AxisRange { min: 1.0, max: 2.0 }));
        assert_eq!(title(a), Some("kept"));
        assert!(annotations.get(b).is_none());
        assert_eq!(annotations.range(s1), Some(AxisRange { min: 1.0, max: 2.0 }));
        assert_eq!(title(s1), Some("kept"));
    }
}
