use crate::{
    file_format::{
        entry::{FileInfo, FileObjs},
        key_path::{CategoryKeyList, CATEGORY_SEPARATOR},
    },
    selection::SelectionKey,
};

use super::node::CategoryNode;

/// Id of the implicit root; every interior node id starts with it.
pub const ROOT_ID: &str = "root";

/// Find the interior child `id` among `siblings`, appending a fresh one if
/// it doesn't exist yet, and return its children so the caller can descend.
fn descend<'a>(
    siblings: &'a mut Vec<CategoryNode>,
    id: String,
    category: &str,
) -> &'a mut Vec<CategoryNode> {
    let idx = match siblings
        .iter()
        .position(|n| n.fileinfo.is_none() && n.id == id)
    {
        Some(idx) => idx,
        None => {
            siblings.push(CategoryNode::branch(id, category.to_string()));
            siblings.len() - 1
        }
    };
    &mut siblings[idx].children
}

/// Group every entry of `file_objs` into a tree whose depth is the number of
/// category levels.
///
/// For each entry the first `n - 1` levels pick (or create) interior nodes
/// whose ids concatenate the ancestor categories (`root:S1:specular`), so
/// entries sharing a category prefix share the ancestor chain.  The final
/// level always creates a new leaf, whose id is the entry's selection key so
/// it is unique even when two entries share every category string.
///
/// Children keep first-seen order; nothing is sorted.  The root itself is
/// not returned, only its children.
pub fn file_objs_to_tree(
    file_objs: &FileObjs,
    categories: &CategoryKeyList,
    datasource: &str,
) -> Vec<CategoryNode> {
    let span = trace_span!("file_objs_to_tree", datasource, files = file_objs.by_file.len());
    let _span_guard = span.enter();

    let mut top: Vec<CategoryNode> = vec![];
    let interior_levels = categories.depth() - 1;

    for file in &file_objs.by_file {
        for entry in &file.entries {
            let mut cats = categories.categorize(entry.fields());
            let leaf_text = cats.pop().unwrap_or_default();

            let mut parent_id = ROOT_ID.to_string();
            let mut branch = &mut top;
            for category in cats.iter().take(interior_levels) {
                let id = format!("{}{}{}", parent_id, CATEGORY_SEPARATOR, category);
                branch = descend(branch, id.clone(), category);
                parent_id = id;
            }

            let key = SelectionKey {
                source: datasource.to_string(),
                path: file.path.clone(),
                entryname: entry.name().to_string(),
                mtime: entry.mtime(),
            };
            let fileinfo = FileInfo {
                filename: file.path.clone(),
                entryname: entry.name().to_string(),
                mtime: entry.mtime(),
                source: datasource.to_string(),
            };
            branch.push(CategoryNode::leaf(key.encode(), leaf_text, fileinfo));
        }
    }

    trace!(
        entries = file_objs.entry_count(),
        top_level = top.len(),
        "built category tree"
    );
    top
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        category_tree::node::count_nodes,
        file_format::{entry::Entry, key_path::ABSENT_CATEGORY},
    };
    use serde_json::{json, Value};
    use std::collections::HashSet;

    fn objs(files: &[(&str, Vec<Value>)]) -> FileObjs {
        let mut objs = FileObjs::new();
        for (path, values) in files {
            objs.insert(
                path,
                values
                    .iter()
                    .map(|v| Entry::from_value(v.clone()).unwrap())
                    .collect(),
            );
        }
        objs
    }

    fn refl_categories() -> CategoryKeyList {
        CategoryKeyList::from_paths(&["sample/name", "intent", "entry"]).unwrap()
    }

    #[test]
    fn test_single_entry_tree() {
        let file_objs = objs(&[(
            "a.nxz",
            vec![json!({
                "entry": "e1", "intent": "specular", "sample": {"name": "S1"},
                "mtime": 100, "x": [1, 2, 3], "v": [4, 5, 6]
            })],
        )]);
        let tree = file_objs_to_tree(&file_objs, &refl_categories(), "ncnr");

        insta::assert_json_snapshot!(tree, @r###"
        [
          {
            "id": "root:S1",
            "text": "S1",
            "children": [
              {
                "id": "root:S1:specular",
                "text": "specular",
                "children": [
                  {
                    "id": "[\"ncnr\",\"a.nxz\",\"e1\",100]",
                    "text": "e1",
                    "attributes": {
                      "entry": true,
                      "fileinfo": {
                        "filename": "a.nxz",
                        "entryname": "e1",
                        "mtime": 100,
                        "source": "ncnr"
                      }
                    }
                  }
                ]
              }
            ]
          }
        ]
        "###);
    }

    #[test]
    fn test_prefix_sharing_and_first_seen_order() {
        let mut values = vec![];
        for i in 0..50 {
            let intent = if i % 2 == 0 { "specular" } else { "slit" };
            values.push(json!({
                "entry": format!("e{}", i), "intent": intent,
                "sample": {"name": "S1"}, "mtime": 7
            }));
        }
        let file_objs = objs(&[("b.nxz", values)]);
        let tree = file_objs_to_tree(&file_objs, &refl_categories(), "ncnr");

        assert_eq!(tree.len(), 1);
        let intents: Vec<&str> = tree[0].children.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(intents, vec!["root:S1:specular", "root:S1:slit"]);
        // One sample node, two intent nodes, and the leaves.
        assert_eq!(count_nodes(&tree), 1 + 2 + 50);
    }

    #[test]
    fn test_leaf_ids_unique_when_categories_collide() {
        let same = json!({"entry": "e1", "intent": "specular", "sample": {"name": "S1"}, "mtime": 1});
        let later = json!({"entry": "e1", "intent": "specular", "sample": {"name": "S1"}, "mtime": 2});
        let file_objs = objs(&[
            ("a.nxz", vec![same.clone(), later]),
            ("b.nxz", vec![same]),
        ]);
        let tree = file_objs_to_tree(&file_objs, &refl_categories(), "ncnr");

        let leaves = &tree[0].children[0].children;
        assert_eq!(leaves.len(), 3);
        let ids: HashSet<&str> = leaves.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_missing_fields_group_under_sentinel() {
        let file_objs = objs(&[(
            "c.nxz",
            vec![
                json!({"entry": "e1", "mtime": 1}),
                json!({"entry": "e2", "mtime": 1, "sample": {}}),
            ],
        )]);
        let tree = file_objs_to_tree(&file_objs, &refl_categories(), "ncnr");
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].text, ABSENT_CATEGORY);
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].children.len(), 2);
    }

    #[test]
    fn test_single_level_puts_leaves_at_top() {
        let file_objs = objs(&[("d.nxz", vec![json!({"entry": "e1", "mtime": 1})])]);
        let categories = CategoryKeyList::from_paths(&["entry"]).unwrap();
        let tree = file_objs_to_tree(&file_objs, &categories, "ncnr");
        assert_eq!(tree.len(), 1);
        assert!(tree[0].fileinfo.is_some());
    }

    #[test]
    fn test_deterministic() {
        let file_objs = objs(&[
            ("a.nxz", vec![json!({"entry": "e1", "intent": "slit", "sample": {"name": "S2"}, "mtime": 1})]),
            ("b.nxz", vec![json!({"entry": "e1", "intent": "specular", "sample": {"name": "S1"}, "mtime": 1})]),
        ]);
        let first = file_objs_to_tree(&file_objs, &refl_categories(), "ds");
        let second = file_objs_to_tree(&file_objs, &refl_categories(), "ds");
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
