use lexical_sort::natural_lexical_cmp;

use super::node::CategoryNode;

/// Sort siblings at every level by id in natural order, so `run2` comes
/// before `run10`.  The builder keeps first-seen order; callers that want a
/// sorted display opt in with this.
///
/// The natural comparison ignores case; ids that only differ by case (`Run1`
/// and `run1`) fall back to byte order, so the result is still total.
pub fn sort_tree_alphanumeric(nodes: &mut [CategoryNode]) {
    nodes.sort_by(|a, b| natural_lexical_cmp(&a.id, &b.id));
    for node in nodes.iter_mut() {
        sort_tree_alphanumeric(&mut node.children);
    }
}

#[test]
fn test_sort_tree_alphanumeric() {
    let mut nodes: Vec<CategoryNode> = ["root:run10", "root:run2", "root:run1"]
        .iter()
        .map(|id| CategoryNode::branch(id.to_string(), id.to_string()))
        .collect();
    nodes[0].children = ["root:run10:b", "root:run10:a"]
        .iter()
        .map(|id| CategoryNode::branch(id.to_string(), id.to_string()))
        .collect();

    sort_tree_alphanumeric(&mut nodes);

    let ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["root:run1", "root:run2", "root:run10"]);
    let child_ids: Vec<&str> = nodes[2].children.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(child_ids, vec!["root:run10:a", "root:run10:b"]);
}

#[test]
fn test_sort_tree_case_ties_use_raw_id() {
    let mut nodes: Vec<CategoryNode> = ["root:run1", "root:run10", "root:Run1"]
        .iter()
        .map(|id| CategoryNode::branch(id.to_string(), id.to_string()))
        .collect();

    sort_tree_alphanumeric(&mut nodes);

    let ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["root:Run1", "root:run1", "root:run10"]);
}
