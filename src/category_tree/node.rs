use serde::{ser::SerializeStruct, Serialize, Serializer};

use crate::file_format::entry::FileInfo;

/// A node of the category tree.  Interior nodes group entries that share a
/// category prefix; leaves (with `fileinfo`) each stand for one entry.
///
/// Serializes into the shape the tree widget consumes:
/// `{id, text, children}` for interior nodes and
/// `{id, text, attributes: {entry: true, fileinfo}}` for leaves.
#[derive(Clone, Debug, PartialEq)]
pub struct CategoryNode {
    pub id: String,
    pub text: String,
    pub title: Option<String>,
    pub children: Vec<CategoryNode>,
    pub fileinfo: Option<FileInfo>,
}

impl CategoryNode {
    pub fn branch(id: String, text: String) -> Self {
        CategoryNode {
            id,
            text,
            title: None,
            children: vec![],
            fileinfo: None,
        }
    }

    pub fn leaf(id: String, text: String, fileinfo: FileInfo) -> Self {
        CategoryNode {
            id,
            text,
            title: None,
            children: vec![],
            fileinfo: Some(fileinfo),
        }
    }

    /// Leaves are nodes without children, which by construction are the
    /// nodes carrying a fileinfo.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of nodes in this subtree, including this one.
    pub fn subtree_size(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(CategoryNode::subtree_size)
            .sum::<usize>()
    }
}

pub fn count_nodes(tree: &[CategoryNode]) -> usize {
    tree.iter().map(CategoryNode::subtree_size).sum()
}

#[derive(Serialize)]
struct LeafAttributes<'a> {
    entry: bool,
    fileinfo: &'a FileInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a String>,
}

#[derive(Serialize)]
struct BranchAttributes<'a> {
    title: &'a String,
}

impl Serialize for CategoryNode {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut node = serializer.serialize_struct("CategoryNode", 3)?;
        node.serialize_field("id", &self.id)?;
        node.serialize_field("text", &self.text)?;
        match &self.fileinfo {
            Some(fileinfo) => {
                node.serialize_field(
                    "attributes",
                    &LeafAttributes {
                        entry: true,
                        fileinfo,
                        title: self.title.as_ref(),
                    },
                )?;
            }
            None => {
                node.serialize_field("children", &self.children)?;
                if let Some(title) = &self.title {
                    node.serialize_field("attributes", &BranchAttributes { title })?;
                }
            }
        }
        node.end()
    }
}
