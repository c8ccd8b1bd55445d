pub mod builder;
pub mod node;
pub mod sort;
pub mod walk;

pub use builder::{file_objs_to_tree, ROOT_ID};
pub use node::{count_nodes, CategoryNode};
pub use walk::{NodeIndex, TreeWalk};
