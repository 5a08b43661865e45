// src/comments/mod.rs

//! Threaded comments: storage port, tree building, rendering, composing and
//! the section that ties them together.

pub mod cache;
pub mod form;
pub mod memory;
pub mod postgres;
pub mod render;
pub mod section;
pub mod store;
pub mod tree;

pub use section::{CommentSection, SectionTree, SectionView};
pub use tree::{CommentForest, build_comment_tree};
