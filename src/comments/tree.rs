// src/comments/tree.rs

//! Builds a reply forest from the flat, path-ordered comment list.
//!
//! Nodes live in an arena and refer to each other by index. Every traversal
//! uses an explicit stack, so thread depth never turns into call-stack depth.

use std::collections::HashMap;

use crate::models::comment::{Comment, CommentTreeNode};

#[derive(Debug, Clone)]
struct ForestNode {
    comment: Comment,
    parent: Option<usize>,
    replies: Vec<usize>,
}

/// Arena-backed comment forest for one content key.
#[derive(Debug, Clone, Default)]
pub struct CommentForest {
    nodes: Vec<ForestNode>,
    roots: Vec<usize>,
    index: HashMap<i64, usize>,
}

/// One step of a pre-order walk.
#[derive(Debug, Clone, Copy)]
pub struct Visit<'a> {
    pub comment: &'a Comment,
    pub depth: usize,
    pub reply_count: usize,
}

impl CommentForest {
    /// Links `comments` into a forest.
    ///
    /// The whole id index is built before any parent lookup, so a reply that
    /// arrives ahead of its parent is still attached to it. A reply whose
    /// parent is not in the input becomes a root. Roots and sibling replies
    /// keep their input order.
    pub fn build(comments: Vec<Comment>) -> Self {
        let mut index = HashMap::with_capacity(comments.len());
        let mut nodes = Vec::with_capacity(comments.len());

        for (i, comment) in comments.into_iter().enumerate() {
            index.entry(comment.id).or_insert(i);
            nodes.push(ForestNode {
                comment,
                parent: None,
                replies: Vec::new(),
            });
        }

        let mut roots = Vec::new();
        for i in 0..nodes.len() {
            let parent = nodes[i]
                .comment
                .parent_id
                .and_then(|pid| index.get(&pid).copied())
                .filter(|&p| p != i);

            match parent {
                Some(p) => {
                    nodes[i].parent = Some(p);
                    nodes[p].replies.push(i);
                }
                None => roots.push(i),
            }
        }

        let mut forest = Self {
            nodes,
            roots,
            index,
        };
        forest.break_cycles();
        forest
    }

    /// Promotes nodes that no root can reach (parent links forming a loop)
    /// to roots, first one in input order wins.
    fn break_cycles(&mut self) {
        let mut reached = vec![false; self.nodes.len()];
        let roots = self.roots.clone();
        self.mark_reachable(&roots, &mut reached);

        for i in 0..self.nodes.len() {
            if reached[i] {
                continue;
            }
            if let Some(p) = self.nodes[i].parent.take() {
                self.nodes[p].replies.retain(|&c| c != i);
            }
            tracing::warn!(
                comment_id = self.nodes[i].comment.id,
                "comment parent chain loops, promoting to root"
            );
            self.roots.push(i);
            self.mark_reachable(&[i], &mut reached);
        }
    }

    fn mark_reachable(&self, from: &[usize], reached: &mut [bool]) {
        let mut stack: Vec<usize> = from.to_vec();
        while let Some(i) = stack.pop() {
            if reached[i] {
                continue;
            }
            reached[i] = true;
            stack.extend(self.nodes[i].replies.iter().copied());
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get(&self, id: i64) -> Option<&Comment> {
        self.index.get(&id).map(|&i| &self.nodes[i].comment)
    }

    /// Depth of `id` in this forest, counted from its root.
    pub fn depth_of(&self, id: i64) -> Option<usize> {
        let mut i = *self.index.get(&id)?;
        let mut depth = 0;
        while let Some(p) = self.nodes[i].parent {
            depth += 1;
            i = p;
        }
        Some(depth)
    }

    /// Ids of the direct replies to `id`, in order.
    pub fn reply_ids(&self, id: i64) -> Vec<i64> {
        self.index
            .get(&id)
            .map(|&i| {
                self.nodes[i]
                    .replies
                    .iter()
                    .map(|&c| self.nodes[c].comment.id)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Pre-order walk: each node, then its replies, then its next sibling.
    pub fn walk(&self) -> PreOrder<'_> {
        let stack = self.roots.iter().rev().map(|&i| (i, 0)).collect();
        PreOrder {
            forest: self,
            stack,
        }
    }

    /// Materializes nested nodes.
    ///
    /// Nodes are assembled in reverse pre-order so every node's replies are
    /// finished before the node itself is.
    pub fn into_nested(self) -> Vec<CommentTreeNode> {
        let order: Vec<(usize, usize)> = {
            let mut out = Vec::with_capacity(self.nodes.len());
            let mut stack: Vec<(usize, usize)> =
                self.roots.iter().rev().map(|&i| (i, 0)).collect();
            while let Some((i, depth)) = stack.pop() {
                out.push((i, depth));
                stack.extend(self.nodes[i].replies.iter().rev().map(|&c| (c, depth + 1)));
            }
            out
        };

        let mut links: Vec<Vec<usize>> = Vec::with_capacity(self.nodes.len());
        let mut comments: Vec<Option<Comment>> = Vec::with_capacity(self.nodes.len());
        for node in self.nodes {
            links.push(node.replies);
            comments.push(Some(node.comment));
        }

        let mut built: Vec<Option<CommentTreeNode>> = vec![None; links.len()];
        for &(i, depth) in order.iter().rev() {
            let replies = links[i]
                .iter()
                .filter_map(|&c| built[c].take())
                .collect();
            if let Some(comment) = comments[i].take() {
                built[i] = Some(CommentTreeNode {
                    comment,
                    depth,
                    replies,
                });
            }
        }

        self.roots
            .iter()
            .filter_map(|&r| built[r].take())
            .collect()
    }
}

/// Iterator returned by [`CommentForest::walk`].
pub struct PreOrder<'a> {
    forest: &'a CommentForest,
    stack: Vec<(usize, usize)>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = Visit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (i, depth) = self.stack.pop()?;
        let node = &self.forest.nodes[i];
        self.stack
            .extend(node.replies.iter().rev().map(|&c| (c, depth + 1)));
        Some(Visit {
            comment: &node.comment,
            depth,
            reply_count: node.replies.len(),
        })
    }
}

/// Builds the nested reply forest for a flat comment list.
pub fn build_comment_tree(comments: Vec<Comment>) -> Vec<CommentTreeNode> {
    CommentForest::build(comments).into_nested()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::comment::ContentType;

    pub(crate) fn comment(id: i64, parent_id: Option<i64>) -> Comment {
        Comment {
            id,
            content: format!("comment {}", id),
            content_type: ContentType::Song,
            content_id: 1,
            user_id: 100 + id,
            parent_id,
            depth: 0,
            thread_path: format!("{:012}", id),
            created_at: chrono::DateTime::from_timestamp(1_700_000_000 + id, 0).unwrap(),
            author: None,
        }
    }

    fn shape(nodes: &[CommentTreeNode]) -> Vec<(i64, Vec<i64>)> {
        let mut out = Vec::new();
        let mut stack: Vec<&CommentTreeNode> = nodes.iter().rev().collect();
        while let Some(n) = stack.pop() {
            out.push((n.comment.id, n.replies.iter().map(|r| r.comment.id).collect()));
            stack.extend(n.replies.iter().rev());
        }
        out
    }

    fn preorder_ids(nodes: &[CommentTreeNode]) -> Vec<i64> {
        shape(nodes).into_iter().map(|(id, _)| id).collect()
    }

    #[test]
    fn empty_input_yields_empty_forest() {
        assert!(build_comment_tree(Vec::new()).is_empty());
        assert!(CommentForest::build(Vec::new()).is_empty());
    }

    #[test]
    fn single_root_has_no_replies() {
        let tree = build_comment_tree(vec![comment(1, None)]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].comment.id, 1);
        assert_eq!(tree[0].depth, 0);
        assert!(tree[0].replies.is_empty());
    }

    #[test]
    fn two_level_nesting_keeps_sibling_order() {
        let tree = build_comment_tree(vec![comment(1, None), comment(2, Some(1)), comment(3, Some(1))]);
        assert_eq!(tree.len(), 1);
        let replies: Vec<i64> = tree[0].replies.iter().map(|r| r.comment.id).collect();
        assert_eq!(replies, vec![2, 3]);
        assert!(tree[0].replies.iter().all(|r| r.depth == 1));
    }

    #[test]
    fn rebuilding_from_same_input_is_identical() {
        let input = vec![
            comment(1, None),
            comment(2, Some(1)),
            comment(4, Some(2)),
            comment(3, Some(1)),
            comment(5, None),
            comment(6, Some(5)),
        ];
        let first = build_comment_tree(input.clone());
        let second = build_comment_tree(input);
        assert_eq!(first, second);
    }

    #[test]
    fn preorder_of_output_matches_path_ordered_input() {
        let input = vec![
            comment(1, None),
            comment(2, Some(1)),
            comment(4, Some(2)),
            comment(7, Some(4)),
            comment(3, Some(1)),
            comment(5, None),
            comment(6, Some(5)),
        ];
        let expected: Vec<i64> = input.iter().map(|c| c.id).collect();
        let tree = build_comment_tree(input.clone());
        assert_eq!(preorder_ids(&tree), expected);

        let forest = CommentForest::build(input);
        let walked: Vec<(i64, usize)> = forest.walk().map(|v| (v.comment.id, v.depth)).collect();
        assert_eq!(
            walked,
            vec![(1, 0), (2, 1), (4, 2), (7, 3), (3, 1), (5, 0), (6, 1)]
        );
    }

    #[test]
    fn dangling_parent_becomes_root() {
        let tree = build_comment_tree(vec![comment(1, None), comment(2, Some(99))]);
        let roots: Vec<i64> = tree.iter().map(|n| n.comment.id).collect();
        assert_eq!(roots, vec![1, 2]);
        assert_eq!(tree[1].depth, 0);
    }

    #[test]
    fn reply_listed_before_its_parent_is_still_linked() {
        let tree = build_comment_tree(vec![comment(2, Some(1)), comment(1, None)]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].comment.id, 1);
        assert_eq!(tree[0].replies[0].comment.id, 2);
    }

    #[test]
    fn parent_loop_is_broken_without_losing_comments() {
        let input = vec![comment(1, Some(2)), comment(2, Some(1)), comment(3, Some(3))];
        let forest = CommentForest::build(input);
        assert_eq!(forest.walk().count(), 3);

        let tree = forest.into_nested();
        assert_eq!(shape(&tree), vec![(3, vec![]), (1, vec![2]), (2, vec![])]);
    }

    #[test]
    fn forest_lookups() {
        let forest = CommentForest::build(vec![
            comment(1, None),
            comment(2, Some(1)),
            comment(3, Some(2)),
            comment(4, Some(1)),
        ]);
        assert_eq!(forest.len(), 4);
        assert_eq!(forest.root_count(), 1);
        assert_eq!(forest.depth_of(3), Some(2));
        assert_eq!(forest.depth_of(42), None);
        assert_eq!(forest.reply_ids(1), vec![2, 4]);
        assert!(forest.contains(4));
        assert_eq!(forest.get(2).map(|c| c.parent_id), Some(Some(1)));
    }

    #[test]
    fn deep_chain_does_not_recurse() {
        let mut input = vec![comment(1, None)];
        for id in 2..=20_000 {
            input.push(comment(id, Some(id - 1)));
        }
        let forest = CommentForest::build(input);
        assert_eq!(forest.depth_of(20_000), Some(19_999));
        assert_eq!(forest.walk().last().map(|v| v.depth), Some(19_999));
    }
}
