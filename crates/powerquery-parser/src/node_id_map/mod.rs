//! The node-id map.
//!
//! One [`Collection`] owns every node of one parse — committed AST nodes and
//! open context nodes alike — indexed by id, by parent, by ordered children,
//! and by kind. All other references to a node are by id; the node payloads
//! carry no pointers, so renumbering ids touches only the indexes and the
//! embedded `id` fields.

mod renumber;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ast::{AstNode, NodeId, NodeKind, XorNode};
use crate::context::ParseContext;
use crate::token::TokenRange;

pub(crate) use renumber::recalculate_ids;

/// Lookup failures for the typed, asserting query flavours.
#[derive(thiserror::Error, Clone, PartialEq, Eq, Debug)]
pub enum Error {
    #[error("unknown node id {0}")]
    UnknownId(NodeId),
    #[error("node {id} has kind {actual:?}, expected one of {expected:?}")]
    WrongKind {
        id: NodeId,
        actual: NodeKind,
        expected: Vec<NodeKind>,
    },
    #[error("node {0} is a context node, not yet committed")]
    NotCommitted(NodeId),
    #[error("node {0} is already committed")]
    AlreadyCommitted(NodeId),
}

/// The arena and index of all nodes for one parse.
///
/// Invariants, which hold after every completed parse step:
///
/// 1. every id is in exactly one of the AST and context indexes;
/// 2. parent and children entries mirror each other, children ordered by
///    their attribute index;
/// 3. every referenced id exists;
/// 4. the kind index matches each node's kind;
/// 5. `leaf_ids` holds exactly the committed leaf nodes;
/// 6. a pre-order walk from any root visits strictly increasing ids.
#[derive(Clone, Default, PartialEq, Debug)]
pub struct Collection {
    ast_by_id: FxHashMap<NodeId, AstNode>,
    context_by_id: FxHashMap<NodeId, ParseContext>,
    parent_by_id: FxHashMap<NodeId, NodeId>,
    children_by_id: FxHashMap<NodeId, Vec<NodeId>>,
    ids_by_kind: FxHashMap<NodeKind, FxHashSet<NodeId>>,
    leaf_ids: FxHashSet<NodeId>,
    rightmost_leaf: Option<NodeId>,
}

impl Collection {
    /// Either-node lookup.
    pub fn xor(&self, id: NodeId) -> Result<XorNode<'_>, Error> {
        if let Some(node) = self.ast_by_id.get(&id) {
            Ok(XorNode::Ast(node))
        } else if let Some(context) = self.context_by_id.get(&id) {
            Ok(XorNode::Context(context))
        } else {
            Err(Error::UnknownId(id))
        }
    }

    pub fn ast_node(&self, id: NodeId) -> Result<&AstNode, Error> {
        match self.xor(id)? {
            XorNode::Ast(node) => Ok(node),
            XorNode::Context(_) => Err(Error::NotCommitted(id)),
        }
    }

    /// Asserting flavour: the node must be committed and of one of the
    /// expected kinds.
    pub fn ast_node_checked(&self, id: NodeId, expected: &[NodeKind]) -> Result<&AstNode, Error> {
        let node = self.ast_node(id)?;
        if expected.contains(&node.kind) {
            Ok(node)
        } else {
            Err(Error::WrongKind {
                id,
                actual: node.kind,
                expected: expected.to_vec(),
            })
        }
    }

    pub fn context_node(&self, id: NodeId) -> Result<&ParseContext, Error> {
        match self.xor(id)? {
            XorNode::Context(context) => Ok(context),
            XorNode::Ast(_) => Err(Error::AlreadyCommitted(id)),
        }
    }

    pub fn parent_id(&self, id: NodeId) -> Option<NodeId> {
        self.parent_by_id.get(&id).copied()
    }

    pub fn parent_xor(&self, id: NodeId) -> Option<XorNode<'_>> {
        self.parent_id(id).and_then(|parent| self.xor(parent).ok())
    }

    /// The node's children in source order. Empty for leaves and childless
    /// contexts.
    pub fn child_ids(&self, id: NodeId) -> &[NodeId] {
        self.children_by_id
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn nth_child_id(&self, parent: NodeId, attribute_index: u32) -> Option<NodeId> {
        let child = *self.child_ids(parent).get(attribute_index as usize)?;
        debug_assert_eq!(
            self.xor(child).ok().and_then(|n| n.attribute_index()),
            Some(attribute_index)
        );
        Some(child)
    }

    /// Optional flavour: `None` when the slot is empty or holds a different
    /// kind.
    pub fn nth_child_ast(
        &self,
        parent: NodeId,
        attribute_index: u32,
        expected: &[NodeKind],
    ) -> Option<&AstNode> {
        let child = self.nth_child_id(parent, attribute_index)?;
        self.ast_node_checked(child, expected).ok()
    }

    /// Asserting flavour of [`Collection::nth_child_ast`].
    pub fn nth_child_ast_checked(
        &self,
        parent: NodeId,
        attribute_index: u32,
        expected: &[NodeKind],
    ) -> Result<&AstNode, Error> {
        let child = self
            .nth_child_id(parent, attribute_index)
            .ok_or(Error::UnknownId(parent))?;
        self.ast_node_checked(child, expected)
    }

    /// Walks first children until reaching a node with none.
    pub fn leftmost_xor(&self, id: NodeId) -> Result<XorNode<'_>, Error> {
        let mut current = id;
        loop {
            match self.child_ids(current).first() {
                Some(&child) => current = child,
                None => return self.xor(current),
            }
        }
    }

    /// The committed leaf with the greatest starting token index seen so far
    /// in the whole parse.
    pub fn rightmost_leaf(&self) -> Option<&AstNode> {
        self.rightmost_leaf.and_then(|id| self.ast_by_id.get(&id))
    }

    /// The rightmost committed leaf under `id`, optionally filtered.
    ///
    /// Traverses from the right, skipping any branch whose right boundary
    /// cannot beat the best candidate found so far.
    pub fn rightmost_leaf_of(
        &self,
        id: NodeId,
        predicate: Option<&dyn Fn(&AstNode) -> bool>,
    ) -> Option<&AstNode> {
        let mut best: Option<&AstNode> = None;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.ast_by_id.get(&current) {
                if node.is_leaf() {
                    let keep = predicate.map_or(true, |check| check(node));
                    let better = best.map_or(true, |b| {
                        node.token_range.token_index_start > b.token_range.token_index_start
                    });
                    if keep && better {
                        best = Some(node);
                    }
                    continue;
                }
            }
            for &child in self.child_ids(current) {
                if let Some(node) = self.ast_by_id.get(&child) {
                    if let Some(b) = best {
                        if node.token_range.token_index_end <= b.token_range.token_index_start {
                            continue;
                        }
                    }
                }
                stack.push(child);
            }
        }
        best
    }

    /// True iff the subtree under `id` contains at least one committed leaf.
    pub fn has_parsed_token(&self, id: NodeId) -> bool {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if self.leaf_ids.contains(&current) {
                return true;
            }
            stack.extend_from_slice(self.child_ids(current));
        }
        false
    }

    /// The token range of either node flavour.
    ///
    /// A context's range runs from its start token to the end of its
    /// rightmost committed leaf, or is empty when nothing was parsed yet.
    pub fn xor_token_range(&self, id: NodeId) -> Result<TokenRange, Error> {
        match self.xor(id)? {
            XorNode::Ast(node) => Ok(node.token_range),
            XorNode::Context(context) => {
                let anchor_position = context
                    .token_anchor
                    .as_ref()
                    .map(|token| token.position_start)
                    .unwrap_or_default();
                match self.rightmost_leaf_of(id, None) {
                    Some(leaf) => Ok(TokenRange {
                        token_index_start: context.token_index_start,
                        token_index_end: leaf.token_range.token_index_end,
                        position_start: anchor_position,
                        position_end: leaf.token_range.position_end,
                    }),
                    None => Ok(TokenRange {
                        token_index_start: context.token_index_start,
                        token_index_end: context.token_index_start,
                        position_start: anchor_position,
                        position_end: anchor_position,
                    }),
                }
            }
        }
    }

    pub fn leaf_ids(&self) -> &FxHashSet<NodeId> {
        &self.leaf_ids
    }

    pub fn ids_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = NodeId> + '_ {
        self.ids_by_kind
            .get(&kind)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// The kinds that currently index at least one id.
    pub fn indexed_kinds(&self) -> impl Iterator<Item = NodeKind> + '_ {
        self.ids_by_kind.keys().copied()
    }

    pub fn ast_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.ast_by_id.keys().copied()
    }

    pub fn context_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.context_by_id.keys().copied()
    }

    /// Ids with no parent entry. A finished parse has exactly one.
    pub fn root_ids(&self) -> Vec<NodeId> {
        let mut roots: Vec<NodeId> = self
            .ast_by_id
            .keys()
            .chain(self.context_by_id.keys())
            .filter(|id| !self.parent_by_id.contains_key(id))
            .copied()
            .collect();
        roots.sort_unstable();
        roots
    }

    pub fn is_empty(&self) -> bool {
        self.ast_by_id.is_empty() && self.context_by_id.is_empty()
    }

    // ---- mutation, crate-internal ----

    pub(crate) fn insert_ast_node(&mut self, node: AstNode) {
        let id = node.id;
        self.ids_by_kind.entry(node.kind).or_default().insert(id);
        if node.is_leaf() {
            self.leaf_ids.insert(id);
            let better = match self.rightmost_leaf() {
                Some(best) => {
                    node.token_range.token_index_start >= best.token_range.token_index_start
                }
                None => true,
            };
            if better {
                self.rightmost_leaf = Some(id);
            }
        }
        let previous = self.ast_by_id.insert(id, node);
        debug_assert!(previous.is_none(), "id {id} inserted twice");
    }

    pub(crate) fn insert_context_node(&mut self, context: ParseContext) {
        let id = context.id;
        self.ids_by_kind.entry(context.kind).or_default().insert(id);
        let previous = self.context_by_id.insert(id, context);
        debug_assert!(previous.is_none(), "id {id} inserted twice");
    }

    /// Records `child` as the next child of `parent`. Children must be
    /// linked in strict source order.
    pub(crate) fn link_child(&mut self, parent: NodeId, child: NodeId) {
        self.parent_by_id.insert(child, parent);
        self.children_by_id.entry(parent).or_default().push(child);
    }

    /// Removes the parent/child edge. The child survives as a root.
    pub(crate) fn unlink_child(&mut self, parent: NodeId, child: NodeId) {
        self.parent_by_id.remove(&child);
        if let Some(children) = self.children_by_id.get_mut(&parent) {
            children.retain(|&c| c != child);
            if children.is_empty() {
                self.children_by_id.remove(&parent);
            }
        }
    }

    /// Replaces `old` with `new` in the parent's child list, preserving the
    /// slot position.
    pub(crate) fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        self.parent_by_id.remove(&old);
        self.parent_by_id.insert(new, parent);
        if let Some(children) = self.children_by_id.get_mut(&parent) {
            if let Some(slot) = children.iter_mut().find(|c| **c == old) {
                *slot = new;
            }
        }
    }

    /// Converts a context to its committed AST node in one step.
    pub(crate) fn commit_context(&mut self, id: NodeId, node: AstNode) {
        debug_assert_eq!(node.id, id);
        let context = self.context_by_id.remove(&id);
        debug_assert!(context.is_some(), "commit of a node with no context");
        // The kind index entry carries over unchanged.
        if node.is_leaf() {
            self.leaf_ids.insert(id);
        }
        self.ast_by_id.insert(id, node);
    }

    /// Removes a context from every index. Any children must have been
    /// relinked or removed by the caller first.
    pub(crate) fn remove_context(&mut self, id: NodeId) -> Option<ParseContext> {
        let context = self.context_by_id.remove(&id)?;
        if let Some(ids) = self.ids_by_kind.get_mut(&context.kind) {
            ids.remove(&id);
            if ids.is_empty() {
                self.ids_by_kind.remove(&context.kind);
            }
        }
        self.parent_by_id.remove(&id);
        self.children_by_id.remove(&id);
        Some(context)
    }

    pub(crate) fn set_attribute_index(&mut self, id: NodeId, attribute_index: Option<u32>) {
        if let Some(node) = self.ast_by_id.get_mut(&id) {
            node.attribute_index = attribute_index;
        } else if let Some(context) = self.context_by_id.get_mut(&id) {
            context.attribute_index = attribute_index;
        }
    }

    pub(crate) fn context_node_mut(&mut self, id: NodeId) -> Option<&mut ParseContext> {
        self.context_by_id.get_mut(&id)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::AstNodePayload;
    use crate::token::TokenPosition;

    fn leaf(id: u32, kind: NodeKind, start: usize, end: usize) -> AstNode {
        AstNode {
            kind,
            id: NodeId(id),
            attribute_index: None,
            token_range: TokenRange {
                token_index_start: start,
                token_index_end: end,
                position_start: TokenPosition::default(),
                position_end: TokenPosition::default(),
            },
            payload: AstNodePayload::Identifier(format!("n{id}")),
        }
    }

    #[test]
    fn xor_distinguishes_committed_and_open_nodes() {
        let mut map = Collection::default();
        map.insert_ast_node(leaf(0, NodeKind::Identifier, 0, 1));
        assert!(matches!(map.xor(NodeId(0)), Ok(XorNode::Ast(_))));
        assert!(matches!(
            map.xor(NodeId(1)),
            Err(Error::UnknownId(NodeId(1)))
        ));
    }

    #[test]
    fn rightmost_leaf_tracks_greatest_start() {
        let mut map = Collection::default();
        map.insert_ast_node(leaf(0, NodeKind::Identifier, 0, 1));
        map.insert_ast_node(leaf(1, NodeKind::Identifier, 4, 5));
        map.insert_ast_node(leaf(2, NodeKind::Identifier, 2, 3));
        assert_eq!(map.rightmost_leaf().unwrap().id, NodeId(1));
    }

    #[test]
    fn checked_lookup_reports_wrong_kind() {
        let mut map = Collection::default();
        map.insert_ast_node(leaf(0, NodeKind::Identifier, 0, 1));
        let err = map
            .ast_node_checked(NodeId(0), &[NodeKind::LiteralExpression])
            .unwrap_err();
        assert_eq!(
            err,
            Error::WrongKind {
                id: NodeId(0),
                actual: NodeKind::Identifier,
                expected: vec![NodeKind::LiteralExpression],
            }
        );
    }
}
