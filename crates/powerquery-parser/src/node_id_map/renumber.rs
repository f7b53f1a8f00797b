//! Id renumbering.
//!
//! Tree mutations — reparenting a committed subtree, shaping a flat operator
//! run into a binary tree — leave newer ids above older ones, breaking the
//! rule that a pre-order walk visits strictly increasing ids. Renumbering
//! permutes the subtree's existing ids back into pre-order without ever
//! allocating a new one.

use rustc_hash::{FxHashMap, FxHashSet};

use super::Collection;
use crate::ast::NodeId;

/// Restores the pre-order id invariant for the subtree rooted at `root`.
/// Returns the root's id after the permutation.
pub(crate) fn recalculate_ids(map: &mut Collection, root: NodeId) -> NodeId {
    let visited = preorder_ids(map, root);
    let mut sorted = visited.clone();
    sorted.sort_unstable();

    let mut mapping = FxHashMap::default();
    for (&old, &new) in visited.iter().zip(sorted.iter()) {
        if old != new {
            mapping.insert(old, new);
        }
    }
    update_node_ids(map, &mapping);
    mapping.get(&root).copied().unwrap_or(root)
}

fn preorder_ids(map: &Collection, root: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        out.push(id);
        for &child in map.child_ids(id).iter().rev() {
            stack.push(child);
        }
    }
    out
}

/// Applies a rename permutation to every index, delta-based: every affected
/// entry is pulled out first and reinstalled second, so two ids swapping
/// places never collide mid-way.
pub(crate) fn update_node_ids(map: &mut Collection, mapping: &FxHashMap<NodeId, NodeId>) {
    if mapping.is_empty() {
        return;
    }
    let renamed = |id: NodeId| mapping.get(&id).copied().unwrap_or(id);

    // Parents whose child lists mention a renamed id: the renamed ids
    // themselves, plus the parent of each renamed id. Resolved before any
    // edge is touched.
    let mut parent_keys: FxHashSet<NodeId> = FxHashSet::default();
    for &old in mapping.keys() {
        if map.children_by_id.contains_key(&old) {
            parent_keys.insert(old);
        }
        if let Some(&parent) = map.parent_by_id.get(&old) {
            parent_keys.insert(parent);
        }
    }

    // Stage 1: drain.
    let mut staged_ast = Vec::new();
    let mut staged_contexts = Vec::new();
    for (&old, &new) in mapping.iter() {
        if let Some(mut node) = map.ast_by_id.remove(&old) {
            if let Some(ids) = map.ids_by_kind.get_mut(&node.kind) {
                ids.remove(&old);
            }
            map.leaf_ids.remove(&old);
            node.id = new;
            staged_ast.push(node);
        } else if let Some(mut context) = map.context_by_id.remove(&old) {
            if let Some(ids) = map.ids_by_kind.get_mut(&context.kind) {
                ids.remove(&old);
            }
            context.id = new;
            context.parent_id = context.parent_id.map(renamed);
            staged_contexts.push(context);
        }
    }

    let mut staged_children: Vec<(NodeId, Vec<NodeId>)> = Vec::new();
    for &parent in &parent_keys {
        if let Some(children) = map.children_by_id.remove(&parent) {
            staged_children.push((parent, children));
        }
    }

    let mut edge_children: FxHashSet<NodeId> = mapping.keys().copied().collect();
    for (parent, children) in &staged_children {
        if mapping.contains_key(parent) {
            edge_children.extend(children.iter().copied());
        }
    }
    let mut staged_edges: Vec<(NodeId, NodeId)> = Vec::new();
    for child in edge_children {
        if let Some(parent) = map.parent_by_id.remove(&child) {
            staged_edges.push((child, parent));
        }
    }

    // Stage 2: reinstall under the new ids.
    for node in staged_ast {
        let id = node.id;
        map.ids_by_kind.entry(node.kind).or_default().insert(id);
        if node.is_leaf() {
            map.leaf_ids.insert(id);
        }
        map.ast_by_id.insert(id, node);
    }
    for context in staged_contexts {
        let id = context.id;
        map.ids_by_kind.entry(context.kind).or_default().insert(id);
        map.context_by_id.insert(id, context);
    }
    for (parent, children) in staged_children {
        let new_parent = renamed(parent);
        let new_children: Vec<NodeId> = children.iter().map(|&c| renamed(c)).collect();
        // A surviving context child must agree with the edge about its
        // parent's new id.
        if parent != new_parent {
            for &child in &new_children {
                if let Some(context) = map.context_by_id.get_mut(&child) {
                    context.parent_id = Some(new_parent);
                }
            }
        }
        map.children_by_id.insert(new_parent, new_children);
    }
    for (child, parent) in staged_edges {
        map.parent_by_id.insert(renamed(child), renamed(parent));
    }
    if let Some(id) = map.rightmost_leaf {
        map.rightmost_leaf = Some(renamed(id));
    }
}
