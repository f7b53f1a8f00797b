//! The AST model.
//!
//! Nodes are addressed by [`NodeId`] and owned by the node-id map; a node
//! value holds only its common header and, for the five leaf kinds, a
//! literal payload. Parent/child structure lives entirely in the map's side
//! tables, which keeps id rewriting linear in the size of the subtree.

pub mod group;
mod node_kind;

use std::fmt;

use crate::constant::{ConstantKind, PrimitiveTypeConstant};
use crate::context::ParseContext;
use crate::token::TokenRange;

pub use node_kind::NodeKind;

/// A process-local node identity, unique within one parse.
///
/// Ids are drawn from the parse state's counter and never reused during a
/// parse. After any tree mutation they are renumbered so that a pre-order
/// walk from the root visits ids in strictly increasing order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum LiteralKind {
    Logical,
    Null,
    Numeric,
    Text,
}

/// Leaf payloads. `None` for every interior kind.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum AstNodePayload {
    None,
    Constant(ConstantKind),
    Identifier(String),
    GeneralizedIdentifier(String),
    Literal {
        literal: String,
        literal_kind: LiteralKind,
    },
    PrimitiveType(PrimitiveTypeConstant),
}

/// A committed node. Immutable after creation except for id rewriting.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AstNode {
    pub kind: NodeKind,
    pub id: NodeId,
    /// Position under the parent; `None` at the root.
    pub attribute_index: Option<u32>,
    pub token_range: TokenRange,
    pub payload: AstNodePayload,
}

impl AstNode {
    pub fn is_leaf(&self) -> bool {
        group::is_leaf(self.kind)
    }
}

/// Either a committed AST node or an in-progress context node.
///
/// Tooling that inspects a partially parsed tree sees both through this one
/// reference type.
#[derive(Clone, Copy, Debug)]
pub enum XorNode<'a> {
    Ast(&'a AstNode),
    Context(&'a ParseContext),
}

impl<'a> XorNode<'a> {
    pub fn kind(&self) -> NodeKind {
        match self {
            XorNode::Ast(node) => node.kind,
            XorNode::Context(context) => context.kind,
        }
    }

    pub fn id(&self) -> NodeId {
        match self {
            XorNode::Ast(node) => node.id,
            XorNode::Context(context) => context.id,
        }
    }

    pub fn attribute_index(&self) -> Option<u32> {
        match self {
            XorNode::Ast(node) => node.attribute_index,
            XorNode::Context(context) => context.attribute_index,
        }
    }

    pub fn as_ast(&self) -> Option<&'a AstNode> {
        match self {
            XorNode::Ast(node) => Some(node),
            XorNode::Context(_) => None,
        }
    }

    pub fn as_context(&self) -> Option<&'a ParseContext> {
        match self {
            XorNode::Ast(_) => None,
            XorNode::Context(context) => Some(context),
        }
    }
}
