//! One reader per grammar production.
//!
//! Readers follow a uniform discipline: open a context for the production,
//! read each child in source order, commit the context on the last child.
//! They return the committed node's id or unwind with a structured error.

pub(crate) mod combinator;
pub(crate) mod disambiguation;
pub(crate) mod document;
pub(crate) mod expression;
pub(crate) mod identifier;
pub(crate) mod literal;
pub(crate) mod parameter;
pub(crate) mod primary;
pub(crate) mod ty;

use crate::ast::{AstNodePayload, NodeId, NodeKind};
use crate::constant::{ConstantKind, LanguageConstant, MiscConstant};
use crate::error::{ParseErrorKind, ParseResult};
use crate::parser::ParseState;
use crate::token::TokenKind;

/// Construction-site validation for a polymorphic child slot: the committed
/// node must belong to the group the slot allows. Failing here is a parser
/// bug, not a source error.
pub(crate) fn expect_member(
    p: &ParseState,
    id: NodeId,
    is_member: fn(NodeKind) -> bool,
    slot: &'static str,
) -> ParseResult<NodeId> {
    let node = p
        .map()
        .ast_node(id)
        .map_err(|error| ParseErrorKind::invariant(error.to_string()))?;
    if is_member(node.kind) {
        Ok(id)
    } else {
        Err(ParseErrorKind::invariant(format!(
            "{:?} cannot fill a {slot} slot",
            node.kind
        )))
    }
}

/// Reads a comma-separated run of items into an `ArrayWrapper` of `Csv`
/// nodes. `stop` is consulted at each loop head, so an immediately-true
/// `stop` yields an empty wrapper.
pub(crate) fn read_csv_array(
    p: &mut ParseState,
    stop: impl Fn(&ParseState) -> bool,
    mut read_item: impl FnMut(&mut ParseState) -> ParseResult<NodeId>,
) -> ParseResult<NodeId> {
    p.start_context(NodeKind::ArrayWrapper)?;
    loop {
        p.check_cancel()?;
        if stop(p) {
            break;
        }
        p.start_context(NodeKind::Csv)?;
        read_item(p)?;
        let comma = p.maybe_read_token_kind_as_constant(
            TokenKind::Comma,
            ConstantKind::Misc(MiscConstant::Comma),
        );
        p.end_context()?;
        if comma.is_none() {
            break;
        }
    }
    p.end_context()
}

/// `KEY = VALUE`.
pub(crate) fn read_key_value_pair(
    p: &mut ParseState,
    kind: NodeKind,
    read_key: impl FnOnce(&mut ParseState) -> ParseResult<NodeId>,
    read_value: impl FnOnce(&mut ParseState) -> ParseResult<NodeId>,
) -> ParseResult<NodeId> {
    p.start_context(kind)?;
    read_key(p)?;
    p.read_token_kind_as_constant(TokenKind::Equal, ConstantKind::Misc(MiscConstant::Equal))?;
    read_value(p)?;
    p.end_context()
}

/// A leading constant followed by one paired subtree, e.g. `each EXPR`.
pub(crate) fn read_paired_constant(
    p: &mut ParseState,
    kind: NodeKind,
    constant_token: TokenKind,
    constant: ConstantKind,
    read_paired: impl FnOnce(&mut ParseState) -> ParseResult<NodeId>,
) -> ParseResult<NodeId> {
    p.start_context(kind)?;
    p.read_token_kind_as_constant(constant_token, constant)?;
    read_paired(p)?;
    p.end_context()
}

/// Contextual keywords (`nullable`, `optional`, `table`, ...) arrive as
/// plain identifier tokens; these helpers recognize them by text.
pub(crate) fn is_on_identifier_text(p: &ParseState, text: &str) -> bool {
    p.current()
        .map_or(false, |token| token.kind == TokenKind::Identifier && token.data == text)
}

pub(crate) fn read_identifier_text_as_constant(
    p: &mut ParseState,
    text: &str,
    constant: ConstantKind,
) -> ParseResult<NodeId> {
    if is_on_identifier_text(p, text) {
        Ok(p.insert_leaf(NodeKind::Constant, AstNodePayload::Constant(constant), 1))
    } else {
        Err(p.unexpected(&[TokenKind::Identifier]))
    }
}

pub(crate) fn maybe_read_language_constant(
    p: &mut ParseState,
    constant: LanguageConstant,
) -> Option<NodeId> {
    if is_on_identifier_text(p, constant.as_str()) {
        Some(p.insert_leaf(
            NodeKind::Constant,
            AstNodePayload::Constant(ConstantKind::Language(constant)),
            1,
        ))
    } else {
        None
    }
}
