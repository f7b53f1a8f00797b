//! Identifiers, generalized identifiers, and the paired forms.

use crate::ast::{AstNodePayload, NodeId, NodeKind};
use crate::constant::{ConstantKind, MiscConstant};
use crate::error::ParseResult;
use crate::parser::grammar::{literal, read_key_value_pair};
use crate::parser::ParseState;
use crate::token::TokenKind;

pub(crate) fn read_identifier(p: &mut ParseState) -> ParseResult<NodeId> {
    match p.current() {
        Some(token) if token.kind == TokenKind::Identifier => {
            let literal = token.data.clone();
            Ok(p.insert_leaf(
                NodeKind::Identifier,
                AstNodePayload::Identifier(literal),
                1,
            ))
        }
        _ => Err(p.unexpected(&[TokenKind::Identifier])),
    }
}

/// ```txt
/// identifier-expression:
///     [@] identifier-reference
/// ```
///
/// The `@` makes the reference inclusive: inside `let x = ... in @x` it
/// refers to the binding being defined. `#keyword` heads (`#table`,
/// `#sections`, ...) also land here and read as identifier references.
pub(crate) fn read_identifier_expression(p: &mut ParseState) -> ParseResult<NodeId> {
    p.check_cancel()?;
    let trace = p.trace.enter("read_identifier_expression")?;
    p.start_context(NodeKind::IdentifierExpression)?;
    let inclusive = p
        .maybe_read_token_kind_as_constant(
            TokenKind::AtSign,
            ConstantKind::Misc(MiscConstant::AtSign),
        )
        .is_some();
    match p.current_kind() {
        Some(TokenKind::Identifier) => {
            read_identifier(p)?;
        }
        Some(kind) if kind.is_hash_keyword() && !inclusive => {
            let literal = p.current().map(|token| token.data.clone()).unwrap_or_default();
            p.insert_leaf(NodeKind::Identifier, AstNodePayload::Identifier(literal), 1);
        }
        _ => return Err(p.unexpected(&[TokenKind::Identifier])),
    }
    let node = p.end_context()?;
    p.trace.exit(trace, "read_identifier_expression")?;
    Ok(node)
}

/// A record key or field name: one or more adjacent identifier-ish tokens,
/// captured verbatim from the source so interior spacing survives.
pub(crate) fn read_generalized_identifier(p: &mut ParseState) -> ParseResult<NodeId> {
    let start = p.token_index;
    let mut count = 0;
    while let Some(kind) = p.peek_kind(count) {
        if is_generalized_identifier_token(kind) {
            count += 1;
        } else {
            break;
        }
    }
    if count == 0 {
        return Err(p.unexpected(&[TokenKind::Identifier]));
    }
    let tokens = &p.snapshot().tokens;
    let literal = p
        .snapshot()
        .text_between(
            tokens[start].position_start,
            tokens[start + count - 1].position_end,
        )
        .to_string();
    Ok(p.insert_leaf(
        NodeKind::GeneralizedIdentifier,
        AstNodePayload::GeneralizedIdentifier(literal),
        count,
    ))
}

fn is_generalized_identifier_token(kind: TokenKind) -> bool {
    kind == TokenKind::Identifier
        || kind == TokenKind::NumericLiteral
        || kind == TokenKind::NullLiteral
        || kind.is_keyword()
}

/// `identifier = EXPR`
pub(crate) fn read_identifier_paired_expression(p: &mut ParseState) -> ParseResult<NodeId> {
    p.check_cancel()?;
    read_key_value_pair(
        p,
        NodeKind::IdentifierPairedExpression,
        read_identifier,
        crate::parser::grammar::expression::read_expression,
    )
}

/// `generalized-identifier = EXPR`
pub(crate) fn read_generalized_identifier_paired_expression(
    p: &mut ParseState,
) -> ParseResult<NodeId> {
    p.check_cancel()?;
    read_key_value_pair(
        p,
        NodeKind::GeneralizedIdentifierPairedExpression,
        read_generalized_identifier,
        crate::parser::grammar::expression::read_expression,
    )
}

/// `generalized-identifier = ANY-LITERAL`
pub(crate) fn read_generalized_identifier_paired_any_literal(
    p: &mut ParseState,
) -> ParseResult<NodeId> {
    p.check_cancel()?;
    read_key_value_pair(
        p,
        NodeKind::GeneralizedIdentifierPairedAnyLiteral,
        read_generalized_identifier,
        literal::read_any_literal,
    )
}
