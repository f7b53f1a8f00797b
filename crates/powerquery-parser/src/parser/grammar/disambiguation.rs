//! Bounded look-ahead for the two ambiguous openers.
//!
//! `[` may begin a record expression, a field selector, or a field
//! projection; a token scan classifies it without touching parse state.
//! `(` may begin a parenthesized expression or a function expression's
//! parameter list; the only way to tell is to try, so this is the one hot
//! path that checkpoints and restores.

use crate::ast::NodeId;
use crate::error::ParseResult;
use crate::parser::grammar::{expression, primary};
use crate::parser::ParseState;
use crate::token::TokenKind;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum BracketContext {
    /// Expression position: record, selector, or projection.
    Primary,
    /// Suffix of a recursive-primary chain: selector or projection only.
    Suffix,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum BracketShape {
    Record,
    FieldSelector,
    FieldProjection,
}

pub(crate) fn read_bracket_disambiguation(
    p: &mut ParseState,
    context: BracketContext,
) -> ParseResult<NodeId> {
    p.check_cancel()?;
    match disambiguate_bracket(p, context) {
        BracketShape::Record => primary::read_record_expression(p),
        BracketShape::FieldSelector => primary::read_field_selector(p),
        BracketShape::FieldProjection => primary::read_field_projection(p),
    }
}

fn disambiguate_bracket(p: &ParseState, context: BracketContext) -> BracketShape {
    if context == BracketContext::Suffix {
        return if p.peek_kind(1) == Some(TokenKind::LeftBracket) {
            BracketShape::FieldProjection
        } else {
            BracketShape::FieldSelector
        };
    }
    match p.peek_kind(1) {
        Some(TokenKind::LeftBracket) => BracketShape::FieldProjection,
        Some(TokenKind::RightBracket) | None => BracketShape::Record,
        _ => {
            // Walk to the first structural token: `=` or `,` means a record
            // field, `]` first means a lone selector.
            let mut offset = 2;
            loop {
                match p.peek_kind(offset) {
                    Some(TokenKind::Equal) | Some(TokenKind::Comma) => break BracketShape::Record,
                    Some(TokenKind::RightBracket) => break BracketShape::FieldSelector,
                    None => break BracketShape::Record,
                    _ => offset += 1,
                }
            }
        }
    }
}

/// `(` — attempt the function-expression reader against a checkpoint; a
/// non-fatal failure rewinds and re-reads as an ordinary expression chain.
pub(crate) fn read_parenthesis_disambiguation(p: &mut ParseState) -> ParseResult<NodeId> {
    p.check_cancel()?;
    let trace = p.trace.enter("read_parenthesis_disambiguation")?;
    let checkpoint = p.checkpoint();
    let node = match expression::read_function_expression(p) {
        Ok(node) => node,
        Err(error) if error.is_fatal() => return Err(error),
        Err(_) => {
            p.restore(checkpoint);
            expression::read_binary_expression_chain(p)?
        }
    };
    p.trace.exit(trace, "read_parenthesis_disambiguation")?;
    Ok(node)
}
