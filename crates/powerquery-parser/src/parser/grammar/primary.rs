//! Primary expressions and the recursive-primary suffix chain.

use crate::ast::{group, NodeId, NodeKind};
use crate::constant::{ConstantKind, MiscConstant, WrapperConstant};
use crate::error::ParseResult;
use crate::parser::grammar::{
    disambiguation, expect_member, expression, identifier, literal, read_csv_array,
};
use crate::parser::ParseState;
use crate::token::TokenKind;

/// ```txt
/// primary-expression:
///     literal-expression | identifier-expression | parenthesized-expression
///     list-expression | record-expression | field-access-expression
///     item-access-expression | invoke-expression | not-implemented-expression
/// ```
///
/// A head that can be invoked or indexed may grow a suffix chain, which
/// wraps it into a recursive-primary expression.
pub(crate) fn read_primary_expression(p: &mut ParseState) -> ParseResult<NodeId> {
    p.check_cancel()?;
    let trace = p.trace.enter("read_primary_expression")?;
    let head = match p.current_kind() {
        Some(TokenKind::LeftParenthesis) => read_parenthesized_expression(p)?,
        Some(TokenKind::LeftBracket) => disambiguation::read_bracket_disambiguation(
            p,
            disambiguation::BracketContext::Primary,
        )?,
        Some(TokenKind::LeftBrace) => read_list_expression(p)?,
        Some(TokenKind::Ellipsis) => read_not_implemented_expression(p)?,
        Some(TokenKind::Identifier) | Some(TokenKind::AtSign) => {
            identifier::read_identifier_expression(p)?
        }
        Some(kind)
            if kind.is_hash_keyword()
                && !matches!(
                    kind,
                    TokenKind::KeywordHashInfinity | TokenKind::KeywordHashNan
                ) =>
        {
            identifier::read_identifier_expression(p)?
        }
        _ => literal::read_literal_expression(p)?,
    };

    let head_kind = p
        .map()
        .ast_node(head)
        .map(|node| node.kind)
        .unwrap_or(NodeKind::LiteralExpression);
    let node = if is_recursive_primary_head(head_kind)
        && matches!(
            p.current_kind(),
            Some(TokenKind::LeftParenthesis)
                | Some(TokenKind::LeftBracket)
                | Some(TokenKind::LeftBrace)
        ) {
        read_recursive_primary_expression(p, head)?
    } else {
        head
    };
    p.trace.exit(trace, "read_primary_expression")?;
    Ok(node)
}

fn is_recursive_primary_head(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::FieldProjection
            | NodeKind::FieldSelector
            | NodeKind::IdentifierExpression
            | NodeKind::InvokeExpression
            | NodeKind::ItemAccessExpression
            | NodeKind::ListExpression
            | NodeKind::ParenthesizedExpression
            | NodeKind::RecordExpression
            | NodeKind::RecursivePrimaryExpression
    )
}

/// `HEAD(args)`, `HEAD{item}`, `HEAD[field]`, chained left to right. The
/// head is wrapped after the fact, so the subtree is renumbered on the way
/// out.
pub(crate) fn read_recursive_primary_expression(
    p: &mut ParseState,
    head: NodeId,
) -> ParseResult<NodeId> {
    let trace = p.trace.enter("read_recursive_primary_expression")?;
    p.start_wrap_context(NodeKind::RecursivePrimaryExpression, head)?;
    p.start_context(NodeKind::ArrayWrapper)?;
    loop {
        p.check_cancel()?;
        match p.current_kind() {
            Some(TokenKind::LeftParenthesis) => {
                read_invoke_expression(p)?;
            }
            Some(TokenKind::LeftBrace) => {
                read_item_access_expression(p)?;
            }
            Some(TokenKind::LeftBracket) => {
                let access = disambiguation::read_bracket_disambiguation(
                    p,
                    disambiguation::BracketContext::Suffix,
                )?;
                expect_member(p, access, group::is_t_field_access_expression, "field access")?;
            }
            _ => break,
        }
    }
    p.end_context()?;
    let node = p.end_context()?;
    let node = p.renumber_subtree(node);
    p.trace.exit(trace, "read_recursive_primary_expression")?;
    Ok(node)
}

/// `(EXPR)`
pub(crate) fn read_parenthesized_expression(p: &mut ParseState) -> ParseResult<NodeId> {
    p.check_cancel()?;
    let trace = p.trace.enter("read_parenthesized_expression")?;
    let open_token_index = p.token_index;
    p.start_context(NodeKind::ParenthesizedExpression)?;
    p.read_token_kind_as_constant(
        TokenKind::LeftParenthesis,
        ConstantKind::Wrapper(WrapperConstant::LeftParenthesis),
    )?;
    expression::read_expression(p)?;
    p.read_closing_token_as_constant(
        TokenKind::RightParenthesis,
        ConstantKind::Wrapper(WrapperConstant::RightParenthesis),
        open_token_index,
    )?;
    let node = p.end_context()?;
    p.trace.exit(trace, "read_parenthesized_expression")?;
    Ok(node)
}

/// `(arg, arg, ...)` as a suffix of a recursive-primary chain.
pub(crate) fn read_invoke_expression(p: &mut ParseState) -> ParseResult<NodeId> {
    p.check_cancel()?;
    let trace = p.trace.enter("read_invoke_expression")?;
    let open_token_index = p.token_index;
    p.start_context(NodeKind::InvokeExpression)?;
    p.read_token_kind_as_constant(
        TokenKind::LeftParenthesis,
        ConstantKind::Wrapper(WrapperConstant::LeftParenthesis),
    )?;
    read_csv_array(
        p,
        |p| p.is_on(TokenKind::RightParenthesis),
        expression::read_expression,
    )?;
    p.read_closing_token_as_constant(
        TokenKind::RightParenthesis,
        ConstantKind::Wrapper(WrapperConstant::RightParenthesis),
        open_token_index,
    )?;
    let node = p.end_context()?;
    p.trace.exit(trace, "read_invoke_expression")?;
    Ok(node)
}

/// `{ITEM-SELECTOR}[?]` as a suffix of a recursive-primary chain.
pub(crate) fn read_item_access_expression(p: &mut ParseState) -> ParseResult<NodeId> {
    p.check_cancel()?;
    let trace = p.trace.enter("read_item_access_expression")?;
    let open_token_index = p.token_index;
    p.start_context(NodeKind::ItemAccessExpression)?;
    p.read_token_kind_as_constant(
        TokenKind::LeftBrace,
        ConstantKind::Wrapper(WrapperConstant::LeftBrace),
    )?;
    expression::read_expression(p)?;
    p.read_closing_token_as_constant(
        TokenKind::RightBrace,
        ConstantKind::Wrapper(WrapperConstant::RightBrace),
        open_token_index,
    )?;
    p.maybe_read_token_kind_as_constant(
        TokenKind::QuestionMark,
        ConstantKind::Misc(MiscConstant::QuestionMark),
    );
    let node = p.end_context()?;
    p.trace.exit(trace, "read_item_access_expression")?;
    Ok(node)
}

/// ```txt
/// list-expression:
///     { [item-list] }
/// item:
///     expression | expression .. expression
/// ```
pub(crate) fn read_list_expression(p: &mut ParseState) -> ParseResult<NodeId> {
    p.check_cancel()?;
    let trace = p.trace.enter("read_list_expression")?;
    let open_token_index = p.token_index;
    p.start_context(NodeKind::ListExpression)?;
    p.read_token_kind_as_constant(
        TokenKind::LeftBrace,
        ConstantKind::Wrapper(WrapperConstant::LeftBrace),
    )?;
    read_csv_array(p, |p| p.is_on(TokenKind::RightBrace), read_list_item)?;
    p.read_closing_token_as_constant(
        TokenKind::RightBrace,
        ConstantKind::Wrapper(WrapperConstant::RightBrace),
        open_token_index,
    )?;
    let node = p.end_context()?;
    p.trace.exit(trace, "read_list_expression")?;
    Ok(node)
}

fn read_list_item(p: &mut ParseState) -> ParseResult<NodeId> {
    let item = expression::read_expression(p)?;
    if !p.is_on(TokenKind::DotDot) {
        return expect_member(p, item, group::is_t_list_item, "list item");
    }
    p.start_wrap_context(NodeKind::RangeExpression, item)?;
    p.read_token_kind_as_constant(TokenKind::DotDot, ConstantKind::Misc(MiscConstant::DotDot))?;
    expression::read_expression(p)?;
    let node = p.end_context()?;
    let node = p.renumber_subtree(node);
    expect_member(p, node, group::is_t_list_item, "list item")
}

/// ```txt
/// record-expression:
///     [ [field-list] ]
/// ```
///
/// The field list may end with an `...` open-record marker.
pub(crate) fn read_record_expression(p: &mut ParseState) -> ParseResult<NodeId> {
    p.check_cancel()?;
    let trace = p.trace.enter("read_record_expression")?;
    let open_token_index = p.token_index;
    p.start_context(NodeKind::RecordExpression)?;
    p.read_token_kind_as_constant(
        TokenKind::LeftBracket,
        ConstantKind::Wrapper(WrapperConstant::LeftBracket),
    )?;
    read_csv_array(
        p,
        |p| p.is_on(TokenKind::RightBracket) || p.is_on(TokenKind::Ellipsis),
        identifier::read_generalized_identifier_paired_expression,
    )?;
    p.maybe_read_token_kind_as_constant(
        TokenKind::Ellipsis,
        ConstantKind::Misc(MiscConstant::Ellipsis),
    );
    p.read_closing_token_as_constant(
        TokenKind::RightBracket,
        ConstantKind::Wrapper(WrapperConstant::RightBracket),
        open_token_index,
    )?;
    let node = p.end_context()?;
    p.trace.exit(trace, "read_record_expression")?;
    Ok(node)
}

/// `[FIELD-NAME][?]` — a lone selector at expression position selects from
/// an implicit target, as in `each [Price]`.
pub(crate) fn read_field_selector(p: &mut ParseState) -> ParseResult<NodeId> {
    p.check_cancel()?;
    let trace = p.trace.enter("read_field_selector")?;
    let open_token_index = p.token_index;
    p.start_context(NodeKind::FieldSelector)?;
    p.read_token_kind_as_constant(
        TokenKind::LeftBracket,
        ConstantKind::Wrapper(WrapperConstant::LeftBracket),
    )?;
    identifier::read_generalized_identifier(p)?;
    p.read_closing_token_as_constant(
        TokenKind::RightBracket,
        ConstantKind::Wrapper(WrapperConstant::RightBracket),
        open_token_index,
    )?;
    p.maybe_read_token_kind_as_constant(
        TokenKind::QuestionMark,
        ConstantKind::Misc(MiscConstant::QuestionMark),
    );
    let node = p.end_context()?;
    p.trace.exit(trace, "read_field_selector")?;
    Ok(node)
}

/// `[[a], [b]][?]` — projects a record down to the named fields.
pub(crate) fn read_field_projection(p: &mut ParseState) -> ParseResult<NodeId> {
    p.check_cancel()?;
    let trace = p.trace.enter("read_field_projection")?;
    let open_token_index = p.token_index;
    p.start_context(NodeKind::FieldProjection)?;
    p.read_token_kind_as_constant(
        TokenKind::LeftBracket,
        ConstantKind::Wrapper(WrapperConstant::LeftBracket),
    )?;
    read_csv_array(
        p,
        |p| p.is_on(TokenKind::RightBracket),
        read_field_selector,
    )?;
    p.read_closing_token_as_constant(
        TokenKind::RightBracket,
        ConstantKind::Wrapper(WrapperConstant::RightBracket),
        open_token_index,
    )?;
    p.maybe_read_token_kind_as_constant(
        TokenKind::QuestionMark,
        ConstantKind::Misc(MiscConstant::QuestionMark),
    );
    let node = p.end_context()?;
    p.trace.exit(trace, "read_field_projection")?;
    Ok(node)
}

/// `...` standing in for an unwritten expression.
pub(crate) fn read_not_implemented_expression(p: &mut ParseState) -> ParseResult<NodeId> {
    p.start_context(NodeKind::NotImplementedExpression)?;
    p.read_token_kind_as_constant(
        TokenKind::Ellipsis,
        ConstantKind::Misc(MiscConstant::Ellipsis),
    )?;
    let node = p.end_context()?;
    Ok(node)
}
