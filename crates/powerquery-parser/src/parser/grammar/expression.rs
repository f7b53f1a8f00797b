//! Expressions: the top-level dispatch, the keyworded forms, and the naive
//! layered binary-operator readers.

use crate::ast::{group, NodeId, NodeKind};
use crate::constant::{BinOpOperator, ConstantKind, KeywordConstant, MiscConstant, UnaryOperator};
use crate::error::ParseResult;
use crate::parser::grammar::{
    combinator, disambiguation, expect_member, identifier, parameter, read_csv_array,
    read_paired_constant, ty,
};
use crate::parser::{ParseState, ParserVariant};
use crate::token::TokenKind;

/// See: https://learn.microsoft.com/powerquery-m/m-spec-expressions
///
/// ```txt
/// expression:
///     logical-or-expression
///     each-expression
///     function-expression
///     let-expression
///     if-expression
///     error-raising-expression
///     error-handling-expression
/// ```
pub(crate) fn read_expression(p: &mut ParseState) -> ParseResult<NodeId> {
    p.check_cancel()?;
    let trace = p.trace.enter("read_expression")?;
    let node = match p.current_kind() {
        Some(TokenKind::KeywordEach) => read_each_expression(p)?,
        Some(TokenKind::KeywordLet) => read_let_expression(p)?,
        Some(TokenKind::KeywordIf) => read_if_expression(p)?,
        Some(TokenKind::KeywordError) => read_error_raising_expression(p)?,
        Some(TokenKind::KeywordTry) => read_error_handling_expression(p)?,
        Some(TokenKind::LeftParenthesis) => disambiguation::read_parenthesis_disambiguation(p)?,
        _ => read_binary_expression_chain(p)?,
    };
    p.trace.exit(trace, "read_expression")?;
    Ok(node)
}

/// Entry into the operator ladder, dispatched on the configured variant.
pub(crate) fn read_binary_expression_chain(p: &mut ParseState) -> ParseResult<NodeId> {
    match p.variant {
        ParserVariant::NaiveRecursiveDescent => read_null_coalescing_expression(p),
        ParserVariant::CombinatorialFastPath => combinator::read_bin_op_expression(p),
    }
}

/// `each EXPR`
pub(crate) fn read_each_expression(p: &mut ParseState) -> ParseResult<NodeId> {
    p.check_cancel()?;
    read_paired_constant(
        p,
        NodeKind::EachExpression,
        TokenKind::KeywordEach,
        ConstantKind::Keyword(KeywordConstant::Each),
        read_expression,
    )
}

/// ```txt
/// let-expression:
///     let variable-list in expression
/// variable:
///     variable-name = expression
/// ```
pub(crate) fn read_let_expression(p: &mut ParseState) -> ParseResult<NodeId> {
    p.check_cancel()?;
    let trace = p.trace.enter("read_let_expression")?;
    p.start_context(NodeKind::LetExpression)?;
    p.read_token_kind_as_constant(
        TokenKind::KeywordLet,
        ConstantKind::Keyword(KeywordConstant::Let),
    )?;
    read_csv_array(p, |_| false, |p| {
        let variable = identifier::read_identifier_paired_expression(p)?;
        expect_member(p, variable, group::is_t_key_value_pair, "variable")
    })?;
    p.read_token_kind_as_constant(
        TokenKind::KeywordIn,
        ConstantKind::Keyword(KeywordConstant::In),
    )?;
    read_expression(p)?;
    let node = p.end_context()?;
    p.trace.exit(trace, "read_let_expression")?;
    Ok(node)
}

/// `if EXPR then EXPR else EXPR`
pub(crate) fn read_if_expression(p: &mut ParseState) -> ParseResult<NodeId> {
    p.check_cancel()?;
    let trace = p.trace.enter("read_if_expression")?;
    p.start_context(NodeKind::IfExpression)?;
    p.read_token_kind_as_constant(
        TokenKind::KeywordIf,
        ConstantKind::Keyword(KeywordConstant::If),
    )?;
    read_expression(p)?;
    p.read_token_kind_as_constant(
        TokenKind::KeywordThen,
        ConstantKind::Keyword(KeywordConstant::Then),
    )?;
    read_expression(p)?;
    p.read_token_kind_as_constant(
        TokenKind::KeywordElse,
        ConstantKind::Keyword(KeywordConstant::Else),
    )?;
    read_expression(p)?;
    let node = p.end_context()?;
    p.trace.exit(trace, "read_if_expression")?;
    Ok(node)
}

/// `error EXPR`
pub(crate) fn read_error_raising_expression(p: &mut ParseState) -> ParseResult<NodeId> {
    p.check_cancel()?;
    read_paired_constant(
        p,
        NodeKind::ErrorRaisingExpression,
        TokenKind::KeywordError,
        ConstantKind::Keyword(KeywordConstant::Error),
        read_expression,
    )
}

/// `try EXPR [otherwise EXPR]`
pub(crate) fn read_error_handling_expression(p: &mut ParseState) -> ParseResult<NodeId> {
    p.check_cancel()?;
    let trace = p.trace.enter("read_error_handling_expression")?;
    p.start_context(NodeKind::ErrorHandlingExpression)?;
    p.read_token_kind_as_constant(
        TokenKind::KeywordTry,
        ConstantKind::Keyword(KeywordConstant::Try),
    )?;
    read_expression(p)?;
    if p.is_on(TokenKind::KeywordOtherwise) {
        read_paired_constant(
            p,
            NodeKind::OtherwiseExpression,
            TokenKind::KeywordOtherwise,
            ConstantKind::Keyword(KeywordConstant::Otherwise),
            read_expression,
        )?;
    }
    let node = p.end_context()?;
    p.trace.exit(trace, "read_error_handling_expression")?;
    Ok(node)
}

/// ```txt
/// function-expression:
///     parameter-list [as nullable-primitive-type] => expression
/// ```
pub(crate) fn read_function_expression(p: &mut ParseState) -> ParseResult<NodeId> {
    p.check_cancel()?;
    let trace = p.trace.enter("read_function_expression")?;
    p.start_context(NodeKind::FunctionExpression)?;
    parameter::read_parameter_list(p, parameter::ParameterTypeStyle::NullablePrimitive)?;
    if p.is_on(TokenKind::KeywordAs) {
        read_paired_constant(
            p,
            NodeKind::AsNullablePrimitiveType,
            TokenKind::KeywordAs,
            ConstantKind::Keyword(KeywordConstant::As),
            ty::read_nullable_primitive_type,
        )?;
    }
    p.read_token_kind_as_constant(TokenKind::FatArrow, ConstantKind::Misc(MiscConstant::FatArrow))?;
    read_expression(p)?;
    let node = p.end_context()?;
    p.trace.exit(trace, "read_function_expression")?;
    Ok(node)
}

// ---- the naive operator ladder ----
//
// One reader per precedence level. Each level folds left-associatively: the
// first fold happens inside a context opened before the left operand was
// read; later folds wrap the committed chain and renumber.

pub(crate) fn read_null_coalescing_expression(p: &mut ParseState) -> ParseResult<NodeId> {
    read_left_associative_bin_op(
        p,
        "read_null_coalescing_expression",
        NodeKind::NullCoalescingExpression,
        &[BinOpOperator::NullCoalescing],
        read_logical_expression,
        read_logical_expression,
    )
}

pub(crate) fn read_logical_expression(p: &mut ParseState) -> ParseResult<NodeId> {
    read_left_associative_bin_op(
        p,
        "read_logical_expression",
        NodeKind::LogicalExpression,
        &[BinOpOperator::Or],
        read_logical_and_expression,
        read_logical_and_expression,
    )
}

fn read_logical_and_expression(p: &mut ParseState) -> ParseResult<NodeId> {
    read_left_associative_bin_op(
        p,
        "read_logical_and_expression",
        NodeKind::LogicalExpression,
        &[BinOpOperator::And],
        read_is_expression,
        read_is_expression,
    )
}

pub(crate) fn read_is_expression(p: &mut ParseState) -> ParseResult<NodeId> {
    read_left_associative_bin_op(
        p,
        "read_is_expression",
        NodeKind::IsExpression,
        &[BinOpOperator::Is],
        read_as_expression,
        ty::read_nullable_primitive_type,
    )
}

pub(crate) fn read_as_expression(p: &mut ParseState) -> ParseResult<NodeId> {
    read_left_associative_bin_op(
        p,
        "read_as_expression",
        NodeKind::AsExpression,
        &[BinOpOperator::As],
        read_equality_expression,
        ty::read_nullable_primitive_type,
    )
}

pub(crate) fn read_equality_expression(p: &mut ParseState) -> ParseResult<NodeId> {
    read_left_associative_bin_op(
        p,
        "read_equality_expression",
        NodeKind::EqualityExpression,
        &[BinOpOperator::EqualTo, BinOpOperator::NotEqualTo],
        read_relational_expression,
        read_relational_expression,
    )
}

pub(crate) fn read_relational_expression(p: &mut ParseState) -> ParseResult<NodeId> {
    read_left_associative_bin_op(
        p,
        "read_relational_expression",
        NodeKind::RelationalExpression,
        &[
            BinOpOperator::LessThan,
            BinOpOperator::LessThanEqualTo,
            BinOpOperator::GreaterThan,
            BinOpOperator::GreaterThanEqualTo,
        ],
        read_additive_expression,
        read_additive_expression,
    )
}

fn read_additive_expression(p: &mut ParseState) -> ParseResult<NodeId> {
    read_left_associative_bin_op(
        p,
        "read_additive_expression",
        NodeKind::ArithmeticExpression,
        &[
            BinOpOperator::Addition,
            BinOpOperator::Subtraction,
            BinOpOperator::Concatenation,
        ],
        read_multiplicative_expression,
        read_multiplicative_expression,
    )
}

fn read_multiplicative_expression(p: &mut ParseState) -> ParseResult<NodeId> {
    read_left_associative_bin_op(
        p,
        "read_multiplicative_expression",
        NodeKind::ArithmeticExpression,
        &[BinOpOperator::Multiplication, BinOpOperator::Division],
        read_metadata_expression,
        read_metadata_expression,
    )
}

pub(crate) fn read_metadata_expression(p: &mut ParseState) -> ParseResult<NodeId> {
    read_left_associative_bin_op(
        p,
        "read_metadata_expression",
        NodeKind::MetadataExpression,
        &[BinOpOperator::Meta],
        read_unary_expression,
        read_unary_expression,
    )
}

/// ```txt
/// unary-expression:
///     type-expression
///     + unary-expression
///     - unary-expression
///     not unary-expression
/// ```
///
/// The operator run collapses into one `ArrayWrapper` of constants so the
/// sequence itself is addressable.
pub(crate) fn read_unary_expression(p: &mut ParseState) -> ParseResult<NodeId> {
    p.check_cancel()?;
    let Some(operator) = p.current_kind().and_then(UnaryOperator::from_token_kind) else {
        return ty::read_type_expression(p);
    };
    let trace = p.trace.enter("read_unary_expression")?;
    p.start_context(NodeKind::UnaryExpression)?;
    p.start_context(NodeKind::ArrayWrapper)?;
    let mut next = Some(operator);
    while let Some(operator) = next {
        p.read_token_kind_as_constant(
            operator_token_kind(operator),
            ConstantKind::Unary(operator),
        )?;
        next = p.current_kind().and_then(UnaryOperator::from_token_kind);
    }
    p.end_context()?;
    ty::read_type_expression(p)?;
    let node = p.end_context()?;
    p.trace.exit(trace, "read_unary_expression")?;
    Ok(node)
}

fn operator_token_kind(operator: UnaryOperator) -> TokenKind {
    match operator {
        UnaryOperator::Positive => TokenKind::Plus,
        UnaryOperator::Negative => TokenKind::Minus,
        UnaryOperator::Not => TokenKind::KeywordNot,
    }
}

/// Generic left-associative fold over one precedence level.
fn read_left_associative_bin_op(
    p: &mut ParseState,
    reader: &'static str,
    node_kind: NodeKind,
    operators: &[BinOpOperator],
    read_left: fn(&mut ParseState) -> ParseResult<NodeId>,
    read_right: fn(&mut ParseState) -> ParseResult<NodeId>,
) -> ParseResult<NodeId> {
    p.check_cancel()?;
    let trace = p.trace.enter(reader)?;
    p.start_context(node_kind)?;
    let left = read_left(p)?;

    let Some(operator) = current_operator(p, operators) else {
        // No operators: the chain is just its left operand.
        let promoted = p.delete_context_and_promote()?;
        debug_assert_eq!(promoted, Some(left));
        p.trace.exit(trace, reader)?;
        return Ok(left);
    };
    p.read_token_kind_as_constant(operator.token_kind(), operator.constant_kind())?;
    read_right(p)?;
    let mut node = p.end_context()?;

    let mut wrapped = false;
    while let Some(operator) = current_operator(p, operators) {
        p.check_cancel()?;
        p.start_wrap_context(node_kind, node)?;
        p.read_token_kind_as_constant(operator.token_kind(), operator.constant_kind())?;
        read_right(p)?;
        node = p.end_context()?;
        wrapped = true;
    }
    if wrapped {
        node = p.renumber_subtree(node);
    }
    p.trace.exit(trace, reader)?;
    Ok(node)
}

fn current_operator(p: &ParseState, operators: &[BinOpOperator]) -> Option<BinOpOperator> {
    let operator = BinOpOperator::from_token_kind(p.current_kind()?)?;
    operators.contains(&operator).then_some(operator)
}
