//! The combinatorial binary-expression engine.
//!
//! A literal descent through the operator ladder enters and unwinds ten
//! no-op contexts to read a single literal. This engine reads the whole
//! chain flat — one initial operand, then (operator, operand) pairs driven
//! by a look-ahead table — and only then shapes the run into a
//! precedence-correct left-deep tree.
//!
//! Phase 1 runs with the current context detached, so the flat pieces enter
//! the node-id map parentless and nothing has to be stripped back out.
//! Phase 2 links them under freshly built binary nodes, folding the
//! tightest-binding operator first (leftmost on ties, which yields left
//! associativity), and finally renumbers the subtree to restore the
//! pre-order id invariant.

use crate::ast::{group, AstNode, AstNodePayload, NodeId, NodeKind};
use crate::constant::{BinOpOperator, ConstantKind, DuoRead, LogicalOperator};
use crate::error::{ParseErrorKind, ParseResult};
use crate::parser::grammar::{expression, ty};
use crate::parser::ParseState;

pub(crate) fn read_bin_op_expression(p: &mut ParseState) -> ParseResult<NodeId> {
    p.check_cancel()?;
    let trace = p.trace.enter("read_bin_op_expression")?;

    let saved_context = p.current_context_id.take();
    let result = read_flat_then_shape(p);
    p.current_context_id = saved_context;
    let (root, shaped) = result?;

    p.attach_under_current_context(root);
    let root = if shaped { p.renumber_subtree(root) } else { root };
    p.trace.exit(trace, "read_bin_op_expression")?;
    Ok(root)
}

fn read_flat_then_shape(p: &mut ParseState) -> ParseResult<(NodeId, bool)> {
    // Phase 1: flat collection into local vectors.
    let initial = expression::read_unary_expression(p)?;
    let mut operands = vec![initial];
    let mut operators: Vec<(NodeId, BinOpOperator)> = Vec::new();

    while let Some(operator) = p.current_kind().and_then(BinOpOperator::from_token_kind) {
        p.check_cancel()?;
        let constant =
            p.read_token_kind_as_constant(operator.token_kind(), operator.constant_kind())?;
        let operand = match operator.duo_read() {
            DuoRead::UnaryExpression => expression::read_unary_expression(p)?,
            DuoRead::NullablePrimitiveType => ty::read_nullable_primitive_type(p)?,
            DuoRead::LogicalExpression => expression::read_logical_expression(p)?,
        };
        operators.push((constant, operator));
        operands.push(operand);
    }

    if operators.is_empty() {
        return Ok((initial, false));
    }

    // Phase 2: shape by precedence.
    while !operators.is_empty() {
        p.check_cancel()?;
        let index = fold_index(&operators);
        let (constant, operator) = operators[index];
        let left = operands[index];
        let right = operands[index + 1];

        validate_operand(p, operator, left, OperandSide::Left)?;
        validate_operand(p, operator, right, OperandSide::Right)?;

        let node = build_bin_op_node(p, operator, left, constant, right)?;
        operands[index] = node;
        operands.remove(index + 1);
        operators.remove(index);
    }
    Ok((operands[0], true))
}

/// The next fold: leftmost among the tightest-binding operators remaining.
fn fold_index(operators: &[(NodeId, BinOpOperator)]) -> usize {
    let mut best = 0;
    for (index, (_, operator)) in operators.iter().enumerate().skip(1) {
        if operator.precedence() > operators[best].1.precedence() {
            best = index;
        }
    }
    best
}

fn build_bin_op_node(
    p: &mut ParseState,
    operator: BinOpOperator,
    left: NodeId,
    constant: NodeId,
    right: NodeId,
) -> ParseResult<NodeId> {
    let left_start = node_token_range(p, left)?.token_index_start;
    let right_end = node_token_range(p, right)?.token_index_end;
    let token_range = p.token_range(left_start, right_end);

    let id = p.context_state.next_node_id();
    p.map_mut().insert_ast_node(AstNode {
        kind: operator.node_kind(),
        id,
        attribute_index: None,
        token_range,
        payload: AstNodePayload::None,
    });
    for (index, child) in [left, constant, right].into_iter().enumerate() {
        p.map_mut().link_child(id, child);
        p.map_mut().set_attribute_index(child, Some(index as u32));
    }
    Ok(id)
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum OperandSide {
    Left,
    Right,
}

/// Checks an operand against the shapes its operator's grammar production
/// allows. The left side additionally accepts the production's own level,
/// which is what a finished earlier fold of the same level is.
fn validate_operand(
    p: &mut ParseState,
    operator: BinOpOperator,
    operand: NodeId,
    side: OperandSide,
) -> ParseResult<()> {
    let kind = node_kind(p, operand)?;
    let valid = match operator {
        BinOpOperator::Multiplication
        | BinOpOperator::Division
        | BinOpOperator::Addition
        | BinOpOperator::Subtraction
        | BinOpOperator::Concatenation => group::is_t_arithmetic_expression(kind),
        BinOpOperator::LessThan
        | BinOpOperator::LessThanEqualTo
        | BinOpOperator::GreaterThan
        | BinOpOperator::GreaterThanEqualTo => match side {
            OperandSide::Left => group::is_t_relational_expression(kind),
            OperandSide::Right => group::is_t_arithmetic_expression(kind),
        },
        BinOpOperator::EqualTo | BinOpOperator::NotEqualTo => match side {
            OperandSide::Left => group::is_t_equality_expression(kind),
            OperandSide::Right => group::is_t_relational_expression(kind),
        },
        BinOpOperator::As => match side {
            OperandSide::Left => group::is_t_as_expression(kind),
            OperandSide::Right => group::is_t_nullable_primitive_type(kind),
        },
        BinOpOperator::Is => match side {
            OperandSide::Left => group::is_t_is_expression(kind),
            OperandSide::Right => group::is_t_nullable_primitive_type(kind),
        },
        BinOpOperator::And => match side {
            OperandSide::Left => {
                group::is_t_is_expression(kind)
                    || is_logical_with_operator(p, operand, LogicalOperator::And)
            }
            OperandSide::Right => group::is_t_is_expression(kind),
        },
        BinOpOperator::Or => match side {
            OperandSide::Left => group::is_t_logical_expression(kind),
            OperandSide::Right => {
                group::is_t_is_expression(kind)
                    || is_logical_with_operator(p, operand, LogicalOperator::And)
            }
        },
        BinOpOperator::Meta => group::is_t_metadata_expression(kind),
        BinOpOperator::NullCoalescing => match side {
            OperandSide::Left => {
                kind == NodeKind::NullCoalescingExpression || group::is_t_logical_expression(kind)
            }
            OperandSide::Right => group::is_t_logical_expression(kind),
        },
    };
    if valid {
        Ok(())
    } else {
        Err(fallback_raise(p, operator, operand))
    }
}

fn is_logical_with_operator(p: &ParseState, id: NodeId, operator: LogicalOperator) -> bool {
    let Ok(node) = p.map().ast_node(id) else {
        return false;
    };
    if node.kind != NodeKind::LogicalExpression {
        return false;
    }
    matches!(
        p.map()
            .nth_child_ast(id, 1, &[NodeKind::Constant])
            .map(|constant| &constant.payload),
        Some(AstNodePayload::Constant(ConstantKind::Logical(found))) if *found == operator
    )
}

/// A rejected operand re-enters naive parsing at the level the operator's
/// production demands, positioned at the operand's first token. The naive
/// reader is expected to raise the structured error; it returning is itself
/// an invariant violation.
fn fallback_raise(p: &mut ParseState, operator: BinOpOperator, operand: NodeId) -> ParseErrorKind {
    let start = match node_token_range(p, operand) {
        Ok(range) => range.token_index_start,
        Err(error) => return error,
    };
    p.token_index = start;
    let result = match operator {
        BinOpOperator::Multiplication
        | BinOpOperator::Division
        | BinOpOperator::Addition
        | BinOpOperator::Subtraction
        | BinOpOperator::Concatenation
        | BinOpOperator::LessThan
        | BinOpOperator::LessThanEqualTo
        | BinOpOperator::GreaterThan
        | BinOpOperator::GreaterThanEqualTo
        | BinOpOperator::EqualTo
        | BinOpOperator::NotEqualTo => expression::read_metadata_expression(p),
        BinOpOperator::And | BinOpOperator::Or => expression::read_is_expression(p),
        BinOpOperator::As => expression::read_equality_expression(p),
        BinOpOperator::Is => expression::read_as_expression(p),
        BinOpOperator::Meta => expression::read_unary_expression(p),
        BinOpOperator::NullCoalescing => expression::read_logical_expression(p),
    };
    match result {
        Err(error) => error,
        Ok(_) => ParseErrorKind::invariant("fallback reader returned without raising"),
    }
}

fn node_kind(p: &ParseState, id: NodeId) -> ParseResult<NodeKind> {
    p.map()
        .ast_node(id)
        .map(|node| node.kind)
        .map_err(|error| ParseErrorKind::invariant(error.to_string()))
}

fn node_token_range(p: &ParseState, id: NodeId) -> ParseResult<crate::token::TokenRange> {
    p.map()
        .ast_node(id)
        .map(|node| node.token_range)
        .map_err(|error| ParseErrorKind::invariant(error.to_string()))
}

#[cfg(test)]
mod test {
    use super::fold_index;
    use crate::ast::NodeId;
    use crate::constant::BinOpOperator;
    use crate::tests::support::parse_err;
    use crate::ParseErrorKind;

    #[test]
    fn fold_index_prefers_the_leftmost_tightest_operator() {
        let operators = vec![
            (NodeId(0), BinOpOperator::Addition),
            (NodeId(1), BinOpOperator::Multiplication),
            (NodeId(2), BinOpOperator::Multiplication),
        ];
        assert_eq!(fold_index(&operators), 1);
        let equal = vec![
            (NodeId(0), BinOpOperator::Addition),
            (NodeId(1), BinOpOperator::Addition),
        ];
        assert_eq!(fold_index(&equal), 0);
    }

    #[test]
    fn rejected_operand_with_a_returning_fallback_is_an_invariant_violation() {
        // `number` is the right-hand side of `as` and can never be an
        // arithmetic operand; re-reading it as one succeeds as a plain
        // identifier, which the engine treats as its own bug.
        let error = parse_err("1 as number + 2");
        assert!(
            matches!(error.kind, ParseErrorKind::InvariantViolated(_)),
            "{:?}",
            error.kind
        );
    }
}
