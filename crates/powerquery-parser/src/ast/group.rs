//! Kind-group membership.
//!
//! The grammar's polymorphic slots nest: every primary expression is a type
//! expression, every type expression a unary expression, and so on down the
//! operator ladder to `TExpression`. Each predicate below answers whether a
//! kind belongs to the named group; construction sites and the combinatorial
//! engine validate children through these instead of generics.

use super::NodeKind;

/// The five variants that carry a literal payload and never have children.
pub fn is_leaf(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Constant
            | NodeKind::Identifier
            | NodeKind::GeneralizedIdentifier
            | NodeKind::LiteralExpression
            | NodeKind::PrimitiveType
    )
}

pub fn is_t_primary_expression(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::FieldProjection
            | NodeKind::FieldSelector
            | NodeKind::IdentifierExpression
            | NodeKind::InvokeExpression
            | NodeKind::ItemAccessExpression
            | NodeKind::ListExpression
            | NodeKind::LiteralExpression
            | NodeKind::NotImplementedExpression
            | NodeKind::ParenthesizedExpression
            | NodeKind::RecordExpression
            | NodeKind::RecursivePrimaryExpression
    )
}

pub fn is_t_type_expression(kind: NodeKind) -> bool {
    kind == NodeKind::TypePrimaryType || is_t_primary_expression(kind)
}

pub fn is_t_unary_expression(kind: NodeKind) -> bool {
    kind == NodeKind::UnaryExpression || is_t_type_expression(kind)
}

pub fn is_t_metadata_expression(kind: NodeKind) -> bool {
    kind == NodeKind::MetadataExpression || is_t_unary_expression(kind)
}

pub fn is_t_arithmetic_expression(kind: NodeKind) -> bool {
    kind == NodeKind::ArithmeticExpression || is_t_metadata_expression(kind)
}

pub fn is_t_relational_expression(kind: NodeKind) -> bool {
    kind == NodeKind::RelationalExpression || is_t_arithmetic_expression(kind)
}

pub fn is_t_equality_expression(kind: NodeKind) -> bool {
    kind == NodeKind::EqualityExpression || is_t_relational_expression(kind)
}

pub fn is_t_as_expression(kind: NodeKind) -> bool {
    kind == NodeKind::AsExpression || is_t_equality_expression(kind)
}

pub fn is_t_is_expression(kind: NodeKind) -> bool {
    kind == NodeKind::IsExpression || is_t_as_expression(kind)
}

pub fn is_t_logical_expression(kind: NodeKind) -> bool {
    kind == NodeKind::LogicalExpression || is_t_is_expression(kind)
}

pub fn is_t_expression(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::EachExpression
            | NodeKind::ErrorHandlingExpression
            | NodeKind::ErrorRaisingExpression
            | NodeKind::FunctionExpression
            | NodeKind::IfExpression
            | NodeKind::LetExpression
            | NodeKind::NullCoalescingExpression
    ) || is_t_logical_expression(kind)
}

pub fn is_t_nullable_primitive_type(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::NullablePrimitiveType | NodeKind::PrimitiveType
    )
}

pub fn is_t_primary_type(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::FunctionType
            | NodeKind::ListType
            | NodeKind::NullableType
            | NodeKind::PrimitiveType
            | NodeKind::RecordType
            | NodeKind::TableType
    )
}

pub fn is_t_field_access_expression(kind: NodeKind) -> bool {
    matches!(kind, NodeKind::FieldProjection | NodeKind::FieldSelector)
}

pub fn is_t_any_literal(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::ListLiteral | NodeKind::LiteralExpression | NodeKind::RecordLiteral
    )
}

pub fn is_t_list_item(kind: NodeKind) -> bool {
    kind == NodeKind::RangeExpression || is_t_expression(kind)
}

pub fn is_t_key_value_pair(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::GeneralizedIdentifierPairedAnyLiteral
            | NodeKind::GeneralizedIdentifierPairedExpression
            | NodeKind::IdentifierPairedExpression
    )
}

pub fn is_t_paired_constant(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::AsNullablePrimitiveType
            | NodeKind::AsType
            | NodeKind::EachExpression
            | NodeKind::ErrorRaisingExpression
            | NodeKind::NullablePrimitiveType
            | NodeKind::NullableType
            | NodeKind::OtherwiseExpression
            | NodeKind::TypePrimaryType
    )
}

pub fn is_t_wrapped(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::FieldProjection
            | NodeKind::FieldSelector
            | NodeKind::FieldSpecificationList
            | NodeKind::InvokeExpression
            | NodeKind::ItemAccessExpression
            | NodeKind::ListExpression
            | NodeKind::ListLiteral
            | NodeKind::ListType
            | NodeKind::ParameterList
            | NodeKind::ParenthesizedExpression
            | NodeKind::RecordExpression
            | NodeKind::RecordLiteral
    )
}

pub fn is_t_bin_op_expression(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::ArithmeticExpression
            | NodeKind::AsExpression
            | NodeKind::EqualityExpression
            | NodeKind::IsExpression
            | NodeKind::LogicalExpression
            | NodeKind::MetadataExpression
            | NodeKind::NullCoalescingExpression
            | NodeKind::RelationalExpression
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn operator_ladder_is_nested() {
        // Each level must contain the previous one.
        let levels: &[fn(NodeKind) -> bool] = &[
            is_t_primary_expression,
            is_t_type_expression,
            is_t_unary_expression,
            is_t_metadata_expression,
            is_t_arithmetic_expression,
            is_t_relational_expression,
            is_t_equality_expression,
            is_t_as_expression,
            is_t_is_expression,
            is_t_logical_expression,
            is_t_expression,
        ];
        let all = [
            NodeKind::LiteralExpression,
            NodeKind::UnaryExpression,
            NodeKind::MetadataExpression,
            NodeKind::ArithmeticExpression,
            NodeKind::RelationalExpression,
            NodeKind::EqualityExpression,
            NodeKind::AsExpression,
            NodeKind::IsExpression,
            NodeKind::LogicalExpression,
            NodeKind::LetExpression,
        ];
        for pair in levels.windows(2) {
            for kind in all {
                if pair[0](kind) {
                    assert!(pair[1](kind), "{kind:?} should stay in the wider group");
                }
            }
        }
    }

    #[test]
    fn leaves_are_not_binary() {
        for kind in [
            NodeKind::Constant,
            NodeKind::Identifier,
            NodeKind::GeneralizedIdentifier,
            NodeKind::LiteralExpression,
            NodeKind::PrimitiveType,
        ] {
            assert!(is_leaf(kind));
            assert!(!is_t_bin_op_expression(kind));
        }
    }
}
