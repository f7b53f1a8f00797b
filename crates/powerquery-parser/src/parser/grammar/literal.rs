//! Literal expressions and the any-literal forms used by section attributes.

use crate::ast::{group, AstNodePayload, LiteralKind, NodeId, NodeKind};
use crate::constant::{ConstantKind, MiscConstant, WrapperConstant};
use crate::error::ParseResult;
use crate::parser::grammar::{expect_member, identifier, read_csv_array};
use crate::parser::ParseState;
use crate::token::TokenKind;

const LITERAL_TOKENS: &[TokenKind] = &[
    TokenKind::HexLiteral,
    TokenKind::KeywordFalse,
    TokenKind::KeywordHashInfinity,
    TokenKind::KeywordHashNan,
    TokenKind::KeywordTrue,
    TokenKind::NullLiteral,
    TokenKind::NumericLiteral,
    TokenKind::TextLiteral,
];

/// ```txt
/// literal-expression:
///     logical-literal | number-literal | text-literal | null-literal
/// ```
///
/// `#infinity` and `#nan` are numeric literals spelled as keywords.
pub(crate) fn read_literal_expression(p: &mut ParseState) -> ParseResult<NodeId> {
    let Some(token) = p.current() else {
        return Err(p.unexpected(LITERAL_TOKENS));
    };
    let literal_kind = match token.kind {
        TokenKind::NumericLiteral
        | TokenKind::HexLiteral
        | TokenKind::KeywordHashInfinity
        | TokenKind::KeywordHashNan => LiteralKind::Numeric,
        TokenKind::TextLiteral => LiteralKind::Text,
        TokenKind::KeywordTrue | TokenKind::KeywordFalse => LiteralKind::Logical,
        TokenKind::NullLiteral => LiteralKind::Null,
        _ => return Err(p.unexpected(LITERAL_TOKENS)),
    };
    let literal = token.data.clone();
    Ok(p.insert_leaf(
        NodeKind::LiteralExpression,
        AstNodePayload::Literal {
            literal,
            literal_kind,
        },
        1,
    ))
}

/// ```txt
/// any-literal:
///     record-literal | list-literal | literal-expression
/// ```
pub(crate) fn read_any_literal(p: &mut ParseState) -> ParseResult<NodeId> {
    p.check_cancel()?;
    let node = match p.current_kind() {
        Some(TokenKind::LeftBracket) => read_record_literal(p)?,
        Some(TokenKind::LeftBrace) => read_list_literal(p)?,
        _ => read_literal_expression(p)?,
    };
    expect_member(p, node, group::is_t_any_literal, "literal")
}

/// `[key = any-literal, ...]`, the attribute form of a record. Shares the
/// open-record marker handling with record expressions.
pub(crate) fn read_record_literal(p: &mut ParseState) -> ParseResult<NodeId> {
    p.check_cancel()?;
    let trace = p.trace.enter("read_record_literal")?;
    let open_token_index = p.token_index;
    p.start_context(NodeKind::RecordLiteral)?;
    p.read_token_kind_as_constant(
        TokenKind::LeftBracket,
        ConstantKind::Wrapper(WrapperConstant::LeftBracket),
    )?;
    read_csv_array(
        p,
        |p| p.is_on(TokenKind::RightBracket) || p.is_on(TokenKind::Ellipsis),
        identifier::read_generalized_identifier_paired_any_literal,
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
    p.trace.exit(trace, "read_record_literal")?;
    Ok(node)
}

/// `{any-literal, ...}`
pub(crate) fn read_list_literal(p: &mut ParseState) -> ParseResult<NodeId> {
    p.check_cancel()?;
    let trace = p.trace.enter("read_list_literal")?;
    let open_token_index = p.token_index;
    p.start_context(NodeKind::ListLiteral)?;
    p.read_token_kind_as_constant(
        TokenKind::LeftBrace,
        ConstantKind::Wrapper(WrapperConstant::LeftBrace),
    )?;
    read_csv_array(p, |p| p.is_on(TokenKind::RightBrace), read_any_literal)?;
    p.read_closing_token_as_constant(
        TokenKind::RightBrace,
        ConstantKind::Wrapper(WrapperConstant::RightBrace),
        open_token_index,
    )?;
    let node = p.end_context()?;
    p.trace.exit(trace, "read_list_literal")?;
    Ok(node)
}

#[cfg(test)]
mod test {
    use crate::ast::{AstNodePayload, LiteralKind, NodeKind};
    use crate::tests::support::parse_ok;

    fn literal_kind_of(text: &str) -> LiteralKind {
        let ok = parse_ok(text);
        match &ok.node_id_map.ast_node(ok.root_id).unwrap().payload {
            AstNodePayload::Literal { literal_kind, .. } => *literal_kind,
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn literal_kinds_follow_their_tokens() {
        assert_eq!(literal_kind_of("1"), LiteralKind::Numeric);
        assert_eq!(literal_kind_of("0xFF"), LiteralKind::Numeric);
        assert_eq!(literal_kind_of("#infinity"), LiteralKind::Numeric);
        assert_eq!(literal_kind_of("\"a\""), LiteralKind::Text);
        assert_eq!(literal_kind_of("true"), LiteralKind::Logical);
        assert_eq!(literal_kind_of("null"), LiteralKind::Null);
    }

    #[test]
    fn attribute_records_nest_list_literals() {
        let ok = parse_ok("[tags = {1, \"a\"}] section s;");
        let list = ok.node_id_map.ids_of_kind(NodeKind::ListLiteral).next();
        assert!(list.is_some());
        let record = ok
            .node_id_map
            .ids_of_kind(NodeKind::RecordLiteral)
            .next()
            .unwrap();
        assert_eq!(ok.node_id_map.parent_id(record), Some(ok.root_id));
    }
}
