//! Type expressions and primary types.

use crate::ast::{group, AstNodePayload, NodeId, NodeKind};
use crate::constant::{
    ConstantKind, KeywordConstant, LanguageConstant, MiscConstant, PrimitiveTypeConstant,
    WrapperConstant,
};
use crate::error::{ParseErrorKind, ParseResult};
use crate::parser::grammar::{
    expect_member, identifier, is_on_identifier_text, maybe_read_language_constant, parameter,
    primary, read_csv_array, read_identifier_text_as_constant, read_paired_constant,
};
use crate::parser::ParseState;
use crate::token::TokenKind;

/// ```txt
/// type-expression:
///     primary-expression
///     type primary-type
/// ```
pub(crate) fn read_type_expression(p: &mut ParseState) -> ParseResult<NodeId> {
    p.check_cancel()?;
    if p.is_on(TokenKind::KeywordType) {
        read_paired_constant(
            p,
            NodeKind::TypePrimaryType,
            TokenKind::KeywordType,
            ConstantKind::Keyword(KeywordConstant::Type),
            |p| {
                let node = read_primary_type(p)?;
                expect_member(p, node, group::is_t_primary_type, "primary type")
            },
        )
    } else {
        primary::read_primary_expression(p)
    }
}

/// A type position that accepts either a primary type or, failing that, a
/// primary expression evaluating to a type.
pub(crate) fn read_type(p: &mut ParseState) -> ParseResult<NodeId> {
    p.check_cancel()?;
    let checkpoint = p.checkpoint();
    match read_primary_type(p) {
        Ok(node) => Ok(node),
        Err(error) if error.is_fatal() => Err(error),
        Err(_) => {
            p.restore(checkpoint);
            primary::read_primary_expression(p)
        }
    }
}

/// ```txt
/// primary-type:
///     primitive-type | record-type | list-type | function-type
///     table-type | nullable-type
/// ```
pub(crate) fn read_primary_type(p: &mut ParseState) -> ParseResult<NodeId> {
    p.check_cancel()?;
    let trace = p.trace.enter("read_primary_type")?;
    let node = match p.current_kind() {
        Some(TokenKind::LeftBracket) => read_record_type(p)?,
        Some(TokenKind::LeftBrace) => read_list_type(p)?,
        Some(TokenKind::Identifier) => {
            if is_on_identifier_text(p, "function")
                && p.peek_kind(1) == Some(TokenKind::LeftParenthesis)
            {
                read_function_type(p)?
            } else if is_on_identifier_text(p, "table") && table_type_follows(p) {
                read_table_type(p)?
            } else if is_on_identifier_text(p, LanguageConstant::Nullable.as_str()) {
                read_nullable_type(p)?
            } else {
                read_primitive_type(p)?
            }
        }
        Some(TokenKind::NullLiteral) | Some(TokenKind::KeywordType) => read_primitive_type(p)?,
        _ => {
            return Err(p.unexpected(&[
                TokenKind::Identifier,
                TokenKind::LeftBracket,
                TokenKind::LeftBrace,
                TokenKind::NullLiteral,
            ]))
        }
    };
    p.trace.exit(trace, "read_primary_type")?;
    Ok(node)
}

/// `table` opens a table type only when a row schema can follow; a bare
/// `table` is the primitive type.
fn table_type_follows(p: &ParseState) -> bool {
    matches!(
        p.peek_kind(1),
        Some(TokenKind::LeftBracket)
            | Some(TokenKind::Identifier)
            | Some(TokenKind::AtSign)
            | Some(TokenKind::LeftParenthesis)
    )
}

/// `[field-specification-list]` under `type`.
fn read_record_type(p: &mut ParseState) -> ParseResult<NodeId> {
    let trace = p.trace.enter("read_record_type")?;
    p.start_context(NodeKind::RecordType)?;
    read_field_specification_list(p)?;
    let node = p.end_context()?;
    p.trace.exit(trace, "read_record_type")?;
    Ok(node)
}

/// `{ITEM-TYPE}`
fn read_list_type(p: &mut ParseState) -> ParseResult<NodeId> {
    let trace = p.trace.enter("read_list_type")?;
    let open_token_index = p.token_index;
    p.start_context(NodeKind::ListType)?;
    p.read_token_kind_as_constant(
        TokenKind::LeftBrace,
        ConstantKind::Wrapper(WrapperConstant::LeftBrace),
    )?;
    read_type(p)?;
    p.read_closing_token_as_constant(
        TokenKind::RightBrace,
        ConstantKind::Wrapper(WrapperConstant::RightBrace),
        open_token_index,
    )?;
    let node = p.end_context()?;
    p.trace.exit(trace, "read_list_type")?;
    Ok(node)
}

/// `function (x as number, optional y as text) as any`
fn read_function_type(p: &mut ParseState) -> ParseResult<NodeId> {
    let trace = p.trace.enter("read_function_type")?;
    p.start_context(NodeKind::FunctionType)?;
    read_identifier_text_as_constant(
        p,
        "function",
        ConstantKind::PrimitiveType(PrimitiveTypeConstant::Function),
    )?;
    parameter::read_parameter_list(p, parameter::ParameterTypeStyle::Type)?;
    read_paired_constant(
        p,
        NodeKind::AsType,
        TokenKind::KeywordAs,
        ConstantKind::Keyword(KeywordConstant::As),
        read_type,
    )?;
    let node = p.end_context()?;
    p.trace.exit(trace, "read_function_type")?;
    Ok(node)
}

/// `table [a = number, ...]` or `table SCHEMA-EXPR`
fn read_table_type(p: &mut ParseState) -> ParseResult<NodeId> {
    let trace = p.trace.enter("read_table_type")?;
    p.start_context(NodeKind::TableType)?;
    read_identifier_text_as_constant(
        p,
        "table",
        ConstantKind::PrimitiveType(PrimitiveTypeConstant::Table),
    )?;
    if p.is_on(TokenKind::LeftBracket) {
        read_field_specification_list(p)?;
    } else {
        primary::read_primary_expression(p)?;
    }
    let node = p.end_context()?;
    p.trace.exit(trace, "read_table_type")?;
    Ok(node)
}

/// `nullable TYPE`
fn read_nullable_type(p: &mut ParseState) -> ParseResult<NodeId> {
    p.start_context(NodeKind::NullableType)?;
    read_identifier_text_as_constant(
        p,
        LanguageConstant::Nullable.as_str(),
        ConstantKind::Language(LanguageConstant::Nullable),
    )?;
    read_type(p)?;
    p.end_context()
}

/// ```txt
/// field-specification-list:
///     [ [field-specifications] [, ...] ]
/// field-specification:
///     [optional] field-name [= field-type]
/// ```
pub(crate) fn read_field_specification_list(p: &mut ParseState) -> ParseResult<NodeId> {
    let trace = p.trace.enter("read_field_specification_list")?;
    let open_token_index = p.token_index;
    p.start_context(NodeKind::FieldSpecificationList)?;
    p.read_token_kind_as_constant(
        TokenKind::LeftBracket,
        ConstantKind::Wrapper(WrapperConstant::LeftBracket),
    )?;
    read_csv_array(
        p,
        |p| p.is_on(TokenKind::RightBracket) || p.is_on(TokenKind::Ellipsis),
        read_field_specification,
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
    p.trace.exit(trace, "read_field_specification_list")?;
    Ok(node)
}

fn read_field_specification(p: &mut ParseState) -> ParseResult<NodeId> {
    p.start_context(NodeKind::FieldSpecification)?;
    maybe_read_language_constant(p, LanguageConstant::Optional);
    identifier::read_generalized_identifier(p)?;
    if p.is_on(TokenKind::Equal) {
        p.start_context(NodeKind::FieldTypeSpecification)?;
        p.read_token_kind_as_constant(TokenKind::Equal, ConstantKind::Misc(MiscConstant::Equal))?;
        read_type(p)?;
        p.end_context()?;
    }
    p.end_context()
}

/// ```txt
/// nullable-primitive-type:
///     [nullable] primitive-type
/// ```
pub(crate) fn read_nullable_primitive_type(p: &mut ParseState) -> ParseResult<NodeId> {
    p.check_cancel()?;
    if is_on_identifier_text(p, LanguageConstant::Nullable.as_str()) {
        p.start_context(NodeKind::NullablePrimitiveType)?;
        read_identifier_text_as_constant(
            p,
            LanguageConstant::Nullable.as_str(),
            ConstantKind::Language(LanguageConstant::Nullable),
        )?;
        read_primitive_type(p)?;
        p.end_context()
    } else {
        read_primitive_type(p)
    }
}

/// A primitive type name. `null` and `type` arrive as their keyword tokens;
/// everything else is an identifier checked against the closed name table.
pub(crate) fn read_primitive_type(p: &mut ParseState) -> ParseResult<NodeId> {
    let Some(token) = p.current() else {
        return Err(p.unexpected(&[
            TokenKind::Identifier,
            TokenKind::NullLiteral,
            TokenKind::KeywordType,
        ]));
    };
    match token.kind {
        TokenKind::Identifier => match PrimitiveTypeConstant::from_name(&token.data) {
            Some(constant) => Ok(p.insert_leaf(
                NodeKind::PrimitiveType,
                AstNodePayload::PrimitiveType(constant),
                1,
            )),
            None => Err(ParseErrorKind::InvalidPrimitiveType {
                name: token.data.clone(),
                token_index: p.token_index,
            }),
        },
        TokenKind::NullLiteral => Ok(p.insert_leaf(
            NodeKind::PrimitiveType,
            AstNodePayload::PrimitiveType(PrimitiveTypeConstant::Null),
            1,
        )),
        TokenKind::KeywordType => Ok(p.insert_leaf(
            NodeKind::PrimitiveType,
            AstNodePayload::PrimitiveType(PrimitiveTypeConstant::Type),
            1,
        )),
        _ => Err(p.unexpected(&[
            TokenKind::Identifier,
            TokenKind::NullLiteral,
            TokenKind::KeywordType,
        ])),
    }
}
