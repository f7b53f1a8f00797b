//! Parameter lists, shared by function expressions and function types.

use crate::ast::{NodeId, NodeKind};
use crate::constant::{ConstantKind, KeywordConstant, LanguageConstant, WrapperConstant};
use crate::error::{ParseErrorKind, ParseResult};
use crate::parser::grammar::{
    identifier, maybe_read_language_constant, read_csv_array, read_paired_constant, ty,
};
use crate::parser::ParseState;
use crate::token::TokenKind;

/// How an `as` annotation on a parameter reads its type: function
/// expressions take nullable primitive types, function types take full
/// types.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum ParameterTypeStyle {
    NullablePrimitive,
    Type,
}

/// ```txt
/// parameter-list:
///     ( [parameters] )
/// parameter:
///     [optional] parameter-name [parameter-type]
/// ```
///
/// Once one parameter is optional, every later parameter must be.
pub(crate) fn read_parameter_list(
    p: &mut ParseState,
    style: ParameterTypeStyle,
) -> ParseResult<NodeId> {
    p.check_cancel()?;
    let trace = p.trace.enter("read_parameter_list")?;
    let open_token_index = p.token_index;
    p.start_context(NodeKind::ParameterList)?;
    p.read_token_kind_as_constant(
        TokenKind::LeftParenthesis,
        ConstantKind::Wrapper(WrapperConstant::LeftParenthesis),
    )?;
    let mut seen_optional = false;
    read_csv_array(
        p,
        |p| p.is_on(TokenKind::RightParenthesis),
        |p| read_parameter(p, style, &mut seen_optional),
    )?;
    p.read_closing_token_as_constant(
        TokenKind::RightParenthesis,
        ConstantKind::Wrapper(WrapperConstant::RightParenthesis),
        open_token_index,
    )?;
    let node = p.end_context()?;
    p.trace.exit(trace, "read_parameter_list")?;
    Ok(node)
}

fn read_parameter(
    p: &mut ParseState,
    style: ParameterTypeStyle,
    seen_optional: &mut bool,
) -> ParseResult<NodeId> {
    p.start_context(NodeKind::Parameter)?;
    let optional = maybe_read_language_constant(p, LanguageConstant::Optional).is_some();
    if optional {
        *seen_optional = true;
    } else if *seen_optional {
        return Err(ParseErrorKind::RequiredParameterAfterOptional {
            token_index: p.token_index,
        });
    }
    identifier::read_identifier(p)?;
    if p.is_on(TokenKind::KeywordAs) {
        match style {
            ParameterTypeStyle::NullablePrimitive => read_paired_constant(
                p,
                NodeKind::AsNullablePrimitiveType,
                TokenKind::KeywordAs,
                ConstantKind::Keyword(KeywordConstant::As),
                ty::read_nullable_primitive_type,
            )?,
            ParameterTypeStyle::Type => read_paired_constant(
                p,
                NodeKind::AsType,
                TokenKind::KeywordAs,
                ConstantKind::Keyword(KeywordConstant::As),
                ty::read_type,
            )?,
        };
    }
    p.end_context()
}

#[cfg(test)]
mod test {
    use crate::ast::NodeKind;
    use crate::tests::support::parse_ok;

    #[test]
    fn optional_after_required_is_accepted() {
        let ok = parse_ok("(x, optional y) => 1");
        let root = ok.node_id_map.ast_node(ok.root_id).unwrap();
        assert_eq!(root.kind, NodeKind::FunctionExpression);
        let parameters: Vec<_> = ok.node_id_map.ids_of_kind(NodeKind::Parameter).collect();
        assert_eq!(parameters.len(), 2);
    }

    #[test]
    fn an_untyped_parameter_is_just_its_name() {
        let ok = parse_ok("(x) => x");
        let parameter = ok
            .node_id_map
            .ids_of_kind(NodeKind::Parameter)
            .next()
            .unwrap();
        assert_eq!(ok.node_id_map.child_ids(parameter).len(), 1);
    }
}
