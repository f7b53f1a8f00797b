//! Documents and section documents.
//!
//! ```txt
//! document:
//!     expression-document
//!     section-document
//! section-document:
//!     [literal-attributes] section [section-name] ; section-members
//! section-member:
//!     [literal-attributes] [shared] identifier = expression ;
//! ```

use crate::ast::{NodeId, NodeKind};
use crate::constant::{ConstantKind, KeywordConstant, MiscConstant};
use crate::error::{ParseErrorKind, ParseResult};
use crate::parser::grammar::{expression, identifier, literal};
use crate::parser::ParseState;
use crate::token::TokenKind;

/// Top-level entry point. Attempts a section document when the first token
/// can open one, falling back to a single expression; afterwards every
/// token must have been consumed.
pub(crate) fn read_document(p: &mut ParseState) -> ParseResult<NodeId> {
    p.check_cancel()?;
    let trace = p.trace.enter("read_document")?;

    let root = if p.is_on(TokenKind::KeywordSection) || p.is_on(TokenKind::LeftBracket) {
        // `[` may be section attributes or a record expression; speculate.
        let checkpoint = p.checkpoint();
        match read_section_document(p) {
            Ok(root) => root,
            Err(error) if error.is_fatal() => return Err(error),
            Err(_) => {
                p.restore(checkpoint);
                expression::read_expression(p)?
            }
        }
    } else {
        expression::read_expression(p)?
    };

    if !p.is_at_end() {
        return Err(ParseErrorKind::UnusedTokensRemain {
            token_index: p.token_index,
        });
    }
    p.trace.exit(trace, "read_document")?;
    Ok(root)
}

pub(crate) fn read_section_document(p: &mut ParseState) -> ParseResult<NodeId> {
    p.check_cancel()?;
    let trace = p.trace.enter("read_section_document")?;
    p.start_context(NodeKind::Section)?;

    if p.is_on(TokenKind::LeftBracket) {
        literal::read_record_literal(p)?;
    }
    p.read_token_kind_as_constant(
        TokenKind::KeywordSection,
        ConstantKind::Keyword(KeywordConstant::Section),
    )?;
    if p.is_on(TokenKind::Identifier) {
        identifier::read_identifier(p)?;
    }
    p.read_token_kind_as_constant(
        TokenKind::Semicolon,
        ConstantKind::Misc(MiscConstant::Semicolon),
    )?;

    p.start_context(NodeKind::ArrayWrapper)?;
    while !p.is_at_end() {
        p.check_cancel()?;
        read_section_member(p)?;
    }
    p.end_context()?;

    let section = p.end_context()?;
    p.trace.exit(trace, "read_section_document")?;
    Ok(section)
}

fn read_section_member(p: &mut ParseState) -> ParseResult<NodeId> {
    let trace = p.trace.enter("read_section_member")?;
    p.start_context(NodeKind::SectionMember)?;

    if p.is_on(TokenKind::LeftBracket) {
        literal::read_record_literal(p)?;
    }
    p.maybe_read_token_kind_as_constant(
        TokenKind::KeywordShared,
        ConstantKind::Keyword(KeywordConstant::Shared),
    );
    identifier::read_identifier_paired_expression(p)?;
    p.read_token_kind_as_constant(
        TokenKind::Semicolon,
        ConstantKind::Misc(MiscConstant::Semicolon),
    )?;

    let member = p.end_context()?;
    p.trace.exit(trace, "read_section_member")?;
    Ok(member)
}
