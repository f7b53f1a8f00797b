use std::fmt;

use crate::ast::NodeId;
use crate::node_id_map::Collection;
use crate::token::TokenKind;

/// What went wrong, without the surrounding parse state.
///
/// Reader-level errors are ordinary values: they unwind with `?` to the
/// nearest speculative boundary or to the top-level driver, which wraps them
/// in a [`ParseError`] together with the partial node-id map.
#[derive(thiserror::Error, Clone, PartialEq, Eq, Debug)]
pub enum ParseErrorKind {
    /// An [`Unrecognized`](TokenKind::Unrecognized) token the lexer passed
    /// through; raised wherever the cursor meets it.
    #[error("unrecognized input: {message}")]
    LexicalSurface { message: String },

    #[error("expected one of {expected:?}, found {actual:?} at token {token_index}")]
    UnexpectedToken {
        expected: Vec<TokenKind>,
        actual: Option<TokenKind>,
        token_index: usize,
    },

    #[error("parsing finished but tokens remain at index {token_index}")]
    UnusedTokensRemain { token_index: usize },

    #[error("expected a closing {expected:?} for the wrapper opened at token {open_token_index}")]
    ExpectedClosingWrapper {
        expected: TokenKind,
        open_token_index: usize,
    },

    #[error("'{name}' is not a primitive type name")]
    InvalidPrimitiveType { name: String, token_index: usize },

    #[error("a required parameter may not follow an optional parameter")]
    RequiredParameterAfterOptional { token_index: usize },

    #[error("recursion limit of {limit} exceeded")]
    RecursionLimit { limit: usize },

    /// Cooperative cancellation tripped at a suspension point.
    #[error("parse cancelled")]
    Cancelled,

    /// A bug in the parser itself. Never caught, never recovered.
    #[error("invariant violated: {0}")]
    InvariantViolated(String),

    /// An error bubbling up from a host callback, currently the trace sink.
    #[error("host error: {0}")]
    Unknown(String),
}

impl ParseErrorKind {
    pub(crate) fn invariant(detail: impl Into<String>) -> Self {
        ParseErrorKind::InvariantViolated(detail.into())
    }

    /// Errors the disambiguator must not swallow when a speculative branch
    /// fails. A host-callback failure would only recur on the alternative
    /// branch, so it aborts outright too.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ParseErrorKind::Cancelled
                | ParseErrorKind::InvariantViolated(_)
                | ParseErrorKind::RecursionLimit { .. }
                | ParseErrorKind::Unknown(_)
        )
    }
}

pub(crate) type ParseResult<T> = Result<T, ParseErrorKind>;

/// A failed parse: the category, where the cursor stood, and everything that
/// was committed before the failure.
///
/// The partial map is intact — no rollback is attempted — so tooling can
/// still inspect what parsed successfully.
#[derive(Clone, PartialEq, Debug)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub token_index: usize,
    pub node_id_map: Collection,
}

impl ParseError {
    /// Roots of the partial forest left behind at failure.
    pub fn partial_root_ids(&self) -> Vec<NodeId> {
        self.node_id_map.root_ids()
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}
