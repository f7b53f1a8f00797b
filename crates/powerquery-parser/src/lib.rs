#![doc = include_str!("../README.md")]

pub mod ast;
mod cancellation;
pub mod constant;
mod context;
mod error;
mod limit;
pub mod node_id_map;
mod parser;
#[doc(hidden)]
pub mod testing;
pub mod token;
mod trace;

#[cfg(test)]
mod tests;

pub use crate::cancellation::CancellationToken;
pub use crate::context::ParseContext;
pub use crate::error::{ParseError, ParseErrorKind};
pub use crate::limit::DepthTracker;
pub use crate::parser::{ParseOk, ParseSettings, Parser, ParserVariant};
pub use crate::trace::{TraceEvent, TracePhase, TraceSink};

/// Shared ownership for [`token::LexerSnapshot`] values.
pub use triomphe::Arc;
