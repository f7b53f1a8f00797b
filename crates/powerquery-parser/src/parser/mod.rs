pub(crate) mod grammar;

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashSet;
use triomphe::Arc;

use crate::ast::{AstNode, AstNodePayload, NodeId, NodeKind};
use crate::cancellation::CancellationToken;
use crate::constant::ConstantKind;
use crate::context::{ContextState, ParseContext};
use crate::error::{ParseError, ParseErrorKind, ParseResult};
use crate::limit::DepthTracker;
use crate::node_id_map::Collection;
use crate::token::{Comment, LexerSnapshot, Token, TokenKind, TokenRange};
use crate::trace::{Trace, TraceSink};

/// Chosen so that deeply nested fixtures stay well clear of the native
/// stack in an unoptimized test profile.
const DEFAULT_RECURSION_LIMIT: usize = 500;

/// Which implementation reads binary-operator chains.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ParserVariant {
    /// One recursive reader per precedence level. Simple, and the reference
    /// for shapes.
    NaiveRecursiveDescent,
    /// Collect the whole operator run flat, then shape it by precedence.
    #[default]
    CombinatorialFastPath,
}

/// Configuration for one parse.
pub struct ParseSettings {
    /// Reserved for diagnostic localisation.
    pub locale: Option<String>,
    pub cancellation: Option<CancellationToken>,
    pub trace_sink: Option<Rc<dyn TraceSink>>,
    pub variant: ParserVariant,
    pub recursion_limit: usize,
}

impl Default for ParseSettings {
    fn default() -> Self {
        Self {
            locale: None,
            cancellation: None,
            trace_sink: None,
            variant: ParserVariant::default(),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }
}

impl fmt::Debug for ParseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseSettings")
            .field("locale", &self.locale)
            .field("cancellation", &self.cancellation)
            .field("trace_sink", &self.trace_sink.is_some())
            .field("variant", &self.variant)
            .field("recursion_limit", &self.recursion_limit)
            .finish()
    }
}

/// Parse a lexed M document into a node-id map.
///
/// ## Example
///
/// ```rust
/// use powerquery_parser::testing::tokenize;
/// use powerquery_parser::{Arc, Parser};
///
/// let snapshot = tokenize("1 + 2 * 3").unwrap();
/// let ok = Parser::new(Arc::new(snapshot)).parse().unwrap();
/// let root = ok.node_id_map.ast_node(ok.root_id).unwrap();
/// assert_eq!(root.token_range.token_index_end, 5);
/// ```
pub struct Parser {
    snapshot: Arc<LexerSnapshot>,
    settings: ParseSettings,
}

impl Parser {
    pub fn new(snapshot: Arc<LexerSnapshot>) -> Self {
        Self {
            snapshot,
            settings: ParseSettings::default(),
        }
    }

    pub fn with_settings(snapshot: Arc<LexerSnapshot>, settings: ParseSettings) -> Self {
        Self { snapshot, settings }
    }

    /// Configure the context-nesting limit to use while parsing.
    pub fn recursion_limit(mut self, recursion_limit: usize) -> Self {
        self.settings.recursion_limit = recursion_limit;
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.settings.cancellation = Some(token);
        self
    }

    pub fn trace_sink(mut self, sink: Rc<dyn TraceSink>) -> Self {
        self.settings.trace_sink = Some(sink);
        self
    }

    pub fn variant(mut self, variant: ParserVariant) -> Self {
        self.settings.variant = variant;
        self
    }

    /// Parse the snapshot as a document: a section document when the input
    /// opens one, otherwise a single expression.
    pub fn parse(self) -> Result<ParseOk, ParseError> {
        let mut state = ParseState::new(self.snapshot.clone(), self.settings);
        match grammar::document::read_document(&mut state) {
            Ok(root_id) => Ok(ParseOk {
                root_id,
                node_id_map: state.into_collection(),
                comments: self.snapshot.comments.clone(),
            }),
            Err(kind) => Err(ParseError {
                token_index: state.token_index,
                kind,
                node_id_map: state.into_collection(),
            }),
        }
    }
}

/// A successful parse: the root id, the node-id map holding the whole tree,
/// and the snapshot's comments for tooling to reattach.
#[derive(Clone, PartialEq)]
pub struct ParseOk {
    pub root_id: NodeId,
    pub node_id_map: Collection,
    pub comments: Vec<Comment>,
}

impl ParseOk {
    /// Ids of every committed leaf, in no particular order.
    pub fn leaf_ids(&self) -> &FxHashSet<NodeId> {
        self.node_id_map.leaf_ids()
    }
}

impl fmt::Debug for ParseOk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn print(
            f: &mut fmt::Formatter<'_>,
            map: &Collection,
            id: NodeId,
            indent: usize,
        ) -> fmt::Result {
            write!(f, "{:indent$}", "", indent = indent)?;
            match map.ast_node(id) {
                Ok(node) => {
                    write!(f, "{:?}@{} ({})", node.kind, node.token_range, node.id)?;
                    match &node.payload {
                        AstNodePayload::None => {}
                        AstNodePayload::Constant(constant) => {
                            write!(f, " \"{}\"", constant.as_str())?
                        }
                        AstNodePayload::Identifier(literal)
                        | AstNodePayload::GeneralizedIdentifier(literal) => {
                            write!(f, " \"{literal}\"")?
                        }
                        AstNodePayload::Literal {
                            literal,
                            literal_kind,
                        } => write!(f, " {literal_kind:?} \"{literal}\"")?,
                        AstNodePayload::PrimitiveType(primitive) => {
                            write!(f, " \"{}\"", primitive.as_str())?
                        }
                    }
                    writeln!(f)?;
                }
                Err(_) => writeln!(f, "<context {id}>")?,
            }
            for &child in map.child_ids(id) {
                print(f, map, child, indent + 4)?;
            }
            Ok(())
        }
        print(f, &self.node_id_map, self.root_id, 0)
    }
}

/// A snapshot sufficient to rewind the parse to the moment it was taken.
#[derive(Clone, Debug)]
pub(crate) struct Checkpoint {
    token_index: usize,
    current_context_id: Option<NodeId>,
    id_counter: u32,
    depth: usize,
    collection: Collection,
}

/// The mutable heart of a parse: the cursor into the token array, the open
/// context, and the id/map owner.
///
/// Moving the cursor is the only way to consume a token. Reader functions
/// assert the expected kind, attach the resulting leaf under the current
/// context, and advance.
pub(crate) struct ParseState {
    snapshot: Arc<LexerSnapshot>,
    pub(crate) token_index: usize,
    pub(crate) current_context_id: Option<NodeId>,
    pub(crate) context_state: ContextState,
    pub(crate) variant: ParserVariant,
    cancellation: Option<CancellationToken>,
    pub(crate) trace: Trace,
    pub(crate) depth: DepthTracker,
}

impl ParseState {
    pub(crate) fn new(snapshot: Arc<LexerSnapshot>, settings: ParseSettings) -> Self {
        Self {
            snapshot,
            token_index: 0,
            current_context_id: None,
            context_state: ContextState::new(),
            variant: settings.variant,
            cancellation: settings.cancellation,
            trace: Trace::new(settings.trace_sink),
            depth: DepthTracker::new(settings.recursion_limit),
        }
    }

    pub(crate) fn into_collection(self) -> Collection {
        self.context_state.collection
    }

    pub(crate) fn map(&self) -> &Collection {
        &self.context_state.collection
    }

    pub(crate) fn map_mut(&mut self) -> &mut Collection {
        &mut self.context_state.collection
    }

    pub(crate) fn snapshot(&self) -> &LexerSnapshot {
        &self.snapshot
    }

    // ---- cursor ----

    pub(crate) fn current(&self) -> Option<&Token> {
        self.snapshot.tokens.get(self.token_index)
    }

    pub(crate) fn current_kind(&self) -> Option<TokenKind> {
        self.current().map(|token| token.kind)
    }

    pub(crate) fn is_on(&self, kind: TokenKind) -> bool {
        self.current_kind() == Some(kind)
    }

    /// Kind of the token `n` past the cursor; `peek_kind(0)` is the current
    /// token.
    pub(crate) fn peek_kind(&self, n: usize) -> Option<TokenKind> {
        self.snapshot
            .tokens
            .get(self.token_index + n)
            .map(|token| token.kind)
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.token_index >= self.snapshot.tokens.len()
    }

    pub(crate) fn check_cancel(&self) -> ParseResult<()> {
        match &self.cancellation {
            Some(token) if token.is_cancelled() => Err(ParseErrorKind::Cancelled),
            _ => Ok(()),
        }
    }

    /// The structured error for a token that cannot fill the expected slot.
    /// A lexer pass-through token is reported as a lexical error instead,
    /// whatever was expected of it.
    pub(crate) fn unexpected(&self, expected: &[TokenKind]) -> ParseErrorKind {
        if let Some(token) = self.current() {
            if token.kind == TokenKind::Unrecognized {
                return ParseErrorKind::LexicalSurface {
                    message: format!("unrecognized token {:?}", token.data),
                };
            }
        }
        ParseErrorKind::UnexpectedToken {
            expected: expected.to_vec(),
            actual: self.current_kind(),
            token_index: self.token_index,
        }
    }

    /// Token range for `[start, end)`, tolerating the empty range.
    pub(crate) fn token_range(&self, start: usize, end: usize) -> TokenRange {
        let tokens = &self.snapshot.tokens;
        let position_start = match tokens.get(start) {
            Some(token) => token.position_start,
            None => tokens.last().map(|t| t.position_end).unwrap_or_default(),
        };
        let position_end = if end > start {
            tokens[end - 1].position_end
        } else {
            position_start
        };
        TokenRange {
            token_index_start: start,
            token_index_end: end,
            position_start,
            position_end,
        }
    }

    // ---- contexts ----

    /// Opens a context for a production and makes it current.
    pub(crate) fn start_context(&mut self, kind: NodeKind) -> ParseResult<NodeId> {
        if !self.depth.enter() {
            return Err(ParseErrorKind::RecursionLimit {
                limit: self.depth.limit,
            });
        }
        let id = self.context_state.next_node_id();
        let parent_id = self.current_context_id;
        let attribute_index = parent_id.map(|parent| self.claim_child_slot(parent));
        let context = ParseContext {
            kind,
            id,
            attribute_index,
            attribute_counter: 0,
            token_index_start: self.token_index,
            token_anchor: self.current().cloned(),
            parent_id,
        };
        self.context_state.collection.insert_context_node(context);
        if let Some(parent) = parent_id {
            self.context_state.collection.link_child(parent, id);
        }
        self.current_context_id = Some(id);
        Ok(id)
    }

    /// Opens a context *around* an already-committed node, taking over its
    /// slot under the outer context. Used to grow left-associative chains
    /// and recursive-primary suffixes; the caller renumbers afterwards.
    pub(crate) fn start_wrap_context(
        &mut self,
        kind: NodeKind,
        wrapped: NodeId,
    ) -> ParseResult<NodeId> {
        if !self.depth.enter() {
            return Err(ParseErrorKind::RecursionLimit {
                limit: self.depth.limit,
            });
        }
        let wrapped_node = self
            .map()
            .ast_node(wrapped)
            .map_err(|e| ParseErrorKind::invariant(e.to_string()))?;
        let token_index_start = wrapped_node.token_range.token_index_start;
        let attribute_index = wrapped_node.attribute_index;
        let parent_id = self.map().parent_id(wrapped);

        let id = self.context_state.next_node_id();
        let context = ParseContext {
            kind,
            id,
            attribute_index,
            attribute_counter: 1,
            token_index_start,
            token_anchor: self.snapshot.tokens.get(token_index_start).cloned(),
            parent_id,
        };
        let map = self.map_mut();
        map.insert_context_node(context);
        match parent_id {
            Some(parent) => map.replace_child(parent, wrapped, id),
            None => {}
        }
        map.link_child(id, wrapped);
        map.set_attribute_index(wrapped, Some(0));
        self.current_context_id = Some(id);
        Ok(id)
    }

    /// Commits the current context to its AST node and restores the parent
    /// as current.
    pub(crate) fn end_context(&mut self) -> ParseResult<NodeId> {
        let id = self
            .current_context_id
            .ok_or_else(|| ParseErrorKind::invariant("end_context with no open context"))?;
        let context = self
            .map()
            .context_node(id)
            .map_err(|e| ParseErrorKind::invariant(e.to_string()))?
            .clone();

        let children = self.map().child_ids(id).to_vec();
        let token_range = match (children.first(), children.last()) {
            (Some(&first), Some(&last)) => {
                let start = self
                    .map()
                    .xor_token_range(first)
                    .map_err(|e| ParseErrorKind::invariant(e.to_string()))?;
                let end = self
                    .map()
                    .xor_token_range(last)
                    .map_err(|e| ParseErrorKind::invariant(e.to_string()))?;
                self.token_range(start.token_index_start, end.token_index_end)
            }
            _ => self.token_range(context.token_index_start, context.token_index_start),
        };

        let node = AstNode {
            kind: context.kind,
            id,
            attribute_index: context.attribute_index,
            token_range,
            payload: AstNodePayload::None,
        };
        self.map_mut().commit_context(id, node);
        self.current_context_id = context.parent_id;
        self.depth.exit();
        Ok(id)
    }

    /// Deletes the current context, which must have at most one child; a
    /// sole child is promoted into the context's slot. Used when a
    /// speculative chain turns out to have nothing to wrap.
    pub(crate) fn delete_context_and_promote(&mut self) -> ParseResult<Option<NodeId>> {
        let id = self
            .current_context_id
            .ok_or_else(|| ParseErrorKind::invariant("delete_context with no open context"))?;
        let context = self
            .map()
            .context_node(id)
            .map_err(|e| ParseErrorKind::invariant(e.to_string()))?
            .clone();
        let children = self.map().child_ids(id).to_vec();

        let promoted = match children.as_slice() {
            [] => {
                if let Some(parent) = context.parent_id {
                    self.map_mut().unlink_child(parent, id);
                    if let Some(parent_context) = self.map_mut().context_node_mut(parent) {
                        parent_context.attribute_counter -= 1;
                    }
                }
                None
            }
            [child] => {
                let child = *child;
                self.map_mut().unlink_child(id, child);
                if let Some(parent) = context.parent_id {
                    self.map_mut().replace_child(parent, id, child);
                }
                self.map_mut()
                    .set_attribute_index(child, context.attribute_index);
                Some(child)
            }
            _ => {
                return Err(ParseErrorKind::invariant(
                    "deleted a context with more than one child",
                ))
            }
        };
        self.map_mut().remove_context(id);
        self.current_context_id = context.parent_id;
        self.depth.exit();
        Ok(promoted)
    }

    fn claim_child_slot(&mut self, parent: NodeId) -> u32 {
        let context = self
            .map_mut()
            .context_node_mut(parent)
            .expect("current context must be open");
        let index = context.attribute_counter;
        context.attribute_counter += 1;
        index
    }

    /// Links a parentless node as the next child of the current context.
    /// No-op at the root.
    pub(crate) fn attach_under_current_context(&mut self, id: NodeId) {
        if let Some(parent) = self.current_context_id {
            let index = self.claim_child_slot(parent);
            self.map_mut().link_child(parent, id);
            self.map_mut().set_attribute_index(id, Some(index));
        }
    }

    // ---- leaves ----

    /// Inserts a leaf spanning `token_count` tokens from the cursor and
    /// advances past them.
    pub(crate) fn insert_leaf(
        &mut self,
        kind: NodeKind,
        payload: AstNodePayload,
        token_count: usize,
    ) -> NodeId {
        let start = self.token_index;
        let end = start + token_count;
        let token_range = self.token_range(start, end);
        let id = self.context_state.next_node_id();
        let attribute_index = self
            .current_context_id
            .map(|parent| self.claim_child_slot(parent));
        let node = AstNode {
            kind,
            id,
            attribute_index,
            token_range,
            payload,
        };
        self.map_mut().insert_ast_node(node);
        if let Some(parent) = self.current_context_id {
            self.map_mut().link_child(parent, id);
        }
        self.token_index = end;
        id
    }

    /// Reads the current token as a constant leaf, asserting its kind.
    pub(crate) fn read_token_kind_as_constant(
        &mut self,
        expected: TokenKind,
        constant: ConstantKind,
    ) -> ParseResult<NodeId> {
        if self.is_on(expected) {
            Ok(self.insert_leaf(NodeKind::Constant, AstNodePayload::Constant(constant), 1))
        } else {
            Err(self.unexpected(&[expected]))
        }
    }

    pub(crate) fn maybe_read_token_kind_as_constant(
        &mut self,
        expected: TokenKind,
        constant: ConstantKind,
    ) -> Option<NodeId> {
        if self.is_on(expected) {
            Some(self.insert_leaf(NodeKind::Constant, AstNodePayload::Constant(constant), 1))
        } else {
            None
        }
    }

    /// Like [`ParseState::read_token_kind_as_constant`] but reports a
    /// missing closer against the wrapper's opening token.
    pub(crate) fn read_closing_token_as_constant(
        &mut self,
        expected: TokenKind,
        constant: ConstantKind,
        open_token_index: usize,
    ) -> ParseResult<NodeId> {
        if self.is_on(expected) {
            Ok(self.insert_leaf(NodeKind::Constant, AstNodePayload::Constant(constant), 1))
        } else if self.is_on(TokenKind::Unrecognized) {
            Err(self.unexpected(&[expected]))
        } else {
            Err(ParseErrorKind::ExpectedClosingWrapper {
                expected,
                open_token_index,
            })
        }
    }

    /// Restores the pre-order id invariant for a mutated subtree and
    /// returns the root's new id.
    pub(crate) fn renumber_subtree(&mut self, root: NodeId) -> NodeId {
        crate::node_id_map::recalculate_ids(self.map_mut(), root)
    }

    // ---- checkpoints ----

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            token_index: self.token_index,
            current_context_id: self.current_context_id,
            id_counter: self.context_state.id_counter(),
            depth: self.depth.current(),
            collection: self.context_state.collection.clone(),
        }
    }

    pub(crate) fn restore(&mut self, checkpoint: Checkpoint) {
        self.token_index = checkpoint.token_index;
        self.current_context_id = checkpoint.current_context_id;
        self.context_state.collection = checkpoint.collection;
        self.context_state
            .restore_id_counter(checkpoint.id_counter);
        self.depth.restore(checkpoint.depth);
    }
}

impl fmt::Debug for ParseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseState")
            .field("token_index", &self.token_index)
            .field("current_context_id", &self.current_context_id)
            .field("variant", &self.variant)
            .field("depth", &self.depth)
            .finish()
    }
}
