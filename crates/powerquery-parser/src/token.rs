use std::fmt;

/// The kinds of tokens the parser consumes.
///
/// The lexer is an external collaborator: it hands the parser a finished
/// [`LexerSnapshot`] and the parser only ever walks it by index. The
/// enumeration is closed; adding a kind is a breaking change for every
/// consumer that matches on it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum TokenKind {
    Ampersand,
    Asterisk,
    AtSign,
    Bang,
    Comma,
    Division,
    DotDot,
    Ellipsis,
    Equal,
    FatArrow,
    GreaterThan,
    GreaterThanEqualTo,
    HexLiteral,
    Identifier,
    KeywordAnd,
    KeywordAs,
    KeywordEach,
    KeywordElse,
    KeywordError,
    KeywordFalse,
    KeywordHashBinary,
    KeywordHashDate,
    KeywordHashDateTime,
    KeywordHashDateTimeZone,
    KeywordHashDuration,
    KeywordHashInfinity,
    KeywordHashNan,
    KeywordHashSections,
    KeywordHashShared,
    KeywordHashTable,
    KeywordHashTime,
    KeywordIf,
    KeywordIn,
    KeywordIs,
    KeywordLet,
    KeywordMeta,
    KeywordNot,
    KeywordOr,
    KeywordOtherwise,
    KeywordSection,
    KeywordShared,
    KeywordThen,
    KeywordTrue,
    KeywordTry,
    KeywordType,
    LeftBrace,
    LeftBracket,
    LeftParenthesis,
    LessThan,
    LessThanEqualTo,
    Minus,
    NotEqual,
    NullCoalescingOperator,
    NullLiteral,
    NumericLiteral,
    Plus,
    QuestionMark,
    RightBrace,
    RightBracket,
    RightParenthesis,
    Semicolon,
    TextLiteral,
    /// A token the lexer could not classify, passed through so the parser
    /// can report it in place.
    Unrecognized,
}

impl TokenKind {
    /// True for every keyword token, the `#keyword` family included.
    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::KeywordAnd
                | TokenKind::KeywordAs
                | TokenKind::KeywordEach
                | TokenKind::KeywordElse
                | TokenKind::KeywordError
                | TokenKind::KeywordFalse
                | TokenKind::KeywordIf
                | TokenKind::KeywordIn
                | TokenKind::KeywordIs
                | TokenKind::KeywordLet
                | TokenKind::KeywordMeta
                | TokenKind::KeywordNot
                | TokenKind::KeywordOr
                | TokenKind::KeywordOtherwise
                | TokenKind::KeywordSection
                | TokenKind::KeywordShared
                | TokenKind::KeywordThen
                | TokenKind::KeywordTrue
                | TokenKind::KeywordTry
                | TokenKind::KeywordType
        ) || self.is_hash_keyword()
    }

    /// True for the `#keyword` family (`#date`, `#table`, ...).
    pub fn is_hash_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::KeywordHashBinary
                | TokenKind::KeywordHashDate
                | TokenKind::KeywordHashDateTime
                | TokenKind::KeywordHashDateTimeZone
                | TokenKind::KeywordHashDuration
                | TokenKind::KeywordHashInfinity
                | TokenKind::KeywordHashNan
                | TokenKind::KeywordHashSections
                | TokenKind::KeywordHashShared
                | TokenKind::KeywordHashTable
                | TokenKind::KeywordHashTime
        )
    }
}

/// A position inside the source document.
///
/// All three fields are zero-indexed. `code_unit` is the offset from the
/// start of the document, `line_code_unit` the offset from the start of the
/// line. Code units are UTF-8 bytes.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Debug)]
pub struct TokenPosition {
    pub code_unit: usize,
    pub line_code_unit: usize,
    pub line_number: usize,
}

/// A single token: a kind, the half-open source range it covers, and its
/// verbatim text.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub position_start: TokenPosition,
    pub position_end: TokenPosition,
    pub data: String,
}

impl Token {
    pub fn data(&self) -> &str {
        &self.data
    }
}

/// The half-open range of tokens a node covers, `start` inclusive and `end`
/// exclusive, along with the source positions of both boundaries.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TokenRange {
    pub token_index_start: usize,
    pub token_index_end: usize,
    pub position_start: TokenPosition,
    pub position_end: TokenPosition,
}

impl TokenRange {
    pub fn is_empty(&self) -> bool {
        self.token_index_start == self.token_index_end
    }
}

impl fmt::Display for TokenRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.token_index_start, self.token_index_end)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CommentKind {
    Line,
    Multiline,
}

/// A comment captured by the lexer. Comments never reach the parser's token
/// cursor; they ride along in the snapshot so tooling can reattach them.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Comment {
    pub kind: CommentKind,
    pub position_start: TokenPosition,
    pub position_end: TokenPosition,
    pub data: String,
}

/// The immutable output of a lexing pass: the source text, its tokens, and
/// its comments, each independently indexed.
///
/// A snapshot is read-only and may be shared freely between parse states;
/// wrap it in an [`Arc`](triomphe::Arc) to do so without copying.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct LexerSnapshot {
    pub text: String,
    pub tokens: Vec<Token>,
    pub comments: Vec<Comment>,
}

impl LexerSnapshot {
    pub fn token(&self, token_index: usize) -> Option<&Token> {
        self.tokens.get(token_index)
    }

    /// The source slice between two positions. Used to recover generalized
    /// identifiers, which may span several tokens including the gaps between
    /// them.
    pub fn text_between(&self, start: TokenPosition, end: TokenPosition) -> &str {
        &self.text[start.code_unit..end.code_unit]
    }
}
