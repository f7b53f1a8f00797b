//! Test fixtures: a compact tokenizer so tests, benches, and examples can
//! produce [`LexerSnapshot`] values from source text.
//!
//! This is tooling, not a production lexer — it covers the token vocabulary
//! the parser consumes and nothing more (no incremental relexing).
//! Characters it cannot classify become `Unrecognized` tokens for the
//! parser to report in place; only structurally broken input (unterminated
//! strings or comments, unknown `#keyword`s) fails outright.

use crate::token::{Comment, CommentKind, LexerSnapshot, Token, TokenKind, TokenPosition};

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TokenizeError {
    pub message: String,
    pub offset: usize,
}

/// Tokenizes M source text into a snapshot the parser can consume.
pub fn tokenize(text: &str) -> Result<LexerSnapshot, TokenizeError> {
    let mut scanner = Scanner::new(text);
    let mut tokens = Vec::new();
    let mut comments = Vec::new();

    while let Some(c) = scanner.peek() {
        if c.is_whitespace() {
            scanner.bump();
            continue;
        }
        if c == '/' && scanner.peek_at(1) == Some('/') {
            comments.push(scanner.line_comment());
            continue;
        }
        if c == '/' && scanner.peek_at(1) == Some('*') {
            comments.push(scanner.block_comment()?);
            continue;
        }
        tokens.push(scanner.token()?);
    }

    Ok(LexerSnapshot {
        text: text.to_string(),
        tokens,
        comments,
    })
}

struct Scanner<'a> {
    text: &'a str,
    offset: usize,
    line_number: usize,
    line_start: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            offset: 0,
            line_number: 0,
            line_start: 0,
        }
    }

    fn position(&self) -> TokenPosition {
        TokenPosition {
            code_unit: self.offset,
            line_code_unit: self.offset - self.line_start,
            line_number: self.line_number,
        }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.offset..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.text[self.offset..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line_number += 1;
            self.line_start = self.offset;
        }
        Some(c)
    }

    fn bump_while(&mut self, keep: impl Fn(char) -> bool) {
        while matches!(self.peek(), Some(c) if keep(c)) {
            self.bump();
        }
    }

    fn error(&self, message: impl Into<String>) -> TokenizeError {
        TokenizeError {
            message: message.into(),
            offset: self.offset,
        }
    }

    fn line_comment(&mut self) -> Comment {
        let position_start = self.position();
        let start = self.offset;
        self.bump_while(|c| c != '\n');
        Comment {
            kind: CommentKind::Line,
            position_start,
            position_end: self.position(),
            data: self.text[start..self.offset].to_string(),
        }
    }

    fn block_comment(&mut self) -> Result<Comment, TokenizeError> {
        let position_start = self.position();
        let start = self.offset;
        self.bump();
        self.bump();
        loop {
            match self.peek() {
                Some('*') if self.peek_at(1) == Some('/') => {
                    self.bump();
                    self.bump();
                    break;
                }
                Some(_) => {
                    self.bump();
                }
                None => return Err(self.error("unterminated block comment")),
            }
        }
        Ok(Comment {
            kind: CommentKind::Multiline,
            position_start,
            position_end: self.position(),
            data: self.text[start..self.offset].to_string(),
        })
    }

    fn token(&mut self) -> Result<Token, TokenizeError> {
        let position_start = self.position();
        let start = self.offset;
        let c = self.peek().expect("token() called at end of input");

        let kind = match c {
            '(' => self.single(TokenKind::LeftParenthesis),
            ')' => self.single(TokenKind::RightParenthesis),
            '[' => self.single(TokenKind::LeftBracket),
            ']' => self.single(TokenKind::RightBracket),
            '{' => self.single(TokenKind::LeftBrace),
            '}' => self.single(TokenKind::RightBrace),
            ',' => self.single(TokenKind::Comma),
            ';' => self.single(TokenKind::Semicolon),
            '@' => self.single(TokenKind::AtSign),
            '&' => self.single(TokenKind::Ampersand),
            '*' => self.single(TokenKind::Asterisk),
            '/' => self.single(TokenKind::Division),
            '+' => self.single(TokenKind::Plus),
            '-' => self.single(TokenKind::Minus),
            '!' => self.single(TokenKind::Bang),
            '=' => {
                self.bump();
                if self.peek() == Some('>') {
                    self.bump();
                    TokenKind::FatArrow
                } else {
                    TokenKind::Equal
                }
            }
            '<' => {
                self.bump();
                match self.peek() {
                    Some('=') => {
                        self.bump();
                        TokenKind::LessThanEqualTo
                    }
                    Some('>') => {
                        self.bump();
                        TokenKind::NotEqual
                    }
                    _ => TokenKind::LessThan,
                }
            }
            '>' => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    TokenKind::GreaterThanEqualTo
                } else {
                    TokenKind::GreaterThan
                }
            }
            '?' => {
                self.bump();
                if self.peek() == Some('?') {
                    self.bump();
                    TokenKind::NullCoalescingOperator
                } else {
                    TokenKind::QuestionMark
                }
            }
            '.' => {
                if self.peek_at(1) != Some('.') {
                    self.single(TokenKind::Unrecognized)
                } else {
                    self.bump();
                    self.bump();
                    if self.peek() == Some('.') {
                        self.bump();
                        TokenKind::Ellipsis
                    } else {
                        TokenKind::DotDot
                    }
                }
            }
            '"' => self.text_literal()?,
            '#' => self.hash()?,
            c if c.is_ascii_digit() => self.number(),
            c if is_identifier_start(c) => self.identifier_or_keyword(),
            _ => self.single(TokenKind::Unrecognized),
        };

        Ok(Token {
            kind,
            position_start,
            position_end: self.position(),
            data: self.text[start..self.offset].to_string(),
        })
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.bump();
        kind
    }

    /// `"..."` with `""` as the escaped quote.
    fn text_literal(&mut self) -> Result<TokenKind, TokenizeError> {
        self.bump();
        loop {
            match self.peek() {
                Some('"') if self.peek_at(1) == Some('"') => {
                    self.bump();
                    self.bump();
                }
                Some('"') => {
                    self.bump();
                    return Ok(TokenKind::TextLiteral);
                }
                Some(_) => {
                    self.bump();
                }
                None => return Err(self.error("unterminated text literal")),
            }
        }
    }

    /// `#"quoted identifier"` or a `#keyword`.
    fn hash(&mut self) -> Result<TokenKind, TokenizeError> {
        self.bump();
        if self.peek() == Some('"') {
            self.text_literal()?;
            return Ok(TokenKind::Identifier);
        }
        let start = self.offset;
        self.bump_while(|c| c.is_ascii_alphanumeric());
        match &self.text[start..self.offset] {
            "binary" => Ok(TokenKind::KeywordHashBinary),
            "date" => Ok(TokenKind::KeywordHashDate),
            "datetime" => Ok(TokenKind::KeywordHashDateTime),
            "datetimezone" => Ok(TokenKind::KeywordHashDateTimeZone),
            "duration" => Ok(TokenKind::KeywordHashDuration),
            "infinity" => Ok(TokenKind::KeywordHashInfinity),
            "nan" => Ok(TokenKind::KeywordHashNan),
            "sections" => Ok(TokenKind::KeywordHashSections),
            "shared" => Ok(TokenKind::KeywordHashShared),
            "table" => Ok(TokenKind::KeywordHashTable),
            "time" => Ok(TokenKind::KeywordHashTime),
            other => Err(self.error(format!("unknown keyword #{other}"))),
        }
    }

    fn number(&mut self) -> TokenKind {
        if self.peek() == Some('0')
            && matches!(self.peek_at(1), Some('x') | Some('X'))
            && matches!(self.peek_at(2), Some(c) if c.is_ascii_hexdigit())
        {
            self.bump();
            self.bump();
            self.bump_while(|c| c.is_ascii_hexdigit());
            return TokenKind::HexLiteral;
        }
        self.bump_while(|c| c.is_ascii_digit());
        // A fraction only when a digit follows, so `1..2` stays a range.
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            self.bump();
            self.bump_while(|c| c.is_ascii_digit());
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let mut lookahead = 1;
            if matches!(self.peek_at(1), Some('+') | Some('-')) {
                lookahead = 2;
            }
            if matches!(self.peek_at(lookahead), Some(c) if c.is_ascii_digit()) {
                self.bump();
                if matches!(self.peek(), Some('+') | Some('-')) {
                    self.bump();
                }
                self.bump_while(|c| c.is_ascii_digit());
            }
        }
        TokenKind::NumericLiteral
    }

    fn identifier_or_keyword(&mut self) -> TokenKind {
        let start = self.offset;
        loop {
            match self.peek() {
                Some(c) if is_identifier_part(c) => {
                    self.bump();
                }
                // Dotted names like `Table.AddColumn` are one identifier.
                Some('.') if matches!(self.peek_at(1), Some(c) if is_identifier_start(c)) => {
                    self.bump();
                }
                _ => break,
            }
        }
        match &self.text[start..self.offset] {
            "and" => TokenKind::KeywordAnd,
            "as" => TokenKind::KeywordAs,
            "each" => TokenKind::KeywordEach,
            "else" => TokenKind::KeywordElse,
            "error" => TokenKind::KeywordError,
            "false" => TokenKind::KeywordFalse,
            "if" => TokenKind::KeywordIf,
            "in" => TokenKind::KeywordIn,
            "is" => TokenKind::KeywordIs,
            "let" => TokenKind::KeywordLet,
            "meta" => TokenKind::KeywordMeta,
            "not" => TokenKind::KeywordNot,
            "null" => TokenKind::NullLiteral,
            "or" => TokenKind::KeywordOr,
            "otherwise" => TokenKind::KeywordOtherwise,
            "section" => TokenKind::KeywordSection,
            "shared" => TokenKind::KeywordShared,
            "then" => TokenKind::KeywordThen,
            "true" => TokenKind::KeywordTrue,
            "try" => TokenKind::KeywordTry,
            "type" => TokenKind::KeywordType,
            _ => TokenKind::Identifier,
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_identifier_part(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}
