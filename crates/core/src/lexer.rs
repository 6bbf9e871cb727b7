//! On-demand tokenizer for schema source text.
//!
//! Keyword-like words (`entity`, `action`, `appliesTo`, ...) come out as plain
//! [`TokenKind::Ident`]s; the parser classifies them by context. Comments are
//! real tokens so the parser can attach them to syntax nodes.

use crate::error::ParseError;
use std::fmt;
use std::sync::Arc;

/// Filename used when the caller does not supply one.
pub const DEFAULT_FILENAME: &str = "<input>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub filename: Arc<str>,
    /// 1-based line
    pub line: u32,
    /// 1-based column, counted in characters
    pub column: u32,
    /// 0-based byte offset
    pub offset: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.filename, self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    /// String literal; token text is the decoded value
    Str,
    /// Line or block comment; token text includes the delimiters
    Comment,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    LAngle,
    RAngle,
    Comma,
    Semi,
    Colon,
    DoubleColon,
    Eq,
    Question,
    At,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Ident => "identifier",
            TokenKind::Str => "string literal",
            TokenKind::Comment => "comment",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LAngle => "'<'",
            TokenKind::RAngle => "'>'",
            TokenKind::Comma => "','",
            TokenKind::Semi => "';'",
            TokenKind::Colon => "':'",
            TokenKind::DoubleColon => "'::'",
            TokenKind::Eq => "'='",
            TokenKind::Question => "'?'",
            TokenKind::At => "'@'",
            TokenKind::Eof => "end of file",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub pos: Position,
    /// Line on which the token's last character sits (differs from
    /// `pos.line` only for multi-line block comments)
    pub end_line: u32,
    /// Byte offset just past the token
    pub end_offset: usize,
}

impl Token {
    pub fn is_ident(&self, word: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == word
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Ident => write!(f, "identifier '{}'", self.text),
            TokenKind::Str => write!(f, "string {}", quote(&self.text)),
            TokenKind::Comment => f.write_str("comment"),
            other => write!(f, "{}", other),
        }
    }
}

pub struct Lexer<'a> {
    src: &'a str,
    filename: Arc<str>,
    offset: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(filename: &str, src: &'a str) -> Self {
        Lexer {
            src,
            filename: Arc::from(filename),
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn position(&self) -> Position {
        Position {
            filename: Arc::clone(&self.filename),
            line: self.line,
            column: self.column,
            offset: self.offset,
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.offset..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut it = self.src[self.offset..].chars();
        it.next();
        it.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if matches!(c, ' ' | '\t' | '\r' | '\n') {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn token(&self, kind: TokenKind, text: String, pos: Position) -> Token {
        Token {
            kind,
            text,
            pos,
            end_line: self.line,
            end_offset: self.offset,
        }
    }

    /// Produce the next token. Once the end of input is reached every further
    /// call returns another [`TokenKind::Eof`].
    pub fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_whitespace();
        let start = self.position();
        let Some(c) = self.peek_char() else {
            return Ok(self.token(TokenKind::Eof, String::new(), start));
        };

        if c == '/' && self.peek_second() == Some('/') {
            while let Some(c) = self.peek_char() {
                if c == '\n' {
                    break;
                }
                self.bump();
            }
            let text = self.src[start.offset..self.offset].trim_end().to_owned();
            // the token ends on its own line even though the newline is not consumed
            return Ok(self.token(TokenKind::Comment, text, start));
        }

        if c == '/' && self.peek_second() == Some('*') {
            self.bump();
            self.bump();
            loop {
                match self.bump() {
                    None => return Err(ParseError::lex(start, "unterminated block comment")),
                    Some('*') if self.peek_char() == Some('/') => {
                        self.bump();
                        break;
                    }
                    Some(_) => {}
                }
            }
            let text = self.src[start.offset..self.offset].to_owned();
            return Ok(self.token(TokenKind::Comment, text, start));
        }

        if c == '"' {
            let value = self.lex_string(&start)?;
            return Ok(self.token(TokenKind::Str, value, start));
        }

        if c.is_ascii_alphabetic() || c == '_' {
            while let Some(c) = self.peek_char() {
                if c.is_ascii_alphanumeric() || c == '_' {
                    self.bump();
                } else {
                    break;
                }
            }
            let text = self.src[start.offset..self.offset].to_owned();
            return Ok(self.token(TokenKind::Ident, text, start));
        }

        let kind = match c {
            ':' if self.peek_second() == Some(':') => {
                self.bump();
                TokenKind::DoubleColon
            }
            ':' => TokenKind::Colon,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '<' => TokenKind::LAngle,
            '>' => TokenKind::RAngle,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semi,
            '=' => TokenKind::Eq,
            '?' => TokenKind::Question,
            '@' => TokenKind::At,
            other => {
                return Err(ParseError::lex(
                    start,
                    format!("unexpected character {:?}", other),
                ))
            }
        };
        self.bump();
        let text = self.src[start.offset..self.offset].to_owned();
        Ok(self.token(kind, text, start))
    }

    fn lex_string(&mut self, start: &Position) -> Result<String, ParseError> {
        self.bump(); // opening quote
        let mut value = String::new();
        loop {
            let esc_pos = self.position();
            match self.bump() {
                None | Some('\n') => {
                    return Err(ParseError::lex(
                        start.clone(),
                        "unterminated string literal",
                    ))
                }
                Some('"') => return Ok(value),
                Some('\\') => match self.bump() {
                    None | Some('\n') => {
                        return Err(ParseError::lex(
                            start.clone(),
                            "unterminated string literal",
                        ))
                    }
                    Some('n') => value.push('\n'),
                    Some('r') => value.push('\r'),
                    Some('t') => value.push('\t'),
                    Some('0') => value.push('\0'),
                    Some('\\') => value.push('\\'),
                    Some('"') => value.push('"'),
                    Some('u') => value.push(self.lex_unicode_escape(esc_pos)?),
                    Some(other) => {
                        return Err(ParseError::lex(
                            esc_pos,
                            format!("unknown escape sequence '\\{}'", other),
                        ))
                    }
                },
                Some(c) => value.push(c),
            }
        }
    }

    /// Decode the `{hex}` part of a `\u{hex}` escape.
    fn lex_unicode_escape(&mut self, esc_pos: Position) -> Result<char, ParseError> {
        if self.peek_char() != Some('{') {
            return Err(ParseError::lex(
                esc_pos,
                "invalid unicode escape: expected '{' after '\\u'",
            ));
        }
        self.bump();
        let mut digits = String::new();
        loop {
            match self.peek_char() {
                Some('}') => {
                    self.bump();
                    break;
                }
                Some(c) if c.is_ascii_hexdigit() && digits.len() < 6 => {
                    digits.push(c);
                    self.bump();
                }
                None | Some('\n') => {
                    return Err(ParseError::lex(esc_pos, "unterminated unicode escape"))
                }
                Some(_) => {
                    return Err(ParseError::lex(
                        esc_pos,
                        "invalid unicode escape: expected 1 to 6 hex digits",
                    ))
                }
            }
        }
        u32::from_str_radix(&digits, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| {
                ParseError::lex(
                    esc_pos,
                    format!("invalid unicode escape '\\u{{{}}}'", digits),
                )
            })
    }
}

/// Lex an entire source string, including the trailing `Eof` token.
pub fn tokenize(src: &str, filename: &str) -> Result<Vec<Token>, ParseError> {
    let mut lexer = Lexer::new(filename, src);
    let mut tokens = Vec::new();
    loop {
        let tok = lexer.next_token()?;
        let done = tok.kind == TokenKind::Eof;
        tokens.push(tok);
        if done {
            return Ok(tokens);
        }
    }
}

/// Render `s` as a string literal that [`Lexer`] decodes back to `s`.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c if needs_escape(c) => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Control characters, plus invisible or line-breaking code points that would
/// make formatted output misleading: soft hyphen, zero-width and bidi marks,
/// line and paragraph separators, the BOM, and noncharacters.
fn needs_escape(c: char) -> bool {
    c.is_control()
        || matches!(
            c,
            '\u{ad}'
                | '\u{200b}'..='\u{200f}'
                | '\u{2028}'..='\u{202e}'
                | '\u{2060}'..='\u{206f}'
                | '\u{feff}'
                | '\u{fff0}'..='\u{fffb}'
        )
        || (c as u32) & 0xfffe == 0xfffe
}

/// True when `s` can be written as a bare identifier.
pub fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
