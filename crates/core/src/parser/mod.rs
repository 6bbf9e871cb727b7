//! Recursive-descent parser producing a comment-preserving [`Schema`].
//!
//! One token of lookahead, no error recovery: the first lexical or
//! structural error aborts the parse. Comment tokens never reach the grammar
//! rules; they are buffered in `pending` and handed to nodes as `before`,
//! `inline`, or `remaining` trivia.
use crate::ast::{Annotations, Comments, Item, Schema};
use crate::error::ParseError;
use crate::lexer::{Lexer, Position, Token, TokenKind, DEFAULT_FILENAME};
use std::sync::Arc;

mod decls;
mod types;

/// Names that cannot be bound by a common-type declaration.
pub const RESERVED_TYPE_NAMES: [&str; 8] = [
    "Bool",
    "Boolean",
    "Entity",
    "Extension",
    "Long",
    "Record",
    "Set",
    "String",
];

pub fn is_reserved_type_name(name: &str) -> bool {
    RESERVED_TYPE_NAMES.contains(&name)
}

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

struct Parser<'a> {
    lexer: Lexer<'a>,
    /// Current lookahead; never a comment
    tok: Token,
    /// Comments read but not yet attached to a node
    pending: Vec<Token>,
    /// End line and offset of the last consumed token
    last_line: u32,
    last_end: usize,
}

impl<'a> Parser<'a> {
    fn new(filename: &str, src: &'a str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(filename, src);
        let mut pending = Vec::new();
        let tok = Self::next_significant(&mut lexer, &mut pending)?;
        Ok(Parser {
            lexer,
            tok,
            pending,
            last_line: 0,
            last_end: 0,
        })
    }

    fn next_significant(lexer: &mut Lexer<'a>, pending: &mut Vec<Token>) -> Result<Token, ParseError> {
        loop {
            let tok = lexer.next_token()?;
            if tok.kind == TokenKind::Comment {
                pending.push(tok);
            } else {
                return Ok(tok);
            }
        }
    }

    fn peek(&self) -> &Token {
        &self.tok
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.tok.kind == kind
    }

    fn at_word(&self, word: &str) -> bool {
        self.tok.is_ident(word)
    }

    fn advance(&mut self) -> Result<Token, ParseError> {
        let next = Self::next_significant(&mut self.lexer, &mut self.pending)?;
        let tok = std::mem::replace(&mut self.tok, next);
        self.last_line = tok.end_line;
        self.last_end = tok.end_offset;
        Ok(tok)
    }

    /// Consume the lookahead if it has the given kind.
    fn eat(&mut self, kind: TokenKind) -> Result<bool, ParseError> {
        if self.at(kind) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.at(kind) {
            self.advance()
        } else {
            Err(self.expected(&kind.to_string()))
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<Token, ParseError> {
        if self.at_word(word) {
            self.advance()
        } else {
            Err(self.expected(&format!("'{}'", word)))
        }
    }

    fn take_ident(&mut self) -> Result<String, ParseError> {
        if self.at(TokenKind::Ident) {
            Ok(self.advance()?.text)
        } else {
            Err(self.expected("identifier"))
        }
    }

    fn take_str(&mut self) -> Result<String, ParseError> {
        if self.at(TokenKind::Str) {
            Ok(self.advance()?.text)
        } else {
            Err(self.expected("string literal"))
        }
    }

    /// Syntax error at the lookahead naming what was expected instead.
    fn expected(&self, what: &str) -> ParseError {
        ParseError::syntax(
            self.tok.pos.clone(),
            format!("expected {}, found {}", what, self.tok),
        )
    }

    fn expected_one_of(&self, options: &[&str]) -> ParseError {
        let what = match options {
            [] => "more input".to_owned(),
            [one] => (*one).to_owned(),
            [a, b] => format!("{} or {}", a, b),
            [init @ .., last] => format!("{}, or {}", init.join(", "), last),
        };
        self.expected(&what)
    }

    fn error_at(&self, pos: Position, message: impl Into<String>) -> ParseError {
        ParseError::syntax(pos, message)
    }

    // -- Comment attachment -------------------------------------

    /// All comments not yet attached to a node.
    fn take_before(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending)
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    /// A comment that starts on the line of the last consumed token, after it.
    fn take_inline(&mut self) -> Option<String> {
        let idx = self
            .pending
            .iter()
            .position(|c| c.pos.line == self.last_line && c.pos.offset >= self.last_end)?;
        Some(self.pending.remove(idx).text)
    }

    /// Leading comments plus annotations for the node starting at the
    /// lookahead. Comments between annotations and the keyword count as
    /// leading comments too.
    fn parse_prologue(&mut self) -> Result<(Vec<String>, Annotations), ParseError> {
        let mut before = self.take_before();
        let annotations = self.parse_annotations()?;
        before.extend(self.take_before());
        Ok((before, annotations))
    }

    fn node_comments(&mut self, before: Vec<String>) -> Comments {
        Comments {
            before,
            inline: self.take_inline(),
            remaining: Vec::new(),
        }
    }

    // -- Top level -----------------------------------------------

    fn parse_file(&mut self) -> Result<Schema, ParseError> {
        let mut items = Vec::new();
        while !self.at(TokenKind::Eof) {
            let (before, annotations) = self.parse_prologue()?;
            if self.at_word("namespace") {
                items.push(Item::Namespace(self.parse_namespace(before, annotations)?));
            } else if self.at(TokenKind::Eof) {
                return Err(self.expected_one_of(&[
                    "'namespace'",
                    "'entity'",
                    "'action'",
                    "'type'",
                ]));
            } else {
                items.push(Item::Decl(self.parse_decl(before, annotations)?));
            }
        }
        Ok(Schema {
            items,
            remaining: self.take_before(),
        })
    }
}

/// Parse schema source bytes. `filename` labels error positions.
pub fn parse_schema(filename: &str, src: &[u8]) -> Result<Schema, ParseError> {
    let text = std::str::from_utf8(src).map_err(|e| {
        let valid = std::str::from_utf8(&src[..e.valid_up_to()]).unwrap_or_default();
        let line = valid.matches('\n').count() as u32 + 1;
        let column = valid.rsplit('\n').next().unwrap_or_default().chars().count() as u32 + 1;
        ParseError::lex(
            Position {
                filename: Arc::from(filename),
                line,
                column,
                offset: e.valid_up_to(),
            },
            "invalid UTF-8 in source",
        )
    })?;
    parse_str(filename, text)
}

/// Parse schema source text. `filename` labels error positions.
pub fn parse_str(filename: &str, src: &str) -> Result<Schema, ParseError> {
    let mut p = Parser::new(filename, src)?;
    let schema = p.parse_file()?;
    tracing::debug!(filename, items = schema.items.len(), "parsed schema");
    Ok(schema)
}

/// Parse schema source text labelled with [`DEFAULT_FILENAME`].
pub fn parse(src: &str) -> Result<Schema, ParseError> {
    parse_str(DEFAULT_FILENAME, src)
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
