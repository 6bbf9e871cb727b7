use super::Parser;
use crate::ast::{Annotation, Annotations, Attribute, Comments, Path, RecordType, Type};
use crate::error::ParseError;
use crate::lexer::TokenKind;

impl<'a> Parser<'a> {
    // -- Type parsing -------------------------------------------

    pub(super) fn parse_type(&mut self) -> Result<Type, ParseError> {
        match self.peek().kind {
            TokenKind::LBrace => Ok(Type::Record(self.parse_record_type()?)),
            TokenKind::Ident => {
                let path = self.parse_path()?;
                if !path.is_qualified() && path.basename() == "Set" && self.at(TokenKind::LAngle) {
                    self.advance()?;
                    let element = self.parse_type()?;
                    self.expect(TokenKind::RAngle)?;
                    return Ok(Type::Set(Box::new(element)));
                }
                Ok(Type::Path(path))
            }
            _ => Err(self.expected("type")),
        }
    }

    pub(super) fn parse_path(&mut self) -> Result<Path, ParseError> {
        let mut segments = vec![self.take_ident()?];
        while self.at(TokenKind::DoubleColon) {
            self.advance()?;
            segments.push(self.take_ident()?);
        }
        Ok(Path::new(segments))
    }

    /// `Path | '[' { Path ',' } ']'`
    pub(super) fn parse_type_refs(&mut self) -> Result<Vec<Path>, ParseError> {
        if !self.at(TokenKind::LBracket) {
            return Ok(vec![self.parse_path()?]);
        }
        self.advance()?;
        let mut paths = Vec::new();
        while !self.at(TokenKind::RBracket) {
            paths.push(self.parse_path()?);
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        if !self.at(TokenKind::RBracket) {
            return Err(self.expected_one_of(&["','", "']'"]));
        }
        self.advance()?;
        Ok(paths)
    }

    pub(super) fn parse_record_type(&mut self) -> Result<RecordType, ParseError> {
        self.expect(TokenKind::LBrace)?;
        let mut attributes: Vec<Attribute> = Vec::new();
        while !self.at(TokenKind::RBrace) {
            let (before, annotations) = self.parse_prologue()?;
            let name_tok = self.peek().clone();
            let name = match name_tok.kind {
                TokenKind::Ident | TokenKind::Str => self.advance()?.text,
                _ => return Err(self.expected_one_of(&["attribute name", "'}'"])),
            };
            if attributes.iter().any(|a| a.name == name) {
                return Err(self.error_at(
                    name_tok.pos,
                    format!("duplicate attribute '{}'", name),
                ));
            }
            let required = !self.eat(TokenKind::Question)?;
            self.expect(TokenKind::Colon)?;
            let ty = self.parse_type()?;
            let more = self.eat(TokenKind::Comma)?;
            attributes.push(Attribute {
                name,
                ty,
                required,
                annotations,
                comments: self.node_comments(before),
            });
            if !more {
                break;
            }
        }
        if !self.at(TokenKind::RBrace) {
            return Err(self.expected_one_of(&["','", "'}'"]));
        }
        let remaining = self.take_before();
        self.advance()?;
        Ok(RecordType {
            attributes,
            comments: Comments {
                remaining,
                ..Comments::default()
            },
        })
    }

    // -- Annotations and lists ----------------------------------

    pub(super) fn parse_annotations(&mut self) -> Result<Annotations, ParseError> {
        let mut annotations: Vec<Annotation> = Vec::new();
        while self.at(TokenKind::At) {
            self.advance()?;
            let key_pos = self.peek().pos.clone();
            let key = self.take_ident()?;
            if annotations.iter().any(|a| a.key == key) {
                return Err(self.error_at(key_pos, format!("duplicate annotation '@{}'", key)));
            }
            let value = if self.eat(TokenKind::LParen)? {
                let v = self.take_str()?;
                self.expect(TokenKind::RParen)?;
                Some(v)
            } else {
                None
            };
            annotations.push(Annotation { key, value });
        }
        Ok(Annotations(annotations))
    }

    pub(super) fn parse_ident_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut names = vec![self.take_ident()?];
        while self.eat(TokenKind::Comma)? {
            names.push(self.take_ident()?);
        }
        Ok(names)
    }

    /// Action names: identifiers or string literals.
    pub(super) fn parse_name_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut names = vec![self.take_name()?];
        while self.eat(TokenKind::Comma)? {
            names.push(self.take_name()?);
        }
        Ok(names)
    }

    fn take_name(&mut self) -> Result<String, ParseError> {
        match self.peek().kind {
            TokenKind::Ident | TokenKind::Str => Ok(self.advance()?.text),
            _ => Err(self.expected_one_of(&["identifier", "string literal"])),
        }
    }

    pub(super) fn parse_string_list(&mut self) -> Result<Vec<String>, ParseError> {
        self.expect(TokenKind::LBracket)?;
        let mut values = Vec::new();
        while !self.at(TokenKind::RBracket) {
            values.push(self.take_str()?);
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        if !self.at(TokenKind::RBracket) {
            return Err(self.expected_one_of(&["','", "']'"]));
        }
        self.advance()?;
        Ok(values)
    }
}
