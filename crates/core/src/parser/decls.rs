use super::{is_reserved_type_name, Parser};
use crate::ast::{
    ActionDecl, ActionRef, Annotations, AppliesTo, Comments, CommonTypeDecl, Declaration,
    EntityDecl, EnumDecl, Namespace, Path,
};
use crate::error::ParseError;
use crate::lexer::TokenKind;

impl<'a> Parser<'a> {
    pub(super) fn parse_namespace(
        &mut self,
        before: Vec<String>,
        annotations: Annotations,
    ) -> Result<Namespace, ParseError> {
        self.expect_word("namespace")?;
        let path = self.parse_path()?;
        self.expect(TokenKind::LBrace)?;
        let mut decls = Vec::new();
        while !self.at(TokenKind::RBrace) {
            if self.at(TokenKind::Eof) {
                return Err(self.expected("declaration or '}'"));
            }
            let (before, annotations) = self.parse_prologue()?;
            decls.push(self.parse_decl(before, annotations)?);
        }
        let remaining = self.take_before();
        self.advance()?;
        let mut comments = self.node_comments(before);
        comments.remaining = remaining;
        Ok(Namespace {
            path,
            decls,
            annotations,
            comments,
        })
    }

    pub(super) fn parse_decl(
        &mut self,
        before: Vec<String>,
        annotations: Annotations,
    ) -> Result<Declaration, ParseError> {
        let keyword = if self.at(TokenKind::Ident) {
            self.peek().text.clone()
        } else {
            String::new()
        };
        match keyword.as_str() {
            "entity" => self.parse_entity(before, annotations),
            "action" => self.parse_action(before, annotations),
            "type" => self.parse_common_type(before, annotations),
            _ => Err(self.expected_one_of(&["'entity'", "'action'", "'type'"])),
        }
    }

    // -- entity --------------------------------------------------

    fn parse_entity(
        &mut self,
        before: Vec<String>,
        annotations: Annotations,
    ) -> Result<Declaration, ParseError> {
        self.expect_word("entity")?;
        let names = self.parse_ident_list()?;

        if self.at_word("enum") {
            self.advance()?;
            let list_pos = self.peek().pos.clone();
            let values = self.parse_string_list()?;
            if values.is_empty() {
                return Err(self.error_at(list_pos, "enum must declare at least one value"));
            }
            self.expect(TokenKind::Semi)?;
            return Ok(Declaration::Enum(EnumDecl {
                names,
                values,
                annotations,
                comments: self.node_comments(before),
            }));
        }

        let mut member_of = Vec::new();
        let mut saw_in = false;
        if self.at_word("in") {
            self.advance()?;
            saw_in = true;
            member_of = self.parse_type_refs()?;
        }

        let mut shape = None;
        if self.at(TokenKind::Eq) {
            self.advance()?;
            shape = Some(self.parse_record_type()?);
        } else if self.at(TokenKind::LBrace) {
            shape = Some(self.parse_record_type()?);
        }

        let mut tags = None;
        if self.at_word("tags") {
            self.advance()?;
            tags = Some(self.parse_type()?);
        }

        if !self.at(TokenKind::Semi) {
            let mut options = Vec::new();
            if !saw_in && shape.is_none() && tags.is_none() {
                options.push("'in'");
            }
            if shape.is_none() && tags.is_none() {
                options.extend(["'='", "'{'"]);
            }
            if tags.is_none() {
                options.push("'tags'");
            }
            options.push("';'");
            return Err(self.expected_one_of(&options));
        }
        self.advance()?;

        Ok(Declaration::Entity(EntityDecl {
            names,
            member_of,
            shape,
            tags,
            annotations,
            comments: self.node_comments(before),
        }))
    }

    // -- action --------------------------------------------------

    fn parse_action(
        &mut self,
        before: Vec<String>,
        annotations: Annotations,
    ) -> Result<Declaration, ParseError> {
        self.expect_word("action")?;
        let names = self.parse_name_list()?;

        let mut member_of = Vec::new();
        if self.at_word("in") {
            self.advance()?;
            member_of = self.parse_action_parents()?;
        }

        let mut applies_to = None;
        if self.at_word("appliesTo") {
            self.advance()?;
            applies_to = Some(self.parse_applies_to()?);
        }

        // Accepted for compatibility with older schemas; carries no meaning.
        if self.at_word("attributes") {
            self.advance()?;
            self.expect(TokenKind::LBrace)?;
            if !self.at(TokenKind::RBrace) {
                return Err(self.expected("'}' (the 'attributes' clause must be empty)"));
            }
            self.advance()?;
        }

        if !self.at(TokenKind::Semi) {
            let mut options = Vec::new();
            if member_of.is_empty() && applies_to.is_none() {
                options.push("'in'");
            }
            if applies_to.is_none() {
                options.push("'appliesTo'");
            }
            options.extend(["'attributes'", "';'"]);
            return Err(self.expected_one_of(&options));
        }
        self.advance()?;

        Ok(Declaration::Action(ActionDecl {
            names,
            member_of,
            applies_to,
            annotations,
            comments: self.node_comments(before),
        }))
    }

    /// `QualName | '[' { QualName ',' } ']'`
    fn parse_action_parents(&mut self) -> Result<Vec<ActionRef>, ParseError> {
        if !self.at(TokenKind::LBracket) {
            return Ok(vec![self.parse_action_ref()?]);
        }
        self.advance()?;
        let mut refs = Vec::new();
        while !self.at(TokenKind::RBracket) {
            refs.push(self.parse_action_ref()?);
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        if !self.at(TokenKind::RBracket) {
            return Err(self.expected_one_of(&["','", "']'"]));
        }
        self.advance()?;
        Ok(refs)
    }

    /// `String | Path ('::' String)?`
    fn parse_action_ref(&mut self) -> Result<ActionRef, ParseError> {
        if self.at(TokenKind::Str) {
            let id = self.take_str()?;
            return Ok(ActionRef { ty: None, id });
        }
        let start = self.peek().pos.clone();
        let mut segments = vec![self.take_ident()?];
        while self.at(TokenKind::DoubleColon) {
            self.advance()?;
            if self.at(TokenKind::Str) {
                let id = self.take_str()?;
                return Ok(ActionRef {
                    ty: Some(Path::new(segments)),
                    id,
                });
            }
            if !self.at(TokenKind::Ident) {
                return Err(self.expected_one_of(&["identifier", "string literal"]));
            }
            segments.push(self.take_ident()?);
        }
        if segments.len() > 1 {
            return Err(self.error_at(
                start,
                format!(
                    "expected '::' and a quoted action id after '{}'",
                    segments.join("::")
                ),
            ));
        }
        Ok(ActionRef {
            ty: None,
            id: segments.remove(0),
        })
    }

    fn parse_applies_to(&mut self) -> Result<AppliesTo, ParseError> {
        self.expect(TokenKind::LBrace)?;
        let mut applies_to = AppliesTo::default();
        while !self.at(TokenKind::RBrace) {
            let key = self.peek().clone();
            let slot_taken = match key.text.as_str() {
                _ if key.kind != TokenKind::Ident => None,
                "principal" => Some(applies_to.principals.is_some()),
                "resource" => Some(applies_to.resources.is_some()),
                "context" => Some(applies_to.context.is_some()),
                _ => None,
            };
            match slot_taken {
                None => {
                    return Err(self.expected_one_of(&[
                        "'principal'",
                        "'resource'",
                        "'context'",
                        "'}'",
                    ]))
                }
                Some(true) => {
                    return Err(self.error_at(
                        key.pos,
                        format!("duplicate '{}' in appliesTo", key.text),
                    ))
                }
                Some(false) => {}
            }
            self.advance()?;
            self.expect(TokenKind::Colon)?;
            match key.text.as_str() {
                "principal" => applies_to.principals = Some(self.parse_type_refs()?),
                "resource" => applies_to.resources = Some(self.parse_type_refs()?),
                _ => applies_to.context = Some(self.parse_type()?),
            }
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        if !self.at(TokenKind::RBrace) {
            return Err(self.expected_one_of(&["','", "'}'"]));
        }
        applies_to.comments = Comments {
            remaining: self.take_before(),
            ..Comments::default()
        };
        self.advance()?;
        Ok(applies_to)
    }

    // -- type ----------------------------------------------------

    fn parse_common_type(
        &mut self,
        before: Vec<String>,
        annotations: Annotations,
    ) -> Result<Declaration, ParseError> {
        self.expect_word("type")?;
        let name_pos = self.peek().pos.clone();
        let name = self.take_ident()?;
        if is_reserved_type_name(&name) {
            return Err(self.error_at(
                name_pos,
                format!("'{}' is a reserved type name and cannot be redeclared", name),
            ));
        }
        self.expect(TokenKind::Eq)?;
        let ty = self.parse_type()?;
        self.expect(TokenKind::Semi)?;
        Ok(Declaration::CommonType(CommonTypeDecl {
            name,
            ty,
            annotations,
            comments: self.node_comments(before),
        }))
    }
}
