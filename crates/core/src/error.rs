use crate::lexer::Position;
use std::path::PathBuf;

/// A lexing or parsing failure. Always positioned; displays as
/// `filename:line:column: message`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("{pos}: {message}")]
    Lex { pos: Position, message: String },
    #[error("{pos}: {message}")]
    Syntax { pos: Position, message: String },
}

impl ParseError {
    pub fn lex(pos: Position, message: impl Into<String>) -> Self {
        ParseError::Lex {
            pos,
            message: message.into(),
        }
    }

    pub fn syntax(pos: Position, message: impl Into<String>) -> Self {
        ParseError::Syntax {
            pos,
            message: message.into(),
        }
    }

    pub fn pos(&self) -> &Position {
        match self {
            ParseError::Lex { pos, .. } | ParseError::Syntax { pos, .. } => pos,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ParseError::Lex { message, .. } | ParseError::Syntax { message, .. } => message,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::Lex { .. } => "LexError",
            ParseError::Syntax { .. } => "SyntaxError",
        }
    }
}

/// A semantic failure while resolving a parsed schema. Not positioned; every
/// variant names the offending reference.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("undefined type '{name}' (referenced in namespace '{namespace}')")]
    UndefinedType { name: String, namespace: String },

    #[error("undefined built-in type '__cedar::{name}'")]
    UndefinedBuiltin { name: String },

    #[error("common type cycle detected: {}", cycle.join(" -> "))]
    CommonTypeCycle { cycle: Vec<String> },

    #[error("action cycle detected: {}", cycle.join(" -> "))]
    ActionCycle { cycle: Vec<String> },

    #[error("context of action {action} must be a record type, found {found}")]
    InvalidContext { action: String, found: String },

    #[error("duplicate {kind} '{name}'")]
    DuplicateDeclaration { kind: &'static str, name: String },

    #[error("action {action} is a member of undefined action {parent}")]
    UndefinedAction { action: String, parent: String },

    #[error("'{name}' is a reserved type name and cannot be declared as a common type")]
    ReservedName { name: String },
}

impl ResolveError {
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveError::UndefinedType { .. } => "UndefinedType",
            ResolveError::UndefinedBuiltin { .. } => "UndefinedBuiltin",
            ResolveError::CommonTypeCycle { .. } => "CommonTypeCycle",
            ResolveError::ActionCycle { .. } => "ActionCycle",
            ResolveError::InvalidContext { .. } => "InvalidContext",
            ResolveError::DuplicateDeclaration { .. } => "DuplicateDeclaration",
            ResolveError::UndefinedAction { .. } => "UndefinedAction",
            ResolveError::ReservedName { .. } => "ReservedName",
        }
    }
}

/// A failure converting JSON-format schema text into an AST.
#[derive(Debug, thiserror::Error)]
pub enum JsonError {
    #[error("invalid JSON: {0}")]
    Syntax(#[from] serde_json::Error),
    #[error("{path}: {message}")]
    Shape { path: String, message: String },
    #[error("invalid UTF-8 at byte {valid_up_to}")]
    Encoding { valid_up_to: usize },
}

impl JsonError {
    pub fn shape(path: impl Into<String>, message: impl Into<String>) -> Self {
        JsonError::Shape {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Umbrella error for the end-to-end entry points in [`crate::pipeline`].
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Json(#[from] JsonError),
}

impl SchemaError {
    pub fn kind(&self) -> &'static str {
        match self {
            SchemaError::Io { .. } => "IoError",
            SchemaError::Parse(e) => e.kind(),
            SchemaError::Resolve(e) => e.kind(),
            SchemaError::Json(_) => "JsonError",
        }
    }

    /// Serialize for machine-readable CLI output. Position fields are null for
    /// errors that carry no source position.
    pub fn to_json_value(&self) -> serde_json::Value {
        let (file, line, column) = match self {
            SchemaError::Parse(e) => {
                let pos = e.pos();
                (
                    Some(pos.filename.to_string()),
                    Some(pos.line),
                    Some(pos.column),
                )
            }
            _ => (None, None, None),
        };
        let message = match self {
            SchemaError::Parse(e) => e.message().to_owned(),
            other => other.to_string(),
        };
        serde_json::json!({
            "column":  column,
            "file":    file,
            "kind":    self.kind(),
            "line":    line,
            "message": message,
        })
    }
}
