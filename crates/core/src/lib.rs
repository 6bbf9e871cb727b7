#![allow(clippy::result_large_err)]
//! cschema-core: front end for the authorization schema language.
//!
//! Source text goes through four stages:
//!
//! - [`lexer`] -- on-demand tokens, comments included
//! - [`parser`] -- comment-preserving syntax tree ([`ast`])
//! - [`resolve()`] -- qualified names, inlined common types, cycle checks
//!   ([`resolved`])
//! - [`format()`] / [`to_json()`] -- canonical text and the JSON form
//!
//! [`pipeline`] wraps the stages for callers that start from a file.

pub mod ast;
pub mod error;
pub mod format;
pub mod json;
pub mod lexer;
pub mod parser;
pub mod pipeline;
pub mod resolve;
pub mod resolved;

// ── Convenience re-exports: key types ────────────────────────────────

pub use ast::Schema;
pub use error::{JsonError, ParseError, ResolveError, SchemaError};
pub use lexer::Position;
pub use resolved::{EntityUid, Name, ResolvedSchema};

// ── Convenience re-exports: entry points ─────────────────────────────

pub use format::format;
pub use json::{from_json, to_json};
pub use parser::{parse, parse_schema, parse_str};
pub use resolve::resolve;
