//! File-level entry points: read, parse, resolve.
//!
//! Thin orchestration over the individual stages; the CLI goes through here.

use crate::ast::Schema;
use crate::error::{JsonError, SchemaError};
use crate::resolved::ResolvedSchema;
use crate::{json, parser, resolve};
use std::path::Path;

fn read(path: &Path) -> Result<Vec<u8>, SchemaError> {
    std::fs::read(path).map_err(|source| SchemaError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse the schema file at `path`. Error positions carry the path as given.
pub fn load_file(path: &Path) -> Result<Schema, SchemaError> {
    let bytes = read(path)?;
    Ok(parser::parse_schema(&path.display().to_string(), &bytes)?)
}

/// Parse and resolve `src`, returning both the syntax tree and the result.
pub fn compile(filename: &str, src: &[u8]) -> Result<(Schema, ResolvedSchema), SchemaError> {
    let schema = parser::parse_schema(filename, src)?;
    let resolved = resolve::resolve(&schema)?;
    Ok((schema, resolved))
}

/// [`compile`] applied to the contents of `path`.
pub fn compile_file(path: &Path) -> Result<(Schema, ResolvedSchema), SchemaError> {
    let bytes = read(path)?;
    compile(&path.display().to_string(), &bytes)
}

/// Read a JSON-format schema file into a syntax tree.
pub fn load_json_file(path: &Path) -> Result<Schema, SchemaError> {
    let bytes = read(path)?;
    let text = String::from_utf8(bytes).map_err(|e| JsonError::Encoding {
        valid_up_to: e.utf8_error().valid_up_to(),
    })?;
    Ok(json::from_json(&text)?)
}
