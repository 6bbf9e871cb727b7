use std::path::Path;

use crate::{fail, OutputFormat};

pub(crate) fn cmd_check(file: &Path, output: OutputFormat, quiet: bool) {
    let (schema, resolved) = match cschema_core::pipeline::compile_file(file) {
        Ok(r) => r,
        Err(e) => fail(&e, output, quiet),
    };

    let namespaces = schema.namespaces().len();
    let common_types = schema
        .namespaces()
        .values()
        .flatten()
        .filter(|d| matches!(d, cschema_core::ast::Declaration::CommonType(_)))
        .count();

    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => crate::print_json(&serde_json::json!({
            "valid": true,
            "file": file.display().to_string(),
            "namespaces": namespaces,
            "entityTypes": resolved.entities.len(),
            "enums": resolved.enums.len(),
            "actions": resolved.actions.len(),
            "commonTypes": common_types,
        })),
        OutputFormat::Text => {
            println!("{}: ok", file.display());
            println!(
                "  {} namespace(s), {} entity type(s), {} enum(s), {} action(s), {} common type(s)",
                namespaces,
                resolved.entities.len(),
                resolved.enums.len(),
                resolved.actions.len(),
                common_types
            );
        }
    }
}
