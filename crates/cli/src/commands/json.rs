use std::path::Path;

use crate::{fail, OutputFormat};

pub(crate) fn cmd_resolve(file: &Path, output: OutputFormat, quiet: bool) {
    match cschema_core::pipeline::compile_file(file) {
        Ok((_, resolved)) => match serde_json::to_value(&resolved) {
            Ok(v) => crate::print_json(&v),
            Err(e) => {
                crate::report_error(&format!("serialization error: {}", e), output, quiet);
                std::process::exit(1);
            }
        },
        Err(e) => fail(&e, output, quiet),
    }
}

pub(crate) fn cmd_json(file: &Path, output: OutputFormat, quiet: bool) {
    match cschema_core::pipeline::load_file(file) {
        Ok(schema) => crate::print_json(&cschema_core::to_json(&schema)),
        Err(e) => fail(&e, output, quiet),
    }
}

pub(crate) fn cmd_from_json(file: &Path, output: OutputFormat, quiet: bool) {
    match cschema_core::pipeline::load_json_file(file) {
        Ok(schema) => print!("{}", cschema_core::format(&schema)),
        Err(e) => fail(&e, output, quiet),
    }
}
