use std::path::Path;
use std::process;

use crate::{fail, report_error, OutputFormat};

/// Without flags the canonical text goes to stdout. `check` and `write`
/// compare against the file's current contents.
pub(crate) fn cmd_format(file: &Path, check: bool, write: bool, output: OutputFormat, quiet: bool) {
    let schema = match cschema_core::pipeline::load_file(file) {
        Ok(s) => s,
        Err(e) => fail(&e, output, quiet),
    };
    let formatted = cschema_core::format(&schema);

    if !check && !write {
        print!("{}", formatted);
        return;
    }

    // load_file succeeded, so the file is readable UTF-8
    let current = std::fs::read_to_string(file).unwrap_or_default();
    let canonical = current == formatted;
    tracing::debug!(file = %file.display(), canonical, "format");

    if check {
        if !canonical {
            report_error(
                &format!("{}: not in canonical format", file.display()),
                output,
                quiet,
            );
            process::exit(1);
        }
        if !quiet {
            match output {
                OutputFormat::Text => println!("{}: ok", file.display()),
                OutputFormat::Json => println!("{{\"formatted\": true}}"),
            }
        }
        return;
    }

    if !canonical {
        if let Err(e) = std::fs::write(file, &formatted) {
            report_error(
                &format!("error writing '{}': {}", file.display(), e),
                output,
                quiet,
            );
            process::exit(1);
        }
    }
    if !quiet {
        match output {
            OutputFormat::Text if canonical => println!("{}: unchanged", file.display()),
            OutputFormat::Text => println!("{}: formatted", file.display()),
            OutputFormat::Json => println!("{{\"changed\": {}}}", !canonical),
        }
    }
}
