//! Serve command: JSON-lines requests on stdin, responses on stdout.

use crate::catalog_file::CatalogFile;
use crate::commands::CatalogOptions;
use crate::error::CliResult;
use crate::protocol::{self, Response};
use libcat_core::Library;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::{info, warn};

/// Summary of a serve session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServeSummary {
    /// Request lines handled.
    pub requests: usize,
    /// Requests that failed.
    pub failures: usize,
    /// Mutations that succeeded.
    pub mutations: usize,
}

/// Runs the serve command on the process's stdin and stdout.
pub fn run(options: &CatalogOptions, save: bool) -> CliResult<()> {
    let save_path = if save {
        Some(options.require_catalog("serve --save")?.to_path_buf())
    } else {
        None
    };
    let library = options.open()?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    let summary = serve(&library, stdin.lock(), stdout.lock())?;
    info!(
        requests = summary.requests,
        failures = summary.failures,
        mutations = summary.mutations,
        "input closed"
    );

    if let Some(path) = save_path {
        save_if_changed(&library, &path, summary)?;
    }
    Ok(())
}

/// Writes the catalog back unless the session changed nothing. Returns
/// whether it was written.
fn save_if_changed(library: &Library, path: &Path, summary: ServeSummary) -> CliResult<bool> {
    if summary.mutations == 0 {
        info!(path = %path.display(), "catalog unchanged, not saved");
        return Ok(false);
    }
    CatalogFile::from_library(library).save(path)?;
    Ok(true)
}

/// Answers every request line from `input` on `output`.
///
/// A ready line is written first. Blank lines are skipped; every other line
/// gets exactly one response line, flushed immediately so a client can
/// wait for it.
pub fn serve<R: BufRead, W: Write>(
    library: &Library,
    input: R,
    mut output: W,
) -> CliResult<ServeSummary> {
    let ready = Response::ok(format!("libcat ready ({} books)", library.len()), None);
    write_response(&mut output, &ready)?;

    let mut summary = ServeSummary::default();
    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (response, mutation) = match protocol::parse_line(line) {
            Ok(request) => {
                let mutation = request.is_mutation();
                (protocol::handle(library, request), mutation)
            }
            Err(rejected) => (rejected, false),
        };
        summary.requests += 1;
        if response.success && mutation {
            summary.mutations += 1;
        }
        if !response.success {
            summary.failures += 1;
            if response.error == Some("internal") {
                warn!(message = ?response.message, "internal error reported to client");
            }
        }
        write_response(&mut output, &response)?;
    }
    Ok(summary)
}

fn write_response<W: Write>(output: &mut W, response: &Response) -> CliResult<()> {
    serde_json::to_writer(&mut *output, response)?;
    output.write_all(b"\n")?;
    output.flush()?;
    Ok(())
}
