//! Scan command handler

use crate::commands::{ScanArgs, ScanFormat};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use gocov::{display_path, scan_files, ExclusionMap};
use std::collections::BTreeMap;
use std::path::Path;

/// Execute the scan command from working directory `base`
pub fn execute_scan(base: &Path, config: &CliConfig, args: &ScanArgs) -> CliResult<()> {
    let files: Vec<_> = args.files.iter().map(|file| base.join(file)).collect();
    let map = ExclusionMap::from_results(scan_files(&files, config.effective_jobs()))?;
    match args.format {
        ScanFormat::Text => print!("{}", render_text(&map, base)),
        ScanFormat::Json => println!("{}", render_json(&map, base)?),
    }
    Ok(())
}

/// One `path:line kind` line per annotated line
#[must_use]
pub fn render_text(map: &ExclusionMap, base: &Path) -> String {
    let mut out = String::new();
    for (path, lines) in map.iter() {
        let name = display_path(path, base);
        for (line, kind) in lines.iter().filter(|(_, kind)| kind.is_excluding()) {
            out.push_str(&format!("{name}:{line} {kind}\n"));
        }
    }
    out
}

/// JSON object of path to line to marker
pub fn render_json(map: &ExclusionMap, base: &Path) -> CliResult<String> {
    let view: BTreeMap<String, BTreeMap<usize, String>> = map
        .iter()
        .map(|(path, lines)| {
            let lines = lines
                .iter()
                .filter(|(_, kind)| kind.is_excluding())
                .map(|(line, kind)| (*line, kind.to_string()))
                .collect();
            (display_path(path, base), lines)
        })
        .collect();
    serde_json::to_string_pretty(&view).map_err(|e| CliError::output(e.to_string()))
}
