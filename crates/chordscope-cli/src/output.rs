//! JSON output formatting

use anyhow::{Context, Result};
use chordscope_core::AnalysisResult;
use serde::Serialize;
use std::path::Path;

/// Outcome of analyzing one input file
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum FileReport {
    Analyzed { file: String, result: AnalysisResult },
    Failed { file: String, error: String },
}

impl FileReport {
    pub fn new(file: &str, outcome: Result<AnalysisResult>) -> Self {
        match outcome {
            Ok(result) => FileReport::Analyzed {
                file: file.to_string(),
                result,
            },
            Err(e) => FileReport::Failed {
                file: file.to_string(),
                // Alternate format includes the cause chain
                error: format!("{:#}", e),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, FileReport::Analyzed { .. })
    }
}

fn to_json<T: Serialize>(value: &T, compact: bool) -> Result<String> {
    let json = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    Ok(json)
}

/// Render reports as JSON.
///
/// A single successful report is rendered as the bare result object; anything
/// else becomes an array of `{file, result}` / `{file, error}` entries.
pub fn render_reports(reports: &[FileReport], compact: bool) -> Result<String> {
    match reports {
        [FileReport::Analyzed { result, .. }] => to_json(result, compact),
        _ => to_json(&reports, compact),
    }
}

/// Write rendered JSON to `output`, or to stdout when no path is given
pub fn emit(json: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", json))
                .with_context(|| format!("Failed to write output file {}", path.display()))?;
            log::info!("Wrote results to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
