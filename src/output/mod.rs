use anyhow::{Context, Result};
use console::style;
use std::fmt::Write as _;
use std::path::Path;

use crate::cli::ReportFormat;
use crate::orchestrator::BatchResult;

/// Render batch results as a human readable summary
pub fn format_as_text(results: &[BatchResult]) -> String {
    let mut out = String::new();
    let succeeded = results.iter().filter(|r| r.succeeded()).count();

    for result in results {
        let marker = if result.succeeded() {
            style("✓").green().to_string()
        } else {
            style("✗").red().to_string()
        };
        let _ = writeln!(out, "{} [{}] {}", marker, result.position, result.title);
        for file in result.files() {
            let _ = writeln!(out, "    {}", file.display());
        }
        if let Some(reason) = result.failure_reason() {
            let _ = writeln!(out, "    {}", style(reason).red());
        }
    }

    let _ = write!(out, "Done: {}/{} succeeded", succeeded, results.len());
    out
}

/// Render batch results as pretty JSON
pub fn format_as_json(results: &[BatchResult]) -> Result<String> {
    serde_json::to_string_pretty(results).context("Failed to serialize report")
}

fn render(results: &[BatchResult], format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(format_as_text(results)),
        ReportFormat::Json => format_as_json(results),
    }
}

/// Save batch results to file
pub fn save_to_file(results: &[BatchResult], path: &Path, format: ReportFormat) -> Result<()> {
    let content = match format {
        // no terminal colours in files
        ReportFormat::Text => console::strip_ansi_codes(&format_as_text(results)).into_owned(),
        ReportFormat::Json => format_as_json(results)?,
    };

    fs_err::write(path, content)?;
    Ok(())
}

/// Print batch results to console
pub fn print_to_console(results: &[BatchResult], format: ReportFormat) -> Result<()> {
    println!("{}", render(results, format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::Outcome;
    use std::path::PathBuf;

    fn results() -> Vec<BatchResult> {
        vec![
            BatchResult {
                position: 1,
                title: "First".to_string(),
                url: "https://youtu.be/a".to_string(),
                outcome: Outcome::Succeeded {
                    files: vec![PathBuf::from("/dl/First.mp4")],
                },
            },
            BatchResult {
                position: 2,
                title: "Second".to_string(),
                url: "https://youtu.be/b".to_string(),
                outcome: Outcome::Failed {
                    reason: "yt-dlp failed: exit code 1".to_string(),
                    files: Vec::new(),
                },
            },
        ]
    }

    #[test]
    fn test_text_report() {
        let text = console::strip_ansi_codes(&format_as_text(&results())).into_owned();
        assert!(text.contains("[1] First"));
        assert!(text.contains("/dl/First.mp4"));
        assert!(text.contains("yt-dlp failed: exit code 1"));
        assert!(text.ends_with("Done: 1/2 succeeded"));
    }

    #[test]
    fn test_json_report() {
        let json = format_as_json(&results()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["status"], "succeeded");
        assert_eq!(value[1]["status"], "failed");
        assert_eq!(value[1]["reason"], "yt-dlp failed: exit code 1");
        assert_eq!(value[1]["position"], 2);
    }

    #[test]
    fn test_save_to_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        save_to_file(&results(), &path, ReportFormat::Json).unwrap();
        let saved: Vec<BatchResult> = serde_json::from_str(&fs_err::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved, results());
    }
}
