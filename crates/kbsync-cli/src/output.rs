use kbsync_core::domain::{SyncFile, SyncSummary};

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &serde_json::Value);
}

/// Human-readable output formatter with checkmarks and indentation
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {}", message);
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {}", message);
    }
    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Warning: {}", message);
    }
    fn info(&self, message: &str) {
        println!("  {}", message);
    }
    fn print_json(&self, _value: &serde_json::Value) {}
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!(
            "{}",
            serde_json::json!({"success": true, "message": message})
        );
    }
    fn error(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"success": false, "error": message})
        );
    }
    fn warn(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"level": "warning", "message": message})
        );
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_default()
        );
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    if format.is_json() {
        Box::new(JsonFormatter)
    } else {
        Box::new(HumanFormatter)
    }
}

// ============================================================================
// Row rendering
// ============================================================================

/// One-line description of a sync summary
pub fn summary_line(summary: &SyncSummary) -> String {
    if summary.success {
        format!(
            "{} for {}: {} created, {} updated, {} deleted ({} ms)",
            summary.provider,
            summary.user_id,
            summary.created_count,
            summary.updated_count,
            summary.deleted_count,
            summary.duration().num_milliseconds()
        )
    } else {
        let phase = summary
            .failed_phase
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "{} for {}: failed in {} phase: {}",
            summary.provider,
            summary.user_id,
            phase,
            summary.error.as_deref().unwrap_or("unknown error")
        )
    }
}

/// Fixed-width row for a mirror entry
pub fn file_row(file: &SyncFile) -> String {
    let parent = file
        .parent_remote_id()
        .map(|p| p.as_str())
        .unwrap_or("(root)");
    format!(
        "{:<36}  {:<24}  {:<20}  {}  {}",
        file.remote_id().as_str(),
        parent,
        file.mime_type(),
        file.last_modified().format("%Y-%m-%d %H:%M:%S"),
        file.name()
    )
}
