//! Output formatting for the CLI.

use console::style;

/// Output handler for CLI messages.
#[derive(Clone)]
pub struct Output {
    verbose: bool,
    json: bool,
}

impl Output {
    /// Create a new output handler.
    pub fn new(verbose: bool, json: bool) -> Self {
        Self { verbose, json }
    }

    /// Print a success message.
    pub fn success(&self, msg: &str) {
        if self.json {
            return;
        }
        eprintln!("{} {}", style("✓").green(), msg);
    }

    /// Print a warning message.
    pub fn warn(&self, msg: &str) {
        if self.json {
            return;
        }
        eprintln!("{} {}", style("⚠").yellow(), msg);
    }

    /// Print an error message.
    pub fn error(&self, msg: &str) {
        if self.json {
            eprintln!("{}", serde_json::json!({ "error": msg }));
            return;
        }
        eprintln!("{} {}", style("✗").red(), style(msg).red());
    }

    /// Print a debug message (only in verbose mode).
    pub fn debug(&self, msg: &str) {
        if !self.verbose || self.json {
            return;
        }
        eprintln!("{} {}", style("→").dim(), style(msg).dim());
    }

    /// Print a header/title.
    pub fn header(&self, msg: &str) {
        if self.json {
            return;
        }
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print JSON output.
    pub fn json<T: serde::Serialize>(&self, value: &T) {
        if let Ok(json) = serde_json::to_string_pretty(value) {
            println!("{}", json);
        }
    }

    /// Print one key.
    pub fn key(&self, key: &str) {
        if self.json {
            return;
        }
        println!("{}", key);
    }

    /// Check if JSON mode is enabled.
    pub fn is_json(&self) -> bool {
        self.json
    }
}

/// Colored badge for an error kind.
pub fn kind_badge(kind: &str) -> String {
    match kind {
        "permission_denied" => style(kind).red().bold().to_string(),
        "transport" => style(kind).yellow().to_string(),
        "invalid_argument" | "parse" => style(kind).magenta().to_string(),
        _ => style(kind).red().to_string(),
    }
}

/// Format microseconds as a human-readable duration.
pub fn format_micros(micros: u64) -> String {
    if micros < 1_000 {
        format!("{}us", micros)
    } else if micros < 1_000_000 {
        format!("{:.1}ms", micros as f64 / 1_000.0)
    } else {
        format!("{:.2}s", micros as f64 / 1_000_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_micros() {
        assert_eq!(format_micros(850), "850us");
        assert_eq!(format_micros(12_345), "12.3ms");
        assert_eq!(format_micros(2_500_000), "2.50s");
    }

    #[test]
    fn test_kind_badge_keeps_text() {
        console::set_colors_enabled(false);
        assert_eq!(kind_badge("transport"), "transport");
        assert_eq!(kind_badge("permission_denied"), "permission_denied");
    }
}
