// Output formatting for CLI

use std::io::{self, Write};

use clap::ValueEnum;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Pretty,
    /// Compact JSON
    Json,
    /// Key-value pairs
    KeyValue,
    /// Table format
    Table,
}

/// Format and output data
pub struct OutputFormatter {
    format: OutputFormat,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Output one record
    pub fn output_record(&self, record: &serde_json::Value, writer: &mut dyn Write) -> io::Result<()> {
        match self.format {
            OutputFormat::Pretty => {
                writeln!(writer, "{}", serde_json::to_string_pretty(record)?)?;
            }
            OutputFormat::Json => {
                writeln!(writer, "{}", serde_json::to_string(record)?)?;
            }
            OutputFormat::KeyValue => {
                self.output_key_value(record, writer)?;
            }
            OutputFormat::Table => {
                self.output_table(record, writer)?;
            }
        }
        Ok(())
    }

    /// Output as key-value pairs
    fn output_key_value(&self, record: &serde_json::Value, writer: &mut dyn Write) -> io::Result<()> {
        if let Some(obj) = record.as_object() {
            let mut items: Vec<_> = obj.iter().collect();
            items.sort_by(|a, b| a.0.cmp(b.0));

            for (key, value) in items {
                writeln!(writer, "{}: {}", key, format_value(value))?;
            }
        }
        Ok(())
    }

    /// Output as table
    fn output_table(&self, record: &serde_json::Value, writer: &mut dyn Write) -> io::Result<()> {
        if let Some(obj) = record.as_object() {
            let max_key_len = obj.keys().map(|k| k.len()).max().unwrap_or(0);

            writeln!(writer, "{}", "=".repeat(max_key_len + 30))?;

            for (key, value) in obj {
                writeln!(
                    writer,
                    "{:<width$}{}",
                    format!("{}:", key),
                    format_value(value),
                    width = max_key_len + 2
                )?;
            }

            writeln!(writer, "{}", "=".repeat(max_key_len + 30))?;
        }
        Ok(())
    }

    /// Print success message
    pub fn print_success(&self, message: &str) {
        if !self.quiet {
            println!("✓ {}", message);
        }
    }

    /// Print error message
    pub fn print_error(&self, message: &str) {
        eprintln!("✗ {}", message);
    }

    /// Print info message
    pub fn print_info(&self, message: &str) {
        if !self.quiet {
            println!("  {}", message);
        }
    }
}

/// Format a JSON value for display
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "(none)".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Array(arr) => arr
            .iter()
            .map(format_value)
            .collect::<Vec<_>>()
            .join(", "),
        serde_json::Value::Object(obj) => {
            if obj.is_empty() {
                "{}".to_string()
            } else {
                format!("{{{} items}}", obj.len())
            }
        }
    }
}

/// Progress indicator on stdout
pub struct ProgressBar {
    total: u64,
    current: u64,
    show: bool,
    prefix: String,
}

impl ProgressBar {
    pub fn new(total: u64, show: bool) -> Self {
        Self {
            total,
            current: 0,
            show,
            prefix: String::new(),
        }
    }

    pub fn set_prefix(&mut self, prefix: String) {
        self.prefix = prefix;
    }

    pub fn increment(&mut self) {
        self.set_position(self.current + 1);
    }

    pub fn set_position(&mut self, current: u64) {
        self.current = current.min(self.total);
        if self.show && self.total > 0 {
            print!("\r{}", self.render());
            if self.current == self.total {
                println!();
            }
            io::stdout().flush().ok();
        }
    }

    fn render(&self) -> String {
        let percent = (self.current * 100) / self.total.max(1);
        format!("{} [{}/{}] ({}%)", self.prefix, self.current, self.total, percent)
    }
}
