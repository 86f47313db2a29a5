//! Output formatting for the imsg CLI.
//!
//! Provides text and JSON output. Text rendering works off the serde_json
//! value tree so every result type only needs `Serialize`.

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::io::{self, Write};

/// Output format selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Machine-readable JSON.
    Json,
    /// Concise plain text.
    #[default]
    Text,
}

/// Formatter that renders any `Serialize` value in the selected format.
#[derive(Debug, Clone, Copy)]
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Format data according to the configured output format.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
            OutputFormat::Text => {
                let value = serde_json::to_value(data)?;
                Ok(render_text(&value, 0))
            }
        }
    }

    /// Format and print data to stdout.
    pub fn print<T: Serialize>(&self, data: &T) -> Result<()> {
        let output = self.format(data)?;
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{output}")?;
        Ok(())
    }

    /// Format and print a list, with a message for the empty case.
    pub fn print_list<T: Serialize>(&self, data: &[T], empty_message: &str) -> Result<()> {
        if data.is_empty() && self.format == OutputFormat::Text {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{empty_message}")?;
            return Ok(());
        }
        self.print(&data)
    }
}

/// Render a JSON value as indented `key: value` text.
fn render_text(value: &Value, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(key, val)| match val {
                Value::Object(_) | Value::Array(_) => {
                    format!("{pad}{key}:\n{}", render_text(val, indent + 1))
                }
                _ => format!("{pad}{key}: {}", render_scalar(val)),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Array(items) => items
            .iter()
            .map(|item| render_text(item, indent))
            .collect::<Vec<_>>()
            .join("\n\n"),
        scalar => format!("{pad}{}", render_scalar(scalar)),
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}
