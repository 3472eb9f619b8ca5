//! Report serialization to JSON or JSON Lines.
//!
//! JSON Lines output streams one report per line as it is written. JSON
//! output collects reports and emits them on `finish()`: a single object for
//! one report, an array otherwise.

use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    #[serde(rename = "jsonl")]
    JsonLines,
}

impl OutputFormat {
    /// Parse a format name (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }

    /// Conventional file extension.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::JsonLines => "jsonl",
        }
    }
}

/// Writes serializable reports in the chosen format.
pub struct ReportWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    pending: Vec<serde_json::Value>,
    written: usize,
}

impl<W: Write> ReportWriter<W> {
    /// `pretty` only affects JSON output; JSON Lines is always compact.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            pending: Vec::new(),
            written: 0,
        }
    }

    pub fn write<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        match self.format {
            OutputFormat::JsonLines => {
                serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
                writeln!(self.writer)?;
                self.writer.flush()?;
            }
            OutputFormat::Json => {
                self.pending
                    .push(serde_json::to_value(item).map_err(io::Error::other)?);
            }
        }
        self.written += 1;
        Ok(())
    }

    /// Number of reports accepted so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Emit any collected JSON and flush. Returns the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        if self.format == OutputFormat::Json && !self.pending.is_empty() {
            let value = if self.pending.len() == 1 {
                self.pending.remove(0)
            } else {
                serde_json::Value::Array(std::mem::take(&mut self.pending))
            };
            if self.pretty {
                serde_json::to_writer_pretty(&mut self.writer, &value)
            } else {
                serde_json::to_writer(&mut self.writer, &value)
            }
            .map_err(io::Error::other)?;
            writeln!(self.writer)?;
        }
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Serialize one item to a JSON string.
pub fn to_json<T: Serialize>(item: &T, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
        serde_json::to_string_pretty(item)
    } else {
        serde_json::to_string(item)
    }
}
