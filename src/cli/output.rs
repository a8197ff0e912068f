use std::{fmt::Display, io::Write};

use ansi_term::Colour;
use chrono::Duration;
use clap::ValueEnum;

use crate::storage::entities::Entry;

/// Shown for entries without a context.
const NO_CONTEXT: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Prints `entries` in the given format. Text output groups consecutive entries of the same
/// context under a header with their total.
pub fn print_entries(
    entries: &[Entry],
    format: OutputFormat,
    colored: bool,
    out: &mut impl Write,
) -> std::io::Result<()> {
    match format {
        OutputFormat::Text => print_text(entries, colored, out),
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, entries)?;
            writeln!(out)
        }
    }
}

fn print_text(entries: &[Entry], colored: bool, out: &mut impl Write) -> std::io::Result<()> {
    for group in entries.chunk_by(|a, b| a.meta.contextid == b.meta.contextid) {
        let context = group[0].meta.contextid.as_deref().unwrap_or(NO_CONTEXT);
        let total = group
            .iter()
            .fold(Duration::zero(), |total, entry| total + entry.duration());
        let header = format!("{context}: {}", format_duration(total));
        if colored {
            writeln!(out, "{}", Colour::Cyan.bold().paint(header))?;
        } else {
            writeln!(out, "{header}")?;
        }

        for entry in group {
            write!(
                out,
                "  {}: {}",
                entry.start.format("%Y-%m-%d"),
                format_duration(entry.duration())
            )?;
            match &entry.meta.note {
                Some(note) => writeln!(out, " # {note}")?,
                None => writeln!(out)?,
            }
        }
    }
    Ok(())
}

/// Hours and minutes, seconds are dropped.
fn format_duration(v: Duration) -> String {
    format!("{:02}h {:02}m", v.num_hours(), v.num_minutes() % 60)
}
