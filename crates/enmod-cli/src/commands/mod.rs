pub mod check;
pub mod compile;
pub mod graph;
pub mod run;

use std::io::{self, Write};

use anyhow::Result;
use enmod_core::Diagnostics;
use serde::Serialize;
use tabwriter::TabWriter;

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    serde_json::to_writer_pretty(io::stdout(), value)
        .map_err(|err| anyhow::anyhow!("serializing output to JSON: {err}"))?;
    println!();
    Ok(())
}

/// One line per issue, then the summary.
pub fn print_diagnostics(diagnostics: &Diagnostics) -> Result<()> {
    if diagnostics.issues.is_empty() {
        return Ok(());
    }
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "SEVERITY\tCATEGORY\tELEMENT\tMESSAGE")?;
    for issue in &diagnostics.issues {
        writeln!(
            writer,
            "{:?}\t{}\t{}\t{}",
            issue.severity,
            issue.category,
            issue.element.as_deref().unwrap_or("-"),
            issue.message
        )?;
    }
    writer.flush()?;
    println!("{}", diagnostics.summary());
    Ok(())
}
