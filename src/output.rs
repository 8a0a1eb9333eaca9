use std::io::{self, Write};

use serde::Serialize;

use crate::app::{FetchResult, ProgressEvent, ProgressSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
    Json,
}

/// Line-oriented progress for pipes and logs.
pub struct PlainOutput;

impl ProgressSink for PlainOutput {
    fn event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Retry { message, .. } => println!("{message}"),
            ProgressEvent::Saved {
                id,
                path,
                completed,
                total,
            } => println!("[{completed}/{total}] {id} -> {path}"),
            ProgressEvent::Failed {
                id,
                attempts,
                completed,
                total,
            } => println!("[{completed}/{total}] {id} failed after {attempts} attempt(s)"),
            ProgressEvent::Started { .. } | ProgressEvent::Attempt { .. } => {}
        }
    }
}

/// Keeps stdout for the JSON summary; retry notices go to stderr.
pub struct JsonOutput;

impl JsonOutput {
    pub fn print_fetch(result: &FetchResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, event: ProgressEvent) {
        if let ProgressEvent::Retry { message, .. } = event {
            eprintln!("{message}");
        }
    }
}
