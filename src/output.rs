use std::io::{self, Write};

use serde::Serialize;

use crate::downloader::DownloadResult;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_download(result: &DownloadResult) -> io::Result<()> {
        Self::print_json(&result.files)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub struct HumanOutput;

impl HumanOutput {
    pub fn print_download(result: &DownloadResult) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        Self::write_download(&mut stdout, result)
    }

    /// One `filename -> path` line per entry.
    pub fn write_download<W: Write>(out: &mut W, result: &DownloadResult) -> io::Result<()> {
        for (filename, path) in &result.files {
            writeln!(out, "{filename} -> {path}")?;
        }
        Ok(())
    }
}

pub fn print_download(mode: OutputMode, result: &DownloadResult) -> io::Result<()> {
    match mode {
        OutputMode::Human => HumanOutput::print_download(result),
        OutputMode::Json => JsonOutput::print_download(result),
    }
}
