use std::io::{Cursor, Write};
use std::sync::Mutex;

use assert_matches::assert_matches;
use zip::write::SimpleFileOptions;

use ckan_downloader::error::CkanError;
use ckan_downloader::extract::{
    ExternalTool, ExtractionOutcome, ExtractionStrategy, InProcessZip, NoExtraction,
};
use ckan_downloader::logger::Logger;

#[derive(Default)]
struct Warnings(Mutex<Vec<String>>);

impl Logger for Warnings {
    fn emergency(&self, message: &str) -> ! {
        panic!("emergency: {message}");
    }
    fn alert(&self, _message: &str) {}
    fn critical(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
    fn warning(&self, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
    fn notice(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn debug(&self, _message: &str) {}
    fn success(&self, _message: &str) {}
}

fn write_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[test]
fn in_process_skips_entries_escaping_destination() {
    let temp = tempfile::tempdir().unwrap();
    let archive = temp.path().join("mixed.zip");
    std::fs::write(
        &archive,
        write_zip(&[("ok/data.csv", b"1;2\n"), ("../escape.txt", b"nope")]),
    )
    .unwrap();
    let destination = temp.path().join("out");
    std::fs::create_dir_all(&destination).unwrap();
    let logger = Warnings::default();

    let outcome = InProcessZip
        .extract(&archive, &destination, &logger)
        .unwrap();

    assert_eq!(outcome, ExtractionOutcome::Done);
    assert_eq!(
        std::fs::read(destination.join("ok/data.csv")).unwrap(),
        b"1;2\n"
    );
    assert!(!temp.path().join("escape.txt").exists());
    assert!(
        logger
            .0
            .lock()
            .unwrap()
            .iter()
            .any(|warning| warning.contains("escape.txt"))
    );
}

#[test]
fn in_process_reports_unopenable_archive() {
    let temp = tempfile::tempdir().unwrap();
    let archive = temp.path().join("broken.zip");
    std::fs::write(&archive, b"this is not an archive").unwrap();

    let err = InProcessZip
        .extract(&archive, temp.path(), &Warnings::default())
        .unwrap_err();

    assert_matches!(err, CkanError::ExtractionOpen { .. });
    assert!(!err.kind().is_fatal());
    assert!(archive.exists());
}

#[test]
fn external_tool_is_dispatched_even_when_missing() {
    let temp = tempfile::tempdir().unwrap();
    let tool = ExternalTool::new("ckan-dl-test-missing-extractor");

    let outcome = tool
        .extract(
            &temp.path().join("b.zip"),
            temp.path(),
            &Warnings::default(),
        )
        .unwrap();

    assert_eq!(tool.program(), "ckan-dl-test-missing-extractor");
    assert_eq!(outcome, ExtractionOutcome::Dispatched);
}

#[test]
fn external_tool_creates_missing_destination() {
    let temp = tempfile::tempdir().unwrap();
    let destination = temp.path().join("nested/b.zip_extracted");

    ExternalTool::new("ckan-dl-test-missing-extractor")
        .extract(&temp.path().join("b.zip"), &destination, &Warnings::default())
        .unwrap();

    assert!(destination.is_dir());
}

#[test]
fn no_extraction_skips_without_creating_destination() {
    let temp = tempfile::tempdir().unwrap();
    let destination = temp.path().join("b.zip_extracted");

    let outcome = NoExtraction
        .extract(&temp.path().join("b.zip"), &destination, &Warnings::default())
        .unwrap();

    assert_eq!(outcome, ExtractionOutcome::Skipped);
    assert!(!destination.exists());
}
