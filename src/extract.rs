use std::fs;
use std::io;
use std::path::Path;
use std::process::Command;

use zip::ZipArchive;

use crate::config::ExtractionStrategyKind;
use crate::error::CkanError;
use crate::logger::Logger;

/// What happened to one archive after dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// Entries were written by this process.
    Done,
    /// Handed to another program; its result is not observed.
    Dispatched,
    /// Nothing was attempted.
    Skipped,
}

/// A way of expanding a downloaded archive into a directory.
///
/// Implementations differ in what failure they can report: [`InProcessZip`] returns
/// [`CkanError::ExtractionOpen`] for archives it cannot open, [`ExternalTool`] never reports
/// anything, and [`NoExtraction`] always skips without touching the filesystem.
pub trait ExtractionStrategy: Send + Sync {
    fn kind(&self) -> ExtractionStrategyKind;

    /// Expands `archive` into `destination`, creating the directory first when the strategy
    /// writes anything. An existing directory is reused.
    fn extract(
        &self,
        archive: &Path,
        destination: &Path,
        logger: &dyn Logger,
    ) -> Result<ExtractionOutcome, CkanError>;
}

/// Extracts zip archives with the `zip` crate.
///
/// Entries that cannot be read or written are reported as warnings and skipped, so a damaged
/// or very large archive can leave the destination only partly populated while the outcome is
/// still [`ExtractionOutcome::Done`]. Use [`ExternalTool`] when that matters.
#[derive(Debug, Clone, Copy, Default)]
pub struct InProcessZip;

impl ExtractionStrategy for InProcessZip {
    fn kind(&self) -> ExtractionStrategyKind {
        ExtractionStrategyKind::InProcess
    }

    fn extract(
        &self,
        archive: &Path,
        destination: &Path,
        logger: &dyn Logger,
    ) -> Result<ExtractionOutcome, CkanError> {
        prepare_destination(destination)?;
        let open_error = |message: String| CkanError::ExtractionOpen {
            path: archive.to_path_buf(),
            message,
        };
        let file = fs::File::open(archive).map_err(|err| open_error(err.to_string()))?;
        let mut zip = ZipArchive::new(file).map_err(|err| open_error(err.to_string()))?;

        for i in 0..zip.len() {
            let mut entry = match zip.by_index(i) {
                Ok(entry) => entry,
                Err(err) => {
                    logger.warning(&format!("Skipping unreadable entry #{i}: {err}"));
                    continue;
                }
            };
            let Some(relative) = entry.enclosed_name() else {
                logger.warning(&format!(
                    "Skipping entry outside of the destination: {}",
                    entry.name()
                ));
                continue;
            };
            let entry_path = destination.join(relative);

            if entry.is_dir() {
                if let Err(err) = fs::create_dir_all(&entry_path) {
                    logger.warning(&format!("Cannot create {}: {err}", entry_path.display()));
                }
                continue;
            }

            let written = entry_path
                .parent()
                .map_or(Ok(()), fs::create_dir_all)
                .and_then(|_| fs::File::create(&entry_path))
                .and_then(|mut outfile| io::copy(&mut entry, &mut outfile));
            if let Err(err) = written {
                logger.warning(&format!("Cannot extract {}: {err}", entry_path.display()));
            }
        }
        Ok(ExtractionOutcome::Done)
    }
}

/// Runs an OS extractor as `<program> -o -q <archive> -d <destination>`.
///
/// Neither spawn failures nor the exit status are inspected.
#[derive(Debug, Clone)]
pub struct ExternalTool {
    program: String,
}

impl ExternalTool {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl ExtractionStrategy for ExternalTool {
    fn kind(&self) -> ExtractionStrategyKind {
        ExtractionStrategyKind::ExternalTool
    }

    fn extract(
        &self,
        archive: &Path,
        destination: &Path,
        _logger: &dyn Logger,
    ) -> Result<ExtractionOutcome, CkanError> {
        prepare_destination(destination)?;
        let _ = Command::new(&self.program)
            .arg("-o")
            .arg("-q")
            .arg(archive)
            .arg("-d")
            .arg(destination)
            .status();
        Ok(ExtractionOutcome::Dispatched)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoExtraction;

impl ExtractionStrategy for NoExtraction {
    fn kind(&self) -> ExtractionStrategyKind {
        ExtractionStrategyKind::None
    }

    fn extract(
        &self,
        _archive: &Path,
        _destination: &Path,
        _logger: &dyn Logger,
    ) -> Result<ExtractionOutcome, CkanError> {
        Ok(ExtractionOutcome::Skipped)
    }
}

fn prepare_destination(destination: &Path) -> Result<(), CkanError> {
    fs::create_dir_all(destination)
        .map_err(|err| CkanError::Filesystem(format!("create {}: {err}", destination.display())))
}
