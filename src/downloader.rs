use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::catalog::{CatalogClient, CkanHttpClient};
use crate::config::DownloadConfig;
use crate::domain::{PackageName, PackageQuery, Resource, size_in_mb};
use crate::error::CkanError;
use crate::extract::{ExtractionOutcome, ExtractionStrategy};
use crate::logger::{Logger, TracingLogger};
use crate::transfer::{HttpFetcher, ResourceFetcher, stream_to_file};

/// Files produced by one [`Downloader::download`] call, keyed by resource file name.
///
/// A value is the downloaded file, or the extraction directory when extraction was requested
/// and a strategy is configured. The directory is recorded even when extraction failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DownloadResult {
    pub package: String,
    pub files: BTreeMap<String, Utf8PathBuf>,
}

impl DownloadResult {
    pub fn get(&self, filename: &str) -> Option<&Utf8Path> {
        self.files.get(filename).map(|path| path.as_path())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Finds a package in the catalog and pulls its resources to disk.
///
/// Every error returned from [`download`](Self::download) is fatal for the run. Archives that
/// cannot be extracted are only logged.
pub struct Downloader<C: CatalogClient, F: ResourceFetcher, L: Logger> {
    config: DownloadConfig,
    catalog: C,
    fetcher: F,
    logger: L,
    strategy: Box<dyn ExtractionStrategy>,
}

impl Downloader<CkanHttpClient, HttpFetcher, TracingLogger> {
    /// Downloader talking to the configured CKAN endpoint over HTTP.
    pub fn connect(config: DownloadConfig) -> Result<Self, CkanError> {
        let catalog = CkanHttpClient::new(config.catalog_url(), config.api_key())?;
        let fetcher = HttpFetcher::new()?;
        Ok(Self::new(config, catalog, fetcher, TracingLogger))
    }
}

impl<C: CatalogClient, F: ResourceFetcher, L: Logger> Downloader<C, F, L> {
    pub fn new(config: DownloadConfig, catalog: C, fetcher: F, logger: L) -> Self {
        let strategy = config.strategy().build(config.extract_command());
        Self {
            config,
            catalog,
            fetcher,
            logger,
            strategy,
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn logger(&self) -> &L {
        &self.logger
    }

    /// Downloads every resource of `package_name`, or only the one whose file name equals
    /// `resource_name`, and extracts each of them when `extract` is set.
    pub fn download(
        &self,
        package_name: &str,
        resource_name: Option<&str>,
        extract: bool,
    ) -> Result<DownloadResult, CkanError> {
        self.logger.notice("Download process started");

        let name: PackageName = package_name.parse()?;
        let _package_span = tracing::info_span!("download", package = %name).entered();
        self.logger.debug(&format!("Searching for package {name} ..."));
        let mut packages = self.catalog.search(&PackageQuery::exact(&name))?;
        let package = match packages.len() {
            0 => return Err(CkanError::PackageNotFound(name.to_string())),
            1 => packages.remove(0),
            count => {
                return Err(CkanError::AmbiguousPackage {
                    name: name.to_string(),
                    count,
                });
            }
        };
        self.logger.debug(&format!(
            "Found package {name} with {} resource files",
            package.resources.len()
        ));

        let mut result = DownloadResult {
            package: package.name.clone(),
            files: BTreeMap::new(),
        };
        for resource in &package.resources {
            let filename = resource.filename();
            if resource_name.is_some_and(|wanted| wanted != filename) {
                continue;
            }
            let path = self.fetch_resource(resource, extract)?;
            result.files.insert(filename.to_string(), path);
        }

        self.logger.success("Download process finished");
        Ok(result)
    }

    fn fetch_resource(
        &self,
        resource: &Resource,
        extract: bool,
    ) -> Result<Utf8PathBuf, CkanError> {
        let filename = resource.filename();
        let _resource_span = tracing::info_span!("resource", file = %filename).entered();
        let target = self.config.download_dir().join(filename);

        self.logger.debug(&format!(
            "Downloading {filename} [{} MB] ...",
            size_in_mb(resource.size_bytes)
        ));
        let bytes = stream_to_file(&self.fetcher, &resource.source_url, target.as_std_path())?;
        self.logger.debug(&format!("Saved {bytes} bytes to {target}"));

        if !extract {
            return Ok(target);
        }
        self.extract_resource(filename, target)
    }

    fn extract_resource(
        &self,
        filename: &str,
        archive: Utf8PathBuf,
    ) -> Result<Utf8PathBuf, CkanError> {
        let destination = self
            .config
            .extract_dir()
            .join(format!("{filename}_extracted"));

        self.logger.debug(&format!(
            "Extracting {filename} ({}) ...",
            self.strategy.kind()
        ));
        match self.strategy.extract(
            archive.as_std_path(),
            destination.as_std_path(),
            &self.logger,
        ) {
            Ok(ExtractionOutcome::Done) => self.logger.debug("Extraction done"),
            Ok(ExtractionOutcome::Dispatched) => self
                .logger
                .debug(&format!("Handed {filename} to the external extractor")),
            Ok(ExtractionOutcome::Skipped) => {
                self.logger
                    .alert("extraction skipped: no strategy configured");
                return Ok(archive);
            }
            Err(err) if !err.kind().is_fatal() => self
                .logger
                .warning(&format!("Extraction of {filename} failed: {err}")),
            Err(err) => return Err(err),
        }
        Ok(destination)
    }
}
