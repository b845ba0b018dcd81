use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::error::CkanError;

pub trait ResourceFetcher {
    /// Opens a byte stream for `url`. The stream is closed when the returned reader is dropped.
    fn open(&self, url: &str) -> Result<Box<dyn Read>, CkanError>;
}

/// Plain blocking GET without a timeout.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, CkanError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("ckan-dl/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| CkanError::Configuration(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(None::<Duration>)
            .build()
            .map_err(|err| CkanError::Configuration(err.to_string()))?;
        Ok(Self { client })
    }
}

impl ResourceFetcher for HttpFetcher {
    fn open(&self, url: &str) -> Result<Box<dyn Read>, CkanError> {
        let transfer_error = |message: String| CkanError::Transfer {
            url: url.to_string(),
            message,
        };
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| transfer_error(err.to_string()))?;
        if !response.status().is_success() {
            return Err(transfer_error(format!(
                "server returned status {}",
                response.status().as_u16()
            )));
        }
        Ok(Box::new(response))
    }
}

/// Copies `url` byte for byte into `target`, replacing any existing file.
///
/// A failed copy leaves whatever was already written at `target`.
pub fn stream_to_file(
    fetcher: &dyn ResourceFetcher,
    url: &str,
    target: &Path,
) -> Result<u64, CkanError> {
    let mut source = fetcher.open(url)?;
    let mut file = File::create(target).map_err(|err| CkanError::Transfer {
        url: url.to_string(),
        message: format!("create {}: {err}", target.display()),
    })?;
    io::copy(&mut source, &mut file).map_err(|err| CkanError::Transfer {
        url: url.to_string(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct Bytes(&'static [u8]);

    impl ResourceFetcher for Bytes {
        fn open(&self, _url: &str) -> Result<Box<dyn Read>, CkanError> {
            Ok(Box::new(Cursor::new(self.0)))
        }
    }

    #[test]
    fn copies_exact_bytes_and_truncates_old_content() {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("a.csv");
        std::fs::write(&target, b"stale content that is longer").unwrap();

        let written = stream_to_file(&Bytes(b"id;value\n1;\xff\n"), "http://x/a.csv", &target)
            .unwrap();

        assert_eq!(written, 13);
        assert_eq!(std::fs::read(&target).unwrap(), b"id;value\n1;\xff\n");
    }
}
