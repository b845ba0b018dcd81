use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CkanError;

static PACKAGE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9_-]{2,100}$").expect("package name regex must compile")
});

/// A CKAN package name: lowercase ASCII letters, digits, `-` and `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageName(String);

impl PackageName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PackageName {
    type Err = CkanError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if !PACKAGE_NAME_RE.is_match(trimmed) {
            return Err(CkanError::InvalidPackageName(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Filter handed to the catalog search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageQuery {
    pub name_pattern: String,
}

impl PackageQuery {
    pub fn exact(name: &PackageName) -> Self {
        Self {
            name_pattern: format!("name:{}", name.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Package {
    pub name: String,
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub source_url: String,
    pub size_bytes: u64,
}

impl Resource {
    pub fn new(source_url: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            source_url: source_url.into(),
            size_bytes,
        }
    }

    /// Local file name of the resource; also the key used in a [`DownloadResult`].
    ///
    /// [`DownloadResult`]: crate::downloader::DownloadResult
    pub fn filename(&self) -> &str {
        resource_filename(&self.source_url)
    }
}

/// Final path segment of `url`, ignoring any query string or fragment.
pub fn resource_filename(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let path = path.trim_end_matches('/');
    match path.rfind('/') {
        Some(index) => &path[index + 1..],
        None => path,
    }
}

/// Size rounded to whole megabytes (10^6 bytes), as shown in progress messages.
pub fn size_in_mb(size_bytes: u64) -> u64 {
    (size_bytes + 500_000) / 1_000_000
}
