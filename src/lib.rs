//! Fetches dataset packages from CKAN open-data catalogs.
//!
//! A [`Downloader`](downloader::Downloader) looks up exactly one package by name, streams its
//! resource files into a download directory and, on request, unpacks them with the configured
//! [`ExtractionStrategy`](extract::ExtractionStrategy).

pub mod catalog;
pub mod config;
pub mod domain;
pub mod downloader;
pub mod error;
pub mod extract;
pub mod logger;
pub mod output;
pub mod transfer;
