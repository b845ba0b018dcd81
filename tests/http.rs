use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

use assert_matches::assert_matches;

use ckan_downloader::catalog::{CatalogClient, CkanHttpClient};
use ckan_downloader::domain::{PackageName, PackageQuery};
use ckan_downloader::error::CkanError;
use ckan_downloader::transfer::{HttpFetcher, stream_to_file};

/// Serves one canned response and hands back the raw request head.
fn serve_once(status: &str, body: Vec<u8>) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let status = status.to_string();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|window| window == b"\r\n\r\n") {
            let read = stream.read(&mut buf).unwrap();
            if read == 0 {
                break;
            }
            request.extend_from_slice(&buf[..read]);
        }
        let head = format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        stream.write_all(head.as_bytes()).unwrap();
        stream.write_all(&body).unwrap();
        stream.flush().unwrap();
        String::from_utf8_lossy(&request).to_string()
    });
    (format!("http://{addr}"), handle)
}

#[test]
fn fetcher_streams_bytes_to_disk() {
    let payload: Vec<u8> = (0..=255u8).cycle().take(70_000).collect();
    let (base, server) = serve_once("200 OK", payload.clone());
    let temp = tempfile::tempdir().unwrap();
    let target = temp.path().join("blob.bin");

    let fetcher = HttpFetcher::new().unwrap();
    let written = stream_to_file(&fetcher, &format!("{base}/files/blob.bin"), &target).unwrap();

    let request = server.join().unwrap();
    assert!(request.starts_with("GET /files/blob.bin HTTP/1.1"));
    assert_eq!(written, payload.len() as u64);
    assert_eq!(std::fs::read(&target).unwrap(), payload);
}

#[test]
fn fetcher_rejects_error_status() {
    let (base, server) = serve_once("404 Not Found", b"missing".to_vec());
    let temp = tempfile::tempdir().unwrap();
    let target = temp.path().join("gone.csv");

    let fetcher = HttpFetcher::new().unwrap();
    let err = stream_to_file(&fetcher, &format!("{base}/gone.csv"), &target).unwrap_err();

    server.join().unwrap();
    assert_matches!(err, CkanError::Transfer { ref message, .. } if message.contains("404"));
    assert!(!target.exists());
}

#[test]
fn catalog_client_sends_exact_name_filter() {
    let body = br#"{"success": true, "result": {"count": 1, "results": [
        {"name": "survey-data", "resources": [{"url": "http://x/a.csv", "size": 10}]}
    ]}}"#
        .to_vec();
    let (base, server) = serve_once("200 OK", body);

    let client = CkanHttpClient::new(&format!("{base}/api/3"), Some("secret-key")).unwrap();
    let name: PackageName = "survey-data".parse().unwrap();
    let packages = client.search(&PackageQuery::exact(&name)).unwrap();

    let request = server.join().unwrap();
    let request_line = request.lines().next().unwrap();
    assert!(request_line.starts_with("GET /api/3/action/package_search?"));
    assert!(request_line.contains("fq=name%3Asurvey-data"));
    assert!(request.to_ascii_lowercase().contains("authorization: secret-key"));
    assert_eq!(packages.len(), 1);
    assert_eq!(packages[0].resources[0].filename(), "a.csv");
}

#[test]
fn catalog_error_status_is_reported() {
    let (base, server) = serve_once("500 Internal Server Error", b"boom".to_vec());

    let client = CkanHttpClient::new(&format!("{base}/api/3/"), None).unwrap();
    let name: PackageName = "survey-data".parse().unwrap();
    let err = client.search(&PackageQuery::exact(&name)).unwrap_err();

    server.join().unwrap();
    assert_matches!(err, CkanError::CatalogStatus { status: 500, .. });
}
