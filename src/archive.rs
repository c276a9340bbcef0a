//! Snapshot archive client

use std::io::Read;

use async_trait::async_trait;
use flate2::read::MultiGzDecoder;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::{
    config::ArchiveConfig, errors::ImporterError, models::Snapshot, timestamps::SnapshotId,
};

/// First two bytes of every gzip member
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Provider of snapshot documents
#[async_trait]
pub trait SnapshotSource {
    /// Fetch and parse one snapshot.
    ///
    /// `Ok(None)` means the archive has no usable data for `id`.
    async fn fetch(&self, id: &SnapshotId) -> Result<Option<Snapshot>, ImporterError>;
}

/// HTTP client for the readsb history archive
pub struct ArchiveClient {
    client: Client,
    base_url: String,
}

impl ArchiveClient {
    pub fn new(config: &ArchiveConfig) -> Result<Self, ImporterError> {
        if config.accept_invalid_certs {
            warn!("TLS certificate verification is disabled for archive requests");
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Location of snapshot `id` in the archive
    pub fn snapshot_url(&self, id: &SnapshotId) -> String {
        format!("{}/{}.json.gz", self.base_url, id)
    }
}

#[async_trait]
impl SnapshotSource for ArchiveClient {
    async fn fetch(&self, id: &SnapshotId) -> Result<Option<Snapshot>, ImporterError> {
        let url = self.snapshot_url(id);
        debug!("Fetching {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            warn!("Skipping {}: HTTP {}", id, status.as_u16());
            return Ok(None);
        }

        let body = response.bytes().await?;
        decode_snapshot(&body).map(Some)
    }
}

/// Parse a snapshot body, gzip-compressed or plain JSON.
///
/// Bodies without a gzip header are read as plain UTF-8 JSON. A body with a
/// gzip header that fails to decompress is an error.
pub fn decode_snapshot(body: &[u8]) -> Result<Snapshot, ImporterError> {
    let text = if body.starts_with(&GZIP_MAGIC) {
        gunzip(body)?
    } else {
        debug!("Snapshot body is not gzip-compressed, reading as plain JSON");
        String::from_utf8(body.to_vec())?
    };

    Ok(serde_json::from_str(&text)?)
}

/// Decompress every gzip member of `body`
fn gunzip(body: &[u8]) -> Result<String, ImporterError> {
    let mut decoded = Vec::new();
    MultiGzDecoder::new(body).read_to_end(&mut decoded)?;
    Ok(String::from_utf8(decoded)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const SNAPSHOT: &str = r#"{
        "now": 1712000000.0,
        "aircraft": [
            { "hex": "abc123", "lat": 10.0, "lon": 20.0, "alt_baro": 5000, "gs": "200.5" },
            { "hex": "def456" }
        ]
    }"#;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn decode_gzip_body() {
        let expected: Snapshot = serde_json::from_str(SNAPSHOT).unwrap();
        let decoded = decode_snapshot(&gzip(SNAPSHOT.as_bytes())).unwrap();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn decode_plain_body() {
        let expected: Snapshot = serde_json::from_str(SNAPSHOT).unwrap();
        let decoded = decode_snapshot(SNAPSHOT.as_bytes()).unwrap();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn decode_invalid_body() {
        assert!(matches!(
            decode_snapshot(b"<html>Not Found</html>"),
            Err(ImporterError::SerdeError(_))
        ));
        assert!(matches!(
            decode_snapshot(&[0xff, 0xfe, 0x00]),
            Err(ImporterError::Utf8Error(_))
        ));
    }

    #[test]
    fn decode_multi_member_gzip() {
        let expected: Snapshot = serde_json::from_str(SNAPSHOT).unwrap();
        let (head, tail) = SNAPSHOT.as_bytes().split_at(20);
        let mut body = gzip(head);
        body.extend(gzip(tail));

        assert_eq!(decode_snapshot(&body).unwrap(), expected);
    }

    #[test]
    fn decode_truncated_gzip() {
        let body = gzip(SNAPSHOT.as_bytes());
        assert!(decode_snapshot(&body[..body.len() / 2]).is_err());
    }

    #[test]
    fn decode_gzip_with_invalid_json() {
        assert!(matches!(
            decode_snapshot(&gzip(b"{\"now\": ")),
            Err(ImporterError::SerdeError(_))
        ));
    }

    #[test]
    fn snapshot_url() {
        let client = ArchiveClient::new(&ArchiveConfig {
            base_url: "https://samples.adsbexchange.com/readsb-hist/2025/04/01/".to_string(),
            timeout: Duration::from_secs(10),
            accept_invalid_certs: false,
        })
        .unwrap();

        let id = crate::timestamps::snapshot_ids(Some(2)).pop().unwrap();
        assert_eq!(
            client.snapshot_url(&id),
            "https://samples.adsbexchange.com/readsb-hist/2025/04/01/000005Z.json.gz"
        );
    }

    fn client(base_url: String) -> ArchiveClient {
        ArchiveClient::new(&ArchiveConfig {
            base_url,
            timeout: Duration::from_secs(5),
            accept_invalid_certs: false,
        })
        .unwrap()
    }

    /// Serve a single HTTP response on a local port, returning the base URL
    async fn serve_once(status: &'static str, body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let head = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
            socket.shutdown().await.ok();
        });

        format!("http://{}/readsb-hist/2025/04/01", addr)
    }

    #[tokio::test]
    async fn fetch_not_found_is_skipped() {
        let base_url = serve_once("404 Not Found", b"not found".to_vec()).await;
        let id = crate::timestamps::snapshot_ids(Some(1)).remove(0);

        let fetched = client(base_url).fetch(&id).await.unwrap();
        assert_eq!(fetched, None);
    }

    #[tokio::test]
    async fn fetch_gzip_snapshot() {
        let base_url = serve_once("200 OK", gzip(SNAPSHOT.as_bytes())).await;
        let id = crate::timestamps::snapshot_ids(Some(1)).remove(0);

        let expected: Snapshot = serde_json::from_str(SNAPSHOT).unwrap();
        let fetched = client(base_url).fetch(&id).await.unwrap();
        assert_eq!(fetched, Some(expected));
    }

    #[tokio::test]
    async fn fetch_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let id = crate::timestamps::snapshot_ids(Some(1)).remove(0);
        let result = client(format!("http://{}", addr)).fetch(&id).await;
        assert!(matches!(result, Err(ImporterError::HttpError(_))));
    }
}
