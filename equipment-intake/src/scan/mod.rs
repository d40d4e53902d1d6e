//! QR/barcode scan capability.
//!
//! Two producers feed one field:
//! - passive: a hardware scanner types into the focused field and sends a terminator (Enter) or
//!   the field loses focus; [`passive_commit`] decides what gets committed.
//! - active: a captured image goes through [`ImageScanner::scan`].
//!
//! The engine only ever sees a committed string or a [`ScanFailure`].

pub mod connectivity;
pub mod decoder;

use log::{info, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

pub use connectivity::{AssumeOnline, ConnectivityProbe, TcpConnectivityProbe};
pub use decoder::{CodeDecoder, QrDecoder};

/// Decoded values shorter than this are treated as misreads.
pub const DEFAULT_MIN_SCAN_LENGTH: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanFailure {
    #[error("No network connection. Reconnect and scan again.")]
    ConnectivityUnavailable,

    #[error("Could not create a decoding context for the image.")]
    DecodeContextUnavailable,

    #[error("Could not load the image. Make sure the file is a valid image ({0}).")]
    ImageLoadFailed(String),

    #[error("No valid QR code/barcode found in the image.")]
    NoCodeFound,

    #[error("Scanned value is invalid or too short: \"{value}\" (need at least {min_length} characters).")]
    LowConfidence { value: String, min_length: usize },
}

impl ScanFailure {
    /// Stable identifier for logs.
    pub fn code(&self) -> &'static str {
        match self {
            ScanFailure::ConnectivityUnavailable => "connectivity-unavailable",
            ScanFailure::DecodeContextUnavailable => "decode-context-unavailable",
            ScanFailure::ImageLoadFailed(_) => "image-load-failed",
            ScanFailure::NoCodeFound => "no-code-found",
            ScanFailure::LowConfidence { .. } => "low-confidence",
        }
    }
}

pub type ScanResult = Result<String, ScanFailure>;

/// Commit rule for keyboard-emulating scanners: trimmed, accepted verbatim when non-empty.
pub fn passive_commit(raw: &str) -> Option<String> {
    let v = raw.trim();
    if v.is_empty() {
        None
    } else {
        Some(v.to_string())
    }
}

/// Active scan pipeline: connectivity precheck, decode, low-confidence guard.
pub struct ImageScanner {
    probe: Arc<dyn ConnectivityProbe>,
    decoder: Arc<dyn CodeDecoder>,
    min_length: usize,
}

impl ImageScanner {
    pub fn new(
        probe: Arc<dyn ConnectivityProbe>,
        decoder: Arc<dyn CodeDecoder>,
        min_length: usize,
    ) -> Self {
        Self {
            probe,
            decoder,
            min_length: min_length.max(1),
        }
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    pub async fn scan_file(&self, path: &Path) -> ScanResult {
        // Connectivity is checked before touching the file, same order as `scan`.
        self.ensure_online().await?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ScanFailure::ImageLoadFailed(format!("error reading file: {}", e)))?;
        self.decode_checked(bytes).await
    }

    pub async fn scan(&self, image: Vec<u8>) -> ScanResult {
        self.ensure_online().await?;
        self.decode_checked(image).await
    }

    async fn ensure_online(&self) -> Result<(), ScanFailure> {
        if self.probe.is_online().await {
            Ok(())
        } else {
            warn!("[PHASE: scan] [STEP: precheck] Connectivity unavailable; scan refused");
            Err(ScanFailure::ConnectivityUnavailable)
        }
    }

    async fn decode_checked(&self, image: Vec<u8>) -> ScanResult {
        let started = Instant::now();
        let decoder = Arc::clone(&self.decoder);
        let size = image.len();

        let decoded = tokio::task::spawn_blocking(move || decoder.decode(&image))
            .await
            .map_err(|e| {
                warn!("[PHASE: scan] [STEP: decode] Decode task failed: {}", e);
                ScanFailure::DecodeContextUnavailable
            })?;

        let result = decoded.and_then(|value| {
            let value = value.trim().to_string();
            if value.chars().count() < self.min_length {
                Err(ScanFailure::LowConfidence {
                    value,
                    min_length: self.min_length,
                })
            } else {
                Ok(value)
            }
        });

        match &result {
            Ok(v) => info!(
                "[PHASE: scan] [STEP: decode] Decoded {} chars from {} bytes (duration_ms={})",
                v.chars().count(),
                size,
                started.elapsed().as_millis()
            ),
            Err(e) => warn!(
                "[PHASE: scan] [STEP: decode] Scan rejected: {} (bytes={}, duration_ms={})",
                e.code(),
                size,
                started.elapsed().as_millis()
            ),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FixedProbe(bool);

    #[async_trait]
    impl ConnectivityProbe for FixedProbe {
        async fn is_online(&self) -> bool {
            self.0
        }
    }

    /// Decoder stub returning a canned result and counting calls.
    struct StubDecoder {
        result: ScanResult,
        calls: AtomicU32,
    }

    impl StubDecoder {
        fn new(result: ScanResult) -> Self {
            Self {
                result,
                calls: AtomicU32::new(0),
            }
        }
    }

    impl CodeDecoder for StubDecoder {
        fn decode(&self, _image: &[u8]) -> ScanResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn scanner(online: bool, decoder: Arc<StubDecoder>) -> ImageScanner {
        ImageScanner::new(Arc::new(FixedProbe(online)), decoder, DEFAULT_MIN_SCAN_LENGTH)
    }

    #[test]
    fn passive_commit_trims_and_rejects_blank() {
        assert_eq!(passive_commit("  SERI-1234\r\n"), Some("SERI-1234".to_string()));
        assert_eq!(passive_commit("ab"), Some("ab".to_string()));
        assert_eq!(passive_commit(" \t "), None);
    }

    #[tokio::test]
    async fn offline_is_reported_before_decoding() {
        let decoder = Arc::new(StubDecoder::new(Ok("SERI-123456".to_string())));
        let result = scanner(false, Arc::clone(&decoder)).scan(vec![1, 2, 3]).await;
        assert_eq!(result, Err(ScanFailure::ConnectivityUnavailable));
        assert_eq!(decoder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn short_decode_is_low_confidence() {
        let decoder = Arc::new(StubDecoder::new(Ok("AB12".to_string())));
        let result = scanner(true, decoder).scan(vec![0]).await;
        assert_eq!(
            result,
            Err(ScanFailure::LowConfidence {
                value: "AB12".to_string(),
                min_length: 6
            })
        );
    }

    #[tokio::test]
    async fn six_characters_is_accepted() {
        let decoder = Arc::new(StubDecoder::new(Ok(" ABC123 ".to_string())));
        let result = scanner(true, decoder).scan(vec![0]).await;
        assert_eq!(result, Ok("ABC123".to_string()));
    }

    #[tokio::test]
    async fn threshold_is_configurable() {
        let decoder = Arc::new(StubDecoder::new(Ok("AB12".to_string())));
        let s = ImageScanner::new(Arc::new(FixedProbe(true)), decoder, 4);
        assert_eq!(s.scan(vec![0]).await, Ok("AB12".to_string()));
    }

    #[tokio::test]
    async fn decoder_failure_is_passed_through() {
        let decoder = Arc::new(StubDecoder::new(Err(ScanFailure::NoCodeFound)));
        let result = scanner(true, decoder).scan(vec![0]).await;
        assert_eq!(result, Err(ScanFailure::NoCodeFound));
    }

    #[tokio::test]
    async fn missing_file_is_an_image_load_failure() {
        let decoder = Arc::new(StubDecoder::new(Ok("unused-value".to_string())));
        let dir = tempfile::tempdir().expect("tempdir");
        let result = scanner(true, decoder)
            .scan_file(&dir.path().join("missing.png"))
            .await;
        assert!(
            matches!(result, Err(ScanFailure::ImageLoadFailed(_))),
            "unexpected result: {:?}",
            result
        );
    }
}
