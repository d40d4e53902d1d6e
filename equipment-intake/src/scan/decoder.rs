// Image → text decoding for the active scan path.

use log::debug;

use super::{ScanFailure, ScanResult};

/// Opaque decode capability. Implementations are CPU-bound and run on the blocking pool.
pub trait CodeDecoder: Send + Sync {
    fn decode(&self, image: &[u8]) -> ScanResult;
}

/// QR decoder: `image` loads any supported format, `rqrr` finds and decodes the grids.
#[derive(Debug, Default, Clone, Copy)]
pub struct QrDecoder;

impl CodeDecoder for QrDecoder {
    fn decode(&self, image: &[u8]) -> ScanResult {
        if image.is_empty() {
            return Err(ScanFailure::ImageLoadFailed("no image data".to_string()));
        }

        let img = image::load_from_memory(image)
            .map_err(|e| ScanFailure::ImageLoadFailed(e.to_string()))?;
        let luma = img.to_luma8();
        let (width, height) = luma.dimensions();
        if width == 0 || height == 0 {
            return Err(ScanFailure::DecodeContextUnavailable);
        }

        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
                luma.get_pixel(x as u32, y as u32)[0]
            });

        for grid in prepared.detect_grids() {
            match grid.decode() {
                Ok((_meta, content)) => return Ok(content),
                Err(e) => debug!("[PHASE: scan] [STEP: decode] Grid rejected: {:?}", e),
            }
        }

        Err(ScanFailure::NoCodeFound)
    }
}
