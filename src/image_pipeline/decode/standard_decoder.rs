//! Image decoder backed by the `image` crate.
//!
//! Any format the `image` crate was built with (PNG, JPEG, TIFF, WebP, ...)
//! is accepted; the format is guessed from the leading bytes.

use tracing::debug;
use crate::image_pipeline::common::error::{CombineError, Result};
use crate::image_pipeline::decode::reader::ImageDecoder;
use crate::image_pipeline::decode::types::DecodedImage;

pub struct StandardImageDecoder;

impl ImageDecoder for StandardImageDecoder {
    fn decode(&self, data: &[u8]) -> Result<DecodedImage> {
        debug!("Decoding image, {} bytes", data.len());

        let pixels = image::load_from_memory(data)
            .map_err(|e| CombineError::ImageLoadFailed(e.to_string()))?;

        debug!("Decoded image: {}x{} ({:?})", pixels.width(), pixels.height(), pixels.color());
        Ok(DecodedImage::new(pixels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_pipeline::decode::types::HasDimensions;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;

    #[test]
    fn test_decodes_png_dimensions() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(7, 3));
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();

        let decoded = StandardImageDecoder.decode(&bytes).unwrap();
        let descriptor = decoded.descriptor();
        assert_eq!(descriptor.pixel_width, 7);
        assert_eq!(descriptor.pixel_height, 3);
    }

    #[test]
    fn test_garbage_is_load_failure() {
        let result = StandardImageDecoder.decode(b"definitely not an image");
        assert!(matches!(result, Err(CombineError::ImageLoadFailed(_))));
    }
}
