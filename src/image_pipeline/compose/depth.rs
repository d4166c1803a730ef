//! Depth maps and the depth auxiliary-data composer.

use image::{DynamicImage, GrayImage, Luma};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use crate::image_pipeline::common::error::{CombineError, Result};
use crate::image_pipeline::decode::types::HasDimensions;

/// Auxiliary image type marking an item as a depth map.
pub const DEPTH_AUXILIARY_TYPE: &str = "urn:mpeg:mpegB:cicp:systems:auxiliary:depth";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepthPixelFormat {
    /// One native-endian `f32` per pixel.
    DepthFloat32,
}

impl DepthPixelFormat {
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            DepthPixelFormat::DepthFloat32 => 4,
        }
    }
}

/// Per-pixel depth values, row-major, normalized to `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMap {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl DepthMap {
    pub fn new(width: u32, height: u32, values: Vec<f32>) -> Result<Self> {
        let map = Self { width, height, values };
        map.validate()?;
        Ok(map)
    }

    /// Reads a grayscale depth image, `255` being the nearest.
    pub fn from_luma(image: &GrayImage) -> Self {
        let values = image.pixels().map(|Luma([v])| f32::from(*v) / 255.0).collect();
        Self { width: image.width(), height: image.height(), values }
    }

    /// Converts any image to luma first.
    pub fn from_image(image: &DynamicImage) -> Self {
        Self::from_luma(&image.to_luma8())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn row(&self, y: u32) -> &[f32] {
        let start = y as usize * self.width as usize;
        &self.values[start..start + self.width as usize]
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CombineError::InvalidDepthMap(format!(
                "dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }

        let expected = self.width as usize * self.height as usize;
        if self.values.len() != expected {
            return Err(CombineError::InvalidDepthMap(format!(
                "expected {} values for {}x{}, got {}",
                expected,
                self.width,
                self.height,
                self.values.len()
            )));
        }

        if let Some(index) = self.values.iter().position(|v| !v.is_finite()) {
            return Err(CombineError::InvalidDepthMap(format!("non-finite value at index {index}")));
        }

        Ok(())
    }

    /// 8-bit quantization used for the stored auxiliary image. Values outside
    /// `[0, 1]` are clamped.
    pub fn to_luma8(&self) -> GrayImage {
        let mut clamped = 0usize;
        let bytes = self
            .values
            .iter()
            .map(|&v| {
                if !(0.0..=1.0).contains(&v) {
                    clamped += 1;
                }
                (v.clamp(0.0, 1.0) * 255.0).round() as u8
            })
            .collect();

        if clamped > 0 {
            warn!("Clamped {} depth values outside [0, 1]", clamped);
        }

        // Length was checked in validate(); from_raw only fails on short buffers.
        GrayImage::from_raw(self.width, self.height, bytes)
            .unwrap_or_else(|| GrayImage::new(self.width, self.height))
    }

    pub fn description(&self) -> DepthDescription {
        let pixel_format = DepthPixelFormat::DepthFloat32;
        DepthDescription {
            pixel_format,
            width: self.width,
            height: self.height,
            bytes_per_row: self.width * pixel_format.bytes_per_pixel(),
        }
    }
}

/// Memory layout of the depth buffer attached to an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthDescription {
    pub pixel_format: DepthPixelFormat,
    pub width: u32,
    pub height: u32,
    pub bytes_per_row: u32,
}

#[derive(Debug, Clone)]
pub struct DepthAttachmentPlan<I> {
    pub image: I,
    pub depth: DepthMap,
    pub description: DepthDescription,
    pub auxiliary_type: &'static str,
}

/// Pairs a main image with a depth map to be stored as its auxiliary image.
///
/// The depth map may have different dimensions from the main image.
pub fn compose_depth_attachment<I: HasDimensions>(image: I, depth: DepthMap) -> Result<DepthAttachmentPlan<I>> {
    let descriptor = image.descriptor();
    if descriptor.pixel_width == 0 || descriptor.pixel_height == 0 {
        return Err(CombineError::InvalidImageDescriptor {
            width: descriptor.pixel_width,
            height: descriptor.pixel_height,
        });
    }
    depth.validate()?;

    let description = depth.description();
    debug!(
        "Depth attachment: main {}x{}, depth {}x{} ({} bytes per row)",
        descriptor.pixel_width,
        descriptor.pixel_height,
        description.width,
        description.height,
        description.bytes_per_row
    );

    Ok(DepthAttachmentPlan {
        image,
        depth,
        description,
        auxiliary_type: DEPTH_AUXILIARY_TYPE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_pipeline::decode::types::ImageDescriptor;

    #[test]
    fn test_from_luma_normalizes() {
        let image = GrayImage::from_raw(3, 1, vec![0, 51, 255]).unwrap();
        let depth = DepthMap::from_luma(&image);
        assert_eq!(depth.width(), 3);
        assert_eq!(depth.height(), 1);
        assert_eq!(depth.values(), &[0.0, 0.2, 1.0]);
    }

    #[test]
    fn test_new_validates() {
        assert!(matches!(DepthMap::new(0, 1, vec![]), Err(CombineError::InvalidDepthMap(_))));
        assert!(matches!(DepthMap::new(2, 2, vec![0.0; 3]), Err(CombineError::InvalidDepthMap(_))));
        assert!(matches!(
            DepthMap::new(1, 2, vec![0.5, f32::NAN]),
            Err(CombineError::InvalidDepthMap(_))
        ));
        assert!(DepthMap::new(2, 1, vec![0.0, 1.0]).is_ok());
    }

    #[test]
    fn test_description_layout() {
        let depth = DepthMap::new(5, 2, vec![0.5; 10]).unwrap();
        let description = depth.description();
        assert_eq!(description.pixel_format, DepthPixelFormat::DepthFloat32);
        assert_eq!(description.bytes_per_row, 20);
        assert_eq!((description.width, description.height), (5, 2));
    }

    #[test]
    fn test_quantization_clamps() {
        let depth = DepthMap::new(4, 1, vec![-1.0, 0.0, 0.5, 2.0]).unwrap();
        let luma = depth.to_luma8();
        assert_eq!(luma.as_raw(), &vec![0, 0, 128, 255]);
    }

    #[test]
    fn test_compose_accepts_mismatched_sizes() {
        let main = ImageDescriptor::new(640, 480);
        let depth = DepthMap::new(320, 240, vec![0.25; 320 * 240]).unwrap();
        let plan = compose_depth_attachment(main, depth).unwrap();
        assert_eq!(plan.image, main);
        assert_eq!(plan.auxiliary_type, DEPTH_AUXILIARY_TYPE);
        assert_eq!(plan.description.width, 320);
    }

    #[test]
    fn test_compose_rejects_empty_main() {
        let depth = DepthMap::new(1, 1, vec![0.0]).unwrap();
        assert!(matches!(
            compose_depth_attachment(ImageDescriptor::new(0, 10), depth),
            Err(CombineError::InvalidImageDescriptor { .. })
        ));
    }

    #[test]
    fn test_compose_rejects_empty_depth() {
        let depth = DepthMap::from_luma(&GrayImage::new(0, 0));
        assert!(matches!(
            compose_depth_attachment(ImageDescriptor::new(10, 10), depth),
            Err(CombineError::InvalidDepthMap(_))
        ));
    }
}
