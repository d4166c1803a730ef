//! Container conversion configuration types

use crate::image_pipeline::compose::intrinsics::DEFAULT_HORIZONTAL_FOV_DEGREES;

pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Configuration for building a container from decoded images
#[derive(Debug, Clone)]
pub struct CombineConfig {
    /// Horizontal field of view assumed when deriving camera intrinsics
    pub horizontal_fov_degrees: f64,
    /// Quality (1-100) used when coding each image item as JPEG
    pub jpeg_quality: u8,
    /// Whether to reject images with a zero width or height before composing
    pub validate_dimensions: bool,
}

impl Default for CombineConfig {
    fn default() -> Self {
        Self {
            horizontal_fov_degrees: DEFAULT_HORIZONTAL_FOV_DEGREES,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            validate_dimensions: true,
        }
    }
}

impl CombineConfig {
    pub fn builder() -> CombineConfigBuilder {
        CombineConfigBuilder::default()
    }
}

/// Builder for CombineConfig
#[derive(Default)]
pub struct CombineConfigBuilder {
    horizontal_fov_degrees: Option<f64>,
    jpeg_quality: Option<u8>,
    validate_dimensions: Option<bool>,
}

impl CombineConfigBuilder {
    pub fn horizontal_fov_degrees(mut self, degrees: f64) -> Self {
        self.horizontal_fov_degrees = Some(degrees);
        self
    }

    /// Clamped to 1..=100.
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = Some(quality.clamp(1, 100));
        self
    }

    pub fn validate_dimensions(mut self, validate: bool) -> Self {
        self.validate_dimensions = Some(validate);
        self
    }

    pub fn build(self) -> CombineConfig {
        let default = CombineConfig::default();
        CombineConfig {
            horizontal_fov_degrees: self.horizontal_fov_degrees.unwrap_or(default.horizontal_fov_degrees),
            jpeg_quality: self.jpeg_quality.unwrap_or(default.jpeg_quality),
            validate_dimensions: self.validate_dimensions.unwrap_or(default.validate_dimensions),
        }
    }
}
