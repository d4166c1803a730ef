//! Decoded image types

use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Pixel dimensions of an image, as reported by a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    pub pixel_width: u32,
    pub pixel_height: u32,
}

impl ImageDescriptor {
    pub fn new(pixel_width: u32, pixel_height: u32) -> Self {
        Self { pixel_width, pixel_height }
    }
}

/// Anything the composers can read a pixel size from.
pub trait HasDimensions {
    fn descriptor(&self) -> ImageDescriptor;
}

impl HasDimensions for ImageDescriptor {
    fn descriptor(&self) -> ImageDescriptor {
        *self
    }
}

/// A fully decoded image, ready to be re-encoded into a container item.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub pixels: DynamicImage,
}

impl DecodedImage {
    pub fn new(pixels: DynamicImage) -> Self {
        Self { pixels }
    }
}

impl HasDimensions for DecodedImage {
    fn descriptor(&self) -> ImageDescriptor {
        ImageDescriptor::new(self.pixels.width(), self.pixels.height())
    }
}

impl<T: HasDimensions + ?Sized> HasDimensions for &T {
    fn descriptor(&self) -> ImageDescriptor {
        (**self).descriptor()
    }
}
