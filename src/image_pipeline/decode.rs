//! Image decoding module
//!
//! Turns encoded input files into pixel data the composers and writers can use.

mod reader;
mod standard_decoder;
pub mod types;

pub use reader::ImageDecoder;
pub use standard_decoder::StandardImageDecoder;
pub use types::{DecodedImage, HasDimensions, ImageDescriptor};
