use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::decode::types::DecodedImage;

pub trait ImageDecoder {
    fn decode(&self, data: &[u8]) -> Result<DecodedImage>;
}
