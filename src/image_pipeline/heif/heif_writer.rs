//! HEIF container writer.
//!
//! Each image is coded as a JPEG item. Stereo pairs get an `ster` entity
//! group and a shared camera-model property; depth maps become hidden
//! auxiliary items referencing their main image through `auxl`.

use std::borrow::Borrow;
use std::io::Write;

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, ExtendedColorType};
use tracing::debug;
use crate::image_pipeline::common::error::{CombineError, Result};
use crate::image_pipeline::compose::{ContainerWritePlan, DepthAttachmentPlan, EntryRole, StereoGroupDescriptor};
use crate::image_pipeline::decode::types::{DecodedImage, HasDimensions};
use crate::image_pipeline::heif::layout::{
    ContainerLayout, EntityGroup, ItemLayout, ItemReference, JPEG_ITEM_TYPE, PropertyAssociation,
    auxc_property, cmin_property, ispe_property,
};
use crate::image_pipeline::heif::types::CombineConfig;
use crate::image_pipeline::heif::writer::ContainerWriter;

pub struct HeifContainerWriter;

impl ContainerWriter for HeifContainerWriter {
    fn write_stereo_pair(&self, plan: &ContainerWritePlan<DecodedImage>, output: &mut dyn Write, config: &CombineConfig) -> Result<()> {
        let bytes = encode_stereo_pair(plan, config.jpeg_quality)?;
        output.write_all(&bytes).map_err(|e| CombineError::WriteFailed(e.to_string()))?;
        debug!("HEIF stereo pair written, {} bytes", bytes.len());
        Ok(())
    }

    fn write_with_depth(&self, plan: &DepthAttachmentPlan<DecodedImage>, output: &mut dyn Write, config: &CombineConfig) -> Result<()> {
        let bytes = encode_with_depth(plan, config.jpeg_quality)?;
        output.write_all(&bytes).map_err(|e| CombineError::WriteFailed(e.to_string()))?;
        debug!("HEIF image with depth written, {} bytes", bytes.len());
        Ok(())
    }
}

/// Entry index `i` is stored as item `i + 1`.
pub fn item_id_for_entry(index: u32) -> u16 {
    (index + 1) as u16
}

/// Serializes a stereo plan into a complete HEIF file.
pub fn encode_stereo_pair<I: Borrow<DecodedImage>>(plan: &ContainerWritePlan<I>, jpeg_quality: u8) -> Result<Vec<u8>> {
    if plan.group != StereoGroupDescriptor::stereo_pair() {
        return Err(CombineError::WriteFailed(format!(
            "plan group {:?} does not pair entry 0 with entry 1",
            plan.group
        )));
    }

    let mut layout = ContainerLayout {
        primary_item: item_id_for_entry(plan.group.left_image_index),
        ..ContainerLayout::default()
    };

    for (index, entry) in plan.entries.iter().enumerate() {
        if entry.metadata.groups != plan.group {
            return Err(CombineError::WriteFailed(format!(
                "entry {index} metadata names a different group than the plan"
            )));
        }

        let image: &DecodedImage = entry.image.borrow();
        let descriptor = image.descriptor();
        let ispe = layout.properties.intern(ispe_property(descriptor.pixel_width, descriptor.pixel_height)?)?;
        let cmin = layout.properties.intern(cmin_property(&entry.metadata.heif.camera_model.intrinsics)?)?;

        layout.items.push(ItemLayout {
            id: item_id_for_entry(index as u32),
            item_type: JPEG_ITEM_TYPE,
            name: match entry.role {
                EntryRole::Left => "Left",
                EntryRole::Right => "Right",
            },
            hidden: false,
            payload: encode_jpeg(&image.pixels, jpeg_quality)?,
            properties: vec![
                PropertyAssociation { index: ispe, essential: false },
                PropertyAssociation { index: cmin, essential: false },
            ],
        });
    }

    let group_id = layout.items.len() as u32 + 1 + plan.group.group_index;
    layout.groups.push(EntityGroup {
        kind: plan.group.group_type.fourcc(),
        group_id,
        entity_ids: vec![
            u32::from(item_id_for_entry(plan.group.left_image_index)),
            u32::from(item_id_for_entry(plan.group.right_image_index)),
        ],
    });

    layout.serialize()
}

/// Serializes a main image and its depth map as an auxiliary item.
pub fn encode_with_depth<I: Borrow<DecodedImage>>(plan: &DepthAttachmentPlan<I>, jpeg_quality: u8) -> Result<Vec<u8>> {
    const MAIN_ITEM: u16 = 1;
    const DEPTH_ITEM: u16 = 2;

    let mut layout = ContainerLayout {
        primary_item: MAIN_ITEM,
        ..ContainerLayout::default()
    };

    let image: &DecodedImage = plan.image.borrow();
    let descriptor = image.descriptor();
    let main_ispe = layout.properties.intern(ispe_property(descriptor.pixel_width, descriptor.pixel_height)?)?;
    layout.items.push(ItemLayout {
        id: MAIN_ITEM,
        item_type: JPEG_ITEM_TYPE,
        name: "Image",
        hidden: false,
        payload: encode_jpeg(&image.pixels, jpeg_quality)?,
        properties: vec![PropertyAssociation { index: main_ispe, essential: false }],
    });

    let depth_ispe = layout.properties.intern(ispe_property(plan.description.width, plan.description.height)?)?;
    let aux = layout.properties.intern(auxc_property(plan.auxiliary_type)?)?;
    let depth_pixels = DynamicImage::ImageLuma8(plan.depth.to_luma8());
    layout.items.push(ItemLayout {
        id: DEPTH_ITEM,
        item_type: JPEG_ITEM_TYPE,
        name: "Depth",
        hidden: true,
        payload: encode_jpeg(&depth_pixels, jpeg_quality)?,
        properties: vec![
            PropertyAssociation { index: depth_ispe, essential: false },
            PropertyAssociation { index: aux, essential: true },
        ],
    });

    layout.references.push(ItemReference {
        kind: *b"auxl",
        from_item: DEPTH_ITEM,
        to_items: vec![MAIN_ITEM],
    });

    layout.serialize()
}

/// Baseline JPEG coding of one item. Grayscale sources stay single-channel;
/// everything else is flattened to 8-bit RGB.
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        let result = match image.color() {
            ColorType::L8 | ColorType::L16 | ColorType::La8 | ColorType::La16 => {
                let luma = image.to_luma8();
                encoder.encode(luma.as_raw(), luma.width(), luma.height(), ExtendedColorType::L8)
            }
            _ => {
                let rgb = image.to_rgb8();
                encoder.encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
            }
        };
        result.map_err(|e| CombineError::WriteFailed(format!("JPEG encoding failed: {e}")))?;
    }
    Ok(buffer)
}
