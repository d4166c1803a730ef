//! In-memory HEIF file layout and its serialization.
//!
//! Offsets in `iloc` are absolute file offsets into `mdat`. The `meta` box
//! has a fixed width regardless of offset values, so it is built once to
//! measure it and once more with the real offsets.

use tracing::debug;
use crate::image_pipeline::common::error::{CombineError, Result};
use crate::image_pipeline::heif::boxes::{BoxWriter, FourCC};

pub const MAJOR_BRAND: FourCC = *b"mif1";
pub const COMPATIBLE_BRANDS: [FourCC; 2] = [*b"mif1", *b"jpeg"];
pub const JPEG_ITEM_TYPE: FourCC = *b"jpeg";

/// Largest 1-based property index an `ipma` entry can hold in its 7-bit form.
const MAX_PROPERTY_INDEX: usize = 0x7F;

/// Serialized property boxes, deduplicated by content.
#[derive(Debug, Default)]
pub struct PropertyTable {
    boxes: Vec<Vec<u8>>,
}

impl PropertyTable {
    /// Returns the 1-based index of `property`, adding it if unseen.
    pub fn intern(&mut self, property: Vec<u8>) -> Result<u8> {
        let position = match self.boxes.iter().position(|existing| *existing == property) {
            Some(position) => position,
            None => {
                self.boxes.push(property);
                self.boxes.len() - 1
            }
        };

        let index = position + 1;
        if index > MAX_PROPERTY_INDEX {
            return Err(CombineError::WriteFailed(format!("too many item properties ({index})")));
        }
        Ok(index as u8)
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }
}

pub fn ispe_property(width: u32, height: u32) -> Result<Vec<u8>> {
    let mut w = BoxWriter::new();
    w.write_full_box(b"ispe", 0, 0, |w| {
        w.u32(width);
        w.u32(height);
        Ok(())
    })?;
    Ok(w.into_inner())
}

/// Camera-model property: nine big-endian f64 values, row-major.
pub fn cmin_property(intrinsics: &[f64; 9]) -> Result<Vec<u8>> {
    let mut w = BoxWriter::new();
    w.write_full_box(b"cmin", 0, 0, |w| {
        for value in intrinsics {
            w.f64(*value);
        }
        Ok(())
    })?;
    Ok(w.into_inner())
}

pub fn auxc_property(auxiliary_type: &str) -> Result<Vec<u8>> {
    let mut w = BoxWriter::new();
    w.write_full_box(b"auxC", 0, 0, |w| {
        w.cstr(auxiliary_type);
        Ok(())
    })?;
    Ok(w.into_inner())
}

#[derive(Debug)]
pub struct PropertyAssociation {
    pub index: u8,
    pub essential: bool,
}

#[derive(Debug)]
pub struct ItemLayout {
    pub id: u16,
    pub item_type: FourCC,
    pub name: &'static str,
    pub hidden: bool,
    pub payload: Vec<u8>,
    pub properties: Vec<PropertyAssociation>,
}

#[derive(Debug)]
pub struct EntityGroup {
    pub kind: FourCC,
    pub group_id: u32,
    pub entity_ids: Vec<u32>,
}

#[derive(Debug)]
pub struct ItemReference {
    pub kind: FourCC,
    pub from_item: u16,
    pub to_items: Vec<u16>,
}

#[derive(Debug, Default)]
pub struct ContainerLayout {
    pub primary_item: u16,
    pub items: Vec<ItemLayout>,
    pub properties: PropertyTable,
    pub groups: Vec<EntityGroup>,
    pub references: Vec<ItemReference>,
}

impl ContainerLayout {
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let ftyp = self.ftyp()?;
        let measured = self.meta(0)?;
        let data_start = ftyp.len() + measured.len() + 8;
        let data_start = u32::try_from(data_start)
            .map_err(|_| CombineError::WriteFailed("metadata exceeds 4 GiB".to_string()))?;
        let meta = self.meta(data_start)?;
        debug_assert_eq!(measured.len(), meta.len());

        let mut file = BoxWriter::new();
        file.bytes(&ftyp);
        file.bytes(&meta);
        file.write_box(b"mdat", |w| {
            for item in &self.items {
                w.bytes(&item.payload);
            }
            Ok(())
        })?;

        let bytes = file.into_inner();
        debug!(
            items = self.items.len(),
            properties = self.properties.len(),
            "Serialized container: {} bytes",
            bytes.len()
        );
        Ok(bytes)
    }

    fn ftyp(&self) -> Result<Vec<u8>> {
        let mut w = BoxWriter::new();
        w.write_box(b"ftyp", |w| {
            w.fourcc(&MAJOR_BRAND);
            w.u32(0);
            for brand in &COMPATIBLE_BRANDS {
                w.fourcc(brand);
            }
            Ok(())
        })?;
        Ok(w.into_inner())
    }

    fn meta(&self, data_start: u32) -> Result<Vec<u8>> {
        let mut w = BoxWriter::new();
        w.write_full_box(b"meta", 0, 0, |w| {
            w.write_full_box(b"hdlr", 0, 0, |w| {
                w.u32(0);
                w.fourcc(b"pict");
                for _ in 0..3 {
                    w.u32(0);
                }
                w.cstr("");
                Ok(())
            })?;

            w.write_full_box(b"pitm", 0, 0, |w| {
                w.u16(self.primary_item);
                Ok(())
            })?;

            self.write_iloc(w, data_start)?;
            self.write_iinf(w)?;
            if !self.references.is_empty() {
                self.write_iref(w)?;
            }
            self.write_iprp(w)?;
            if !self.groups.is_empty() {
                self.write_grpl(w)?;
            }
            Ok(())
        })?;
        Ok(w.into_inner())
    }

    fn write_iloc(&self, w: &mut BoxWriter, data_start: u32) -> Result<()> {
        let item_count = count_u16(self.items.len(), "items")?;
        w.write_full_box(b"iloc", 0, 0, |w| {
            // offset_size = 4, length_size = 4, base_offset_size = 0
            w.u8(0x44);
            w.u8(0x00);
            w.u16(item_count);

            let mut offset = data_start;
            for item in &self.items {
                let length = u32::try_from(item.payload.len()).map_err(|_| {
                    CombineError::WriteFailed(format!("item {} exceeds 4 GiB", item.id))
                })?;
                w.u16(item.id);
                w.u16(0);
                w.u16(1);
                w.u32(offset);
                w.u32(length);
                offset = offset.checked_add(length).ok_or_else(|| {
                    CombineError::WriteFailed("media data exceeds 4 GiB".to_string())
                })?;
            }
            Ok(())
        })
    }

    fn write_iinf(&self, w: &mut BoxWriter) -> Result<()> {
        let item_count = count_u16(self.items.len(), "items")?;
        w.write_full_box(b"iinf", 0, 0, |w| {
            w.u16(item_count);
            for item in &self.items {
                let flags = if item.hidden { 1 } else { 0 };
                w.write_full_box(b"infe", 2, flags, |w| {
                    w.u16(item.id);
                    w.u16(0);
                    w.fourcc(&item.item_type);
                    w.cstr(item.name);
                    Ok(())
                })?;
            }
            Ok(())
        })
    }

    fn write_iref(&self, w: &mut BoxWriter) -> Result<()> {
        w.write_full_box(b"iref", 0, 0, |w| {
            for reference in &self.references {
                let count = count_u16(reference.to_items.len(), "references")?;
                w.write_box(&reference.kind, |w| {
                    w.u16(reference.from_item);
                    w.u16(count);
                    for to in &reference.to_items {
                        w.u16(*to);
                    }
                    Ok(())
                })?;
            }
            Ok(())
        })
    }

    fn write_iprp(&self, w: &mut BoxWriter) -> Result<()> {
        w.write_box(b"iprp", |w| {
            w.write_box(b"ipco", |w| {
                for property in &self.properties.boxes {
                    w.bytes(property);
                }
                Ok(())
            })?;

            let associated: Vec<&ItemLayout> =
                self.items.iter().filter(|item| !item.properties.is_empty()).collect();
            w.write_full_box(b"ipma", 0, 0, |w| {
                w.u32(associated.len() as u32);
                for item in associated {
                    let count = u8::try_from(item.properties.len()).map_err(|_| {
                        CombineError::WriteFailed(format!("item {} has too many properties", item.id))
                    })?;
                    w.u16(item.id);
                    w.u8(count);
                    for association in &item.properties {
                        let essential = if association.essential { 0x80 } else { 0 };
                        w.u8(essential | association.index);
                    }
                }
                Ok(())
            })
        })
    }

    fn write_grpl(&self, w: &mut BoxWriter) -> Result<()> {
        w.write_box(b"grpl", |w| {
            for group in &self.groups {
                w.write_full_box(&group.kind, 0, 0, |w| {
                    w.u32(group.group_id);
                    w.u32(group.entity_ids.len() as u32);
                    for id in &group.entity_ids {
                        w.u32(*id);
                    }
                    Ok(())
                })?;
            }
            Ok(())
        })
    }
}

fn count_u16(count: usize, what: &str) -> Result<u16> {
    u16::try_from(count).map_err(|_| CombineError::WriteFailed(format!("too many {what} ({count})")))
}
