//! HEIF container inspection.
//!
//! Parses enough of a HEIF file to recover what a writer put in it: item
//! types and sizes, camera intrinsics, auxiliary types, references and
//! entity groups. Unknown boxes and properties are skipped.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::image_pipeline::common::error::{CombineError, Result};
use crate::image_pipeline::compose::types::{GroupType, StereoGroupDescriptor};
use crate::image_pipeline::heif::boxes::{BoxIter, ByteReader, FourCC, RawBox, fourcc_str};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extent {
    pub offset: u64,
    pub length: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSummary {
    pub id: u32,
    pub item_type: String,
    pub name: String,
    pub hidden: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub intrinsics: Option<[f64; 9]>,
    pub auxiliary_type: Option<String>,
    pub construction_method: u8,
    pub extents: Vec<Extent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityGroupSummary {
    pub kind: String,
    pub group_id: u32,
    pub entity_ids: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSummary {
    pub kind: String,
    pub from_item: u32,
    pub to_items: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSummary {
    pub major_brand: String,
    pub compatible_brands: Vec<String>,
    pub primary_item: Option<u32>,
    pub items: Vec<ItemSummary>,
    pub groups: Vec<EntityGroupSummary>,
    pub references: Vec<ReferenceSummary>,
}

impl ContainerSummary {
    pub fn item(&self, id: u32) -> Option<&ItemSummary> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Position of an item in `iinf` order, i.e. its entry index.
    pub fn item_index(&self, id: u32) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    /// First stereo group, expressed in entry indices.
    pub fn stereo_group(&self) -> Option<StereoGroupDescriptor> {
        let ster = fourcc_str(&GroupType::StereoPair.fourcc());
        let (group_index, group) = self
            .groups
            .iter()
            .filter(|group| group.kind == ster)
            .enumerate()
            .next()?;

        let [left, right] = group.entity_ids.as_slice() else {
            return None;
        };
        Some(StereoGroupDescriptor {
            group_index: group_index as u32,
            group_type: GroupType::StereoPair,
            left_image_index: self.item_index(*left)? as u32,
            right_image_index: self.item_index(*right)? as u32,
        })
    }

    /// Items referencing `id` through `kind` (e.g. `auxl` depth maps).
    pub fn referencing_items(&self, kind: &str, id: u32) -> Vec<u32> {
        self.references
            .iter()
            .filter(|reference| reference.kind == kind && reference.to_items.contains(&id))
            .map(|reference| reference.from_item)
            .collect()
    }

    /// Concatenated coded bytes of an item stored in the file itself.
    pub fn item_data(&self, file: &[u8], id: u32) -> Result<Vec<u8>> {
        let item = self
            .item(id)
            .ok_or_else(|| CombineError::MalformedContainer(format!("no item with id {id}")))?;
        if item.construction_method != 0 {
            return Err(CombineError::MalformedContainer(format!(
                "item {id} uses unsupported construction method {}",
                item.construction_method
            )));
        }

        let mut data = Vec::new();
        for extent in &item.extents {
            let start = usize::try_from(extent.offset).ok();
            let end = start.zip(usize::try_from(extent.length).ok()).and_then(|(s, l)| s.checked_add(l));
            match (start, end) {
                (Some(start), Some(end)) if end <= file.len() => data.extend_from_slice(&file[start..end]),
                _ => {
                    return Err(CombineError::MalformedContainer(format!(
                        "item {id} extent {}+{} lies outside the file",
                        extent.offset, extent.length
                    )));
                }
            }
        }
        Ok(data)
    }
}

/// Reads and parses a HEIF file from disk.
pub fn inspect_file<P: AsRef<Path>>(path: P) -> Result<ContainerSummary> {
    let bytes = std::fs::read(path)?;
    inspect_container(&bytes)
}

/// Parses a HEIF file held in memory.
pub fn inspect_container(data: &[u8]) -> Result<ContainerSummary> {
    let mut ftyp = None;
    let mut meta = None;
    for raw in BoxIter::new(data) {
        let raw = raw?;
        match &raw.kind {
            b"ftyp" => ftyp = Some(raw),
            b"meta" => meta = Some(raw),
            _ => {}
        }
    }

    let ftyp = ftyp.ok_or_else(|| CombineError::MalformedContainer("missing 'ftyp' box".to_string()))?;
    let meta = meta.ok_or_else(|| CombineError::MalformedContainer("missing 'meta' box".to_string()))?;

    let (major_brand, compatible_brands) = parse_ftyp(ftyp.payload)?;
    let mut summary = ContainerSummary {
        major_brand,
        compatible_brands,
        primary_item: None,
        items: Vec::new(),
        groups: Vec::new(),
        references: Vec::new(),
    };
    parse_meta(meta, &mut summary)?;

    debug!(
        items = summary.items.len(),
        groups = summary.groups.len(),
        "Inspected container with major brand {}",
        summary.major_brand
    );
    Ok(summary)
}

fn parse_ftyp(payload: &[u8]) -> Result<(String, Vec<String>)> {
    let mut r = ByteReader::new(payload);
    let major = r.fourcc()?;
    let _minor = r.u32()?;
    let mut compatible = Vec::new();
    while r.remaining() >= 4 {
        compatible.push(fourcc_str(&r.fourcc()?));
    }
    Ok((fourcc_str(&major), compatible))
}

fn parse_meta(meta: RawBox<'_>, summary: &mut ContainerSummary) -> Result<()> {
    let mut r = ByteReader::new(meta.payload);
    r.full_box_header()?;
    let children_offset = meta.payload_offset + 4;

    let mut handler = None;
    let mut locations = Vec::new();
    let mut properties = Vec::new();
    let mut associations = Vec::new();

    for child in BoxIter::with_base(r.rest(), children_offset) {
        let child = child?;
        match &child.kind {
            b"hdlr" => handler = Some(parse_hdlr(child.payload)?),
            b"pitm" => summary.primary_item = Some(parse_pitm(child.payload)?),
            b"iinf" => summary.items = parse_iinf(child.payload)?,
            b"iloc" => locations = parse_iloc(child.payload)?,
            b"iref" => summary.references = parse_iref(child.payload)?,
            b"iprp" => (properties, associations) = parse_iprp(child.payload)?,
            b"grpl" => summary.groups = parse_grpl(child.payload)?,
            other => debug!("Skipping meta child '{}'", fourcc_str(other)),
        }
    }

    match handler {
        Some(kind) if &kind == b"pict" => {}
        Some(kind) => {
            return Err(CombineError::MalformedContainer(format!(
                "handler '{}' is not an image handler",
                fourcc_str(&kind)
            )));
        }
        None => return Err(CombineError::MalformedContainer("missing 'hdlr' box".to_string())),
    }

    for (id, construction_method, extents) in locations {
        if let Some(item) = summary.items.iter_mut().find(|item| item.id == id) {
            item.construction_method = construction_method;
            item.extents = extents;
        }
    }

    for (id, indices) in associations {
        let Some(item) = summary.items.iter_mut().find(|item| item.id == id) else {
            continue;
        };
        for index in indices {
            let property: &ParsedProperty = index
                .checked_sub(1)
                .and_then(|i| properties.get(i))
                .ok_or_else(|| {
                    CombineError::MalformedContainer(format!("item {id} references missing property {index}"))
                })?;
            match property {
                ParsedProperty::ImageSize { width, height } => {
                    item.width = Some(*width);
                    item.height = Some(*height);
                }
                ParsedProperty::CameraIntrinsics(values) => item.intrinsics = Some(*values),
                ParsedProperty::Auxiliary(kind) => item.auxiliary_type = Some(kind.clone()),
                ParsedProperty::Other => {}
            }
        }
    }

    Ok(())
}

fn parse_hdlr(payload: &[u8]) -> Result<FourCC> {
    let mut r = ByteReader::new(payload);
    r.full_box_header()?;
    let _pre_defined = r.u32()?;
    r.fourcc()
}

fn parse_pitm(payload: &[u8]) -> Result<u32> {
    let mut r = ByteReader::new(payload);
    let (version, _) = r.full_box_header()?;
    if version == 0 { Ok(u32::from(r.u16()?)) } else { r.u32() }
}

fn parse_iinf(payload: &[u8]) -> Result<Vec<ItemSummary>> {
    let mut r = ByteReader::new(payload);
    let (version, _) = r.full_box_header()?;
    let _count = if version == 0 { u32::from(r.u16()?) } else { r.u32()? };

    let mut items = Vec::new();
    for infe in BoxIter::new(r.rest()) {
        let infe = infe?;
        if &infe.kind != b"infe" {
            continue;
        }
        let mut r = ByteReader::new(infe.payload);
        let (version, flags) = r.full_box_header()?;
        if version < 2 {
            return Err(CombineError::MalformedContainer(format!("'infe' version {version} is not supported")));
        }
        let id = if version == 2 { u32::from(r.u16()?) } else { r.u32()? };
        let _protection_index = r.u16()?;
        let item_type = r.fourcc()?;
        let name = if r.remaining() > 0 { r.cstr()? } else { String::new() };

        items.push(ItemSummary {
            id,
            item_type: fourcc_str(&item_type),
            name,
            hidden: flags & 1 != 0,
            width: None,
            height: None,
            intrinsics: None,
            auxiliary_type: None,
            construction_method: 0,
            extents: Vec::new(),
        });
    }
    Ok(items)
}

type ItemLocation = (u32, u8, Vec<Extent>);

fn parse_iloc(payload: &[u8]) -> Result<Vec<ItemLocation>> {
    let mut r = ByteReader::new(payload);
    let (version, _) = r.full_box_header()?;
    if version > 2 {
        return Err(CombineError::MalformedContainer(format!("'iloc' version {version} is not supported")));
    }

    let sizes = r.u8()?;
    let (offset_size, length_size) = (sizes >> 4, sizes & 0x0F);
    let sizes = r.u8()?;
    let base_offset_size = sizes >> 4;
    let index_size = if version >= 1 { sizes & 0x0F } else { 0 };
    let count = if version < 2 { u32::from(r.u16()?) } else { r.u32()? };

    // Counts come from the file; each entry takes at least six bytes.
    let mut locations = Vec::with_capacity((count as usize).min(r.remaining() / 6));
    for _ in 0..count {
        let id = if version < 2 { u32::from(r.u16()?) } else { r.u32()? };
        let construction_method = if version >= 1 { (r.u16()? & 0x0F) as u8 } else { 0 };
        let _data_reference_index = r.u16()?;
        let base_offset = r.sized(base_offset_size)?;
        let extent_count = r.u16()?;

        let mut extents = Vec::new();
        for _ in 0..extent_count {
            if index_size > 0 {
                r.sized(index_size)?;
            }
            let offset = r.sized(offset_size)?;
            let length = r.sized(length_size)?;
            let offset = base_offset.checked_add(offset).ok_or_else(|| {
                CombineError::MalformedContainer(format!("item {id} offset overflows"))
            })?;
            extents.push(Extent { offset, length });
        }
        locations.push((id, construction_method, extents));
    }
    Ok(locations)
}

fn parse_iref(payload: &[u8]) -> Result<Vec<ReferenceSummary>> {
    let mut r = ByteReader::new(payload);
    let (version, _) = r.full_box_header()?;

    let mut references = Vec::new();
    for reference in BoxIter::new(r.rest()) {
        let reference = reference?;
        let mut r = ByteReader::new(reference.payload);
        let read_id = |r: &mut ByteReader<'_>| -> Result<u32> {
            if version == 0 { Ok(u32::from(r.u16()?)) } else { r.u32() }
        };
        let from_item = read_id(&mut r)?;
        let count = r.u16()?;
        let to_items = (0..count).map(|_| read_id(&mut r)).collect::<Result<Vec<_>>>()?;
        references.push(ReferenceSummary {
            kind: fourcc_str(&reference.kind),
            from_item,
            to_items,
        });
    }
    Ok(references)
}

#[derive(Debug)]
enum ParsedProperty {
    ImageSize { width: u32, height: u32 },
    CameraIntrinsics([f64; 9]),
    Auxiliary(String),
    Other,
}

type Associations = Vec<(u32, Vec<usize>)>;

fn parse_iprp(payload: &[u8]) -> Result<(Vec<ParsedProperty>, Associations)> {
    let mut properties = Vec::new();
    let mut associations = Vec::new();

    for child in BoxIter::new(payload) {
        let child = child?;
        match &child.kind {
            b"ipco" => {
                for property in BoxIter::new(child.payload) {
                    properties.push(parse_property(property?)?);
                }
            }
            b"ipma" => associations.extend(parse_ipma(child.payload)?),
            _ => {}
        }
    }
    Ok((properties, associations))
}

fn parse_property(property: RawBox<'_>) -> Result<ParsedProperty> {
    let mut r = ByteReader::new(property.payload);
    Ok(match &property.kind {
        b"ispe" => {
            r.full_box_header()?;
            ParsedProperty::ImageSize { width: r.u32()?, height: r.u32()? }
        }
        b"cmin" => {
            r.full_box_header()?;
            let mut values = [0.0; 9];
            for value in &mut values {
                *value = r.f64()?;
            }
            ParsedProperty::CameraIntrinsics(values)
        }
        b"auxC" => {
            r.full_box_header()?;
            ParsedProperty::Auxiliary(r.cstr()?)
        }
        _ => ParsedProperty::Other,
    })
}

fn parse_ipma(payload: &[u8]) -> Result<Associations> {
    let mut r = ByteReader::new(payload);
    let (version, flags) = r.full_box_header()?;
    let count = r.u32()?;

    let mut associations = Vec::with_capacity((count as usize).min(r.remaining() / 3));
    for _ in 0..count {
        let id = if version < 1 { u32::from(r.u16()?) } else { r.u32()? };
        let association_count = r.u8()?;
        let mut indices = Vec::new();
        for _ in 0..association_count {
            let index = if flags & 1 != 0 {
                usize::from(r.u16()? & 0x7FFF)
            } else {
                usize::from(r.u8()? & 0x7F)
            };
            indices.push(index);
        }
        associations.push((id, indices));
    }
    Ok(associations)
}

fn parse_grpl(payload: &[u8]) -> Result<Vec<EntityGroupSummary>> {
    let mut groups = Vec::new();
    for group in BoxIter::new(payload) {
        let group = group?;
        let mut r = ByteReader::new(group.payload);
        r.full_box_header()?;
        let group_id = r.u32()?;
        let count = r.u32()?;
        let entity_ids = (0..count).map(|_| r.u32()).collect::<Result<Vec<_>>>()?;
        groups.push(EntityGroupSummary {
            kind: fourcc_str(&group.kind),
            group_id,
            entity_ids,
        });
    }
    Ok(groups)
}
