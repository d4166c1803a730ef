//! HEIF container module
//!
//! Writes and inspects ISO/IEC 23008-12 image containers holding stereo
//! pairs and depth auxiliary images.

pub mod boxes;
mod heif_writer;
mod inspect;
mod layout;
pub mod types;
mod writer;

#[cfg(test)]
mod tests;

pub use heif_writer::{HeifContainerWriter, encode_jpeg, encode_stereo_pair, encode_with_depth, item_id_for_entry};
pub use inspect::{ContainerSummary, EntityGroupSummary, Extent, ItemSummary, ReferenceSummary, inspect_container, inspect_file};
pub use types::{CombineConfig, CombineConfigBuilder, DEFAULT_JPEG_QUALITY};
pub use writer::ContainerWriter;
