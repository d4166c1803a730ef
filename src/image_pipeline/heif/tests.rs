#[cfg(test)]
mod tests {
    use std::io::Write;

    use image::{DynamicImage, GrayImage, Rgb, RgbImage};

    use crate::image_pipeline::common::error::CombineError;
    use crate::image_pipeline::compose::{
        DEPTH_AUXILIARY_TYPE, DepthMap, compose_depth_attachment, compose_stereo_pair,
    };
    use crate::image_pipeline::decode::{DecodedImage, ImageDecoder, StandardImageDecoder};
    use crate::image_pipeline::heif::boxes::BoxWriter;
    use crate::image_pipeline::heif::{
        CombineConfig, ContainerWriter, HeifContainerWriter, encode_stereo_pair, encode_with_depth,
        inspect_container, inspect_file,
    };

    fn solid(width: u32, height: u32, color: [u8; 3]) -> DecodedImage {
        DecodedImage::new(DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color))))
    }

    #[test]
    fn test_stereo_round_trip_keeps_group_and_roles() {
        let plan = compose_stereo_pair(solid(64, 48, [200, 10, 10]), solid(64, 48, [10, 10, 200]), 55.0).unwrap();
        let bytes = encode_stereo_pair(&plan, 85).unwrap();
        let summary = inspect_container(&bytes).unwrap();

        assert_eq!(summary.major_brand, "mif1");
        assert!(summary.compatible_brands.contains(&"jpeg".to_string()));
        assert_eq!(summary.primary_item, Some(1));
        assert_eq!(summary.items.len(), 2);
        assert_eq!(summary.stereo_group(), Some(plan.group));

        let ster = &summary.groups[0];
        assert_eq!(ster.kind, "ster");
        assert_eq!(ster.entity_ids, vec![1, 2]);
        assert!(!ster.entity_ids.contains(&ster.group_id));

        assert_eq!(summary.items[0].name, "Left");
        assert_eq!(summary.items[1].name, "Right");
        for item in &summary.items {
            assert_eq!(item.item_type, "jpeg");
            assert!(!item.hidden);
            assert_eq!((item.width, item.height), (Some(64), Some(48)));
            assert_eq!(item.intrinsics, Some(plan.entries[0].metadata.heif.camera_model.intrinsics));
        }
    }

    #[test]
    fn test_items_decode_back_in_entry_order() {
        let plan = compose_stereo_pair(solid(32, 16, [250, 0, 0]), solid(16, 32, [0, 0, 250]), 55.0).unwrap();
        let bytes = encode_stereo_pair(&plan, 95).unwrap();
        let summary = inspect_container(&bytes).unwrap();

        let left = StandardImageDecoder.decode(&summary.item_data(&bytes, 1).unwrap()).unwrap();
        let right = StandardImageDecoder.decode(&summary.item_data(&bytes, 2).unwrap()).unwrap();
        assert_eq!((left.pixels.width(), left.pixels.height()), (32, 16));
        assert_eq!((right.pixels.width(), right.pixels.height()), (16, 32));

        let left_pixel = left.pixels.to_rgb8().get_pixel(8, 8).0;
        let right_pixel = right.pixels.to_rgb8().get_pixel(8, 8).0;
        assert!(left_pixel[0] > 200 && left_pixel[2] < 50);
        assert!(right_pixel[2] > 200 && right_pixel[0] < 50);
    }

    #[test]
    fn test_mismatched_sizes_share_left_intrinsics() {
        let plan = compose_stereo_pair(solid(40, 20, [0; 3]), solid(80, 40, [0; 3]), 90.0).unwrap();
        let bytes = encode_stereo_pair(&plan, 80).unwrap();
        let summary = inspect_container(&bytes).unwrap();

        assert_eq!(summary.items[1].width, Some(80));
        let intrinsics = summary.items[1].intrinsics.unwrap();
        assert!((intrinsics[0] - 20.0).abs() < 1e-9);
        assert_eq!(intrinsics[2], 20.0);
        assert_eq!(intrinsics[5], 10.0);
        assert_eq!(summary.items[0].intrinsics, summary.items[1].intrinsics);
    }

    #[test]
    fn test_depth_attachment_layout() {
        let main = solid(20, 10, [90, 90, 90]);
        let depth = DepthMap::from_luma(&GrayImage::from_fn(10, 5, |x, _| image::Luma([(x * 25) as u8])));
        let plan = compose_depth_attachment(main, depth).unwrap();
        let bytes = encode_with_depth(&plan, 90).unwrap();
        let summary = inspect_container(&bytes).unwrap();

        assert_eq!(summary.primary_item, Some(1));
        assert!(summary.groups.is_empty());
        let depth_item = summary.item(2).unwrap();
        assert!(depth_item.hidden);
        assert_eq!(depth_item.auxiliary_type.as_deref(), Some(DEPTH_AUXILIARY_TYPE));
        assert_eq!((depth_item.width, depth_item.height), (Some(10), Some(5)));
        assert_eq!(summary.referencing_items("auxl", 1), vec![2]);
        assert_eq!(summary.item(1).unwrap().auxiliary_type, None);

        let decoded = StandardImageDecoder.decode(&summary.item_data(&bytes, 2).unwrap()).unwrap();
        assert_eq!(decoded.pixels.width(), 10);
    }

    #[test]
    fn test_writer_writes_to_file() {
        let plan = compose_stereo_pair(solid(8, 8, [1, 2, 3]), solid(8, 8, [3, 2, 1]), 55.0).unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        HeifContainerWriter
            .write_stereo_pair(&plan, file.as_file_mut(), &CombineConfig::default())
            .unwrap();
        file.flush().unwrap();

        let bytes = std::fs::read(file.path()).unwrap();
        assert_eq!(&bytes[4..8], b"ftyp");
        assert_eq!(inspect_container(&bytes).unwrap().stereo_group(), Some(plan.group));
    }

    #[test]
    fn test_inspect_file_reads_from_disk() {
        let plan = compose_stereo_pair(solid(8, 8, [1, 2, 3]), solid(8, 8, [3, 2, 1]), 55.0).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pair.heic");
        std::fs::write(&path, encode_stereo_pair(&plan, 90).unwrap()).unwrap();

        assert_eq!(inspect_file(&path).unwrap().stereo_group(), Some(plan.group));
        assert!(matches!(inspect_file(dir.path().join("missing.heic")), Err(CombineError::Io(_))));
    }

    #[test]
    fn test_inconsistent_entry_metadata_rejected() {
        let mut plan = compose_stereo_pair(solid(8, 8, [0; 3]), solid(8, 8, [0; 3]), 55.0).unwrap();
        plan.entries[1].metadata.groups.group_index = 7;
        assert!(matches!(encode_stereo_pair(&plan, 90), Err(CombineError::WriteFailed(_))));
    }

    #[test]
    fn test_inspect_rejects_non_heif() {
        assert!(matches!(inspect_container(b""), Err(CombineError::MalformedContainer(_))));
        assert!(matches!(
            inspect_container(b"\x00\x00\x00\x08free"),
            Err(CombineError::MalformedContainer(_))
        ));
    }

    #[test]
    fn test_inspect_rejects_truncated_file() {
        let plan = compose_stereo_pair(solid(8, 8, [0; 3]), solid(8, 8, [0; 3]), 55.0).unwrap();
        let bytes = encode_stereo_pair(&plan, 90).unwrap();
        let result = inspect_container(&bytes[..bytes.len() / 2]);
        assert!(matches!(result, Err(CombineError::MalformedContainer(_))));
    }

    #[test]
    fn test_tampered_group_indices_rejected() {
        let mut plan = compose_stereo_pair(solid(8, 8, [0; 3]), solid(8, 8, [0; 3]), 55.0).unwrap();
        plan.group.left_image_index = 2;
        for entry in &mut plan.entries {
            entry.metadata.groups = plan.group;
        }

        assert!(matches!(encode_stereo_pair(&plan, 90), Err(CombineError::WriteFailed(_))));
        assert_eq!(plan.left().role, plan.entries[0].role);
    }

    /// `ftyp` plus a `meta` holding a picture handler and whatever `children` writes.
    fn container_with_meta<F>(children: F) -> Vec<u8>
    where
        F: FnOnce(&mut BoxWriter) -> crate::image_pipeline::common::error::Result<()>,
    {
        let mut file = BoxWriter::new();
        file.write_box(b"ftyp", |w| {
            w.fourcc(b"mif1");
            w.u32(0);
            w.fourcc(b"mif1");
            Ok(())
        })
        .unwrap();
        file.write_full_box(b"meta", 0, 0, |w| {
            w.write_full_box(b"hdlr", 0, 0, |w| {
                w.u32(0);
                w.fourcc(b"pict");
                w.bytes(&[0; 12]);
                w.cstr("");
                Ok(())
            })?;
            children(w)
        })
        .unwrap();
        file.into_inner()
    }

    #[test]
    fn test_inspect_rejects_huge_ipma_count() {
        let bytes = container_with_meta(|w| {
            w.write_box(b"iprp", |w| {
                w.write_box(b"ipco", |_| Ok(()))?;
                w.write_full_box(b"ipma", 0, 0, |w| {
                    w.u32(u32::MAX);
                    Ok(())
                })
            })
        });
        assert!(matches!(inspect_container(&bytes), Err(CombineError::MalformedContainer(_))));
    }

    #[test]
    fn test_inspect_rejects_huge_iloc_count() {
        let bytes = container_with_meta(|w| {
            w.write_full_box(b"iloc", 2, 0, |w| {
                w.u8(0x44);
                w.u8(0x00);
                w.u32(u32::MAX);
                w.u32(1);
                Ok(())
            })
        });
        assert!(matches!(inspect_container(&bytes), Err(CombineError::MalformedContainer(_))));
    }
}
