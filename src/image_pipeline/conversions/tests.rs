#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};
    use std::sync::{Arc, Mutex};

    use image::{DynamicImage, GrayImage, ImageFormat, Luma, RgbImage, RgbaImage};

    use crate::image_pipeline::common::error::{CombineError, Result};
    use crate::image_pipeline::compose::{ContainerWritePlan, DepthAttachmentPlan, EntryRole};
    use crate::image_pipeline::conversions::{DepthAttachPipeline, StereoPairPipeline, StereoSynthesisPipeline};
    use crate::image_pipeline::decode::{DecodedImage, HasDimensions, ImageDecoder, ImageDescriptor};
    use crate::image_pipeline::heif::{CombineConfig, ContainerWriter, inspect_container};
    use crate::image_pipeline::synthesis::SynthesisConfig;

    /// Decodes `b"WxH"` into a blank image of that size; `b"fail"` fails.
    struct MockDecoder;

    impl ImageDecoder for MockDecoder {
        fn decode(&self, data: &[u8]) -> Result<DecodedImage> {
            let text = std::str::from_utf8(data).unwrap_or_default();
            let (w, h) = text
                .split_once('x')
                .and_then(|(w, h)| Some((w.parse::<u32>().ok()?, h.parse::<u32>().ok()?)))
                .ok_or_else(|| CombineError::ImageLoadFailed("Mock decode error".to_string()))?;
            Ok(DecodedImage::new(DynamicImage::ImageRgb8(RgbImage::new(w, h))))
        }
    }

    #[derive(Default)]
    struct MockWriter {
        should_fail: bool,
        stereo_plans: Arc<Mutex<Vec<ContainerWritePlan>>>,
        depth_plans: Arc<Mutex<Vec<(ImageDescriptor, u32, u32)>>>,
    }

    impl ContainerWriter for MockWriter {
        fn write_stereo_pair(&self, plan: &ContainerWritePlan<DecodedImage>, output: &mut dyn Write, _config: &CombineConfig) -> Result<()> {
            if self.should_fail {
                return Err(CombineError::WriteFailed("Mock write error".to_string()));
            }
            self.stereo_plans.lock().unwrap().push(plan.to_descriptors());
            output.write_all(b"stereo")?;
            Ok(())
        }

        fn write_with_depth(&self, plan: &DepthAttachmentPlan<DecodedImage>, output: &mut dyn Write, _config: &CombineConfig) -> Result<()> {
            if self.should_fail {
                return Err(CombineError::WriteFailed("Mock write error".to_string()));
            }
            self.depth_plans.lock().unwrap().push((
                plan.image.descriptor(),
                plan.depth.width(),
                plan.depth.height(),
            ));
            output.write_all(b"depth")?;
            Ok(())
        }
    }

    fn png(image: DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        bytes
    }

    #[test]
    fn test_successful_combination() {
        let writer = MockWriter::default();
        let plans = writer.stereo_plans.clone();
        let pipeline = StereoPairPipeline::with_custom(MockDecoder, writer, CombineConfig::default());

        let mut output = Cursor::new(Vec::new());
        let plan = pipeline.convert(b"4032x8", b"4032x8", &mut output).unwrap();

        assert_eq!(output.into_inner(), b"stereo");
        assert_eq!(plans.lock().unwrap().len(), 1);
        assert_eq!(plans.lock().unwrap()[0], plan);
        assert_eq!(plan.entries[0].role, EntryRole::Left);
        let focal = plan.left().metadata.intrinsics().focal_length_pixels();
        assert!((focal - 3872.70).abs() < 0.01);
    }

    #[test]
    fn test_fov_comes_from_config() {
        let config = CombineConfig::builder().horizontal_fov_degrees(90.0).build();
        let pipeline = StereoPairPipeline::with_custom(MockDecoder, MockWriter::default(), config);

        let plan = pipeline.convert(b"640x480", b"320x240", &mut Vec::new()).unwrap();
        let intrinsics = plan.right().metadata.intrinsics();
        assert!((intrinsics.focal_length_pixels() - 320.0).abs() < 1e-9);
        assert_eq!(plan.right().image, ImageDescriptor::new(320, 240));
    }

    /// Records the name of every span opened while installed.
    struct SpanNames(Arc<Mutex<Vec<&'static str>>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for SpanNames {
        fn on_new_span(&self, attrs: &tracing::span::Attributes<'_>, _id: &tracing::span::Id, _ctx: tracing_subscriber::layer::Context<'_, S>) {
            self.0.lock().unwrap().push(attrs.metadata().name());
        }
    }

    #[test]
    fn test_stage_spans_are_named() {
        use tracing_subscriber::layer::SubscriberExt;

        let names = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(SpanNames(names.clone()));
        let pipeline = StereoPairPipeline::with_custom(MockDecoder, MockWriter::default(), CombineConfig::default());

        tracing::subscriber::with_default(subscriber, || {
            pipeline.convert(b"10x10", b"10x10", &mut Vec::new()).unwrap();
        });

        let names = names.lock().unwrap();
        for expected in ["decode_left", "decode_right", "compose", "encode_container"] {
            assert!(names.contains(&expected), "missing span {expected}: {names:?}");
        }
    }

    #[test]
    fn test_left_decoder_failure() {
        let writer = MockWriter::default();
        let plans = writer.stereo_plans.clone();
        let pipeline = StereoPairPipeline::with_custom(MockDecoder, writer, CombineConfig::default());

        let result = pipeline.convert(b"fail", b"10x10", &mut Vec::new());

        match result {
            Err(CombineError::ImageLoadFailed(message)) => assert!(message.contains("left image")),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(plans.lock().unwrap().is_empty());
    }

    #[test]
    fn test_right_decoder_failure() {
        let pipeline = StereoPairPipeline::with_custom(MockDecoder, MockWriter::default(), CombineConfig::default());
        let result = pipeline.convert(b"10x10", b"fail", &mut Vec::new());
        match result {
            Err(CombineError::ImageLoadFailed(message)) => assert!(message.contains("right image")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_writer_failure() {
        let writer = MockWriter { should_fail: true, ..MockWriter::default() };
        let pipeline = StereoPairPipeline::with_custom(MockDecoder, writer, CombineConfig::default());

        let result = pipeline.convert(b"10x10", b"10x10", &mut Vec::new());
        assert!(matches!(result, Err(CombineError::WriteFailed(_))));
    }

    #[test]
    fn test_invalid_fov_is_reported() {
        let config = CombineConfig::builder().horizontal_fov_degrees(180.0).build();
        let pipeline = StereoPairPipeline::with_custom(MockDecoder, MockWriter::default(), config);
        let result = pipeline.convert(b"10x10", b"10x10", &mut Vec::new());
        assert!(matches!(result, Err(CombineError::InvalidFov(_))));
    }

    #[test]
    fn test_dimension_validation() {
        let pipeline = StereoPairPipeline::with_custom(MockDecoder, MockWriter::default(), CombineConfig::default());
        let result = pipeline.convert(b"10x0", b"10x10", &mut Vec::new());
        assert!(matches!(result, Err(CombineError::InvalidImageDescriptor { width: 10, height: 0 })));
    }

    #[test]
    fn test_dimension_validation_disabled() {
        let config = CombineConfig::builder().validate_dimensions(false).build();
        let pipeline = StereoPairPipeline::with_custom(MockDecoder, MockWriter::default(), config);

        // zero height passes through to the composer, which only needs a width
        assert!(pipeline.convert(b"10x0", b"10x10", &mut Vec::new()).is_ok());
        // zero width is still rejected by the composer
        let result = pipeline.convert(b"0x10", b"10x10", &mut Vec::new());
        assert!(matches!(result, Err(CombineError::InvalidImageDescriptor { width: 0, .. })));
    }

    #[test]
    fn test_convert_file_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let left = dir.path().join("left.png");
        let right = dir.path().join("right.png");
        let output = dir.path().join("pair.heic");
        std::fs::write(&left, png(DynamicImage::ImageRgb8(RgbImage::new(24, 16)))).unwrap();
        std::fs::write(&right, png(DynamicImage::ImageRgb8(RgbImage::new(24, 16)))).unwrap();

        let pipeline = StereoPairPipeline::new(CombineConfig::default());
        let plan = pipeline.convert_file(&left, &right, &output).unwrap();

        let bytes = std::fs::read(&output).unwrap();
        let summary = inspect_container(&bytes).unwrap();
        assert_eq!(summary.stereo_group(), Some(plan.group));
        assert_eq!(summary.items[0].width, Some(24));
    }

    #[test]
    fn test_convert_file_missing_input_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("pair.heic");

        let pipeline = StereoPairPipeline::new(CombineConfig::default());
        let result = pipeline.convert_file(dir.path().join("nope.png"), dir.path().join("nope.png"), &output);

        assert!(matches!(result, Err(CombineError::ImageLoadFailed(_))));
        assert!(!output.exists());
    }

    #[test]
    fn test_depth_attachment() {
        let writer = MockWriter::default();
        let depth_plans = writer.depth_plans.clone();
        let pipeline = DepthAttachPipeline::with_custom(MockDecoder, writer, CombineConfig::default());

        let mut output = Vec::new();
        let description = pipeline.convert(b"64x48", b"32x24", &mut output).unwrap();

        assert_eq!(output, b"depth");
        assert_eq!(description.bytes_per_row, 32 * 4);
        assert_eq!(depth_plans.lock().unwrap()[0], (ImageDescriptor::new(64, 48), 32, 24));
    }

    #[test]
    fn test_depth_decoder_failure() {
        let pipeline = DepthAttachPipeline::with_custom(MockDecoder, MockWriter::default(), CombineConfig::default());
        match pipeline.convert(b"64x48", b"fail", &mut Vec::new()) {
            Err(CombineError::ImageLoadFailed(message)) => assert!(message.contains("depth image")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_depth_attach_file_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("cat.png");
        let depth = dir.path().join("depth.png");
        let output = dir.path().join("cat_with_depth.heic");
        std::fs::write(&image, png(DynamicImage::ImageRgb8(RgbImage::new(16, 16)))).unwrap();
        std::fs::write(&depth, png(DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([128]))))).unwrap();

        DepthAttachPipeline::new(CombineConfig::default())
            .convert_file(&image, &depth, &output)
            .unwrap();

        let summary = inspect_container(&std::fs::read(&output).unwrap()).unwrap();
        assert_eq!(summary.items.len(), 2);
        assert_eq!(summary.referencing_items("auxl", 1), vec![2]);
    }

    #[test]
    fn test_synthesis_produces_stereo_pair() {
        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("photo.png");
        let depth = dir.path().join("depth.png");
        let output = dir.path().join("output.heic");
        std::fs::write(&photo, png(DynamicImage::ImageRgba8(RgbaImage::from_fn(32, 8, |x, _| {
            image::Rgba([(x * 8) as u8, 0, 0, 255])
        }))))
        .unwrap();
        std::fs::write(&depth, png(DynamicImage::ImageLuma8(GrayImage::from_pixel(32, 8, Luma([255]))))).unwrap();

        let pipeline = StereoSynthesisPipeline::new(CombineConfig::default(), SynthesisConfig::default());
        let plan = pipeline.convert_file(&photo, &depth, &output, Some(dir.path())).unwrap();

        assert_eq!(plan.left().image, ImageDescriptor::new(32, 8));
        assert!(dir.path().join("stereo_left.png").exists());
        assert!(dir.path().join("stereo_right.png").exists());
        let summary = inspect_container(&std::fs::read(&output).unwrap()).unwrap();
        assert_eq!(summary.stereo_group(), Some(plan.group));
    }

    #[test]
    fn test_synthesis_rejects_mismatched_depth() {
        let pipeline = StereoSynthesisPipeline::with_custom(
            MockDecoder,
            MockWriter::default(),
            CombineConfig::default(),
            SynthesisConfig::default(),
        );
        let result = pipeline.convert(b"16x16", b"8x8", &mut Vec::new());
        assert!(matches!(result, Err(CombineError::InvalidDepthMap(_))));
    }
}
