use crate::common::{FaceTagError, Result};
use crate::core::face_box::FaceBox;
use crate::core::scorer::Scorer;
use image::{imageops::{self, FilterType}, RgbaImage};

/// Resized face crop packed as interleaved R,G,B floats in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedBuffer {
    side: u32,
    values: Vec<f32>,
}

impl NormalizedBuffer {
    pub fn len_for(side: u32) -> usize {
        3 * side as usize * side as usize
    }

    pub fn side(&self) -> u32 {
        self.side
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// Pack a square crop row by row, dropping alpha.
pub fn pack(crop: &RgbaImage) -> NormalizedBuffer {
    debug_assert_eq!(crop.width(), crop.height());

    let mut values = Vec::with_capacity(NormalizedBuffer::len_for(crop.width()));
    for pixel in crop.pixels() {
        values.push(pixel[0] as f32 / 255.0);
        values.push(pixel[1] as f32 / 255.0);
        values.push(pixel[2] as f32 / 255.0);
    }

    NormalizedBuffer { side: crop.width(), values }
}

/// Crops faces out of the colour frame and scores them.
pub struct RegionClassifier {
    scorer: Box<dyn Scorer>,
    input_size: u32,
}

impl RegionClassifier {
    /// Fails when the scorer was built for a different input size.
    pub fn new(scorer: Box<dyn Scorer>, input_size: u32) -> Result<Self> {
        let expected = scorer.input_len();
        let actual = NormalizedBuffer::len_for(input_size);
        if expected != actual {
            return Err(FaceTagError::InputSize { expected, actual });
        }

        Ok(Self { scorer, input_size })
    }

    pub fn input_size(&self) -> u32 {
        self.input_size
    }

    /// Clamp `face` to the frame and resample it to the model's square input.
    /// Returns `None` when the box does not overlap the frame.
    pub fn crop_and_resize(&self, frame: &RgbaImage, face: &FaceBox) -> Option<RgbaImage> {
        let region = face.clamp_to(frame.width(), frame.height())?;
        let crop = imageops::crop_imm(
            frame,
            region.x as u32,
            region.y as u32,
            region.width,
            region.height,
        )
        .to_image();

        Some(imageops::resize(&crop, self.input_size, self.input_size, FilterType::Nearest))
    }

    /// `Ok(None)` means the box was skipped; `Err` means the scorer failed.
    pub fn classify(&self, frame: &RgbaImage, face: &FaceBox) -> Result<Option<f32>> {
        let Some(resized) = self.crop_and_resize(frame, face) else {
            tracing::debug!("Skipping face outside frame: {:?}", face);
            return Ok(None);
        };

        let buffer = pack(&resized);
        self.scorer.infer(&buffer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::sync::{Arc, Mutex};

    struct RecordingScorer {
        side: u32,
        seen: Arc<Mutex<Vec<NormalizedBuffer>>>,
    }

    impl Scorer for RecordingScorer {
        fn input_len(&self) -> usize {
            NormalizedBuffer::len_for(self.side)
        }

        fn infer(&self, buffer: &NormalizedBuffer) -> Result<f32> {
            self.seen.lock().unwrap().push(buffer.clone());
            Ok(0.25)
        }
    }

    fn classifier(side: u32) -> (RegionClassifier, Arc<Mutex<Vec<NormalizedBuffer>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let scorer = RecordingScorer { side, seen: seen.clone() };
        (RegionClassifier::new(Box::new(scorer), side).unwrap(), seen)
    }

    #[test]
    fn pack_interleaves_rgb_and_drops_alpha() {
        let mut crop = RgbaImage::new(2, 2);
        crop.put_pixel(0, 0, Rgba([255, 0, 51, 7]));
        crop.put_pixel(1, 0, Rgba([0, 255, 0, 0]));
        crop.put_pixel(0, 1, Rgba([0, 0, 255, 255]));
        crop.put_pixel(1, 1, Rgba([102, 102, 102, 255]));

        let buffer = pack(&crop);
        assert_eq!(buffer.side(), 2);
        assert_eq!(buffer.values().len(), 12);
        assert_eq!(&buffer.values()[0..3], &[1.0, 0.0, 0.2]);
        assert_eq!(&buffer.values()[3..6], &[0.0, 1.0, 0.0]);
        assert_eq!(&buffer.values()[6..9], &[0.0, 0.0, 1.0]);
        assert!((buffer.values()[9] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn packed_values_stay_in_unit_range() {
        let crop = RgbaImage::from_fn(5, 5, |x, y| {
            Rgba([(x * 60) as u8, (y * 60) as u8, 255, (x * y) as u8])
        });
        let buffer = pack(&crop);
        assert_eq!(buffer.values().len(), NormalizedBuffer::len_for(5));
        assert!(buffer.values().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn mismatched_input_size_is_rejected() {
        let scorer = RecordingScorer { side: 96, seen: Arc::new(Mutex::new(Vec::new())) };
        let err = RegionClassifier::new(Box::new(scorer), 64).err().unwrap();
        assert!(matches!(
            err,
            FaceTagError::InputSize { expected: 27648, actual: 12288 }
        ));
    }

    #[test]
    fn crop_is_resampled_to_input_size() {
        let (classifier, seen) = classifier(8);
        let frame = RgbaImage::from_pixel(100, 60, Rgba([10, 20, 30, 255]));

        let score = classifier.classify(&frame, &FaceBox::new(5, 5, 30, 20)).unwrap();
        assert_eq!(score, Some(0.25));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].side(), 8);
        assert_eq!(seen[0].values().len(), 3 * 8 * 8);
        assert!((seen[0].values()[2] - 30.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn crop_uses_only_the_box_region() {
        let (classifier, _) = classifier(4);
        let mut frame = RgbaImage::from_pixel(20, 20, Rgba([0, 0, 0, 255]));
        for y in 10..14 {
            for x in 10..14 {
                frame.put_pixel(x, y, Rgba([200, 100, 50, 255]));
            }
        }

        let crop = classifier.crop_and_resize(&frame, &FaceBox::new(10, 10, 4, 4)).unwrap();
        assert!(crop.pixels().all(|p| *p == Rgba([200, 100, 50, 255])));
    }

    #[test]
    fn box_outside_frame_is_skipped_without_scoring() {
        let (classifier, seen) = classifier(4);
        let frame = RgbaImage::new(50, 50);

        let score = classifier.classify(&frame, &FaceBox::new(60, 60, 10, 10)).unwrap();
        assert_eq!(score, None);
        assert!(seen.lock().unwrap().is_empty());
    }
}
