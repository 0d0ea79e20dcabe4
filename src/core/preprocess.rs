use image::{imageops, GrayImage, RgbaImage};
use serde::{Deserialize, Serialize};

/// Clockwise rotation that brings a sensor frame upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Upright,
    #[default]
    Rotate90,
    Rotate180,
    Rotate270,
}

impl Orientation {
    pub fn inverse(self) -> Self {
        match self {
            Orientation::Upright => Orientation::Upright,
            Orientation::Rotate90 => Orientation::Rotate270,
            Orientation::Rotate180 => Orientation::Rotate180,
            Orientation::Rotate270 => Orientation::Rotate90,
        }
    }
}

/// Rotate `frame` in place so detection sees an upright image.
pub fn orient(frame: &mut RgbaImage, orientation: Orientation) {
    match orientation {
        Orientation::Upright => {}
        Orientation::Rotate90 => *frame = imageops::rotate90(&*frame),
        Orientation::Rotate180 => imageops::rotate180_in_place(frame),
        Orientation::Rotate270 => *frame = imageops::rotate270(&*frame),
    }
}

/// Undo [`orient`], returning the frame to the caller's convention.
pub fn restore(frame: &mut RgbaImage, orientation: Orientation) {
    orient(frame, orientation.inverse());
}

pub fn to_gray(frame: &RgbaImage) -> GrayImage {
    imageops::grayscale(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x + y) % 256) as u8, 255])
        })
    }

    #[test]
    fn rotate90_moves_top_left_to_top_right() {
        let mut frame = gradient(4, 3);
        let corner = *frame.get_pixel(0, 0);
        orient(&mut frame, Orientation::Rotate90);
        assert_eq!(frame.dimensions(), (3, 4));
        assert_eq!(*frame.get_pixel(2, 0), corner);
    }

    #[test]
    fn orientations_round_trip() {
        for orientation in [
            Orientation::Upright,
            Orientation::Rotate90,
            Orientation::Rotate180,
            Orientation::Rotate270,
        ] {
            let original = gradient(7, 5);
            let mut frame = original.clone();
            orient(&mut frame, orientation);
            restore(&mut frame, orientation);
            assert_eq!(frame, original, "{:?} did not round trip", orientation);
        }
    }

    #[test]
    fn gray_copy_matches_dimensions() {
        let frame = gradient(9, 4);
        let gray = to_gray(&frame);
        assert_eq!(gray.dimensions(), (9, 4));

        let white = RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 255]));
        assert!(to_gray(&white).pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn empty_frame_gives_empty_gray() {
        let frame = RgbaImage::new(0, 0);
        assert_eq!(to_gray(&frame).dimensions(), (0, 0));
    }
}
