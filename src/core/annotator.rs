use crate::common::config::AnnotationConfig;
use crate::core::face_box::FaceBox;
use crate::core::glyphs::{self, ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    FirstPerson,
    SecondPerson,
    /// Score outside `[0, 1)`; drawn as an empty label.
    Unclassified,
}

impl Label {
    pub fn from_score(score: f32) -> Self {
        if (0.0..0.5).contains(&score) {
            Label::FirstPerson
        } else if (0.5..1.0).contains(&score) {
            Label::SecondPerson
        } else {
            Label::Unclassified
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::FirstPerson => "First person",
            Label::SecondPerson => "Second person",
            Label::Unclassified => "",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct Annotator {
    box_color: Rgba<u8>,
    box_thickness: u32,
    text_color: Rgba<u8>,
    text_scale: u32,
    text_offset: (i32, i32),
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new(&AnnotationConfig::default())
    }
}

impl Annotator {
    pub fn new(config: &AnnotationConfig) -> Self {
        Self {
            box_color: Rgba(config.box_color),
            box_thickness: config.box_thickness.max(1),
            text_color: Rgba(config.text_color),
            text_scale: config.text_scale.max(1),
            text_offset: (config.text_offset[0], config.text_offset[1]),
        }
    }

    /// Draw the face rectangle and its label. The rectangle spans
    /// `(x, y)`..=`(x + width, y + height)` and thickens inward.
    pub fn annotate(&self, frame: &mut RgbaImage, face: &FaceBox, label: Label) {
        self.draw_box(frame, face);

        let text = label.as_str();
        if !text.is_empty() {
            let origin_x = face.x.saturating_add(self.text_offset.0);
            let baseline_y = face.y.saturating_add(self.text_offset.1);
            self.draw_text(frame, origin_x, baseline_y, text);
        }
    }

    fn draw_box(&self, frame: &mut RgbaImage, face: &FaceBox) {
        for inset in 0..self.box_thickness {
            let width = (face.width + 1).saturating_sub(2 * inset);
            let height = (face.height + 1).saturating_sub(2 * inset);
            if width == 0 || height == 0 {
                break;
            }
            let rect = Rect::at(face.x + inset as i32, face.y + inset as i32).of_size(width, height);
            draw_hollow_rect_mut(frame, rect, self.box_color);
        }
    }

    /// `(x, baseline_y)` is the bottom-left corner of the first glyph.
    fn draw_text(&self, frame: &mut RgbaImage, x: i32, baseline_y: i32, text: &str) {
        let scale = self.text_scale as i32;
        let top = baseline_y - (GLYPH_HEIGHT as i32) * scale;
        let (frame_w, frame_h) = (frame.width() as i32, frame.height() as i32);

        for (index, ch) in text.chars().enumerate() {
            let glyph_x = x + index as i32 * ADVANCE as i32 * scale;
            for row in 0..GLYPH_HEIGHT {
                for col in 0..GLYPH_WIDTH {
                    if !glyphs::is_set(ch, col, row) {
                        continue;
                    }
                    for dy in 0..scale {
                        for dx in 0..scale {
                            let px = glyph_x + col as i32 * scale + dx;
                            let py = top + row as i32 * scale + dy;
                            if px >= 0 && py >= 0 && px < frame_w && py < frame_h {
                                frame.put_pixel(px as u32, py as u32, self.text_color);
                            }
                        }
                    }
                }
            }
        }
    }
}
