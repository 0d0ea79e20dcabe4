use serde::{Deserialize, Serialize};

/// Axis-aligned face rectangle in oriented-frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl FaceBox {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    /// Intersect with a `frame_width` x `frame_height` frame. `None` when nothing is left.
    pub fn clamp_to(&self, frame_width: u32, frame_height: u32) -> Option<FaceBox> {
        let x1 = (self.x as i64).max(0);
        let y1 = (self.y as i64).max(0);
        let x2 = self.right().min(frame_width as i64);
        let y2 = self.bottom().min(frame_height as i64);

        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        Some(FaceBox {
            x: x1 as i32,
            y: y1 as i32,
            width: (x2 - x1) as u32,
            height: (y2 - y1) as u32,
        })
    }
}
