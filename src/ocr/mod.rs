mod columns;

pub use columns::reconstruct_columns;

use anyhow::Result;
use image::DynamicImage;
use std::future::Future;
use std::pin::Pin;

/// Axis-aligned bounding box of a recognized text block, in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub top: i32,
    pub left: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn center_x(&self) -> i32 {
        self.left + self.width / 2
    }
}

/// One block from a recognition pass. `text` may span several sub-lines
/// separated by `'\n'`, matching what on-device recognizers report.
#[derive(Debug, Clone)]
pub struct TextBlock {
    pub text: String,
    pub bounding_box: Rect,
}

pub type RecognizeFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<TextBlock>>> + Send + 'a>>;

/// The on-device Japanese text recognizer, treated as a black box. A call is
/// single-shot: it either delivers the full block list or fails.
pub trait OcrEngine: Send + Sync {
    fn recognize<'a>(&'a self, image: &'a DynamicImage) -> RecognizeFuture<'a>;
}
