#[cfg(feature = "oar")]
pub mod oar;

use image::GrayImage;
use serde::Serialize;

// ── Public types ─────────────────────────────────────────────────────────────

/// Axis-aligned rectangle in image-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Rect { x, y, width, height }
    }

    /// True when the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// One recognized line inside a block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub bounding_box: Option<Rect>,
}

/// A paragraph-level recognition unit: an ordered run of lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<TextLine>,
}

impl TextBlock {
    /// Full block text, lines joined with `\n`.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// What a recognition engine returns for one image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognitionOutput {
    pub full_text: String,
    pub blocks: Vec<TextBlock>,
}

impl RecognitionOutput {
    /// Output with a single block holding a single line.
    pub fn single_line(text: impl Into<String>, bounding_box: Option<Rect>) -> Self {
        let text = text.into();
        RecognitionOutput {
            full_text: text.clone(),
            blocks: vec![TextBlock {
                lines: vec![TextLine { text, bounding_box }],
            }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.full_text.trim().is_empty()
    }
}

/// Every text-recognition backend implements this.
///
/// The engine itself is a black box: it may fail per call, and callers decide
/// whether a failure is fatal (single-shot) or downgraded to empty text (strips).
pub trait Recognizer: Send + Sync {
    fn name(&self) -> &str;
    fn recognize(&self, image: &GrayImage) -> anyhow::Result<RecognitionOutput>;
}

impl<R: Recognizer + ?Sized> Recognizer for Box<R> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn recognize(&self, image: &GrayImage) -> anyhow::Result<RecognitionOutput> {
        (**self).recognize(image)
    }
}
