use anyhow::{anyhow, Result};
use image::{imageops::FilterType, DynamicImage, GrayImage};
use oar_ocr::predictors::TextRecognitionPredictor;
use tracing::debug;

use super::{RecognitionOutput, Rect, Recognizer};

/// Minimum height fed to PaddleOCR v5 mobile (normalises inputs to 48 px internally).
const MIN_HEIGHT: u32 = 48;

/// Recognition-only oar-ocr backend.
///
/// There is no detection step, so each call yields at most one line whose
/// bounding box is the whole input. That matches strip mode, where every
/// band holds roughly one row of display text.
pub struct OarRecognizer {
    rec: TextRecognitionPredictor,
}

// ONNX Runtime sessions are not `Send`/`Sync` by default, but in practice the
// recognition predictor is stateless between calls and safe to share.
unsafe impl Send for OarRecognizer {}
unsafe impl Sync for OarRecognizer {}

impl OarRecognizer {
    /// Build the recognizer from on-disk ONNX model and dict files.
    pub fn from_files(rec_model: &str, dict: &str) -> Result<Self> {
        let rec = TextRecognitionPredictor::builder()
            .dict_path(dict)
            .score_threshold(0.0)
            .build(rec_model)
            .map_err(|e| anyhow!("oar-ocr init failed: {e}"))?;
        Ok(OarRecognizer { rec })
    }
}

impl Recognizer for OarRecognizer {
    fn name(&self) -> &str {
        "oar-ocr"
    }

    fn recognize(&self, image: &GrayImage) -> Result<RecognitionOutput> {
        let (orig_w, orig_h) = image.dimensions();
        if orig_w == 0 || orig_h == 0 {
            return Ok(RecognitionOutput::default());
        }

        // The model wants three channels; promote L to (L, L, L).
        let rgb = DynamicImage::ImageLuma8(image.clone()).to_rgb8();

        let rgb = if orig_h < MIN_HEIGHT {
            let scale = (MIN_HEIGHT + orig_h - 1) / orig_h;
            DynamicImage::ImageRgb8(rgb)
                .resize(orig_w * scale, orig_h * scale, FilterType::Lanczos3)
                .to_rgb8()
        } else {
            rgb
        };

        debug!(
            width = rgb.width(),
            height = rgb.height(),
            orig_width = orig_w,
            orig_height = orig_h,
            "oar-ocr input"
        );

        let result = self
            .rec
            .predict(vec![rgb])
            .map_err(|e| anyhow!("oar-ocr predict error: {e}"))?;

        let text = result.texts.into_iter().next().unwrap_or_default();
        let score = result.scores.into_iter().next().unwrap_or(0.0);
        debug!(text = %text, score, "oar-ocr result");

        if text.trim().is_empty() {
            return Ok(RecognitionOutput::default());
        }

        Ok(RecognitionOutput::single_line(
            text,
            Some(Rect::new(0, 0, orig_w, orig_h)),
        ))
    }
}
