use image::{imageops, GrayImage};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::confidence::score;
use crate::ocr::{Rect, Recognizer};
use crate::result::{ExtractionResult, StripResult};
use crate::text::extract_value;

/// Split `height` into `count` equal horizontal bands; the last one takes the
/// remainder so the bands tile the image exactly. Never more bands than rows.
pub fn strip_bounds(width: u32, height: u32, count: usize) -> Vec<Rect> {
    let count = (count.max(1) as u32).min(height.max(1));
    let band = height / count;
    (0..count)
        .map(|i| {
            let top = i * band;
            let bottom = if i == count - 1 { height } else { top + band };
            Rect::new(0, top, width, bottom - top)
        })
        .collect()
}

/// Recognize one band. Engine failures become empty text; an empty band is
/// never handed to the engine.
fn recognize_strip<R: Recognizer + ?Sized>(
    recognizer: &R,
    image: &GrayImage,
    index: usize,
    rect: Rect,
) -> String {
    if rect.is_empty() {
        return String::new();
    }
    let strip = imageops::crop_imm(image, rect.x, rect.y, rect.width, rect.height).to_image();
    match recognizer.recognize(&strip) {
        Ok(out) => {
            let text = out.full_text.trim().to_string();
            debug!(index, chars = text.len(), "strip recognized");
            text
        }
        Err(e) => {
            warn!(index, engine = recognizer.name(), error = %e, "strip recognition failed, treating as empty");
            String::new()
        }
    }
}

/// Read a preprocessed dark-panel capture band by band, top to bottom.
///
/// Returns the accepted result (if any) and the band texts joined with `\n`
/// in band order. The first band that yields a value is scored on its own;
/// if that fails the gate, or no band yields a value, the joined text is
/// tried as a whole.
pub fn assemble_by_strips<R: Recognizer + ?Sized>(
    image: &GrayImage,
    recognizer: &R,
    strip_count: usize,
    parallel: bool,
) -> (Option<ExtractionResult>, String) {
    let bounds = strip_bounds(image.width(), image.height(), strip_count);

    let texts: Vec<String> = if parallel {
        bounds
            .par_iter()
            .enumerate()
            .map(|(i, &rect)| recognize_strip(recognizer, image, i, rect))
            .collect()
    } else {
        bounds
            .iter()
            .enumerate()
            .map(|(i, &rect)| recognize_strip(recognizer, image, i, rect))
            .collect()
    };

    let strips: Vec<StripResult> = texts
        .into_iter()
        .zip(bounds)
        .enumerate()
        .filter(|(_, (text, _))| !text.is_empty())
        .map(|(index, (text, bounding_box))| StripResult {
            index,
            value: extract_value(&text),
            text,
            bounding_box,
        })
        .collect();

    let combined = strips
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    if let Some((first, value)) = strips.iter().find_map(|s| s.value.map(|v| (s, v))) {
        let confidence = score(&first.text, value);
        if let Some(r) = ExtractionResult::accept(value, &first.text, confidence, Some(first.bounding_box)) {
            debug!(index = first.index, value, confidence, "strip value accepted");
            return (Some(r.with_strip_results(strips)), combined);
        }
        debug!(index = first.index, value, confidence, "strip value below confidence gate");
    }

    let result = extract_value(&combined).and_then(|value| {
        let confidence = score(&combined, value);
        debug!(value, confidence, "combined strip text value");
        ExtractionResult::accept(value, &combined, confidence, None)
    });

    (result.map(|r| r.with_strip_results(strips)), combined)
}
