use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::confidence::score;
use crate::ocr::RecognitionOutput;
use crate::result::ExtractionResult;

/// Known recognition confusions, applied in order after lowercasing.
/// Longer variants sit before their prefixes so they get a chance to match.
const SUBSTITUTIONS: &[(&str, &str)] = &[
    ("resutt", "result"),
    ("resut", "result"),
    ("recut", "result"),
    ("resu1t", "result"),
    ("mgfdl", "mg/dl"),
    ("mgfdi", "mg/dl"),
    ("mgd1", "mg/dl"),
    ("mgdi", "mg/dl"),
    ("mgdl", "mg/dl"),
    ("ngdl", "mg/dl"),
    ("m9/dl", "mg/dl"),
    ("mgidl", "mg/dl"),
    ("mg/d1", "mg/dl"),
    ("mgd/", "mg/dl"),
];

/// Number-with-unit patterns in priority order; the first one that matches
/// wins and the looser shapes only act as fallbacks.
static VALUE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // 121 mg / dl, with stray whitespace anywhere
        r"(?i)([0-9]+\s*(?:\.\s*[0-9]+)?)\s*mg\s*/\s*d[lL]",
        r"([0-9]+(?:\.[0-9]+)?)mg/dl",
        r"(?i)([0-9]+(?:\.[0-9]+)?)mg/dL",
        // 121 mg dl
        r"(?i)([0-9]+(?:\.[0-9]+)?)\s+mg\s+d[lL]",
        r"(?i)result\s*:?\s*([0-9]+(?:\.[0-9]+)?)\s*mg/dL",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static regex"))
    .collect()
});

/// Split-line hits carry a fixed confidence: the unit was already confirmed on
/// the normalized block, so raw unit misreads must not count against them.
const SPLIT_LINE_CONFIDENCE: f64 = 0.8;

static BARE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([0-9]+(?:\.[0-9]+)?)\b").expect("static regex"));

/// Lowercase, drop spaces and `:;,`, then fold known misreads onto the
/// canonical `result` and `mg/dl` tokens.
pub fn normalize(text: &str) -> String {
    let mut s: String = text
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, ' ' | ':' | ';' | ','))
        .collect();
    for (from, to) in SUBSTITUTIONS {
        if s.contains(from) {
            s = s.replace(from, to);
        }
    }
    s
}

/// First number anchored to an mg/dL unit, if any.
pub fn extract_value(text: &str) -> Option<f64> {
    let normalized = normalize(text);
    VALUE_PATTERNS.iter().find_map(|re| {
        let caps = re.captures(&normalized)?;
        let digits: String = caps[1].chars().filter(|c| !c.is_whitespace()).collect();
        digits.parse::<f64>().ok()
    })
}

/// First bare number in `text`, no unit required.
fn first_number(text: &str) -> Option<f64> {
    BARE_NUMBER
        .captures(text)
        .and_then(|caps| caps[1].parse::<f64>().ok())
}

/// Scan a full recognition result for a trusted value.
///
/// 1. every line of every block, in order (tightest bounding box);
/// 2. per block, the split case: block mentions `mg/dl` and a line mentions
///    `result`, take that line's first number;
/// 3. the whole text as one unit.
///
/// Each stage only returns a value that clears the confidence gate.
pub fn extract_from_output(output: &RecognitionOutput) -> Option<ExtractionResult> {
    for block in &output.blocks {
        for line in &block.lines {
            let Some(value) = extract_value(&line.text) else {
                continue;
            };
            let confidence = score(&line.text, value);
            if let Some(r) = ExtractionResult::accept(value, &line.text, confidence, line.bounding_box) {
                debug!(value, confidence, "value found on a single line");
                return Some(r);
            }
            debug!(value, confidence, "line value below confidence gate");
        }
    }

    for block in &output.blocks {
        if !normalize(&block.text()).contains("mg/dl") {
            continue;
        }
        for line in &block.lines {
            if !normalize(&line.text).contains("result") {
                continue;
            }
            let Some(value) = first_number(&line.text) else {
                continue;
            };
            if let Some(r) =
                ExtractionResult::accept(value, &line.text, SPLIT_LINE_CONFIDENCE, line.bounding_box)
            {
                debug!(value, "value found with unit on a separate line");
                return Some(r);
            }
        }
    }

    let value = extract_value(&output.full_text)?;
    let confidence = score(&output.full_text, value);
    let result = ExtractionResult::accept(value, &output.full_text, confidence, None);
    match &result {
        Some(_) => debug!(value, confidence, "value found in full text"),
        None => debug!(value, confidence, "full-text value below confidence gate"),
    }
    result
}
