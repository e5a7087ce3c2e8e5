/// Minimum confidence for a value to be reported. Fixed for the whole crate.
pub const CONFIDENCE_GATE: f64 = 0.7;

// Adjustments are kept in tenths so sums like 0.5 + 0.2 land exactly on the
// gate instead of a float hair below it.
const BASE: i32 = 5;
const UNIT_TOKEN: i32 = 4;
const MG_AND_DL: i32 = 3;
const RESULT_AND_MG: i32 = 2;
const TYPICAL_RANGE: i32 = 2;
const PLAUSIBLE_RANGE: i32 = 1;
const ZERO_VALUE: i32 = -5;
const MISSING_DL: i32 = -4;

/// Score how much `text` and `value` look like a genuine mg/dL reading, in [0, 1].
///
/// Lexical cues (case-insensitive), the best matching one counts:
/// `mg/dl` +0.4, `mg` with `dl` +0.3, `result` with `mg` +0.2.
/// Value cues: 70–400 +0.2, else 50–600 +0.1; exactly zero −0.5.
/// Text without any `dl` −0.4.
pub fn score(text: &str, value: f64) -> f64 {
    let lower = text.to_lowercase();
    let has = |needle: &str| lower.contains(needle);

    let mut tenths = BASE;

    tenths += if has("mg/dl") {
        UNIT_TOKEN
    } else if has("mg") && has("dl") {
        MG_AND_DL
    } else if has("result") && has("mg") {
        RESULT_AND_MG
    } else {
        0
    };

    if (70.0..=400.0).contains(&value) {
        tenths += TYPICAL_RANGE;
    } else if (50.0..=600.0).contains(&value) {
        tenths += PLAUSIBLE_RANGE;
    }

    if value == 0.0 {
        tenths += ZERO_VALUE;
    }

    if !has("dl") {
        tenths += MISSING_DL;
    }

    tenths.clamp(0, 10) as f64 / 10.0
}

pub fn passes_gate(confidence: f64) -> bool {
    confidence >= CONFIDENCE_GATE
}
