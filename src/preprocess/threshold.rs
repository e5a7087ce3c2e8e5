use image::{GrayImage, Luma};
use imageproc::edges::canny;
use imageproc::morphology::{grayscale_dilate, grayscale_erode, Mask};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::ThresholdSweep;

/// Canny hysteresis thresholds for the edge-density term.
const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 150.0;

const RATIO_WEIGHT: f64 = 0.7;
const EDGE_WEIGHT: f64 = 0.3;

/// One evaluated binarization level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdCandidate {
    pub level: u8,
    pub score: f64,
}

/// Binarize at `level` (pixels ≥ level are foreground) and invert, so bright
/// panel background turns black and the darker glyph strokes turn white.
pub fn binarize_inverted(gray: &GrayImage, level: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y)[0] >= level {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

/// How much a binary image looks like isolated text strokes on a clean
/// background, in [0, 1].
///
/// A hand-tuned proxy, not a learned model: a white-pixel ratio term (ideal
/// 10–30 %, acceptable 5–40 %, otherwise zero) weighted 0.7 plus an
/// edge-density term weighted 0.3.
pub fn score_binary(binary: &GrayImage) -> f64 {
    let total = binary.width() as u64 * binary.height() as u64;
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;

    let white = binary.pixels().filter(|p| p[0] > 0).count() as f64;
    let white_ratio = white / total;
    let ratio_score = if !(0.05..=0.40).contains(&white_ratio) {
        0.0
    } else if (0.10..=0.30).contains(&white_ratio) {
        1.0
    } else {
        0.5
    };

    let edges = canny(binary, CANNY_LOW, CANNY_HIGH);
    let edge_pixels = edges.pixels().filter(|p| p[0] > 0).count() as f64;
    let edge_score = (edge_pixels / total).clamp(0.0, 1.0);

    RATIO_WEIGHT * ratio_score + EDGE_WEIGHT * edge_score
}

/// Sweep the binarization levels and keep the best-scoring inverted image.
///
/// Candidates are scored on the rayon pool and each one drops its image as
/// soon as it is scored; only the winner is rebuilt. Ties go to the level
/// evaluated first in sweep order. An empty sweep falls back to `sweep.start`.
pub fn select_best_threshold(
    gray: &GrayImage,
    sweep: &ThresholdSweep,
) -> (ThresholdCandidate, GrayImage) {
    let mut levels = sweep.levels();
    if levels.is_empty() {
        levels.push(sweep.start);
    }

    let scored: Vec<ThresholdCandidate> = levels
        .par_iter()
        .map(|&level| {
            let inverted = binarize_inverted(gray, level);
            let score = score_binary(&inverted);
            debug!(level, score, "threshold candidate");
            ThresholdCandidate { level, score }
        })
        .collect();

    let best = pick_first_best(&scored).unwrap_or(ThresholdCandidate {
        level: levels[0],
        score: 0.0,
    });
    info!(level = best.level, score = best.score, "selected threshold");

    (best, binarize_inverted(gray, best.level))
}

/// First candidate holding the maximum score.
fn pick_first_best(candidates: &[ThresholdCandidate]) -> Option<ThresholdCandidate> {
    candidates
        .iter()
        .copied()
        .reduce(|best, c| if c.score > best.score { c } else { best })
}

/// Morphological close then open with a 2×2 rectangle: fills pinholes inside
/// strokes, then drops isolated speckles.
///
/// An even-sized element has no centre pixel, so dilation reaches up-left and
/// erosion down-right. Each pair cancels and strokes keep their coordinates.
pub fn clean_speckle(binary: GrayImage) -> GrayImage {
    let square = GrayImage::from_pixel(2, 2, Luma([255]));
    let up_left = Mask::from_image(&square, 1, 1);
    let down_right = Mask::from_image(&square, 0, 0);

    let closed = grayscale_erode(&grayscale_dilate(&binary, &up_left), &down_right);
    drop(binary);
    grayscale_dilate(&grayscale_erode(&closed, &down_right), &up_left)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 100×100 panel whose dark rows turn white at increasing levels:
    /// 2 % below 150, another 18 % below 160, another 30 % below 170.
    fn banded_panel() -> GrayImage {
        GrayImage::from_fn(100, 100, |_, y| match y {
            0..=1 => Luma([145]),
            2..=19 => Luma([155]),
            20..=49 => Luma([165]),
            _ => Luma([200]),
        })
    }

    #[test]
    fn binarize_inverted_polarity() {
        let gray = GrayImage::from_fn(3, 1, |x, _| Luma([[100, 150, 200][x as usize]]));
        let out = binarize_inverted(&gray, 150);
        assert_eq!(out.get_pixel(0, 0)[0], 255, "below level becomes white");
        assert_eq!(out.get_pixel(1, 0)[0], 0, "at level counts as foreground, then inverted");
        assert_eq!(out.get_pixel(2, 0)[0], 0);
    }

    #[test]
    fn score_is_zero_for_blank_and_saturated_images() {
        assert_eq!(score_binary(&GrayImage::new(20, 20)), 0.0);
        let full = GrayImage::from_pixel(20, 20, Luma([255]));
        assert!(score_binary(&full) < 0.3 + 1e-9);
        assert_eq!(score_binary(&GrayImage::new(0, 0)), 0.0);
    }

    #[test]
    fn score_rewards_ideal_white_ratio() {
        // 20 % white rows.
        let img = GrayImage::from_fn(50, 50, |_, y| if y < 10 { Luma([255]) } else { Luma([0]) });
        let s = score_binary(&img);
        assert!(s >= 0.7 && s <= 1.0, "score {s}");
    }

    #[test]
    fn score_half_credit_for_acceptable_ratio() {
        // 36 % white.
        let img = GrayImage::from_fn(50, 50, |_, y| if y < 18 { Luma([255]) } else { Luma([0]) });
        let s = score_binary(&img);
        assert!(s >= 0.35 && s < 0.7, "score {s}");
    }

    #[test]
    fn selects_level_with_text_like_ratio() {
        let gray = banded_panel();
        let (best, image) = select_best_threshold(&gray, &ThresholdSweep::default());
        assert_eq!(best.level, 160);
        assert!(best.score >= 0.7);
        assert_eq!(image, binarize_inverted(&gray, 160));
    }

    #[test]
    fn ties_keep_lowest_level() {
        let gray = GrayImage::from_pixel(40, 40, Luma([220]));
        let (best, _) = select_best_threshold(&gray, &ThresholdSweep::default());
        assert_eq!(best.level, 140);
        assert_eq!(best.score, 0.0);
    }

    #[test]
    fn pick_first_best_prefers_earlier_on_equal_scores() {
        let c = [
            ThresholdCandidate { level: 140, score: 0.5 },
            ThresholdCandidate { level: 150, score: 0.8 },
            ThresholdCandidate { level: 160, score: 0.8 },
        ];
        assert_eq!(pick_first_best(&c).unwrap().level, 150);
        assert!(pick_first_best(&[]).is_none());
    }

    #[test]
    fn empty_sweep_falls_back_to_start() {
        let gray = banded_panel();
        let sweep = ThresholdSweep { start: 170, end: 140, step: 10 };
        let (best, _) = select_best_threshold(&gray, &sweep);
        assert_eq!(best.level, 170);
    }

    #[test]
    fn clean_speckle_removes_isolated_pixels_and_keeps_strokes() {
        let mut img = GrayImage::new(12, 12);
        img.put_pixel(9, 9, Luma([255]));
        for y in 2..6 {
            for x in 2..6 {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        let out = clean_speckle(img.clone());
        assert_eq!(out.get_pixel(9, 9)[0], 0, "speckle removed");
        assert_eq!(out.get_pixel(3, 3)[0], 255, "stroke interior kept");
        assert_eq!(out.get_pixel(0, 11)[0], 0);

        // The 4×4 block stays exactly where it was.
        img.put_pixel(9, 9, Luma([0]));
        assert_eq!(out, img);
    }

    #[test]
    fn clean_speckle_fills_pinhole_in_place() {
        let mut img = GrayImage::new(12, 12);
        for y in 3..8 {
            for x in 3..8 {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        let solid = img.clone();
        img.put_pixel(5, 5, Luma([0]));
        assert_eq!(clean_speckle(img), solid);
    }
}
