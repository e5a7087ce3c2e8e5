use image::{GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;
use tracing::debug;

use crate::config::ContrastTiers;

/// Tiles per axis for adaptive equalisation.
const TILE_GRID: u32 = 8;

const HEAVY_CLIP_LIMIT: f32 = 3.0;
const MODERATE_CLIP_LIMIT: f32 = 2.0;

/// Sigma OpenCV derives for a 3×3 Gaussian kernel.
const BLUR_SIGMA: f32 = 0.8;

/// Unsharp weights: `out = 1.4·equalised − 0.4·blurred`.
const SHARPEN_WEIGHT: f32 = 1.4;
const BLUR_WEIGHT: f32 = -0.4;

/// Dark-panel enhancement tier chosen from the image contrast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnhancementTier {
    None,
    Moderate,
    Heavy,
}

impl EnhancementTier {
    pub fn for_contrast(contrast: f64, tiers: &ContrastTiers) -> Self {
        if contrast < tiers.heavy_below {
            EnhancementTier::Heavy
        } else if contrast < tiers.moderate_below {
            EnhancementTier::Moderate
        } else {
            EnhancementTier::None
        }
    }

    /// Consumes the grayscale input; `None` hands it back untouched.
    pub fn apply(self, gray: GrayImage) -> GrayImage {
        match self {
            EnhancementTier::None => gray,
            EnhancementTier::Moderate => moderate_enhance(&gray),
            EnhancementTier::Heavy => heavy_enhance(&gray),
        }
    }
}

/// CLAHE (clip 2.0, 8×8 tiles), nothing else.
pub fn moderate_enhance(gray: &GrayImage) -> GrayImage {
    clahe(gray, MODERATE_CLIP_LIMIT, TILE_GRID)
}

/// CLAHE (clip 3.0, 8×8 tiles) → 3×3 Gaussian blur → unsharp sharpening.
pub fn heavy_enhance(gray: &GrayImage) -> GrayImage {
    let equalized = clahe(gray, HEAVY_CLIP_LIMIT, TILE_GRID);
    let blurred = gaussian_blur_f32(&equalized, BLUR_SIGMA);
    debug!("heavy enhancement: clahe + blur + sharpen");

    let mut out = equalized;
    for (p, b) in out.pixels_mut().zip(blurred.pixels()) {
        let v = SHARPEN_WEIGHT * p[0] as f32 + BLUR_WEIGHT * b[0] as f32;
        p[0] = v.round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Contrast-limited adaptive histogram equalisation.
///
/// The image is split into a `grid`×`grid` set of tiles (fewer when the image
/// is smaller than the grid). Each tile gets a clipped-histogram LUT; every
/// pixel is mapped by bilinear interpolation between the four nearest tile
/// centres. `clip_limit` is relative to a flat histogram, as in OpenCV.
pub fn clahe(image: &GrayImage, clip_limit: f32, grid: u32) -> GrayImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return image.clone();
    }

    let tiles_x = grid.clamp(1, w);
    let tiles_y = grid.clamp(1, h);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        let (y0, y1) = tile_span(ty, tiles_y, h);
        for tx in 0..tiles_x {
            let (x0, x1) = tile_span(tx, tiles_x, w);
            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[image.get_pixel(x, y)[0] as usize] += 1;
                }
            }
            luts.push(tile_lut(&mut hist, (x1 - x0) * (y1 - y0), clip_limit));
        }
    }

    let tile_w = w as f32 / tiles_x as f32;
    let tile_h = h as f32 / tiles_y as f32;

    GrayImage::from_fn(w, h, |x, y| {
        let v = image.get_pixel(x, y)[0] as usize;
        let (tx0, tx1, fx) = neighbours((x as f32 + 0.5) / tile_w - 0.5, tiles_x);
        let (ty0, ty1, fy) = neighbours((y as f32 + 0.5) / tile_h - 0.5, tiles_y);
        let at = |tx: u32, ty: u32| luts[(ty * tiles_x + tx) as usize][v] as f32;

        let top = at(tx0, ty0) * (1.0 - fx) + at(tx1, ty0) * fx;
        let bottom = at(tx0, ty1) * (1.0 - fx) + at(tx1, ty1) * fx;
        let mapped = top * (1.0 - fy) + bottom * fy;
        Luma([mapped.round().clamp(0.0, 255.0) as u8])
    })
}

/// Half-open pixel span of tile `i` out of `n` along an axis of `len` pixels.
fn tile_span(i: u32, n: u32, len: u32) -> (u32, u32) {
    (i * len / n, (i + 1) * len / n)
}

/// Lower/upper tile index and the weight of the upper one.
fn neighbours(pos: f32, n: u32) -> (u32, u32, f32) {
    let pos = pos.clamp(0.0, (n - 1) as f32);
    let lo = pos.floor() as u32;
    let hi = (lo + 1).min(n - 1);
    (lo, hi, pos - lo as f32)
}

fn tile_lut(hist: &mut [u32; 256], area: u32, clip_limit: f32) -> [u8; 256] {
    if clip_limit > 0.0 {
        let clip = ((clip_limit * area as f32 / 256.0) as u32).max(1);
        let mut excess = 0u32;
        for bin in hist.iter_mut() {
            if *bin > clip {
                excess += *bin - clip;
                *bin = clip;
            }
        }

        // Spread the clipped mass back evenly; the remainder goes to every
        // `step`-th bin so the total stays equal to `area`.
        let bonus = excess / 256;
        let residual = excess % 256;
        for bin in hist.iter_mut() {
            *bin += bonus;
        }
        if residual > 0 {
            let step = (256 / residual).max(1) as usize;
            for bin in hist.iter_mut().step_by(step).take(residual as usize) {
                *bin += 1;
            }
        }
    }

    let scale = 255.0 / area.max(1) as f32;
    let mut lut = [0u8; 256];
    let mut sum = 0u32;
    for (i, &count) in hist.iter().enumerate() {
        sum += count;
        lut[i] = (sum as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::contrast;

    fn gradient(w: u32, h: u32, lo: u8, hi: u8) -> GrayImage {
        GrayImage::from_fn(w, h, |x, _| {
            let t = x as f32 / (w - 1) as f32;
            Luma([(lo as f32 + t * (hi - lo) as f32).round() as u8])
        })
    }

    #[test]
    fn tier_boundaries() {
        let tiers = ContrastTiers::default();
        assert_eq!(EnhancementTier::for_contrast(0.0, &tiers), EnhancementTier::Heavy);
        assert_eq!(EnhancementTier::for_contrast(24.9, &tiers), EnhancementTier::Heavy);
        assert_eq!(EnhancementTier::for_contrast(25.0, &tiers), EnhancementTier::Moderate);
        assert_eq!(EnhancementTier::for_contrast(54.9, &tiers), EnhancementTier::Moderate);
        assert_eq!(EnhancementTier::for_contrast(55.0, &tiers), EnhancementTier::None);
    }

    #[test]
    fn none_tier_is_pass_through() {
        let img = gradient(32, 16, 0, 255);
        assert_eq!(EnhancementTier::None.apply(img.clone()), img);
    }

    #[test]
    fn clahe_keeps_dimensions() {
        let img = gradient(37, 23, 90, 130);
        let out = clahe(&img, 2.0, 8);
        assert_eq!(out.dimensions(), (37, 23));
    }

    #[test]
    fn clahe_maps_uniform_image_uniformly() {
        let img = GrayImage::from_pixel(64, 64, Luma([120]));
        let out = clahe(&img, 2.0, 8);
        let first = out.get_pixel(0, 0)[0];
        assert!(out.pixels().all(|p| p[0] == first));
    }

    #[test]
    fn clahe_spreads_low_contrast_texture() {
        // 4 px checkerboard of 100/104: every 32×32 tile has the same histogram.
        let img = GrayImage::from_fn(256, 256, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 { Luma([100]) } else { Luma([104]) }
        });
        let out = moderate_enhance(&img);
        assert_eq!(out.get_pixel(0, 0)[0], 103);
        assert_eq!(out.get_pixel(4, 0)[0], 109);
        assert!(contrast(&out) > contrast(&img));
    }

    #[test]
    fn clahe_handles_images_smaller_than_grid() {
        let img = gradient(3, 2, 10, 200);
        let out = clahe(&img, 3.0, 8);
        assert_eq!(out.dimensions(), (3, 2));
    }

    #[test]
    fn heavy_enhance_keeps_dimensions() {
        let img = gradient(40, 30, 100, 115);
        assert_eq!(heavy_enhance(&img).dimensions(), (40, 30));
    }

    fn checkerboard(lo: u8, hi: u8) -> GrayImage {
        GrayImage::from_fn(256, 256, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 { Luma([lo]) } else { Luma([hi]) }
        })
    }

    #[test]
    fn moderate_is_plain_clahe_at_clip_two() {
        let img = checkerboard(100, 104);
        let out = moderate_enhance(&img);
        assert_eq!(out, clahe(&img, 2.0, 8));
        // Clip 3.0 maps the same texture to 104/111.
        let stronger = clahe(&img, 3.0, 8);
        assert_eq!(stronger.get_pixel(0, 0)[0], 104);
        assert_eq!(stronger.get_pixel(4, 0)[0], 111);
        assert_ne!(out, stronger);
    }

    #[test]
    fn heavy_is_clahe_blur_then_unsharp() {
        let img = GrayImage::from_fn(64, 48, |x, y| Luma([96 + ((x * 3 + y * 5) % 17) as u8]));

        let equalized = clahe(&img, 3.0, 8);
        let blurred = gaussian_blur_f32(&equalized, 0.8);
        let expected = GrayImage::from_fn(64, 48, |x, y| {
            let e = equalized.get_pixel(x, y)[0] as f32;
            let b = blurred.get_pixel(x, y)[0] as f32;
            Luma([(1.4 * e - 0.4 * b).round().clamp(0.0, 255.0) as u8])
        });

        let out = heavy_enhance(&img);
        assert_eq!(out, expected);
        assert_ne!(out, equalized, "sharpening changes the equalized image");
        assert_ne!(out, moderate_enhance(&img));
    }

    #[test]
    fn tiers_dispatch_to_their_pipelines() {
        let img = checkerboard(100, 104);
        assert_eq!(EnhancementTier::Moderate.apply(img.clone()), moderate_enhance(&img));
        assert_eq!(EnhancementTier::Heavy.apply(img.clone()), heavy_enhance(&img));
    }
}
