pub mod enhance;
pub mod threshold;

use image::{DynamicImage, GrayImage};
use tracing::debug;

use crate::config::ExtractorConfig;
use crate::device::DeviceFamily;
use enhance::EnhancementTier;
use threshold::{clean_speckle, select_best_threshold};

/// Standard deviation of pixel intensity. Zero for an empty image.
pub fn contrast(gray: &GrayImage) -> f64 {
    let n = gray.width() as u64 * gray.height() as u64;
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    let mean = gray.pixels().map(|p| p[0] as f64).sum::<f64>() / n;
    let var = gray
        .pixels()
        .map(|p| {
            let d = p[0] as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    var.sqrt()
}

/// Condition a capture for recognition according to the device family.
///
/// The input is only read; every stage allocates its own output and the
/// superseded buffer is dropped as soon as the next one exists.
pub fn preprocess(image: &DynamicImage, family: DeviceFamily, config: &ExtractorConfig) -> GrayImage {
    let gray = image.to_luma8();
    match family {
        DeviceFamily::DarkPanel => preprocess_dark_panel(gray, config),
        DeviceFamily::LightPanel => preprocess_light_panel(gray, config),
    }
}

/// Grayscale → contrast-tiered enhancement.
fn preprocess_dark_panel(gray: GrayImage, config: &ExtractorConfig) -> GrayImage {
    let c = contrast(&gray);
    let tier = EnhancementTier::for_contrast(c, &config.contrast);
    debug!(contrast = c, ?tier, "dark-panel enhancement");
    tier.apply(gray)
}

/// Grayscale → best inverted threshold → close/open cleanup.
fn preprocess_light_panel(gray: GrayImage, config: &ExtractorConfig) -> GrayImage {
    let (best, binary) = select_best_threshold(&gray, &config.threshold_sweep);
    drop(gray);
    debug!(level = best.level, score = best.score, "light-panel binarization");
    clean_speckle(binary)
}
