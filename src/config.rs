use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Inclusive sweep of binarization levels tried for the light panel.
///
/// The 140–170 / step 10 default has no derivation beyond what worked on the
/// devices at hand; it is a tuning knob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdSweep {
    pub start: u8,
    pub end: u8,
    pub step: u8,
}

impl Default for ThresholdSweep {
    fn default() -> Self {
        ThresholdSweep { start: 140, end: 170, step: 10 }
    }
}

impl ThresholdSweep {
    /// Levels in sweep order, lowest first.
    pub fn levels(&self) -> Vec<u8> {
        (self.start..=self.end)
            .step_by(self.step.max(1) as usize)
            .collect()
    }
}

/// Contrast cut-offs selecting the dark-panel enhancement tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContrastTiers {
    /// Below this standard deviation the heavy tier runs.
    pub heavy_below: f64,
    /// Below this (and at or above `heavy_below`) the moderate tier runs.
    pub moderate_below: f64,
}

impl Default for ContrastTiers {
    fn default() -> Self {
        ContrastTiers { heavy_below: 25.0, moderate_below: 55.0 }
    }
}

fn default_strip_mode() -> bool { true }
fn default_strip_count() -> usize { 5 }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Use strip assembly for the dark-panel family.
    #[serde(default = "default_strip_mode")]
    pub strip_mode: bool,
    /// Number of horizontal bands in strip mode.
    #[serde(default = "default_strip_count")]
    pub strip_count: usize,
    /// Recognize strips on the rayon pool instead of one after another.
    #[serde(default)]
    pub parallel_strips: bool,
    #[serde(default)]
    pub threshold_sweep: ThresholdSweep,
    #[serde(default)]
    pub contrast: ContrastTiers,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        ExtractorConfig {
            strip_mode: default_strip_mode(),
            strip_count: default_strip_count(),
            parallel_strips: false,
            threshold_sweep: ThresholdSweep::default(),
            contrast: ContrastTiers::default(),
        }
    }
}

impl ExtractorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.strip_count == 0 {
            bail!("strip_count must be at least 1");
        }
        let sweep = &self.threshold_sweep;
        if sweep.step == 0 {
            bail!("threshold_sweep.step must be positive");
        }
        if sweep.start > sweep.end {
            bail!(
                "threshold_sweep.start ({}) is above threshold_sweep.end ({})",
                sweep.start,
                sweep.end
            );
        }
        let tiers = &self.contrast;
        if !(tiers.heavy_below >= 0.0 && tiers.heavy_below <= tiers.moderate_below) {
            bail!(
                "contrast tiers must satisfy 0 <= heavy_below ({}) <= moderate_below ({})",
                tiers.heavy_below,
                tiers.moderate_below
            );
        }
        Ok(())
    }
}

/// Read and validate a JSON config. Missing fields take their defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<ExtractorConfig> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let cfg: ExtractorConfig = serde_json::from_str(&text)
        .with_context(|| format!("parse error in {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config in {}", path.display()))?;
    Ok(cfg)
}

pub fn save_config(path: impl AsRef<Path>, config: &ExtractorConfig) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("cannot create config directory")?;
    }
    let text = serde_json::to_string_pretty(config).context("cannot serialise config")?;
    fs::write(path, text).with_context(|| format!("cannot write {}", path.display()))
}
