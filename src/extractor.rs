use anyhow::{ensure, Context, Result};
use image::DynamicImage;
use tracing::{debug, info};

use crate::config::ExtractorConfig;
use crate::device::DeviceFamily;
use crate::ocr::Recognizer;
use crate::preprocess::preprocess;
use crate::result::ExtractionResult;
use crate::strips::assemble_by_strips;
use crate::text::extract_from_output;

/// Public entry point: capture + device family → best trusted reading.
///
/// Owns the recognition engine for its whole lifetime; dropping the
/// extractor releases it. Holds no per-capture state, so one extractor can
/// serve any number of captures.
pub struct Extractor {
    recognizer: Box<dyn Recognizer>,
    config: ExtractorConfig,
}

impl Extractor {
    pub fn new(recognizer: Box<dyn Recognizer>, config: ExtractorConfig) -> Result<Self> {
        config.validate().context("invalid extractor config")?;
        Ok(Extractor { recognizer, config })
    }

    pub fn with_defaults(recognizer: Box<dyn Recognizer>) -> Self {
        Extractor {
            recognizer,
            config: ExtractorConfig::default(),
        }
    }

    /// Process one capture.
    ///
    /// Returns the trusted reading, if any, together with everything the
    /// engine recognized so a caller can fall back to manual entry.
    ///
    /// In strip mode (dark panel) a failing engine only blanks the affected
    /// band. On the single-shot path there is nothing to fall back to, so the
    /// engine error is returned.
    pub fn process(
        &self,
        image: &DynamicImage,
        family: DeviceFamily,
    ) -> Result<(Option<ExtractionResult>, String)> {
        ensure!(
            image.width() > 0 && image.height() > 0,
            "empty image ({}×{})",
            image.width(),
            image.height()
        );

        let prepared = preprocess(image, family, &self.config);

        if family == DeviceFamily::DarkPanel && self.config.strip_mode {
            debug!(strips = self.config.strip_count, "strip assembly");
            let (result, text) = assemble_by_strips(
                &prepared,
                self.recognizer.as_ref(),
                self.config.strip_count,
                self.config.parallel_strips,
            );
            log_outcome(family, result.as_ref());
            return Ok((result, text));
        }

        let output = self
            .recognizer
            .recognize(&prepared)
            .with_context(|| format!("text recognition failed ({})", self.recognizer.name()))?;
        drop(prepared);

        let result = extract_from_output(&output);
        log_outcome(family, result.as_ref());
        Ok((result, output.full_text))
    }
}

fn log_outcome(family: DeviceFamily, result: Option<&ExtractionResult>) {
    match result {
        Some(r) => info!(
            family = family.display_name(),
            value = r.value,
            confidence = r.confidence,
            "reading extracted"
        ),
        None => info!(family = family.display_name(), "no trusted reading"),
    }
}
