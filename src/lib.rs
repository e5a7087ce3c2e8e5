//! Reads a single mg/dL value off a photo of a medical-device LCD.
//!
//! Two display families are supported: a dark panel with light text, read
//! band by band to recover top-to-bottom order, and a light panel that is
//! binarized with a small threshold search before recognition. Text
//! recognition itself is pluggable through [`Recognizer`].

pub mod classify;
pub mod confidence;
pub mod config;
pub mod device;
pub mod extractor;
pub mod ocr;
pub mod preprocess;
pub mod result;
pub mod strips;
pub mod text;

pub use classify::{classify, TestType};
pub use confidence::CONFIDENCE_GATE;
pub use config::{load_config, save_config, ContrastTiers, ExtractorConfig, ThresholdSweep};
pub use device::DeviceFamily;
pub use extractor::Extractor;
pub use ocr::{RecognitionOutput, Recognizer, Rect, TextBlock, TextLine};
pub use result::{ExtractionResult, StripResult};

#[cfg(feature = "oar")]
pub use ocr::oar::OarRecognizer;
