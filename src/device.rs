use serde::{Deserialize, Serialize};

/// Display style of the measuring device.
///
/// Selects both the preprocessing strategy and, for the dark panel, whether
/// strip assembly is used to recover reading order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceFamily {
    /// Dark panel with light text.
    DarkPanel,
    /// Light-blue panel, white values on darker text.
    LightPanel,
}

impl DeviceFamily {
    pub fn display_name(&self) -> &'static str {
        match self {
            DeviceFamily::DarkPanel => "Dark panel",
            DeviceFamily::LightPanel => "Light panel",
        }
    }
}
