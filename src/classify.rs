use serde::{Deserialize, Serialize};

/// Measurement category shown on the device display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    Glucose,
    Creatinine,
    Cholesterol,
}

impl TestType {
    pub fn display_name(&self) -> &'static str {
        match self {
            TestType::Glucose => "Glucose",
            TestType::Creatinine => "Creatinine",
            TestType::Cholesterol => "Cholesterol",
        }
    }

    pub fn unit(&self) -> &'static str {
        "mg/dL"
    }
}

// Checked in this order; the first family with a hit wins.
const KEYWORDS: &[(TestType, &[&str])] = &[
    (TestType::Cholesterol, &["CHOLE", "CHOL", "CHO"]),
    (TestType::Glucose, &["GLU", "GLUCOSE"]),
    (TestType::Creatinine, &["CRE", "CREAT", "CREATININE"]),
];

/// Guess the test type from recognized text. Falls back to glucose.
///
/// This is a pre-selection hint for the operator, not a diagnosis.
pub fn classify(text: &str) -> TestType {
    let upper = text.to_uppercase();
    KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| upper.contains(w)))
        .map(|(kind, _)| *kind)
        .unwrap_or(TestType::Glucose)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_families() {
        assert_eq!(classify("Cholesterol 180 mg/dL"), TestType::Cholesterol);
        assert_eq!(classify("glu 98"), TestType::Glucose);
        assert_eq!(classify("CREATININE 1.1"), TestType::Creatinine);
        assert_eq!(classify("cre"), TestType::Creatinine);
    }

    #[test]
    fn cholesterol_checked_before_others() {
        assert_eq!(classify("CHO GLU CRE"), TestType::Cholesterol);
        assert_eq!(classify("GLU CRE"), TestType::Glucose);
    }

    #[test]
    fn defaults_to_glucose() {
        assert_eq!(classify(""), TestType::Glucose);
        assert_eq!(classify("Result 118 mg/dL"), TestType::Glucose);
    }

    #[test]
    fn metadata() {
        assert_eq!(TestType::Creatinine.display_name(), "Creatinine");
        assert_eq!(TestType::Cholesterol.unit(), "mg/dL");
    }
}
