//! Validation logic for LLM-extracted analyses
//!
//! Errors make the output unusable and trigger the reparse retry; warnings are logged
//! and corrected during normalization.

use crate::model::ExtractedAnalysis;
use crate::service::risk::categories::is_known_category;

/// Maximum number of claims kept from one analysis
pub const MAX_CLAIMS: usize = 10;

/// Result of analysis validation
#[derive(Debug)]
pub struct AnalysisValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl AnalysisValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: String) {
        self.is_valid = false;
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }
}

/// Validate an extracted analysis against the expected schema
pub fn validate_extracted_analysis(analysis: &ExtractedAnalysis) -> AnalysisValidationResult {
    let mut result = AnalysisValidationResult::valid();

    match analysis.category.as_deref().map(str::trim) {
        None | Some("") => result.add_error("Analysis is missing a category".to_string()),
        Some(category) => {
            if !is_known_category(&normalize_category(category)) {
                result.add_warning(format!(
                    "Unknown category '{}' will be scored with the default risk",
                    category
                ));
            }
        }
    }

    let blank_claims = analysis
        .claims
        .iter()
        .filter(|c| c.trim().is_empty())
        .count();
    if blank_claims > 0 {
        result.add_warning(format!("{} blank claim(s) dropped", blank_claims));
    }

    if analysis.claims.len() > MAX_CLAIMS {
        result.add_warning(format!(
            "{} claims extracted, keeping the first {}",
            analysis.claims.len(),
            MAX_CLAIMS
        ));
    }

    match analysis.confidence {
        None => result.add_warning("Confidence missing, defaulting to 0.0".to_string()),
        Some(c) if !(0.0..=1.0).contains(&c) => {
            result.add_warning(format!("Confidence {} out of range, clamped", c))
        }
        Some(_) => {}
    }

    result
}

/// Lowercase snake_case form of a category or flag label
pub fn normalize_category(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(category: Option<&str>) -> ExtractedAnalysis {
        ExtractedAnalysis {
            category: category.map(str::to_string),
            claims: vec!["The bridge opened in 1932.".to_string()],
            confidence: Some(0.8),
            ..ExtractedAnalysis::default()
        }
    }

    #[test]
    fn test_valid_analysis() {
        let result = validate_extracted_analysis(&analysis(Some("news")));
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_missing_category_is_error() {
        assert!(!validate_extracted_analysis(&analysis(None)).is_valid);
        let blank = validate_extracted_analysis(&analysis(Some("  ")));
        assert!(!blank.is_valid);
        assert!(blank.errors[0].contains("category"));
    }

    #[test]
    fn test_unknown_category_is_warning() {
        let result = validate_extracted_analysis(&analysis(Some("press release")));
        assert!(result.is_valid);
        assert!(result.warnings[0].contains("Unknown category"));
    }

    #[test]
    fn test_confidence_warnings() {
        let mut missing = analysis(Some("news"));
        missing.confidence = None;
        let result = validate_extracted_analysis(&missing);
        assert!(result.is_valid);
        assert!(result.warnings[0].contains("defaulting to 0.0"));

        let mut high = analysis(Some("news"));
        high.confidence = Some(1.7);
        assert!(validate_extracted_analysis(&high).warnings[0].contains("clamped"));
    }

    #[test]
    fn test_normalize_category() {
        assert_eq!(normalize_category(" Social Media "), "social_media");
        assert_eq!(normalize_category("social-media"), "social_media");
        assert_eq!(normalize_category("NEWS"), "news");
    }
}
