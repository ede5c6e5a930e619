//! Content category base-risk table

/// Base risk per known content category
const CATEGORY_BASE_RISK: &[(&str, f64)] = &[
    ("factual", 0.10),
    ("research", 0.15),
    ("news", 0.25),
    ("satire", 0.30),
    ("opinion", 0.35),
    ("blog", 0.35),
    ("advertisement", 0.40),
    ("social_media", 0.45),
    ("propaganda", 0.70),
    ("conspiracy", 0.80),
];

/// Base risk for a normalized category label, None if unknown
pub fn base_risk(category: &str) -> Option<f64> {
    CATEGORY_BASE_RISK
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, risk)| *risk)
}

pub fn is_known_category(category: &str) -> bool {
    base_risk(category).is_some()
}
