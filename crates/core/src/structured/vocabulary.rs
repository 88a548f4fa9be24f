use serde::{Deserialize, Serialize};

use super::keys::keys_match;

/// Keys rendered outside the generic grid of every structured document.
pub const SPECIAL_KEYS: [&str; 4] = ["title", "subtitle", "notes", "footnotes"];

const LEAN_CANVAS: [&str; 9] = [
    "problem",
    "solution",
    "key_metrics",
    "unique_value_proposition",
    "unfair_advantage",
    "channels",
    "customer_segments",
    "cost_structure",
    "revenue_streams",
];

const BUSINESS_MODEL_CANVAS: [&str; 9] = [
    "key_partners",
    "key_activities",
    "key_resources",
    "value_propositions",
    "customer_relationships",
    "channels",
    "customer_segments",
    "cost_structure",
    "revenue_streams",
];

/// The fixed section keys a structured document lays out, on top of
/// [`SPECIAL_KEYS`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    domain_keys: Vec<String>,
}

impl Vocabulary {
    pub fn new<I, S>(domain_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            domain_keys: domain_keys.into_iter().map(Into::into).collect(),
        }
    }

    /// No domain sections; only the special keys are protected.
    pub fn special_only() -> Self {
        Self::default()
    }

    pub fn lean_canvas() -> Self {
        Self::new(LEAN_CANVAS)
    }

    pub fn business_model_canvas() -> Self {
        Self::new(BUSINESS_MODEL_CANVAS)
    }

    /// Look a preset up by name, as carried in document metadata.
    pub fn named(name: &str) -> Option<Self> {
        match name.to_lowercase().replace(['-', ' '], "_").as_str() {
            "lean" | "lean_canvas" => Some(Self::lean_canvas()),
            "business_model" | "business_model_canvas" | "bmc" => {
                Some(Self::business_model_canvas())
            }
            "none" | "special_only" => Some(Self::special_only()),
            _ => None,
        }
    }

    pub fn domain_keys(&self) -> impl Iterator<Item = &str> {
        self.domain_keys.iter().map(String::as_str)
    }

    pub fn is_special(&self, key: &str) -> bool {
        SPECIAL_KEYS.iter().any(|s| keys_match(s, key))
    }

    pub fn is_domain(&self, key: &str) -> bool {
        self.domain_keys.iter().any(|d| keys_match(d, key))
    }

    /// Protected keys are never deleted implicitly by the merge engine.
    pub fn is_protected(&self, key: &str) -> bool {
        self.is_special(key) || self.is_domain(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn special_keys_are_protected_in_every_vocabulary() {
        let vocab = Vocabulary::special_only();
        assert!(vocab.is_protected("Title"));
        assert!(vocab.is_protected("FOOTNOTES"));
        assert!(!vocab.is_protected("problem"));
    }

    #[test]
    fn lean_canvas_matches_spelling_variants() {
        let vocab = Vocabulary::lean_canvas();
        assert!(vocab.is_domain("Unique Value Proposition"));
        assert!(vocab.is_domain("key_metrics"));
        assert!(!vocab.is_domain("key_partners"));
        assert!(!vocab.is_special("problem"));
    }

    #[test]
    fn named_presets() {
        assert_eq!(Vocabulary::named("Lean Canvas"), Some(Vocabulary::lean_canvas()));
        assert_eq!(
            Vocabulary::named("business-model-canvas"),
            Some(Vocabulary::business_model_canvas())
        );
        assert_eq!(Vocabulary::named("swot"), None);
    }
}
