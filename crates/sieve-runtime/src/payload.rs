//! Lenient shapes for model JSON.
//!
//! Models drift from the requested contract: numbers arrive as strings,
//! lists arrive as a single string, labels arrive in prose case. Fields
//! are captured as raw JSON values and normalized here, so only a
//! non-object response (or a missing score) is a shape error.

use serde::Deserialize;
use serde_json::Value;

use sieve_core::{
    clamp_confidence, ClassificationResult, ClassificationSource, CostTag, EntitySubtype,
    EntityType, Recommendation, ScoreResult, ScoreSource,
};

/// Classification object as returned by the model.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ClassificationPayload {
    entity_type: Value,
    entity_subtype: Value,
    confidence: Value,
    signals_positive: Value,
    signals_negative: Value,
    reason: Value,
}

impl ClassificationPayload {
    pub(crate) fn into_result(self, spend_usd: f64) -> ClassificationResult {
        let entity_type = text(&self.entity_type)
            .and_then(EntityType::from_label)
            .unwrap_or(EntityType::Unknown);
        let entity_subtype = text(&self.entity_subtype)
            .and_then(EntitySubtype::from_label)
            .unwrap_or(EntitySubtype::Unknown);

        ClassificationResult {
            entity_type,
            entity_subtype,
            confidence: confidence(&self.confidence),
            signals_positive: string_list(self.signals_positive),
            signals_negative: string_list(self.signals_negative),
            reason: text(&self.reason).unwrap_or_default().to_string(),
            source: ClassificationSource::LlmClassification,
            cost: CostTag::GeminiCall,
            spend_usd,
        }
    }
}

/// Score object as returned by the model.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ScorePayload {
    match_score: Value,
    confidence: Value,
    fit_reasons: Value,
    geo_match: Value,
    asset_focus: Value,
    capital_indicators: Value,
    recommendation: Value,
    reasoning: Value,
}

impl ScorePayload {
    /// Fails only when no usable `match_score` is present.
    pub(crate) fn into_result(self, spend_usd: f64) -> Result<ScoreResult, String> {
        let raw_score = number(&self.match_score)
            .filter(|n| n.is_finite())
            .ok_or_else(|| format!("missing or non-numeric match_score: {}", self.match_score))?;

        Ok(ScoreResult {
            match_score: clamp_score(raw_score),
            confidence: confidence(&self.confidence),
            fit_reasons: string_list(self.fit_reasons),
            geo_match: flag(&self.geo_match),
            asset_focus: string_list(self.asset_focus),
            capital_indicators: string_list(self.capital_indicators),
            recommendation: text(&self.recommendation).and_then(Recommendation::from_label),
            reasoning: text(&self.reasoning).unwrap_or_default().to_string(),
            source: ScoreSource::LlmScoring,
            cost: CostTag::GeminiCall,
            spend_usd,
        })
    }
}

fn clamp_score(raw: f64) -> u8 {
    raw.round().clamp(0.0, f64::from(ScoreResult::MAX_SCORE)) as u8
}

fn text(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim()),
        _ => None,
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `"85%"` is a percentage. Any other value is a fraction clamped to
/// [0, 1], so a bare `85` saturates rather than being rescaled.
fn confidence(value: &Value) -> f64 {
    let parsed = match value {
        Value::String(s) => match s.trim().strip_suffix('%') {
            Some(percent) => percent.trim().parse::<f64>().ok().map(|p| p / 100.0),
            None => number(value),
        },
        _ => number(value),
    };
    parsed.map(clamp_confidence).unwrap_or(0.0)
}

fn flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes"),
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    }
}

fn string_list(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn classification(value: Value) -> ClassificationResult {
        serde_json::from_value::<ClassificationPayload>(value)
            .unwrap()
            .into_result(0.0)
    }

    fn score(value: Value) -> Result<ScoreResult, String> {
        serde_json::from_value::<ScorePayload>(value)
            .unwrap()
            .into_result(0.0)
    }

    #[test]
    fn test_classification_well_formed() {
        let result = classification(json!({
            "entity_type": "FAMILY_OFFICE",
            "entity_subtype": "SFO",
            "confidence": 0.85,
            "signals_positive": ["invests family capital"],
            "signals_negative": [],
            "reason": "Single family investing its own money"
        }));

        assert_eq!(result.entity_type, EntityType::FamilyOffice);
        assert_eq!(result.entity_subtype, EntitySubtype::Sfo);
        assert_eq!(result.confidence, 0.85);
        assert_eq!(result.signals_positive, vec!["invests family capital"]);
        assert_eq!(result.source, ClassificationSource::LlmClassification);
        assert_eq!(result.cost, CostTag::GeminiCall);
    }

    #[test]
    fn test_classification_drifted_labels() {
        let result = classification(json!({
            "entity_type": "Family Office",
            "entity_subtype": "family-capital",
            "confidence": "0.7",
            "signals_positive": "owns a portfolio of apartments"
        }));

        assert_eq!(result.entity_type, EntityType::FamilyOffice);
        assert_eq!(result.entity_subtype, EntitySubtype::FamilyCapital);
        assert_eq!(result.confidence, 0.7);
        assert_eq!(result.signals_positive, vec!["owns a portfolio of apartments"]);
        assert!(result.signals_negative.is_empty());
        assert_eq!(result.reason, "");
    }

    #[test]
    fn test_classification_unrecognized_type_is_unknown() {
        let result = classification(json!({
            "entity_type": "HEDGE_FUND_OF_FUNDS",
            "confidence": 4.0
        }));
        assert_eq!(result.entity_type, EntityType::Unknown);
        assert_eq!(result.entity_subtype, EntitySubtype::Unknown);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_score_numeric_forms() {
        assert_eq!(score(json!({"match_score": 7})).unwrap().match_score, 7);
        assert_eq!(score(json!({"match_score": 6.6})).unwrap().match_score, 7);
        assert_eq!(score(json!({"match_score": "5"})).unwrap().match_score, 5);
        assert_eq!(score(json!({"match_score": 14})).unwrap().match_score, 10);
        assert_eq!(score(json!({"match_score": -2})).unwrap().match_score, 0);
    }

    #[test]
    fn test_percent_confidence_is_scaled() {
        let unknown = classification(json!({"entity_type": "UNKNOWN", "confidence": "40%"}));
        assert_eq!(unknown.confidence, 0.4);

        let office = classification(json!({"entity_type": "FAMILY_OFFICE", "confidence": " 85 % "}));
        assert_eq!(office.confidence, 0.85);

        let scored = score(json!({"match_score": 6, "confidence": "150%"})).unwrap();
        assert_eq!(scored.confidence, 1.0);
    }

    #[test]
    fn test_bare_confidence_above_one_is_clamped() {
        assert_eq!(classification(json!({"confidence": 85})).confidence, 1.0);
        assert_eq!(classification(json!({"confidence": "0.7"})).confidence, 0.7);
        assert_eq!(classification(json!({"confidence": "high"})).confidence, 0.0);
    }

    #[test]
    fn test_score_missing_is_error() {
        assert!(score(json!({"confidence": 0.9})).is_err());
        assert!(score(json!({"match_score": "high"})).is_err());
    }

    #[test]
    fn test_score_fields() {
        let result = score(json!({
            "match_score": 8,
            "confidence": 0.75,
            "fit_reasons": ["direct multifamily deals"],
            "geo_match": "yes",
            "asset_focus": ["multifamily", "industrial"],
            "capital_indicators": ["$200M AUM"],
            "recommendation": "approved",
            "reasoning": "Direct investor in target markets."
        }))
        .unwrap();

        assert_eq!(result.confidence, 0.75);
        assert!(result.geo_match);
        assert_eq!(result.asset_focus.len(), 2);
        assert_eq!(result.recommendation, Some(Recommendation::Approved));
        assert_eq!(result.source, ScoreSource::LlmScoring);
    }

    #[test]
    fn test_score_unrecognized_recommendation_is_none() {
        let result = score(json!({"match_score": 3, "recommendation": "MAYBE"})).unwrap();
        assert_eq!(result.recommendation, None);
        assert_eq!(result.disposition(), Recommendation::Rejected);
    }

    proptest! {
        #[test]
        fn prop_score_always_in_range(raw in proptest::num::f64::ANY) {
            if let Ok(result) = score(json!({"match_score": raw, "confidence": raw})) {
                prop_assert!(result.match_score <= ScoreResult::MAX_SCORE);
                prop_assert!((0.0..=1.0).contains(&result.confidence));
            }
        }
    }
}
