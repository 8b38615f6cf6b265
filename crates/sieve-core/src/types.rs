//! Core types for Sieve screening.
//!
//! Every label the pipeline exchanges is a closed enum. Model output is
//! normalized into these types at the boundary (see [`EntityType::from_label`])
//! so downstream code matches exhaustively instead of comparing strings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Clamp a confidence value into `[0.0, 1.0]`.
///
/// NaN is treated as zero confidence.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Normalize a free-text label: uppercase, spaces and hyphens to underscores.
fn normalize_label(label: &str) -> String {
    label
        .trim()
        .to_uppercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

// =============================================================================
// Entity taxonomy
// =============================================================================

/// The kind of business an entity is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    FamilyOffice,
    WealthManager,
    InvestmentFund,
    Operator,
    Reit,
    Unknown,
}

impl EntityType {
    /// All entity types, in report order.
    pub const ALL: [EntityType; 6] = [
        EntityType::FamilyOffice,
        EntityType::WealthManager,
        EntityType::InvestmentFund,
        EntityType::Operator,
        EntityType::Reit,
        EntityType::Unknown,
    ];

    /// Wire label (e.g. `FAMILY_OFFICE`).
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::FamilyOffice => "FAMILY_OFFICE",
            EntityType::WealthManager => "WEALTH_MANAGER",
            EntityType::InvestmentFund => "INVESTMENT_FUND",
            EntityType::Operator => "OPERATOR",
            EntityType::Reit => "REIT",
            EntityType::Unknown => "UNKNOWN",
        }
    }

    /// Parse a label leniently (`"Family Office"`, `"family-office"`, ...).
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = normalize_label(label);
        Self::ALL.into_iter().find(|t| t.as_str() == normalized)
    }

    /// True for concrete types that are definitely not a family office.
    pub fn is_non_family_office(&self) -> bool {
        matches!(
            self,
            EntityType::WealthManager
                | EntityType::InvestmentFund
                | EntityType::Operator
                | EntityType::Reit
        )
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Finer-grained structure of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntitySubtype {
    Sfo,
    Mfo,
    FamilyCapital,
    Ria,
    PrivateEquity,
    Pension,
    Sovereign,
    Unknown,
}

impl EntitySubtype {
    pub const ALL: [EntitySubtype; 8] = [
        EntitySubtype::Sfo,
        EntitySubtype::Mfo,
        EntitySubtype::FamilyCapital,
        EntitySubtype::Ria,
        EntitySubtype::PrivateEquity,
        EntitySubtype::Pension,
        EntitySubtype::Sovereign,
        EntitySubtype::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntitySubtype::Sfo => "SFO",
            EntitySubtype::Mfo => "MFO",
            EntitySubtype::FamilyCapital => "FAMILY_CAPITAL",
            EntitySubtype::Ria => "RIA",
            EntitySubtype::PrivateEquity => "PRIVATE_EQUITY",
            EntitySubtype::Pension => "PENSION",
            EntitySubtype::Sovereign => "SOVEREIGN",
            EntitySubtype::Unknown => "UNKNOWN",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = normalize_label(label);
        Self::ALL.into_iter().find(|s| s.as_str() == normalized)
    }

    /// Whether the scorer should treat the entity as a single-family office.
    ///
    /// An unknown subtype gets the benefit of the doubt.
    pub fn implies_sfo(&self) -> bool {
        matches!(self, EntitySubtype::Sfo | EntitySubtype::Unknown)
    }
}

impl fmt::Display for EntitySubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Firewall
// =============================================================================

/// Outcome of the heuristic firewall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FirewallVerdict {
    /// Definitely not a family office.
    Reject,
    /// Strong family office signals.
    Pass,
    /// No signal either way; a model call is needed.
    Uncertain,
}

/// Cost tag attached to a firewall decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirewallCost {
    Free,
    LlmRequired,
}

/// Decision produced by the heuristic firewall. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirewallDecision {
    pub decision: FirewallVerdict,

    /// Only `WealthManager`, `InvestmentFund`, `FamilyOffice` or `Unknown`.
    pub entity_type: EntityType,

    /// Confidence in `[0.0, 1.0]`
    pub confidence: f64,

    /// Human-readable explanation, naming the matched signal(s)
    pub reason: String,

    pub cost: FirewallCost,
}

impl FirewallDecision {
    pub fn reject(entity_type: EntityType, confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            decision: FirewallVerdict::Reject,
            entity_type,
            confidence: clamp_confidence(confidence),
            reason: reason.into(),
            cost: FirewallCost::Free,
        }
    }

    pub fn pass(confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            decision: FirewallVerdict::Pass,
            entity_type: EntityType::FamilyOffice,
            confidence: clamp_confidence(confidence),
            reason: reason.into(),
            cost: FirewallCost::Free,
        }
    }

    pub fn uncertain() -> Self {
        Self {
            decision: FirewallVerdict::Uncertain,
            entity_type: EntityType::Unknown,
            confidence: 0.0,
            reason: "No decisive signals; model classification required".to_string(),
            cost: FirewallCost::LlmRequired,
        }
    }

    pub fn is_uncertain(&self) -> bool {
        self.decision == FirewallVerdict::Uncertain
    }
}

// =============================================================================
// Classification
// =============================================================================

/// Which stage produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    FirewallHeuristic,
    LlmClassification,
    Error,
}

impl ClassificationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationSource::FirewallHeuristic => "firewall_heuristic",
            ClassificationSource::LlmClassification => "llm_classification",
            ClassificationSource::Error => "error",
        }
    }
}

/// Cost tag for a pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostTag {
    Free,
    GeminiCall,
    Error,
}

impl CostTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostTag::Free => "free",
            CostTag::GeminiCall => "gemini_call",
            CostTag::Error => "error",
        }
    }
}

impl fmt::Display for CostTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of one entity. Created once per entity per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub entity_type: EntityType,
    pub entity_subtype: EntitySubtype,

    /// Confidence in `[0.0, 1.0]`
    pub confidence: f64,

    #[serde(default)]
    pub signals_positive: Vec<String>,

    #[serde(default)]
    pub signals_negative: Vec<String>,

    pub reason: String,
    pub source: ClassificationSource,
    pub cost: CostTag,

    /// Estimated model spend for this classification, in USD
    #[serde(default)]
    pub spend_usd: f64,
}

impl ClassificationResult {
    /// Lift a decisive firewall decision into a classification.
    ///
    /// Returns `None` for `Uncertain` decisions, which need a model call.
    pub fn from_firewall(decision: &FirewallDecision) -> Option<Self> {
        let entity_type = match decision.decision {
            FirewallVerdict::Reject => decision.entity_type,
            FirewallVerdict::Pass => EntityType::FamilyOffice,
            FirewallVerdict::Uncertain => return None,
        };

        let (signals_positive, signals_negative) = match decision.decision {
            FirewallVerdict::Pass => (vec![decision.reason.clone()], vec![]),
            _ => (vec![], vec![decision.reason.clone()]),
        };

        Some(Self {
            entity_type,
            entity_subtype: EntitySubtype::Unknown,
            confidence: clamp_confidence(decision.confidence),
            signals_positive,
            signals_negative,
            reason: decision.reason.clone(),
            source: ClassificationSource::FirewallHeuristic,
            cost: CostTag::Free,
            spend_usd: 0.0,
        })
    }

    /// Error-sourced classification. Never thrown, always returned.
    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            entity_type: EntityType::Unknown,
            entity_subtype: EntitySubtype::Unknown,
            confidence: 0.0,
            signals_positive: vec![],
            signals_negative: vec![message.clone()],
            reason: format!("Classification failed: {}", message),
            source: ClassificationSource::Error,
            cost: CostTag::Error,
            spend_usd: 0.0,
        }
    }

    pub fn is_error(&self) -> bool {
        self.source == ClassificationSource::Error
    }

    /// First error message, if this is an error result.
    pub fn error_message(&self) -> Option<&str> {
        if self.is_error() {
            self.signals_negative.first().map(String::as_str)
        } else {
            None
        }
    }
}

// =============================================================================
// Scoring
// =============================================================================

/// Final disposition for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Approved,
    Review,
    Rejected,
}

/// The pipeline's final status uses the same three values.
pub type FoStatus = Recommendation;

impl Recommendation {
    /// Threshold mapping: `>= 6` approved, `4..=5` review, `<= 3` rejected.
    pub fn from_score(match_score: u8) -> Self {
        match match_score {
            s if s >= 6 => Recommendation::Approved,
            4 | 5 => Recommendation::Review,
            _ => Recommendation::Rejected,
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match normalize_label(label).as_str() {
            "APPROVED" | "APPROVE" => Some(Recommendation::Approved),
            "REVIEW" => Some(Recommendation::Review),
            "REJECTED" | "REJECT" => Some(Recommendation::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Approved => "APPROVED",
            Recommendation::Review => "REVIEW",
            Recommendation::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which stage produced a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    LlmScoring,
    Error,
}

/// Fit score for a classified entity. At most one per entity per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Fit score in `0..=10`
    pub match_score: u8,

    /// Confidence in `[0.0, 1.0]`
    pub confidence: f64,

    #[serde(default)]
    pub fit_reasons: Vec<String>,

    #[serde(default)]
    pub geo_match: bool,

    #[serde(default)]
    pub asset_focus: Vec<String>,

    #[serde(default)]
    pub capital_indicators: Vec<String>,

    /// Model recommendation; `None` when the model omitted it.
    pub recommendation: Option<Recommendation>,

    #[serde(default)]
    pub reasoning: String,

    pub source: ScoreSource,
    pub cost: CostTag,

    #[serde(default)]
    pub spend_usd: f64,
}

impl ScoreResult {
    /// Maximum fit score.
    pub const MAX_SCORE: u8 = 10;

    /// Error-sourced score: zero, rejected.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            match_score: 0,
            confidence: 0.0,
            fit_reasons: vec![],
            geo_match: false,
            asset_focus: vec![],
            capital_indicators: vec![],
            recommendation: Some(Recommendation::Rejected),
            reasoning: message.into(),
            source: ScoreSource::Error,
            cost: CostTag::Error,
            spend_usd: 0.0,
        }
    }

    pub fn is_error(&self) -> bool {
        self.source == ScoreSource::Error
    }

    /// Recommendation from the model, falling back to score thresholds.
    pub fn disposition(&self) -> Recommendation {
        self.recommendation
            .unwrap_or_else(|| Recommendation::from_score(self.match_score))
    }

    /// What the thresholds alone would say.
    pub fn threshold_recommendation(&self) -> Recommendation {
        Recommendation::from_score(self.match_score)
    }
}

// =============================================================================
// Pipeline outcome
// =============================================================================

/// Where the orchestrator stopped for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    /// Rejected as a concrete non-family-office type.
    EntityTypeGate,
    /// Rejected as unknown with too little confidence.
    LowConfidenceGate,
    /// Went through scoring.
    Scored,
}

/// Terminal result for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub company: String,
    pub classification: ClassificationResult,

    /// `None` whenever a gate stopped the entity before scoring
    pub score: Option<ScoreResult>,

    /// The scorer's own recommendation, if it gave one
    pub recommendation: Option<Recommendation>,

    pub fo_status: FoStatus,
    pub gate: Gate,

    /// Stage cost tags joined with `+` (e.g. `free`, `gemini_call+gemini_call`)
    pub total_cost: String,

    pub combined_confidence: f64,

    #[serde(default)]
    pub spend_usd: f64,
}

impl PipelineOutcome {
    /// True if any stage ended in an error result.
    pub fn has_error(&self) -> bool {
        self.classification.is_error() || self.score.as_ref().is_some_and(ScoreResult::is_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_label_normalization() {
        assert_eq!(EntityType::from_label("FAMILY_OFFICE"), Some(EntityType::FamilyOffice));
        assert_eq!(EntityType::from_label("Family Office"), Some(EntityType::FamilyOffice));
        assert_eq!(EntityType::from_label(" wealth-manager "), Some(EntityType::WealthManager));
        assert_eq!(EntityType::from_label("reit"), Some(EntityType::Reit));
        assert_eq!(EntityType::from_label("Family_Offices"), None);
    }

    #[test]
    fn test_entity_type_serde_labels() {
        let json = serde_json::to_string(&EntityType::InvestmentFund).unwrap();
        assert_eq!(json, "\"INVESTMENT_FUND\"");
        let reit: EntityType = serde_json::from_str("\"REIT\"").unwrap();
        assert_eq!(reit, EntityType::Reit);
    }

    #[test]
    fn test_subtype_sfo_hint() {
        assert!(EntitySubtype::Sfo.implies_sfo());
        assert!(EntitySubtype::Unknown.implies_sfo());
        assert!(!EntitySubtype::Mfo.implies_sfo());
        assert!(!EntitySubtype::FamilyCapital.implies_sfo());
    }

    #[test]
    fn test_recommendation_thresholds() {
        assert_eq!(Recommendation::from_score(10), Recommendation::Approved);
        assert_eq!(Recommendation::from_score(6), Recommendation::Approved);
        assert_eq!(Recommendation::from_score(5), Recommendation::Review);
        assert_eq!(Recommendation::from_score(4), Recommendation::Review);
        assert_eq!(Recommendation::from_score(3), Recommendation::Rejected);
        assert_eq!(Recommendation::from_score(0), Recommendation::Rejected);
    }

    #[test]
    fn test_disposition_prefers_model_recommendation() {
        let mut score = ScoreResult::error("x");
        score.match_score = 8;
        score.recommendation = Some(Recommendation::Review);
        assert_eq!(score.disposition(), Recommendation::Review);

        score.recommendation = None;
        assert_eq!(score.disposition(), Recommendation::Approved);
    }

    #[test]
    fn test_classification_from_firewall() {
        let reject = FirewallDecision::reject(EntityType::WealthManager, 0.95, "wm");
        let result = ClassificationResult::from_firewall(&reject).unwrap();
        assert_eq!(result.entity_type, EntityType::WealthManager);
        assert_eq!(result.entity_subtype, EntitySubtype::Unknown);
        assert_eq!(result.source, ClassificationSource::FirewallHeuristic);
        assert_eq!(result.cost, CostTag::Free);
        assert_eq!(result.confidence, 0.95);

        let pass = FirewallDecision::pass(0.5, "fo");
        let result = ClassificationResult::from_firewall(&pass).unwrap();
        assert_eq!(result.entity_type, EntityType::FamilyOffice);

        assert!(ClassificationResult::from_firewall(&FirewallDecision::uncertain()).is_none());
    }

    #[test]
    fn test_classification_error_shape() {
        let result = ClassificationResult::error("connection reset");
        assert_eq!(result.entity_type, EntityType::Unknown);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.source, ClassificationSource::Error);
        assert_eq!(result.cost, CostTag::Error);
        assert_eq!(result.error_message(), Some("connection reset"));
    }

    #[test]
    fn test_clamp_confidence() {
        assert_eq!(clamp_confidence(1.7), 1.0);
        assert_eq!(clamp_confidence(-0.2), 0.0);
        assert_eq!(clamp_confidence(f64::NAN), 0.0);
        assert_eq!(clamp_confidence(0.42), 0.42);
    }
}
