//! Prompts for the classification and scoring stages.
//!
//! System prompts are fixed text; only the user prompt carries entity data.
//! Both ask for a bare JSON object so the response parser's first strategy
//! usually succeeds.

use sieve_core::TargetProfile;

/// Taxonomy, decision rules and output contract for classification.
pub const CLASSIFICATION_SYSTEM_PROMPT: &str = r#"
You classify companies for a family office prospecting pipeline.

Decide what kind of entity the company is, using only the text you are given.

## Entity types
- FAMILY_OFFICE: invests the capital of one family (or a small set of families) on its own behalf
- WEALTH_MANAGER: advises or manages money for outside clients (RIAs, private banks, planners)
- INVESTMENT_FUND: raises pooled capital from third-party investors (PE, VC, hedge, mutual funds)
- OPERATOR: runs an operating business (developer, property manager, builder, services firm)
- REIT: a real estate investment trust, listed or non-traded
- UNKNOWN: the text does not support any of the above

## Entity subtypes
- SFO: single-family office
- MFO: multi-family office
- FAMILY_CAPITAL: family holding company or family-owned investment vehicle
- RIA: registered investment advisor
- PRIVATE_EQUITY: private equity or venture firm
- PENSION: pension or retirement plan
- SOVEREIGN: sovereign wealth fund
- UNKNOWN: none of the above or not determinable

## Decision rules
1. Serving outside clients makes an entity a WEALTH_MANAGER, whatever it calls itself
2. Deploying its own family's capital makes an entity a FAMILY_OFFICE
3. A fund vehicle owned and capitalized by a family is FAMILY_OFFICE with subtype FAMILY_CAPITAL
4. Raising from unrelated LPs makes an entity an INVESTMENT_FUND
5. When the evidence is thin, answer UNKNOWN with low confidence rather than guessing

## Output format (JSON only, no prose)
{
  "entity_type": "FAMILY_OFFICE" | "WEALTH_MANAGER" | "INVESTMENT_FUND" | "OPERATOR" | "REIT" | "UNKNOWN",
  "entity_subtype": "SFO" | "MFO" | "FAMILY_CAPITAL" | "RIA" | "PRIVATE_EQUITY" | "PENSION" | "SOVEREIGN" | "UNKNOWN",
  "confidence": 0.0-1.0,
  "signals_positive": ["evidence that it is a family office"],
  "signals_negative": ["evidence that it is not"],
  "reason": "one sentence"
}
"#;

/// Rubric and output contract for fit scoring.
pub const SCORING_SYSTEM_PROMPT: &str = r#"
You score how well a classified entity fits a target profile.

## Scale
- 0-3: poor fit, do not pursue
- 4-5: possible fit, needs human review
- 6-10: good fit, approve for enrichment

## Rubric
1. Family offices earn credit for ANY signal that they deploy proprietary capital:
   direct deals, co-investments, named portfolio companies or properties, principal investing
2. Sparse profiles are normal for family offices. Do not penalize a short or vague website
3. Geography and asset focus matter only where the profile states a preference
4. Exclusions in the profile are hard disqualifiers
5. Recommend APPROVED at 6 or above, REVIEW at 4-5, REJECTED at 3 or below

## Output format (JSON only, no prose)
{
  "match_score": 0-10,
  "confidence": 0.0-1.0,
  "fit_reasons": ["reason"],
  "geo_match": true | false,
  "asset_focus": ["asset class"],
  "capital_indicators": ["evidence of deployable capital"],
  "recommendation": "APPROVED" | "REVIEW" | "REJECTED",
  "reasoning": "two sentences at most"
}
"#;

/// Cut `text` to at most `limit` characters, on a char boundary.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

fn or_placeholder(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        "(not provided)"
    } else {
        trimmed
    }
}

/// User prompt for one classification call.
pub fn build_classification_prompt(
    company_name: &str,
    domain: &str,
    company_text: &str,
    char_limit: usize,
) -> String {
    format!(
        "Company: {}\nDomain: {}\n\nProfile:\n{}\n\nClassify this company.",
        or_placeholder(company_name),
        or_placeholder(domain),
        or_placeholder(truncate_chars(company_text, char_limit)),
    )
}

/// User prompt for one scoring call.
///
/// `is_sfo` is `None` when the classifier could not tell.
pub fn build_scoring_prompt(
    company_name: &str,
    company_profile: &str,
    geography: &str,
    is_sfo: Option<bool>,
    target: &TargetProfile,
    char_limit: usize,
) -> String {
    let sfo_hint = match is_sfo {
        Some(true) => "true",
        Some(false) => "false",
        None => "unknown",
    };

    format!(
        "{}\n---\nCompany: {}\nGeography: {}\nSingle-family office: {}\n\nProfile:\n{}\n\nScore this company against the target profile.",
        target.render_for_prompt().trim_end(),
        or_placeholder(company_name),
        or_placeholder(geography),
        sfo_hint,
        or_placeholder(truncate_chars(company_profile, char_limit)),
    )
}
