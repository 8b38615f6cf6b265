//! Target profile (ICP) parsing from YAML/JSON.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::schema::validate_profile_schema;

/// Errors that can occur when loading a target profile.
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("Failed to read profile file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Profile failed schema validation: {}", .0.join("; "))]
    SchemaViolation(Vec<String>),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// The Ideal Customer Profile that entities are scored against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetProfile {
    /// Short name, shown in reports
    pub name: String,

    /// One-paragraph description of the ideal entity
    pub description: String,

    /// Entity kinds that fit (e.g. "Single-family offices")
    #[serde(default)]
    pub entity_focus: Vec<String>,

    /// Preferred geographies
    #[serde(default)]
    pub geographies: Vec<String>,

    /// Asset classes of interest
    #[serde(default)]
    pub asset_focus: Vec<String>,

    /// Evidence that the entity deploys meaningful capital
    #[serde(default)]
    pub capital_indicators: Vec<String>,

    /// Hard disqualifiers
    #[serde(default)]
    pub exclusions: Vec<String>,
}

impl Default for TargetProfile {
    fn default() -> Self {
        Self {
            name: "Direct-investing family offices".to_string(),
            description: "Single-family offices and family capital vehicles that deploy \
                          their own capital directly into real estate and private markets."
                .to_string(),
            entity_focus: vec![
                "Single-family offices".to_string(),
                "Family capital and family holding companies".to_string(),
                "Multi-family offices with principal investment activity".to_string(),
            ],
            geographies: vec!["United States".to_string()],
            asset_focus: vec![
                "Real estate".to_string(),
                "Private equity".to_string(),
                "Private credit".to_string(),
                "Operating businesses".to_string(),
            ],
            capital_indicators: vec![
                "Direct or co-investments".to_string(),
                "Proprietary or principal capital".to_string(),
                "Named portfolio companies or properties".to_string(),
            ],
            exclusions: vec![
                "Advisors serving outside clients".to_string(),
                "Pooled funds raising from third-party LPs".to_string(),
            ],
        }
    }
}

impl TargetProfile {
    /// Parse a profile from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ProfileError> {
        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Parse a profile from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ProfileError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse a profile from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse a profile from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    fn from_value(value: serde_json::Value) -> Result<Self, ProfileError> {
        validate_profile_schema(&value).map_err(ProfileError::SchemaViolation)?;
        let profile: TargetProfile = serde_json::from_value(value)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Reject profiles that pass the schema but say nothing.
    fn validate(&self) -> Result<(), ProfileError> {
        if self.name.trim().is_empty() {
            return Err(ProfileError::MissingField("name".to_string()));
        }

        if self.description.trim().is_empty() {
            return Err(ProfileError::MissingField("description".to_string()));
        }

        Ok(())
    }

    /// Render the profile as a prompt section.
    pub fn render_for_prompt(&self) -> String {
        let mut out = format!("Target profile: {}\n{}\n", self.name, self.description);

        let sections: [(&str, &[String]); 5] = [
            ("Entity focus", &self.entity_focus),
            ("Geographies", &self.geographies),
            ("Asset focus", &self.asset_focus),
            ("Capital indicators", &self.capital_indicators),
            ("Exclusions", &self.exclusions),
        ];

        for (title, items) in sections {
            if items.is_empty() {
                continue;
            }
            out.push_str(&format!("\n{}:\n", title));
            for item in items {
                out.push_str(&format!("- {}\n", item));
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_PROFILE: &str = r#"
name: "Texas real estate family offices"
description: "Family offices buying multifamily assets in Texas"
geographies:
  - "Texas"
asset_focus:
  - "Multifamily"
  - "Industrial"
"#;

    #[test]
    fn test_parse_valid_profile() {
        let profile = TargetProfile::from_yaml(VALID_PROFILE).unwrap();
        assert_eq!(profile.name, "Texas real estate family offices");
        assert_eq!(profile.asset_focus.len(), 2);
        assert!(profile.exclusions.is_empty());
    }

    #[test]
    fn test_parse_json_profile() {
        let json = r#"{"name": "n", "description": "d", "geographies": ["EU"]}"#;
        let profile = TargetProfile::from_json(json).unwrap();
        assert_eq!(profile.geographies, vec!["EU".to_string()]);
    }

    #[test]
    fn test_schema_violation_reported() {
        let yaml = r#"
name: "n"
description: "d"
geographies: "Texas"
"#;
        let result = TargetProfile::from_yaml(yaml);
        assert!(matches!(result, Err(ProfileError::SchemaViolation(_))));
    }

    #[test]
    fn test_blank_description_rejected() {
        let yaml = r#"
name: "n"
description: "   "
"#;
        let result = TargetProfile::from_yaml(yaml);
        assert!(matches!(result, Err(ProfileError::MissingField(f)) if f == "description"));
    }

    #[test]
    fn test_render_skips_empty_sections() {
        let profile = TargetProfile::from_yaml(VALID_PROFILE).unwrap();
        let rendered = profile.render_for_prompt();
        assert!(rendered.contains("Geographies:\n- Texas"));
        assert!(rendered.contains("- Industrial"));
        assert!(!rendered.contains("Exclusions"));
    }

    #[test]
    fn test_default_profile_is_schema_valid() {
        let value = serde_json::to_value(TargetProfile::default()).unwrap();
        assert!(validate_profile_schema(&value).is_ok());
    }
}
