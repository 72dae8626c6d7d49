//! Index schema configuration and startup validation.
//!
//! The engine relies on two field configurations: the annotations field must
//! be whitespace-tokenized with positions, and the annotated text field must
//! index positions and store character offsets with them. Validation runs
//! before any indexing or querying; a misconfigured host fails fast.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Default name of the annotated text field.
pub const DEFAULT_TEXT_FIELD: &str = "text4annotation";
/// Default name of the annotations field.
pub const DEFAULT_ANNOT_FIELD: &str = "annotation";
/// Tokenizer the annotations field must use.
pub const WHITESPACE_TOKENIZER: &str = "whitespace";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub tokenizer: String,
    #[serde(default)]
    pub positions: bool,
    #[serde(default)]
    pub offsets: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default = "default_text_field")]
    pub text_field: String,
    #[serde(default = "default_annot_field")]
    pub annot_field: String,
    pub fields: Vec<FieldConfig>,
}

fn default_text_field() -> String {
    DEFAULT_TEXT_FIELD.to_string()
}

fn default_annot_field() -> String {
    DEFAULT_ANNOT_FIELD.to_string()
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            text_field: default_text_field(),
            annot_field: default_annot_field(),
            fields: vec![
                FieldConfig {
                    name: default_text_field(),
                    field_type: "text".to_string(),
                    tokenizer: WHITESPACE_TOKENIZER.to_string(),
                    positions: true,
                    offsets: true,
                },
                FieldConfig {
                    name: default_annot_field(),
                    field_type: "annotations".to_string(),
                    tokenizer: WHITESPACE_TOKENIZER.to_string(),
                    positions: true,
                    offsets: false,
                },
            ],
        }
    }
}

impl SchemaConfig {
    /// Load a schema from a YAML file and validate it.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path)?;
        let config: SchemaConfig = serde_yaml::from_str(&yaml).map_err(|e| {
            EngineError::Schema(format!("invalid YAML schema in {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a schema overriding the configured field names.
    pub fn with_field_names(mut self, text_field: &str, annot_field: &str) -> Self {
        for f in &mut self.fields {
            if f.name == self.text_field {
                f.name = text_field.to_string();
            } else if f.name == self.annot_field {
                f.name = annot_field.to_string();
            }
        }
        self.text_field = text_field.to_string();
        self.annot_field = annot_field.to_string();
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldConfig> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check the attributes the match engine depends on.
    pub fn validate(&self) -> Result<()> {
        let annot = self.field(&self.annot_field).ok_or_else(|| {
            EngineError::Schema(format!("missing field: {}", self.annot_field))
        })?;
        if annot.tokenizer != WHITESPACE_TOKENIZER {
            return Err(EngineError::Schema(format!(
                "the field '{}' should be configured to use the {WHITESPACE_TOKENIZER} tokenizer",
                self.annot_field
            )));
        }
        if !annot.positions {
            return Err(EngineError::Schema(format!(
                "the field '{}' should index positions",
                self.annot_field
            )));
        }

        let text = self.field(&self.text_field).ok_or_else(|| {
            EngineError::Schema(format!("missing field: {}", self.text_field))
        })?;
        if !text.positions {
            return Err(EngineError::Schema(format!(
                "the field '{}' should index positions",
                self.text_field
            )));
        }
        if !text.offsets {
            return Err(EngineError::Schema(format!(
                "the field '{}' should store offsets with positions",
                self.text_field
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_is_valid() {
        assert!(SchemaConfig::default().validate().is_ok());
    }

    #[test]
    fn test_missing_annot_field_is_rejected() {
        let mut config = SchemaConfig::default();
        config.fields.retain(|f| f.name != DEFAULT_ANNOT_FIELD);
        assert!(matches!(config.validate(), Err(EngineError::Schema(_))));
    }

    #[test]
    fn test_wrong_annot_tokenizer_is_rejected() {
        let mut config = SchemaConfig::default();
        config
            .fields
            .iter_mut()
            .find(|f| f.name == DEFAULT_ANNOT_FIELD)
            .unwrap()
            .tokenizer = "standard".to_string();
        assert!(matches!(config.validate(), Err(EngineError::Schema(_))));
    }

    #[test]
    fn test_text_field_without_offsets_is_rejected() {
        let mut config = SchemaConfig::default();
        config
            .fields
            .iter_mut()
            .find(|f| f.name == DEFAULT_TEXT_FIELD)
            .unwrap()
            .offsets = false;
        assert!(matches!(config.validate(), Err(EngineError::Schema(_))));
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = SchemaConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: SchemaConfig = serde_yaml::from_str(&yaml).unwrap();
        assert!(parsed.validate().is_ok());
        assert_eq!(parsed.text_field, config.text_field);
        assert_eq!(parsed.fields.len(), config.fields.len());
    }

    #[test]
    fn test_field_name_override() {
        let config = SchemaConfig::default().with_field_names("body", "annots");
        assert!(config.validate().is_ok());
        assert!(config.field("body").is_some());
        assert!(config.field("annots").is_some());
        assert!(config.field(DEFAULT_TEXT_FIELD).is_none());
    }
}
