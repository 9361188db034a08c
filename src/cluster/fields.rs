//! TOML-configurable grouping field spec
//!
//! The universe of candidate grouping fields is configuration, not
//! code: an ordered list of (record attribute, output label) bindings
//! loaded from TOML, with an embedded default pack so zero-config runs
//! work out of the box. Order matters twice over: subset enumeration
//! follows it, and the stratified mode takes its primary pair from it.

use crate::record::Record;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A groupable attribute of the canonical record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    AgeBracket,
    IncomeBracket,
    Gender,
    Profession,
    Brand,
    CityId,
    CityName,
}

impl Field {
    /// The attribute's value on a record, or None when the record does
    /// not carry it (only possible for the optional attributes).
    pub fn value<'a>(&self, record: &'a Record) -> Option<&'a str> {
        match self {
            Field::AgeBracket => Some(&record.age_bracket),
            Field::IncomeBracket => Some(&record.income_bracket),
            Field::Gender => Some(&record.gender),
            Field::Profession => Some(&record.profession),
            Field::Brand => Some(&record.brand),
            Field::CityId => Some(&record.city_id),
            Field::CityName => record.city_name.as_deref(),
        }
    }
}

/// One (field, output label) binding from the spec file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldBinding {
    pub field: Field,
    pub label: String,
}

/// Ordered list of grouping fields. Static after load.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    bindings: Vec<FieldBinding>,
}

impl FieldSpec {
    /// Build a spec from explicit bindings.
    ///
    /// # Errors
    /// Returns an error on duplicate fields or duplicate output labels.
    pub fn new(bindings: Vec<FieldBinding>) -> Result<Self> {
        for (i, binding) in bindings.iter().enumerate() {
            for other in &bindings[i + 1..] {
                if binding.field == other.field {
                    anyhow::bail!("Duplicate grouping field '{:?}' in spec", binding.field);
                }
                if binding.label == other.label {
                    anyhow::bail!("Duplicate output label '{}' in spec", binding.label);
                }
            }
        }
        Ok(Self { bindings })
    }

    /// Load a field spec from a TOML file.
    ///
    /// # Example TOML
    /// ```toml
    /// [[field]]
    /// field = "age_bracket"
    /// label = "AgeGroup"
    ///
    /// [[field]]
    /// field = "gender"
    /// label = "Gender"
    /// ```
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read field spec: {}", path.as_ref().display()))?;
        Self::parse_toml(&content)
    }

    /// Default field pack for tele-calling data.
    ///
    /// Uses the embedded fields-default.toml compiled into the binary
    /// for zero-config operation.
    pub fn default_calling_fields() -> Result<Self> {
        const DEFAULT_TOML: &str = include_str!("../../fields-default.toml");
        Self::parse_toml(DEFAULT_TOML).context("Failed to parse embedded fields-default.toml")
    }

    fn parse_toml(content: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct FieldFile {
            field: Vec<FieldBinding>,
        }

        let file: FieldFile =
            toml::from_str(content).context("Failed to parse TOML field spec")?;
        Self::new(file.field)
    }

    pub fn bindings(&self) -> &[FieldBinding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Position of a field within the spec, if configured.
    pub fn position(&self, field: Field) -> Option<usize> {
        self.bindings.iter().position(|b| b.field == field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(field: Field, label: &str) -> FieldBinding {
        FieldBinding {
            field,
            label: label.to_string(),
        }
    }

    #[test]
    fn test_default_pack_loads() {
        let spec = FieldSpec::default_calling_fields().unwrap();
        assert_eq!(spec.len(), 6);
        assert_eq!(spec.bindings()[0].field, Field::AgeBracket);
        assert_eq!(spec.bindings()[0].label, "AgeGroup");
        assert_eq!(spec.bindings()[1].field, Field::IncomeBracket);
        assert_eq!(spec.bindings()[5].field, Field::CityId);
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let result = FieldSpec::new(vec![
            binding(Field::Gender, "Gender"),
            binding(Field::Gender, "Gender2"),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let result = FieldSpec::new(vec![
            binding(Field::Gender, "Segment"),
            binding(Field::Brand, "Segment"),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_toml_spec() {
        let spec = FieldSpec::parse_toml(
            r#"
            [[field]]
            field = "brand"
            label = "Brand"

            [[field]]
            field = "city_name"
            label = "City"
            "#,
        )
        .unwrap();
        assert_eq!(spec.len(), 2);
        assert_eq!(spec.bindings()[1].field, Field::CityName);
        assert_eq!(spec.position(Field::CityName), Some(1));
        assert_eq!(spec.position(Field::Gender), None);
    }

    #[test]
    fn test_invalid_field_name_rejected() {
        let result = FieldSpec::parse_toml(
            r#"
            [[field]]
            field = "shoe_size"
            label = "ShoeSize"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_spec_is_loadable_but_empty() {
        // An empty spec loads; the engine rejects it at partition time.
        let spec = FieldSpec::new(vec![]).unwrap();
        assert!(spec.is_empty());
    }
}
