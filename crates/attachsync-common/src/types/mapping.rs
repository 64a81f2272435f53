//! Source-to-target attachment field mappings

use super::FieldId;
use crate::error::{CommonError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

/// Pairs one source attachment field with the target field that receives its files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    #[serde(rename = "Source", alias = "source")]
    pub source: FieldId,
    #[serde(rename = "Target", alias = "target")]
    pub target: FieldId,
}

/// Ordered, non-empty list of mappings with unique source fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMappings", into = "String")]
pub struct FieldMappings(Vec<FieldMapping>);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMappings {
    Text(String),
    List(Vec<FieldMapping>),
}

impl TryFrom<RawMappings> for FieldMappings {
    type Error = CommonError;

    fn try_from(raw: RawMappings) -> Result<Self> {
        match raw {
            RawMappings::Text(text) => text.parse(),
            RawMappings::List(list) => Self::new(list),
        }
    }
}

impl FieldMappings {
    pub fn new(mappings: Vec<FieldMapping>) -> Result<Self> {
        if mappings.is_empty() {
            return Err(CommonError::InvalidMapping(
                "at least one attachment field mapping is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for mapping in &mappings {
            if mapping.source <= 0 || mapping.target <= 0 {
                return Err(CommonError::InvalidMapping(format!(
                    "field ids must be positive: {}|{}",
                    mapping.source, mapping.target
                )));
            }
            if !seen.insert(mapping.source) {
                return Err(CommonError::InvalidMapping(format!(
                    "source field {} is mapped more than once",
                    mapping.source
                )));
            }
        }

        Ok(Self(mappings))
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldMapping> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn source_field_ids(&self) -> Vec<FieldId> {
        self.0.iter().map(|m| m.source).collect()
    }
}

/// Parses `source|target` pairs separated by commas, e.g. `1001|2001, 1002|2002`
impl FromStr for FieldMappings {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Err(CommonError::InvalidMapping("mapping string is empty".to_string()));
        }

        let mappings = s
            .split(',')
            .map(|pair| {
                let ids: Vec<&str> = pair.split('|').map(str::trim).collect();
                let [source, target] = ids.as_slice() else {
                    return Err(CommonError::InvalidMapping(format!(
                        "'{}' is not a source|target pair",
                        pair.trim()
                    )));
                };
                Ok(FieldMapping {
                    source: parse_id(source)?,
                    target: parse_id(target)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(mappings)
    }
}

impl std::fmt::Display for FieldMappings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pairs: Vec<String> = self
            .0
            .iter()
            .map(|m| format!("{}|{}", m.source, m.target))
            .collect();
        write!(f, "{}", pairs.join(","))
    }
}

impl From<FieldMappings> for String {
    fn from(value: FieldMappings) -> Self {
        value.to_string()
    }
}

/// Parse a positive numeric id
pub fn parse_id(value: &str) -> Result<FieldId> {
    let value = value.trim();
    match value.parse::<FieldId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(CommonError::InvalidId(format!("'{}' is not a valid id", value))),
    }
}
