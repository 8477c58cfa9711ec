//! Column references and their resolution.
//!
//! JSON shapes accepted:
//!   "salary"                                         // exact name
//!   { "name": "salary" }                             // exact name
//!   { "candidates": ["salary", "salario"] }          // substring match
//!   { "candidates": ["sector"], "required": false }  // optional

use crate::error::SpecError;
use crate::table::normalize_header;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ColumnRefSpec {
    Name(String),
    Detailed {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        candidates: Vec<String>,
        #[serde(default = "default_required")]
        required: bool,
    },
}

fn default_required() -> bool {
    true
}

/// Normalized column reference. Names and candidates go through the same
/// normalization as headers, so `"Data Value"` finds `data_value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub name: Option<String>,
    pub candidates: Vec<String>,
    pub required: bool,
}

impl From<&ColumnRefSpec> for ColumnRef {
    fn from(spec: &ColumnRefSpec) -> Self {
        match spec {
            ColumnRefSpec::Name(name) => ColumnRef {
                name: Some(normalize_header(name)),
                candidates: vec![],
                required: true,
            },
            ColumnRefSpec::Detailed {
                name,
                candidates,
                required,
            } => ColumnRef {
                name: name.as_deref().map(normalize_header),
                candidates: candidates.iter().map(|c| normalize_header(c)).collect(),
                required: *required,
            },
        }
    }
}

impl ColumnRef {
    /// Resolve against normalized headers.
    ///
    /// An exact name wins if present. Otherwise every header containing any
    /// candidate is a match; a header equal to a candidate beats substring
    /// matches. More than one remaining match is ambiguous.
    pub fn resolve(&self, role: &str, headers: &[String]) -> Result<Option<String>, SpecError> {
        if self.name.is_none() && self.candidates.is_empty() {
            return Err(SpecError::EmptyRef {
                role: role.to_string(),
            });
        }

        if let Some(name) = &self.name {
            if headers.iter().any(|h| h == name) {
                return Ok(Some(name.clone()));
            }
        }

        let exact: Vec<&String> = headers
            .iter()
            .filter(|h| self.candidates.iter().any(|c| *h == c))
            .collect();
        let matches: Vec<&String> = if exact.is_empty() {
            headers
                .iter()
                .filter(|h| self.candidates.iter().any(|c| h.contains(c.as_str())))
                .collect()
        } else {
            exact
        };

        match matches.as_slice() {
            [one] => Ok(Some((*one).clone())),
            [] if self.required => Err(SpecError::MissingColumn {
                role: role.to_string(),
                tried: self.name.iter().chain(&self.candidates).cloned().collect(),
            }),
            [] => Ok(None),
            many => Err(SpecError::AmbiguousColumn {
                role: role.to_string(),
                matches: many.iter().map(|s| (*s).clone()).collect(),
            }),
        }
    }
}
