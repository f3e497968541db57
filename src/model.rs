use crate::errors::ResolveError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Immutable snapshot of one sheet's properties, fetched from the backend.
/// Identity is `sheet_id`; `title` is the common lookup key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SheetMetadata {
    pub sheet_id: i32,
    pub title: String,
    pub index: i32,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_properties: Option<GridProperties>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GridProperties {
    pub row_count: u32,
    pub column_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frozen_row_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frozen_column_count: Option<u32>,
}

/// Zero-based, end-exclusive rectangular region as the backing API reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GridRange {
    pub sheet_id: i32,
    pub start_row_index: u32,
    pub end_row_index: u32,
    pub start_column_index: u32,
    pub end_column_index: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NamedRange {
    pub name: String,
    pub range: GridRange,
}

/// How a caller identifies a sheet. Decided once at the API boundary; the
/// resolver never re-inspects raw request fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetRef {
    ById(i32),
    ByName(String),
    ByIndex(i32),
}

impl SheetRef {
    /// Arbitrate the loosely-typed request shape (`sheet_id` and/or
    /// `sheet_name`, both optional). The id wins when both are supplied.
    pub fn from_parts(
        sheet_id: Option<i32>,
        sheet_name: Option<String>,
    ) -> Result<Self, ResolveError> {
        match (sheet_id, sheet_name) {
            (Some(id), _) => Ok(SheetRef::ById(id)),
            (None, Some(name)) => Ok(SheetRef::ByName(name)),
            (None, None) => Err(ResolveError::NoReference),
        }
    }
}

impl fmt::Display for SheetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetRef::ById(id) => write!(f, "id {id}"),
            SheetRef::ByName(name) => write!(f, "'{name}'"),
            SheetRef::ByIndex(index) => write!(f, "index {index}"),
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    JsonSchema,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResolveMethod {
    ExactId,
    ExactName,
    FuzzyName,
    Index,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct AlternativeMatch {
    pub sheet: SheetMetadata,
    pub similarity: f64,
}

/// One resolve call's outcome. `confidence` is 1.0 for exact matches and the
/// similarity score for fuzzy ones.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct ResolutionResult {
    pub sheet: SheetMetadata,
    pub method: ResolveMethod,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<AlternativeMatch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, JsonSchema)]
pub struct SemanticColumn {
    /// Header-row text to match, case-insensitively.
    pub column: String,
    pub sheet: String,
}

/// Range input as handlers receive it: either a plain string (A1 notation or
/// a named range) or the semantic column form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RangeInput {
    Text(String),
    Semantic { semantic: SemanticColumn },
}

impl fmt::Display for RangeInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeInput::Text(raw) => f.write_str(raw),
            RangeInput::Semantic { semantic } => {
                write!(f, "column '{}' on '{}'", semantic.column, semantic.sheet)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ResolvedRange {
    pub resolved_range: String,
    /// False when the input was already A1 notation and passed through.
    pub was_resolved: bool,
    pub original_input: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn sheet_ref_id_wins_over_name() {
        let reference = SheetRef::from_parts(Some(3), Some("Notes".to_string())).unwrap();
        assert_eq!(reference, SheetRef::ById(3));
    }

    #[test]
    fn sheet_ref_requires_some_reference() {
        assert_matches!(
            SheetRef::from_parts(None, None),
            Err(ResolveError::NoReference)
        );
    }

    #[test]
    fn range_input_deserializes_both_shapes() {
        let text: RangeInput = serde_json::from_str("\"A1:C10\"").unwrap();
        assert_eq!(text, RangeInput::Text("A1:C10".to_string()));

        let semantic: RangeInput =
            serde_json::from_str(r#"{"semantic":{"column":"Revenue","sheet":"Q3"}}"#).unwrap();
        assert_matches!(semantic, RangeInput::Semantic { .. });
    }

    #[test]
    fn resolution_result_omits_empty_alternatives() {
        let result = ResolutionResult {
            sheet: SheetMetadata {
                sheet_id: 0,
                title: "Sheet1".to_string(),
                index: 0,
                hidden: false,
                grid_properties: None,
            },
            method: ResolveMethod::ExactName,
            confidence: 1.0,
            alternatives: Vec::new(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("alternatives").is_none());
        assert_eq!(json["method"], "exact_name");
    }
}
