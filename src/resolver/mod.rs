//! Sheet-reference and range resolution.
//!
//! Translates user/LLM-supplied references (numeric id, name with fuzzy
//! fallback, index, named ranges, semantic columns) into canonical sheet
//! metadata and A1 notation, backed by a per-spreadsheet metadata cache.

use crate::backend::SpreadsheetBackend;
use crate::config::ResolverConfig;
use crate::errors::ResolveError;
use crate::model::{
    AlternativeMatch, RangeInput, ResolutionResult, ResolveMethod, ResolvedRange, SemanticColumn,
    SheetMetadata, SheetRef,
};
use crate::range;
use anyhow::{Result, anyhow};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::sync::Arc;

mod cache;
pub mod similarity;

use cache::MetadataCache;

const MAX_ALTERNATIVES: usize = 3;

pub struct ReferenceResolver {
    backend: Arc<dyn SpreadsheetBackend>,
    cache: MetadataCache,
    config: ResolverConfig,
}

impl ReferenceResolver {
    pub fn new(backend: Arc<dyn SpreadsheetBackend>, config: ResolverConfig) -> Self {
        let cache = MetadataCache::new(config.cache_capacity, config.cache_ttl());
        Self {
            backend,
            cache,
            config,
        }
    }

    pub fn with_defaults(backend: Arc<dyn SpreadsheetBackend>) -> Self {
        Self::new(backend, ResolverConfig::default())
    }

    /// Resolve a sheet reference against the spreadsheet's sheet list.
    ///
    /// Exact id/index matches and case-insensitive exact name matches return
    /// confidence 1.0; fuzzy name matches return the similarity score and up
    /// to three runner-ups as alternatives.
    pub async fn resolve(
        &self,
        spreadsheet_id: &str,
        reference: &SheetRef,
    ) -> Result<ResolutionResult> {
        let sheets = self.sheet_list(spreadsheet_id).await?;
        if sheets.is_empty() {
            return Err(ResolveError::NoSheets {
                spreadsheet_id: spreadsheet_id.to_string(),
            }
            .into());
        }

        match reference {
            SheetRef::ById(sheet_id) => {
                let sheet = sheets
                    .iter()
                    .find(|sheet| sheet.sheet_id == *sheet_id)
                    .ok_or_else(|| self.not_found(reference, &sheets))?;
                Ok(exact(sheet, ResolveMethod::ExactId))
            }
            SheetRef::ByIndex(index) => {
                let sheet = sheets
                    .iter()
                    .find(|sheet| sheet.index == *index)
                    .ok_or_else(|| self.not_found(reference, &sheets))?;
                Ok(exact(sheet, ResolveMethod::Index))
            }
            SheetRef::ByName(name) => self.resolve_by_name(reference, name, &sheets),
        }
    }

    /// Resolve a range input to A1 notation. Well-formed A1 input passes
    /// through unchanged; otherwise the semantic-column or named-range path
    /// applies.
    pub async fn resolve_range(
        &self,
        spreadsheet_id: &str,
        input: &RangeInput,
    ) -> Result<ResolvedRange> {
        match input {
            RangeInput::Text(raw) => {
                if range::is_a1_notation(raw) {
                    return Ok(ResolvedRange {
                        resolved_range: raw.clone(),
                        was_resolved: false,
                        original_input: raw.clone(),
                    });
                }
                self.resolve_named_range(spreadsheet_id, raw).await
            }
            RangeInput::Semantic { semantic } => {
                let resolved = self.resolve_semantic_column(spreadsheet_id, semantic).await?;
                Ok(ResolvedRange {
                    resolved_range: resolved,
                    was_resolved: true,
                    original_input: input.to_string(),
                })
            }
        }
    }

    /// Drop one spreadsheet's cached metadata. Callers must do this after any
    /// structural mutation (sheet add/delete/rename); the resolver cannot
    /// observe external changes.
    pub fn invalidate(&self, spreadsheet_id: &str) -> bool {
        tracing::debug!(spreadsheet_id, "invalidating sheet metadata");
        self.cache.invalidate(spreadsheet_id)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    async fn sheet_list(&self, spreadsheet_id: &str) -> Result<Arc<Vec<SheetMetadata>>> {
        if let Some(sheets) = self.cache.get(spreadsheet_id) {
            tracing::debug!(spreadsheet_id, "sheet metadata cache hit");
            return Ok(sheets);
        }

        tracing::debug!(spreadsheet_id, "sheet metadata cache miss; fetching");
        let sheets = Arc::new(self.backend.sheet_list(spreadsheet_id).await?);
        self.cache.put(spreadsheet_id.to_string(), sheets.clone());
        Ok(sheets)
    }

    fn resolve_by_name(
        &self,
        reference: &SheetRef,
        name: &str,
        sheets: &[SheetMetadata],
    ) -> Result<ResolutionResult> {
        let query = name.trim();
        let folded = query.to_lowercase();

        if let Some(sheet) = sheets
            .iter()
            .find(|sheet| sheet.title.trim().to_lowercase() == folded)
        {
            return Ok(exact(sheet, ResolveMethod::ExactName));
        }

        if self.config.fuzzy_matching {
            let mut scored: SmallVec<[(usize, f64); 8]> = SmallVec::new();
            for (position, sheet) in sheets.iter().enumerate() {
                let score = similarity::similarity(&folded, &sheet.title.trim().to_lowercase());
                if score >= self.config.fuzzy_threshold {
                    scored.push((position, score));
                }
            }
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

            if !scored.is_empty() {
                let (best_position, confidence) = scored[0];
                let best = sheets
                    .get(best_position)
                    .ok_or(ResolveError::InvalidState("scored candidate out of bounds"))?;
                let alternatives = scored[1..]
                    .iter()
                    .take(MAX_ALTERNATIVES)
                    .map(|&(position, similarity)| AlternativeMatch {
                        sheet: sheets[position].clone(),
                        similarity,
                    })
                    .collect();

                tracing::warn!(
                    query,
                    matched = best.title.as_str(),
                    confidence,
                    "fuzzy sheet name match"
                );
                return Ok(ResolutionResult {
                    sheet: best.clone(),
                    method: ResolveMethod::FuzzyName,
                    confidence,
                    alternatives,
                });
            }
        }

        Err(self.not_found(reference, sheets))
    }

    async fn resolve_named_range(&self, spreadsheet_id: &str, name: &str) -> Result<ResolvedRange> {
        let named = self
            .backend
            .named_range(spreadsheet_id, name)
            .await?
            .ok_or_else(|| {
                anyhow!("named range '{name}' not found in spreadsheet '{spreadsheet_id}'")
            })?;

        let sheets = self.sheet_list(spreadsheet_id).await?;
        let sheet = sheets
            .iter()
            .find(|sheet| sheet.sheet_id == named.range.sheet_id)
            .ok_or_else(|| {
                anyhow!(
                    "named range '{name}' points at unknown sheet id {}",
                    named.range.sheet_id
                )
            })?;

        let resolved = range::grid_range_to_a1(&sheet.title, &named.range)?;
        tracing::debug!(name, resolved = resolved.as_str(), "named range resolved");
        Ok(ResolvedRange {
            resolved_range: resolved,
            was_resolved: true,
            original_input: name.to_string(),
        })
    }

    async fn resolve_semantic_column(
        &self,
        spreadsheet_id: &str,
        semantic: &SemanticColumn,
    ) -> Result<String> {
        let headers = self
            .backend
            .header_row(spreadsheet_id, &semantic.sheet)
            .await?;
        let folded = semantic.column.trim().to_lowercase();

        let position = headers
            .iter()
            .position(|header| header.trim().to_lowercase() == folded)
            .ok_or_else(|| {
                anyhow!(
                    "column '{}' not found in header row of sheet '{}' (headers: {})",
                    semantic.column,
                    semantic.sheet,
                    headers.join(", ")
                )
            })?;

        let letters = range::column_to_letters(position as u32);
        Ok(format!(
            "{}!{letters}:{letters}",
            range::sheet_component(&semantic.sheet)
        ))
    }

    fn not_found(&self, reference: &SheetRef, sheets: &[SheetMetadata]) -> anyhow::Error {
        ResolveError::SheetNotFound {
            reference: reference.to_string(),
            available: sheets.iter().map(|sheet| sheet.title.clone()).collect(),
        }
        .into()
    }
}

fn exact(sheet: &SheetMetadata, method: ResolveMethod) -> ResolutionResult {
    ResolutionResult {
        sheet: sheet.clone(),
        method,
        confidence: 1.0,
        alternatives: Vec::new(),
    }
}
