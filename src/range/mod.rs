//! A1-notation parsing and construction.
//!
//! Columns are zero-based indices, rows are the 1-based numbers written in
//! the notation itself. `GridRange` conversion follows the zero-based,
//! end-exclusive convention of the backing API.

use crate::model::GridRange;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub mod columns;

pub use columns::{column_to_letters, letters_to_column};

static CELL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$?([A-Za-z]{1,3})\$?([0-9]+)$").expect("regex"));
static CELL_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\$?([A-Za-z]{1,3})\$?([0-9]+):\$?([A-Za-z]{1,3})\$?([0-9]+)$").expect("regex")
});
static COLUMN_RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$?([A-Za-z]{1,3}):\$?([A-Za-z]{1,3})$").expect("regex"));
static ROW_RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]+):([0-9]+)$").expect("regex"));

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum A1ParseError {
    #[error("empty range reference")]
    Empty,
    #[error("unterminated quoted sheet name in '{0}'")]
    UnterminatedQuote(String),
    #[error("missing range after sheet name in '{0}'")]
    MissingRange(String),
    #[error("row numbers start at 1 in '{0}'")]
    RowZero(String),
    #[error("invalid range '{0}' (expected A1, A1:C10, A:C, or 3:10, optionally sheet-qualified)")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedA1 {
    pub sheet: Option<String>,
    pub span: RangeSpan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpan {
    Cell { col: u32, row: u32 },
    CellRange { start_col: u32, start_row: u32, end_col: u32, end_row: u32 },
    ColumnRange { start_col: u32, end_col: u32 },
    RowRange { start_row: u32, end_row: u32 },
}

pub fn parse_a1(input: &str) -> Result<ParsedA1, A1ParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(A1ParseError::Empty);
    }

    let (sheet, rest) = split_sheet_prefix(trimmed)?;
    if rest.is_empty() {
        return Err(A1ParseError::MissingRange(trimmed.to_string()));
    }

    let span = parse_span(rest, trimmed)?;
    Ok(ParsedA1 {
        sheet: sheet.map(str::to_string),
        span,
    })
}

/// Whether `input` is already well-formed A1 notation.
pub fn is_a1_notation(input: &str) -> bool {
    parse_a1(input).is_ok()
}

pub fn build_a1(parsed: &ParsedA1) -> String {
    let mut out = String::new();
    if let Some(sheet) = &parsed.sheet {
        out.push_str(&sheet_component(sheet));
        out.push('!');
    }
    match parsed.span {
        RangeSpan::Cell { col, row } => {
            out.push_str(&column_to_letters(col));
            out.push_str(&row.to_string());
        }
        RangeSpan::CellRange {
            start_col,
            start_row,
            end_col,
            end_row,
        } => {
            out.push_str(&column_to_letters(start_col));
            out.push_str(&start_row.to_string());
            out.push(':');
            out.push_str(&column_to_letters(end_col));
            out.push_str(&end_row.to_string());
        }
        RangeSpan::ColumnRange { start_col, end_col } => {
            out.push_str(&column_to_letters(start_col));
            out.push(':');
            out.push_str(&column_to_letters(end_col));
        }
        RangeSpan::RowRange { start_row, end_row } => {
            out.push_str(&start_row.to_string());
            out.push(':');
            out.push_str(&end_row.to_string());
        }
    }
    out
}

/// Sheet name as it appears in A1 notation: quoted unless it is a plain
/// alphanumeric/underscore identifier.
pub fn sheet_component(title: &str) -> String {
    let plain = !title.is_empty()
        && title
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        title.to_string()
    } else {
        format!("'{title}'")
    }
}

/// Convert a zero-based, end-exclusive grid rectangle to 1-based inclusive
/// A1 notation on the given sheet.
pub fn grid_range_to_a1(sheet_title: &str, range: &GridRange) -> anyhow::Result<String> {
    anyhow::ensure!(
        range.end_row_index > range.start_row_index
            && range.end_column_index > range.start_column_index,
        "grid range is empty or inverted: {range:?}"
    );

    let parsed = ParsedA1 {
        sheet: Some(sheet_title.to_string()),
        span: RangeSpan::CellRange {
            start_col: range.start_column_index,
            start_row: range.start_row_index + 1,
            end_col: range.end_column_index - 1,
            end_row: range.end_row_index,
        },
    };
    Ok(build_a1(&parsed))
}

fn split_sheet_prefix(input: &str) -> Result<(Option<&str>, &str), A1ParseError> {
    if let Some(quoted) = input.strip_prefix('\'') {
        let end = quoted
            .find('\'')
            .ok_or_else(|| A1ParseError::UnterminatedQuote(input.to_string()))?;
        let sheet = &quoted[..end];
        let rest = quoted[end + 1..]
            .strip_prefix('!')
            .ok_or_else(|| A1ParseError::MissingRange(input.to_string()))?;
        return Ok((Some(sheet), rest));
    }

    match input.split_once('!') {
        Some((sheet, rest)) if !sheet.is_empty() => Ok((Some(sheet), rest)),
        Some(_) => Err(A1ParseError::MissingRange(input.to_string())),
        None => Ok((None, input)),
    }
}

fn parse_span(span: &str, original: &str) -> Result<RangeSpan, A1ParseError> {
    let invalid = || A1ParseError::Invalid(original.to_string());

    if let Some(caps) = CELL_RE.captures(span) {
        let col = letters_to_column(&caps[1]).ok_or_else(invalid)?;
        let row = parse_row(&caps[2], original)?;
        return Ok(RangeSpan::Cell { col, row });
    }
    if let Some(caps) = CELL_RANGE_RE.captures(span) {
        let start_col = letters_to_column(&caps[1]).ok_or_else(invalid)?;
        let start_row = parse_row(&caps[2], original)?;
        let end_col = letters_to_column(&caps[3]).ok_or_else(invalid)?;
        let end_row = parse_row(&caps[4], original)?;
        return Ok(RangeSpan::CellRange {
            start_col,
            start_row,
            end_col,
            end_row,
        });
    }
    if let Some(caps) = COLUMN_RANGE_RE.captures(span) {
        let start_col = letters_to_column(&caps[1]).ok_or_else(invalid)?;
        let end_col = letters_to_column(&caps[2]).ok_or_else(invalid)?;
        return Ok(RangeSpan::ColumnRange { start_col, end_col });
    }
    if let Some(caps) = ROW_RANGE_RE.captures(span) {
        let start_row = parse_row(&caps[1], original)?;
        let end_row = parse_row(&caps[2], original)?;
        return Ok(RangeSpan::RowRange { start_row, end_row });
    }

    Err(invalid())
}

fn parse_row(digits: &str, original: &str) -> Result<u32, A1ParseError> {
    let row: u32 = digits
        .parse()
        .map_err(|_| A1ParseError::Invalid(original.to_string()))?;
    if row == 0 {
        return Err(A1ParseError::RowZero(original.to_string()));
    }
    Ok(row)
}
