use thiserror::Error;

/// Resolution failures. All variants reflect bad input or genuine absence,
/// never transient backend state, so none are retryable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no sheet reference supplied (expected sheet_id or sheet_name)")]
    NoReference,

    #[error("spreadsheet '{spreadsheet_id}' has no sheets")]
    NoSheets { spreadsheet_id: String },

    #[error("sheet {reference} not found. available sheets: {}", .available.join(", "))]
    SheetNotFound {
        reference: String,
        available: Vec<String>,
    },

    #[error("resolver invariant violated: {0}")]
    InvalidState(&'static str),
}

impl ResolveError {
    pub fn code(&self) -> &'static str {
        match self {
            ResolveError::NoReference => "NO_REFERENCE",
            ResolveError::NoSheets { .. } => "NO_SHEETS",
            ResolveError::SheetNotFound { .. } => "SHEET_NOT_FOUND",
            ResolveError::InvalidState(_) => "INVALID_STATE",
        }
    }

    pub fn retryable(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub id: String,
    pub message: String,
}

/// Aggregate raised by `execute_all_or_fail` after the whole batch settles.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{} task(s) failed: {}", .failures.len(), render_failures(.failures))]
pub struct BatchError {
    pub failures: Vec<TaskFailure>,
}

fn render_failures(failures: &[TaskFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.id, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}
