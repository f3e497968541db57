//! Core resolution and batching layer for Google Sheets agent tooling.
//!
//! Two independent components back the (external) tool-handler layer:
//!
//! - [`ReferenceResolver`] turns ambiguous sheet references (numeric ids,
//!   names exact or fuzzy, indices, named ranges, "column by header"
//!   queries) into canonical sheet metadata and A1 notation, with a
//!   TTL + LRU metadata cache per spreadsheet.
//! - [`BoundedParallelExecutor`] runs independent async tasks under a
//!   concurrency ceiling with exponential-backoff retry, progress callbacks,
//!   and aggregate latency statistics.
//!
//! Both are constructed explicitly and injected; nothing here is a global.
//! The spreadsheet store is reached through the [`SpreadsheetBackend`] trait,
//! so tests and embedders can swap in [`StaticBackend`].

pub mod backend;
pub mod config;
pub mod errors;
pub mod executor;
pub mod model;
pub mod range;
pub mod resolver;

pub use backend::{SpreadsheetBackend, StaticBackend};
pub use config::{ExecutorConfig, KitConfig, ResolverConfig, PARALLEL_CONCURRENCY_ENV};
pub use errors::{BatchError, ResolveError, TaskFailure};
pub use executor::{
    BatchProgress, BoundedParallelExecutor, ParallelResult, ParallelTask, StatsSnapshot,
};
pub use model::{
    AlternativeMatch, GridProperties, GridRange, NamedRange, RangeInput, ResolutionResult,
    ResolveMethod, ResolvedRange, SemanticColumn, SheetMetadata, SheetRef,
};
pub use resolver::ReferenceResolver;
