use crate::model::{NamedRange, SheetMetadata};
use ahash::AHashMap;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Read-side boundary to the spreadsheet store. The production implementation
/// wraps the REST client; this crate only needs the three read operations.
#[async_trait]
pub trait SpreadsheetBackend: Send + Sync {
    /// All sheets of a spreadsheet, in sheet order.
    async fn sheet_list(&self, spreadsheet_id: &str) -> Result<Vec<SheetMetadata>>;

    /// First-row values of the named sheet.
    async fn header_row(&self, spreadsheet_id: &str, sheet_title: &str) -> Result<Vec<String>>;

    /// Look up a named range, `None` when the spreadsheet does not define it.
    async fn named_range(&self, spreadsheet_id: &str, name: &str) -> Result<Option<NamedRange>>;
}

#[derive(Debug, Default, Clone)]
struct StaticSpreadsheet {
    sheets: Vec<SheetMetadata>,
    // keyed by lowercased sheet title
    headers: AHashMap<String, Vec<String>>,
    // keyed by lowercased range name
    named_ranges: AHashMap<String, NamedRange>,
}

/// In-memory backend for tests and embedders that unit-test handler code
/// without a network. Counts calls per operation so cache behavior can be
/// asserted on.
#[derive(Debug, Default)]
pub struct StaticBackend {
    spreadsheets: RwLock<AHashMap<String, StaticSpreadsheet>>,
    sheet_list_calls: AtomicUsize,
    header_row_calls: AtomicUsize,
    named_range_calls: AtomicUsize,
}

impl StaticBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_spreadsheet(&self, spreadsheet_id: impl Into<String>, sheets: Vec<SheetMetadata>) {
        let mut store = self.spreadsheets.write();
        store.entry(spreadsheet_id.into()).or_default().sheets = sheets;
    }

    pub fn put_header_row(
        &self,
        spreadsheet_id: &str,
        sheet_title: &str,
        headers: Vec<String>,
    ) {
        let mut store = self.spreadsheets.write();
        store
            .entry(spreadsheet_id.to_string())
            .or_default()
            .headers
            .insert(sheet_title.to_lowercase(), headers);
    }

    pub fn put_named_range(&self, spreadsheet_id: &str, named_range: NamedRange) {
        let mut store = self.spreadsheets.write();
        store
            .entry(spreadsheet_id.to_string())
            .or_default()
            .named_ranges
            .insert(named_range.name.to_lowercase(), named_range);
    }

    pub fn sheet_list_calls(&self) -> usize {
        self.sheet_list_calls.load(Ordering::SeqCst)
    }

    pub fn header_row_calls(&self) -> usize {
        self.header_row_calls.load(Ordering::SeqCst)
    }

    pub fn named_range_calls(&self) -> usize {
        self.named_range_calls.load(Ordering::SeqCst)
    }

    fn lookup(&self, spreadsheet_id: &str) -> Result<StaticSpreadsheet> {
        self.spreadsheets
            .read()
            .get(spreadsheet_id)
            .cloned()
            .ok_or_else(|| anyhow!("spreadsheet '{spreadsheet_id}' not found"))
    }
}

#[async_trait]
impl SpreadsheetBackend for StaticBackend {
    async fn sheet_list(&self, spreadsheet_id: &str) -> Result<Vec<SheetMetadata>> {
        self.sheet_list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.lookup(spreadsheet_id)?.sheets)
    }

    async fn header_row(&self, spreadsheet_id: &str, sheet_title: &str) -> Result<Vec<String>> {
        self.header_row_calls.fetch_add(1, Ordering::SeqCst);
        let spreadsheet = self.lookup(spreadsheet_id)?;
        spreadsheet
            .headers
            .get(&sheet_title.to_lowercase())
            .cloned()
            .ok_or_else(|| {
                anyhow!("sheet '{sheet_title}' has no header row in spreadsheet '{spreadsheet_id}'")
            })
    }

    async fn named_range(&self, spreadsheet_id: &str, name: &str) -> Result<Option<NamedRange>> {
        self.named_range_calls.fetch_add(1, Ordering::SeqCst);
        let spreadsheet = self.lookup(spreadsheet_id)?;
        Ok(spreadsheet.named_ranges.get(&name.to_lowercase()).cloned())
    }
}
