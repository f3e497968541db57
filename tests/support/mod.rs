#![allow(dead_code)]

use gsheets_kit::{GridProperties, SheetMetadata, StaticBackend};
use std::sync::Arc;

pub fn sheet(sheet_id: i32, title: &str, index: i32) -> SheetMetadata {
    SheetMetadata {
        sheet_id,
        title: title.to_string(),
        index,
        hidden: false,
        grid_properties: Some(GridProperties {
            row_count: 1000,
            column_count: 26,
            frozen_row_count: None,
            frozen_column_count: None,
        }),
    }
}

/// Backend with one spreadsheet of quarterly sheets, the common fixture for
/// resolution tests.
pub fn quarterly_backend(spreadsheet_id: &str) -> Arc<StaticBackend> {
    let backend = StaticBackend::new();
    backend.put_spreadsheet(
        spreadsheet_id,
        vec![
            sheet(0, "Q1 Sales", 0),
            sheet(11, "Q2 Sales", 1),
            sheet(22, "Q3 Sales", 2),
            sheet(33, "Notes", 3),
        ],
    );
    Arc::new(backend)
}
