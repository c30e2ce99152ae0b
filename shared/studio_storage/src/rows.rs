//! Decoding of rows returned by the table API

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::error::{StoreError, StoreResult};

/// Decodes one row
pub(crate) fn parse_row<T: DeserializeOwned>(row: Value) -> StoreResult<T> {
    serde_json::from_value(row).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Decodes every row, dropping (and logging) the ones that do not fit `T`
pub(crate) fn parse_rows_lenient<T: DeserializeOwned>(table: &str, rows: Vec<Value>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("skipping malformed {table} row: {e}");
                None
            }
        })
        .collect()
}
