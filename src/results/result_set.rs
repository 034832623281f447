use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};

use super::row::{CustomDbRow, index_columns};
use crate::types::RowValues;

/// A result set from a database query
///
/// Every row has already been read off the connection by the time a
/// `ResultSet` exists, so it can be held across awaits or moved to other
/// tasks without keeping a pooled connection busy.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<CustomDbRow>,
    column_names: Option<Arc<Vec<String>>>,
    column_index_cache: Arc<HashMap<String, usize>>,
}

impl ResultSet {
    /// Create a new result set with a known capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            results: Vec::with_capacity(capacity),
            column_names: None,
            column_index_cache: Arc::default(),
        }
    }

    /// Set the column names for this result set (to be shared by all rows)
    pub fn set_column_names(&mut self, column_names: Arc<Vec<String>>) {
        self.column_index_cache = Arc::new(index_columns(&column_names));
        self.column_names = Some(column_names);
    }

    /// Get the column names for this result set
    #[must_use]
    pub fn get_column_names(&self) -> Option<&Arc<Vec<String>>> {
        self.column_names.as_ref()
    }

    /// Add a row to the result set
    ///
    /// Rows added before any column names are set get an empty name list and
    /// can only be read by index.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        let column_names = self
            .column_names
            .get_or_insert_with(|| Arc::new(Vec::new()))
            .clone();
        self.results.push(CustomDbRow {
            column_names,
            values: row_values,
            column_index_cache: self.column_index_cache.clone(),
        });
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Iterate the rows in the order the server returned them
    pub fn iter(&self) -> std::slice::Iter<'_, CustomDbRow> {
        self.results.iter()
    }

    /// Render the rows as a JSON array of `{column: value}` objects.
    ///
    /// A column whose name is already taken in the object (e.g. two `?column?`
    /// columns) is keyed as `<name>_<index>` so no value is lost.
    ///
    /// # Errors
    /// Returns `serde_json::Error` if a value cannot be represented as JSON.
    pub fn to_json(&self) -> Result<JsonValue, serde_json::Error> {
        let mut out = Vec::with_capacity(self.results.len());
        for row in &self.results {
            let mut object = Map::with_capacity(row.len());
            for (idx, value) in row.values.iter().enumerate() {
                let mut key = row
                    .column_names
                    .get(idx)
                    .cloned()
                    .unwrap_or_else(|| format!("column_{idx}"));
                if object.contains_key(&key) {
                    key = format!("{key}_{idx}");
                }
                object.insert(key, serde_json::to_value(value)?);
            }
            out.push(JsonValue::Object(object));
        }
        Ok(JsonValue::Array(out))
    }
}

impl IntoIterator for ResultSet {
    type Item = CustomDbRow;
    type IntoIter = std::vec::IntoIter<CustomDbRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a CustomDbRow;
    type IntoIter = std::slice::Iter<'a, CustomDbRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}
