//! Tabular records carried through the analytics state keys.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// One table row: column name to cell value.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// A row of the demo sales dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRow {
    /// Sale date, `YYYY-MM-DD`.
    #[serde(rename = "Date")]
    pub date: String,
    /// Product name.
    #[serde(rename = "Product_Name")]
    pub product_name: String,
    /// Product category.
    #[serde(rename = "Product_Category")]
    pub product_category: String,
    /// Units sold.
    #[serde(rename = "Units_Sold")]
    pub units_sold: u32,
    /// Revenue in dollars.
    #[serde(rename = "Revenue")]
    pub revenue: f64,
}

/// Returns the demo sales dataset.
#[must_use]
pub fn sample_sales_data() -> Vec<SalesRow> {
    [
        ("2023-01-01", "AlphaSpark", "Gadgets", 100, 1200.0),
        ("2023-01-15", "BetaBolt", "Widgets", 50, 750.0),
        ("2023-02-01", "AlphaSpark", "Gadgets", 120, 1440.0),
        ("2023-02-12", "GammaGizmo", "Gizmos", 80, 1250.0),
        ("2023-03-05", "BetaBolt", "Widgets", 45, 675.0),
        ("2023-03-20", "AlphaSpark", "Gadgets", 150, 1800.0),
    ]
    .into_iter()
    .map(|(date, name, category, units, revenue)| SalesRow {
        date: date.to_string(),
        product_name: name.to_string(),
        product_category: category.to_string(),
        units_sold: units,
        revenue,
    })
    .collect()
}

/// Writes the demo dataset as CSV, creating parent directories.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn write_sample_data(path: &Path) -> Result<(), csv::Error> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    for row in sample_sales_data() {
        writer.serialize(row)?;
    }
    writer.flush()?;

    tracing::info!(path = %path.display(), "Sample sales data written");
    Ok(())
}

/// Parses CSV text into records.
///
/// Empty cells become `null`; cells that parse as integers or finite floats
/// become numbers; everything else stays a string.
///
/// # Errors
///
/// Returns an error if the CSV is malformed.
pub fn parse_csv(text: &str) -> Result<Vec<Record>, csv::Error> {
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();

    reader
        .records()
        .map(|row| {
            let row = row?;
            Ok::<Record, csv::Error>(headers
                .iter()
                .zip(row.iter())
                .map(|(column, cell)| (column.to_string(), parse_cell(cell)))
                .collect())
        })
        .collect()
}

fn parse_cell(cell: &str) -> serde_json::Value {
    let cell = cell.trim();
    if cell.is_empty() {
        return serde_json::Value::Null;
    }
    if let Ok(n) = cell.parse::<i64>() {
        return serde_json::json!(n);
    }
    cell.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map_or_else(|| serde_json::json!(cell), serde_json::Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_csv_types() {
        let records = parse_csv("Name,Units,Revenue,Note\nA,3,1.5,\nB,,2,hi\n").unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["Units"], json!(3));
        assert_eq!(records[0]["Revenue"], json!(1.5));
        assert_eq!(records[0]["Note"], serde_json::Value::Null);
        assert_eq!(records[1]["Units"], serde_json::Value::Null);
        assert_eq!(records[1]["Note"], json!("hi"));
    }

    #[test]
    fn test_parse_csv_keeps_nan_as_text() {
        let records = parse_csv("x\nNaN\n").unwrap();
        assert_eq!(records[0]["x"], json!("NaN"));
    }

    #[test]
    fn test_parse_csv_ragged_row_is_error() {
        assert!(parse_csv("a,b\n1,2,3\n").is_err());
    }

    #[test]
    fn test_write_and_parse_sample() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sales.csv");

        write_sample_data(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let records = parse_csv(&text).unwrap();

        assert_eq!(records.len(), sample_sales_data().len());
        assert_eq!(records[0]["Product_Name"], json!("AlphaSpark"));
        assert_eq!(records[0]["Units_Sold"], json!(100));
    }
}
