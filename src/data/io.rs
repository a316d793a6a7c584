//! CSV loading and saving

use super::types::DataMatrix;
use crate::error::{GmmError, Result};
use std::path::Path;

/// Load a numeric CSV file, one sample per row
pub fn load_csv<P: AsRef<Path>>(path: P, has_header: bool) -> Result<DataMatrix> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_header)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut rows = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        let row = record
            .iter()
            .map(|field| {
                field.parse::<f64>().map_err(|e| {
                    GmmError::Parse(format!("row {}: cannot parse {:?}: {}", i, field, e))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }

    DataMatrix::from_rows(&rows)
}

/// Save samples to CSV with generated column names
pub fn save_csv<P: AsRef<Path>>(path: P, data: &DataMatrix) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;

    let header: Vec<String> = (0..data.n_features()).map(|j| format!("x{}", j)).collect();
    writer.write_record(&header)?;

    for row in data.view().rows() {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }

    writer.flush()?;
    Ok(())
}

/// Save samples together with their cluster label and confidence
pub fn save_labels<P: AsRef<Path>>(
    path: P,
    data: &DataMatrix,
    labels: &[usize],
    confidence: &[f64],
) -> Result<()> {
    if labels.len() != data.n_samples() || confidence.len() != data.n_samples() {
        return Err(GmmError::InvalidInputShape(format!(
            "{} labels for {} samples",
            labels.len(),
            data.n_samples()
        )));
    }

    let mut writer = csv::Writer::from_path(path)?;

    let mut header: Vec<String> = (0..data.n_features()).map(|j| format!("x{}", j)).collect();
    header.push("label".to_string());
    header.push("confidence".to_string());
    writer.write_record(&header)?;

    for (i, row) in data.view().rows().into_iter().enumerate() {
        let mut record: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        record.push(labels[i].to_string());
        record.push(format!("{:.6}", confidence[i]));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}
