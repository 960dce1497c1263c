use crate::converter::detection::ImageRecord;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// A box with a dense category id, two-corner absolute coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub category_id: usize,
    pub bbox: [f64; 4],
}

/// Predictions and ground truth side by side for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    /// Image path relative to the dataset base directory.
    pub image_name: String,
    pub predictions: Vec<Detection>,
    pub annotations: Vec<Detection>,
}

impl EvaluationRecord {
    pub fn new(record: &ImageRecord, predictions: Vec<Detection>) -> Self {
        Self {
            image_name: record.image_id.clone(),
            predictions,
            annotations: record
                .annotations
                .iter()
                .map(|annotation| Detection {
                    category_id: annotation.category_id,
                    bbox: annotation.bbox,
                })
                .collect(),
        }
    }
}

/// Produces boxes in the same `{category_id, bbox}` shape the records carry.
pub trait Predictor {
    fn predict(&mut self, image_path: &Path) -> Result<Vec<Detection>>;
}

/// Runs `predictor` over every record, in record order.
pub fn evaluate<P: Predictor + ?Sized>(
    records: &[ImageRecord],
    predictor: &mut P,
) -> Result<Vec<EvaluationRecord>> {
    records
        .iter()
        .map(|record| {
            let predictions = predictor.predict(Path::new(&record.file_name))?;
            log::debug!(
                "{}: {} predictions, {} annotations",
                record.image_id,
                predictions.len(),
                record.annotations.len()
            );
            Ok(EvaluationRecord::new(record, predictions))
        })
        .collect()
}

pub fn write_evaluation_records(
    path: impl AsRef<Path>,
    records: &[EvaluationRecord],
) -> Result<()> {
    let writer = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer_pretty(writer, records)?;
    Ok(())
}

pub fn read_evaluation_records(path: impl AsRef<Path>) -> Result<Vec<EvaluationRecord>> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    Ok(serde_json::from_reader(reader)?)
}
