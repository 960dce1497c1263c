use super::{Converter, ImageGroup};
use crate::bbox::BoxMode;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordAnnotation {
    pub bbox: [f64; 4],
    /// Always [`BoxMode::XyxyAbs`]: absolute two-corner coordinates.
    pub bbox_mode: BoxMode,
    pub category_id: usize,
    pub is_crowd: u8,
}

/// One image as a detection framework expects to receive it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Location of the image file.
    pub file_name: String,
    pub height: u32,
    pub width: u32,
    /// The image reference from the source, e.g. its relative path.
    pub image_id: String,
    pub annotations: Vec<RecordAnnotation>,
}

pub struct DetectionRecordConverter;

impl DetectionRecordConverter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DetectionRecordConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter for DetectionRecordConverter {
    type Output = ImageRecord;

    fn convert(&self, group: &ImageGroup) -> Result<Option<ImageRecord>> {
        let annotations = group
            .annotations
            .iter()
            .map(|annotation| {
                let corners = annotation.bbox.to_xyxy();
                RecordAnnotation {
                    bbox: corners.coords,
                    bbox_mode: corners.mode,
                    category_id: annotation.category.id,
                    is_crowd: 0,
                }
            })
            .collect();

        Ok(Some(ImageRecord {
            file_name: group.image.path.to_string_lossy().into_owned(),
            height: group.image.height,
            width: group.image.width,
            image_id: group.image.image_id.clone(),
            annotations,
        }))
    }
}

pub fn write_records(path: impl AsRef<Path>, records: &[ImageRecord]) -> Result<()> {
    let writer = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer_pretty(writer, records)?;
    Ok(())
}

pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<ImageRecord>> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    Ok(serde_json::from_reader(reader)?)
}
