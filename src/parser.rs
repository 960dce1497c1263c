use crate::bbox::BoundingBox;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// A category reference as it appears in the source, before registry lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CategoryRef {
    /// Raw COCO `category_id`.
    Id(u64),
    Name(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    /// Image reference exactly as the source names it; the grouping key.
    pub file_name: String,
    /// Where the image can be opened from.
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub image_id: String,
}

/// One bounding box with the metadata of the image it belongs to. Every
/// reader flattens its source into a sequence of these.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    pub image: ImageInfo,
    pub bbox: BoundingBox,
    pub category: CategoryRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoImage {
    pub id: u64,
    pub file_name: String,
    pub height: u32,
    pub width: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoAnnotation {
    pub image_id: u64,
    /// `[x, y, width, height]`
    pub bbox: [f64; 4],
    pub category_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoCategory {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CocoDataset {
    #[serde(default)]
    pub images: Vec<CocoImage>,
    #[serde(default)]
    pub annotations: Vec<CocoAnnotation>,
    /// Image-only exports leave this out.
    #[serde(default)]
    pub categories: Option<Vec<CocoCategory>>,
}

/// A COCO document, either on disk or already parsed.
#[derive(Debug, Clone)]
pub enum CocoSource {
    Path(PathBuf),
    Document(CocoDataset),
}

impl CocoSource {
    pub fn load(self) -> Result<CocoDataset> {
        match self {
            CocoSource::Path(path) => {
                let file = File::open(&path)?;
                Ok(serde_json::from_reader(BufReader::new(file))?)
            }
            CocoSource::Document(dataset) => Ok(dataset),
        }
    }
}

impl From<CocoDataset> for CocoSource {
    fn from(dataset: CocoDataset) -> Self {
        CocoSource::Document(dataset)
    }
}

/// Inner join of `images[].id` with `annotations[].image_id`.
///
/// Records come out in annotation order. Annotations that reference an
/// unknown image are dropped.
pub fn join_coco(dataset: &CocoDataset, image_root: &Path) -> Vec<AnnotationRecord> {
    let mut images_by_id: HashMap<u64, Vec<&CocoImage>> = HashMap::new();
    for image in &dataset.images {
        images_by_id.entry(image.id).or_default().push(image);
    }

    let mut records = Vec::with_capacity(dataset.annotations.len());
    let mut dropped = 0usize;
    for annotation in &dataset.annotations {
        let Some(images) = images_by_id.get(&annotation.image_id) else {
            dropped += 1;
            continue;
        };
        let [x, y, w, h] = annotation.bbox;
        for image in images {
            records.push(AnnotationRecord {
                image: ImageInfo {
                    file_name: image.file_name.clone(),
                    path: image_root.join(&image.file_name),
                    width: image.width,
                    height: image.height,
                    image_id: image.id.to_string(),
                },
                bbox: BoundingBox::xywh(x, y, w, h),
                category: CategoryRef::Id(annotation.category_id),
            });
        }
    }

    if dropped > 0 {
        log::debug!(
            "Dropped {} annotations referencing unknown image ids",
            dropped
        );
    }
    records
}

/// Dataset-wide values the CSV lines do not carry.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvContext {
    pub base_directory: PathBuf,
    /// Every image in a CSV dataset is assumed to have this size.
    pub width: u32,
    pub height: u32,
}

const CSV_FIELDS: usize = 6;

/// Parses `path,x0,y0,x1,y1,category` lines (no header).
///
/// Blank lines are skipped. Any other malformed line fails the whole read.
pub fn parse_csv(content: &str, context: &CsvContext) -> Result<Vec<AnnotationRecord>> {
    let mut records = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let line_number = index + 1;
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != CSV_FIELDS {
            return Err(Error::parse(
                line_number,
                format!("expected {} fields, found {}", CSV_FIELDS, fields.len()),
            ));
        }

        let relative_path = fields[0];
        if relative_path.is_empty() {
            return Err(Error::parse(line_number, "image path is empty"));
        }
        let category = fields[5];
        if category.is_empty() {
            return Err(Error::parse(line_number, "category is empty"));
        }

        let coordinate = |field: &str| -> Result<f64> {
            field.parse::<i64>().map(|v| v as f64).map_err(|_| {
                Error::parse(line_number, format!("coordinate '{}' is not an integer", field))
            })
        };
        let bbox = BoundingBox::xyxy(
            coordinate(fields[1])?,
            coordinate(fields[2])?,
            coordinate(fields[3])?,
            coordinate(fields[4])?,
        );

        let path = context.base_directory.join(relative_path);
        records.push(AnnotationRecord {
            image: ImageInfo {
                file_name: relative_path.to_string(),
                path,
                width: context.width,
                height: context.height,
                image_id: relative_path.to_string(),
            },
            bbox,
            category: CategoryRef::Name(category.to_string()),
        });
    }

    Ok(records)
}

pub fn read_csv(path: impl AsRef<Path>, context: &CsvContext) -> Result<Vec<AnnotationRecord>> {
    let content = fs::read_to_string(path.as_ref())?;
    parse_csv(&content, context)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VocAnnotation {
    #[serde(default)]
    pub folder: String,
    pub filename: String,
    pub size: VocSize,
    #[serde(default)]
    pub segmented: u8,
    #[serde(default, rename = "object")]
    pub objects: Vec<VocObject>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VocSize {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VocObject {
    pub name: String,
    pub bndbox: VocBndBox,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct VocBndBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl From<VocBndBox> for BoundingBox {
    fn from(b: VocBndBox) -> Self {
        BoundingBox::xyxy(b.xmin, b.ymin, b.xmax, b.ymax)
    }
}

pub fn parse_voc(xml: &str) -> Result<VocAnnotation> {
    Ok(quick_xml::de::from_str(xml)?)
}

pub fn read_voc(path: impl AsRef<Path>) -> Result<VocAnnotation> {
    parse_voc(&fs::read_to_string(path.as_ref())?)
}
