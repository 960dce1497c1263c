pub mod detection;
pub mod pascal_voc;

use crate::bbox::BoundingBox;
use crate::categories::Category;
use crate::error::Result;
use crate::parser::ImageInfo;

/// An annotation whose category has been resolved through the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledAnnotation {
    pub bbox: BoundingBox,
    pub category: Category,
}

/// Every annotation of one source image, in source order.
///
/// `image` is taken from the first annotation of the group and stands in for
/// the whole image (dimensions included).
#[derive(Debug, Clone, PartialEq)]
pub struct ImageGroup {
    pub image: ImageInfo,
    pub annotations: Vec<LabeledAnnotation>,
}

pub trait Converter {
    type Output;

    /// Renders one image group. `Ok(None)` means the group was filtered out.
    fn convert(&self, group: &ImageGroup) -> Result<Option<Self::Output>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One VOC-XML file per image.
    PascalVoc,
    /// A JSON array of detection-framework image records.
    DetectionRecords,
}

pub fn get_format(format: &str) -> Option<OutputFormat> {
    match format.to_lowercase().as_str() {
        "pascal_voc" | "voc" => Some(OutputFormat::PascalVoc),
        "records" | "detection" | "detectron" => Some(OutputFormat::DetectionRecords),
        _ => None,
    }
}
