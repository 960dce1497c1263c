use crate::categories::{CategoryRegistry, CategorySource};
use crate::converter::detection::{write_records, DetectionRecordConverter, ImageRecord};
use crate::converter::pascal_voc::{PascalVocConverter, VocOptions};
use crate::converter::{Converter, ImageGroup, LabeledAnnotation, OutputFormat};
use crate::decoder::image_dimensions;
use crate::error::{Error, Result};
use crate::grouper::group_by;
use crate::parser::{join_coco, read_csv, AnnotationRecord, CocoSource, CsvContext, ImageInfo};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const RECORDS_FILE_NAME: &str = "records.json";

/// One split of a dataset settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSettings {
    pub base_directory: PathBuf,
    pub annotations_csv: PathBuf,
    pub classes_json: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl DatasetSettings {
    /// Reads `split` (e.g. `"TRAIN"`) from a settings file keyed by split name.
    pub fn from_file(path: impl AsRef<Path>, split: &str) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mut splits: HashMap<String, DatasetSettings> =
            serde_json::from_reader(BufReader::new(file))?;
        splits
            .remove(split)
            .ok_or_else(|| Error::UnknownSplit(split.to_string()))
    }

    pub fn csv_context(&self) -> CsvContext {
        CsvContext {
            base_directory: self.base_directory.clone(),
            width: self.width,
            height: self.height,
        }
    }
}

/// What to do with the dataset-wide image size of a CSV source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DimensionPolicy {
    /// Use the configured size for every image without looking at the files.
    #[default]
    Trust,
    /// Read every image header and fail if its size differs.
    Verify,
}

#[derive(Debug, Clone)]
pub enum AnnotationSource {
    Coco {
        annotations: CocoSource,
        image_root: PathBuf,
    },
    Csv {
        settings: DatasetSettings,
        dimensions: DimensionPolicy,
    },
}

impl AnnotationSource {
    /// Builds the category registry and reads the flat annotation list.
    pub fn read(self) -> Result<(CategoryRegistry, Vec<AnnotationRecord>)> {
        match self {
            AnnotationSource::Coco {
                annotations,
                image_root,
            } => {
                let mut document = annotations.load()?;
                let categories = document.categories.take().ok_or_else(|| {
                    Error::MalformedInput("COCO document has no categories".to_string())
                })?;
                let registry = CategoryRegistry::build(CategorySource::Coco(categories))?;
                let records = join_coco(&document, &image_root);
                Ok((registry, records))
            }
            AnnotationSource::Csv {
                settings,
                dimensions,
            } => {
                let registry = CategoryRegistry::from_file(&settings.classes_json)?;
                let records = read_csv(&settings.annotations_csv, &settings.csv_context())?;
                if dimensions == DimensionPolicy::Verify {
                    verify_dimensions(&records, (settings.width, settings.height))?;
                }
                Ok((registry, records))
            }
        }
    }
}

fn verify_dimensions(records: &[AnnotationRecord], expected: (u32, u32)) -> Result<()> {
    let mut checked = HashSet::new();
    for record in records {
        if !checked.insert(&record.image.path) {
            continue;
        }
        let actual = image_dimensions(&record.image.path)?;
        if actual != expected {
            return Err(Error::DimensionMismatch {
                path: record.image.path.clone(),
                expected,
                actual,
            });
        }
    }
    Ok(())
}

/// Replaces every raw category reference with its registry entry.
pub fn resolve_categories(
    records: Vec<AnnotationRecord>,
    registry: &CategoryRegistry,
) -> Result<Vec<(ImageInfo, LabeledAnnotation)>> {
    records
        .into_iter()
        .map(|record| {
            let category = registry.resolve(&record.category)?;
            Ok((
                record.image,
                LabeledAnnotation {
                    bbox: record.bbox,
                    category,
                },
            ))
        })
        .collect()
}

/// Groups labeled annotations by image reference, first-seen order.
pub fn group_images(labeled: Vec<(ImageInfo, LabeledAnnotation)>) -> Vec<ImageGroup> {
    group_by(labeled, |(image, _)| image.file_name.clone())
        .into_values()
        .filter_map(|members| {
            let image = members.first()?.0.clone();
            let annotations = members
                .into_iter()
                .map(|(_, annotation)| annotation)
                .collect();
            Some(ImageGroup { image, annotations })
        })
        .collect()
}

/// Reads `source` and returns its registry plus per-image groups.
pub fn prepare(source: AnnotationSource) -> Result<(CategoryRegistry, Vec<ImageGroup>)> {
    let (registry, records) = source.read()?;
    let labeled = resolve_categories(records, &registry)?;
    Ok((registry, group_images(labeled)))
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub phase: String,
    pub current: usize,
    pub total: usize,
    pub item: Option<String>,
}

impl ProgressEvent {
    fn new(phase: &str, current: usize, total: usize, item: Option<String>) -> Self {
        Self {
            phase: phase.to_string(),
            current,
            total,
            item,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub voc: VocOptions,
    /// Also write the registry as `{"categories": [...]}` to this path.
    pub categories_file: Option<PathBuf>,
    /// Also write `<name>.txt` listing every emitted XML stem.
    pub imageset: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConvertResult {
    pub output_path: String,
    pub image_count: usize,
    pub annotation_count: usize,
    pub skipped_images: usize,
    pub category_count: usize,
}

/// Converts `source` into `format` under `destination`, creating it if needed.
///
/// Existing files of the same name are overwritten. A fatal error stops the
/// run; files written before it stay on disk.
pub fn convert(
    source: AnnotationSource,
    destination: &Path,
    format: OutputFormat,
    options: &ConvertOptions,
    progress: &mut dyn FnMut(ProgressEvent),
) -> Result<ConvertResult> {
    progress(ProgressEvent::new("reading", 0, 1, None));
    let (registry, groups) = prepare(source)?;
    progress(ProgressEvent::new(
        "reading",
        1,
        1,
        Some(format!("Read {} images", groups.len())),
    ));

    fs::create_dir_all(destination)?;
    let mut result = match format {
        OutputFormat::PascalVoc => {
            let converter = PascalVocConverter::new(options.voc.clone());
            emit_voc(&converter, &groups, destination, options, progress)?
        }
        OutputFormat::DetectionRecords => emit_records(&groups, destination, progress)?,
    };
    result.category_count = registry.len();

    if let Some(path) = &options.categories_file {
        registry.write_categories(path)?;
    }

    progress(ProgressEvent::new("complete", 1, 1, None));
    log::info!(
        "Converted {} images ({} skipped) into {}",
        result.image_count,
        result.skipped_images,
        result.output_path
    );
    Ok(result)
}

fn emit_voc<C>(
    converter: &C,
    groups: &[ImageGroup],
    destination: &Path,
    options: &ConvertOptions,
    progress: &mut dyn FnMut(ProgressEvent),
) -> Result<ConvertResult>
where
    C: Converter<Output = crate::converter::pascal_voc::VocDocument>,
{
    let mut written: HashMap<String, &str> = HashMap::new();
    let mut stems = Vec::new();
    let mut result = ConvertResult {
        output_path: destination.to_string_lossy().into_owned(),
        image_count: 0,
        annotation_count: 0,
        skipped_images: 0,
        category_count: 0,
    };

    for (idx, group) in groups.iter().enumerate() {
        match converter.convert(group)? {
            Some(document) => {
                match written.insert(document.file_name.clone(), &group.image.file_name) {
                    Some(previous) => log::warn!(
                        "{} overwrites {} written for {}",
                        group.image.file_name,
                        document.file_name,
                        previous
                    ),
                    None => stems.push(document.stem().to_string()),
                }
                fs::write(destination.join(&document.file_name), &document.contents)?;
                result.image_count += 1;
                result.annotation_count += group.annotations.len();
            }
            None => result.skipped_images += 1,
        }

        if idx % 50 == 0 || idx + 1 == groups.len() {
            progress(ProgressEvent::new(
                "converting",
                idx + 1,
                groups.len(),
                Some(group.image.file_name.clone()),
            ));
        }
    }

    if let Some(name) = &options.imageset {
        let mut writer = BufWriter::new(File::create(destination.join(format!("{}.txt", name)))?);
        for stem in &stems {
            writeln!(writer, "{}", stem)?;
        }
        writer.flush()?;
    }

    Ok(result)
}

fn emit_records(
    groups: &[ImageGroup],
    destination: &Path,
    progress: &mut dyn FnMut(ProgressEvent),
) -> Result<ConvertResult> {
    let records = build_records(groups)?;
    progress(ProgressEvent::new(
        "converting",
        groups.len(),
        groups.len(),
        None,
    ));

    let output = destination.join(RECORDS_FILE_NAME);
    write_records(&output, &records)?;
    Ok(ConvertResult {
        output_path: output.to_string_lossy().into_owned(),
        image_count: records.len(),
        annotation_count: records.iter().map(|r| r.annotations.len()).sum(),
        skipped_images: 0,
        category_count: 0,
    })
}

fn build_records(groups: &[ImageGroup]) -> Result<Vec<ImageRecord>> {
    let converter = DetectionRecordConverter::new();
    let mut records = Vec::with_capacity(groups.len());
    for group in groups {
        if let Some(record) = converter.convert(group)? {
            records.push(record);
        }
    }
    Ok(records)
}

/// Image paths of `records`, in record order.
pub fn list_image_paths(records: &[ImageRecord]) -> Vec<String> {
    records.iter().map(|r| r.file_name.clone()).collect()
}

/// A CSV dataset assembled into detection records, held in memory.
#[derive(Debug, Clone)]
pub struct Dataset {
    settings: DatasetSettings,
    registry: CategoryRegistry,
    records: Vec<ImageRecord>,
}

impl Dataset {
    pub fn load(settings_path: impl AsRef<Path>, split: &str) -> Result<Self> {
        let settings = DatasetSettings::from_file(settings_path, split)?;
        Self::from_settings(settings, DimensionPolicy::Trust)
    }

    pub fn from_settings(settings: DatasetSettings, dimensions: DimensionPolicy) -> Result<Self> {
        let (registry, groups) = prepare(AnnotationSource::Csv {
            settings: settings.clone(),
            dimensions,
        })?;
        let records = build_records(&groups)?;
        log::info!(
            "Loaded {} images with {} categories from {}",
            records.len(),
            registry.len(),
            settings.annotations_csv.display()
        );
        Ok(Self {
            settings,
            registry,
            records,
        })
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn image_paths(&self) -> Vec<String> {
        list_image_paths(&self.records)
    }

    /// Class names in id order.
    pub fn thing_classes(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn registry(&self) -> &CategoryRegistry {
        &self.registry
    }

    pub fn base_directory(&self) -> &Path {
        &self.settings.base_directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BoxMode;
    use crate::parser::{parse_voc, read_voc, CocoAnnotation, CocoCategory, CocoDataset, CocoImage};
    use image::{GrayImage, RgbImage};
    use serde_json::json;
    use tempfile::TempDir;

    fn no_progress() -> impl FnMut(ProgressEvent) {
        |_| {}
    }

    fn coco_fixture(dir: &Path) -> CocoDataset {
        RgbImage::new(64, 48).save(dir.join("img1.jpg")).unwrap();
        RgbImage::new(32, 32).save(dir.join("img2.jpg")).unwrap();
        CocoDataset {
            images: vec![
                CocoImage {
                    id: 1,
                    file_name: "img1.jpg".to_string(),
                    height: 48,
                    width: 64,
                },
                CocoImage {
                    id: 2,
                    file_name: "img2.jpg".to_string(),
                    height: 32,
                    width: 32,
                },
            ],
            annotations: vec![
                CocoAnnotation {
                    image_id: 1,
                    bbox: [1.0, 2.0, 10.0, 20.0],
                    category_id: 1,
                },
                CocoAnnotation {
                    image_id: 2,
                    bbox: [3.0, 4.0, 5.0, 6.0],
                    category_id: 2,
                },
                CocoAnnotation {
                    image_id: 1,
                    bbox: [5.0, 5.0, 7.0, 9.0],
                    category_id: 2,
                },
            ],
            categories: Some(vec![
                CocoCategory {
                    id: 1,
                    name: "cat".to_string(),
                },
                CocoCategory {
                    id: 2,
                    name: "dog".to_string(),
                },
            ]),
        }
    }

    fn coco_source(dir: &Path, document: CocoDataset) -> AnnotationSource {
        AnnotationSource::Coco {
            annotations: CocoSource::Document(document),
            image_root: dir.to_path_buf(),
        }
    }

    struct CsvFixture {
        dir: TempDir,
        settings_path: PathBuf,
    }

    fn csv_fixture(csv: &str) -> CsvFixture {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("images");
        fs::create_dir_all(base.join("a")).unwrap();
        let annotations_csv = dir.path().join("annotations.csv");
        let classes_json = dir.path().join("classes.json");
        fs::write(&annotations_csv, csv).unwrap();
        fs::write(
            &classes_json,
            r#"{"__background__": 0, "cat": 1, "dog": 2}"#,
        )
        .unwrap();

        let settings_path = dir.path().join("dataset_info.json");
        fs::write(
            &settings_path,
            serde_json::to_string(&json!({
                "TRAIN": {
                    "base_directory": base,
                    "annotations_csv": annotations_csv,
                    "classes_json": classes_json,
                    "width": 640,
                    "height": 480
                }
            }))
            .unwrap(),
        )
        .unwrap();
        CsvFixture { dir, settings_path }
    }

    #[test]
    fn coco_to_voc_writes_one_file_per_image() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("voc");
        let document = coco_fixture(dir.path());

        let result = convert(
            coco_source(dir.path(), document),
            &out,
            OutputFormat::PascalVoc,
            &ConvertOptions::default(),
            &mut no_progress(),
        )
        .unwrap();

        assert_eq!(result.image_count, 2);
        assert_eq!(result.annotation_count, 3);
        assert_eq!(result.skipped_images, 0);
        assert_eq!(result.category_count, 2);

        let first = read_voc(out.join("img1.xml")).unwrap();
        let names: Vec<_> = first.objects.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["cat", "dog"]);
        assert_eq!((first.size.width, first.size.height), (64, 48));
        assert_eq!(
            crate::bbox::BoundingBox::from(first.objects[0].bndbox).coords,
            [1.0, 2.0, 11.0, 22.0]
        );

        let second = read_voc(out.join("img2.xml")).unwrap();
        assert_eq!(second.objects.len(), 1);
        assert_eq!(second.objects[0].name, "dog");
    }

    #[test]
    fn coco_to_voc_skips_grayscale_and_missing_images() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("voc");
        let mut document = coco_fixture(dir.path());
        GrayImage::new(32, 32).save(dir.path().join("img2.jpg")).unwrap();
        document.images.push(CocoImage {
            id: 3,
            file_name: "missing.jpg".to_string(),
            height: 10,
            width: 10,
        });
        document.annotations.push(CocoAnnotation {
            image_id: 3,
            bbox: [0.0, 0.0, 1.0, 1.0],
            category_id: 1,
        });

        let result = convert(
            coco_source(dir.path(), document),
            &out,
            OutputFormat::PascalVoc,
            &ConvertOptions::default(),
            &mut no_progress(),
        )
        .unwrap();

        assert_eq!(result.image_count, 1);
        assert_eq!(result.skipped_images, 2);
        assert!(out.join("img1.xml").exists());
        assert!(!out.join("img2.xml").exists());
        assert!(!out.join("missing.xml").exists());
    }

    #[test]
    fn unknown_coco_category_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut document = coco_fixture(dir.path());
        document.annotations[1].category_id = 99;

        let result = convert(
            coco_source(dir.path(), document),
            &dir.path().join("voc"),
            OutputFormat::PascalVoc,
            &ConvertOptions::default(),
            &mut no_progress(),
        );
        assert!(matches!(result, Err(Error::UnknownCategory(_))));
    }

    #[test]
    fn side_outputs_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("voc");
        let document = coco_fixture(dir.path());
        let options = ConvertOptions {
            categories_file: Some(dir.path().join("categories.json")),
            imageset: Some("train".to_string()),
            ..ConvertOptions::default()
        };

        let mut events = Vec::new();
        convert(
            coco_source(dir.path(), document),
            &out,
            OutputFormat::PascalVoc,
            &options,
            &mut |event: ProgressEvent| events.push(event.phase),
        )
        .unwrap();

        assert_eq!(fs::read_to_string(out.join("train.txt")).unwrap(), "img1\nimg2\n");
        let categories = CategoryRegistry::from_file(dir.path().join("categories.json")).unwrap();
        assert_eq!(categories.names(), vec!["cat", "dog"]);
        assert_eq!(events.first().map(String::as_str), Some("reading"));
        assert_eq!(events.last().map(String::as_str), Some("complete"));
    }

    #[test]
    fn rerun_overwrites_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("voc");
        for _ in 0..2 {
            let result = convert(
                coco_source(dir.path(), coco_fixture(dir.path())),
                &out,
                OutputFormat::PascalVoc,
                &ConvertOptions::default(),
                &mut no_progress(),
            )
            .unwrap();
            assert_eq!(result.image_count, 2);
        }
        assert_eq!(fs::read_dir(&out).unwrap().count(), 2);
    }

    #[test]
    fn namespaced_naming_keeps_same_named_images_apart() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        RgbImage::new(4, 4).save(dir.path().join("a/x.jpg")).unwrap();
        RgbImage::new(4, 4).save(dir.path().join("b/x.jpg")).unwrap();
        let document = CocoDataset {
            images: vec![
                CocoImage {
                    id: 1,
                    file_name: "a/x.jpg".to_string(),
                    height: 4,
                    width: 4,
                },
                CocoImage {
                    id: 2,
                    file_name: "b/x.jpg".to_string(),
                    height: 4,
                    width: 4,
                },
            ],
            annotations: vec![
                CocoAnnotation {
                    image_id: 1,
                    bbox: [0.0, 0.0, 1.0, 1.0],
                    category_id: 1,
                },
                CocoAnnotation {
                    image_id: 2,
                    bbox: [0.0, 0.0, 2.0, 2.0],
                    category_id: 1,
                },
            ],
            categories: Some(vec![CocoCategory {
                id: 1,
                name: "cat".to_string(),
            }]),
        };

        let flat = dir.path().join("flat");
        let flat_options = ConvertOptions {
            imageset: Some("all".to_string()),
            ..ConvertOptions::default()
        };
        let result = convert(
            coco_source(dir.path(), document.clone()),
            &flat,
            OutputFormat::PascalVoc,
            &flat_options,
            &mut no_progress(),
        )
        .unwrap();
        assert_eq!(result.image_count, 2);
        assert!(flat.join("x.xml").exists());
        assert_eq!(fs::read_dir(&flat).unwrap().count(), 2);
        assert_eq!(fs::read_to_string(flat.join("all.txt")).unwrap(), "x\n");

        let namespaced = dir.path().join("namespaced");
        let options = ConvertOptions {
            voc: VocOptions {
                naming: crate::converter::pascal_voc::OutputNaming::Namespaced,
                ..VocOptions::default()
            },
            ..ConvertOptions::default()
        };
        convert(
            coco_source(dir.path(), document),
            &namespaced,
            OutputFormat::PascalVoc,
            &options,
            &mut no_progress(),
        )
        .unwrap();
        assert!(namespaced.join("a__x.xml").exists());
        assert!(namespaced.join("b__x.xml").exists());
    }

    #[test]
    fn coco_without_categories_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("voc");
        let document: CocoDataset =
            serde_json::from_str(r#"{"images": [], "annotations": []}"#).unwrap();
        assert!(document.categories.is_none());

        let result = convert(
            coco_source(dir.path(), document),
            &out,
            OutputFormat::PascalVoc,
            &ConvertOptions::default(),
            &mut no_progress(),
        );
        assert!(matches!(result, Err(Error::MalformedInput(_))));
        assert!(!out.exists());
    }

    #[test]
    fn grouping_uses_first_record_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let (_, groups) = prepare(coco_source(dir.path(), coco_fixture(dir.path()))).unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].image.file_name, "img1.jpg");
        assert_eq!(groups[0].annotations.len(), 2);
        assert_eq!(groups[0].annotations[0].category.name, "cat");
        assert_eq!(groups[0].annotations[1].category.name, "dog");
        assert_eq!(groups[1].image.file_name, "img2.jpg");
    }

    #[test]
    fn inner_join_places_each_matched_annotation_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut document = coco_fixture(dir.path());
        document.annotations.push(CocoAnnotation {
            image_id: 42,
            bbox: [0.0, 0.0, 1.0, 1.0],
            category_id: 1,
        });
        let (_, groups) = prepare(coco_source(dir.path(), document)).unwrap();
        let total: usize = groups.iter().map(|g| g.annotations.len()).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn csv_dataset_builds_records() {
        let fixture = csv_fixture("a/b.jpg,10,20,110,220,cat\na/c.jpg,1,2,3,4,dog\na/b.jpg,5,6,7,8,dog\n");
        let dataset = Dataset::load(&fixture.settings_path, "TRAIN").unwrap();

        assert_eq!(dataset.thing_classes(), vec!["cat", "dog"]);
        let records = dataset.records();
        assert_eq!(records.len(), 2);
        assert!(records[0].file_name.ends_with("a/b.jpg"));
        assert_eq!((records[0].width, records[0].height), (640, 480));
        assert_eq!(records[0].image_id, "a/b.jpg");
        assert_eq!(records[0].annotations.len(), 2);
        assert_eq!(records[0].annotations[0].bbox, [10.0, 20.0, 110.0, 220.0]);
        assert_eq!(records[0].annotations[0].bbox_mode, BoxMode::XyxyAbs);
        assert_eq!(records[0].annotations[0].category_id, 0);
        assert_eq!(records[0].annotations[0].is_crowd, 0);
        assert_eq!(records[0].annotations[1].category_id, 1);

        let paths = dataset.image_paths();
        assert_eq!(paths.len(), 2);
        assert!(paths[1].ends_with("a/c.jpg"));
        assert_eq!(dataset.base_directory(), fixture.dir.path().join("images"));
    }

    #[test]
    fn csv_unknown_category_is_fatal() {
        let fixture = csv_fixture("a/b.jpg,10,20,110,220,horse\n");
        let result = Dataset::load(&fixture.settings_path, "TRAIN");
        assert!(matches!(result, Err(Error::UnknownCategory(name)) if name == "horse"));
    }

    #[test]
    fn unknown_split_is_reported() {
        let fixture = csv_fixture("a/b.jpg,10,20,110,220,cat\n");
        let result = Dataset::load(&fixture.settings_path, "VALIDATION");
        assert!(matches!(result, Err(Error::UnknownSplit(_))));
    }

    #[test]
    fn malformed_csv_aborts_without_output() {
        let fixture = csv_fixture("a/b.jpg,10,20,110,220,cat\na/c.jpg,1,2,3\n");
        let settings = DatasetSettings::from_file(&fixture.settings_path, "TRAIN").unwrap();
        let out = fixture.dir.path().join("out");

        let result = convert(
            AnnotationSource::Csv {
                settings,
                dimensions: DimensionPolicy::Trust,
            },
            &out,
            OutputFormat::DetectionRecords,
            &ConvertOptions::default(),
            &mut no_progress(),
        );

        assert!(matches!(result, Err(Error::Parse { line: 2, .. })));
        assert!(!out.exists());
    }

    #[test]
    fn csv_to_records_file() {
        let fixture = csv_fixture("a/b.jpg,10,20,110,220,cat\n");
        let settings = DatasetSettings::from_file(&fixture.settings_path, "TRAIN").unwrap();
        let out = fixture.dir.path().join("out");

        let result = convert(
            AnnotationSource::Csv {
                settings,
                dimensions: DimensionPolicy::Trust,
            },
            &out,
            OutputFormat::DetectionRecords,
            &ConvertOptions::default(),
            &mut no_progress(),
        )
        .unwrap();

        assert_eq!(result.image_count, 1);
        let records = crate::converter::detection::read_records(out.join(RECORDS_FILE_NAME)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].annotations[0].bbox, [10.0, 20.0, 110.0, 220.0]);
    }

    #[test]
    fn csv_to_voc_checks_real_images() {
        let fixture = csv_fixture("a/b.jpg,10,20,110,220,cat\n");
        RgbImage::new(640, 480)
            .save(fixture.dir.path().join("images/a/b.jpg"))
            .unwrap();
        let settings = DatasetSettings::from_file(&fixture.settings_path, "TRAIN").unwrap();
        let out = fixture.dir.path().join("voc");

        convert(
            AnnotationSource::Csv {
                settings,
                dimensions: DimensionPolicy::Trust,
            },
            &out,
            OutputFormat::PascalVoc,
            &ConvertOptions::default(),
            &mut no_progress(),
        )
        .unwrap();

        let voc = parse_voc(&fs::read_to_string(out.join("b.xml")).unwrap()).unwrap();
        assert_eq!(voc.filename, "b.jpg");
        assert_eq!(
            crate::bbox::BoundingBox::from(voc.objects[0].bndbox).coords,
            [10.0, 20.0, 110.0, 220.0]
        );
    }

    #[test]
    fn dimension_verification_catches_wrong_size() {
        let fixture = csv_fixture("a/b.jpg,10,20,110,220,cat\n");
        RgbImage::new(320, 240)
            .save(fixture.dir.path().join("images/a/b.jpg"))
            .unwrap();
        let settings = DatasetSettings::from_file(&fixture.settings_path, "TRAIN").unwrap();

        assert!(Dataset::from_settings(settings.clone(), DimensionPolicy::Trust).is_ok());
        let result = Dataset::from_settings(settings, DimensionPolicy::Verify);
        match result {
            Err(Error::DimensionMismatch {
                expected, actual, ..
            }) => {
                assert_eq!(expected, (640, 480));
                assert_eq!(actual, (320, 240));
            }
            other => panic!("expected dimension mismatch, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn list_image_paths_keeps_record_order() {
        let records: Vec<ImageRecord> = ["z.jpg", "a.jpg", "m.jpg"]
            .iter()
            .map(|name| ImageRecord {
                file_name: name.to_string(),
                height: 1,
                width: 1,
                image_id: name.to_string(),
                annotations: Vec::new(),
            })
            .collect();
        assert_eq!(list_image_paths(&records), vec!["z.jpg", "a.jpg", "m.jpg"]);
    }
}
