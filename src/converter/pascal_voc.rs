use super::{Converter, ImageGroup};
use crate::decoder::{ImageDecoder, PixelDecoder};
use crate::error::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Cursor, Write};
use std::path::{Component, Path};

/// How the XML file name is derived from the image reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputNaming {
    /// `dir/img.jpg` -> `img.xml`. Same-named images in different
    /// directories overwrite each other.
    #[default]
    BaseName,
    /// `dir/img.jpg` -> `dir__img.xml`.
    Namespaced,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocOptions {
    pub folder: String,
    pub database: String,
    pub annotation: String,
    pub image: String,
    pub naming: OutputNaming,
}

impl Default for VocOptions {
    fn default() -> Self {
        Self {
            folder: "VOC2014".to_string(),
            database: "MS COCO 2014".to_string(),
            annotation: "MS COCO 2014".to_string(),
            image: "Flickr".to_string(),
            naming: OutputNaming::default(),
        }
    }
}

/// A rendered VOC-XML file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocDocument {
    pub file_name: String,
    pub contents: Vec<u8>,
}

impl VocDocument {
    pub fn stem(&self) -> &str {
        self.file_name
            .strip_suffix(".xml")
            .unwrap_or(&self.file_name)
    }
}

pub struct PascalVocConverter<D = PixelDecoder> {
    options: VocOptions,
    decoder: D,
}

impl PascalVocConverter {
    pub fn new(options: VocOptions) -> Self {
        Self::with_decoder(options, PixelDecoder)
    }
}

impl<D: ImageDecoder> PascalVocConverter<D> {
    pub fn with_decoder(options: VocOptions, decoder: D) -> Self {
        Self { options, decoder }
    }

    /// Only 3-channel images are converted; anything else, including files
    /// that fail to decode, is left out.
    fn accepts(&self, group: &ImageGroup) -> bool {
        let path = &group.image.path;
        match self.decoder.decode(path) {
            Ok(shape) if shape.channels == 3 => {
                if (shape.width, shape.height) != (group.image.width, group.image.height) {
                    log::debug!(
                        "{} decodes as {}x{}, annotations declare {}x{}",
                        path.display(),
                        shape.width,
                        shape.height,
                        group.image.width,
                        group.image.height
                    );
                }
                true
            }
            Ok(shape) => {
                log::warn!(
                    "Skipping {}: {} channels instead of 3",
                    path.display(),
                    shape.channels
                );
                false
            }
            Err(e) => {
                log::warn!("Skipping {}: {}", path.display(), e);
                false
            }
        }
    }

    fn create_voc_xml(&self, group: &ImageGroup) -> Result<Vec<u8>> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        writer.write_event(Event::Start(BytesStart::new("annotation")))?;

        let image_file = base_name(&group.image.file_name);
        write_element(&mut writer, "folder", &self.options.folder)?;
        write_element(&mut writer, "filename", image_file)?;

        writer.write_event(Event::Start(BytesStart::new("source")))?;
        write_element(&mut writer, "database", &self.options.database)?;
        write_element(&mut writer, "annotation", &self.options.annotation)?;
        write_element(&mut writer, "image", &self.options.image)?;
        writer.write_event(Event::End(BytesEnd::new("source")))?;

        writer.write_event(Event::Start(BytesStart::new("size")))?;
        write_element(&mut writer, "width", &group.image.width.to_string())?;
        write_element(&mut writer, "height", &group.image.height.to_string())?;
        write_element(&mut writer, "depth", "3")?;
        writer.write_event(Event::End(BytesEnd::new("size")))?;

        write_element(&mut writer, "segmented", "0")?;

        for annotation in &group.annotations {
            writer.write_event(Event::Start(BytesStart::new("object")))?;
            write_element(&mut writer, "name", &annotation.category.name)?;

            let [xmin, ymin, xmax, ymax] = annotation.bbox.to_xyxy().coords;
            writer.write_event(Event::Start(BytesStart::new("bndbox")))?;
            write_element(&mut writer, "xmin", &xmin.to_string())?;
            write_element(&mut writer, "ymin", &ymin.to_string())?;
            write_element(&mut writer, "xmax", &xmax.to_string())?;
            write_element(&mut writer, "ymax", &ymax.to_string())?;
            writer.write_event(Event::End(BytesEnd::new("bndbox")))?;

            writer.write_event(Event::End(BytesEnd::new("object")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("annotation")))?;

        let mut contents = writer.into_inner().into_inner();
        contents.push(b'\n');
        Ok(contents)
    }
}

impl<D: ImageDecoder> Converter for PascalVocConverter<D> {
    type Output = VocDocument;

    fn convert(&self, group: &ImageGroup) -> Result<Option<VocDocument>> {
        if !self.accepts(group) {
            return Ok(None);
        }
        Ok(Some(VocDocument {
            file_name: xml_file_name(&group.image.file_name, self.options.naming),
            contents: self.create_voc_xml(group)?,
        }))
    }
}

fn write_element<W: Write>(writer: &mut Writer<W>, name: &str, value: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn base_name(file_name: &str) -> &str {
    Path::new(file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(file_name)
}

fn strip_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// Name of the XML file written for an image reference.
pub fn xml_file_name(file_name: &str, naming: OutputNaming) -> String {
    match naming {
        OutputNaming::BaseName => format!("{}.xml", strip_extension(base_name(file_name))),
        OutputNaming::Namespaced => {
            // `..` and the root stay visible so `../x.jpg`, `/x.jpg` and
            // `x.jpg` get distinct names.
            let mut parts: Vec<String> = Path::new(file_name)
                .components()
                .filter_map(|component| match component {
                    Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                    Component::ParentDir => Some("..".to_string()),
                    Component::RootDir => Some(String::new()),
                    Component::Prefix(prefix) => {
                        Some(prefix.as_os_str().to_string_lossy().into_owned())
                    }
                    Component::CurDir => None,
                })
                .collect();
            if let Some(last) = parts.last_mut() {
                *last = strip_extension(last).to_string();
            }
            format!("{}.xml", parts.join("__"))
        }
    }
}
