use crate::converter::pascal_voc::OutputNaming;
use crate::converter::{get_format, OutputFormat};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Convert object-detection annotations between COCO, CSV, Pascal VOC and
/// detection-record formats.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert a COCO annotation file into one VOC-XML file per image
    Coco2voc {
        /// COCO JSON annotation file
        annotations: PathBuf,

        /// Destination directory, created if missing
        output: PathBuf,

        /// Directory the COCO `file_name`s are relative to
        /// [default: the annotation file's directory]
        #[arg(long)]
        images: Option<PathBuf>,

        /// How XML file names are derived from image names
        #[arg(long, value_enum, default_value = "base-name")]
        naming: Naming,

        /// Value of the VOC `<folder>` element
        #[arg(long, default_value = "VOC2014")]
        folder: String,

        /// Output format: 'voc' or 'records'
        #[arg(long, value_parser = parse_format, default_value = "voc")]
        format: OutputFormat,

        /// Also write the category list to this JSON file
        #[arg(long)]
        categories: Option<PathBuf>,

        /// Also write `<NAME>.txt` listing every emitted annotation stem
        #[arg(long)]
        imageset: Option<String>,
    },

    /// Build detection records from a CSV dataset split
    Records {
        /// Dataset settings JSON keyed by split name
        settings: PathBuf,

        /// Split to read, e.g. TRAIN
        split: String,

        /// Destination directory, created if missing
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Output format: 'records' or 'voc'
        #[arg(long, value_parser = parse_format, default_value = "records")]
        format: OutputFormat,

        /// Check every image against the configured width and height
        #[arg(long = "verify-dimensions")]
        verify_dimensions: bool,

        /// Also write the category list to this JSON file
        #[arg(long)]
        categories: Option<PathBuf>,

        /// Also write `<NAME>.txt` listing every emitted annotation stem
        #[arg(long)]
        imageset: Option<String>,
    },

    /// Print the image paths of a CSV dataset split, one per line
    Paths {
        settings: PathBuf,
        split: String,
    },

    /// Print the dense category registry built from a class list or COCO file
    Categories {
        source: PathBuf,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum Naming {
    /// `a/b/img.jpg` -> `img.xml`; same-named images overwrite each other
    BaseName,
    /// `a/b/img.jpg` -> `a__b__img.xml`
    Namespaced,
}

impl From<Naming> for OutputNaming {
    fn from(naming: Naming) -> Self {
        match naming {
            Naming::BaseName => OutputNaming::BaseName,
            Naming::Namespaced => OutputNaming::Namespaced,
        }
    }
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    get_format(s).ok_or_else(|| format!("unknown output format '{}', expected 'voc' or 'records'", s))
}
