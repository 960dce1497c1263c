pub mod bbox;
pub mod categories;
pub mod cli;
pub mod converter;
pub mod dataset;
pub mod decoder;
pub mod error;
pub mod evaluation;
pub mod grouper;
pub mod parser;

pub use bbox::{BoundingBox, BoxMode};
pub use categories::{Category, CategoryRegistry, CategorySource};
pub use converter::{get_format, Converter, ImageGroup, OutputFormat};
pub use dataset::{
    convert, list_image_paths, AnnotationSource, ConvertOptions, ConvertResult, Dataset,
    DatasetSettings, DimensionPolicy, ProgressEvent,
};
pub use error::{Error, Result};
pub use evaluation::{evaluate, Detection, EvaluationRecord, Predictor};

use clap::Parser;
use cli::{Args, Command};
use converter::pascal_voc::VocOptions;
use indicatif::{ProgressBar, ProgressStyle};
use parser::CocoSource;
use std::path::Path;
use std::process::ExitCode;

/// Entry point of the `annotation-converter` binary.
pub fn run() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match execute(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn execute(command: Command) -> Result<()> {
    match command {
        Command::Coco2voc {
            annotations,
            output,
            images,
            naming,
            folder,
            format,
            categories,
            imageset,
        } => {
            let image_root = images.unwrap_or_else(|| {
                annotations
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default()
            });
            let options = ConvertOptions {
                voc: VocOptions {
                    folder,
                    naming: naming.into(),
                    ..VocOptions::default()
                },
                categories_file: categories,
                imageset,
            };
            let source = AnnotationSource::Coco {
                annotations: CocoSource::Path(annotations),
                image_root,
            };
            run_conversion(source, &output, format, &options)
        }
        Command::Records {
            settings,
            split,
            output,
            format,
            verify_dimensions,
            categories,
            imageset,
        } => {
            let settings = DatasetSettings::from_file(&settings, &split)?;
            let dimensions = if verify_dimensions {
                DimensionPolicy::Verify
            } else {
                DimensionPolicy::Trust
            };
            let options = ConvertOptions {
                categories_file: categories,
                imageset,
                ..ConvertOptions::default()
            };
            let source = AnnotationSource::Csv {
                settings,
                dimensions,
            };
            run_conversion(source, &output, format, &options)
        }
        Command::Paths { settings, split } => {
            let dataset = Dataset::load(&settings, &split)?;
            for path in dataset.image_paths() {
                println!("{}", path);
            }
            Ok(())
        }
        Command::Categories { source, output } => {
            let registry = CategoryRegistry::from_file(&source)?;
            match output {
                Some(path) => {
                    registry.write_categories(&path)?;
                    log::info!(
                        "Wrote {} categories to {}",
                        registry.len(),
                        path.display()
                    );
                }
                None => println!("{}", registry.to_json_pretty()?),
            }
            Ok(())
        }
    }
}

fn run_conversion(
    source: AnnotationSource,
    destination: &Path,
    format: OutputFormat,
    options: &ConvertOptions,
) -> Result<()> {
    let bar = ProgressBar::new(0);
    let style = ProgressStyle::with_template(
        "[{elapsed_precise}] {prefix:>10} [{bar:40.cyan/blue}] {pos}/{len} {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("#>-");
    bar.set_style(style);

    let result = convert(source, destination, format, options, &mut |event: ProgressEvent| {
        bar.set_prefix(event.phase);
        bar.set_length(event.total as u64);
        bar.set_position(event.current as u64);
        if let Some(item) = event.item {
            bar.set_message(item);
        }
    });
    bar.finish_and_clear();

    let result = result?;
    println!(
        "Converted {} images ({} skipped, {} annotations, {} categories) -> {}",
        result.image_count,
        result.skipped_images,
        result.annotation_count,
        result.category_count,
        result.output_path
    );
    Ok(())
}
