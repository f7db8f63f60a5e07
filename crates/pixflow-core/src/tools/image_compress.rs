//! Image compressor: re-encode the first image at a chosen quality.

use tracing::debug;

use super::resize::{FORMATS, output_format};
use super::{IMAGE_COMPRESSOR, configured, first_file, first_image, quality};
use crate::error::TransformError;
use crate::imaging;
use crate::models::config::ImageConfig;
use crate::models::{FileSet, ParamSpec, ParamValues, ResultArtifact, SizeReport};
use crate::registry::ToolDescriptor;

pub fn descriptor(config: &ImageConfig) -> ToolDescriptor {
    ToolDescriptor::new(IMAGE_COMPRESSOR, "Image Compressor", compress_image)
        .with_description("Reduce image file size")
        .with_param(ParamSpec::choice(
            "format",
            "Output Format",
            &FORMATS,
            configured(&config.format, &FORMATS, "jpg"),
        ))
        .with_param(ParamSpec::number("quality", "Quality", 10.0, 100.0, 75.0))
        .accepting("image/*")
}

fn compress_image(files: &FileSet, params: &ParamValues) -> Result<ResultArtifact, TransformError> {
    let format = output_format(params)?;
    let quality = quality(params.number("quality")?);

    let original = first_file(files)?.size();
    let (image, source_format) = first_image(files)?;
    let bytes = imaging::encode(&image, format, quality)?;
    debug!("Re-encoded {:?} as {} at quality {}", source_format, format, quality);

    let report = SizeReport::new(original, bytes.len() as u64);
    let mut artifact = ResultArtifact::new(bytes, format!("compressed.{}", format.extension()), format.mime());
    for line in report.lines("Compressed") {
        artifact = artifact.with_summary(line);
    }
    Ok(artifact)
}
