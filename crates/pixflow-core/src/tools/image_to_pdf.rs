//! Image to PDF: one page per image, each image fitted and centred.

use std::sync::Arc;

use tracing::debug;

use super::{IMAGE_TO_PDF, configured};
use crate::collab::{PdfBuilder, Placement};
use crate::error::TransformError;
use crate::imaging;
use crate::models::config::PdfConfig;
use crate::models::{FileSet, ParamSpec, ParamValues, ResultArtifact};
use crate::registry::{ToolDescriptor, Transform};

const PAGE_SIZES: [(&str, &str); 4] = [
    ("a4", "A4"),
    ("letter", "Letter"),
    ("legal", "Legal"),
    ("fit", "Fit to Image"),
];

const ORIENTATIONS: [(&str, &str); 3] = [
    ("portrait", "Portrait"),
    ("landscape", "Landscape"),
    ("auto", "Auto"),
];

const POINTS_PER_MM: f32 = 72.0 / 25.4;

/// Page size preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSize {
    A4,
    Letter,
    Legal,
    /// Page matches the image, one point per pixel.
    Fit,
}

impl PageSize {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "a4" => Some(Self::A4),
            "letter" => Some(Self::Letter),
            "legal" => Some(Self::Legal),
            "fit" => Some(Self::Fit),
            _ => None,
        }
    }

    /// Portrait dimensions in points; `None` for [`PageSize::Fit`].
    pub fn points(self) -> Option<(f32, f32)> {
        match self {
            Self::A4 => Some((595.0, 842.0)),
            Self::Letter => Some((612.0, 792.0)),
            Self::Legal => Some((612.0, 1008.0)),
            Self::Fit => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
    /// Landscape for images wider than tall.
    Auto,
}

impl Orientation {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "portrait" => Some(Self::Portrait),
            "landscape" => Some(Self::Landscape),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }
}

/// Page dimensions in points for an image of `image_width`×`image_height` pixels.
pub fn page_dimensions(
    size: PageSize,
    orientation: Orientation,
    margin: f32,
    image_width: u32,
    image_height: u32,
) -> (f32, f32) {
    let Some((width, height)) = size.points() else {
        return (image_width as f32 + 2.0 * margin, image_height as f32 + 2.0 * margin);
    };

    let landscape = match orientation {
        Orientation::Portrait => false,
        Orientation::Landscape => true,
        Orientation::Auto => image_width > image_height,
    };

    if landscape { (height, width) } else { (width, height) }
}

/// Scale an image to the content box and centre it on the page.
pub fn fit_image_to_page(
    page_width: f32,
    page_height: f32,
    margin: f32,
    image_width: u32,
    image_height: u32,
) -> Placement {
    let content_width = (page_width - 2.0 * margin).max(1.0);
    let content_height = (page_height - 2.0 * margin).max(1.0);
    let (image_width, image_height) = (image_width.max(1) as f32, image_height.max(1) as f32);

    let mut width = content_width;
    let mut height = image_height * content_width / image_width;
    if height > content_height {
        height = content_height;
        width = image_width * content_height / image_height;
    }

    Placement {
        x: (page_width - width) / 2.0,
        y: (page_height - height) / 2.0,
        width,
        height,
    }
}

pub fn descriptor(config: &PdfConfig, builder: Arc<dyn PdfBuilder>) -> ToolDescriptor {
    ToolDescriptor::new(IMAGE_TO_PDF, "Image to PDF", ImageToPdf { builder })
        .with_description("Combine images into a PDF, one page per image")
        .with_param(ParamSpec::choice(
            "page_size",
            "Page Size",
            &PAGE_SIZES,
            configured(&config.page_size, &PAGE_SIZES, "a4"),
        ))
        .with_param(ParamSpec::choice(
            "orientation",
            "Orientation",
            &ORIENTATIONS,
            configured(&config.orientation, &ORIENTATIONS, "portrait"),
        ))
        .with_param(ParamSpec::number("margin", "Margin (mm)", 0.0, 50.0, config.margin_mm))
        .accepting("image/*")
}

struct ImageToPdf {
    builder: Arc<dyn PdfBuilder>,
}

impl Transform for ImageToPdf {
    fn apply(&self, files: &FileSet, params: &ParamValues) -> Result<ResultArtifact, TransformError> {
        let page_size = PageSize::parse(params.choice("page_size")?)
            .ok_or_else(|| TransformError::InvalidParameter("unknown page size".to_string()))?;
        let orientation = Orientation::parse(params.choice("orientation")?)
            .ok_or_else(|| TransformError::InvalidParameter("unknown orientation".to_string()))?;
        let margin = params.number("margin")? as f32 * POINTS_PER_MM;

        let mut canvas = self.builder.new_document();

        for file in files {
            let ((width, height), format) = imaging::dimensions(file.bytes())?;

            let (page_width, page_height) = page_dimensions(page_size, orientation, margin, width, height);
            let placement = fit_image_to_page(page_width, page_height, margin, width, height);
            debug!(
                "{}: {}x{} px on {}x{} pt page at {:?}",
                file.name(),
                width,
                height,
                page_width,
                page_height,
                placement
            );

            canvas.add_page(page_width, page_height);
            canvas.add_image(file.bytes(), format, placement)?;
        }

        let pages = canvas.page_count();
        let bytes = canvas.serialize()?;

        Ok(ResultArtifact::new(bytes, "converted.pdf", "application/pdf")
            .with_summary(format!("Created PDF with {} page(s)", pages)))
    }
}
