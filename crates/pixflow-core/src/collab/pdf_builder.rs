//! PDF document builder using lopdf.

use image::{DynamicImage, ImageFormat};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, trace};

use super::{PdfBuilder, PdfCanvas, Placement, Result, pdf_error};
use crate::error::TransformError;
use crate::imaging::encode_jpeg;

/// Builds PDFs with one image XObject per drawn image.
#[derive(Debug, Clone)]
pub struct LopdfBuilder {
    jpeg_quality: u8,
}

impl LopdfBuilder {
    /// `jpeg_quality` is used for images that must be re-encoded before embedding.
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }
}

impl Default for LopdfBuilder {
    fn default() -> Self {
        Self::new(92)
    }
}

impl PdfBuilder for LopdfBuilder {
    fn new_document(&self) -> Box<dyn PdfCanvas> {
        Box::new(LopdfCanvas::new(self.jpeg_quality))
    }
}

struct PageDraft {
    width: f32,
    height: f32,
    images: Vec<(ObjectId, Placement)>,
}

struct LopdfCanvas {
    doc: Document,
    pages_id: ObjectId,
    pages: Vec<PageDraft>,
    jpeg_quality: u8,
}

/// JPEG stream ready to embed.
struct EmbeddedJpeg {
    data: Vec<u8>,
    width: u32,
    height: u32,
    color_space: &'static [u8],
}

impl LopdfCanvas {
    fn new(jpeg_quality: u8) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            pages: Vec::new(),
            jpeg_quality,
        }
    }

    /// JPEGs in RGB or grayscale are embedded as-is; everything else is re-encoded.
    fn prepare(&self, bytes: &[u8], format: ImageFormat) -> Result<EmbeddedJpeg> {
        let image = image::load_from_memory_with_format(bytes, format)?;
        let (width, height) = (image.width(), image.height());

        if format == ImageFormat::Jpeg {
            match &image {
                DynamicImage::ImageRgb8(_) => {
                    trace!("Embedding RGB JPEG as-is");
                    return Ok(EmbeddedJpeg { data: bytes.to_vec(), width, height, color_space: b"DeviceRGB" });
                }
                DynamicImage::ImageLuma8(_) => {
                    trace!("Embedding grayscale JPEG as-is");
                    return Ok(EmbeddedJpeg { data: bytes.to_vec(), width, height, color_space: b"DeviceGray" });
                }
                _ => {}
            }
        }

        debug!("Re-encoding {:?} image as JPEG (quality {})", format, self.jpeg_quality);
        let data = encode_jpeg(&image, self.jpeg_quality)?;
        Ok(EmbeddedJpeg { data, width, height, color_space: b"DeviceRGB" })
    }
}

impl PdfCanvas for LopdfCanvas {
    fn add_page(&mut self, width: f32, height: f32) {
        self.pages.push(PageDraft {
            width,
            height,
            images: Vec::new(),
        });
    }

    fn add_image(&mut self, bytes: &[u8], format: ImageFormat, placement: Placement) -> Result<()> {
        if self.pages.is_empty() {
            return Err(TransformError::InvalidInput("no page to draw on".to_string()));
        }

        let jpeg = self.prepare(bytes, format)?;
        let dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"XObject".to_vec())),
            ("Subtype", Object::Name(b"Image".to_vec())),
            ("Width", Object::Integer(i64::from(jpeg.width))),
            ("Height", Object::Integer(i64::from(jpeg.height))),
            ("ColorSpace", Object::Name(jpeg.color_space.to_vec())),
            ("BitsPerComponent", Object::Integer(8)),
            ("Filter", Object::Name(b"DCTDecode".to_vec())),
        ]);
        let image_id = self.doc.add_object(Stream::new(dict, jpeg.data));

        if let Some(page) = self.pages.last_mut() {
            page.images.push((image_id, placement));
        }
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn serialize(self: Box<Self>) -> Result<Vec<u8>> {
        let LopdfCanvas {
            mut doc,
            pages_id,
            pages,
            ..
        } = *self;

        let mut page_ids = Vec::with_capacity(pages.len());

        for page in &pages {
            let mut operations = Vec::new();
            let mut xobjects = Dictionary::new();

            for (index, (image_id, placement)) in page.images.iter().enumerate() {
                let name = format!("Im{}", index + 1);
                // PDF user space has its origin at the bottom-left corner.
                let y = page.height - placement.y - placement.height;

                operations.push(Operation::new("q", vec![]));
                operations.push(Operation::new(
                    "cm",
                    vec![
                        Object::Real(placement.width),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(placement.height),
                        Object::Real(placement.x),
                        Object::Real(y),
                    ],
                ));
                operations.push(Operation::new("Do", vec![Object::Name(name.clone().into_bytes())]));
                operations.push(Operation::new("Q", vec![]));

                xobjects.set(name, Object::Reference(*image_id));
            }

            let content = Content { operations }.encode().map_err(pdf_error)?;
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

            let resources = Dictionary::from_iter(vec![("XObject", Object::Dictionary(xobjects))]);
            let page_dict = Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                (
                    "MediaBox",
                    Object::Array(vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(page.width),
                        Object::Real(page.height),
                    ]),
                ),
                ("Contents", Object::Reference(content_id)),
                ("Resources", Object::Dictionary(resources)),
            ]);
            page_ids.push(doc.add_object(page_dict));
        }

        let pages_dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(page_ids.len() as i64)),
            (
                "Kids",
                Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
            ),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

        let catalog = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]);
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));

        doc.compress();

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).map_err(pdf_error)?;
        debug!("Serialized PDF with {} page(s), {} bytes", page_ids.len(), buffer.len());
        Ok(buffer)
    }
}
