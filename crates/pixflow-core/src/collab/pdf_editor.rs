//! PDF editing (metadata, outlines, embedded images, merging) using lopdf.

use chrono::{DateTime, Utc};
use image::{DynamicImage, ImageFormat};
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use tracing::{debug, trace};

use super::{DocumentMetadata, EditableDocument, MergedPdf, PdfEditor, Result, SaveOptions, pdf_error};
use crate::error::TransformError;
use crate::imaging::{encode_jpeg, encode_jpeg_gray};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// PDF editor backed by lopdf.
#[derive(Debug, Clone, Default)]
pub struct LopdfEditor;

impl LopdfEditor {
    pub fn new() -> Self {
        Self
    }
}

impl PdfEditor for LopdfEditor {
    fn load(&self, bytes: &[u8]) -> Result<Box<dyn EditableDocument>> {
        let doc = load_document(bytes)?;
        debug!("Loaded PDF with {} pages", doc.get_pages().len());
        Ok(Box::new(LopdfDocument { doc }))
    }

    fn merge(&self, documents: &[&[u8]]) -> Result<MergedPdf> {
        let Some((first, rest)) = documents.split_first() else {
            return Err(TransformError::InvalidInput("no documents to merge".to_string()));
        };

        let mut dest = load_document(first)?;
        if rest.is_empty() {
            let pages = dest.get_pages().len();
            return Ok(MergedPdf {
                bytes: first.to_vec(),
                pages,
            });
        }

        let pages_id = root_pages_id(&dest)?;
        let mut page_ids: Vec<ObjectId> = dest.get_pages().into_values().collect();
        flatten_inherited(&mut dest, &page_ids);

        for (index, bytes) in rest.iter().enumerate() {
            let mut source = load_document(bytes)?;
            source.renumber_objects_with(dest.max_id + 1);

            let source_pages: Vec<ObjectId> = source.get_pages().into_values().collect();
            flatten_inherited(&mut source, &source_pages);
            trace!("Appending {} page(s) from document {}", source_pages.len(), index + 2);

            dest.max_id = dest.max_id.max(source.max_id);
            dest.objects.extend(source.objects);
            page_ids.extend(source_pages);
        }

        for page_id in &page_ids {
            if let Ok(page) = dest.get_object_mut(*page_id).and_then(Object::as_dict_mut) {
                page.set("Parent", Object::Reference(pages_id));
            }
        }

        let pages = dest
            .get_object_mut(pages_id)
            .and_then(Object::as_dict_mut)
            .map_err(pdf_error)?;
        pages.set(
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        );
        pages.set("Count", Object::Integer(page_ids.len() as i64));

        dest.prune_objects();
        dest.renumber_objects();
        dest.compress();

        let mut buffer = Vec::new();
        dest.save_to(&mut buffer).map_err(pdf_error)?;
        debug!("Merged {} documents into {} pages", documents.len(), page_ids.len());

        Ok(MergedPdf {
            bytes: buffer,
            pages: page_ids.len(),
        })
    }
}

fn load_document(bytes: &[u8]) -> Result<Document> {
    let doc = Document::load_mem(bytes).map_err(pdf_error)?;
    if doc.get_pages().is_empty() {
        return Err(TransformError::InvalidInput("PDF has no pages".to_string()));
    }
    Ok(doc)
}

fn root_pages_id(doc: &Document) -> Result<ObjectId> {
    doc.catalog()
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(pdf_error)
}

/// Copy inherited attributes onto each page so it can be re-parented.
fn flatten_inherited(doc: &mut Document, page_ids: &[ObjectId]) {
    for &page_id in page_ids {
        let missing: Vec<(&[u8], Object)> = INHERITABLE
            .iter()
            .filter_map(|key| inherited_attribute(doc, page_id, key).map(|value| (*key, value)))
            .collect();

        if let Ok(page) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
            for (key, value) in missing {
                page.set(key.to_vec(), value);
            }
        }
    }
}

/// An attribute the page lacks itself but inherits from a parent node.
fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let page = doc.get_dictionary(page_id).ok()?;
    if page.has(key) {
        return None;
    }

    let mut node = page.get(b"Parent").and_then(Object::as_reference).ok();
    while let Some(node_id) = node {
        let dict = doc.get_dictionary(node_id).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        node = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

/// A document loaded for editing.
struct LopdfDocument {
    doc: Document,
}

impl LopdfDocument {
    /// The document information dictionary, created when missing.
    fn info_mut(&mut self) -> Result<&mut Dictionary> {
        let info_id = match self.doc.trailer.get(b"Info").and_then(Object::as_reference) {
            Ok(id) => id,
            Err(_) => {
                let id = self.doc.add_object(Dictionary::new());
                self.doc.trailer.set("Info", Object::Reference(id));
                id
            }
        };

        self.doc
            .get_object_mut(info_id)
            .and_then(Object::as_dict_mut)
            .map_err(pdf_error)
    }

    fn info(&self) -> Option<&Dictionary> {
        let info = self.doc.trailer.get(b"Info").ok()?;
        match info {
            Object::Reference(id) => self.doc.get_dictionary(*id).ok(),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    fn set_text(&mut self, key: &str, value: &str) -> Result<()> {
        self.info_mut()?.set(
            key,
            Object::String(value.as_bytes().to_vec(), StringFormat::Literal),
        );
        Ok(())
    }

    fn text(&self, key: &[u8]) -> String {
        self.info()
            .and_then(|info| info.get(key).ok())
            .and_then(|value| value.as_str().ok())
            .map(decode_text)
            .unwrap_or_default()
    }

    fn date(&self, key: &[u8]) -> Option<String> {
        let value = self.text(key);
        (!value.is_empty()).then_some(value)
    }
}

/// Decode a PDF text string (UTF-16BE with BOM, or byte-per-character).
fn decode_text(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn pdf_date(date: DateTime<Utc>) -> String {
    date.format("D:%Y%m%d%H%M%SZ").to_string()
}

/// Whether a stream dictionary describes a JPEG image XObject.
fn is_jpeg_image(dict: &Dictionary) -> bool {
    let is_image = dict
        .get(b"Subtype")
        .and_then(Object::as_name)
        .is_ok_and(|name| name == b"Image");
    if !is_image {
        return false;
    }

    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => name == b"DCTDecode",
        Ok(Object::Array(filters)) if filters.len() == 1 => {
            filters[0].as_name().is_ok_and(|name| name == b"DCTDecode")
        }
        _ => false,
    }
}

/// Components per pixel the stream declares, for colour spaces that
/// round-trip through a baseline JPEG encoder unchanged.
///
/// Streams with a `/Decode` array or any other colour space (CMYK, ICC,
/// indexed, separations) are left alone.
fn recompressible_components(dict: &Dictionary) -> Option<u8> {
    if dict.has(b"Decode") {
        return None;
    }
    let bits = dict.get(b"BitsPerComponent").and_then(Object::as_i64).unwrap_or(8);
    if bits != 8 {
        return None;
    }

    match dict.get(b"ColorSpace").and_then(Object::as_name).ok()? {
        b"DeviceRGB" => Some(3),
        b"DeviceGray" => Some(1),
        _ => None,
    }
}

impl EditableDocument for LopdfDocument {
    fn set_title(&mut self, title: &str) -> Result<()> {
        self.set_text("Title", title)
    }

    fn set_author(&mut self, author: &str) -> Result<()> {
        self.set_text("Author", author)
    }

    fn set_subject(&mut self, subject: &str) -> Result<()> {
        self.set_text("Subject", subject)
    }

    fn set_keywords(&mut self, keywords: &[String]) -> Result<()> {
        self.set_text("Keywords", &keywords.join(" "))
    }

    fn set_creator(&mut self, creator: &str) -> Result<()> {
        self.set_text("Creator", creator)
    }

    fn set_producer(&mut self, producer: &str) -> Result<()> {
        self.set_text("Producer", producer)
    }

    fn set_creation_date(&mut self, date: DateTime<Utc>) -> Result<()> {
        self.set_text("CreationDate", &pdf_date(date))
    }

    fn set_modification_date(&mut self, date: DateTime<Utc>) -> Result<()> {
        self.set_text("ModDate", &pdf_date(date))
    }

    fn metadata(&self) -> DocumentMetadata {
        DocumentMetadata {
            title: self.text(b"Title"),
            author: self.text(b"Author"),
            subject: self.text(b"Subject"),
            keywords: self
                .text(b"Keywords")
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            creator: self.text(b"Creator"),
            producer: self.text(b"Producer"),
            creation_date: self.date(b"CreationDate"),
            modification_date: self.date(b"ModDate"),
        }
    }

    fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    fn strip_bookmarks(&mut self) -> Result<bool> {
        let catalog_id = self
            .doc
            .trailer
            .get(b"Root")
            .and_then(Object::as_reference)
            .map_err(pdf_error)?;
        let catalog = self
            .doc
            .get_object_mut(catalog_id)
            .and_then(Object::as_dict_mut)
            .map_err(pdf_error)?;

        let removed = catalog.remove(b"Outlines").is_some();
        let uses_outlines = catalog
            .get(b"PageMode")
            .and_then(Object::as_name)
            .is_ok_and(|mode| mode == b"UseOutlines");
        if uses_outlines {
            catalog.set("PageMode", Object::Name(b"UseNone".to_vec()));
        }

        debug!("Outline tree removed: {}", removed);
        Ok(removed)
    }

    fn recompress_images(&mut self, quality: u8) -> Result<usize> {
        let mut replaced = 0;

        for (id, object) in self.doc.objects.iter_mut() {
            let Object::Stream(stream) = object else {
                continue;
            };
            if !is_jpeg_image(&stream.dict) {
                continue;
            }

            let Some(components) = recompressible_components(&stream.dict) else {
                trace!("Skipping image {:?} in an unsupported colour space", id);
                continue;
            };

            let image = match image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg) {
                Ok(image) => image,
                Err(e) => {
                    trace!("Skipping undecodable image {:?}: {}", id, e);
                    continue;
                }
            };

            // The re-encoded data must keep the component count the dictionary declares.
            let encoded = match (components, &image) {
                (3, DynamicImage::ImageRgb8(_)) => encode_jpeg(&image, quality)?,
                (1, DynamicImage::ImageLuma8(gray)) => encode_jpeg_gray(gray, quality)?,
                _ => {
                    trace!("Skipping image {:?}: {:?} data with {} declared component(s)", id, image.color(), components);
                    continue;
                }
            };
            if encoded.len() < stream.content.len() {
                trace!("Image {:?}: {} -> {} bytes", id, stream.content.len(), encoded.len());
                stream.set_content(encoded);
                replaced += 1;
            }
        }

        debug!("Re-encoded {} embedded image(s) at quality {}", replaced, quality);
        Ok(replaced)
    }

    fn save(&mut self, options: SaveOptions) -> Result<Vec<u8>> {
        if options.optimize {
            let pruned = self.doc.prune_objects();
            let emptied = self.doc.delete_zero_length_streams();
            self.doc.renumber_objects();
            self.doc.compress();
            debug!("Pruned {} objects, dropped {} empty streams", pruned.len(), emptied.len());
        }

        let mut buffer = Vec::new();
        self.doc.save_to(&mut buffer).map_err(pdf_error)?;
        Ok(buffer)
    }
}
