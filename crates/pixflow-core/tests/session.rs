//! Session scenarios over the built-in catalog.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use pixflow_core::collab::{PdfCanvas, Placement};
use pixflow_core::imaging::{self, OutputFormat};
use pixflow_core::tools::{BG_REMOVER, IMAGE_RESIZER, IMAGE_TO_PDF, PDF_MERGER};
use pixflow_core::{
    Collaborators, FileHandle, FileSet, MemoryHost, ParamValues, PdfBuilder, PixflowConfig, PixflowError,
    ResultArtifact, Session, ToolDescriptor, ToolRegistry, TransformError,
};
use pretty_assertions::assert_eq;

/// Pages drawn through [`RecordingBuilder`].
#[derive(Debug, Clone, PartialEq)]
struct DrawnPage {
    width: f32,
    height: f32,
    images: Vec<(ImageFormat, Placement)>,
}

#[derive(Default)]
struct RecordingBuilder {
    pages: Arc<Mutex<Vec<DrawnPage>>>,
}

struct RecordingCanvas {
    pages: Arc<Mutex<Vec<DrawnPage>>>,
}

impl PdfBuilder for RecordingBuilder {
    fn new_document(&self) -> Box<dyn PdfCanvas> {
        Box::new(RecordingCanvas {
            pages: Arc::clone(&self.pages),
        })
    }
}

impl PdfCanvas for RecordingCanvas {
    fn add_page(&mut self, width: f32, height: f32) {
        self.pages.lock().unwrap().push(DrawnPage {
            width,
            height,
            images: Vec::new(),
        });
    }

    fn add_image(&mut self, _bytes: &[u8], format: ImageFormat, placement: Placement) -> Result<(), TransformError> {
        let mut pages = self.pages.lock().unwrap();
        let page = pages.last_mut().ok_or_else(|| TransformError::InvalidInput("no page".to_string()))?;
        page.images.push((format, placement));
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.pages.lock().unwrap().len()
    }

    fn serialize(self: Box<Self>) -> Result<Vec<u8>, TransformError> {
        Ok(b"%PDF-fake".to_vec())
    }
}

fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([90, 140, 30])));
    imaging::encode(&image, OutputFormat::Jpg, 90).unwrap()
}

fn jpeg_file(name: &str, width: u32, height: u32) -> FileHandle {
    FileHandle::new(name, "image/jpeg", jpeg(width, height))
}

fn builtin_session(collab: Collaborators) -> Session<Arc<MemoryHost>> {
    Session::builtin(&PixflowConfig::default(), collab, Arc::new(MemoryHost::new())).unwrap()
}

#[test]
fn test_image_to_pdf_a4_placement() {
    let builder = RecordingBuilder::default();
    let pages = Arc::clone(&builder.pages);
    let session = builtin_session(Collaborators::default().with_pdf_builder(Arc::new(builder)));

    session.select_tool(IMAGE_TO_PDF).unwrap();
    session.accept(vec![jpeg_file("wide.jpg", 1000, 500)]).unwrap();
    let outcome = session.run().unwrap();

    assert_eq!(outcome.handle.filename, "converted.pdf");
    assert_eq!(outcome.summary, vec!["Created PDF with 1 page(s)"]);
    assert_eq!(
        *pages.lock().unwrap(),
        vec![DrawnPage {
            width: 595.0,
            height: 842.0,
            images: vec![(ImageFormat::Jpeg, Placement { x: 0.0, y: 272.25, width: 595.0, height: 297.5 })],
        }]
    );
}

#[test]
fn test_image_to_pdf_real_document() {
    let session = builtin_session(Collaborators::default());
    session.select_tool(IMAGE_TO_PDF).unwrap();
    session.set_param("page_size", "letter").unwrap();
    session
        .accept(vec![jpeg_file("a.jpg", 300, 200), jpeg_file("b.jpg", 200, 300)])
        .unwrap();

    let outcome = session.run().unwrap();
    assert_eq!(outcome.summary, vec!["Created PDF with 2 page(s)"]);

    let bytes = session
        .download(|handle, host| host.resolve(&handle.url))
        .flatten()
        .unwrap();
    let doc = lopdf::Document::load_mem(&bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 2);
}

#[test]
fn test_pdf_tools_reject_images() {
    let session = builtin_session(Collaborators::default());
    session.select_tool(PDF_MERGER).unwrap();

    let err = session.accept(vec![jpeg_file("photo.jpg", 10, 10)]).unwrap_err();
    assert!(matches!(err, PixflowError::UnsupportedFile { .. }));
    assert!(session.files().is_empty());
}

#[test]
fn test_params_reset_on_tool_switch() {
    let session = builtin_session(Collaborators::default());
    session.select_tool(IMAGE_RESIZER).unwrap();
    session.set_param("scale", 50u32).unwrap();
    assert!(session.set_param("scale", 500u32).is_err());

    session.select_tool(BG_REMOVER).unwrap();
    session.select_tool(IMAGE_RESIZER).unwrap();
    assert_eq!(session.params().number("scale").unwrap(), 100.0);
}

#[test]
fn test_resize_through_session() {
    let session = builtin_session(Collaborators::default());
    session.select_tool(IMAGE_RESIZER).unwrap();
    session.set_param("mode", "preset").unwrap();
    session.set_param("preset", "hd").unwrap();
    session.set_param("format", "png").unwrap();
    session.accept(vec![jpeg_file("photo.jpg", 64, 48)]).unwrap();

    let outcome = session.run().unwrap();
    assert_eq!(outcome.handle.filename, "resized.png");
    assert_eq!(outcome.summary, vec!["Resized to 1280×720 pixels"]);
}

#[test]
fn test_segment_strategy_without_service_fails_cleanly() {
    let session = builtin_session(Collaborators::default());
    session.select_tool(BG_REMOVER).unwrap();
    session.set_param("strategy", "segment").unwrap();
    session.accept(vec![jpeg_file("photo.jpg", 8, 8)]).unwrap();

    let err = session.run().unwrap_err();
    assert!(matches!(
        err,
        PixflowError::Transform { ref tool_id, cause: TransformError::Unavailable(_) } if tool_id == BG_REMOVER
    ));
    assert!(!session.is_busy());
    assert!(session.current_download().is_none());
}

#[test]
fn test_concurrent_run_is_rejected() {
    let (entered_tx, entered_rx) = mpsc::channel::<()>();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let entered_tx = Mutex::new(entered_tx);
    let release_rx = Mutex::new(release_rx);

    let blocking = move |_files: &FileSet, _params: &ParamValues| -> Result<ResultArtifact, TransformError> {
        entered_tx.lock().unwrap().send(()).unwrap();
        release_rx.lock().unwrap().recv().unwrap();
        Ok(ResultArtifact::new(vec![1], "slow.bin", "application/octet-stream"))
    };

    let mut registry = ToolRegistry::new();
    registry.register(ToolDescriptor::new("slow", "Slow", blocking)).unwrap();
    let session = Session::new(Arc::new(registry), Arc::new(MemoryHost::new()));
    session.select_tool("slow").unwrap();
    session
        .accept(vec![FileHandle::new("a.bin", "application/octet-stream", vec![0u8])])
        .unwrap();

    thread::scope(|scope| {
        let first = scope.spawn(|| session.run());
        entered_rx.recv().unwrap();

        assert!(session.is_busy());
        assert!(matches!(session.run(), Err(PixflowError::Busy)));

        release_tx.send(()).unwrap();
        assert!(first.join().unwrap().is_ok());
    });

    assert!(!session.is_busy());
    assert!(session.current_download().is_some());
}
