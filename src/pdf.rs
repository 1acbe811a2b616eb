//! Pdfium-backed document loading and page rasterization.
//!
//! The system pdfium library is bound once at startup. When it cannot be
//! found the app still runs; loading a document then fails with
//! [`TakeoffError::RendererUnavailable`] and the shell explains why.

use std::path::Path;

use image::RgbaImage;
use pdfium_render::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TakeoffError {
    #[error("PDF rendering is unavailable (pdfium system library not found)")]
    RendererUnavailable,
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to load PDF: {reason}")]
    Load { reason: String },
    #[error("failed to render page {page}: {reason}")]
    Render { page: u16, reason: String },
}

/// Holds the pdfium binding for the life of the process.
pub struct PdfRenderer {
    pdfium: Option<Pdfium>,
}

impl Default for PdfRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfRenderer {
    pub fn new() -> Self {
        let pdfium = match Pdfium::bind_to_system_library() {
            Ok(bindings) => Some(Pdfium::new(bindings)),
            Err(err) => {
                log::warn!("pdfium not found, PDF rendering disabled: {:?}", err);
                None
            }
        };
        Self { pdfium }
    }

    pub fn available(&self) -> bool {
        self.pdfium.is_some()
    }

    /// Load a document and capture its page count and display title.
    pub fn load_document(&self, path: &Path) -> Result<DocumentHandle, TakeoffError> {
        let pdfium = self
            .pdfium
            .as_ref()
            .ok_or(TakeoffError::RendererUnavailable)?;

        std::fs::metadata(path).map_err(|source| TakeoffError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|err| TakeoffError::Load {
                reason: format!("{:?}", err),
            })?;

        let page_count = document.pages().len();
        let title = document
            .metadata()
            .get(PdfDocumentMetadataTagType::Title)
            .map(|tag| tag.value().to_string())
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| {
                path.file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
                    .to_string()
            });

        // The document borrows the Pdfium binding. Erasing the lifetime lets
        // the handle live in a struct next to the renderer; the holder must
        // drop the handle before the renderer.
        let document: PdfDocument<'static> = unsafe { std::mem::transmute(document) };

        Ok(DocumentHandle {
            document,
            page_count,
            title,
        })
    }
}

/// A rasterized page ready for texture upload or flattening.
pub struct RenderedPage {
    pub image: RgbaImage,
    pub width: u32,
    pub height: u32,
}

/// An open document plus the metadata the shell shows.
pub struct DocumentHandle {
    document: PdfDocument<'static>,
    page_count: u16,
    title: String,
}

impl DocumentHandle {
    pub fn page_count(&self) -> u16 {
        self.page_count
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Rasterize a page at the given pixel width, keeping the page's aspect
    /// ratio for the height.
    pub fn render_page(&self, index: u16, target_width: u32) -> Result<RenderedPage, TakeoffError> {
        let page = self
            .document
            .pages()
            .get(index)
            .map_err(|err| TakeoffError::Render {
                page: index,
                reason: format!("{:?}", err),
            })?;

        let width_points = page.width().value.max(1.0);
        let height_points = page.height().value.max(1.0);
        let target_width = target_width.max(1);
        let target_height = ((target_width as f32) * height_points / width_points)
            .round()
            .max(1.0) as u32;

        let config = PdfRenderConfig::new()
            .set_target_width(target_width as i32)
            .set_target_height(target_height as i32);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|err| TakeoffError::Render {
                page: index,
                reason: format!("{:?}", err),
            })?;

        let width = bitmap.width() as u32;
        let height = bitmap.height() as u32;

        // pdfium hands back BGRA; reorder while copying.
        let raw = bitmap.as_raw_bytes();
        let mut pixels = Vec::with_capacity(raw.len());
        for chunk in raw.chunks_exact(4) {
            pixels.extend_from_slice(&[chunk[2], chunk[1], chunk[0], chunk[3]]);
        }

        let image =
            RgbaImage::from_raw(width, height, pixels).ok_or_else(|| TakeoffError::Render {
                page: index,
                reason: "bitmap buffer did not match its dimensions".to_string(),
            })?;

        Ok(RenderedPage {
            image,
            width,
            height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // PdfRenderer::new falls back to the unavailable state on machines
    // without libpdfium, so these tests accept both outcomes.

    #[test]
    fn test_missing_file_does_not_load() {
        let renderer = PdfRenderer::new();
        let err = renderer
            .load_document(Path::new("/no/such/file.pdf"))
            .unwrap_err();
        assert!(matches!(
            err,
            TakeoffError::RendererUnavailable | TakeoffError::Io { .. }
        ));
    }

    #[test]
    fn test_error_messages_name_the_failure() {
        let unavailable = TakeoffError::RendererUnavailable.to_string();
        assert!(unavailable.contains("pdfium"));

        let render = TakeoffError::Render {
            page: 3,
            reason: "boom".to_string(),
        };
        assert!(render.to_string().contains("page 3"));
    }
}
