//! Plain paginated PDF rendering.

use crate::error::{Result, TldwError};
use printpdf::{Mm, PdfDocument};
use std::path::Path;
use std::sync::Arc;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const LINE_HEIGHT: f32 = 6.0;
const TITLE_SIZE: f32 = 14.0;
const BODY_SIZE: f32 = 11.0;
/// Characters per line at the body size within the margins.
const WRAP_WIDTH: usize = 80;

static DEJAVU_SANS: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

/// TrueType font embedded into every PDF.
#[derive(Clone)]
pub struct PdfFont {
    data: Arc<[u8]>,
}

impl PdfFont {
    /// DejaVu Sans, shipped with the binary.
    pub fn bundled() -> Self {
        Self {
            data: Arc::from(DEJAVU_SANS),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| {
            TldwError::Config(format!("Cannot read PDF font {}: {}", path.display(), e))
        })?;
        Ok(Self { data: data.into() })
    }
}

impl Default for PdfFont {
    fn default() -> Self {
        Self::bundled()
    }
}

impl std::fmt::Debug for PdfFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfFont").field("bytes", &self.data.len()).finish()
    }
}

/// Render `body` under a `title` heading as an A4 PDF.
pub fn render_pdf(title: &str, body: &str, font: &PdfFont) -> Result<Vec<u8>> {
    let (doc, first_page, first_layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let font = doc
        .add_external_font(font.data.as_ref())
        .map_err(|e| TldwError::Export(format!("Cannot embed PDF font: {}", e)))?;

    let mut layer = doc.get_page(first_page).get_layer(first_layer);
    let mut y = PAGE_HEIGHT - MARGIN;

    for line in wrap_lines(title, WRAP_WIDTH * BODY_SIZE as usize / TITLE_SIZE as usize) {
        layer.use_text(line, TITLE_SIZE, Mm(MARGIN), Mm(y), &font);
        y -= LINE_HEIGHT * 1.5;
    }
    y -= LINE_HEIGHT;

    for line in wrap_lines(body, WRAP_WIDTH) {
        if y < MARGIN {
            let (page, page_layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            layer = doc.get_page(page).get_layer(page_layer);
            y = PAGE_HEIGHT - MARGIN;
        }
        if !line.is_empty() {
            layer.use_text(line, BODY_SIZE, Mm(MARGIN), Mm(y), &font);
        }
        y -= LINE_HEIGHT;
    }

    doc.save_to_bytes()
        .map_err(|e| TldwError::Export(e.to_string()))
}

/// Greedy word wrap. Paragraph breaks are kept; words longer than `width`
/// are split.
pub(crate) fn wrap_lines(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        let mut current_len = 0;

        for word in paragraph.split_whitespace() {
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(width) {
                let piece_len = piece.len();
                let needed = if current_len == 0 { piece_len } else { current_len + 1 + piece_len };
                if needed > width && current_len > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                if current_len > 0 {
                    current.push(' ');
                    current_len += 1;
                }
                current.extend(piece);
                current_len += piece_len;
            }
        }

        lines.push(current);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_respects_width() {
        let text = "lorem ipsum dolor sit amet ".repeat(30);
        let lines = wrap_lines(&text, 40);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.chars().count() <= 40));
        assert_eq!(
            lines.join(" ").split_whitespace().collect::<Vec<_>>(),
            text.split_whitespace().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_wrap_keeps_paragraphs_and_splits_long_words() {
        let lines = wrap_lines("first\n\nsecond abcdefghij", 4);
        assert_eq!(lines, vec!["firs", "t", "", "seco", "nd", "abcd", "efgh", "ij"]);
    }

    /// Glyph ids drawn by every `Tj` operator, in page order.
    fn drawn_glyphs(bytes: &[u8]) -> Vec<u16> {
        let doc = lopdf::Document::load_mem(bytes).unwrap();
        let mut glyphs = Vec::new();

        for page_id in doc.get_pages().into_values() {
            let content = doc.get_and_decode_page_content(page_id).unwrap();
            for op in content.operations.iter().filter(|op| op.operator == "Tj") {
                if let Some(lopdf::Object::String(bytes, _)) = op.operands.first() {
                    glyphs.extend(bytes.chunks(2).map(|pair| u16::from_be_bytes([pair[0], pair[1]])));
                }
            }
        }
        glyphs
    }

    fn expected_glyphs(lines: &[&str]) -> Vec<u16> {
        let face = ttf_parser::Face::parse(DEJAVU_SANS, 0).unwrap();
        lines
            .iter()
            .flat_map(|line| line.chars())
            .map(|c| face.glyph_index(c).map(|g| g.0).unwrap_or_else(|| panic!("no glyph for {c}")))
            .collect()
    }

    #[test]
    fn test_render_produces_pdf() {
        let body = "A sentence that goes on. ".repeat(400);
        let bytes = render_pdf("Summary", &body, &PdfFont::bundled()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(lopdf::Document::load_mem(&bytes).unwrap().get_pages().len() > 1);
    }

    #[test]
    fn test_cyrillic_text_is_drawn() {
        let title = "Сводка";
        let body = "Привет мир, это краткое изложение.";
        let bytes = render_pdf(title, body, &PdfFont::bundled()).unwrap();

        assert_eq!(drawn_glyphs(&bytes), expected_glyphs(&[title, body]));
    }

    #[test]
    fn test_load_missing_font_is_config_error() {
        let err = PdfFont::load(Path::new("/nonexistent/font.ttf")).unwrap_err();
        assert!(matches!(err, TldwError::Config(_)));
    }

    #[test]
    fn test_invalid_font_fails_render() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"not a font").unwrap();

        let font = PdfFont::load(&path).unwrap();
        assert!(matches!(render_pdf("t", "b", &font), Err(TldwError::Export(_))));
    }
}
