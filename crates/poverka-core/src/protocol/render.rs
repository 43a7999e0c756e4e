//! A4 rendering of a [`ProtocolLayout`] with `printpdf`.

use std::fs::File;
use std::io::BufReader;

use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerIndex,
    PdfLayerReference, PdfPageIndex, Point,
};
use tracing::{debug, warn};

use super::fonts::{FontChoice, transliterate};
use super::layout::{Align, Block, Cell, ProtocolLayout, Table, wrap};
use crate::error::{Error, Result};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 15.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const CELL_PADDING: f32 = 1.0;
const PT_TO_MM: f32 = 0.3528;
/// Average glyph advance relative to the font size.
const GLYPH_WIDTH_EM: f32 = 0.5;
const LAYER_NAME: &str = "Слой 1";

fn line_height(size: f32) -> f32 {
    size * PT_TO_MM * 1.3
}

fn chars_per_width(width: f32, size: f32) -> usize {
    let glyph = size * PT_TO_MM * GLYPH_WIDTH_EM;
    ((width / glyph).floor() as usize).max(1)
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * PT_TO_MM * GLYPH_WIDTH_EM
}

fn column_widths(columns: &[f32]) -> Vec<f32> {
    let total: f32 = columns.iter().sum();
    if total <= 0.0 {
        return vec![CONTENT_WIDTH / columns.len().max(1) as f32; columns.len()];
    }
    columns.iter().map(|c| c / total * CONTENT_WIDTH).collect()
}

/// Widths of cells laid over the given columns, honouring spans.
fn cell_widths(widths: &[f32], cells: &[Cell]) -> Vec<f32> {
    let mut col = 0;
    cells
        .iter()
        .map(|cell| {
            let end = (col + cell.span).min(widths.len());
            let w = widths[col.min(widths.len())..end].iter().sum();
            col = end;
            w
        })
        .collect()
}

fn load_external(doc: &PdfDocumentReference, path: &std::path::Path) -> Result<IndirectFontRef> {
    let reader = BufReader::new(File::open(path)?);
    doc.add_external_font(reader).map_err(Error::pdf)
}

fn builtin_font(doc: &PdfDocumentReference) -> Result<IndirectFontRef> {
    doc.add_builtin_font(BuiltinFont::Helvetica).map_err(Error::pdf)
}

struct Renderer {
    doc: PdfDocumentReference,
    font: IndirectFontRef,
    /// Font actually embedded, after any fallback.
    choice: FontChoice,
    layer: PdfLayerReference,
    /// Distance of the cursor from the bottom edge.
    y: f32,
    pages: usize,
}

impl Renderer {
    fn new(title: &str, font: &FontChoice) -> Result<Self> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER_NAME);
        let (font_ref, choice) = match font {
            FontChoice::External(path) => match load_external(&doc, path) {
                Ok(font_ref) => (font_ref, font.clone()),
                Err(e) => {
                    warn!(
                        "Cannot embed font {}: {}. Falling back to Helvetica",
                        path.display(),
                        e
                    );
                    (builtin_font(&doc)?, FontChoice::Builtin)
                }
            },
            FontChoice::Builtin => (builtin_font(&doc)?, FontChoice::Builtin),
        };
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            font: font_ref,
            choice,
            layer,
            y: PAGE_HEIGHT - MARGIN,
            pages: 1,
        })
    }

    fn new_page(&mut self) {
        let (page, layer): (PdfPageIndex, PdfLayerIndex) =
            self.doc
                .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER_NAME);
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
        self.pages += 1;
        debug!("Protocol page {} started", self.pages);
    }

    fn ensure_space(&mut self, height: f32) {
        if self.y - height < MARGIN && self.y < PAGE_HEIGHT - MARGIN {
            self.new_page();
        }
    }

    fn prepare(&self, text: &str) -> String {
        if self.choice.is_unicode() {
            text.to_string()
        } else {
            transliterate(text)
        }
    }

    fn text_at(&self, text: &str, size: f32, x: f32, baseline: f32, underline: bool) {
        let text = self.prepare(text);
        self.layer
            .use_text(text.as_str(), size, Mm(x), Mm(baseline), &self.font);
        if underline && !text.trim().is_empty() {
            let y = baseline - 0.6;
            self.hline(x, x + text_width(&text, size), y, 0.3);
        }
    }

    fn hline(&self, x1: f32, x2: f32, y: f32, thickness: f32) {
        self.layer.set_outline_thickness(thickness);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(x1), Mm(y)), false),
                (Point::new(Mm(x2), Mm(y)), false),
            ],
            is_closed: false,
        });
    }

    fn rect(&self, x: f32, top: f32, width: f32, height: f32) {
        self.layer.set_outline_thickness(0.5);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(x), Mm(top)), false),
                (Point::new(Mm(x + width), Mm(top)), false),
                (Point::new(Mm(x + width), Mm(top - height)), false),
                (Point::new(Mm(x), Mm(top - height)), false),
            ],
            is_closed: true,
        });
    }

    /// Draw lines of text aligned inside `[x, x + width]`, starting below `top`.
    fn lines_in_box(
        &self,
        lines: &[String],
        size: f32,
        x: f32,
        width: f32,
        top: f32,
        align: Align,
        underline: bool,
    ) {
        let lh = line_height(size);
        for (i, line) in lines.iter().enumerate() {
            let baseline = top - lh * (i as f32 + 1.0) + lh * 0.25;
            let w = text_width(line, size);
            let lx = match align {
                Align::Left => x,
                Align::Center => x + ((width - w) / 2.0).max(0.0),
                Align::Right => x + (width - w).max(0.0),
            };
            self.text_at(line, size, lx, baseline, underline);
        }
    }

    fn paragraph(&mut self, text: &str, size: f32, align: Align, underline: bool) {
        let lines = wrap(text, chars_per_width(CONTENT_WIDTH, size));
        let lh = line_height(size);
        for line in lines {
            self.ensure_space(lh);
            self.lines_in_box(
                std::slice::from_ref(&line),
                size,
                MARGIN,
                CONTENT_WIDTH,
                self.y,
                align,
                underline,
            );
            self.y -= lh;
        }
    }

    fn wrapped_cells(cells: &[Cell], widths: &[f32], size: f32) -> Vec<Vec<String>> {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, w)| {
                wrap(
                    &cell.text,
                    chars_per_width((w - 2.0 * CELL_PADDING).max(1.0), size),
                )
            })
            .collect()
    }

    fn row(&mut self, columns: &[f32], cells: &[Cell], size: f32, bordered: bool) {
        let widths = cell_widths(&column_widths(columns), cells);
        let wrapped = Self::wrapped_cells(cells, &widths, size);
        let max_lines = wrapped
            .iter()
            .map(Vec::len)
            .chain(cells.iter().map(Cell::line_count))
            .max()
            .unwrap_or(1);
        let height = max_lines as f32 * line_height(size) + 2.0 * CELL_PADDING;
        self.ensure_space(height);

        let mut x = MARGIN;
        for ((cell, lines), w) in cells.iter().zip(&wrapped).zip(&widths) {
            if bordered {
                self.rect(x, self.y, *w, height);
            }
            self.lines_in_box(
                lines,
                size,
                x + CELL_PADDING,
                w - 2.0 * CELL_PADDING,
                self.y - CELL_PADDING,
                cell.align,
                cell.underline,
            );
            x += w;
        }
        self.y -= height;
    }

    fn table(&mut self, table: &Table) {
        let header_height: f32 = table
            .header
            .iter()
            .map(|r| r.iter().map(Cell::line_count).max().unwrap_or(1) as f32)
            .sum::<f32>()
            * line_height(table.font_size);
        // Keep the header together with the first body row.
        self.ensure_space(header_height + 3.0 * line_height(table.font_size));
        for row in &table.header {
            self.row(&table.columns, row, table.font_size, true);
        }
        for row in &table.body {
            let pages = self.pages;
            let needed = row.iter().map(Cell::line_count).max().unwrap_or(1) as f32
                * line_height(table.font_size)
                + 2.0 * CELL_PADDING;
            self.ensure_space(needed);
            if self.pages != pages {
                for header in &table.header {
                    self.row(&table.columns, header, table.font_size, true);
                }
            }
            self.row(&table.columns, row, table.font_size, true);
        }
    }

    fn block(&mut self, block: &Block) {
        match block {
            Block::Paragraph {
                text,
                size,
                align,
                underline,
            } => self.paragraph(text, *size, *align, *underline),
            Block::Row { columns, cells } => {
                self.row(columns, cells, super::BODY_FONT_SIZE, false)
            }
            Block::Table(table) => self.table(table),
            Block::Space(mm) => {
                if self.y - mm < MARGIN {
                    self.new_page();
                } else {
                    self.y -= mm;
                }
            }
        }
    }

    fn finish(self) -> Result<RenderedProtocol> {
        let bytes = self.doc.save_to_bytes().map_err(Error::pdf)?;
        Ok(RenderedProtocol {
            bytes,
            pages: self.pages,
            font: self.choice,
        })
    }
}

/// A rendered document.
#[derive(Debug, Clone)]
pub struct RenderedProtocol {
    pub bytes: Vec<u8>,
    pub pages: usize,
    /// Font used. An external font that cannot be embedded is replaced by
    /// the builtin one.
    pub font: FontChoice,
}

/// Render a layout to PDF bytes.
pub fn render(layout: &ProtocolLayout, font: &FontChoice) -> Result<RenderedProtocol> {
    let mut renderer = Renderer::new(&layout.title, font)?;
    for block in &layout.blocks {
        renderer.block(block);
    }
    renderer.finish()
}
