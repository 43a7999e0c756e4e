//! Page-independent description of a protocol document.
//!
//! Sections produce [`Block`]s; the renderer places them on A4 pages. Keeping
//! the content separate from the PDF calls lets the wording be checked
//! without decoding a PDF.

/// Horizontal alignment inside a paragraph or cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// One cell of a row or table.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// Cell text; `\n` starts a new line.
    pub text: String,
    pub align: Align,
    pub underline: bool,
    /// Number of columns the cell covers.
    pub span: usize,
}

impl Cell {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            align: Align::Center,
            underline: false,
            span: 1,
        }
    }

    pub fn left(mut self) -> Self {
        self.align = Align::Left;
        self
    }

    pub fn underlined(mut self) -> Self {
        self.underline = true;
        self
    }

    pub fn span(mut self, span: usize) -> Self {
        self.span = span.max(1);
        self
    }

    pub(crate) fn line_count(&self) -> usize {
        self.text.lines().count().max(1)
    }
}

/// Bordered table with relative column widths.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Relative column widths.
    pub columns: Vec<f32>,
    /// Header rows, repeated after a page break.
    pub header: Vec<Vec<Cell>>,
    pub body: Vec<Vec<Cell>>,
    pub font_size: f32,
}

/// A unit of document content.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Wrapped text.
    Paragraph {
        text: String,
        size: f32,
        align: Align,
        underline: bool,
    },
    /// Borderless cells laid out on one line with relative widths.
    Row { columns: Vec<f32>, cells: Vec<Cell> },
    Table(Table),
    /// Vertical gap in millimetres.
    Space(f32),
}

impl Block {
    pub fn text(text: impl Into<String>) -> Self {
        Block::Paragraph {
            text: text.into(),
            size: super::BODY_FONT_SIZE,
            align: Align::Left,
            underline: false,
        }
    }

    pub fn centered(text: impl Into<String>) -> Self {
        Block::Paragraph {
            text: text.into(),
            size: super::BODY_FONT_SIZE,
            align: Align::Center,
            underline: false,
        }
    }

    pub fn underlined(text: impl Into<String>) -> Self {
        Block::Paragraph {
            text: text.into(),
            size: super::BODY_FONT_SIZE,
            align: Align::Center,
            underline: true,
        }
    }

    pub fn row(columns: &[f32], cells: Vec<Cell>) -> Self {
        Block::Row {
            columns: columns.to_vec(),
            cells,
        }
    }

    /// All text in the block, one entry per paragraph or cell.
    pub fn texts(&self) -> Vec<&str> {
        match self {
            Block::Paragraph { text, .. } => vec![text.as_str()],
            Block::Row { cells, .. } => cells.iter().map(|c| c.text.as_str()).collect(),
            Block::Table(table) => table
                .header
                .iter()
                .chain(table.body.iter())
                .flatten()
                .map(|c| c.text.as_str())
                .collect(),
            Block::Space(_) => Vec::new(),
        }
    }
}

/// Laid-out protocol content.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolLayout {
    /// Document title stored in the PDF metadata.
    pub title: String,
    pub blocks: Vec<Block>,
    /// Message of the section that failed, if any.
    pub section_error: Option<String>,
}

impl ProtocolLayout {
    /// All text of the document in reading order, joined by newlines.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .flat_map(Block::texts)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.blocks
            .iter()
            .flat_map(Block::texts)
            .any(|t| t.contains(needle))
    }
}

/// Split text into lines of at most `max_chars` characters, breaking at
/// spaces where possible. Explicit newlines are kept.
pub fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split(' ') {
            let word_len = word.chars().count();
            let current_len = current.chars().count();
            if current.is_empty() {
                current.push_str(word);
            } else if current_len + 1 + word_len <= max_chars {
                current.push(' ');
                current.push_str(word);
            } else {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
            }
            while current.chars().count() > max_chars {
                let head: String = current.chars().take(max_chars).collect();
                let tail: String = current.chars().skip(max_chars).collect();
                lines.push(head);
                current = tail;
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
    fn test_wrap_breaks_at_spaces() {
        assert_eq!(
            wrap("Методика поверки ГОСТ", 10),
            vec!["Методика", "поверки", "ГОСТ"]
        );
        assert_eq!(wrap("a b c", 80), vec!["a b c"]);
    }

    #[test]
    fn test_wrap_keeps_newlines_and_splits_long_words() {
        assert_eq!(wrap("Точка\nВ", 20), vec!["Точка", "В"]);
        assert_eq!(wrap("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert_eq!(wrap("", 5), vec![""]);
    }

    #[test]
    fn test_cell_builder() {
        let cell = Cell::new("x").left().underlined().span(0);
        assert_eq!(cell.align, Align::Left);
        assert!(cell.underline);
        assert_eq!(cell.span, 1);
        assert_eq!(Cell::new("a\nb").line_count(), 2);
    }

    #[test]
    fn test_layout_text() {
        let layout = ProtocolLayout {
            title: "t".into(),
            blocks: vec![
                Block::text("first"),
                Block::Space(2.0),
                Block::row(&[1.0, 1.0], vec![Cell::new("a"), Cell::new("")]),
            ],
            section_error: None,
        };
        assert_eq!(layout.plain_text(), "first\na");
        assert!(layout.contains("fir"));
        assert!(!layout.contains("zzz"));
    }
}
