use crate::types::{Color, Pt, Size};
use sha2::{Digest, Sha256};

/// Metadata key under which renderers record the kind of block they start
/// painting. Ignored by the PDF writer.
pub const META_BLOCK_KEY: &str = "block";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SaveState,
    RestoreState,
    // Non-rendered metadata used for page-aware reporting. Ignored by the PDF renderer.
    Meta {
        key: String,
        value: String,
    },
    SetFillColor(Color),
    SetStrokeColor(Color),
    SetLineWidth(Pt),
    SetFontName(String),
    SetFontSize(Pt),
    ClipRect {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
    },
    MoveTo {
        x: Pt,
        y: Pt,
    },
    LineTo {
        x: Pt,
        y: Pt,
    },
    CurveTo {
        x1: Pt,
        y1: Pt,
        x2: Pt,
        y2: Pt,
        x: Pt,
        y: Pt,
    },
    ClosePath,
    Fill,
    Stroke,
    DrawString {
        x: Pt,
        y: Pt,
        text: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Page {
    pub commands: Vec<Command>,
}

impl Page {
    pub fn block_kinds(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|cmd| match cmd {
                Command::Meta { key, value } if key == META_BLOCK_KEY => Some(value.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn strings(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|cmd| match cmd {
            Command::DrawString { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    pub page_size: Size,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn block_kinds_per_page(&self) -> Vec<Vec<String>> {
        self.pages
            .iter()
            .map(|page| page.block_kinds().into_iter().map(str::to_string).collect())
            .collect()
    }

    /// Hex SHA-256 over the page count and the block sequence of every page.
    /// Two layouts with the same fingerprint placed the same kinds of blocks
    /// on the same pages.
    pub fn layout_fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.pages.len() as u64).to_le_bytes());
        for (index, page) in self.pages.iter().enumerate() {
            hasher.update(format!("page:{index}\n").as_bytes());
            for kind in page.block_kinds() {
                hasher.update(kind.as_bytes());
                hasher.update(b"\n");
            }
        }
        hasher
            .finalize()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect()
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    fill_color: Color,
    stroke_color: Color,
    line_width: Pt,
    font_size: Pt,
    font_name: String,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            fill_color: Color::BLACK,
            stroke_color: Color::BLACK,
            line_width: Pt::from_f32(1.0),
            font_size: Pt::from_f32(12.0),
            font_name: "Helvetica".to_string(),
        }
    }
}

/// Recording drawing surface. Coordinates are top-left origin; the PDF
/// writer flips them.
pub struct Canvas {
    page_size: Size,
    pages: Vec<Page>,
    current: Page,
    state_stack: Vec<GraphicsState>,
    current_state: GraphicsState,
}

impl Canvas {
    pub fn new(page_size: Size) -> Self {
        Self {
            page_size,
            pages: Vec::new(),
            current: Page::default(),
            state_stack: Vec::new(),
            current_state: GraphicsState::default(),
        }
    }

    /// Zero-based index of the page currently being painted.
    pub fn page_index(&self) -> usize {
        self.pages.len()
    }

    pub fn save_state(&mut self) {
        self.state_stack.push(self.current_state.clone());
        self.current.commands.push(Command::SaveState);
    }

    pub fn restore_state(&mut self) {
        if let Some(state) = self.state_stack.pop() {
            self.current_state = state;
            self.current.commands.push(Command::RestoreState);
        }
    }

    pub fn meta(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.current.commands.push(Command::Meta {
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn mark_block(&mut self, kind: &str) {
        self.meta(META_BLOCK_KEY, kind);
    }

    pub fn set_fill_color(&mut self, color: Color) {
        if self.current_state.fill_color == color {
            return;
        }
        self.current_state.fill_color = color;
        self.current.commands.push(Command::SetFillColor(color));
    }

    pub fn set_stroke_color(&mut self, color: Color) {
        if self.current_state.stroke_color == color {
            return;
        }
        self.current_state.stroke_color = color;
        self.current.commands.push(Command::SetStrokeColor(color));
    }

    pub fn set_line_width(&mut self, width: Pt) {
        let width = if width < Pt::ZERO { Pt::ZERO } else { width };
        if self.current_state.line_width == width {
            return;
        }
        self.current_state.line_width = width;
        self.current.commands.push(Command::SetLineWidth(width));
    }

    pub fn set_font_name(&mut self, name: &str) {
        if self.current_state.font_name == name {
            return;
        }
        self.current_state.font_name = name.to_string();
        self.current
            .commands
            .push(Command::SetFontName(self.current_state.font_name.clone()));
    }

    pub fn set_font_size(&mut self, size: Pt) {
        if self.current_state.font_size == size {
            return;
        }
        self.current_state.font_size = size;
        self.current.commands.push(Command::SetFontSize(size));
    }

    pub fn set_font(&mut self, name: &str, size: Pt) {
        self.set_font_name(name);
        self.set_font_size(size);
    }

    pub fn clip_rect(&mut self, x: Pt, y: Pt, width: Pt, height: Pt) {
        self.current.commands.push(Command::ClipRect {
            x,
            y,
            width,
            height,
        });
    }

    pub fn move_to(&mut self, x: Pt, y: Pt) {
        self.current.commands.push(Command::MoveTo { x, y });
    }

    pub fn line_to(&mut self, x: Pt, y: Pt) {
        self.current.commands.push(Command::LineTo { x, y });
    }

    pub fn curve_to(&mut self, x1: Pt, y1: Pt, x2: Pt, y2: Pt, x: Pt, y: Pt) {
        self.current.commands.push(Command::CurveTo {
            x1,
            y1,
            x2,
            y2,
            x,
            y,
        });
    }

    pub fn close_path(&mut self) {
        self.current.commands.push(Command::ClosePath);
    }

    pub fn fill(&mut self) {
        self.current.commands.push(Command::Fill);
    }

    pub fn stroke(&mut self) {
        self.current.commands.push(Command::Stroke);
    }

    pub fn line(&mut self, x1: Pt, y1: Pt, x2: Pt, y2: Pt) {
        self.move_to(x1, y1);
        self.line_to(x2, y2);
        self.stroke();
    }

    pub fn draw_string(&mut self, x: Pt, y: Pt, text: impl Into<String>) {
        self.current.commands.push(Command::DrawString {
            x,
            y,
            text: text.into(),
        });
    }

    pub fn show_page(&mut self) {
        let current = std::mem::take(&mut self.current);
        self.pages.push(current);
        self.state_stack.clear();
        self.current_state = GraphicsState::default();
    }

    pub fn finish(mut self) -> Document {
        if !self.current.commands.is_empty() || self.pages.is_empty() {
            self.show_page();
        }
        Document {
            page_size: self.page_size,
            pages: self.pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redundant_state_changes_are_elided() {
        let mut canvas = Canvas::new(Size::a4());
        canvas.set_fill_color(Color::BLACK);
        canvas.set_font("Helvetica", Pt::from_f32(12.0));
        canvas.set_fill_color(Color::WHITE);
        canvas.set_fill_color(Color::WHITE);
        let doc = canvas.finish();
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(
            doc.pages[0].commands,
            vec![Command::SetFillColor(Color::WHITE)]
        );
    }

    #[test]
    fn show_page_resets_graphics_state() {
        let mut canvas = Canvas::new(Size::a4());
        canvas.set_font_name("Courier");
        canvas.show_page();
        assert_eq!(canvas.page_index(), 1);
        canvas.set_font_name("Courier");
        let doc = canvas.finish();
        assert_eq!(doc.pages.len(), 2);
        assert_eq!(
            doc.pages[1].commands,
            vec![Command::SetFontName("Courier".to_string())]
        );
    }

    #[test]
    fn fingerprint_tracks_block_sequence() {
        let mut a = Canvas::new(Size::a4());
        a.mark_block("heading");
        a.mark_block("paragraph");
        let mut b = Canvas::new(Size::a4());
        b.mark_block("heading");
        b.show_page();
        b.mark_block("paragraph");

        let a = a.finish();
        let b = b.finish();
        assert_eq!(a.block_kinds_per_page(), vec![vec!["heading", "paragraph"]]);
        assert_ne!(a.layout_fingerprint(), b.layout_fingerprint());
        assert_eq!(a.layout_fingerprint(), a.clone().layout_fingerprint());
        assert_eq!(a.layout_fingerprint().len(), 64);
    }
}
