use crate::canvas::{Canvas, Document};
use crate::debug::DebugLogger;
use crate::error::PrepBookError;
use crate::highlight::ColorTag;
use crate::types::{Color, Margins, Pt, Size};
use serde_json::json;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub text: Color,
    pub muted: Color,
    pub accent: Color,
    pub answer: Color,
    pub rule: Color,
    pub code_background: Color,
    pub code_label: Color,
    pub code_default: Color,
    pub code_keyword: Color,
    pub code_string: Color,
    pub code_comment: Color,
    pub code_number: Color,
    pub code_function: Color,
    pub code_operator: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            text: Color::hex(0x1f2937),
            muted: Color::hex(0x6b7280),
            accent: Color::hex(0x4f46e5),
            answer: Color::hex(0x16a34a),
            rule: Color::hex(0xd1d5db),
            code_background: Color::hex(0x1e1e2e),
            code_label: Color::hex(0x9ca3af),
            code_default: Color::hex(0xe5e7eb),
            code_keyword: Color::hex(0xc792ea),
            code_string: Color::hex(0xc3e88d),
            code_comment: Color::hex(0x6a737d),
            code_number: Color::hex(0xf78c6c),
            code_function: Color::hex(0x82aaff),
            code_operator: Color::hex(0x89ddff),
        }
    }
}

impl Palette {
    pub fn code_color(&self, tag: ColorTag) -> Color {
        match tag {
            ColorTag::Keyword => self.code_keyword,
            ColorTag::String => self.code_string,
            ColorTag::Comment => self.code_comment,
            ColorTag::Number => self.code_number,
            ColorTag::Function => self.code_function,
            ColorTag::Operator => self.code_operator,
            ColorTag::Default => self.code_default,
        }
    }
}

/// Page geometry and typography for one engine instance.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    pub page_size: Size,
    pub margins: Margins,
    pub body_font_size: Pt,
    pub body_line_height: Pt,
    pub code_font_size: Pt,
    pub code_line_height: Pt,
    pub heading_base_size: Pt,
    pub heading_step: Pt,
    pub heading_min_size: Pt,
    pub code_padding: Pt,
    pub corner_radius: Pt,
    pub bullet_width: Pt,
    pub quote_indent: Pt,
    pub block_gap: Pt,
    pub palette: Palette,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_size: Size::a4(),
            margins: Margins::all(50.0),
            body_font_size: Pt::from_f32(10.0),
            body_line_height: Pt::from_f32(14.0),
            code_font_size: Pt::from_f32(8.5),
            code_line_height: Pt::from_f32(11.0),
            heading_base_size: Pt::from_f32(16.0),
            heading_step: Pt::from_f32(2.0),
            heading_min_size: Pt::from_f32(11.0),
            code_padding: Pt::from_f32(8.0),
            corner_radius: Pt::from_f32(4.0),
            bullet_width: Pt::from_f32(14.0),
            quote_indent: Pt::from_f32(10.0),
            block_gap: Pt::from_f32(6.0),
            palette: Palette::default(),
        }
    }
}

impl LayoutConfig {
    pub fn top(&self) -> Pt {
        self.margins.top
    }

    /// Lowest y any painted content may reach.
    pub fn bottom(&self) -> Pt {
        self.page_size.height - self.margins.bottom
    }

    pub fn printable_height(&self) -> Pt {
        self.bottom() - self.top()
    }

    pub fn content_left(&self) -> Pt {
        self.margins.left
    }

    pub fn content_width(&self) -> Pt {
        self.page_size.width - self.margins.left - self.margins.right
    }

    /// Heading size for a 1-based depth, shrinking per level down to the minimum.
    pub fn heading_size(&self, depth: u8) -> Pt {
        let steps = depth.max(1) as i32 - 1;
        (self.heading_base_size - self.heading_step * steps).max(self.heading_min_size)
    }

    pub fn heading_line_height(&self, depth: u8) -> Pt {
        self.heading_size(depth).mul_ratio(13, 10)
    }

    /// Smallest panel the code paginator ever places: one line plus the
    /// continuation header and padding on both sides.
    pub fn min_code_chunk_height(&self) -> Pt {
        self.code_padding * 2 + self.code_line_height * 2
    }

    pub fn validate(&self) -> Result<(), PrepBookError> {
        let positive = [
            ("body_font_size", self.body_font_size),
            ("body_line_height", self.body_line_height),
            ("code_font_size", self.code_font_size),
            ("code_line_height", self.code_line_height),
            ("heading_min_size", self.heading_min_size),
        ];
        for (name, value) in positive {
            if value <= Pt::ZERO {
                return Err(PrepBookError::InvalidConfiguration(format!(
                    "{name} must be positive"
                )));
            }
        }
        let non_negative = [
            ("margins", self.margins.top.min(self.margins.bottom)),
            ("margins", self.margins.left.min(self.margins.right)),
            ("heading_step", self.heading_step),
            ("code_padding", self.code_padding),
            ("corner_radius", self.corner_radius),
            ("bullet_width", self.bullet_width),
            ("quote_indent", self.quote_indent),
            ("block_gap", self.block_gap),
        ];
        for (name, value) in non_negative {
            if value < Pt::ZERO {
                return Err(PrepBookError::InvalidConfiguration(format!(
                    "{name} must not be negative"
                )));
            }
        }
        if self.content_width() <= self.bullet_width + self.quote_indent {
            return Err(PrepBookError::InvalidConfiguration(
                "margins leave no printable width".to_string(),
            ));
        }
        let tallest_line = self
            .heading_line_height(1)
            .max(self.body_line_height)
            .max(self.min_code_chunk_height());
        if self.printable_height() < tallest_line {
            return Err(PrepBookError::InvalidConfiguration(
                "margins leave no room for a code chunk on an empty page".to_string(),
            ));
        }
        Ok(())
    }
}

/// Vertical write position. `page_index` mirrors the backend's page count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
    pub y: Pt,
    pub page_index: usize,
}

/// Owns the canvas and the single mutable cursor of one generation call.
pub struct Pager<'a> {
    config: &'a LayoutConfig,
    canvas: Canvas,
    cursor: Cursor,
    debug: Option<&'a DebugLogger>,
    counters: BTreeMap<String, u64>,
}

impl<'a> Pager<'a> {
    pub fn new(config: &'a LayoutConfig) -> Self {
        Self {
            config,
            canvas: Canvas::new(config.page_size),
            cursor: Cursor {
                y: config.top(),
                page_index: 0,
            },
            debug: None,
            counters: BTreeMap::new(),
        }
    }

    pub(crate) fn with_debug(mut self, debug: Option<&'a DebugLogger>) -> Self {
        self.debug = debug;
        self
    }

    pub fn config(&self) -> &'a LayoutConfig {
        self.config
    }

    pub(crate) fn debug(&self) -> Option<&'a DebugLogger> {
        self.debug
    }

    /// Bumps a per-call counter for the debug summary. No-op without a logger.
    pub(crate) fn count(&mut self, key: &str, amount: u64) {
        if self.debug.is_none() {
            return;
        }
        let entry = self.counters.entry(key.to_string()).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn y(&self) -> Pt {
        self.cursor.y
    }

    pub fn canvas(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    pub fn remaining(&self) -> Pt {
        (self.config.bottom() - self.cursor.y).max(Pt::ZERO)
    }

    pub fn fits(&self, required: Pt) -> bool {
        self.cursor.y + required <= self.config.bottom()
    }

    /// Breaks to a new page when `required` does not fit below the cursor and
    /// returns the (possibly reset) y. A fresh page never breaks again, so a
    /// request taller than the printable area cannot loop.
    pub fn ensure_space(&mut self, required: Pt) -> Pt {
        if !self.fits(required) && self.cursor.y > self.config.top() {
            if let Some(debug) = self.debug {
                debug.event(
                    "layout.page_break",
                    json!({
                        "page": self.cursor.page_index + 2,
                        "y": self.cursor.y.to_f32(),
                        "required": required.to_f32(),
                    }),
                );
            }
            self.new_page();
        }
        self.cursor.y
    }

    pub fn new_page(&mut self) {
        self.canvas.show_page();
        self.cursor = Cursor {
            y: self.config.top(),
            page_index: self.canvas.page_index(),
        };
        self.count("page_breaks", 1);
    }

    /// Moves the cursor down, never past the bottom bound; the next
    /// `ensure_space` then breaks.
    pub fn advance(&mut self, dy: Pt) {
        self.cursor.y = (self.cursor.y + dy).min(self.config.bottom());
    }

    pub fn finish(self) -> Document {
        self.canvas.finish()
    }

    /// Like `finish`, also returning the counters gathered during this call.
    pub(crate) fn finish_with_counters(self) -> (Document, BTreeMap<String, u64>) {
        (self.canvas.finish(), self.counters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn default_config_is_valid_a4() {
        let config = LayoutConfig::default();
        config.validate().expect("default config");
        assert_eq!(config.page_size, Size::a4());
        assert_eq!(config.bottom().to_milli_i64(), 791_890);
    }

    #[rstest]
    #[case(1, 16.0)]
    #[case(2, 14.0)]
    #[case(3, 12.0)]
    #[case(4, 11.0)]
    #[case(6, 11.0)]
    #[case(0, 16.0)]
    fn heading_size_shrinks_and_clamps(#[case] depth: u8, #[case] expected: f32) {
        let config = LayoutConfig::default();
        assert_eq!(config.heading_size(depth), Pt::from_f32(expected));
    }

    #[test]
    fn validation_rejects_zero_printable_area() {
        let mut config = LayoutConfig::default();
        config.margins = Margins::symmetric(420.0, 50.0);
        let err = config.validate().expect_err("no printable height");
        assert!(err.to_string().contains("code chunk"));

        let mut config = LayoutConfig::default();
        config.code_line_height = Pt::ZERO;
        let err = config.validate().expect_err("zero line height");
        assert!(err.to_string().contains("code_line_height"));
    }

    #[test]
    fn ensure_space_breaks_only_when_needed() {
        let config = LayoutConfig::default();
        let mut pager = Pager::new(&config);
        let line = config.body_line_height;

        assert_eq!(pager.ensure_space(line), config.top());
        pager.advance(config.printable_height() - line);
        assert_eq!(pager.cursor().page_index, 0);
        // Exactly one line left: still fits.
        assert_eq!(pager.ensure_space(line), config.bottom() - line);
        pager.advance(line);
        assert_eq!(pager.y(), config.bottom());

        assert_eq!(pager.ensure_space(line), config.top());
        assert_eq!(pager.cursor().page_index, 1);
        pager.canvas().mark_block("paragraph");
        assert_eq!(pager.finish().page_count(), 2);
    }

    #[test]
    fn oversized_request_on_fresh_page_does_not_loop() {
        let config = LayoutConfig::default();
        let mut pager = Pager::new(&config);
        let y = pager.ensure_space(config.page_size.height * 2);
        assert_eq!(y, config.top());
        assert_eq!(pager.cursor().page_index, 0);
    }

    #[test]
    fn advance_clamps_to_bottom_margin() {
        let config = LayoutConfig::default();
        let mut pager = Pager::new(&config);
        pager.advance(config.page_size.height);
        assert_eq!(pager.y(), config.bottom());
        assert_eq!(pager.remaining(), Pt::ZERO);
    }
}
