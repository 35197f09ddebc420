use crate::canvas::Canvas;
use crate::font::{COURIER, HELVETICA, HELVETICA_OBLIQUE, measure_text_width};
use crate::highlight::tokenize_line;
use crate::layout::{LayoutConfig, Pager};
use crate::types::Pt;
use serde_json::json;

pub const CONTINUED_MARKER: &str = "\u{2026} continued";

const TAB_WIDTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageChunk {
    pub lines: Vec<String>,
    pub is_first_chunk_of_block: bool,
    pub is_last_chunk_of_block: bool,
}

impl PageChunk {
    /// Reserved row above the code for the continuation marker.
    pub fn header_height(&self, config: &LayoutConfig) -> Pt {
        if self.is_first_chunk_of_block {
            Pt::ZERO
        } else {
            config.code_line_height
        }
    }

    pub fn panel_height(&self, config: &LayoutConfig) -> Pt {
        config.code_padding * 2
            + self.header_height(config)
            + config.code_line_height * self.lines.len() as i32
    }
}

/// Splits `code` into chunks that each fit the page they start on. The caller
/// must leave room for one padded line at `start_y`.
pub fn plan_chunks(code: &str, start_y: Pt, config: &LayoutConfig) -> Vec<PageChunk> {
    let line_height = config.code_line_height;
    let bottom = config.bottom();
    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut chunk_top = start_y;
    let mut first = true;

    for line in code.split('\n') {
        let header = if first { Pt::ZERO } else { line_height };
        let needed = chunk_top
            + config.code_padding * 2
            + header
            + line_height * (current.len() as i32 + 1);
        if needed > bottom && !current.is_empty() {
            chunks.push(PageChunk {
                lines: std::mem::take(&mut current),
                is_first_chunk_of_block: first,
                is_last_chunk_of_block: false,
            });
            first = false;
            chunk_top = config.top();
        }
        current.push(line.to_string());
    }
    chunks.push(PageChunk {
        lines: current,
        is_first_chunk_of_block: first,
        is_last_chunk_of_block: true,
    });
    chunks
}

pub fn render_code_block(
    pager: &mut Pager<'_>,
    code: &str,
    language: Option<&str>,
    left: Pt,
    width: Pt,
) {
    let config = pager.config();
    pager.ensure_space(config.code_padding * 2 + config.code_line_height);
    let chunks = plan_chunks(code, pager.y(), config);
    if let Some(debug) = pager.debug() {
        debug.event(
            "code.chunks",
            json!({
                "lines": chunks.iter().map(|c| c.lines.len()).sum::<usize>(),
                "chunks": chunks.len(),
                "language": language,
            }),
        );
    }
    pager.count("code_chunks", chunks.len() as u64);
    for (index, chunk) in chunks.iter().enumerate() {
        if index > 0 {
            pager.new_page();
        }
        let top = pager.y();
        paint_chunk(pager.canvas(), config, chunk, language, left, top, width);
        pager.advance(chunk.panel_height(config));
    }
    pager.advance(config.block_gap);
}

fn paint_chunk(
    canvas: &mut Canvas,
    config: &LayoutConfig,
    chunk: &PageChunk,
    language: Option<&str>,
    left: Pt,
    top: Pt,
    width: Pt,
) {
    let palette = &config.palette;
    let pad = config.code_padding;
    let height = chunk.panel_height(config);

    canvas.mark_block(if chunk.is_first_chunk_of_block {
        "code"
    } else {
        "code-chunk"
    });
    canvas.set_fill_color(palette.code_background);
    panel_path(
        canvas,
        left,
        top,
        width,
        height,
        config.corner_radius,
        chunk.is_first_chunk_of_block,
        chunk.is_last_chunk_of_block,
    );
    canvas.fill();

    let label_size = config.code_font_size.mul_ratio(85, 100);
    if chunk.is_first_chunk_of_block {
        if let Some(label) = language.map(str::trim).filter(|l| !l.is_empty()) {
            let label_width = measure_text_width(HELVETICA, label_size, label);
            canvas.set_fill_color(palette.code_label);
            canvas.set_font(HELVETICA, label_size);
            canvas.draw_string(left + width - pad - label_width, top + pad, label);
        }
    } else {
        canvas.set_fill_color(palette.code_label);
        canvas.set_font(HELVETICA_OBLIQUE, label_size);
        canvas.draw_string(left + pad, top + pad, CONTINUED_MARKER);
    }

    canvas.save_state();
    canvas.clip_rect(left, top, width, height);
    canvas.set_font(COURIER, config.code_font_size);
    let mut y = top + pad + chunk.header_height(config);
    for line in &chunk.lines {
        let display = expand_tabs(line.trim_end_matches('\r'));
        let mut x = left + pad;
        for span in tokenize_line(&display) {
            if !span.text.trim().is_empty() {
                canvas.set_fill_color(palette.code_color(span.tag));
                canvas.draw_string(x, y, span.text.as_str());
            }
            x += measure_text_width(COURIER, config.code_font_size, &span.text);
        }
        y += config.code_line_height;
    }
    canvas.restore_state();
}

fn expand_tabs(line: &str) -> String {
    if !line.contains('\t') {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + TAB_WIDTH);
    let mut column = 0usize;
    for ch in line.chars() {
        if ch == '\t' {
            let fill = TAB_WIDTH - column % TAB_WIDTH;
            out.extend(std::iter::repeat_n(' ', fill));
            column += fill;
        } else {
            out.push(ch);
            column += 1;
        }
    }
    out
}

// Edges that continue onto another page keep square corners.
#[allow(clippy::too_many_arguments)]
fn panel_path(
    canvas: &mut Canvas,
    x: Pt,
    y: Pt,
    width: Pt,
    height: Pt,
    radius: Pt,
    round_top: bool,
    round_bottom: bool,
) {
    let radius = radius.min(width / 2).min(height / 2).max(Pt::ZERO);
    let top_r = if round_top { radius } else { Pt::ZERO };
    let bottom_r = if round_bottom { radius } else { Pt::ZERO };
    // Cubic approximation of a quarter circle.
    let kappa = 4.0 * (libm::sqrtf(2.0) - 1.0) / 3.0;
    let top_k = top_r * kappa;
    let bottom_k = bottom_r * kappa;
    let right = x + width;
    let lower = y + height;

    canvas.move_to(x + top_r, y);
    canvas.line_to(right - top_r, y);
    if round_top {
        canvas.curve_to(right - top_r + top_k, y, right, y + top_r - top_k, right, y + top_r);
    }
    canvas.line_to(right, lower - bottom_r);
    if round_bottom {
        canvas.curve_to(
            right,
            lower - bottom_r + bottom_k,
            right - bottom_r + bottom_k,
            lower,
            right - bottom_r,
            lower,
        );
    }
    canvas.line_to(x + bottom_r, lower);
    if round_bottom {
        canvas.curve_to(
            x + bottom_r - bottom_k,
            lower,
            x,
            lower - bottom_r + bottom_k,
            x,
            lower - bottom_r,
        );
    }
    canvas.line_to(x, y + top_r);
    if round_top {
        canvas.curve_to(x, y + top_r - top_k, x + top_r - top_k, y, x + top_r, y);
    }
    canvas.close_path();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{Command, Document, Page};
    use proptest::prelude::*;

    fn code_of(lines: usize) -> String {
        (0..lines)
            .map(|i| format!("print({i})"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn render_at(code: &str, language: Option<&str>, advance: Pt) -> Document {
        let config = LayoutConfig::default();
        let mut pager = Pager::new(&config);
        pager.advance(advance);
        render_code_block(
            &mut pager,
            code,
            language,
            config.content_left(),
            config.content_width(),
        );
        let y = pager.y();
        assert!(y >= config.top() && y <= config.bottom());
        pager.finish()
    }

    fn curves(page: &Page) -> usize {
        page.commands
            .iter()
            .filter(|cmd| matches!(cmd, Command::CurveTo { .. }))
            .count()
    }

    fn has_string(page: &Page, needle: &str) -> bool {
        page.strings().any(|s| s == needle)
    }

    #[test]
    fn short_block_is_a_single_first_and_last_chunk() {
        let config = LayoutConfig::default();
        let chunks = plan_chunks(&code_of(5), config.top(), &config);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_first_chunk_of_block);
        assert!(chunks[0].is_last_chunk_of_block);
        assert_eq!(chunks[0].lines.len(), 5);
    }

    #[test]
    fn empty_code_is_one_empty_line() {
        let config = LayoutConfig::default();
        let chunks = plan_chunks("", config.top(), &config);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].lines, vec![String::new()]);
    }

    #[test]
    fn chunks_fit_the_page_they_start_on() {
        let config = LayoutConfig::default();
        let start = config.bottom() - Pt::from_f32(100.0);
        let chunks = plan_chunks(&code_of(200), start, &config);
        assert!(chunks.len() >= 4);
        for (index, chunk) in chunks.iter().enumerate() {
            let chunk_top = if index == 0 { start } else { config.top() };
            assert!(chunk_top + chunk.panel_height(&config) <= config.bottom());
            assert!(chunk.panel_height(&config) <= config.printable_height());
        }
        // A later chunk is only opened when the previous one is full.
        let full = &chunks[1];
        let one_more = PageChunk {
            lines: vec![String::new(); full.lines.len() + 1],
            ..full.clone()
        };
        assert!(config.top() + one_more.panel_height(&config) > config.bottom());
    }

    #[test]
    fn single_page_python_block_has_label_and_no_marker() {
        let doc = render_at(&code_of(5), Some("python"), Pt::ZERO);
        assert_eq!(doc.page_count(), 1);
        let page = &doc.pages[0];
        assert!(has_string(page, "python"));
        assert!(!has_string(page, CONTINUED_MARKER));
        assert_eq!(page.block_kinds(), vec!["code"]);
        assert_eq!(curves(page), 4);
    }

    #[test]
    fn split_block_marks_continuations_and_labels_once() {
        let config = LayoutConfig::default();
        let doc = render_at(&code_of(200), Some("python"), config.printable_height() / 2);
        assert!(doc.page_count() >= 4);

        let first = &doc.pages[0];
        assert!(has_string(first, "python"));
        assert!(!has_string(first, CONTINUED_MARKER));
        assert_eq!(first.block_kinds(), vec!["code"]);
        assert_eq!(curves(first), 2, "only the top corners are rounded");

        let last_index = doc.page_count() - 1;
        for (index, page) in doc.pages.iter().enumerate().skip(1) {
            assert!(has_string(page, CONTINUED_MARKER));
            assert!(!has_string(page, "python"));
            assert_eq!(page.block_kinds(), vec!["code-chunk"]);
            let expected = if index == last_index { 2 } else { 0 };
            assert_eq!(curves(page), expected, "page {index}");
        }
    }

    #[test]
    fn panel_is_painted_before_its_text() {
        let doc = render_at("let x = 1;", Some("rust"), Pt::ZERO);
        let commands = &doc.pages[0].commands;
        let fill = commands
            .iter()
            .position(|cmd| matches!(cmd, Command::Fill))
            .expect("panel fill");
        let text = commands
            .iter()
            .position(|cmd| matches!(cmd, Command::DrawString { text, .. } if text == "let"))
            .expect("keyword text");
        assert!(fill < text);
    }

    #[test]
    fn tabs_expand_to_tab_stops() {
        assert_eq!(expand_tabs("\tx"), "    x");
        assert_eq!(expand_tabs("ab\tc"), "ab  c");
        assert_eq!(expand_tabs("plain"), "plain");
    }

    proptest! {
        #[test]
        fn chunks_partition_the_lines(
            lines in proptest::collection::vec("[ -~]{0,20}", 0..260),
            offset in 0u32..740,
        ) {
            let config = LayoutConfig::default();
            let code = lines.join("\n");
            let start = config.top() + Pt::from_i32(offset as i32);
            let start = start.min(config.bottom() - config.code_padding * 2 - config.code_line_height);
            let chunks = plan_chunks(&code, start, &config);

            let rejoined: Vec<String> = chunks.iter().flat_map(|c| c.lines.clone()).collect();
            let expected: Vec<String> = code.split('\n').map(str::to_string).collect();
            prop_assert_eq!(rejoined, expected);
            prop_assert_eq!(chunks.iter().filter(|c| c.is_first_chunk_of_block).count(), 1);
            prop_assert_eq!(chunks.iter().filter(|c| c.is_last_chunk_of_block).count(), 1);
            prop_assert!(chunks[0].is_first_chunk_of_block);
            prop_assert!(chunks[chunks.len() - 1].is_last_chunk_of_block);
            for chunk in &chunks {
                prop_assert!(chunk.panel_height(&config) <= config.printable_height());
                prop_assert!(!chunk.lines.is_empty());
            }
        }
    }
}
