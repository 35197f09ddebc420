use crate::code_block::render_code_block;
use crate::font::{HELVETICA, HELVETICA_BOLD, HELVETICA_OBLIQUE, measure_text_width, wrap_text};
use crate::layout::{LayoutConfig, Pager};
use crate::markup::{Inline, ListItem, Token};
use crate::types::{Color, Pt};

/// Style of a run of wrapped text.
#[derive(Debug, Clone, Copy)]
pub struct TextStyle<'f> {
    pub font: &'f str,
    pub size: Pt,
    pub line_height: Pt,
    pub color: Color,
}

impl TextStyle<'static> {
    pub fn body(pager: &Pager<'_>) -> Self {
        let config = pager.config();
        Self {
            font: HELVETICA,
            size: config.body_font_size,
            line_height: config.body_line_height,
            color: config.palette.text,
        }
    }
}

impl<'f> TextStyle<'f> {
    pub fn with_font(self, font: &'f str) -> Self {
        Self { font, ..self }
    }

    pub fn with_color(self, color: Color) -> Self {
        Self { color, ..self }
    }
}

/// Wraps `text` to `width` and paints it line by line at `left`, breaking
/// pages between lines as needed. Returns the number of lines painted.
pub fn paint_wrapped(
    pager: &mut Pager<'_>,
    text: &str,
    style: TextStyle<'_>,
    left: Pt,
    width: Pt,
) -> usize {
    let lines = wrap_text(text, style.font, style.size, width);
    for line in &lines {
        pager.ensure_space(style.line_height);
        let y = pager.y();
        let canvas = pager.canvas();
        if !line.is_empty() {
            canvas.set_fill_color(style.color);
            canvas.set_font(style.font, style.size);
            canvas.draw_string(left, y, line.as_str());
        }
        pager.advance(style.line_height);
    }
    lines.len()
}

pub fn render_tokens(pager: &mut Pager<'_>, tokens: &[Token], left: Pt, width: Pt) {
    for token in tokens {
        render_token(pager, token, left, width);
    }
}

/// Height the first painted line of `tokens` needs below the cursor,
/// including leading gaps. Callers that paint beside the first line reserve
/// this so the two never land on different pages.
pub fn leading_height(config: &LayoutConfig, tokens: &[Token]) -> Pt {
    let mut height = Pt::ZERO;
    for token in tokens {
        match token {
            Token::Space => height += config.block_gap,
            Token::Heading { depth, inline } => {
                if Inline::flatten(inline).trim().is_empty() {
                    continue;
                }
                return height + config.block_gap / 2 + config.heading_line_height(*depth);
            }
            Token::Code { .. } => {
                return height + config.code_padding * 2 + config.code_line_height;
            }
            _ => return height + config.body_line_height,
        }
    }
    height
}

pub fn render_token(pager: &mut Pager<'_>, token: &Token, left: Pt, width: Pt) {
    if pager.debug().is_some() {
        pager.count(&format!("blocks.{}", token.kind()), 1);
    }
    match token {
        Token::Heading { depth, inline } => render_heading(pager, *depth, inline, left, width),
        Token::Paragraph { inline } => {
            render_paragraph(pager, &Inline::flatten(inline), left, width)
        }
        Token::Raw(text) => render_paragraph(pager, text, left, width),
        Token::List {
            ordered,
            start,
            items,
        } => render_list(pager, *ordered, *start, items, left, width),
        Token::Blockquote { inline } => render_blockquote(pager, inline, left, width),
        Token::Code { text, language } => {
            render_code_block(pager, text, language.as_deref(), left, width)
        }
        Token::Space => {
            let gap = pager.config().block_gap;
            pager.advance(gap);
        }
    }
}

fn mark(pager: &mut Pager<'_>, kind: &str, first_line: Pt) {
    pager.ensure_space(first_line);
    pager.canvas().mark_block(kind);
}

fn render_heading(pager: &mut Pager<'_>, depth: u8, inline: &[Inline], left: Pt, width: Pt) {
    let config = pager.config();
    let text = Inline::flatten(inline);
    if text.trim().is_empty() {
        return;
    }
    let line_height = config.heading_line_height(depth);
    pager.advance(config.block_gap / 2);
    mark(pager, "heading", line_height);
    let style = TextStyle {
        font: HELVETICA_BOLD,
        size: config.heading_size(depth),
        line_height,
        color: config.palette.text,
    };
    paint_wrapped(pager, &text, style, left, width);
    pager.advance(config.block_gap / 2);
}

fn render_paragraph(pager: &mut Pager<'_>, text: &str, left: Pt, width: Pt) {
    if text.trim().is_empty() {
        return;
    }
    let style = TextStyle::body(pager);
    mark(pager, "paragraph", style.line_height);
    paint_wrapped(pager, text, style, left, width);
    let gap = pager.config().block_gap;
    pager.advance(gap);
}

fn render_list(
    pager: &mut Pager<'_>,
    ordered: bool,
    start: u64,
    items: &[ListItem],
    left: Pt,
    width: Pt,
) {
    if items.is_empty() {
        return;
    }
    let config = pager.config();
    let style = TextStyle::body(pager);
    let bullet_width = config.bullet_width;
    let text_left = left + bullet_width;
    let text_width = width - bullet_width;
    mark(pager, "list", style.line_height);
    for (index, item) in items.iter().enumerate() {
        let label = if ordered {
            format!("{}.", start.saturating_add(index as u64))
        } else {
            "\u{2022}".to_string()
        };
        let label_width = measure_text_width(style.font, style.size, &label);
        // Wide ordinals (e.g. "100.") hang into the gutter rather than the text.
        let label_x = (text_left - label_width - style.size / 3).max(left);

        pager.ensure_space(style.line_height);
        let y = pager.y();
        let canvas = pager.canvas();
        canvas.set_fill_color(style.color);
        canvas.set_font(style.font, style.size);
        canvas.draw_string(label_x, y, label);

        let text = Inline::flatten(&item.inline);
        if paint_wrapped(pager, &text, style, text_left, text_width) == 0 {
            pager.advance(style.line_height);
        }
        render_tokens(pager, &item.nested, text_left, text_width);
    }
    pager.advance(config.block_gap);
}

fn render_blockquote(pager: &mut Pager<'_>, inline: &[Inline], left: Pt, width: Pt) {
    let config = pager.config();
    let text = Inline::flatten(inline);
    let style = TextStyle::body(pager)
        .with_font(HELVETICA_OBLIQUE)
        .with_color(config.palette.muted);
    let lines = wrap_text(&text, style.font, style.size, width - config.quote_indent);
    if lines.is_empty() {
        return;
    }
    mark(pager, "blockquote", style.line_height);
    let text_left = left + config.quote_indent;
    let mut segment_start = pager.y();
    for line in &lines {
        if !pager.fits(style.line_height) {
            // The rule cannot cross the break; close this page's segment first.
            let segment_end = pager.y();
            paint_quote_rule(pager, left, segment_start, segment_end);
            pager.ensure_space(style.line_height);
            segment_start = pager.y();
        }
        let y = pager.y();
        if !line.is_empty() {
            let canvas = pager.canvas();
            canvas.set_fill_color(style.color);
            canvas.set_font(style.font, style.size);
            canvas.draw_string(text_left, y, line.as_str());
        }
        pager.advance(style.line_height);
    }
    let segment_end = pager.y();
    paint_quote_rule(pager, left, segment_start, segment_end);
    pager.advance(config.block_gap);
}

fn paint_quote_rule(pager: &mut Pager<'_>, x: Pt, from: Pt, to: Pt) {
    if to <= from {
        return;
    }
    let color = pager.config().palette.rule;
    let x = x + Pt::from_f32(1.5);
    let canvas = pager.canvas();
    canvas.set_stroke_color(color);
    canvas.set_line_width(Pt::from_f32(3.0));
    canvas.line(x, from, x, to);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{Command, Document};
    use crate::layout::LayoutConfig;
    use crate::markup::{CommonMarkLexer, MarkupLexer};
    use proptest::prelude::*;

    fn render(config: &LayoutConfig, markup: &str) -> Document {
        let tokens = CommonMarkLexer.lex(markup);
        let mut pager = Pager::new(config);
        for token in &tokens {
            render_token(
                &mut pager,
                token,
                config.content_left(),
                config.content_width(),
            );
            let y = pager.y();
            assert!(y >= config.top() && y <= config.bottom(), "cursor out of bounds");
        }
        pager.finish()
    }

    fn strings(doc: &Document) -> Vec<String> {
        doc.pages
            .iter()
            .flat_map(|page| page.strings().map(str::to_string).collect::<Vec<_>>())
            .collect()
    }

    #[test]
    fn empty_markup_paints_nothing() {
        let config = LayoutConfig::default();
        let doc = render(&config, "");
        assert_eq!(doc.page_count(), 1);
        assert!(doc.pages[0].commands.is_empty());
    }

    #[test]
    fn headings_use_bold_and_depth_size() {
        let config = LayoutConfig::default();
        let doc = render(&config, "### Section three");
        let commands = &doc.pages[0].commands;
        assert!(commands.contains(&Command::SetFontName(HELVETICA_BOLD.to_string())));
        assert!(commands.contains(&Command::SetFontSize(config.heading_size(3))));
        assert_eq!(strings(&doc), vec!["Section three"]);
    }

    #[test]
    fn lists_paint_bullets_and_numerals() {
        let config = LayoutConfig::default();
        let doc = render(&config, "- alpha\n- beta\n\n9. nine\n10. ten\n");
        assert_eq!(
            strings(&doc),
            vec!["\u{2022}", "alpha", "\u{2022}", "beta", "9.", "nine", "10.", "ten"]
        );
        assert_eq!(doc.pages[0].block_kinds(), vec!["list", "list"]);
    }

    #[test]
    fn list_text_is_indented_past_the_bullet() {
        let config = LayoutConfig::default();
        let doc = render(&config, "- alpha");
        let xs: Vec<Pt> = doc.pages[0]
            .commands
            .iter()
            .filter_map(|cmd| match cmd {
                Command::DrawString { x, .. } => Some(*x),
                _ => None,
            })
            .collect();
        assert_eq!(xs.len(), 2);
        assert!(xs[0] < xs[1]);
        assert_eq!(xs[1], config.content_left() + config.bullet_width);
    }

    #[test]
    fn blockquote_rule_spans_all_lines() {
        let config = LayoutConfig::default();
        let doc = render(&config, "> one\n>\n> two\n");
        let commands = &doc.pages[0].commands;
        let (from, to) = commands
            .windows(2)
            .find_map(|pair| match pair {
                [Command::MoveTo { y: from, .. }, Command::LineTo { y: to, .. }] => {
                    Some((*from, *to))
                }
                _ => None,
            })
            .expect("rule segment");
        assert_eq!(to - from, config.body_line_height * 2);
        let rule_at = commands
            .iter()
            .position(|cmd| matches!(cmd, Command::Stroke))
            .expect("stroke");
        let last_text = commands
            .iter()
            .rposition(|cmd| matches!(cmd, Command::DrawString { .. }))
            .expect("text");
        assert!(rule_at > last_text, "rule is drawn after the lines are placed");
    }

    #[test]
    fn blockquote_across_pages_draws_one_rule_per_page() {
        let config = LayoutConfig::default();
        let lines: Vec<String> = (0..80).map(|i| format!("quoted line {i}  ")).collect();
        let markup = format!("> {}", lines.join("\n> "));
        let doc = render(&config, &markup);
        assert_eq!(doc.page_count(), 2);
        for page in &doc.pages {
            let strokes = page
                .commands
                .iter()
                .filter(|cmd| matches!(cmd, Command::Stroke))
                .count();
            assert_eq!(strokes, 1);
        }
    }

    #[test]
    fn long_paragraphs_flow_onto_new_pages() {
        let config = LayoutConfig::default();
        let paragraph = "word ".repeat(3000);
        let doc = render(&config, &paragraph);
        assert!(doc.page_count() >= 3);
        for page in &doc.pages {
            for cmd in &page.commands {
                if let Command::DrawString { y, .. } = cmd {
                    assert!(*y + config.body_line_height <= config.bottom());
                    assert!(*y >= config.top());
                }
            }
        }
    }

    fn block_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-z ]{1,400}".prop_map(|text| format!("{text}\n\n")),
            (1u8..7, "[a-z ]{1,60}").prop_map(|(depth, text)| format!(
                "{} x{text}\n\n",
                "#".repeat(depth as usize)
            )),
            proptest::collection::vec("[a-z ]{1,80}", 1..12)
                .prop_map(|items| format!("- x{}\n\n", items.join("\n- x"))),
            proptest::collection::vec("[a-z ]{1,60}", 1..120)
                .prop_map(|lines| format!("```rust\n{}\n```\n\n", lines.join("\n"))),
            "[a-z ]{1,300}".prop_map(|text| format!("> x{text}\n\n")),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]
        #[test]
        fn cursor_stays_within_page_bounds(blocks in proptest::collection::vec(block_strategy(), 1..25)) {
            let config = LayoutConfig::default();
            // `render` asserts the bound after every block.
            let doc = render(&config, &blocks.concat());
            prop_assert!(doc.page_count() >= 1);
        }
    }
}
