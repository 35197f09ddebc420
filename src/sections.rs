use crate::blocks::{TextStyle, leading_height, paint_wrapped, render_tokens};
use crate::font::{HELVETICA_BOLD, measure_text_width};
use crate::layout::Pager;
use crate::markup::MarkupLexer;
use crate::error::PrepBookError;
use crate::record::{OpeningBrief, QaPair, Question, RevisionTopic, answer_indices};
use crate::types::Pt;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Brief,
    Topics,
    Questions,
    QaPairs,
}

impl SectionKind {
    pub fn title(self) -> &'static str {
        match self {
            SectionKind::Brief => "Opening Brief",
            SectionKind::Topics => "Revision Topics",
            SectionKind::Questions => "Practice Questions",
            SectionKind::QaPairs => "Rapid-Fire Q&A",
        }
    }

    /// Length of the accent rule under the section title.
    pub fn rule_width(self) -> Pt {
        Pt::from_i32(match self {
            SectionKind::Brief => 110,
            SectionKind::Topics => 130,
            SectionKind::Questions => 150,
            SectionKind::QaPairs => 120,
        })
    }

    fn key(self) -> &'static str {
        match self {
            SectionKind::Brief => "brief",
            SectionKind::Topics => "topics",
            SectionKind::Questions => "questions",
            SectionKind::QaPairs => "qa",
        }
    }
}

const SECTION_TITLE_SIZE: f32 = 15.0;
const RECORD_TITLE_SIZE: f32 = 11.5;

/// Letter for a 0-based option index; past `Z` options fall back to numerals.
pub fn option_label(index: usize) -> String {
    if index < 26 {
        char::from(b'A' + index as u8).to_string()
    } else {
        (index + 1).to_string()
    }
}

/// Composer-level view of the lexer plus the content column.
pub(crate) struct Composer<'p, 'a> {
    pager: &'p mut Pager<'a>,
    lexer: &'p dyn MarkupLexer,
    left: Pt,
    width: Pt,
}

impl<'p, 'a> Composer<'p, 'a> {
    pub(crate) fn new(pager: &'p mut Pager<'a>, lexer: &'p dyn MarkupLexer) -> Self {
        let config = pager.config();
        Self {
            left: config.content_left(),
            width: config.content_width(),
            pager,
            lexer,
        }
    }

    fn markup(&mut self, markup: &str, indent: Pt) {
        let tokens = self.lexer.lex(markup);
        render_tokens(self.pager, &tokens, self.left + indent, self.width - indent);
    }

    fn section_title(&mut self, kind: SectionKind, records: usize) {
        let config = self.pager.config();
        if let Some(debug) = self.pager.debug() {
            debug.event(
                "compose.section",
                json!({"section": kind.key(), "records": records}),
            );
        }
        let size = Pt::from_f32(SECTION_TITLE_SIZE);
        let line_height = size.mul_ratio(14, 10);
        let rule_gap = Pt::from_f32(4.0);
        // Keep the title with its rule and at least one body line.
        self.pager.advance(config.block_gap * 2);
        self.pager
            .ensure_space(line_height + rule_gap + config.body_line_height * 2);
        self.pager.canvas().mark_block("section");
        let style = TextStyle {
            font: HELVETICA_BOLD,
            size,
            line_height,
            color: config.palette.accent,
        };
        paint_wrapped(self.pager, kind.title(), style, self.left, self.width);
        let y = self.pager.y();
        let canvas = self.pager.canvas();
        canvas.set_stroke_color(config.palette.accent);
        canvas.set_line_width(Pt::from_f32(1.5));
        canvas.line(self.left, y, self.left + kind.rule_width().min(self.width), y);
        self.pager.advance(rule_gap + config.block_gap);
    }

    fn record_title(&mut self, text: &str) {
        let config = self.pager.config();
        let size = Pt::from_f32(RECORD_TITLE_SIZE);
        let line_height = size.mul_ratio(14, 10);
        self.pager.advance(config.block_gap);
        // Title plus one body line stay together.
        self.pager.ensure_space(line_height + config.body_line_height);
        self.pager.canvas().mark_block("record");
        let style = TextStyle {
            font: HELVETICA_BOLD,
            size,
            line_height,
            color: config.palette.text,
        };
        paint_wrapped(self.pager, text, style, self.left, self.width);
    }

    fn meta_line(&mut self, text: &str) {
        let config = self.pager.config();
        let style = TextStyle::body(self.pager).with_color(config.palette.muted);
        paint_wrapped(self.pager, text, style, self.left, self.width);
        self.pager.advance(config.block_gap / 2);
    }

    /// Paints `label` in bold on the first line and the markup beside it.
    /// The label waits for room under the markup's first block, so a code
    /// panel or heading that breaks the page takes its label along.
    fn labelled_markup(&mut self, label: &str, markup: &str) {
        let config = self.pager.config();
        let style = TextStyle::body(self.pager).with_font(HELVETICA_BOLD);
        let indent = measure_text_width(style.font, style.size, label) + Pt::from_f32(6.0);
        let indent = indent.max(config.bullet_width);
        let tokens = self.lexer.lex(markup);
        self.pager
            .ensure_space(style.line_height.max(leading_height(config, &tokens)));
        let y = self.pager.y();
        let canvas = self.pager.canvas();
        canvas.set_fill_color(style.color);
        canvas.set_font(style.font, style.size);
        canvas.draw_string(self.left, y, label);
        let before = self.pager.cursor();
        render_tokens(
            self.pager,
            &tokens,
            self.left + indent,
            self.width - indent,
        );
        if self.pager.cursor() == before {
            self.pager.advance(style.line_height);
        }
    }

    pub(crate) fn brief(&mut self, brief: &OpeningBrief) {
        self.section_title(SectionKind::Brief, 1);
        self.meta_line(&format!(
            "Match score: {}% \u{00b7} Prep time: {}",
            brief.match_score.min(100),
            brief.prep_time.trim()
        ));
        if !brief.skills.is_empty() {
            let config = self.pager.config();
            let style = TextStyle::body(self.pager);
            let label = "Key skills: ";
            let indent = measure_text_width(HELVETICA_BOLD, style.size, label);
            self.pager.ensure_space(style.line_height);
            let y = self.pager.y();
            let canvas = self.pager.canvas();
            canvas.set_fill_color(style.color);
            canvas.set_font(HELVETICA_BOLD, style.size);
            canvas.draw_string(self.left, y, label);
            paint_wrapped(
                self.pager,
                &brief.skills.join(", "),
                style,
                self.left + indent,
                self.width - indent,
            );
            self.pager.advance(config.block_gap);
        }
        self.markup(&brief.body, Pt::ZERO);
    }

    pub(crate) fn topics(&mut self, topics: &[RevisionTopic]) {
        self.section_title(SectionKind::Topics, topics.len());
        for (index, topic) in topics.iter().enumerate() {
            self.record_title(&format!("{}. {}", index + 1, topic.title.trim()));
            let reason = topic.reason.trim();
            let meta = if reason.is_empty() {
                format!("Confidence: {}", topic.confidence.label())
            } else {
                format!(
                    "Confidence: {} / Reason: {}",
                    topic.confidence.label(),
                    reason
                )
            };
            self.meta_line(&meta);
            self.markup(&topic.body, Pt::ZERO);
        }
    }

    /// Fails before painting anything when an answer matches none of its
    /// question's options.
    pub(crate) fn questions(&mut self, questions: &[Question]) -> Result<(), PrepBookError> {
        let answers = answer_indices(questions)?;
        self.section_title(SectionKind::Questions, questions.len());
        for (index, (question, answer)) in questions.iter().zip(answers).enumerate() {
            self.record_title(&format!("Question {}", index + 1));
            self.markup(&question.question, Pt::ZERO);
            for (option_index, option) in question.options.iter().enumerate() {
                self.labelled_markup(&format!("{}.", option_label(option_index)), option);
            }
            let config = self.pager.config();
            let style = TextStyle::body(self.pager)
                .with_font(HELVETICA_BOLD)
                .with_color(config.palette.answer);
            self.pager.advance(config.block_gap / 2);
            self.pager.canvas().mark_block("answer");
            paint_wrapped(
                self.pager,
                &format!("Answer: {}", option_label(answer)),
                style,
                self.left,
                self.width,
            );
            self.pager.advance(config.block_gap / 2);
            if !question.explanation.trim().is_empty() {
                self.labelled_markup("Explanation:", &question.explanation);
            }
        }
        Ok(())
    }

    pub(crate) fn qa_pairs(&mut self, pairs: &[QaPair]) {
        self.section_title(SectionKind::QaPairs, pairs.len());
        for (index, pair) in pairs.iter().enumerate() {
            let config = self.pager.config();
            self.pager.advance(config.block_gap);
            self.pager.canvas().mark_block("qa");
            self.labelled_markup(&format!("Q{}.", index + 1), &pair.question);
            self.labelled_markup("A:", &pair.answer);
        }
    }
}
