mod blocks;
mod canvas;
mod code_block;
mod debug;
mod error;
mod font;
mod highlight;
mod layout;
mod markup;
mod metrics;
mod pdf;
mod pdfinspect;
mod perf;
mod record;
mod sections;
mod types;

pub use blocks::{TextStyle, paint_wrapped, render_token, render_tokens};
pub use canvas::{Canvas, Command, Document, META_BLOCK_KEY, Page};
pub use code_block::{CONTINUED_MARKER, PageChunk, plan_chunks, render_code_block};
use debug::DebugLogger;
pub use error::PrepBookError;
pub use font::{
    COURIER, HELVETICA, HELVETICA_BOLD, HELVETICA_OBLIQUE, measure_text_width, wrap_text,
};
pub use highlight::{ColorTag, ColoredSpan, is_keyword, tokenize_line};
pub use layout::{Cursor, LayoutConfig, Pager, Palette};
pub use markup::{CommonMarkLexer, Inline, ListItem, MarkupLexer, Token};
pub use metrics::{DocumentMetrics, PageMetrics};
use pdf::{PdfOptions, document_to_pdf_with_metrics};
pub use pdfinspect::{PdfInspectReport, inspect_pdf_bytes, inspect_pdf_path, require_readable};
use perf::{PerfLogger, timed};
pub use record::{
    Confidence, OpeningBrief, PrepRecord, QaPair, Question, RevisionTopic, SectionOptions,
};
use sections::Composer;
pub use sections::{SectionKind, option_label};
pub use types::{Color, Margins, Pt, Size};

use chrono::NaiveDate;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Title painted at the top of page one of every pack.
pub const DOCUMENT_TITLE: &str = "Interview Preparation Pack";

const FILENAME_PREFIX: &str = "interview-prep";

/// Footer text stamped on every page once the total page count is known.
/// `{page}` and `{pages}` are replaced with the 1-based page number and the
/// page total.
#[derive(Debug, Clone, PartialEq)]
pub struct PageFooterSpec {
    pub template: String,
    pub font_size: Pt,
    pub color: Color,
}

impl Default for PageFooterSpec {
    fn default() -> Self {
        Self {
            template: "Page {page} of {pages}".to_string(),
            font_size: Pt::from_f32(8.0),
            color: Palette::default().muted,
        }
    }
}

/// A rendered pack ready to be written out or streamed.
#[derive(Debug, Clone)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub page_count: usize,
    pub fingerprint: String,
    pub metrics: DocumentMetrics,
}

/// Immutable composition engine. Each call lays out into its own pager, so
/// one instance may serve concurrent callers.
pub struct PrepBook {
    layout: LayoutConfig,
    lexer: Box<dyn MarkupLexer>,
    page_footer: Option<PageFooterSpec>,
    pdf_options: PdfOptions,
    debug: Option<DebugLogger>,
    perf: Option<PerfLogger>,
}

impl PrepBook {
    pub fn builder() -> PrepBookBuilder {
        PrepBookBuilder::new()
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// Lays out the selected sections of `record`. Questions are checked
    /// before anything is painted, so an unmatched answer yields no document.
    pub fn compose(
        &self,
        record: &PrepRecord,
        options: &SectionOptions,
    ) -> Result<Document, PrepBookError> {
        if options.include_questions {
            record.validate_questions()?;
        }
        let (document, counters) = timed(self.perf.as_ref(), "compose", || {
            self.compose_validated(record, options)
        })?;
        if let Some(debug) = &self.debug {
            debug.event(
                "assemble.done",
                json!({
                    "pages": document.page_count(),
                    "fingerprint": document.layout_fingerprint(),
                }),
            );
            debug.emit_summary("compose", &counters);
            debug.flush();
        }
        Ok(document)
    }

    fn compose_validated(
        &self,
        record: &PrepRecord,
        options: &SectionOptions,
    ) -> Result<(Document, BTreeMap<String, u64>), PrepBookError> {
        let mut pager = Pager::new(&self.layout).with_debug(self.debug.as_ref());
        paint_title_block(&mut pager, record);
        {
            let mut composer = Composer::new(&mut pager, self.lexer.as_ref());
            if options.include_brief
                && let Some(brief) = &record.brief
            {
                composer.brief(brief);
            }
            if options.include_topics && !record.topics.is_empty() {
                composer.topics(&record.topics);
            }
            if options.include_questions && !record.questions.is_empty() {
                composer.questions(&record.questions)?;
            }
            if options.include_qa && !record.qa_pairs.is_empty() {
                composer.qa_pairs(&record.qa_pairs);
            }
        }
        let (mut document, counters) = pager.finish_with_counters();
        if let Some(footer) = &self.page_footer {
            apply_page_footer(&mut document, footer, &self.layout);
        }
        Ok((document, counters))
    }

    /// Renders with today's local date in the filename.
    pub fn render(
        &self,
        record: &PrepRecord,
        options: &SectionOptions,
    ) -> Result<RenderedPdf, PrepBookError> {
        self.render_on(record, options, chrono::Local::now().date_naive())
    }

    pub fn render_on(
        &self,
        record: &PrepRecord,
        options: &SectionOptions,
        date: NaiveDate,
    ) -> Result<RenderedPdf, PrepBookError> {
        let document = self.compose(record, options)?;
        let mut metrics = DocumentMetrics::collect(&document, 0);
        let pdf_options = PdfOptions {
            title: Some(subheading(record).map_or_else(
                || DOCUMENT_TITLE.to_string(),
                |sub| format!("{DOCUMENT_TITLE}: {sub}"),
            )),
            ..self.pdf_options.clone()
        };
        let bytes = timed(self.perf.as_ref(), "pdf.write", || {
            document_to_pdf_with_metrics(&document, &pdf_options, Some(&mut metrics))
        })?;
        if let Some(perf) = &self.perf {
            perf.flush();
        }
        Ok(RenderedPdf {
            bytes,
            filename: document_filename(&record.company, &record.job_title, date),
            page_count: document.page_count(),
            fingerprint: document.layout_fingerprint(),
            metrics,
        })
    }
}

pub struct PrepBookBuilder {
    layout: LayoutConfig,
    page_size: Option<Size>,
    margins: Option<Margins>,
    lexer: Box<dyn MarkupLexer>,
    page_footer: Option<PageFooterSpec>,
    pdf_options: PdfOptions,
    debug_path: Option<PathBuf>,
    perf_path: Option<PathBuf>,
}

impl Default for PrepBookBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PrepBookBuilder {
    pub fn new() -> Self {
        Self {
            layout: LayoutConfig::default(),
            page_size: None,
            margins: None,
            lexer: Box::new(CommonMarkLexer),
            page_footer: Some(PageFooterSpec::default()),
            pdf_options: PdfOptions::default(),
            debug_path: None,
            perf_path: None,
        }
    }

    pub fn layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    // Overrides the layout's page size regardless of call order.
    pub fn page_size(mut self, size: Size) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn margins(mut self, margins: Margins) -> Self {
        self.margins = Some(margins);
        self
    }

    pub fn lexer(mut self, lexer: Box<dyn MarkupLexer>) -> Self {
        self.lexer = lexer;
        self
    }

    /// `None` turns the footer off.
    pub fn page_footer(mut self, footer: Option<PageFooterSpec>) -> Self {
        self.page_footer = footer;
        self
    }

    pub fn compress_streams(mut self, enabled: bool) -> Self {
        self.pdf_options.compress = enabled;
        self
    }

    // Enable debug logging to a JSONL file for layout inspection.
    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    // Enable performance logging to a JSONL file.
    pub fn perf_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.perf_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<PrepBook, PrepBookError> {
        let mut layout = self.layout;
        if let Some(size) = self.page_size {
            layout.page_size = size;
        }
        if let Some(margins) = self.margins {
            layout.margins = margins;
        }
        if layout.page_size.width <= Pt::ZERO || layout.page_size.height <= Pt::ZERO {
            return Err(PrepBookError::InvalidConfiguration(
                "page_size must be positive".to_string(),
            ));
        }
        layout.validate()?;
        if let Some(footer) = &self.page_footer {
            if footer.font_size <= Pt::ZERO {
                return Err(PrepBookError::InvalidConfiguration(
                    "page_footer.font_size must be positive".to_string(),
                ));
            }
            if footer.font_size > layout.margins.bottom {
                return Err(PrepBookError::InvalidConfiguration(
                    "page_footer.font_size does not fit in the bottom margin".to_string(),
                ));
            }
        }
        let debug = match self.debug_path {
            Some(path) => Some(DebugLogger::new(path)?),
            None => None,
        };
        let perf = match self.perf_path {
            Some(path) => Some(PerfLogger::new(path)?),
            None => None,
        };
        Ok(PrepBook {
            layout,
            lexer: self.lexer,
            page_footer: self.page_footer,
            pdf_options: self.pdf_options,
            debug,
            perf,
        })
    }
}

fn subheading(record: &PrepRecord) -> Option<String> {
    let title = record.job_title.trim();
    let company = record.company.trim();
    match (title.is_empty(), company.is_empty()) {
        (false, false) => Some(format!("{title} at {company}")),
        (false, true) => Some(title.to_string()),
        (true, false) => Some(company.to_string()),
        (true, true) => None,
    }
}

fn paint_title_block(pager: &mut Pager<'_>, record: &PrepRecord) {
    let config = pager.config();
    let left = config.content_left();
    let width = config.content_width();
    pager.canvas().mark_block("title");

    let size = Pt::from_f32(22.0);
    let title = TextStyle {
        font: HELVETICA_BOLD,
        size,
        line_height: size.mul_ratio(13, 10),
        color: config.palette.accent,
    };
    paint_wrapped(pager, DOCUMENT_TITLE, title, left, width);

    if let Some(subheading) = subheading(record) {
        let size = Pt::from_f32(12.0);
        let style = TextStyle {
            font: HELVETICA,
            size,
            line_height: size.mul_ratio(14, 10),
            color: config.palette.muted,
        };
        paint_wrapped(pager, &subheading, style, left, width);
    }

    pager.advance(config.block_gap);
    let y = pager.ensure_space(config.body_line_height);
    let canvas = pager.canvas();
    canvas.set_stroke_color(config.palette.rule);
    canvas.set_line_width(Pt::from_f32(0.75));
    canvas.line(left, y, left + width, y);
    pager.advance(config.block_gap);
}

/// Stamps the footer centred in the bottom margin of every page. Runs after
/// layout, so it never moves the cursor or causes a break.
fn apply_page_footer(doc: &mut Document, spec: &PageFooterSpec, config: &LayoutConfig) {
    let total_pages = doc.pages.len();
    let page_height = doc.page_size.height;
    for (index, page) in doc.pages.iter_mut().enumerate() {
        let text = spec
            .template
            .replace("{pages}", &total_pages.to_string())
            .replace("{page}", &(index + 1).to_string());
        if text.trim().is_empty() {
            continue;
        }
        let text_width = measure_text_width(HELVETICA, spec.font_size, &text);
        let x = (config.content_left() + (config.content_width() - text_width) / 2)
            .max(config.content_left());
        // Top of the text box, centred vertically in the bottom margin.
        let y = page_height - (config.margins.bottom + spec.font_size) / 2;

        page.commands.push(Command::SaveState);
        page.commands.push(Command::SetFillColor(spec.color));
        page.commands
            .push(Command::SetFontName(HELVETICA.to_string()));
        page.commands.push(Command::SetFontSize(spec.font_size));
        page.commands.push(Command::DrawString { x, y, text });
        page.commands.push(Command::RestoreState);
    }
}

/// `interview-prep_{company}_{title}_{YYYY-MM-DD}.pdf` with both names
/// lowercased, hyphenated and stripped to `[a-z0-9-]`.
pub fn document_filename(company: &str, job_title: &str, date: NaiveDate) -> String {
    format!(
        "{}_{}_{}_{}.pdf",
        FILENAME_PREFIX,
        filename_component(company),
        filename_component(job_title),
        date.format("%Y-%m-%d")
    )
}

fn filename_component(value: &str) -> String {
    let mut out = String::new();
    for ch in value.chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() || ch == '-' {
            if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
        } else if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            out.push(ch);
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        "untitled".to_string()
    } else {
        out
    }
}
