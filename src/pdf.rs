use crate::canvas::{Command, Document, Page};
use crate::font::{HELVETICA, is_base14_font};
use crate::metrics::DocumentMetrics;
use crate::types::{Color, Pt};
use fixed::types::I32F32;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};

#[derive(Debug, Clone)]
pub struct PdfOptions {
    pub title: Option<String>,
    /// Flate-compress page content streams.
    pub compress: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            title: None,
            compress: true,
        }
    }
}

const PRODUCER: &str = "prepbook";

struct FontResource {
    resource: String,
    object_id: usize,
}

pub fn document_to_pdf(document: &Document, options: &PdfOptions) -> io::Result<Vec<u8>> {
    document_to_pdf_with_metrics(document, options, None)
}

/// Serializes `document` and, when given, records per-page content stream
/// sizes and the total byte count into `metrics`.
pub fn document_to_pdf_with_metrics(
    document: &Document,
    options: &PdfOptions,
    metrics: Option<&mut DocumentMetrics>,
) -> io::Result<Vec<u8>> {
    let mut out: Vec<u8> = Vec::new();
    let content_bytes = write_document(document, options, &mut out)?;
    if let Some(metrics) = metrics {
        metrics.total_bytes = out.len();
        for (entry, bytes) in metrics.pages.iter_mut().zip(content_bytes) {
            entry.content_bytes = bytes;
        }
    }
    Ok(out)
}

fn write_document<W: Write>(
    document: &Document,
    options: &PdfOptions,
    writer: &mut W,
) -> io::Result<Vec<usize>> {
    let font_names = collect_font_names(document);
    for name in &font_names {
        if !is_base14_font(name) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("font {name:?} is not a standard 14 font"),
            ));
        }
    }

    // 1 catalog, 2 pages, 3 info, then fonts, then a page and content
    // object per page.
    let catalog_id = 1;
    let pages_id = 2;
    let info_id = 3;
    let first_font_id = 4;
    let first_page_id = first_font_id + font_names.len();
    let page_count = document.pages.len();
    let object_count = first_page_id + page_count * 2;

    let font_map: BTreeMap<String, FontResource> = font_names
        .iter()
        .enumerate()
        .map(|(index, name)| {
            (
                name.clone(),
                FontResource {
                    resource: format!("F{}", index + 1),
                    object_id: first_font_id + index,
                },
            )
        })
        .collect();

    let mut offset = 0usize;
    let mut offsets = vec![0usize; object_count];
    write_bytes(writer, b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n", &mut offset)?;

    write_pdf_object(
        writer,
        &mut offset,
        &mut offsets,
        catalog_id,
        &format!("<< /Type /Catalog /Pages {} 0 R >>", pages_id),
    )?;
    let kids = (0..page_count)
        .map(|index| format!("{} 0 R", first_page_id + index * 2))
        .collect::<Vec<_>>()
        .join(" ");
    write_pdf_object(
        writer,
        &mut offset,
        &mut offsets,
        pages_id,
        &format!(
            "<< /Type /Pages /Kids [{}] /Count {} /MediaBox [0 0 {} {}] >>",
            kids,
            page_count,
            fmt_pt(document.page_size.width),
            fmt_pt(document.page_size.height)
        ),
    )?;
    write_pdf_object(
        writer,
        &mut offset,
        &mut offsets,
        info_id,
        &info_object(options.title.as_deref()),
    )?;
    for (name, font) in &font_map {
        write_pdf_object(
            writer,
            &mut offset,
            &mut offsets,
            font.object_id,
            &font_object(name),
        )?;
    }

    let resources = font_resources(&font_map);
    let mut content_bytes = Vec::with_capacity(page_count);
    for (index, page) in document.pages.iter().enumerate() {
        let page_id = first_page_id + index * 2;
        let content_id = page_id + 1;
        write_pdf_object(
            writer,
            &mut offset,
            &mut offsets,
            page_id,
            &format!(
                "<< /Type /Page /Parent {} 0 R /Resources << /Font {} >> /Contents {} 0 R >>",
                pages_id, resources, content_id
            ),
        )?;
        let content = render_page(page, document.page_size.height, &font_map);
        let stream = stream_object(content.as_bytes(), options.compress)?;
        content_bytes.push(stream.len());
        write_pdf_object_bytes(writer, &mut offset, &mut offsets, content_id, &stream)?;
    }

    let xref_start = offset;
    write_str(writer, &format!("xref\n0 {}\n", object_count), &mut offset)?;
    write_str(writer, "0000000000 65535 f \n", &mut offset)?;
    for object_offset in offsets.iter().skip(1) {
        write_str(writer, &format!("{:010} 00000 n \n", object_offset), &mut offset)?;
    }
    write_str(
        writer,
        &format!(
            "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            object_count, catalog_id, info_id, xref_start
        ),
        &mut offset,
    )?;
    Ok(content_bytes)
}

#[derive(Debug, Clone)]
struct TextFont {
    font_name: String,
    font_size: Pt,
}

/// Font selection as the canvas sees it: `q`/`Q` save and restore it along
/// with the rest of the graphics state.
struct TextState {
    current: TextFont,
    stack: Vec<TextFont>,
}

impl TextState {
    fn new() -> Self {
        // Every page starts from the canvas default font.
        Self {
            current: TextFont {
                font_name: HELVETICA.to_string(),
                font_size: Pt::from_f32(12.0),
            },
            stack: Vec::new(),
        }
    }

    fn apply(&mut self, cmd: &Command) {
        match cmd {
            Command::SaveState => self.stack.push(self.current.clone()),
            Command::RestoreState => {
                if let Some(saved) = self.stack.pop() {
                    self.current = saved;
                }
            }
            Command::SetFontName(name) => self.current.font_name = name.clone(),
            Command::SetFontSize(size) => self.current.font_size = *size,
            _ => {}
        }
    }
}

/// Font names used by any page, in the order resources are numbered.
fn collect_font_names(document: &Document) -> Vec<String> {
    let mut names = BTreeSet::new();
    for page in &document.pages {
        let mut state = TextState::new();
        for cmd in &page.commands {
            state.apply(cmd);
            if let Command::DrawString { .. } = cmd {
                names.insert(state.current.font_name.clone());
            }
        }
    }
    if names.is_empty() {
        names.insert(HELVETICA.to_string());
    }
    names.into_iter().collect()
}

fn font_object(name: &str) -> String {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        name
    )
}

fn font_resources(fonts: &BTreeMap<String, FontResource>) -> String {
    let entries = fonts
        .values()
        .map(|font| format!("/{} {} 0 R", font.resource, font.object_id))
        .collect::<Vec<_>>();
    format!("<< {} >>", entries.join(" "))
}

fn info_object(title: Option<&str>) -> String {
    let mut entries: Vec<String> = Vec::new();
    if let Some(title) = title {
        entries.push(format!("/Title ({})", encode_winansi_pdf_string(title)));
    }
    entries.push(format!("/Producer ({})", PRODUCER));
    format!("<< {} >>", entries.join(" "))
}

fn stream_object(content: &[u8], compress: bool) -> io::Result<Vec<u8>> {
    let (data, filter) = if compress {
        (flate_compress(content)?, " /Filter /FlateDecode")
    } else {
        (content.to_vec(), "")
    };
    let mut out = format!("<< /Length {}{} >>\nstream\n", data.len(), filter).into_bytes();
    out.extend_from_slice(&data);
    out.extend_from_slice(b"\nendstream");
    Ok(out)
}

fn flate_compress(data: &[u8]) -> io::Result<Vec<u8>> {
    use flate2::Compression;
    use flate2::write::ZlibEncoder;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

fn render_page(page: &Page, page_height: Pt, font_map: &BTreeMap<String, FontResource>) -> String {
    let mut out = String::new();
    let mut state = TextState::new();

    for cmd in &page.commands {
        state.apply(cmd);
        match cmd {
            Command::SaveState => out.push_str("q\n"),
            Command::RestoreState => out.push_str("Q\n"),
            Command::Meta { .. } => {}
            Command::SetFillColor(color) => out.push_str(&color_to_pdf_fill(*color)),
            Command::SetStrokeColor(color) => out.push_str(&color_to_pdf_stroke(*color)),
            Command::SetLineWidth(width) => {
                out.push_str(&format!("{} w\n", fmt_pt(*width)));
            }
            Command::SetFontName(_) | Command::SetFontSize(_) => {}
            Command::ClipRect {
                x,
                y,
                width,
                height,
            } => {
                // Top-left origin in, bottom-left origin out.
                out.push_str(&format!(
                    "{} {} {} {} re\nW\nn\n",
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - *height),
                    fmt_pt(*width),
                    fmt_pt(*height)
                ));
            }
            Command::MoveTo { x, y } => {
                out.push_str(&format!("{} {} m\n", fmt_pt(*x), fmt_pt(page_height - *y)));
            }
            Command::LineTo { x, y } => {
                out.push_str(&format!("{} {} l\n", fmt_pt(*x), fmt_pt(page_height - *y)));
            }
            Command::CurveTo {
                x1,
                y1,
                x2,
                y2,
                x,
                y,
            } => {
                out.push_str(&format!(
                    "{} {} {} {} {} {} c\n",
                    fmt_pt(*x1),
                    fmt_pt(page_height - *y1),
                    fmt_pt(*x2),
                    fmt_pt(page_height - *y2),
                    fmt_pt(*x),
                    fmt_pt(page_height - *y),
                ));
            }
            Command::ClosePath => out.push_str("h\n"),
            Command::Fill => out.push_str("f\n"),
            Command::Stroke => out.push_str("S\n"),
            Command::DrawString { x, y, text } => {
                let TextFont {
                    font_name,
                    font_size,
                } = &state.current;
                let resource = font_map
                    .get(font_name)
                    .map(|font| font.resource.as_str())
                    .unwrap_or("F1");
                out.push_str("BT\n");
                out.push_str(&format!("/{} {} Tf\n", resource, fmt_pt(*font_size)));
                out.push_str(&format!(
                    "{} {} Td\n",
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - *font_size)
                ));
                out.push_str(&format!("({}) Tj\n", encode_winansi_pdf_string(text)));
                out.push_str("ET\n");
            }
        }
    }

    out
}

fn write_pdf_object<W: Write>(
    writer: &mut W,
    offset: &mut usize,
    offsets: &mut [usize],
    obj_id: usize,
    body: &str,
) -> io::Result<()> {
    write_pdf_object_bytes(writer, offset, offsets, obj_id, body.as_bytes())
}

fn write_pdf_object_bytes<W: Write>(
    writer: &mut W,
    offset: &mut usize,
    offsets: &mut [usize],
    obj_id: usize,
    body: &[u8],
) -> io::Result<()> {
    if let Some(slot) = offsets.get_mut(obj_id) {
        *slot = *offset;
    }
    write_str(writer, &format!("{} 0 obj\n", obj_id), offset)?;
    write_bytes(writer, body, offset)?;
    write_bytes(writer, b"\nendobj\n", offset)?;
    Ok(())
}

fn write_bytes<W: Write>(writer: &mut W, data: &[u8], offset: &mut usize) -> io::Result<()> {
    writer.write_all(data)?;
    *offset += data.len();
    Ok(())
}

fn write_str<W: Write>(writer: &mut W, data: &str, offset: &mut usize) -> io::Result<()> {
    write_bytes(writer, data.as_bytes(), offset)
}

/// Encodes `input` as the body of a PDF literal string in WinAnsi (cp1252).
/// Characters outside the code page become `?`.
fn encode_winansi_pdf_string(input: &str) -> String {
    let mut out = String::new();
    for ch in input.chars() {
        // ASCII stand-ins for common symbols WinAnsi lacks.
        match ch {
            '\u{2265}' => {
                out.push_str(">=");
                continue;
            }
            '\u{2264}' => {
                out.push_str("<=");
                continue;
            }
            '\u{2192}' => {
                out.push_str("->");
                continue;
            }
            '\t' => {
                out.push(' ');
                continue;
            }
            _ => {}
        }

        let byte = match ch {
            '\u{0000}'..='\u{007F}' => ch as u8,
            '\u{00A0}'..='\u{00FF}' => ch as u8,
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{0192}' => 0x83,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2020}' => 0x86,
            '\u{2021}' => 0x87,
            '\u{02C6}' => 0x88,
            '\u{2030}' => 0x89,
            '\u{0160}' => 0x8A,
            '\u{2039}' => 0x8B,
            '\u{0152}' => 0x8C,
            '\u{017D}' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{02DC}' => 0x98,
            '\u{2122}' => 0x99,
            '\u{0161}' => 0x9A,
            '\u{203A}' => 0x9B,
            '\u{0153}' => 0x9C,
            '\u{017E}' => 0x9E,
            '\u{0178}' => 0x9F,
            _ => b'?',
        };

        match byte {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b if b < 0x20 || b >= 0x7f => out.push_str(&format!("\\{:03o}", b)),
            b => out.push(b as char),
        }
    }
    out
}

fn fmt(value: f32) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let fixed = I32F32::from_num(value);
    let scaled = (fixed * I32F32::from_num(1000)).round();
    let milli: i64 = scaled.to_num();
    format_milli(milli)
}

fn format_milli(milli: i64) -> String {
    if milli == 0 {
        return "0".to_string();
    }
    let sign = if milli < 0 { "-" } else { "" };
    let abs = milli.abs();
    let int_part = abs / 1000;
    let frac_part = abs % 1000;
    if frac_part == 0 {
        format!("{}{}", sign, int_part)
    } else {
        let mut s = format!("{}{}.{:03}", sign, int_part, frac_part);
        while s.ends_with('0') {
            s.pop();
        }
        s
    }
}

fn fmt_pt(value: Pt) -> String {
    format_milli(value.to_milli_i64())
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

fn color_to_pdf_fill(color: Color) -> String {
    format!(
        "{} {} {} rg\n",
        fmt(clamp_unit(color.r)),
        fmt(clamp_unit(color.g)),
        fmt(clamp_unit(color.b))
    )
}

fn color_to_pdf_stroke(color: Color) -> String {
    format!(
        "{} {} {} RG\n",
        fmt(clamp_unit(color.r)),
        fmt(clamp_unit(color.g)),
        fmt(clamp_unit(color.b))
    )
}
