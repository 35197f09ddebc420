use crate::types::Pt;

pub const HELVETICA: &str = "Helvetica";
pub const HELVETICA_BOLD: &str = "Helvetica-Bold";
pub const HELVETICA_OBLIQUE: &str = "Helvetica-Oblique";
pub const COURIER: &str = "Courier";

const FALLBACK_ADVANCE: u16 = 556;
const COURIER_ADVANCE: u16 = 600;

// AFM advance widths (1/1000 em) for U+0020..=U+007E.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    333, 333, 584, 584, 584, 611, 975, // ':'..'@'
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    333, 278, 333, 584, 556, 333, // '['..'`'
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, // 'a'..'m'
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, // 'n'..'z'
    389, 280, 389, 584, // '{'..'~'
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WidthTable {
    Helvetica,
    HelveticaBold,
    Monospace,
}

fn width_table(name: &str) -> WidthTable {
    let lowered = name.trim().to_ascii_lowercase();
    if lowered.starts_with("courier") {
        WidthTable::Monospace
    } else if lowered.contains("bold") {
        WidthTable::HelveticaBold
    } else {
        WidthTable::Helvetica
    }
}

fn advance_for_char(table: WidthTable, ch: char) -> u16 {
    if table == WidthTable::Monospace {
        return COURIER_ADVANCE;
    }
    let code = ch as u32;
    if !(0x20..=0x7e).contains(&code) {
        return FALLBACK_ADVANCE;
    }
    let index = (code - 0x20) as usize;
    match table {
        WidthTable::Helvetica => HELVETICA_WIDTHS[index],
        WidthTable::HelveticaBold => HELVETICA_BOLD_WIDTHS[index],
        WidthTable::Monospace => COURIER_ADVANCE,
    }
}

pub fn is_base14_font(name: &str) -> bool {
    let n = name.trim().to_ascii_lowercase();
    matches!(
        n.as_str(),
        "courier"
            | "courier-bold"
            | "courier-oblique"
            | "courier-boldoblique"
            | "helvetica"
            | "helvetica-bold"
            | "helvetica-oblique"
            | "helvetica-boldoblique"
            | "times-roman"
            | "times-bold"
            | "times-italic"
            | "times-bolditalic"
            | "symbol"
            | "zapfdingbats"
    )
}

pub fn measure_text_width(name: &str, font_size: Pt, text: &str) -> Pt {
    let table = width_table(name);
    let units: i64 = text.chars().map(|ch| advance_for_char(table, ch) as i64).sum();
    let milli = (font_size.to_milli_i64() as i128 * units as i128 + 500) / 1000;
    Pt::from_milli_i64(milli as i64)
}

/// Greedy word wrap. Explicit newlines are kept as line breaks and words
/// wider than `max_width` are broken between characters.
pub fn wrap_text(text: &str, name: &str, font_size: Pt, max_width: Pt) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let max_width = max_width.max(Pt::from_f32(1.0));
    let space_width = measure_text_width(name, font_size, " ");
    let mut lines = Vec::new();
    for segment in text.split('\n') {
        if segment.trim().is_empty() {
            lines.push(String::new());
            continue;
        }
        let mut current = String::new();
        let mut current_width = Pt::ZERO;
        for word in segment.split_whitespace() {
            let word_width = measure_text_width(name, font_size, word);
            let joined = if current.is_empty() {
                word_width
            } else {
                current_width + space_width + word_width
            };
            if joined <= max_width {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
                current_width = joined;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = Pt::ZERO;
            }
            if word_width <= max_width {
                current.push_str(word);
                current_width = word_width;
                continue;
            }
            for ch in word.chars() {
                let w = measure_text_width(name, font_size, ch.encode_utf8(&mut [0u8; 4]));
                if !current.is_empty() && current_width + w > max_width {
                    lines.push(std::mem::take(&mut current));
                    current_width = Pt::ZERO;
                }
                current.push(ch);
                current_width += w;
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    lines
}
