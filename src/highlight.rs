#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorTag {
    Keyword,
    String,
    Comment,
    Number,
    Function,
    Operator,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColoredSpan {
    pub text: String,
    pub tag: ColorTag,
}

impl ColoredSpan {
    fn new(text: &str, tag: ColorTag) -> Self {
        Self {
            text: text.to_string(),
            tag,
        }
    }
}

// Sorted for binary search.
const KEYWORDS: &[&str] = &[
    "False", "None", "SELECT", "True", "abstract", "and", "as", "async", "await", "boolean",
    "break", "byte", "case", "catch", "chan", "char", "class", "const", "continue", "crate",
    "def", "default", "defer", "del", "delete", "do", "double", "dyn", "elif", "else", "enum",
    "except", "export", "extends", "extern", "false", "final", "finally", "float", "fn", "for",
    "from", "func", "function", "go", "goto", "if", "impl", "implements", "import", "in",
    "instanceof", "int", "interface", "is", "lambda", "let", "long", "loop", "map", "match",
    "mod", "move", "mut", "namespace", "new", "nil", "nonlocal", "not", "null", "or", "package",
    "pass", "private", "protected", "pub", "public", "raise", "range", "ref", "return", "select",
    "self", "short", "static", "struct", "super", "switch", "this", "throw", "throws", "trait",
    "true", "try", "type", "typeof", "undefined", "unsafe", "use", "var", "void", "where",
    "while", "with", "yield",
];

const OPERATOR_CHARS: &str = "+-*/%=<>!&|^~?:";

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.binary_search(&word).is_ok()
}

/// Nothing is carried across lines.
pub fn tokenize_line(line: &str) -> Vec<ColoredSpan> {
    let mut spans: Vec<ColoredSpan> = Vec::new();
    let mut pos = 0;
    while pos < line.len() {
        let rest = &line[pos..];
        let (len, tag) = if let Some(len) = comment_len(rest) {
            (len, ColorTag::Comment)
        } else if let Some(len) = string_len(rest) {
            (len, ColorTag::String)
        } else if let Some(len) = number_len(rest) {
            (len, ColorTag::Number)
        } else if let Some(len) = word_len(rest) {
            let word = &rest[..len];
            let tag = if is_keyword(word) {
                ColorTag::Keyword
            } else if rest[len..].starts_with('(') {
                ColorTag::Function
            } else {
                ColorTag::Default
            };
            (len, tag)
        } else if let Some(len) = operator_len(rest) {
            (len, ColorTag::Operator)
        } else {
            let len = rest.chars().next().map(char::len_utf8).unwrap_or(1);
            (len, ColorTag::Default)
        };
        push_span(&mut spans, &rest[..len], tag);
        pos += len;
    }
    spans
}

fn push_span(spans: &mut Vec<ColoredSpan>, text: &str, tag: ColorTag) {
    if tag == ColorTag::Default {
        if let Some(last) = spans.last_mut() {
            if last.tag == ColorTag::Default {
                last.text.push_str(text);
                return;
            }
        }
    }
    spans.push(ColoredSpan::new(text, tag));
}

fn comment_len(rest: &str) -> Option<usize> {
    if rest.starts_with("//") || rest.starts_with('#') {
        return Some(rest.len());
    }
    if rest.starts_with("--") {
        let after = &rest[2..];
        if after.is_empty() || after.starts_with(' ') {
            return Some(rest.len());
        }
    }
    if let Some(body) = rest.strip_prefix("/*") {
        return Some(match body.find("*/") {
            Some(close) => 2 + close + 2,
            None => rest.len(),
        });
    }
    None
}

fn string_len(rest: &str) -> Option<usize> {
    let mut chars = rest.char_indices();
    let (_, quote) = chars.next()?;
    if !matches!(quote, '"' | '\'' | '`') {
        return None;
    }
    let mut escaped = false;
    for (idx, ch) in chars {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == quote {
            return Some(idx + ch.len_utf8());
        }
    }
    Some(rest.len())
}

fn number_len(rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    if !bytes.first()?.is_ascii_digit() {
        return None;
    }
    if bytes.len() > 2 && bytes[0] == b'0' && matches!(bytes[1], b'x' | b'X') {
        let hex = bytes[2..]
            .iter()
            .take_while(|b| b.is_ascii_hexdigit() || **b == b'_')
            .count();
        if hex > 0 {
            return Some(2 + hex);
        }
    }
    let digits = |from: usize| {
        bytes[from..]
            .iter()
            .take_while(|b| b.is_ascii_digit() || **b == b'_')
            .count()
    };
    let mut len = digits(0);
    if bytes.get(len) == Some(&b'.') && bytes.get(len + 1).is_some_and(u8::is_ascii_digit) {
        len += 1 + digits(len + 1);
    }
    if matches!(bytes.get(len), Some(b'e' | b'E')) {
        let mut exp = len + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        if bytes.get(exp).is_some_and(u8::is_ascii_digit) {
            len = exp + digits(exp);
        }
    }
    Some(len)
}

fn is_word_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '$'
}

fn word_len(rest: &str) -> Option<usize> {
    let first = rest.chars().next()?;
    if !is_word_start(first) {
        return None;
    }
    Some(
        rest.char_indices()
            .find(|(_, ch)| !(is_word_start(*ch) || ch.is_ascii_digit()))
            .map(|(idx, _)| idx)
            .unwrap_or(rest.len()),
    )
}

fn operator_len(rest: &str) -> Option<usize> {
    let mut len = 0;
    for ch in rest.chars() {
        if !OPERATOR_CHARS.contains(ch) {
            break;
        }
        if len > 0 && comment_len(&rest[len..]).is_some() {
            break;
        }
        len += ch.len_utf8();
    }
    (len > 0).then_some(len)
}
