use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};

#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    CodeSpan(String),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Link { children: Vec<Inline>, url: String },
    SoftBreak,
    HardBreak,
}

impl Inline {
    /// Plain text; soft breaks become spaces, hard breaks newlines.
    pub fn flatten(inlines: &[Inline]) -> String {
        let mut out = String::new();
        flatten_into(inlines, &mut out);
        out
    }
}

fn flatten_into(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(text) | Inline::CodeSpan(text) => out.push_str(text),
            Inline::Emphasis(children) | Inline::Strong(children) => flatten_into(children, out),
            Inline::Link { children, .. } => flatten_into(children, out),
            Inline::SoftBreak => out.push(' '),
            Inline::HardBreak => out.push('\n'),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub inline: Vec<Inline>,
    pub nested: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Heading {
        depth: u8,
        inline: Vec<Inline>,
    },
    Paragraph {
        inline: Vec<Inline>,
    },
    Code {
        text: String,
        language: Option<String>,
    },
    List {
        ordered: bool,
        start: u64,
        items: Vec<ListItem>,
    },
    Blockquote {
        inline: Vec<Inline>,
    },
    Space,
    Raw(String),
}

impl Token {
    pub fn kind(&self) -> &'static str {
        match self {
            Token::Heading { .. } => "heading",
            Token::Paragraph { .. } => "paragraph",
            Token::Code { .. } => "code",
            Token::List { .. } => "list",
            Token::Blockquote { .. } => "blockquote",
            Token::Space => "space",
            Token::Raw(_) => "raw",
        }
    }
}

pub trait MarkupLexer: Send + Sync {
    fn lex(&self, markup: &str) -> Vec<Token>;
}

/// CommonMark lexer backed by `pulldown-cmark`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommonMarkLexer;

impl MarkupLexer for CommonMarkLexer {
    fn lex(&self, markup: &str) -> Vec<Token> {
        if markup.trim().is_empty() {
            return Vec::new();
        }
        let events: Vec<Event<'_>> = Parser::new_ext(markup, Options::empty()).collect();
        parse_blocks(&events)
    }
}

fn matching_end(events: &[Event<'_>], start: usize) -> usize {
    let mut depth = 0usize;
    for (index, event) in events.iter().enumerate().skip(start) {
        match event {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return index;
                }
            }
            _ => {}
        }
    }
    events.len()
}

fn inner<'e, 'a>(events: &'e [Event<'a>], start: usize, end: usize) -> &'e [Event<'a>] {
    let from = (start + 1).min(events.len());
    let to = end.min(events.len()).max(from);
    &events[from..to]
}

fn parse_blocks(events: &[Event<'_>]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pending_inline: Vec<Inline> = Vec::new();
    let mut index = 0;
    while index < events.len() {
        let event = &events[index];
        let Event::Start(tag) = event else {
            match event {
                Event::Rule => {
                    flush_inline(&mut tokens, &mut pending_inline);
                    tokens.push(Token::Space);
                }
                Event::Html(html) => {
                    flush_inline(&mut tokens, &mut pending_inline);
                    tokens.push(Token::Raw(html.to_string()));
                }
                Event::End(_) => {}
                other => {
                    // Tight list items carry bare text with no paragraph wrapper.
                    if let Some(inline) = leaf_inline(other) {
                        pending_inline.push(inline);
                    }
                }
            }
            index += 1;
            continue;
        };
        let end = matching_end(events, index);
        let body = inner(events, index, end);
        match tag {
            Tag::Heading { level, .. } => {
                flush_inline(&mut tokens, &mut pending_inline);
                tokens.push(Token::Heading {
                    depth: *level as u8,
                    inline: parse_inlines(body),
                });
            }
            Tag::Paragraph => {
                flush_inline(&mut tokens, &mut pending_inline);
                tokens.push(Token::Paragraph {
                    inline: parse_inlines(body),
                });
            }
            Tag::CodeBlock(kind) => {
                flush_inline(&mut tokens, &mut pending_inline);
                tokens.push(code_token(kind, body));
            }
            Tag::List(start) => {
                flush_inline(&mut tokens, &mut pending_inline);
                tokens.push(list_token(*start, body));
            }
            Tag::BlockQuote(..) => {
                flush_inline(&mut tokens, &mut pending_inline);
                tokens.push(Token::Blockquote {
                    inline: quote_inlines(&parse_blocks(body)),
                });
            }
            Tag::HtmlBlock => {
                flush_inline(&mut tokens, &mut pending_inline);
                let html: String = body
                    .iter()
                    .filter_map(|event| match event {
                        Event::Html(text) | Event::Text(text) => Some(text.as_ref()),
                        _ => None,
                    })
                    .collect();
                tokens.push(Token::Raw(html.trim_end().to_string()));
            }
            Tag::Emphasis | Tag::Strong | Tag::Link { .. } | Tag::Image { .. } => {
                pending_inline.extend(parse_inlines(&events[index..=end.min(events.len() - 1)]));
            }
            _ => {
                flush_inline(&mut tokens, &mut pending_inline);
                tokens.extend(parse_blocks(body));
            }
        }
        index = end + 1;
    }
    flush_inline(&mut tokens, &mut pending_inline);
    tokens
}

fn flush_inline(tokens: &mut Vec<Token>, pending: &mut Vec<Inline>) {
    if pending.is_empty() {
        return;
    }
    tokens.push(Token::Paragraph {
        inline: std::mem::take(pending),
    });
}

fn leaf_inline(event: &Event<'_>) -> Option<Inline> {
    match event {
        Event::Text(text) => Some(Inline::Text(text.to_string())),
        Event::Code(code) => Some(Inline::CodeSpan(code.to_string())),
        Event::InlineHtml(html) => Some(Inline::Text(html.to_string())),
        Event::SoftBreak => Some(Inline::SoftBreak),
        Event::HardBreak => Some(Inline::HardBreak),
        _ => None,
    }
}

fn parse_inlines(events: &[Event<'_>]) -> Vec<Inline> {
    let mut out = Vec::new();
    let mut index = 0;
    while index < events.len() {
        let Event::Start(tag) = &events[index] else {
            if let Some(inline) = leaf_inline(&events[index]) {
                out.push(inline);
            }
            index += 1;
            continue;
        };
        let end = matching_end(events, index);
        let children = parse_inlines(inner(events, index, end));
        match tag {
            Tag::Emphasis => out.push(Inline::Emphasis(children)),
            Tag::Strong => out.push(Inline::Strong(children)),
            Tag::Link { dest_url, .. } => out.push(Inline::Link {
                children,
                url: dest_url.to_string(),
            }),
            _ => out.extend(children),
        }
        index = end + 1;
    }
    out
}

fn code_token(kind: &CodeBlockKind<'_>, body: &[Event<'_>]) -> Token {
    let mut text: String = body
        .iter()
        .filter_map(|event| match event {
            Event::Text(text) => Some(text.as_ref()),
            _ => None,
        })
        .collect();
    if text.ends_with('\n') {
        text.pop();
    }
    let language = match kind {
        CodeBlockKind::Fenced(info) => info
            .split_whitespace()
            .next()
            .map(|lang| lang.to_string()),
        CodeBlockKind::Indented => None,
    };
    Token::Code { text, language }
}

fn list_token(start: Option<u64>, body: &[Event<'_>]) -> Token {
    let mut items = Vec::new();
    let mut index = 0;
    while index < body.len() {
        if let Event::Start(Tag::Item) = &body[index] {
            let end = matching_end(body, index);
            items.push(list_item(inner(body, index, end)));
            index = end + 1;
        } else {
            index += 1;
        }
    }
    Token::List {
        ordered: start.is_some(),
        start: start.unwrap_or(1),
        items,
    }
}

fn list_item(body: &[Event<'_>]) -> ListItem {
    let mut inline = Vec::new();
    let mut nested = Vec::new();
    for token in parse_blocks(body) {
        match token {
            Token::Paragraph { inline: text } if nested.is_empty() => {
                if !inline.is_empty() {
                    inline.push(Inline::HardBreak);
                }
                inline.extend(text);
            }
            other => nested.push(other),
        }
    }
    ListItem { inline, nested }
}

fn quote_inlines(blocks: &[Token]) -> Vec<Inline> {
    let mut out = Vec::new();
    for block in blocks {
        let text = match block {
            Token::Heading { inline, .. }
            | Token::Paragraph { inline }
            | Token::Blockquote { inline } => inline.clone(),
            Token::Code { text, .. } | Token::Raw(text) => vec![Inline::Text(text.clone())],
            Token::List { items, .. } => items
                .iter()
                .flat_map(|item| {
                    let mut run = vec![Inline::Text("\u{2022} ".to_string())];
                    run.extend(item.inline.iter().cloned());
                    run.push(Inline::HardBreak);
                    run
                })
                .collect(),
            Token::Space => Vec::new(),
        };
        if text.is_empty() {
            continue;
        }
        if !out.is_empty() && !matches!(out.last(), Some(Inline::HardBreak)) {
            out.push(Inline::HardBreak);
        }
        out.extend(text);
    }
    while matches!(out.last(), Some(Inline::HardBreak)) {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lex(markup: &str) -> Vec<Token> {
        CommonMarkLexer.lex(markup)
    }

    #[test]
    fn empty_markup_has_no_tokens() {
        assert!(lex("").is_empty());
        assert!(lex("   \n\n").is_empty());
    }

    #[test]
    fn headings_and_paragraphs_flatten_inline_styling() {
        let tokens = lex("## Big *O* notation\n\nUse a **hash** map with `O(1)` lookups.");
        assert_eq!(tokens.len(), 2);
        match &tokens[0] {
            Token::Heading { depth, inline } => {
                assert_eq!(*depth, 2);
                assert_eq!(Inline::flatten(inline), "Big O notation");
            }
            other => panic!("expected heading, got {other:?}"),
        }
        match &tokens[1] {
            Token::Paragraph { inline } => {
                assert_eq!(
                    Inline::flatten(inline),
                    "Use a hash map with O(1) lookups."
                );
            }
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn soft_and_hard_breaks_flatten_to_space_and_newline() {
        let tokens = lex("one\ntwo  \nthree");
        let Token::Paragraph { inline } = &tokens[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(Inline::flatten(inline), "one two\nthree");
    }

    #[test]
    fn fenced_code_keeps_text_and_language() {
        let tokens = lex("```python extra\ndef f():\n    return 1\n```\n");
        assert_eq!(
            tokens,
            vec![Token::Code {
                text: "def f():\n    return 1".to_string(),
                language: Some("python".to_string()),
            }]
        );
    }

    #[test]
    fn indented_code_has_no_language() {
        let tokens = lex("    let x = 1;\n");
        assert_eq!(
            tokens,
            vec![Token::Code {
                text: "let x = 1;".to_string(),
                language: None,
            }]
        );
    }

    #[test]
    fn ordered_lists_keep_start_and_nested_blocks() {
        let tokens = lex("3. first\n4. second\n   - inner\n");
        let Token::List {
            ordered,
            start,
            items,
        } = &tokens[0]
        else {
            panic!("expected list, got {tokens:?}");
        };
        assert!(*ordered);
        assert_eq!(*start, 3);
        assert_eq!(items.len(), 2);
        assert_eq!(Inline::flatten(&items[0].inline), "first");
        assert_eq!(Inline::flatten(&items[1].inline), "second");
        assert!(matches!(
            items[1].nested.as_slice(),
            [Token::List { ordered: false, .. }]
        ));
    }

    #[test]
    fn blockquote_joins_paragraphs_with_hard_breaks() {
        let tokens = lex("> first line\n>\n> second *para*\n");
        let Token::Blockquote { inline } = &tokens[0] else {
            panic!("expected blockquote, got {tokens:?}");
        };
        assert_eq!(Inline::flatten(inline), "first line\nsecond para");
    }

    #[test]
    fn rules_become_space_tokens() {
        let kinds: Vec<&str> = lex("a\n\n---\n\nb").iter().map(Token::kind).collect();
        assert_eq!(kinds, vec!["paragraph", "space", "paragraph"]);
    }
}
