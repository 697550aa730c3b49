//! Rich text body of an episode draft.
//!
//! The body is an ordered list of content blocks. Stages edit the blocks,
//! the scoring engine reads their plain text, and the remote store receives
//! them as sanitized markup. Markup coming back from the remote (or plain
//! text / light markdown from a generator) is parsed into blocks, dropping
//! anything outside the supported tag set.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::text::{collapse_whitespace, escape_markup, unescape_markup, word_count};

lazy_static! {
    static ref TOKEN_RE: Regex =
        Regex::new(r"(?s)<(/?)([a-zA-Z][a-zA-Z0-9]*)([^>]*)>").expect("valid markup token regex");
    static ref ATTR_RE: Regex = Regex::new(r#"([a-zA-Z-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("valid attribute regex");
    static ref ORDERED_RE: Regex = Regex::new(r"^\d+[.)]\s+").expect("valid ordered item regex");
}

/// A run of text sharing the same inline marks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Span {
    pub text: String,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    fn same_marks(&self, other: &Span) -> bool {
        self.bold == other.bold && self.italic == other.italic && self.link == other.link
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Heading { level: u8, spans: Vec<Span> },
    Paragraph { spans: Vec<Span> },
    Quote { spans: Vec<Span> },
    BulletList { items: Vec<Vec<Span>> },
    OrderedList { items: Vec<Vec<Span>> },
    Image { src: String, alt: String },
}

/// Block shapes a block can be converted between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Paragraph,
    Heading(u8),
    Quote,
    BulletList,
    OrderedList,
}

fn spans_text(spans: &[Span]) -> String {
    spans.iter().map(|s| s.text.as_str()).collect()
}

impl ContentBlock {
    pub fn paragraph(text: impl Into<String>) -> Self {
        ContentBlock::Paragraph {
            spans: vec![Span::plain(text)],
        }
    }

    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        ContentBlock::Heading {
            level: level.clamp(1, 3),
            spans: vec![Span::plain(text)],
        }
    }

    pub fn kind(&self) -> Option<BlockKind> {
        match self {
            ContentBlock::Heading { level, .. } => Some(BlockKind::Heading(*level)),
            ContentBlock::Paragraph { .. } => Some(BlockKind::Paragraph),
            ContentBlock::Quote { .. } => Some(BlockKind::Quote),
            ContentBlock::BulletList { .. } => Some(BlockKind::BulletList),
            ContentBlock::OrderedList { .. } => Some(BlockKind::OrderedList),
            ContentBlock::Image { .. } => None,
        }
    }

    /// Text content of the block. Images contribute nothing.
    pub fn plain_text(&self) -> String {
        match self {
            ContentBlock::Heading { spans, .. }
            | ContentBlock::Paragraph { spans }
            | ContentBlock::Quote { spans } => spans_text(spans),
            ContentBlock::BulletList { items } | ContentBlock::OrderedList { items } => items
                .iter()
                .map(|item| spans_text(item))
                .collect::<Vec<_>>()
                .join("\n"),
            ContentBlock::Image { .. } => String::new(),
        }
    }

    /// Mutable access to every span in the block.
    pub fn spans_mut(&mut self) -> Vec<&mut Span> {
        match self {
            ContentBlock::Heading { spans, .. }
            | ContentBlock::Paragraph { spans }
            | ContentBlock::Quote { spans } => spans.iter_mut().collect(),
            ContentBlock::BulletList { items } | ContentBlock::OrderedList { items } => {
                items.iter_mut().flat_map(|item| item.iter_mut()).collect()
            }
            ContentBlock::Image { .. } => Vec::new(),
        }
    }

    /// Re-shape the block, keeping its spans. List items are joined with
    /// spaces when collapsing into a single-run block.
    pub fn converted(&self, kind: BlockKind) -> ContentBlock {
        let items: Vec<Vec<Span>> = match self {
            ContentBlock::Heading { spans, .. }
            | ContentBlock::Paragraph { spans }
            | ContentBlock::Quote { spans } => vec![spans.clone()],
            ContentBlock::BulletList { items } | ContentBlock::OrderedList { items } => {
                items.clone()
            }
            ContentBlock::Image { .. } => return self.clone(),
        };

        let flatten = |items: Vec<Vec<Span>>| {
            let mut spans: Vec<Span> = Vec::new();
            for (idx, item) in items.into_iter().enumerate() {
                if idx > 0 {
                    push_span(&mut spans, Span::plain(" "));
                }
                for span in item {
                    push_span(&mut spans, span);
                }
            }
            spans
        };

        match kind {
            BlockKind::Paragraph => ContentBlock::Paragraph {
                spans: flatten(items),
            },
            BlockKind::Heading(level) => ContentBlock::Heading {
                level: level.clamp(1, 3),
                spans: flatten(items),
            },
            BlockKind::Quote => ContentBlock::Quote {
                spans: flatten(items),
            },
            BlockKind::BulletList => ContentBlock::BulletList { items },
            BlockKind::OrderedList => ContentBlock::OrderedList { items },
        }
    }

    fn render(&self, out: &mut String) {
        match self {
            ContentBlock::Heading { level, spans } => {
                let level = (*level).clamp(1, 3);
                out.push_str(&format!("<h{level}>"));
                render_spans(spans, out);
                out.push_str(&format!("</h{level}>"));
            }
            ContentBlock::Paragraph { spans } => {
                out.push_str("<p>");
                render_spans(spans, out);
                out.push_str("</p>");
            }
            ContentBlock::Quote { spans } => {
                out.push_str("<blockquote>");
                render_spans(spans, out);
                out.push_str("</blockquote>");
            }
            ContentBlock::BulletList { items } | ContentBlock::OrderedList { items } => {
                let tag = if matches!(self, ContentBlock::OrderedList { .. }) {
                    "ol"
                } else {
                    "ul"
                };
                out.push_str(&format!("<{tag}>"));
                for item in items {
                    out.push_str("<li>");
                    render_spans(item, out);
                    out.push_str("</li>");
                }
                out.push_str(&format!("</{tag}>"));
            }
            ContentBlock::Image { src, alt } => {
                if let Some(src) = safe_url(src) {
                    out.push_str(&format!(
                        "<img src=\"{}\" alt=\"{}\">",
                        escape_markup(src),
                        escape_markup(alt)
                    ));
                }
            }
        }
    }
}

/// Append a span, merging it into the previous one when the marks match.
fn push_span(spans: &mut Vec<Span>, span: Span) {
    if span.text.is_empty() {
        return;
    }
    if let Some(last) = spans.last_mut()
        && last.same_marks(&span)
    {
        last.text.push_str(&span.text);
        return;
    }
    spans.push(span);
}

fn render_spans(spans: &[Span], out: &mut String) {
    for span in spans {
        let mut inner = escape_markup(&span.text);
        if span.italic {
            inner = format!("<em>{inner}</em>");
        }
        if span.bold {
            inner = format!("<strong>{inner}</strong>");
        }
        if let Some(href) = span.link.as_deref().and_then(safe_url) {
            inner = format!("<a href=\"{}\">{inner}</a>", escape_markup(href));
        }
        out.push_str(&inner);
    }
}

/// Only web, mail and relative links survive sanitization.
pub fn safe_url(url: &str) -> Option<&str> {
    let trimmed = url.trim();
    let lower = trimmed.to_ascii_lowercase();
    let allowed = lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("mailto:")
        || (lower.starts_with('/') && !lower.starts_with("//"))
        || lower.starts_with('#');
    allowed.then_some(trimmed)
}

/// Ordered content blocks making up a draft body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RichDocument {
    pub blocks: Vec<ContentBlock>,
}

impl RichDocument {
    pub fn new(blocks: Vec<ContentBlock>) -> Self {
        Self { blocks }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Block texts separated by blank lines.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(ContentBlock::plain_text)
            .filter(|text| !text.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn word_count(&self) -> usize {
        word_count(&self.plain_text())
    }

    pub fn char_count(&self) -> usize {
        self.plain_text().chars().count()
    }

    /// Sanitized markup for the remote store.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            block.render(&mut out);
        }
        out
    }

    /// Parse remote content. Markup goes through the tag parser, anything
    /// else is read as plain text with light markdown conventions.
    pub fn from_markup(input: &str) -> Self {
        if TOKEN_RE.is_match(input) {
            MarkupParser::default().parse(input)
        } else {
            Self::from_plain_text(input)
        }
    }

    /// Clean up untrusted markup by parsing and re-rendering it.
    pub fn sanitize_markup(input: &str) -> String {
        Self::from_markup(input).to_markup()
    }

    /// Blank lines separate paragraphs; `#`, `>`, `-`/`*` and `1.` line
    /// prefixes become headings, quotes and list items.
    pub fn from_plain_text(text: &str) -> Self {
        let mut blocks: Vec<ContentBlock> = Vec::new();
        let mut paragraph: Vec<&str> = Vec::new();
        let mut list: Option<(bool, Vec<Vec<Span>>)> = None;
        let mut quote: Vec<&str> = Vec::new();

        fn flush_paragraph(lines: &mut Vec<&str>, blocks: &mut Vec<ContentBlock>) {
            if !lines.is_empty() {
                blocks.push(ContentBlock::paragraph(collapse_whitespace(&lines.join(" "))));
                lines.clear();
            }
        }
        fn flush_quote(lines: &mut Vec<&str>, blocks: &mut Vec<ContentBlock>) {
            if !lines.is_empty() {
                blocks.push(ContentBlock::Quote {
                    spans: vec![Span::plain(collapse_whitespace(&lines.join(" ")))],
                });
                lines.clear();
            }
        }
        fn flush_list(list: &mut Option<(bool, Vec<Vec<Span>>)>, blocks: &mut Vec<ContentBlock>) {
            if let Some((ordered, items)) = list.take() {
                blocks.push(if ordered {
                    ContentBlock::OrderedList { items }
                } else {
                    ContentBlock::BulletList { items }
                });
            }
        }

        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                flush_paragraph(&mut paragraph, &mut blocks);
                flush_quote(&mut quote, &mut blocks);
                flush_list(&mut list, &mut blocks);
                continue;
            }

            let hashes = trimmed.chars().take_while(|c| *c == '#').count();
            if (1..=6).contains(&hashes) && trimmed[hashes..].starts_with(' ') {
                flush_paragraph(&mut paragraph, &mut blocks);
                flush_quote(&mut quote, &mut blocks);
                flush_list(&mut list, &mut blocks);
                blocks.push(ContentBlock::heading(
                    hashes as u8,
                    collapse_whitespace(&trimmed[hashes..]),
                ));
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix('>') {
                flush_paragraph(&mut paragraph, &mut blocks);
                flush_list(&mut list, &mut blocks);
                quote.push(rest.trim());
                continue;
            }

            let bullet = ["- ", "* ", "• "]
                .iter()
                .find_map(|prefix| trimmed.strip_prefix(prefix));
            let ordered = ORDERED_RE
                .find(trimmed)
                .map(|m| &trimmed[m.end()..]);
            if let Some((is_ordered, rest)) = bullet
                .map(|rest| (false, rest))
                .or_else(|| ordered.map(|rest| (true, rest)))
            {
                flush_paragraph(&mut paragraph, &mut blocks);
                flush_quote(&mut quote, &mut blocks);
                if list.as_ref().is_some_and(|(o, _)| *o != is_ordered) {
                    flush_list(&mut list, &mut blocks);
                }
                let (_, items) = list.get_or_insert_with(|| (is_ordered, Vec::new()));
                items.push(vec![Span::plain(collapse_whitespace(rest))]);
                continue;
            }

            flush_quote(&mut quote, &mut blocks);
            flush_list(&mut list, &mut blocks);
            paragraph.push(trimmed);
        }

        flush_paragraph(&mut paragraph, &mut blocks);
        flush_quote(&mut quote, &mut blocks);
        flush_list(&mut list, &mut blocks);

        Self { blocks }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenBlock {
    Paragraph,
    Heading(u8),
    Quote,
}

#[derive(Default)]
struct ListBuilder {
    ordered: bool,
    items: Vec<Vec<Span>>,
    item: Option<Vec<Span>>,
}

#[derive(Default)]
struct MarkupParser {
    blocks: Vec<ContentBlock>,
    block: Option<(OpenBlock, Vec<Span>)>,
    list: Option<ListBuilder>,
    bold: u32,
    italic: u32,
    link: Option<String>,
    skip: u32,
}

fn trim_spans(mut spans: Vec<Span>) -> Vec<Span> {
    if let Some(first) = spans.first_mut() {
        first.text = first.text.trim_start().to_string();
    }
    if let Some(last) = spans.last_mut() {
        last.text = last.text.trim_end().to_string();
    }
    spans.retain(|s| !s.text.is_empty());
    spans
}

fn attr(attrs: &str, name: &str) -> Option<String> {
    ATTR_RE.captures_iter(attrs).find_map(|caps| {
        let key = caps.get(1)?.as_str();
        if !key.eq_ignore_ascii_case(name) {
            return None;
        }
        caps.get(2)
            .or_else(|| caps.get(3))
            .map(|v| unescape_markup(v.as_str()))
    })
}

impl MarkupParser {
    fn parse(mut self, input: &str) -> RichDocument {
        let mut cursor = 0;
        for caps in TOKEN_RE.captures_iter(input) {
            let Some(whole) = caps.get(0) else { continue };
            self.text(&input[cursor..whole.start()]);
            cursor = whole.end();

            let closing = !caps[1].is_empty();
            let name = caps[2].to_ascii_lowercase();
            let attrs = caps.get(3).map(|m| m.as_str()).unwrap_or_default();
            self.tag(&name, closing, attrs);
        }
        self.text(&input[cursor..]);
        self.flush_block();
        self.flush_list();
        RichDocument {
            blocks: self.blocks,
        }
    }

    fn tag(&mut self, name: &str, closing: bool, attrs: &str) {
        if matches!(name, "script" | "style" | "iframe" | "object" | "embed") {
            if closing {
                self.skip = self.skip.saturating_sub(1);
            } else {
                self.skip += 1;
            }
            return;
        }
        if self.skip > 0 {
            return;
        }

        match (name, closing) {
            ("p" | "div", false) => self.open_block(OpenBlock::Paragraph),
            ("blockquote", false) => self.open_block(OpenBlock::Quote),
            ("h1" | "h2" | "h3" | "h4" | "h5" | "h6", false) => {
                let level = name[1..].parse::<u8>().unwrap_or(1).clamp(1, 3);
                self.open_block(OpenBlock::Heading(level));
            }
            ("p" | "div" | "blockquote" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6", true) => {
                self.flush_block()
            }
            ("ul" | "ol", false) => {
                self.flush_block();
                self.flush_list();
                self.list = Some(ListBuilder {
                    ordered: name == "ol",
                    ..Default::default()
                });
            }
            ("ul" | "ol", true) => self.flush_list(),
            ("li", false) => {
                let list = self.list.get_or_insert_with(ListBuilder::default);
                if let Some(item) = list.item.take() {
                    let item = trim_spans(item);
                    if !item.is_empty() {
                        list.items.push(item);
                    }
                }
                list.item = Some(Vec::new());
            }
            ("li", true) => {
                if let Some(list) = self.list.as_mut()
                    && let Some(item) = list.item.take()
                {
                    let item = trim_spans(item);
                    if !item.is_empty() {
                        list.items.push(item);
                    }
                }
            }
            ("strong" | "b", false) => self.bold += 1,
            ("strong" | "b", true) => self.bold = self.bold.saturating_sub(1),
            ("em" | "i", false) => self.italic += 1,
            ("em" | "i", true) => self.italic = self.italic.saturating_sub(1),
            ("a", false) => {
                self.link = attr(attrs, "href")
                    .as_deref()
                    .and_then(safe_url)
                    .map(str::to_string);
            }
            ("a", true) => self.link = None,
            ("br", _) => self.text(" "),
            ("img", false) => {
                if let Some(src) = attr(attrs, "src").as_deref().and_then(safe_url) {
                    self.flush_block();
                    self.flush_list();
                    self.blocks.push(ContentBlock::Image {
                        src: src.to_string(),
                        alt: attr(attrs, "alt").unwrap_or_default(),
                    });
                }
            }
            _ => {}
        }
    }

    fn open_block(&mut self, kind: OpenBlock) {
        self.flush_block();
        if self.list.as_ref().is_some_and(|l| l.item.is_none()) {
            self.flush_list();
        }
        if self.list.is_none() {
            self.block = Some((kind, Vec::new()));
        }
    }

    fn text(&mut self, raw: &str) {
        if self.skip > 0 || raw.is_empty() {
            return;
        }
        let decoded = unescape_markup(raw);
        let has_text = !decoded.trim().is_empty();
        let mut collapsed = collapse_whitespace(&decoded);
        if !has_text {
            collapsed = " ".to_string();
        } else {
            if decoded.starts_with(char::is_whitespace) {
                collapsed.insert(0, ' ');
            }
            if decoded.ends_with(char::is_whitespace) {
                collapsed.push(' ');
            }
        }

        let span = Span {
            text: collapsed,
            bold: self.bold > 0,
            italic: self.italic > 0,
            link: self.link.clone(),
        };

        if let Some(list) = self.list.as_mut() {
            match list.item.as_mut() {
                Some(item) => push_span(item, span),
                None if has_text => list.item = Some(vec![span]),
                None => {}
            }
            return;
        }

        match self.block.as_mut() {
            Some((_, spans)) => push_span(spans, span),
            None if has_text => self.block = Some((OpenBlock::Paragraph, vec![span])),
            None => {}
        }
    }

    fn flush_block(&mut self) {
        if let Some((kind, spans)) = self.block.take() {
            let spans = trim_spans(spans);
            if spans.is_empty() {
                return;
            }
            self.blocks.push(match kind {
                OpenBlock::Paragraph => ContentBlock::Paragraph { spans },
                OpenBlock::Heading(level) => ContentBlock::Heading { level, spans },
                OpenBlock::Quote => ContentBlock::Quote { spans },
            });
        }
    }

    fn flush_list(&mut self) {
        if let Some(mut list) = self.list.take() {
            if let Some(item) = list.item.take() {
                let item = trim_spans(item);
                if !item.is_empty() {
                    list.items.push(item);
                }
            }
            if list.items.is_empty() {
                return;
            }
            self.blocks.push(if list.ordered {
                ContentBlock::OrderedList { items: list.items }
            } else {
                ContentBlock::BulletList { items: list.items }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markup_round_trip_preserves_marks() {
        let doc = RichDocument::new(vec![
            ContentBlock::heading(2, "Key Takeaways"),
            ContentBlock::Paragraph {
                spans: vec![
                    Span::plain("Listen to "),
                    Span {
                        text: "the episode".into(),
                        bold: true,
                        italic: false,
                        link: Some("https://example.com/ep".into()),
                    },
                    Span::plain(" today."),
                ],
            },
            ContentBlock::BulletList {
                items: vec![vec![Span::plain("one")], vec![Span::plain("two")]],
            },
        ]);

        let parsed = RichDocument::from_markup(&doc.to_markup());
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_sanitize_drops_scripts_and_unsafe_links() {
        let dirty = r#"<p>Hi <script>alert(1)</script><a href="javascript:evil()">there</a></p><img src="javascript:x">"#;
        let clean = RichDocument::sanitize_markup(dirty);
        assert_eq!(clean, "<p>Hi there</p>");
    }

    #[test]
    fn test_plain_text_with_markdown_prefixes() {
        let doc = RichDocument::from_plain_text(
            "# My Show\n\nIn this episode we talk.\nA lot.\n\n## Key Takeaways\n- first\n- second\n\n> quoted line",
        );
        assert_eq!(doc.blocks.len(), 5);
        assert_eq!(doc.blocks[0], ContentBlock::heading(1, "My Show"));
        assert_eq!(doc.blocks[1].plain_text(), "In this episode we talk. A lot.");
        assert!(matches!(doc.blocks[3], ContentBlock::BulletList { ref items } if items.len() == 2));
        assert!(matches!(doc.blocks[4], ContentBlock::Quote { .. }));
    }

    #[test]
    fn test_word_count_ignores_markup() {
        let doc = RichDocument::from_markup("<p>one <em>two</em></p><ul><li>three</li></ul>");
        assert_eq!(doc.word_count(), 3);
    }

    #[test]
    fn test_converted_list_to_paragraph_joins_items() {
        let block = ContentBlock::BulletList {
            items: vec![vec![Span::plain("a")], vec![Span::plain("b")]],
        };
        assert_eq!(
            block.converted(BlockKind::Paragraph).plain_text(),
            "a b".to_string()
        );
        let back = ContentBlock::paragraph("solo").converted(BlockKind::OrderedList);
        assert_eq!(
            back,
            ContentBlock::OrderedList {
                items: vec![vec![Span::plain("solo")]]
            }
        );
    }
}
