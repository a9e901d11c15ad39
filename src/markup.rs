//! Markup renderer: markdown text in, a small display tree out.
//!
//! Answers, references and multi-line generated fields arrive as markdown.
//! [`render`] is a pure function; the terminal front end decides how each
//! block and span is painted.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpanStyle {
    pub strong: bool,
    pub emphasis: bool,
    pub code: bool,
    pub strikethrough: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: SpanStyle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupBlock {
    Heading { level: u8, spans: Vec<Span> },
    Paragraph(Vec<Span>),
    /// `marker` is `None` for continuation paragraphs of a loose item.
    ListItem {
        depth: usize,
        marker: Option<String>,
        spans: Vec<Span>,
    },
    Quote(Vec<Span>),
    Code { lang: Option<String>, text: String },
    Rule,
}

impl MarkupBlock {
    /// Concatenated text of the block, styles dropped.
    pub fn text(&self) -> String {
        match self {
            MarkupBlock::Heading { spans, .. }
            | MarkupBlock::Paragraph(spans)
            | MarkupBlock::ListItem { spans, .. }
            | MarkupBlock::Quote(spans) => spans.iter().map(|s| s.text.as_str()).collect(),
            MarkupBlock::Code { text, .. } => text.clone(),
            MarkupBlock::Rule => String::new(),
        }
    }
}

pub fn render(markup: &str) -> Vec<MarkupBlock> {
    // Tables stay off: pipe rows come through as plain text.
    let options = Options::ENABLE_STRIKETHROUGH;
    let mut builder = TreeBuilder::default();
    for event in Parser::new_ext(markup, options) {
        builder.event(event);
    }
    builder.finish()
}

#[derive(Default)]
struct TreeBuilder<'a> {
    blocks: Vec<MarkupBlock>,
    open: Vec<Tag<'a>>,
    spans: Vec<Span>,
    style: StyleDepth,
    // One counter per open list; `None` for bullet lists.
    lists: Vec<Option<u64>>,
    pending_marker: Option<String>,
    code: Option<(Option<String>, String)>,
}

#[derive(Default)]
struct StyleDepth {
    strong: usize,
    emphasis: usize,
    strikethrough: usize,
}

impl StyleDepth {
    fn current(&self) -> SpanStyle {
        SpanStyle {
            strong: self.strong > 0,
            emphasis: self.emphasis > 0,
            code: false,
            strikethrough: self.strikethrough > 0,
        }
    }
}

impl<'a> TreeBuilder<'a> {
    fn event(&mut self, event: Event<'a>) {
        match event {
            Event::Start(tag) => {
                self.open_tag(&tag);
                self.open.push(tag);
            }
            Event::End(_) => {
                // The closing tag stays open while its text is flushed.
                if let Some(tag) = self.open.last().cloned() {
                    self.close_tag(tag);
                    self.open.pop();
                }
            }
            Event::Text(text) => match self.code.as_mut() {
                Some((_, buf)) => buf.push_str(&text),
                None => self.push_text(&text, self.style.current()),
            },
            Event::Code(text) => {
                let style = SpanStyle {
                    code: true,
                    ..self.style.current()
                };
                self.push_text(&text, style);
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                self.push_text(&html, self.style.current())
            }
            Event::SoftBreak => self.push_text(" ", self.style.current()),
            Event::HardBreak => self.push_text("\n", self.style.current()),
            Event::Rule => {
                self.flush();
                self.blocks.push(MarkupBlock::Rule);
            }
            _ => {}
        }
    }

    fn open_tag(&mut self, tag: &Tag<'a>) {
        match tag {
            Tag::Heading { .. } | Tag::BlockQuote(..) => self.flush(),
            Tag::CodeBlock(kind) => {
                self.flush();
                let lang = match kind {
                    CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                    _ => None,
                };
                self.code = Some((lang, String::new()));
            }
            Tag::List(start) => {
                // Text of the enclosing item comes before the nested list.
                self.flush();
                self.lists.push(*start);
            }
            Tag::Item => {
                self.flush();
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{n}.");
                        *n += 1;
                        marker
                    }
                    _ => "•".to_string(),
                };
                self.pending_marker = Some(marker);
            }
            Tag::Strong => self.style.strong += 1,
            Tag::Emphasis => self.style.emphasis += 1,
            Tag::Strikethrough => self.style.strikethrough += 1,
            _ => {}
        }
    }

    fn close_tag(&mut self, tag: Tag<'a>) {
        match tag {
            Tag::Heading { level, .. } => {
                let spans = std::mem::take(&mut self.spans);
                if !spans.is_empty() {
                    self.blocks.push(MarkupBlock::Heading {
                        level: level as u8,
                        spans,
                    });
                }
            }
            Tag::Paragraph | Tag::Item | Tag::BlockQuote(..) => self.flush(),
            Tag::CodeBlock(_) => {
                if let Some((lang, text)) = self.code.take() {
                    self.blocks.push(MarkupBlock::Code {
                        lang,
                        text: text.trim_end_matches('\n').to_string(),
                    });
                }
            }
            Tag::List(_) => {
                self.flush();
                self.lists.pop();
            }
            Tag::Strong => self.style.strong = self.style.strong.saturating_sub(1),
            Tag::Emphasis => self.style.emphasis = self.style.emphasis.saturating_sub(1),
            Tag::Strikethrough => {
                self.style.strikethrough = self.style.strikethrough.saturating_sub(1)
            }
            _ => {}
        }
    }

    fn push_text(&mut self, text: &str, style: SpanStyle) {
        if let Some(last) = self.spans.last_mut() {
            if last.style == style {
                last.text.push_str(text);
                return;
            }
        }
        self.spans.push(Span {
            text: text.to_string(),
            style,
        });
    }

    fn in_item(&self) -> bool {
        self.open.iter().any(|t| matches!(t, Tag::Item))
    }

    fn in_quote(&self) -> bool {
        self.open.iter().any(|t| matches!(t, Tag::BlockQuote(..)))
    }

    fn flush(&mut self) {
        if self.spans.is_empty() {
            return;
        }
        let spans = std::mem::take(&mut self.spans);
        let block = if self.in_item() {
            MarkupBlock::ListItem {
                depth: self.lists.len().saturating_sub(1),
                marker: self.pending_marker.take(),
                spans,
            }
        } else if self.in_quote() {
            MarkupBlock::Quote(spans)
        } else {
            MarkupBlock::Paragraph(spans)
        };
        self.blocks.push(block);
    }

    fn finish(mut self) -> Vec<MarkupBlock> {
        self.flush();
        self.blocks
    }
}
