//! Structure detection for advisor responses
//!
//! Models answer in loose markdown. This turns the text into blocks the
//! clients can render: headings, bullet and numbered lists, and paragraphs,
//! with `**bold**` runs split out of the surrounding text.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Inline run of text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "text", rename_all = "snake_case")]
pub enum Span {
    Text(String),
    Bold(String),
}

impl Span {
    pub fn as_str(&self) -> &str {
        match self {
            Span::Text(s) | Span::Bold(s) => s,
        }
    }
}

/// Direction a bullet point talks about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
}

/// Entry in a list block
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ListItem {
    Bullet { spans: Vec<Span>, trend: Trend },
    NumberedItem { number: u32, spans: Vec<Span> },
}

impl ListItem {
    pub fn spans(&self) -> &[Span] {
        match self {
            ListItem::Bullet { spans, .. } | ListItem::NumberedItem { spans, .. } => spans,
        }
    }
}

/// Top-level piece of a response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading { level: usize, text: String },
    List { ordered: bool, items: Vec<ListItem> },
    Paragraph { spans: Vec<Span> },
}

fn numbered_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)\.\s*(.*)$").expect("valid regex"))
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(#+)\s*(.*)$").expect("valid regex"))
}

/// Parse model output into blocks
pub fn parse_structured(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut list: Option<(bool, Vec<ListItem>)> = None;

    for line in text.lines() {
        let line = line.trim();

        if line.is_empty() {
            flush_list(&mut list, &mut blocks);
            continue;
        }

        if let Some(caps) = heading_re().captures(line) {
            flush_list(&mut list, &mut blocks);
            let text = parse_spans(&caps[2])
                .iter()
                .map(Span::as_str)
                .collect::<String>();
            blocks.push(Block::Heading {
                level: caps[1].len(),
                text,
            });
            continue;
        }

        let (ordered, item) = if let Some(rest) = bullet_body(line) {
            let lowered = rest.to_lowercase();
            let trend = if lowered.contains("increase") || lowered.contains("high") {
                Trend::Up
            } else {
                Trend::Down
            };
            (
                false,
                ListItem::Bullet {
                    spans: parse_spans(rest),
                    trend,
                },
            )
        } else if let Some(caps) = numbered_re().captures(line) {
            let Ok(number) = caps[1].parse::<u32>() else {
                flush_list(&mut list, &mut blocks);
                blocks.push(Block::Paragraph {
                    spans: parse_spans(line),
                });
                continue;
            };
            (
                true,
                ListItem::NumberedItem {
                    number,
                    spans: parse_spans(&caps[2]),
                },
            )
        } else {
            flush_list(&mut list, &mut blocks);
            blocks.push(Block::Paragraph {
                spans: parse_spans(line),
            });
            continue;
        };

        match &mut list {
            Some((list_ordered, items)) if *list_ordered == ordered => items.push(item),
            _ => {
                flush_list(&mut list, &mut blocks);
                list = Some((ordered, vec![item]));
            }
        }
    }

    flush_list(&mut list, &mut blocks);
    blocks
}

fn flush_list(list: &mut Option<(bool, Vec<ListItem>)>, blocks: &mut Vec<Block>) {
    if let Some((ordered, items)) = list.take() {
        blocks.push(Block::List { ordered, items });
    }
}

/// Text after a `*` or `-` marker that is followed by whitespace
fn bullet_body(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('*').or_else(|| line.strip_prefix('-'))?;
    if rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}

/// Split `**bold**` runs out of a line
///
/// An opening `**` without a closing one is kept as literal text.
pub fn parse_spans(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut plain = String::new();
    let mut rest = text;

    while let Some(open) = rest.find("**") {
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("**") else {
            break;
        };

        plain.push_str(&rest[..open]);
        let bold = &after_open[..close];
        if !bold.is_empty() {
            if !plain.is_empty() {
                spans.push(Span::Text(std::mem::take(&mut plain)));
            }
            spans.push(Span::Bold(bold.to_string()));
        }
        rest = &after_open[close + 2..];
    }

    plain.push_str(rest);
    if !plain.is_empty() {
        spans.push(Span::Text(plain));
    }
    spans
}

fn spans_text(spans: &[Span]) -> String {
    spans.iter().map(Span::as_str).collect()
}

/// Render blocks back to readable text for terminals
pub fn plain_text(blocks: &[Block]) -> String {
    let mut out: Vec<String> = Vec::with_capacity(blocks.len());

    for block in blocks {
        match block {
            Block::Heading { text, .. } => out.push(text.clone()),
            Block::Paragraph { spans } => out.push(spans_text(spans)),
            Block::List { items, .. } => {
                let lines: Vec<String> = items
                    .iter()
                    .map(|item| match item {
                        ListItem::Bullet { spans, .. } => format!("  - {}", spans_text(spans)),
                        ListItem::NumberedItem { number, spans } => {
                            format!("  {}. {}", number, spans_text(spans))
                        }
                    })
                    .collect();
                out.push(lines.join("\n"));
            }
        }
    }

    out.join("\n\n")
}
