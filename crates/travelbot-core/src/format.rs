//! Response formatting
//!
//! Turns the raw text returned by the completion endpoint into a small typed
//! node tree (headings, bullet lists, ordered lists, paragraphs) that front-ends
//! can render without re-parsing anything.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A heading line must be shorter than this many characters (colon included).
pub const HEADING_MAX_CHARS: usize = 50;

/// One structural element of a formatted response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    /// A short line ending in a colon, owning the rest of its block.
    Heading { title: String, body: Vec<Node> },
    BulletList(Vec<String>),
    OrderedList(Vec<OrderedItem>),
    Paragraph(String),
}

/// An ordered list entry. `number` is the token as written, never renumbered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedItem {
    pub number: String,
    pub text: String,
}

/// A formatted assistant response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedText {
    nodes: Vec<Node>,
}

impl FormattedText {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Render back to plain text. Formatting the result yields the same nodes.
    pub fn to_plain_text(&self) -> String {
        self.nodes
            .iter()
            .map(|node| render_node(node).join("\n"))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl fmt::Display for FormattedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_plain_text())
    }
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"))
}

/// `•` may touch its text; `-` needs a space so "-5 degrees" stays plain.
fn bullet_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(?:•\s*|-\s+)(\S.*)$").expect("bullet pattern is valid"))
}

fn ordered_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d+)\.\s+(\S.*)$").expect("ordered pattern is valid"))
}

/// Remove `<...>` markup and surrounding whitespace.
pub fn strip_markup(raw: &str) -> String {
    tag_pattern().replace_all(raw, "").trim().to_string()
}

/// Format raw assistant text into structured nodes.
pub fn format(raw: &str) -> FormattedText {
    let text = strip_markup(raw);

    let mut nodes = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            if !block.is_empty() {
                nodes.extend(parse_lines(&block));
                block.clear();
            }
        } else {
            block.push(line);
        }
    }
    if !block.is_empty() {
        nodes.extend(parse_lines(&block));
    }

    FormattedText { nodes }
}

enum LineKind<'a> {
    Bullet(&'a str),
    Ordered(&'a str, &'a str),
    Plain(&'a str),
}

fn classify(line: &str) -> LineKind<'_> {
    if let Some(caps) = bullet_pattern().captures(line) {
        if let Some(text) = caps.get(1) {
            return LineKind::Bullet(text.as_str().trim_end());
        }
    }
    if let Some(caps) = ordered_pattern().captures(line) {
        if let (Some(number), Some(text)) = (caps.get(1), caps.get(2)) {
            return LineKind::Ordered(number.as_str(), text.as_str().trim_end());
        }
    }
    LineKind::Plain(line)
}

fn heading_title(line: &str) -> Option<&str> {
    if line.chars().count() >= HEADING_MAX_CHARS {
        return None;
    }
    let title = line.strip_suffix(':')?.trim_end();
    (!title.is_empty()).then_some(title)
}

/// Parse the lines of one block. A heading consumes every line after it.
fn parse_lines(lines: &[&str]) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        match classify(lines[i]) {
            LineKind::Bullet(_) => {
                let mut items = Vec::new();
                while let Some(LineKind::Bullet(text)) = lines.get(i).map(|l| classify(l)) {
                    items.push(text.to_string());
                    i += 1;
                }
                nodes.push(Node::BulletList(items));
            }
            LineKind::Ordered(_, _) => {
                let mut items = Vec::new();
                while let Some(LineKind::Ordered(number, text)) = lines.get(i).map(|l| classify(l)) {
                    items.push(OrderedItem {
                        number: number.to_string(),
                        text: text.to_string(),
                    });
                    i += 1;
                }
                nodes.push(Node::OrderedList(items));
            }
            LineKind::Plain(line) => {
                if let Some(title) = heading_title(line) {
                    nodes.push(Node::Heading {
                        title: title.to_string(),
                        body: parse_lines(&lines[i + 1..]),
                    });
                    break;
                }
                let mut paragraph = Vec::new();
                while let Some(LineKind::Plain(text)) = lines.get(i).map(|l| classify(l)) {
                    paragraph.push(text);
                    i += 1;
                }
                nodes.push(Node::Paragraph(paragraph.join("\n")));
            }
        }
    }

    nodes
}

fn render_node(node: &Node) -> Vec<String> {
    match node {
        Node::Heading { title, body } => {
            let mut lines = vec![format!("{}:", title)];
            lines.extend(body.iter().flat_map(render_node));
            lines
        }
        Node::BulletList(items) => items.iter().map(|item| format!("- {}", item)).collect(),
        Node::OrderedList(items) => items
            .iter()
            .map(|item| format!("{}. {}", item.number, item.text))
            .collect(),
        Node::Paragraph(text) => vec![text.clone()],
    }
}
