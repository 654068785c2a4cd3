//! Markup parsing seam and the reference inline markup parser.

use glyph_protocol::{ContentNode, ExtensionCall};
use regex::{Captures, Regex};
use std::sync::OnceLock;
use thiserror::Error;

/// Turns markup source into a content tree for a given output format.
///
/// The identity extension hands its argument to a parser of this kind, so
/// implementations must be shareable across concurrent resolutions.
pub trait MarkupParser: Send + Sync {
    fn parse(&self, source: &str, format: &str) -> Result<Vec<ContentNode>, MarkupError>;
}

/// Markup that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct MarkupError {
    pub message: String,
}

impl MarkupError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Reference parser for the lightweight markup used in documents.
///
/// Recognised syntax:
/// - inline calls `|name, arg, ...|`, with `\|` for a literal bar;
/// - block calls opened by `--- name, arg ---` and closed by a line of
///   dashes; the body becomes the first argument;
/// - `**bold**` and `//italic//` spans.
///
/// Text is escaped for the output format. Unterminated calls and spans are
/// kept as literal text.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineMarkup;

static BLOCK_OPEN_REGEX: OnceLock<Regex> = OnceLock::new();
static BLOCK_CLOSE_REGEX: OnceLock<Regex> = OnceLock::new();
static BOLD_REGEX: OnceLock<Regex> = OnceLock::new();
static ITALIC_REGEX: OnceLock<Regex> = OnceLock::new();

const BLOCK_OPEN_PATTERN: &str =
    r"^\s*-{3,}\s*(?P<name>[^\s,|\-][^\s,|]*?)\s*(?:,(?P<args>.*?))?\s*-{3,}\s*$";
const BLOCK_CLOSE_PATTERN: &str = r"^\s*-{3,}\s*$";
const BOLD_PATTERN: &str = r"\*\*([^\s*](?:[^*]*[^\s*])?)\*\*";
const ITALIC_PATTERN: &str = r"//([^\s/](?:[^/]*[^\s/])?)//";

fn block_open_regex() -> &'static Regex {
    BLOCK_OPEN_REGEX.get_or_init(|| Regex::new(BLOCK_OPEN_PATTERN).expect("invalid regex pattern"))
}

fn block_close_regex() -> &'static Regex {
    BLOCK_CLOSE_REGEX
        .get_or_init(|| Regex::new(BLOCK_CLOSE_PATTERN).expect("invalid regex pattern"))
}

fn bold_regex() -> &'static Regex {
    BOLD_REGEX.get_or_init(|| Regex::new(BOLD_PATTERN).expect("invalid regex pattern"))
}

fn italic_regex() -> &'static Regex {
    ITALIC_REGEX.get_or_init(|| Regex::new(ITALIC_PATTERN).expect("invalid regex pattern"))
}

impl MarkupParser for InlineMarkup {
    fn parse(&self, source: &str, format: &str) -> Result<Vec<ContentNode>, MarkupError> {
        let mut nodes = NodeBuffer::default();
        let lines: Vec<&str> = source.split_inclusive('\n').collect();
        let mut text_start = 0;
        let mut i = 0;

        while i < lines.len() {
            let Some(open) = block_open_regex().captures(lines[i].trim_end_matches(['\n', '\r']))
            else {
                i += 1;
                continue;
            };
            let Some(close) = (i + 1..lines.len())
                .find(|&j| block_close_regex().is_match(lines[j].trim_end_matches(['\n', '\r'])))
            else {
                // Unterminated: the opening line stays text.
                i += 1;
                continue;
            };

            parse_inline(&lines[text_start..i].concat(), format, &mut nodes);

            let body = lines[i + 1..close].concat();
            let body = body.strip_suffix('\n').unwrap_or(&body);
            let mut arguments = vec![ContentNode::text(body)];
            if let Some(args) = open.name("args") {
                arguments.extend(split_arguments(args.as_str()));
            }
            nodes.push_call(ExtensionCall {
                name: open["name"].to_string(),
                block: true,
                arguments,
            });

            i = close + 1;
            text_start = i;
        }

        parse_inline(&lines[text_start..].concat(), format, &mut nodes);
        Ok(nodes.finish())
    }
}

/// Accumulates nodes, merging adjacent text.
#[derive(Default)]
struct NodeBuffer {
    nodes: Vec<ContentNode>,
}

impl NodeBuffer {
    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(ContentNode::RawText(last)) = self.nodes.last_mut() {
            last.push_str(text);
        } else {
            self.nodes.push(ContentNode::text(text));
        }
    }

    fn push_call(&mut self, call: ExtensionCall) {
        self.nodes.push(ContentNode::ExtensionCall(call));
    }

    fn finish(self) -> Vec<ContentNode> {
        self.nodes
    }
}

fn parse_inline(source: &str, format: &str, nodes: &mut NodeBuffer) {
    let mut text = String::new();
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                chars.next();
                text.push('|');
            }
            '|' => {
                let mut content = String::new();
                let mut terminated = false;
                while let Some(c) = chars.next() {
                    match c {
                        '|' => {
                            terminated = true;
                            break;
                        }
                        '\\' if chars.peek() == Some(&'|') => {
                            chars.next();
                            content.push('|');
                        }
                        _ => content.push(c),
                    }
                }

                match inline_call(&content).filter(|_| terminated) {
                    Some(call) => {
                        nodes.push_text(&render_text(&text, format));
                        text.clear();
                        nodes.push_call(call);
                    }
                    None => {
                        text.push('|');
                        text.push_str(&content);
                        if terminated {
                            text.push('|');
                        }
                    }
                }
            }
            _ => text.push(c),
        }
    }

    nodes.push_text(&render_text(&text, format));
}

/// Builds an inline call from the text between two bars.
fn inline_call(content: &str) -> Option<ExtensionCall> {
    let (name, args) = match content.split_once(',') {
        Some((name, args)) => (name.trim(), Some(args)),
        None => (content.trim(), None),
    };
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    Some(ExtensionCall {
        name: name.to_string(),
        block: false,
        arguments: args.map(split_arguments).unwrap_or_default(),
    })
}

fn split_arguments(args: &str) -> Vec<ContentNode> {
    args.split(',')
        .map(|arg| ContentNode::text(arg.trim()))
        .collect()
}

/// Escapes text for `format` and renders bold and italic spans.
fn render_text(text: &str, format: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let escaped = escape_text(text, format);
    let (bold_open, bold_close, italic_open, italic_close) = match format {
        "html" => ("<b>", "</b>", "<i>", "</i>"),
        "latex" => ("\\textbf{", "}", "\\textit{", "}"),
        _ => ("", "", "", ""),
    };

    let bolded = bold_regex().replace_all(&escaped, |caps: &Captures| {
        format!("{}{}{}", bold_open, &caps[1], bold_close)
    });
    italic_regex()
        .replace_all(&bolded, |caps: &Captures| {
            format!("{}{}{}", italic_open, &caps[1], italic_close)
        })
        .into_owned()
}

/// Escapes characters that are significant in `format`.
///
/// Formats other than `html` and `latex` are returned unchanged.
pub fn escape_text(text: &str, format: &str) -> String {
    match format {
        "html" => {
            let mut out = String::with_capacity(text.len());
            for c in text.chars() {
                match c {
                    '&' => out.push_str("&amp;"),
                    '<' => out.push_str("&lt;"),
                    '>' => out.push_str("&gt;"),
                    '"' => out.push_str("&quot;"),
                    '\'' => out.push_str("&#39;"),
                    _ => out.push(c),
                }
            }
            out
        }
        "latex" => {
            let mut out = String::with_capacity(text.len());
            for c in text.chars() {
                match c {
                    '\\' => out.push_str("\\textbackslash{}"),
                    '~' => out.push_str("\\textasciitilde{}"),
                    '^' => out.push_str("\\textasciicircum{}"),
                    '{' | '}' | '$' | '&' | '%' | '#' | '_' => {
                        out.push('\\');
                        out.push(c);
                    }
                    _ => out.push(c),
                }
            }
            out
        }
        _ => text.to_string(),
    }
}
