//! Turns chapter markup into a fixed-width [`CellBuffer`].
//!
//! Block elements become paragraphs separated by a blank row. Inline
//! emphasis becomes a text modifier, and text is greedily wrapped at the
//! column width. Preformatted blocks keep their lines, widening the buffer
//! when needed so the pager can pan across them.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use ratatui::style::Modifier;
use textwrap::core::Fragment;
use textwrap::wrap_algorithms::wrap_first_fit;
use unicode_width::UnicodeWidthChar;

use crate::cell_buffer::{Cell, CellBuffer};
use crate::document::ManifestItem;

pub const DEFAULT_WIDTH: usize = 80;

const BULLET: &str = "• ";
const NBSP: char = '\u{a0}';

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("malformed markup: {0}")]
    MalformedMarkup(String),
}

/// Produces the cell grid for one chapter.
pub trait Layout {
    fn layout(&self, markup: &[u8], manifest: &[ManifestItem]) -> Result<CellBuffer, LayoutError>;
}

#[derive(Debug, Clone)]
pub struct HtmlLayout {
    width: usize,
}

impl Default for HtmlLayout {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH)
    }
}

impl HtmlLayout {
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(BULLET.chars().count() + 1),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }
}

impl Layout for HtmlLayout {
    fn layout(&self, markup: &[u8], manifest: &[ManifestItem]) -> Result<CellBuffer, LayoutError> {
        let text = std::str::from_utf8(markup)
            .map_err(|e| LayoutError::MalformedMarkup(e.to_string()))?;
        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut text.as_bytes())
            .map_err(|e| LayoutError::MalformedMarkup(e.to_string()))?;

        let mut collector = Collector::new(manifest);
        collector.visit(&dom.document);
        collector.flush();
        Ok(render_blocks(&collector.blocks, self.width))
    }
}

#[derive(Debug, Clone, PartialEq)]
struct StyledWord {
    chars: Vec<(char, Modifier)>,
    /// Followed by a space when another word comes after it on the same row.
    spaced: bool,
}

impl StyledWord {
    fn plain(text: &str, modifier: Modifier) -> Self {
        Self {
            chars: text.chars().map(|ch| (ch, modifier)).collect(),
            spaced: true,
        }
    }

    fn split_to_width(self, width: usize) -> Vec<StyledWord> {
        if self.width() as usize <= width {
            return vec![self];
        }
        let mut pieces = Vec::new();
        let mut current = Vec::new();
        let mut current_width = 0;
        for (ch, modifier) in self.chars {
            let w = ch.width().unwrap_or(0);
            if current_width + w > width && !current.is_empty() {
                pieces.push(StyledWord {
                    chars: std::mem::take(&mut current),
                    spaced: false,
                });
                current_width = 0;
            }
            current.push((ch, modifier));
            current_width += w;
        }
        pieces.push(StyledWord {
            chars: current,
            spaced: self.spaced,
        });
        pieces
    }
}

impl Fragment for StyledWord {
    fn width(&self) -> f64 {
        self.chars
            .iter()
            .map(|(ch, _)| ch.width().unwrap_or(0))
            .sum::<usize>() as f64
    }

    fn whitespace_width(&self) -> f64 {
        if self.spaced { 1.0 } else { 0.0 }
    }

    fn penalty_width(&self) -> f64 {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(StyledWord),
    Break,
}

#[derive(Debug, Clone, PartialEq)]
enum Block {
    Flow { prefix: &'static str, tokens: Vec<Token> },
    Pre(String),
    Rule,
}

struct Collector<'a> {
    manifest: &'a [ManifestItem],
    blocks: Vec<Block>,
    tokens: Vec<Token>,
    word: Vec<(char, Modifier)>,
    prefix: &'static str,
    style: Modifier,
    pre: Option<String>,
}

impl<'a> Collector<'a> {
    fn new(manifest: &'a [ManifestItem]) -> Self {
        Self {
            manifest,
            blocks: Vec::new(),
            tokens: Vec::new(),
            word: Vec::new(),
            prefix: "",
            style: Modifier::empty(),
            pre: None,
        }
    }

    fn visit(&mut self, node: &Handle) {
        match node.data {
            NodeData::Document => self.visit_children(node),
            NodeData::Text { ref contents } => {
                let text = contents.borrow();
                self.text(&text);
            }
            NodeData::Element {
                ref name,
                ref attrs,
                ..
            } => {
                let tag = name.local.as_ref();
                match tag {
                    "head" | "style" | "script" | "title" => {}
                    "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                        self.flush();
                        self.styled(node, Modifier::BOLD);
                        self.flush();
                    }
                    "li" => {
                        self.flush();
                        self.prefix = BULLET;
                        self.visit_children(node);
                        self.flush();
                    }
                    "pre" => {
                        self.flush();
                        self.pre = Some(String::new());
                        self.visit_children(node);
                        if let Some(text) = self.pre.take() {
                            self.blocks.push(Block::Pre(text));
                        }
                    }
                    "br" => {
                        self.end_word();
                        self.tokens.push(Token::Break);
                    }
                    "hr" => {
                        self.flush();
                        self.blocks.push(Block::Rule);
                    }
                    "img" | "image" => {
                        let attrs = attrs.borrow();
                        let attr = |key: &str| {
                            attrs
                                .iter()
                                .find(|a| a.name.local.as_ref() == key)
                                .map(|a| a.value.to_string())
                        };
                        let src = attr("src").or_else(|| attr("href")).unwrap_or_default();
                        self.image(&src, attr("alt"));
                    }
                    "em" | "i" | "cite" | "var" => self.styled(node, Modifier::ITALIC),
                    "strong" | "b" => self.styled(node, Modifier::BOLD),
                    "u" | "ins" => self.styled(node, Modifier::UNDERLINED),
                    "s" | "del" | "strike" => self.styled(node, Modifier::CROSSED_OUT),
                    "p" | "div" | "section" | "article" | "aside" | "blockquote" | "body"
                    | "html" | "header" | "footer" | "nav" | "table" | "tr" | "ul" | "ol"
                    | "dl" | "dt" | "dd" | "figure" | "figcaption" => {
                        self.flush();
                        self.visit_children(node);
                        self.flush();
                    }
                    _ => self.visit_children(node),
                }
            }
            _ => {}
        }
    }

    fn visit_children(&mut self, node: &Handle) {
        for child in node.children.borrow().iter() {
            self.visit(child);
        }
    }

    fn styled(&mut self, node: &Handle, modifier: Modifier) {
        let saved = self.style;
        self.style |= modifier;
        self.visit_children(node);
        self.style = saved;
    }

    fn text(&mut self, text: &str) {
        if let Some(pre) = self.pre.as_mut() {
            pre.push_str(text);
            return;
        }
        for ch in text.chars() {
            if ch.is_whitespace() && ch != NBSP {
                self.end_word();
            } else {
                let ch = if ch == NBSP { ' ' } else { ch };
                self.word.push((ch, self.style));
            }
        }
    }

    fn image(&mut self, src: &str, alt: Option<String>) {
        let file_name = src.rsplit('/').next().unwrap_or(src);
        let known = !file_name.is_empty()
            && self
                .manifest
                .iter()
                .any(|item| item.href.rsplit('/').next() == Some(file_name));
        if !known {
            log::debug!("image {src:?} is not in the manifest, skipping");
            return;
        }
        let label = alt.filter(|a| !a.trim().is_empty()).unwrap_or_else(|| file_name.to_string());
        self.end_word();
        for word in format!("[image: {label}]").split_whitespace() {
            self.tokens
                .push(Token::Word(StyledWord::plain(word, Modifier::DIM)));
        }
    }

    fn end_word(&mut self) {
        if !self.word.is_empty() {
            self.tokens.push(Token::Word(StyledWord {
                chars: std::mem::take(&mut self.word),
                spaced: true,
            }));
        }
    }

    fn flush(&mut self) {
        self.end_word();
        let tokens = std::mem::take(&mut self.tokens);
        let prefix = std::mem::take(&mut self.prefix);
        if tokens.iter().any(|t| matches!(t, Token::Word(_))) {
            self.blocks.push(Block::Flow { prefix, tokens });
        }
    }
}

fn render_blocks(blocks: &[Block], width: usize) -> CellBuffer {
    let widest_pre = blocks
        .iter()
        .filter_map(|block| match block {
            Block::Pre(text) => text.lines().map(line_width).max(),
            _ => None,
        })
        .max()
        .unwrap_or(0);
    let width = width.max(widest_pre);
    let mut buffer = CellBuffer::new(width);

    for (index, block) in blocks.iter().enumerate() {
        if index > 0 {
            buffer.push_row(Vec::new());
        }
        match block {
            Block::Flow { prefix, tokens } => render_flow(&mut buffer, prefix, tokens, width),
            Block::Pre(text) => {
                for line in text.trim_matches('\n').lines() {
                    buffer.push_row(cells_for(line.chars().map(|ch| (ch, Modifier::empty()))));
                }
            }
            Block::Rule => buffer.push_row(vec![Cell::plain('─'); width]),
        }
    }
    buffer
}

fn render_flow(buffer: &mut CellBuffer, prefix: &str, tokens: &[Token], width: usize) {
    let indent = line_width(prefix);
    let available = width.saturating_sub(indent).max(1);
    let mut first_row = true;

    for segment in tokens.split(|t| *t == Token::Break) {
        let words: Vec<StyledWord> = segment
            .iter()
            .filter_map(|t| match t {
                Token::Word(word) => Some(word.clone()),
                Token::Break => None,
            })
            .flat_map(|word| word.split_to_width(available))
            .collect();
        if words.is_empty() {
            if !first_row {
                buffer.push_row(Vec::new());
            }
            continue;
        }

        for line in wrap_first_fit(&words, &[available as f64]) {
            let lead = if first_row {
                prefix.to_string()
            } else {
                " ".repeat(indent)
            };
            first_row = false;

            let mut chars: Vec<(char, Modifier)> =
                lead.chars().map(|ch| (ch, Modifier::empty())).collect();
            for (i, word) in line.iter().enumerate() {
                chars.extend(word.chars.iter().copied());
                if word.spaced && i + 1 < line.len() {
                    chars.push((' ', Modifier::empty()));
                }
            }
            buffer.push_row(cells_for(chars.into_iter()));
        }
    }
}

/// One cell per column; wide characters are followed by an empty cell.
fn cells_for(chars: impl Iterator<Item = (char, Modifier)>) -> Vec<Cell> {
    let mut cells = Vec::new();
    for (ch, modifier) in chars {
        let ch = if ch == '\t' { ' ' } else { ch };
        match ch.width() {
            Some(0) | None => continue,
            Some(1) => cells.push(Cell::styled(ch, modifier)),
            Some(_) => {
                cells.push(Cell::styled(ch, modifier));
                cells.push(Cell::EMPTY);
            }
        }
    }
    cells
}

fn line_width(text: &str) -> usize {
    text.chars().map(|ch| ch.width().unwrap_or(0)).sum()
}
