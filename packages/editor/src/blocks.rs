//! # Block Model
//!
//! Structured representation used by the rich surface, and the codec that
//! converts it to and from canonical Markdown.
//!
//! The conversion is lossy in both directions. The block serializer escapes
//! every backslash in inline text, so a document holding `\` comes back as
//! `\\`. [`correct_lossy_markdown`] reverses that artifact outside fenced code
//! and is applied to every serialization that feeds the canonical store.
//!
//! ```text
//! markdown ──pulldown-cmark──▶ Vec<Block> ──write_blocks──▶ markdown (\ → \\)
//!                                                               │
//!                                      correct_lossy_markdown ◀─┘ (\\ → \)
//! ```

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};

use crate::errors::EditorResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Heading(u8),
    Paragraph,
    BulletItem,
    NumberedItem,
    Quote,
    CodeBlock { language: Option<String> },
    Divider,
}

impl BlockKind {
    pub fn is_list_item(&self) -> bool {
        matches!(self, BlockKind::BulletItem | BlockKind::NumberedItem)
    }
}

/// One node of the rich surface's document tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    pub kind: BlockKind,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Block>,
}

impl Block {
    pub fn new(id: impl Into<String>, kind: BlockKind, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            text: text.into(),
            children: Vec::new(),
        }
    }

    pub fn paragraph(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, BlockKind::Paragraph, text)
    }

    pub fn with_children(mut self, children: Vec<Block>) -> Self {
        self.children = children;
        self
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Block> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }
}

/// Depth-first walk over a block tree, parents before children
pub fn flatten_blocks(blocks: &[Block]) -> Vec<&Block> {
    let mut flat = Vec::new();
    let mut stack: Vec<&Block> = blocks.iter().rev().collect();

    while let Some(block) = stack.pop() {
        flat.push(block);
        stack.extend(block.children.iter().rev());
    }

    flat
}

/// Find a block anywhere in a tree
pub fn find_block_mut<'a>(blocks: &'a mut [Block], id: &str) -> Option<&'a mut Block> {
    blocks.iter_mut().find_map(|block| block.find_mut(id))
}

/// Two-way conversion between Markdown and blocks
pub trait BlockCodec: Send + Sync {
    fn to_blocks(&self, markdown: &str) -> EditorResult<Vec<Block>>;

    /// Serialize blocks. Output may carry lossy artifacts; callers feeding
    /// the canonical store run it through [`correct_lossy_markdown`].
    fn to_markdown(&self, blocks: &[Block]) -> EditorResult<String>;
}

/// CommonMark codec backed by pulldown-cmark
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownBlockCodec;

impl BlockCodec for MarkdownBlockCodec {
    fn to_blocks(&self, markdown: &str) -> EditorResult<Vec<Block>> {
        let mut builder = BlockBuilder::default();

        for event in Parser::new(markdown) {
            builder.handle(event);
        }

        Ok(builder.finish())
    }

    fn to_markdown(&self, blocks: &[Block]) -> EditorResult<String> {
        Ok(write_blocks(blocks))
    }
}

#[derive(Default)]
struct BlockBuilder {
    roots: Vec<Block>,
    open: Vec<Block>,
    ordered_lists: Vec<bool>,
    link_targets: Vec<String>,
    leaf_pushed: bool,
    next_id: usize,
}

impl BlockBuilder {
    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.push_text(&text),
            Event::Code(code) => {
                self.push_text("`");
                self.push_text(&code);
                self.push_text("`");
            }
            Event::Html(html) | Event::InlineHtml(html) => self.push_text(&html),
            Event::SoftBreak | Event::HardBreak => self.push_text("\n"),
            Event::Rule => {
                self.open_block(BlockKind::Divider);
                self.close_block();
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => self.start_leaf(BlockKind::Heading(level as u8)),
            Tag::Paragraph | Tag::HtmlBlock => self.start_leaf(BlockKind::Paragraph),
            Tag::BlockQuote { .. } => self.open_block(BlockKind::Quote),
            Tag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                    _ => None,
                };
                self.open_block(BlockKind::CodeBlock { language });
            }
            Tag::List(start) => self.ordered_lists.push(start.is_some()),
            Tag::Item => {
                let ordered = self.ordered_lists.last().copied().unwrap_or(false);
                self.open_block(if ordered {
                    BlockKind::NumberedItem
                } else {
                    BlockKind::BulletItem
                });
            }
            Tag::Emphasis => self.push_text("*"),
            Tag::Strong => self.push_text("**"),
            Tag::Link { dest_url, .. } => {
                self.push_text("[");
                self.link_targets.push(dest_url.to_string());
            }
            Tag::Image { dest_url, .. } => {
                self.push_text("![");
                self.link_targets.push(dest_url.to_string());
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Heading { .. } | TagEnd::Paragraph | TagEnd::HtmlBlock => self.end_leaf(),
            TagEnd::BlockQuote { .. } | TagEnd::CodeBlock | TagEnd::Item => self.close_block(),
            TagEnd::List { .. } => {
                self.ordered_lists.pop();
            }
            TagEnd::Emphasis => self.push_text("*"),
            TagEnd::Strong => self.push_text("**"),
            TagEnd::Link | TagEnd::Image => {
                let target = self.link_targets.pop().unwrap_or_default();
                self.push_text(&format!("]({})", target));
            }
            _ => {}
        }
    }

    /// Items and quotes absorb their paragraphs as text lines
    fn in_text_container(&self) -> bool {
        matches!(
            self.open.last().map(|b| &b.kind),
            Some(BlockKind::BulletItem | BlockKind::NumberedItem | BlockKind::Quote)
        )
    }

    fn start_leaf(&mut self, kind: BlockKind) {
        if self.in_text_container() {
            if let Some(container) = self.open.last_mut() {
                if !container.text.is_empty() && !container.text.ends_with('\n') {
                    container.text.push('\n');
                }
            }
            self.leaf_pushed = false;
        } else {
            self.open_block(kind);
            self.leaf_pushed = true;
        }
    }

    fn end_leaf(&mut self) {
        if self.leaf_pushed {
            self.close_block();
            self.leaf_pushed = false;
        }
    }

    fn open_block(&mut self, kind: BlockKind) {
        self.next_id += 1;
        let id = format!("blk-{}", self.next_id);
        self.open.push(Block::new(id, kind, String::new()));
    }

    fn close_block(&mut self) {
        let Some(mut block) = self.open.pop() else {
            return;
        };

        let trimmed = block.text.trim_end_matches('\n').len();
        block.text.truncate(trimmed);

        match self.open.last_mut() {
            Some(parent) => parent.children.push(block),
            None => self.roots.push(block),
        }
    }

    fn push_text(&mut self, text: &str) {
        if self.open.is_empty() {
            self.open_block(BlockKind::Paragraph);
            self.leaf_pushed = true;
        }
        if let Some(block) = self.open.last_mut() {
            block.text.push_str(text);
        }
    }

    fn finish(mut self) -> Vec<Block> {
        while !self.open.is_empty() {
            self.close_block();
        }
        self.roots
    }
}

/// Serialize a block list the way a block editor does, escaping backslashes
pub fn write_blocks(blocks: &[Block]) -> String {
    let mut out = String::new();
    let mut previous: Option<&BlockKind> = None;
    let mut number = 0;

    for block in blocks {
        if let Some(previous) = previous {
            let same_list = previous.is_list_item() && previous == &block.kind;
            out.push_str(if same_list { "\n" } else { "\n\n" });
        }

        number = match (&block.kind, previous) {
            (BlockKind::NumberedItem, Some(BlockKind::NumberedItem)) => number + 1,
            (BlockKind::NumberedItem, _) => 1,
            _ => 0,
        };

        out.push_str(&write_block(block, number));
        previous = Some(&block.kind);
    }

    out
}

fn write_block(block: &Block, number: usize) -> String {
    let text = escape_inline(&block.text);

    let (head, child_prefix) = match &block.kind {
        BlockKind::Heading(level) => {
            let level = (*level).clamp(1, 6) as usize;
            (format!("{} {}", "#".repeat(level), text), String::new())
        }
        BlockKind::Paragraph => (text, String::new()),
        BlockKind::BulletItem => (prefix_lines(&text, "- ", "  "), "  ".to_string()),
        BlockKind::NumberedItem => {
            let marker = format!("{}. ", number);
            let pad = " ".repeat(marker.len());
            (prefix_lines(&text, &marker, &pad), pad)
        }
        BlockKind::Quote => (prefix_lines(&text, "> ", "> "), "> ".to_string()),
        BlockKind::CodeBlock { language } => {
            let fence_lang = language.as_deref().unwrap_or("");
            let body = block.text.trim_end_matches('\n');
            let code = if body.is_empty() {
                format!("```{}\n```", fence_lang)
            } else {
                format!("```{}\n{}\n```", fence_lang, body)
            };
            (code, String::new())
        }
        BlockKind::Divider => ("---".to_string(), String::new()),
    };

    if block.children.is_empty() {
        return head;
    }

    let separator = if block.kind.is_list_item() { "\n" } else { "\n\n" };
    let children = write_blocks(&block.children);
    format!(
        "{}{}{}",
        head,
        separator,
        prefix_lines(&children, &child_prefix, &child_prefix)
    )
}

fn escape_inline(text: &str) -> String {
    text.replace('\\', "\\\\")
}

fn prefix_lines(text: &str, first: &str, rest: &str) -> String {
    text.split('\n')
        .enumerate()
        .map(|(i, line)| {
            let prefix = if i == 0 { first } else { rest };
            if line.is_empty() {
                prefix.trim_end().to_string()
            } else {
                format!("{}{}", prefix, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Undo the block serializer's backslash doubling outside fenced code
pub fn correct_lossy_markdown(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());
    let mut in_fence = false;

    for line in markdown.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            out.push_str(line);
        } else if in_fence {
            out.push_str(line);
        } else {
            out.push_str(&line.replace("\\\\", "\\"));
        }
    }

    out
}

/// Blocks → canonical Markdown, with the lossy correction applied
pub fn blocks_to_canonical(codec: &dyn BlockCodec, blocks: &[Block]) -> EditorResult<String> {
    let markdown = codec.to_markdown(blocks)?;
    Ok(correct_lossy_markdown(&markdown))
}
