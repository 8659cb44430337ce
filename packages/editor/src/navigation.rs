//! # Cross-Surface Navigation
//!
//! Issues and clicks address the document by 1-based line number. The text
//! surface scrolls to the line directly; the block surface has no line
//! numbers, so the target line's text is matched against block text.
//!
//! Matching order:
//! 1. Normalise the target line (strip heading, list and quote markers).
//!    A blank target falls back to the nearest non-empty line above it.
//! 2. Count earlier lines with the same normalised text; that occurrence
//!    index picks between duplicate matches.
//! 3. Exact line match first, substring match second.

use folio_diff::split_lines;

use crate::blocks::{flatten_blocks, Block};

/// Where navigation landed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationTarget {
    TextLine(usize),
    Block { block_id: String },
}

/// Strip Markdown block markers so a source line compares with block text
pub fn normalize_line(line: &str) -> &str {
    let mut rest = line.trim();

    loop {
        let before = rest;

        if let Some(stripped) = rest.strip_prefix('>') {
            rest = stripped.trim_start();
        }

        let hashes = rest.chars().take_while(|c| *c == '#').count();
        if (1..=6).contains(&hashes) && rest[hashes..].starts_with(' ') {
            rest = rest[hashes..].trim_start();
        }

        for bullet in ["- ", "* ", "+ "] {
            if let Some(stripped) = rest.strip_prefix(bullet) {
                rest = stripped.trim_start();
            }
        }

        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits > 0 {
            let after = &rest[digits..];
            if let Some(stripped) = after.strip_prefix(". ").or_else(|| after.strip_prefix(") ")) {
                rest = stripped.trim_start();
            }
        }

        if rest == before {
            return rest.trim_end();
        }
    }
}

/// Id of the block showing `line` of `markdown`, if any block matches
pub fn locate_block_for_line(markdown: &str, blocks: &[Block], line: usize) -> Option<String> {
    let lines = split_lines(markdown);
    if lines.is_empty() || blocks.is_empty() {
        return None;
    }

    let start = line.clamp(1, lines.len()) - 1;
    let index = (0..=start)
        .rev()
        .find(|&i| !normalize_line(lines[i]).is_empty())?;
    let target = normalize_line(lines[index]);

    let occurrence = lines[..index]
        .iter()
        .filter(|l| normalize_line(l) == target)
        .count();

    let flat = flatten_blocks(blocks);

    let exact: Vec<&Block> = flat
        .iter()
        .copied()
        .filter(|b| b.text.split('\n').any(|l| normalize_line(l) == target))
        .collect();
    if let Some(block) = pick(&exact, occurrence) {
        return Some(block.id.clone());
    }

    let partial: Vec<&Block> = flat
        .iter()
        .copied()
        .filter(|b| b.text.contains(target))
        .collect();
    pick(&partial, occurrence).map(|b| b.id.clone())
}

/// The `occurrence`-th match, or the last one when there are fewer
fn pick<'a>(matches: &[&'a Block], occurrence: usize) -> Option<&'a Block> {
    matches
        .get(occurrence)
        .or_else(|| matches.last())
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{BlockCodec, MarkdownBlockCodec};

    #[test]
    fn test_normalize_strips_markers() {
        assert_eq!(normalize_line("## Heading "), "Heading");
        assert_eq!(normalize_line("  - item"), "item");
        assert_eq!(normalize_line("12. numbered"), "numbered");
        assert_eq!(normalize_line("> - quoted item"), "quoted item");
        assert_eq!(normalize_line("#hashtag"), "#hashtag");
    }

    #[test]
    fn test_locates_heading_and_list_item() {
        let markdown = "# Title\n\nIntro\n\n- first\n- second";
        let blocks = MarkdownBlockCodec.to_blocks(markdown).unwrap();

        assert_eq!(
            locate_block_for_line(markdown, &blocks, 1).as_deref(),
            Some(blocks[0].id.as_str())
        );
        assert_eq!(
            locate_block_for_line(markdown, &blocks, 6).as_deref(),
            Some(blocks[3].id.as_str())
        );
    }

    #[test]
    fn test_duplicate_lines_use_occurrence_index() {
        let markdown = "same\n\nother\n\nsame";
        let blocks = MarkdownBlockCodec.to_blocks(markdown).unwrap();

        assert_eq!(
            locate_block_for_line(markdown, &blocks, 5).as_deref(),
            Some(blocks[2].id.as_str())
        );
        assert_eq!(
            locate_block_for_line(markdown, &blocks, 1).as_deref(),
            Some(blocks[0].id.as_str())
        );
    }

    #[test]
    fn test_blank_line_falls_back_to_line_above() {
        let markdown = "alpha\n\nbeta";
        let blocks = MarkdownBlockCodec.to_blocks(markdown).unwrap();

        assert_eq!(
            locate_block_for_line(markdown, &blocks, 2).as_deref(),
            Some(blocks[0].id.as_str())
        );
    }

    #[test]
    fn test_substring_match_when_no_exact_line() {
        let markdown = "Some *emphasis* here";
        let blocks = vec![Block::paragraph("p", "Prefix: Some *emphasis* here, and more")];

        assert_eq!(
            locate_block_for_line(markdown, &blocks, 1).as_deref(),
            Some("p")
        );
    }
}
