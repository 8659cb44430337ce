//! YAML frontmatter of a Markdown document.
//!
//! ```text
//! ---
//! title: Release notes
//! description: What changed this week
//! ---
//! # Body starts here
//! ```
//!
//! Malformed frontmatter reads as empty metadata; checks keep running on the
//! body.

use std::collections::BTreeMap;

use serde_yaml::Value;

/// Parsed frontmatter plus where it sits in the document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentMetadata {
    fields: BTreeMap<String, Value>,

    /// 1-based line of each top-level key
    field_lines: BTreeMap<String, usize>,

    /// Number of lines the frontmatter block occupies, fences included
    frontmatter_lines: usize,
}

impl DocumentMetadata {
    pub fn parse(text: &str) -> Self {
        let lines: Vec<&str> = text.lines().collect();

        if lines.first().map(|l| l.trim_end()) != Some("---") {
            return Self::default();
        }

        let Some(close) = lines
            .iter()
            .skip(1)
            .position(|l| matches!(l.trim_end(), "---" | "..."))
            .map(|i| i + 1)
        else {
            tracing::debug!("[Metadata] unterminated frontmatter, treating as body");
            return Self::default();
        };

        let yaml_lines = &lines[1..close];
        let yaml = yaml_lines.join("\n");

        let fields = if yaml.trim().is_empty() {
            BTreeMap::new()
        } else {
            match serde_yaml::from_str::<BTreeMap<String, Value>>(&yaml) {
                Ok(fields) => fields,
                Err(e) => {
                    tracing::warn!("[Metadata] malformed frontmatter, using defaults: {}", e);
                    BTreeMap::new()
                }
            }
        };

        let field_lines = yaml_lines
            .iter()
            .enumerate()
            .filter(|(_, line)| !line.starts_with([' ', '\t', '#', '-']))
            .filter_map(|(i, line)| {
                let (key, _) = line.split_once(':')?;
                Some((key.trim().to_string(), i + 2))
            })
            .collect();

        Self {
            fields,
            field_lines,
            frontmatter_lines: close + 1,
        }
    }

    pub fn has_frontmatter(&self) -> bool {
        self.frontmatter_lines > 0
    }

    /// First line after the frontmatter (1 when there is none)
    pub fn body_start_line(&self) -> usize {
        self.frontmatter_lines + 1
    }

    /// Scalar field rendered as text; `None` for missing, null or nested values
    pub fn text(&self, field: &str) -> Option<String> {
        match self.fields.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn title(&self) -> Option<String> {
        self.text("title")
    }

    pub fn description(&self) -> Option<String> {
        self.text("description")
    }

    /// Line of `field` inside the frontmatter, if present
    pub fn line_of(&self, field: &str) -> Option<usize> {
        self.field_lines.get(field).copied()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fields_and_lines() {
        let text = "---\ntitle: Notes\ndescription: A long enough description\n---\n# Body";
        let meta = DocumentMetadata::parse(text);

        assert!(meta.has_frontmatter());
        assert_eq!(meta.title().as_deref(), Some("Notes"));
        assert_eq!(meta.line_of("title"), Some(2));
        assert_eq!(meta.line_of("description"), Some(3));
        assert_eq!(meta.body_start_line(), 5);
    }

    #[test]
    fn test_no_frontmatter() {
        let meta = DocumentMetadata::parse("# Just a heading");
        assert!(!meta.has_frontmatter());
        assert_eq!(meta.body_start_line(), 1);
        assert_eq!(meta.title(), None);
    }

    #[test]
    fn test_malformed_frontmatter_reads_as_empty() {
        let meta = DocumentMetadata::parse("---\ntitle: [unclosed\n---\nbody");
        assert!(meta.has_frontmatter());
        assert_eq!(meta.title(), None);
        assert_eq!(meta.fields().count(), 0);
    }

    #[test]
    fn test_non_string_scalars_render_as_text() {
        let meta = DocumentMetadata::parse("---\ntitle: 2024\ndraft: true\ntags: [a]\n---");
        assert_eq!(meta.title().as_deref(), Some("2024"));
        assert_eq!(meta.text("draft").as_deref(), Some("true"));
        assert_eq!(meta.text("tags"), None);
    }
}
