mod heading_increment;
mod required_field;

pub use heading_increment::HeadingIncrementRule;
pub use required_field::{FieldRequirement, RequiredFieldRule};

use crate::diagnostic::Issue;
use crate::metadata::DocumentMetadata;

/// Input handed to every local rule
#[derive(Debug)]
pub struct RuleContext<'a> {
    pub text: &'a str,
    pub metadata: &'a DocumentMetadata,
}

impl<'a> RuleContext<'a> {
    pub fn new(text: &'a str, metadata: &'a DocumentMetadata) -> Self {
        Self { text, metadata }
    }

    /// Body lines after the frontmatter, with their 1-based line numbers
    pub fn body_lines(&self) -> impl Iterator<Item = (usize, &'a str)> {
        let skip = self.metadata.body_start_line() - 1;
        self.text
            .lines()
            .enumerate()
            .skip(skip)
            .map(|(i, line)| (i + 1, line))
    }
}

/// Trait for implementing local structural rules
pub trait LocalRule: Send + Sync {
    /// Unique identifier for this rule
    fn name(&self) -> &'static str;

    /// Human-readable description
    fn description(&self) -> &'static str;

    fn check(&self, context: &RuleContext<'_>) -> Vec<Issue>;
}

/// Registry of all available local rules
pub struct RuleRegistry {
    rules: Vec<Box<dyn LocalRule>>,
}

impl RuleRegistry {
    /// Create a new registry with all built-in rules
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(RequiredFieldRule::default()),
                Box::new(HeadingIncrementRule),
            ],
        }
    }

    /// Get all registered rules
    pub fn rules(&self) -> &[Box<dyn LocalRule>] {
        &self.rules
    }

    /// Create an empty registry
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add a custom rule to the registry
    pub fn add_rule(&mut self, rule: Box<dyn LocalRule>) {
        self.rules.push(rule);
    }

    /// Run every rule against `text`
    pub fn check(&self, text: &str) -> Vec<Issue> {
        let metadata = DocumentMetadata::parse(text);
        let context = RuleContext::new(text, &metadata);

        self.rules
            .iter()
            .flat_map(|rule| rule.check(&context))
            .collect()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &format!("{} rules", self.rules.len()))
            .finish()
    }
}
