use crate::diagnostic::Issue;
use crate::rules::{LocalRule, RuleContext};

const RULE_ID: &str = "required-field";

/// Minimum character length for one frontmatter field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRequirement {
    pub field: String,
    pub min_chars: usize,
}

impl FieldRequirement {
    pub fn new(field: impl Into<String>, min_chars: usize) -> Self {
        Self {
            field: field.into(),
            min_chars,
        }
    }
}

/// Lint rule requiring frontmatter fields of a minimum length
#[derive(Debug, Clone)]
pub struct RequiredFieldRule {
    requirements: Vec<FieldRequirement>,
}

impl RequiredFieldRule {
    pub fn new(requirements: Vec<FieldRequirement>) -> Self {
        Self { requirements }
    }
}

impl Default for RequiredFieldRule {
    fn default() -> Self {
        Self::new(vec![
            FieldRequirement::new("title", 3),
            FieldRequirement::new("description", 20),
        ])
    }
}

impl LocalRule for RequiredFieldRule {
    fn name(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "Require frontmatter fields with a minimum length"
    }

    fn check(&self, context: &RuleContext<'_>) -> Vec<Issue> {
        let metadata = context.metadata;
        let mut issues = Vec::new();

        for requirement in &self.requirements {
            let field = &requirement.field;

            match metadata.text(field) {
                None => issues.push(Issue::error(
                    RULE_ID,
                    format!("Required field '{}' is missing", field),
                    1,
                )),
                Some(value) => {
                    let length = value.trim().chars().count();
                    if length < requirement.min_chars {
                        issues.push(Issue::warning(
                            RULE_ID,
                            format!(
                                "Field '{}' is too short ({} characters, minimum {})",
                                field, length, requirement.min_chars
                            ),
                            metadata.line_of(field).unwrap_or(1),
                        ));
                    }
                }
            }
        }

        issues
    }
}
