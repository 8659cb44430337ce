use crate::diagnostic::Issue;
use crate::rules::{LocalRule, RuleContext};

const RULE_ID: &str = "heading-increment";

/// Lint rule preventing skipped heading levels (h1 → h3)
pub struct HeadingIncrementRule;

impl LocalRule for HeadingIncrementRule {
    fn name(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "Heading levels should only increase by one"
    }

    fn check(&self, context: &RuleContext<'_>) -> Vec<Issue> {
        let offsets = line_offsets(context.text);
        let mut issues = Vec::new();
        let mut previous: Option<usize> = None;
        let mut in_fence = false;

        for (line_number, line) in context.body_lines() {
            let trimmed = line.trim_start();
            if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                in_fence = !in_fence;
                continue;
            }
            if in_fence {
                continue;
            }

            let Some(level) = heading_level(trimmed) else {
                continue;
            };

            if let Some(prev) = previous {
                if level > prev + 1 {
                    let expected = prev + 1;
                    let indent = line.len() - trimmed.len();
                    let start = offsets[line_number - 1] + indent;

                    issues.push(
                        Issue::warning(
                            RULE_ID,
                            format!("Heading level jumps from h{} to h{}", prev, level),
                            line_number,
                        )
                        .with_fix((start, start + level), "#".repeat(expected)),
                    );
                }
            }
            previous = Some(level);
        }

        issues
    }
}

/// ATX heading level of a line, if it is one
fn heading_level(line: &str) -> Option<usize> {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    let rest = &line[hashes..];
    if (1..=6).contains(&hashes) && (rest.is_empty() || rest.starts_with(' ')) {
        Some(hashes)
    } else {
        None
    }
}

/// Byte offset at which each line starts
fn line_offsets(text: &str) -> Vec<usize> {
    let mut offsets = vec![0];
    offsets.extend(text.match_indices('\n').map(|(i, _)| i + 1));
    offsets
}
