//! # Folio Linter
//!
//! Quality checks for the canonical document: a remote prose lint service
//! plus local structural rules over the frontmatter and headings, merged by
//! [`QualityOrchestrator`].

mod client;
mod diagnostic;
mod metadata;
mod orchestrator;
mod rules;

pub use client::{HttpLintClient, LintError, LintRequest, LintResponse, LintService, RemoteIssue};
pub use diagnostic::{Fix, Issue, IssueSource, Severity};
pub use metadata::DocumentMetadata;
pub use orchestrator::{IssueReport, QualityConfig, QualityOrchestrator, RemoteStatus};
pub use rules::{
    FieldRequirement, HeadingIncrementRule, LocalRule, RequiredFieldRule, RuleContext,
    RuleRegistry,
};
