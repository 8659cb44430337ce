//! # Quality Orchestrator
//!
//! Debounces canonical text changes, then merges remote lint issues with
//! local structural checks into one navigable report.
//!
//! ```text
//! canonical ──changed──▶ debounce (2s) ──▶ ┌ local rules ─────────┐
//!                                          └ lint service (timed) ┘──▶ IssueReport (watch)
//! ```
//!
//! The remote call never fails the check: a timeout, refused connection or
//! bad status yields zero remote issues for that round.

use std::sync::Arc;
use std::time::Duration;

use folio_common::Debouncer;
use folio_editor::{CanonicalStore, NavigationTarget, SyncCoordinator};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::client::{LintError, LintService};
use crate::diagnostic::Issue;
use crate::rules::RuleRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityConfig {
    /// Quiet interval before a check runs
    pub debounce: Duration,
    /// Upper bound on one lint service call
    pub remote_timeout: Duration,
    /// Longer texts are not sent to the lint service
    pub max_chars: usize,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(2000),
            remote_timeout: Duration::from_millis(5000),
            max_chars: 100_000,
        }
    }
}

/// Outcome of the remote half of a check
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RemoteStatus {
    #[default]
    NotChecked,
    Ok {
        processing_time_ms: u64,
    },
    Skipped(String),
    Failed(String),
}

/// Merged, ordered issues of one check
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IssueReport {
    pub issues: Vec<Issue>,
    pub remote: RemoteStatus,
}

impl IssueReport {
    /// Order by position and assign stable ids. Identical positions from the
    /// same rule get a `#n` suffix in order of appearance.
    pub fn new(mut issues: Vec<Issue>, remote: RemoteStatus) -> Self {
        issues.sort_by(|a, b| {
            (a.line, a.column, a.source, &a.rule_id).cmp(&(b.line, b.column, b.source, &b.rule_id))
        });

        let mut seen: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
        for issue in &mut issues {
            let base = issue.base_id();
            let count = seen.entry(base.clone()).or_insert(0);
            *count += 1;
            issue.id = if *count == 1 {
                base
            } else {
                format!("{}#{}", base, count)
            };
        }

        Self { issues, remote }
    }

    pub fn get(&self, id: &str) -> Option<&Issue> {
        self.issues.iter().find(|issue| issue.id == id)
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

pub struct QualityOrchestrator {
    config: QualityConfig,
    service: Arc<dyn LintService>,
    registry: Arc<RuleRegistry>,
    report: Arc<watch::Sender<IssueReport>>,
    debouncer: Debouncer,
    selected: Option<String>,
}

impl QualityOrchestrator {
    pub fn new(config: QualityConfig, service: Arc<dyn LintService>, registry: RuleRegistry) -> Self {
        let (report, _) = watch::channel(IssueReport::default());

        Self {
            config,
            service,
            registry: Arc::new(registry),
            report: Arc::new(report),
            debouncer: Debouncer::new("quality"),
            selected: None,
        }
    }

    /// Latest published report
    pub fn report(&self) -> IssueReport {
        self.report.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<IssueReport> {
        self.report.subscribe()
    }

    /// Run a check right away and publish it
    pub async fn check_now(&mut self, text: &str) -> IssueReport {
        self.debouncer.cancel();

        let report = evaluate(
            &self.config,
            self.service.as_ref(),
            &self.registry,
            text,
        )
        .await;
        self.report.send_replace(report.clone());
        report
    }

    /// Check `text` once it has been stable for the quiet interval
    pub fn schedule(&mut self, text: String) {
        let config = self.config;
        let service = self.service.clone();
        let registry = self.registry.clone();
        let sender = self.report.clone();

        self.debouncer.schedule(self.config.debounce, async move {
            let report = evaluate(&config, service.as_ref(), &registry, &text).await;
            sender.send_replace(report);
        });
    }

    /// Drop a scheduled check
    pub fn cancel(&mut self) -> bool {
        self.debouncer.cancel()
    }

    /// Follow `canonical` in a background task: every change schedules a
    /// debounced check. The task ends when the store is dropped.
    pub fn watch(&self, canonical: &CanonicalStore) -> JoinHandle<()> {
        let mut changes = canonical.subscribe();
        let config = self.config;
        let service = self.service.clone();
        let registry = self.registry.clone();
        let sender = self.report.clone();

        tokio::spawn(async move {
            let mut debouncer = Debouncer::new("quality.watch");

            loop {
                let text = changes.borrow_and_update().markdown.clone();
                let service = service.clone();
                let registry = registry.clone();
                let sender = sender.clone();

                debouncer.schedule(config.debounce, async move {
                    let report = evaluate(&config, service.as_ref(), &registry, &text).await;
                    sender.send_replace(report);
                });

                if changes.changed().await.is_err() {
                    tracing::debug!("[Quality] canonical store gone, watcher stopping");
                    break;
                }
            }
        })
    }

    pub fn issue(&self, id: &str) -> Option<Issue> {
        self.report.borrow().get(id).cloned()
    }

    pub fn selected(&self) -> Option<Issue> {
        self.selected.as_deref().and_then(|id| self.issue(id))
    }

    /// Select an issue of the current report. Unknown ids clear the selection.
    pub fn select(&mut self, id: &str) -> Option<Issue> {
        let issue = self.issue(id);
        self.selected = issue.as_ref().map(|i| i.id.clone());
        issue
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Next issue after the selection, wrapping to the first
    pub fn select_next(&mut self) -> Option<Issue> {
        self.step(1)
    }

    /// Previous issue before the selection, wrapping to the last
    pub fn select_previous(&mut self) -> Option<Issue> {
        self.step(-1)
    }

    fn step(&mut self, direction: isize) -> Option<Issue> {
        let report = self.report();
        let count = report.issues.len();
        if count == 0 {
            self.selected = None;
            return None;
        }

        let current = self
            .selected
            .as_deref()
            .and_then(|id| report.issues.iter().position(|i| i.id == id));

        let index = match (current, direction >= 0) {
            (Some(i), true) => (i + 1) % count,
            (Some(i), false) => (i + count - 1) % count,
            (None, true) => 0,
            (None, false) => count - 1,
        };

        let issue = report.issues[index].clone();
        self.selected = Some(issue.id.clone());
        Some(issue)
    }

    /// Select `id` and bring its line into view on the active surface
    pub fn jump_to_issue(
        &mut self,
        id: &str,
        sync: &mut SyncCoordinator,
    ) -> Option<NavigationTarget> {
        let issue = self.select(id)?;
        sync.navigate_to_line(issue.line)
    }
}

impl std::fmt::Debug for QualityOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QualityOrchestrator")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}

/// Local rules plus a bounded remote call, merged into one report
async fn evaluate(
    config: &QualityConfig,
    service: &dyn LintService,
    registry: &RuleRegistry,
    text: &str,
) -> IssueReport {
    let mut issues = registry.check(text);

    let chars = text.chars().count();
    let remote = if chars > config.max_chars {
        tracing::warn!(
            "[Quality] text too long for lint service ({} > {} chars), skipping remote check",
            chars,
            config.max_chars
        );
        RemoteStatus::Skipped(format!("{} characters exceeds {}", chars, config.max_chars))
    } else {
        let call = tokio::time::timeout(config.remote_timeout, service.lint(text));
        let result = match call.await {
            Ok(result) => result,
            Err(_) => Err(LintError::Timeout(config.remote_timeout)),
        };

        match result {
            Ok(response) => {
                issues.extend(response.errors.into_iter().map(Issue::from));
                RemoteStatus::Ok {
                    processing_time_ms: response.processing_time,
                }
            }
            Err(e) => {
                tracing::warn!("[Quality] lint service unavailable, no remote issues this round: {}", e);
                RemoteStatus::Failed(e.to_string())
            }
        }
    };

    let report = IssueReport::new(issues, remote);
    tracing::debug!("[Quality] check finished with {} issues", report.len());
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::{IssueSource, Severity};

    #[test]
    fn test_report_orders_and_disambiguates_ids() {
        let issues = vec![
            Issue::warning("rule", "b", 3),
            Issue::warning("rule", "a", 1),
            Issue::warning("rule", "dup", 3),
            Issue::new(IssueSource::Remote, Severity::Error, "typo", "t", 1, 5),
        ];
        let report = IssueReport::new(issues, RemoteStatus::NotChecked);

        let ids: Vec<&str> = report.issues.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["local:rule:1:1", "remote:typo:1:5", "local:rule:3:1", "local:rule:3:1#2"]
        );
    }
}
