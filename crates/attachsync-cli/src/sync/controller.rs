//! Pagination and retry controller
//!
//! Drives the record processor over successive pages of source records.
//! A page fetch that fails is retried with a linear backoff; after
//! [`RetryPolicy::max_consecutive_failures`] failures in a row the run is
//! aborted. Record-level failures never stop the run.

use crate::api::{ApiError, PagingRequest, RecordPage, RecordQuery};
use crate::sync::filter;
use crate::sync::processor::{CheckpointStatus, RecordOutcome, RecordProcessor, RecordStatus};
use crate::sync::RunContext;
use std::time::Duration;
use tracing::instrument::WithSubscriber;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Maximum consecutive page fetch failures before the run aborts
pub const MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// Default delay before the first page fetch retry
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Retry settings for page fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_consecutive_failures: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_consecutive_failures: MAX_CONSECUTIVE_FAILURES,
            base_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn with_base_delay(base_delay: Duration) -> Self {
        Self {
            base_delay,
            ..Self::default()
        }
    }

    /// Delay before retrying after the `attempt`-th consecutive failure
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    FetchingPage,
    ProcessingPage,
    Retrying,
    Done,
    Aborted,
}

/// Pagination progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    /// 1-based page to fetch next
    pub page_number: u32,
    pub page_size: u32,
    /// Only known after the first successful fetch
    pub total_pages: Option<u32>,
    pub consecutive_failures: u32,
    pub page_limit: Option<u32>,
}

impl PageState {
    pub fn new(page_size: u32, page_limit: Option<u32>) -> Self {
        Self {
            page_number: 1,
            page_size,
            total_pages: None,
            consecutive_failures: 0,
            page_limit,
        }
    }

    /// Whether the current page number is still within the known page count
    /// and the page ceiling
    pub fn has_more(&self) -> bool {
        let within_total = self
            .total_pages
            .map_or(true, |total| self.page_number <= total);
        let within_limit = self
            .page_limit
            .map_or(true, |limit| self.page_number <= limit);
        within_total && within_limit
    }

    fn paging(&self) -> PagingRequest {
        PagingRequest::new(self.page_number, self.page_size)
    }
}

/// What a run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub state: ControllerState,
    /// Page number the controller stopped on
    pub last_page: u32,
    pub fetch_attempts: u32,
    pub pages_processed: u32,
    pub records_seen: usize,
    pub records_processed: usize,
    pub skipped_no_match_value: usize,
    pub skipped_no_match: usize,
    pub skipped_ambiguous: usize,
    pub skipped_match_failed: usize,
    pub files_transferred: usize,
    pub files_failed: usize,
    pub checkpoint_failures: usize,
}

impl Default for RunSummary {
    fn default() -> Self {
        Self {
            state: ControllerState::Idle,
            last_page: 1,
            fetch_attempts: 0,
            pages_processed: 0,
            records_seen: 0,
            records_processed: 0,
            skipped_no_match_value: 0,
            skipped_no_match: 0,
            skipped_ambiguous: 0,
            skipped_match_failed: 0,
            files_transferred: 0,
            files_failed: 0,
            checkpoint_failures: 0,
        }
    }
}

impl RunSummary {
    pub fn is_aborted(&self) -> bool {
        self.state == ControllerState::Aborted
    }

    pub fn records_skipped(&self) -> usize {
        self.skipped_no_match_value
            + self.skipped_no_match
            + self.skipped_ambiguous
            + self.skipped_match_failed
    }

    fn record(&mut self, outcome: &RecordOutcome) {
        self.records_seen += 1;
        match outcome.status {
            RecordStatus::Processed => self.records_processed += 1,
            RecordStatus::SkippedNoMatchValue => self.skipped_no_match_value += 1,
            RecordStatus::SkippedNoMatch => self.skipped_no_match += 1,
            RecordStatus::SkippedAmbiguous => self.skipped_ambiguous += 1,
            RecordStatus::SkippedMatchFailed => self.skipped_match_failed += 1,
        }
        self.files_transferred += outcome.files_transferred;
        self.files_failed += outcome.files_failed;
        if outcome.checkpoint == CheckpointStatus::Failed {
            self.checkpoint_failures += 1;
        }
    }
}

/// Run the transfer described by `ctx`, logging to the run's sink
pub async fn run(ctx: &RunContext) -> RunSummary {
    async {
        let span = info_span!(
            "run",
            source_app_id = ctx.config.source_app_id,
            target_app_id = ctx.config.target_app_id,
        );
        Controller::new(ctx).drive().instrument(span).await
    }
    .with_subscriber(ctx.log.clone())
    .await
}

struct Controller<'a> {
    ctx: &'a RunContext,
    state: ControllerState,
    page: PageState,
    summary: RunSummary,
}

impl<'a> Controller<'a> {
    fn new(ctx: &'a RunContext) -> Self {
        Self {
            ctx,
            state: ControllerState::Idle,
            page: PageState::new(ctx.options.page_size, ctx.options.page_limit),
            summary: RunSummary::default(),
        }
    }

    fn transition(&mut self, next: ControllerState) {
        debug!(from = ?self.state, to = ?next, page_number = self.page.page_number, "Controller state change");
        self.state = next;
    }

    fn query(&self) -> RecordQuery {
        let config = &self.ctx.config;
        RecordQuery {
            app_id: config.source_app_id,
            field_ids: config.source_field_ids(),
            filter: self.ctx.checkpoint.as_ref().map(|checkpoint| {
                filter::contains(checkpoint.flag_field_id, &checkpoint.process_value_id.to_string())
            }),
        }
    }

    async fn drive(mut self) -> RunSummary {
        info!(dispatch = %self.ctx.options.dispatch, page_size = self.page.page_size, "Starting transfer");
        let query = self.query();
        self.transition(ControllerState::FetchingPage);

        while self.state == ControllerState::FetchingPage {
            let page = match self.fetch_page(&query).await {
                Ok(page) => page,
                Err(e) => {
                    self.on_fetch_failure(e).await;
                    continue;
                },
            };

            self.page.consecutive_failures = 0;
            self.transition(ControllerState::ProcessingPage);
            self.process_page(&page).await;

            self.page.total_pages = Some(page.total_pages);
            self.summary.pages_processed += 1;
            self.page.page_number += 1;

            if self.page.has_more() {
                self.transition(ControllerState::FetchingPage);
            } else {
                self.transition(ControllerState::Done);
            }
        }

        self.summary.state = self.state;
        self.summary.last_page = self.page.page_number;

        if self.summary.is_aborted() {
            error!(
                page_number = self.page.page_number,
                attempts = self.page.consecutive_failures,
                "Aborting run after repeated page fetch failures"
            );
        } else {
            info!(
                pages = self.summary.pages_processed,
                records = self.summary.records_seen,
                files_transferred = self.summary.files_transferred,
                files_failed = self.summary.files_failed,
                "Transfer finished"
            );
        }

        self.summary
    }

    async fn fetch_page(&mut self, query: &RecordQuery) -> Result<RecordPage, ApiError> {
        self.summary.fetch_attempts += 1;
        info!(page_number = self.page.page_number, "Fetching page of source records");
        self.ctx
            .source
            .query_records(query, self.page.paging())
            .await
    }

    async fn on_fetch_failure(&mut self, e: ApiError) {
        self.page.consecutive_failures += 1;
        let attempt = self.page.consecutive_failures;

        if attempt >= self.ctx.options.retry.max_consecutive_failures {
            error!(page_number = self.page.page_number, attempt, error = %e, "Failed to fetch page");
            self.transition(ControllerState::Aborted);
            return;
        }

        let delay = self.ctx.options.retry.delay_for(attempt);
        warn!(
            page_number = self.page.page_number,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %e,
            "Failed to fetch page; retrying"
        );
        self.transition(ControllerState::Retrying);
        tokio::time::sleep(delay).await;
        self.transition(ControllerState::FetchingPage);
    }

    async fn process_page(&mut self, page: &RecordPage) {
        let span = info_span!("page", page_number = self.page.page_number);
        let ctx = self.ctx;
        let processor = RecordProcessor::new(ctx);

        let outcomes = async {
            info!(
                records = page.records.len(),
                total_pages = page.total_pages,
                "Processing page"
            );
            ctx.options
                .dispatch
                .run(page.records.iter(), |record| processor.process(record))
                .await
        }
        .instrument(span)
        .await;

        for outcome in &outcomes {
            self.summary.record(outcome);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_backoff() {
        let policy = RetryPolicy::with_base_delay(Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.max_consecutive_failures, 3);
    }

    #[test]
    fn test_page_state_bounds() {
        let mut state = PageState::new(50, None);
        assert!(state.has_more());

        state.total_pages = Some(2);
        state.page_number = 2;
        assert!(state.has_more());
        state.page_number = 3;
        assert!(!state.has_more());

        let mut limited = PageState::new(50, Some(1));
        limited.total_pages = Some(10);
        assert!(limited.has_more());
        limited.page_number = 2;
        assert!(!limited.has_more());
    }

    #[test]
    fn test_summary_counts_skips() {
        let mut summary = RunSummary::default();
        summary.record(&RecordOutcome {
            record_id: 1,
            status: RecordStatus::SkippedAmbiguous,
            target_record_id: None,
            files_transferred: 0,
            files_failed: 0,
            checkpoint: CheckpointStatus::NotConfigured,
        });
        summary.record(&RecordOutcome {
            record_id: 2,
            status: RecordStatus::Processed,
            target_record_id: Some(9),
            files_transferred: 2,
            files_failed: 1,
            checkpoint: CheckpointStatus::Failed,
        });

        assert_eq!(summary.records_seen, 2);
        assert_eq!(summary.records_processed, 1);
        assert_eq!(summary.records_skipped(), 1);
        assert_eq!(summary.files_transferred, 2);
        assert_eq!(summary.files_failed, 1);
        assert_eq!(summary.checkpoint_failures, 1);
    }
}
