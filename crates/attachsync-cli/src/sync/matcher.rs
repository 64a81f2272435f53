//! Target record matching
//!
//! Source and target records share no id; they are linked by the canonical
//! value of a match field on each side.

use crate::api::{ApiResult, PagingRequest, RecordQuery, RecordService};
use crate::sync::filter;
use attachsync_common::types::{AppId, FieldId, RecordId};
use tracing::{debug, warn};

/// Page requested when looking up a match; a second record is all that is
/// needed to detect ambiguity
const MATCH_PAGE: PagingRequest = PagingRequest {
    page_number: 1,
    page_size: 10,
};

/// Outcome of looking up a target record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    Matched(RecordId),
    NoMatch,
    Ambiguous { count: u32 },
}

impl MatchResult {
    pub fn record_id(&self) -> Option<RecordId> {
        match self {
            MatchResult::Matched(id) => Some(*id),
            MatchResult::NoMatch | MatchResult::Ambiguous { .. } => None,
        }
    }
}

/// Resolves canonical match values against the target app
pub struct RecordMatcher<'a> {
    target: &'a dyn RecordService,
    app_id: AppId,
    match_field: FieldId,
}

impl<'a> RecordMatcher<'a> {
    pub fn new(target: &'a dyn RecordService, app_id: AppId, match_field: FieldId) -> Self {
        Self {
            target,
            app_id,
            match_field,
        }
    }

    /// Find the single target record whose match field equals `value`.
    ///
    /// API failures are returned as errors, never as [`MatchResult::NoMatch`].
    pub async fn resolve(&self, value: &str) -> ApiResult<MatchResult> {
        let query = RecordQuery {
            app_id: self.app_id,
            field_ids: vec![self.match_field],
            filter: Some(filter::equals(self.match_field, value)),
        };

        let page = self.target.query_records(&query, MATCH_PAGE).await?;

        let result = match (page.total_records, page.records.first()) {
            (1, Some(record)) => MatchResult::Matched(record.record_id),
            (0, _) | (1, None) => MatchResult::NoMatch,
            (count, _) => MatchResult::Ambiguous { count },
        };

        match result {
            MatchResult::Matched(target_record_id) => {
                debug!(target_record_id, match_value = value, "Matched target record");
            },
            MatchResult::NoMatch => {
                warn!(
                    target_app_id = self.app_id,
                    match_value = value,
                    "No matching record found in target app"
                );
            },
            MatchResult::Ambiguous { count } => {
                warn!(
                    target_app_id = self.app_id,
                    match_value = value,
                    count,
                    "More than one record matched in target app"
                );
            },
        }

        Ok(result)
    }
}
