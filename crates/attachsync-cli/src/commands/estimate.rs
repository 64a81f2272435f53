//! `attachsync estimate` command implementation
//!
//! Estimates how many API requests a run will make, to check a transfer
//! against an instance's request quota before starting it.

use colored::Colorize;

/// Shape of the data a run will see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimateInput {
    pub records: u64,
    pub fields_per_record: u64,
    pub files_per_field: u64,
    pub page_size: u64,
    pub checkpoint: bool,
}

/// API requests a run makes, by purpose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestEstimate {
    pub validation: u64,
    pub page_fetches: u64,
    pub match_queries: u64,
    pub file_requests: u64,
    pub checkpoint_updates: u64,
}

impl RequestEstimate {
    pub fn total(&self) -> u64 {
        [
            self.page_fetches,
            self.match_queries,
            self.file_requests,
            self.checkpoint_updates,
        ]
        .into_iter()
        .fold(self.validation, u64::saturating_add)
    }
}

/// Requests per transferred file: info, content, save
const REQUESTS_PER_FILE: u64 = 3;

/// Count the requests for a run where every record matches.
///
/// Validation fetches both match fields, plus the flag field when
/// checkpointing. At least one page is always fetched. Counts saturate at
/// `u64::MAX`.
pub fn estimate_requests(input: EstimateInput) -> RequestEstimate {
    let page_size = input.page_size.max(1);

    RequestEstimate {
        validation: if input.checkpoint { 3 } else { 2 },
        page_fetches: input.records.div_ceil(page_size).max(1),
        match_queries: input.records,
        file_requests: input
            .records
            .saturating_mul(input.fields_per_record)
            .saturating_mul(input.files_per_field)
            .saturating_mul(REQUESTS_PER_FILE),
        checkpoint_updates: if input.checkpoint { input.records } else { 0 },
    }
}

/// Print the estimate
pub fn run(input: EstimateInput) {
    let estimate = estimate_requests(input);

    println!("{}", "Estimated API requests:".cyan().bold());
    println!("  Validation:          {}", estimate.validation);
    println!("  Page fetches:        {}", estimate.page_fetches);
    println!("  Match queries:       {}", estimate.match_queries);
    println!("  File transfers:      {}", estimate.file_requests);
    if input.checkpoint {
        println!("  Flag updates:        {}", estimate.checkpoint_updates);
    }
    println!("  {}", format!("Total: {}", estimate.total()).bold());
}
