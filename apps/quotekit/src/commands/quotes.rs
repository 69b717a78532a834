//! # Quote Commands

use tracing::info;

use quotekit_core::quote::QuoteSummary;
use quotekit_core::ApprovalReport;

use crate::error::ApiResult;
use crate::state::AppState;

/// Saved quotes, most recently modified first.
pub async fn list_quotes(state: &AppState) -> Vec<QuoteSummary> {
    state.list_quotes().await
}

/// Approves the latest revision of a quote.
///
/// ## Errors
/// - `CONFIRMATION_REQUIRED` when the revision is already approved and
///   `--confirm` was not given (stock untouched)
/// - `INSUFFICIENT_STOCK` listing every shortfall (stock untouched)
pub async fn approve(state: &AppState, quote_number: &str, confirm: bool) -> ApiResult<ApprovalReport> {
    let report = state.approve_quote(quote_number, confirm).await?;
    for line in &report.skipped {
        info!(
            position = line.position,
            description = %line.description,
            reason = ?line.reason,
            "Equipment line not tracked in stock"
        );
    }
    Ok(report)
}
