use axum::{ extract::{ Path, Query, State }, Json };
use serde::Deserialize;

use crate::error::Result;
use crate::limits::SpendRecord;
use crate::notify::SwapHistoryEntry;

use super::AppState;

#[derive(Deserialize)]
pub struct HistoryQuery {
    /// Optional cap on the number of entries returned, newest first.
    #[serde(default)]
    pub limit: Option<usize>,
}

pub async fn get_history(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
    Query(query): Query<HistoryQuery>
) -> Result<Json<Vec<SwapHistoryEntry>>> {
    state.check_wallet(&wallet)?;

    let mut entries = state.history.list(&wallet).await?;
    if let Some(limit) = query.limit {
        entries.truncate(limit);
    }

    Ok(Json(entries))
}

/// Current-period spend counters for one token, already rolled over to the
/// present day and month.
pub async fn get_spend(
    State(state): State<AppState>,
    Path((wallet, mint)): Path<(String, String)>
) -> Result<Json<SpendRecord>> {
    state.check_wallet(&wallet)?;

    let record = state.limits.current_spend(&wallet, &mint).await?;

    Ok(Json(record))
}
