use axum::{ extract::{ Path, State }, Json };

use crate::error::Result;
use crate::rules::UserConfig;

use super::AppState;

/// A wallet that has never saved anything gets the default configuration.
pub async fn get_config(
    State(state): State<AppState>,
    Path(wallet): Path<String>
) -> Result<Json<UserConfig>> {
    state.check_wallet(&wallet)?;

    let config = state.rules.load(&wallet).await?;

    Ok(Json(config))
}

/// Full-document replace. Validation failures leave the stored configuration
/// untouched and report which invariant broke.
pub async fn put_config(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
    Json(config): Json<UserConfig>
) -> Result<Json<UserConfig>> {
    state.check_wallet(&wallet)?;

    state.rules.save(&wallet, &config).await?;

    Ok(Json(config))
}
