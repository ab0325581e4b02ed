use std::sync::Arc;

use axum::{ extract::{ Path, State }, Json };
use serde::{ Deserialize, Serialize };

use crate::error::Result;
use crate::providers::{ KeypairSigner, WalletSigner };

use super::AppState;

#[derive(Deserialize)]
pub struct ActivateRequest {
    /// Base58 keypair of the wallet to run auto-swap for. Held in memory
    /// only for the lifetime of the session, never persisted.
    #[serde(rename = "privateKey")]
    pub private_key: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub wallet: String,
    pub active: bool,
}

pub async fn activate(
    State(state): State<AppState>,
    Json(request): Json<ActivateRequest>
) -> Result<Json<SessionResponse>> {
    let signer: Arc<dyn WalletSigner> = Arc::new(
        KeypairSigner::from_base58(&request.private_key)?
    );
    let wallet = signer.pubkey().to_string();

    state.orchestrator.activate(signer).await?;

    Ok(
        Json(SessionResponse {
            wallet,
            active: true,
        })
    )
}

pub async fn deactivate(
    State(state): State<AppState>,
    Path(wallet): Path<String>
) -> Result<Json<SessionResponse>> {
    state.check_wallet(&wallet)?;

    state.orchestrator.deactivate(&wallet).await;

    Ok(
        Json(SessionResponse {
            wallet,
            active: false,
        })
    )
}

pub async fn status(
    State(state): State<AppState>,
    Path(wallet): Path<String>
) -> Result<Json<SessionResponse>> {
    state.check_wallet(&wallet)?;

    let active = state.orchestrator.is_active(&wallet).await;

    Ok(Json(SessionResponse { wallet, active }))
}
