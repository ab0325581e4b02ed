use std::str::FromStr;
use std::sync::atomic::{ AtomicUsize, Ordering };

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_commitment_config::CommitmentConfig;
use solana_sdk::{
    pubkey::Pubkey,
    signature::Signature,
    transaction::{ Transaction, VersionedTransaction },
};
use spl_token::solana_program::program_option::COption;
use spl_token::state::Account as TokenAccount;
use solana_sdk::program_pack::Pack;

use crate::error::{ AppError, Result };
use crate::tokens;

use super::{ ChainProvider, TokenBalance, WalletSigner };

/// Solana RPC access with round-robin rotation across configured endpoints.
pub struct SolanaProvider {
    clients: Vec<RpcClient>,
    next: AtomicUsize,
}

impl SolanaProvider {
    pub fn new(rpc_urls: &[String]) -> Result<Self> {
        if rpc_urls.is_empty() {
            return Err(AppError::Config("No Solana RPC URLs configured".to_string()));
        }

        let clients = rpc_urls
            .iter()
            .map(|url|
                RpcClient::new_with_commitment(url.to_string(), CommitmentConfig::confirmed())
            )
            .collect();

        Ok(Self {
            clients,
            next: AtomicUsize::new(0),
        })
    }

    fn client(&self) -> &RpcClient {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.clients.len();
        &self.clients[index]
    }

    fn associated_token_account(wallet: &str, mint: &str) -> Result<(Pubkey, Pubkey, Pubkey)> {
        let wallet_pubkey = Pubkey::from_str(wallet).map_err(|_| AppError::InvalidAddress)?;
        let mint_pubkey = Pubkey::from_str(mint).map_err(|_| AppError::InvalidAddress)?;

        let token_account = spl_associated_token_account::get_associated_token_address(
            &wallet_pubkey,
            &mint_pubkey
        );

        Ok((wallet_pubkey, mint_pubkey, token_account))
    }

    fn is_missing_account(message: &str) -> bool {
        message.contains("AccountNotFound") || message.contains("could not find account")
    }
}

#[async_trait]
impl ChainProvider for SolanaProvider {
    async fn get_token_balance(&self, wallet: &str, mint: &str) -> Result<TokenBalance> {
        let (_, _, token_account) = Self::associated_token_account(wallet, mint)?;

        let ui_amount = match self.client().get_token_account_balance(&token_account).await {
            Ok(amount) => amount,
            Err(e) if Self::is_missing_account(&e.to_string()) => {
                // No associated token account yet: zero balance.
                let decimals = tokens
                    ::get_token_by_mint(mint)
                    .map(|info| info.decimals)
                    .unwrap_or(9);
                return Ok(TokenBalance {
                    amount: 0.0,
                    base_units: 0,
                    decimals,
                });
            }
            Err(e) => {
                return Err(AppError::Rpc(format!("Failed to get token balance: {}", e)));
            }
        };

        let base_units = ui_amount.amount
            .parse::<u64>()
            .map_err(|_| AppError::Rpc("Malformed token amount in RPC response".to_string()))?;
        let decimals = ui_amount.decimals;
        let amount = ui_amount.ui_amount.unwrap_or(
            (base_units as f64) / (10_f64).powi(decimals as i32)
        );

        Ok(TokenBalance {
            amount,
            base_units,
            decimals,
        })
    }

    async fn delegated_amount(&self, wallet: &str, mint: &str, delegate: &str) -> Result<u64> {
        let (_, _, token_account) = Self::associated_token_account(wallet, mint)?;
        let delegate_pubkey = Pubkey::from_str(delegate).map_err(|_| AppError::InvalidAddress)?;

        let account_data = match self.client().get_account_data(&token_account).await {
            Ok(data) => data,
            Err(e) if Self::is_missing_account(&e.to_string()) => {
                return Ok(0);
            }
            Err(e) => {
                return Err(AppError::Rpc(format!("Failed to get token account: {}", e)));
            }
        };

        let account = TokenAccount::unpack(&account_data).map_err(|e|
            AppError::Rpc(format!("Failed to parse token account: {}", e))
        )?;

        match account.delegate {
            COption::Some(current) if current == delegate_pubkey => Ok(account.delegated_amount),
            _ => Ok(0),
        }
    }

    async fn approve_delegate(
        &self,
        signer: &dyn WalletSigner,
        mint: &str,
        delegate: &str,
        amount_base: u64
    ) -> Result<String> {
        let owner = signer.pubkey();
        let mint_pubkey = Pubkey::from_str(mint).map_err(|_| AppError::InvalidAddress)?;
        let delegate_pubkey = Pubkey::from_str(delegate).map_err(|_| AppError::InvalidAddress)?;

        let token_account = spl_associated_token_account::get_associated_token_address(
            &owner,
            &mint_pubkey
        );

        let mut instructions = vec![];

        if self.client().get_account_data(&token_account).await.is_err() {
            let create_account_ix =
                spl_associated_token_account::instruction::create_associated_token_account(
                    &owner,
                    &owner,
                    &mint_pubkey,
                    &spl_token::id()
                );
            instructions.push(create_account_ix);
        }

        let approve_ix = spl_token::instruction
            ::approve(
                &spl_token::id(),
                &token_account,
                &delegate_pubkey,
                &owner,
                &[],
                amount_base
            )
            .map_err(|e| AppError::Rpc(format!("Failed to create approve instruction: {}", e)))?;
        instructions.push(approve_ix);

        let recent_blockhash = self
            .client()
            .get_latest_blockhash().await
            .map_err(|e| AppError::Rpc(format!("Failed to get recent blockhash: {}", e)))?;

        let mut transaction = Transaction::new_with_payer(&instructions, Some(&owner));
        transaction.message.recent_blockhash = recent_blockhash;

        let signed = signer.sign_transaction(transaction).await?;

        let signature = self
            .client()
            .send_and_confirm_transaction(&signed).await
            .map_err(|e| AppError::Rpc(format!("Approval transaction failed: {}", e)))?;

        Ok(signature.to_string())
    }

    async fn submit_transaction(&self, transaction: &VersionedTransaction) -> Result<String> {
        let signature = self
            .client()
            .send_transaction(transaction).await
            .map_err(|e| AppError::Rpc(format!("Failed to submit transaction: {}", e)))?;

        Ok(signature.to_string())
    }

    async fn confirm_signature(&self, signature: &str) -> Result<bool> {
        let signature = Signature::from_str(signature).map_err(|_|
            AppError::InvalidInput("Invalid transaction signature".to_string())
        )?;

        self
            .client()
            .confirm_transaction(&signature).await
            .map_err(|e| AppError::Rpc(format!("Failed to confirm transaction: {}", e)))
    }

    fn validate_address(&self, address: &str) -> bool {
        address.parse::<Pubkey>().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_base58_addresses() {
        let provider = SolanaProvider::new(
            &["https://api.testnet.solana.com".to_string()]
        ).unwrap();

        assert!(provider.validate_address("So11111111111111111111111111111111111111112"));
        assert!(!provider.validate_address("invalid"));
    }

    #[test]
    fn requires_at_least_one_rpc_url() {
        assert!(SolanaProvider::new(&[]).is_err());
    }

    #[test]
    fn recognizes_missing_account_errors() {
        assert!(SolanaProvider::is_missing_account("AccountNotFound: pubkey"));
        assert!(SolanaProvider::is_missing_account("could not find account"));
        assert!(!SolanaProvider::is_missing_account("rate limited"));
    }
}
