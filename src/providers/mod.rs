use async_trait::async_trait;
use serde::{ Deserialize, Serialize };
use solana_keypair::Keypair;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signer::Signer;
use solana_sdk::transaction::{ Transaction, VersionedTransaction };

use crate::error::{ AppError, Result };

mod solana;
pub use solana::SolanaProvider;

/// A watched token's current balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenBalance {
    /// Balance in token units.
    pub amount: f64,
    /// Balance in the mint's base units.
    pub base_units: u64,
    pub decimals: u8,
}

/// Read/submit access to the chain. Balance queries may fail transiently;
/// the orchestrator treats that as "skip this rule this cycle".
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// Balance of an SPL token for a wallet. A missing associated token
    /// account is a zero balance, not an error.
    async fn get_token_balance(&self, wallet: &str, mint: &str) -> Result<TokenBalance>;

    /// Base units currently delegated from the wallet's token account to
    /// `delegate`. Zero when no delegation exists.
    async fn delegated_amount(&self, wallet: &str, mint: &str, delegate: &str) -> Result<u64>;

    /// Grant `delegate` authority to move up to `amount_base` base units,
    /// creating the associated token account first if needed. Returns the
    /// confirmed transaction signature.
    async fn approve_delegate(
        &self,
        signer: &dyn WalletSigner,
        mint: &str,
        delegate: &str,
        amount_base: u64
    ) -> Result<String>;

    /// Submit a signed transaction without waiting for confirmation.
    async fn submit_transaction(&self, transaction: &VersionedTransaction) -> Result<String>;

    /// Has the signature reached confirmed commitment yet?
    async fn confirm_signature(&self, signature: &str) -> Result<bool>;

    fn validate_address(&self, address: &str) -> bool;
}

/// External wallet signer. Signing may suspend indefinitely while the user
/// or a hardware device approves; callers bound it with their own timeout.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    async fn sign_transaction(&self, transaction: Transaction) -> Result<Transaction>;

    async fn sign_versioned_transaction(
        &self,
        transaction: VersionedTransaction
    ) -> Result<VersionedTransaction>;
}

/// In-process signer backed by a local keypair.
pub struct KeypairSigner {
    keypair: Keypair,
}

impl KeypairSigner {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    pub fn from_base58(private_key: &str) -> Result<Self> {
        let bytes = bs58
            ::decode(private_key)
            .into_vec()
            .map_err(|_| AppError::InvalidInput("Invalid private key".to_string()))?;

        let keypair = Keypair::try_from(bytes.as_slice()).map_err(|_|
            AppError::InvalidInput("Invalid private key".to_string())
        )?;

        Ok(Self { keypair })
    }
}

#[async_trait]
impl WalletSigner for KeypairSigner {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_transaction(&self, mut transaction: Transaction) -> Result<Transaction> {
        let blockhash = transaction.message.recent_blockhash;
        transaction
            .try_sign(&[&self.keypair], blockhash)
            .map_err(|e| AppError::ExecutionRejected(format!("Signing failed: {}", e)))?;
        Ok(transaction)
    }

    async fn sign_versioned_transaction(
        &self,
        transaction: VersionedTransaction
    ) -> Result<VersionedTransaction> {
        VersionedTransaction::try_new(transaction.message, &[&self.keypair]).map_err(|e|
            AppError::ExecutionRejected(format!("Signing failed: {}", e))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypair_signer_round_trips_base58() {
        let keypair = Keypair::new();
        let encoded = bs58::encode(keypair.to_bytes()).into_string();

        let signer = KeypairSigner::from_base58(&encoded).unwrap();
        assert_eq!(signer.pubkey(), keypair.pubkey());

        assert!(KeypairSigner::from_base58("not-a-key").is_err());
    }

    #[tokio::test]
    async fn keypair_signer_signs_legacy_transactions() {
        let keypair = Keypair::new();
        let pubkey = keypair.pubkey();
        let signer = KeypairSigner::new(keypair);

        let transaction = Transaction::new_with_payer(&[], Some(&pubkey));
        let signed = signer.sign_transaction(transaction).await.unwrap();
        assert!(!signed.signatures.is_empty());
    }
}
