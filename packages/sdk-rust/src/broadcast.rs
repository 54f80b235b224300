//! Sign, submit and confirm finalized bundles.
//!
//! All bundles share one recent blockhash and are signed in a single wallet
//! prompt. Submission is strictly sequential: bundle *i + 1* is sent only after
//! bundle *i* confirmed. The first failure stops the run; bundles already
//! confirmed stay on chain and nothing is retried.

use async_trait::async_trait;
use base64::{prelude::BASE64_STANDARD, Engine};
use solana_client::{nonblocking::rpc_client::RpcClient, rpc_config::RpcSendTransactionConfig};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::gateway::TransactionBundle;
use crate::notify::{Notification, NotificationSink, TX_FAILED, TX_SUCCESS};

// ─── Collaborator contracts ───────────────────────────────────────────────────

/// Chain transport: blockhash, submission and confirmation.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn latest_blockhash(&self) -> Result<Hash>;
    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature>;
    /// Resolve once `signature` reached `commitment`, or fail with the
    /// runtime error / timeout.
    async fn confirm_transaction(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<()>;
}

/// The user's wallet.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Fee payer and signer identity; `None` while disconnected.
    fn identity(&self) -> Option<Pubkey>;

    /// Sign every transaction in one prompt, preserving order.
    async fn sign_all_transactions(&self, transactions: Vec<Transaction>) -> Result<Vec<Transaction>>;
}

#[async_trait]
impl WalletSigner for Keypair {
    fn identity(&self) -> Option<Pubkey> {
        Some(self.pubkey())
    }

    async fn sign_all_transactions(&self, transactions: Vec<Transaction>) -> Result<Vec<Transaction>> {
        transactions
            .into_iter()
            .map(|mut tx| -> Result<Transaction> {
                let blockhash = tx.message.recent_blockhash;
                tx.try_sign(&[self], blockhash)
                    .map_err(|e| Error::Signing(e.to_string()))?;
                Ok(tx)
            })
            .collect()
    }
}

/// [`Transport`] over the nonblocking JSON-RPC client.
pub struct RpcTransport {
    rpc:            RpcClient,
    skip_preflight: bool,
}

impl RpcTransport {
    pub fn new(rpc_url: impl Into<String>, commitment: CommitmentConfig) -> Self {
        Self {
            rpc:            RpcClient::new_with_commitment(rpc_url.into(), commitment),
            skip_preflight: false,
        }
    }

    pub fn with_skip_preflight(mut self, skip_preflight: bool) -> Self {
        self.skip_preflight = skip_preflight;
        self
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }
}

#[async_trait]
impl Transport for RpcTransport {
    async fn latest_blockhash(&self) -> Result<Hash> {
        Ok(self.rpc.get_latest_blockhash().await?)
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature> {
        let config = RpcSendTransactionConfig {
            skip_preflight:       self.skip_preflight,
            preflight_commitment: Some(self.rpc.commitment().commitment),
            ..Default::default()
        };
        Ok(self.rpc.send_transaction_with_config(transaction, config).await?)
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<()> {
        self.rpc.poll_for_signature_with_commitment(signature, commitment).await?;
        match self.rpc.get_signature_status_with_commitment(signature, commitment).await? {
            Some(Ok(()))  => Ok(()),
            Some(Err(e))  => Err(Error::Transaction(e)),
            None          => Err(Error::Unconfirmed(*signature)),
        }
    }
}

// ─── Outcomes ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Confirmed,
    Failed,
}

/// Result of submitting one bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastOutcome {
    pub index:      usize,
    /// Fee payer signature; known even when submission failed.
    pub signature:  Signature,
    pub status:     OutcomeStatus,
    pub error:      Option<String>,
    /// Base64 of the serialized message, for failed bundles only.
    pub diagnostic: Option<String>,
}

/// Ordered outcomes of one broadcast. Bundles after a failure have no outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    pub outcomes: Vec<BroadcastOutcome>,
    pub total:    usize,
}

impl BroadcastReport {
    pub fn confirmed(&self) -> impl Iterator<Item = &BroadcastOutcome> {
        self.outcomes.iter().filter(|o| o.status == OutcomeStatus::Confirmed)
    }

    pub fn confirmed_count(&self) -> usize {
        self.confirmed().count()
    }

    pub fn failure(&self) -> Option<&BroadcastOutcome> {
        self.outcomes.iter().find(|o| o.status == OutcomeStatus::Failed)
    }

    /// Bundles never attempted.
    pub fn skipped(&self) -> usize {
        self.total - self.outcomes.len()
    }

    pub fn all_confirmed(&self) -> bool {
        self.failure().is_none() && self.outcomes.len() == self.total
    }

    /// Some bundles landed, then one failed.
    pub fn is_partial(&self) -> bool {
        self.failure().is_some() && self.confirmed_count() > 0
    }
}

/// Base64 of the transaction's serialized message.
pub fn diagnostic_dump(transaction: &Transaction) -> String {
    BASE64_STANDARD.encode(transaction.message_data())
}

// ─── Broadcaster ──────────────────────────────────────────────────────────────

pub struct Broadcaster<'a, T: ?Sized, W: ?Sized, N: ?Sized> {
    transport:  &'a T,
    wallet:     &'a W,
    sink:       &'a N,
    commitment: CommitmentConfig,
}

impl<'a, T, W, N> Broadcaster<'a, T, W, N>
where
    T: Transport + ?Sized,
    W: WalletSigner + ?Sized,
    N: NotificationSink + ?Sized,
{
    pub fn new(transport: &'a T, wallet: &'a W, sink: &'a N) -> Self {
        Self { transport, wallet, sink, commitment: CommitmentConfig::confirmed() }
    }

    pub fn with_commitment(mut self, commitment: CommitmentConfig) -> Self {
        self.commitment = commitment;
        self
    }

    /// Sign all `bundles` at once, then send and confirm them in order.
    ///
    /// `Err` means nothing was submitted. Once submission starts every failure
    /// is recorded in the returned report instead.
    pub async fn broadcast(&self, bundles: Vec<TransactionBundle>) -> Result<BroadcastReport> {
        if bundles.is_empty() {
            return Err(Error::EmptyBundleSet);
        }
        let fee_payer = self.wallet.identity().ok_or(Error::WalletNotConnected)?;
        let blockhash = self.transport.latest_blockhash().await?;

        let unsigned: Vec<Transaction> = bundles
            .iter()
            .map(|bundle| bundle.to_transaction(&fee_payer, blockhash))
            .collect();
        let total = unsigned.len();

        let signed = self.wallet.sign_all_transactions(unsigned).await?;
        if signed.len() != total {
            return Err(Error::Signing(format!(
                "wallet returned {} signed transactions for {total} bundles",
                signed.len()
            )));
        }
        debug!(total, %blockhash, "bundles signed");

        let mut outcomes = Vec::with_capacity(total);
        for (index, tx) in signed.iter().enumerate() {
            let signature = tx.signatures.first().copied().unwrap_or_default();

            match self.submit(tx).await {
                Ok(()) => {
                    info!(index, total, %signature, "bundle confirmed");
                    self.sink.notify(Notification::success(
                        TX_SUCCESS,
                        Some(format!("Bundle {} of {total}", index + 1)),
                        Some(signature.to_string()),
                    ));
                    outcomes.push(BroadcastOutcome {
                        index,
                        signature,
                        status:     OutcomeStatus::Confirmed,
                        error:      None,
                        diagnostic: None,
                    });
                }
                Err(e) => {
                    let diagnostic = diagnostic_dump(tx);
                    warn!(index, total, %signature, error = %e, diagnostic = %diagnostic, "bundle failed");
                    self.sink.notify(Notification::error(
                        TX_FAILED,
                        Some(e.to_string()),
                        Some(signature.to_string()),
                    ));
                    outcomes.push(BroadcastOutcome {
                        index,
                        signature,
                        status:     OutcomeStatus::Failed,
                        error:      Some(e.to_string()),
                        diagnostic: Some(diagnostic),
                    });
                    break;
                }
            }
        }

        Ok(BroadcastReport { outcomes, total })
    }

    async fn submit(&self, tx: &Transaction) -> Result<()> {
        let signature = self.transport.send_transaction(tx).await?;
        self.transport.confirm_transaction(&signature, self.commitment).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::instruction::Instruction;

    fn outcome(index: usize, status: OutcomeStatus) -> BroadcastOutcome {
        BroadcastOutcome { index, signature: Signature::default(), status, error: None, diagnostic: None }
    }

    #[test]
    fn report_accounting() {
        let report = BroadcastReport {
            outcomes: vec![outcome(0, OutcomeStatus::Confirmed), outcome(1, OutcomeStatus::Failed)],
            total:    3,
        };
        assert_eq!(report.confirmed_count(), 1);
        assert_eq!(report.failure().map(|o| o.index), Some(1));
        assert_eq!(report.skipped(), 1);
        assert!(report.is_partial());
        assert!(!report.all_confirmed());

        let clean = BroadcastReport { outcomes: vec![outcome(0, OutcomeStatus::Confirmed)], total: 1 };
        assert!(clean.all_confirmed());
        assert!(!clean.is_partial());
    }

    #[tokio::test]
    async fn keypair_signs_every_transaction_in_order() {
        let wallet = Keypair::new();
        let payer = wallet.identity().unwrap();
        let blockhash = Hash::new_unique();
        let txs: Vec<Transaction> = (0..3u8)
            .map(|i| {
                let ix = Instruction::new_with_bytes(Pubkey::new_unique(), &[i], vec![]);
                TransactionBundle::new(vec![ix]).to_transaction(&payer, blockhash)
            })
            .collect();

        let signed = wallet.sign_all_transactions(txs).await.unwrap();
        assert_eq!(signed.len(), 3);
        for (i, tx) in signed.iter().enumerate() {
            assert!(tx.is_signed());
            assert_eq!(tx.message.instructions[0].data, vec![i as u8]);
            assert_eq!(tx.message.recent_blockhash, blockhash);
        }
    }

    #[test]
    fn diagnostic_is_base64_of_message() {
        let payer = Pubkey::new_unique();
        let tx = TransactionBundle::new(vec![]).to_transaction(&payer, Hash::default());
        let decoded = BASE64_STANDARD.decode(diagnostic_dump(&tx)).unwrap();
        assert_eq!(decoded, tx.message_data());
    }
}
