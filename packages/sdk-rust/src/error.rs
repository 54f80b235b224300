//! SDK error type.

use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::TransactionError};

/// All errors returned by the zap SDK.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // ── RPC / network ────────────────────────────────────────────────────────
    /// A Solana JSON-RPC call failed.
    #[error("RPC error: {0}")]
    Rpc(#[from] solana_client::client_error::ClientError),

    /// The transaction landed but the runtime rejected it.
    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),

    /// The transport gave up waiting for the signature to reach the commitment.
    #[error("Transaction {0} was not confirmed")]
    Unconfirmed(Signature),

    // ── Preconditions ────────────────────────────────────────────────────────
    /// No signer identity is available to pay for and sign the bundles.
    #[error("Wallet not connected!")]
    WalletNotConnected,

    /// The backing pool has zero reserves or zero LP supply.
    #[error("Pool {0} has no liquidity")]
    NoLiquidity(Pubkey),

    /// The owner holds no shares in the position.
    #[error("Nothing to withdraw from position {0}")]
    NothingToWithdraw(Pubkey),

    // ── Gateway session ──────────────────────────────────────────────────────
    /// A gateway append call could not quote or simulate its operation.
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// An operation was appended (or finalize repeated) after `finalize()`.
    #[error("Gateway session already finalized")]
    SessionFinalized,

    /// `transactions()` was read before `finalize()`.
    #[error("Gateway session not finalized yet")]
    SessionNotFinalized,

    /// A step depends on the previous step's output but none exists.
    #[error("Step {step} depends on a previous output that was never resolved")]
    UnresolvedAmount { step: &'static str },

    /// `finalize()` produced no transaction bundles.
    #[error("Gateway session finalized without any transaction bundles")]
    EmptyBundleSet,

    // ── Signing ──────────────────────────────────────────────────────────────
    /// The wallet refused or failed to sign the bundles.
    #[error("Signing failed: {0}")]
    Signing(String),

    // ── Data source ──────────────────────────────────────────────────────────
    /// No pool in the data source shares the position's LP mint.
    #[error("No pool found for LP mint {0}")]
    PoolNotFound(Pubkey),

    /// The position id is unknown to the data source.
    #[error("Position {0} not found")]
    PositionNotFound(Pubkey),

    /// Raw account bytes could not be deserialized.
    #[error("Account parse error at offset {offset}: {reason}")]
    ParseError { offset: usize, reason: String },

    // ── Arithmetic ───────────────────────────────────────────────────────────
    #[error("Integer overflow in amount math")]
    MathOverflow,

    // ── Configuration ────────────────────────────────────────────────────────
    /// The registry JSON is malformed.
    #[error("Registry error: {0}")]
    Registry(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ── Validation ───────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Convenience alias so every module can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;
