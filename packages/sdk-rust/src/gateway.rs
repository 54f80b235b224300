//! Gateway session contract.
//!
//! A gateway session is the external instruction-building library: it
//! accumulates protocol operations, quotes each one as it is appended and
//! finally partitions everything into transaction bundles. The SDK never
//! encodes protocol instructions itself; it only drives a session.

use async_trait::async_trait;
use serde::Serialize;
use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    message::Message,
    pubkey::Pubkey,
    transaction::Transaction,
};

use crate::error::{Error, Result};
use crate::state::pubkey_str;
use crate::types::Protocol;

// ─── Step parameters ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapParams {
    pub protocol:     Protocol,
    #[serde(with = "pubkey_str")]
    pub from_mint:    Pubkey,
    #[serde(with = "pubkey_str")]
    pub to_mint:      Pubkey,
    pub amount:       u64,
    pub slippage_bps: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddLiquidityParams {
    pub protocol:        Protocol,
    #[serde(with = "pubkey_str")]
    pub pool_id:         Pubkey,
    /// Leg `token_in_amount` is denominated in; the gateway pairs the other leg.
    #[serde(with = "pubkey_str")]
    pub token_in_mint:   Pubkey,
    pub token_in_amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoveLiquidityParams {
    pub protocol: Protocol,
    #[serde(with = "pubkey_str")]
    pub pool_id:  Pubkey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StakeParams {
    pub protocol:    Protocol,
    #[serde(with = "pubkey_str")]
    pub position_id: Pubkey,
    pub version:     u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnstakeParams {
    pub protocol:     Protocol,
    #[serde(with = "pubkey_str")]
    pub position_id:  Pubkey,
    pub share_amount: u64,
    pub version:      u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarvestParams {
    pub protocol:    Protocol,
    #[serde(with = "pubkey_str")]
    pub position_id: Pubkey,
    pub version:     u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepositParams {
    pub protocol:       Protocol,
    #[serde(with = "pubkey_str")]
    pub vault_id:       Pubkey,
    pub deposit_amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WithdrawParams {
    pub protocol:        Protocol,
    #[serde(with = "pubkey_str")]
    pub vault_id:        Pubkey,
    pub withdraw_amount: u64,
}

// ─── Bundles ──────────────────────────────────────────────────────────────────

/// An unsigned group of instructions destined to become one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionBundle {
    pub instructions: Vec<Instruction>,
}

impl TransactionBundle {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// Attach the fee payer and recent blockhash, producing an unsigned
    /// transaction ready for the wallet.
    pub fn to_transaction(&self, fee_payer: &Pubkey, blockhash: Hash) -> Transaction {
        let message = Message::new_with_blockhash(&self.instructions, Some(fee_payer), &blockhash);
        Transaction::new_unsigned(message)
    }
}

// ─── Session contract ─────────────────────────────────────────────────────────

/// A stateful, append-only builder of protocol operations.
///
/// Every append is a round-trip that quotes the operation against current
/// chain/router state and updates [`GatewaySession::last_output`] before it
/// returns. Operations accumulate in call order. `finalize` is terminal and
/// `transactions` is only valid after it.
#[async_trait]
pub trait GatewaySession: Send {
    async fn swap(&mut self, params: &SwapParams) -> Result<()>;
    async fn add_liquidity(&mut self, params: &AddLiquidityParams) -> Result<()>;
    async fn remove_liquidity(&mut self, params: &RemoveLiquidityParams) -> Result<()>;
    async fn stake(&mut self, params: &StakeParams) -> Result<()>;
    async fn unstake(&mut self, params: &UnstakeParams) -> Result<()>;
    async fn harvest(&mut self, params: &HarvestParams) -> Result<()>;
    async fn deposit(&mut self, params: &DepositParams) -> Result<()>;
    async fn withdraw(&mut self, params: &WithdrawParams) -> Result<()>;

    /// Realized (quoted minimum) output of the most recently appended step.
    fn last_output(&self) -> u64;

    /// Partition the accumulated operations into transaction bundles.
    async fn finalize(&mut self) -> Result<()>;

    /// Bundles produced by the last `finalize`.
    fn transactions(&self) -> Result<Vec<TransactionBundle>>;
}

/// Wraps a session and turns lifecycle misuse into typed errors.
pub struct GuardedSession<G> {
    inner:     G,
    finalized: bool,
}

impl<G: GatewaySession> GuardedSession<G> {
    pub fn new(inner: G) -> Self {
        Self { inner, finalized: false }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn into_inner(self) -> G {
        self.inner
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finalized {
            return Err(Error::SessionFinalized);
        }
        Ok(())
    }
}

#[async_trait]
impl<G: GatewaySession> GatewaySession for GuardedSession<G> {
    async fn swap(&mut self, params: &SwapParams) -> Result<()> {
        self.ensure_open()?;
        self.inner.swap(params).await
    }

    async fn add_liquidity(&mut self, params: &AddLiquidityParams) -> Result<()> {
        self.ensure_open()?;
        self.inner.add_liquidity(params).await
    }

    async fn remove_liquidity(&mut self, params: &RemoveLiquidityParams) -> Result<()> {
        self.ensure_open()?;
        self.inner.remove_liquidity(params).await
    }

    async fn stake(&mut self, params: &StakeParams) -> Result<()> {
        self.ensure_open()?;
        self.inner.stake(params).await
    }

    async fn unstake(&mut self, params: &UnstakeParams) -> Result<()> {
        self.ensure_open()?;
        self.inner.unstake(params).await
    }

    async fn harvest(&mut self, params: &HarvestParams) -> Result<()> {
        self.ensure_open()?;
        self.inner.harvest(params).await
    }

    async fn deposit(&mut self, params: &DepositParams) -> Result<()> {
        self.ensure_open()?;
        self.inner.deposit(params).await
    }

    async fn withdraw(&mut self, params: &WithdrawParams) -> Result<()> {
        self.ensure_open()?;
        self.inner.withdraw(params).await
    }

    fn last_output(&self) -> u64 {
        self.inner.last_output()
    }

    async fn finalize(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.inner.finalize().await?;
        self.finalized = true;
        Ok(())
    }

    fn transactions(&self) -> Result<Vec<TransactionBundle>> {
        if !self.finalized {
            return Err(Error::SessionNotFinalized);
        }
        self.inner.transactions()
    }
}
