//! Positions, pools and zap configuration.

use std::fmt;

use serde::{Deserialize, Serialize};
use solana_sdk::{commitment_config::CommitmentLevel, pubkey, pubkey::Pubkey};

use crate::state::pubkey_str;

// ─── Well-known mints (mainnet-beta) ─────────────────────────────────────────

pub const USDC_MINT: Pubkey = pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
pub const WSOL_MINT: Pubkey = pubkey!("So11111111111111111111111111111111111111112");

// ─── Protocols ───────────────────────────────────────────────────────────────

/// Protocol tag handed to the gateway for each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Jupiter,
    Raydium,
    Orca,
    Tulip,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Protocol::Jupiter => "jupiter",
            Protocol::Raydium => "raydium",
            Protocol::Orca    => "orca",
            Protocol::Tulip   => "tulip",
        };
        f.write_str(name)
    }
}

// ─── Positions ───────────────────────────────────────────────────────────────

/// Whether a position is a staking farm or a deposit vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionKind {
    /// Farm program; `version` selects the farm program layout.
    Farm { version: u8 },
    Vault,
}

/// How a position is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOp {
    Stake,
    Deposit,
}

/// How a position is exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOp {
    Unstake,
    Withdraw,
}

/// The operations an asset class supports. The planner is written once
/// against this description instead of once per asset class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub entry:   EntryOp,
    pub exit:    ExitOp,
    pub harvest: bool,
}

impl PositionKind {
    pub fn capabilities(&self) -> Capabilities {
        match self {
            PositionKind::Farm { .. } => Capabilities {
                entry:   EntryOp::Stake,
                exit:    ExitOp::Unstake,
                harvest: true,
            },
            PositionKind::Vault => Capabilities {
                entry:   EntryOp::Deposit,
                exit:    ExitOp::Withdraw,
                harvest: false,
            },
        }
    }

    /// Farm program version; vaults are unversioned.
    pub fn version(&self) -> u8 {
        match self {
            PositionKind::Farm { version } => *version,
            PositionKind::Vault => 0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PositionKind::Farm { .. } => "farm",
            PositionKind::Vault => "vault",
        }
    }
}

/// Where a position records an owner's share balance.
///
/// Staked LP leaves the wallet, so farms and vaults keep a per-owner account
/// under their own program; only receipt-token positions read a token account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerLayout {
    /// Farm program farmer account. Seed and amount offset follow the
    /// position's farm version.
    Farmer {
        #[serde(with = "pubkey_str")]
        program: Pubkey,
    },
    /// Vault depositor account at `[position_id, owner, seed]` under `program`,
    /// share amount as a little-endian u64 at `amount_offset`.
    Depositor {
        #[serde(with = "pubkey_str")]
        program:       Pubkey,
        seed:          String,
        amount_offset: usize,
    },
    /// Receipt tokens in the owner's associated token account for `mint`.
    Token {
        #[serde(with = "pubkey_str")]
        mint: Pubkey,
    },
}

/// A farm or vault the user can zap into or out of.
///
/// Snapshot owned by the data source; refreshed per fetch, never streamed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(with = "pubkey_str")]
    pub id:         Pubkey,
    pub kind:       PositionKind,
    pub protocol:   Protocol,
    /// LP mint of the backing pool (the position's single underlying mint).
    #[serde(with = "pubkey_str")]
    pub lp_mint:    Pubkey,
    /// Where each owner's share balance is recorded.
    pub ledger:     LedgerLayout,
    /// Annualized yield estimate in percent. Derived, not authoritative.
    #[serde(default)]
    pub apr:        f64,
}

// ─── Pools ───────────────────────────────────────────────────────────────────

/// The two-asset liquidity pair backing a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    #[serde(with = "pubkey_str")]
    pub id:           Pubkey,
    pub protocol:     Protocol,
    #[serde(with = "pubkey_str")]
    pub token_a_mint: Pubkey,
    #[serde(with = "pubkey_str")]
    pub token_b_mint: Pubkey,
    #[serde(with = "pubkey_str")]
    pub lp_mint:      Pubkey,
    pub reserve_a:    u64,
    pub reserve_b:    u64,
    pub lp_supply:    u64,
}

impl Pool {
    /// `false` when either reserve or the LP supply is zero.
    pub fn has_liquidity(&self) -> bool {
        self.lp_supply > 0 && self.reserve_a > 0 && self.reserve_b > 0
    }

    pub fn contains_mint(&self, mint: &Pubkey) -> bool {
        self.token_a_mint == *mint || self.token_b_mint == *mint
    }
}

/// The owner's share balance in a position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    pub amount: u64,
}

/// Underlying token amounts for a share amount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmounts {
    pub token_a: u64,
    pub token_b: u64,
}

// ─── Requests & config ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZapDirection {
    In,
    Out,
}

impl fmt::Display for ZapDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ZapDirection::In  => "zap-in",
            ZapDirection::Out => "zap-out",
        })
    }
}

/// Parameters of a zap-out beyond the position itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZapOutRequest {
    /// Fraction of the ledger amount to exit, in basis points (10 000 = all).
    pub share_bps: u16,
}

impl Default for ZapOutRequest {
    fn default() -> Self {
        Self { share_bps: 10_000 }
    }
}

/// Knobs shared by every zap a client performs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZapConfig {
    /// Asset zaps start from (zap-in) and end in (zap-out).
    #[serde(with = "pubkey_str")]
    pub canonical_mint:       Pubkey,
    /// Router used for every swap step.
    pub swap_protocol:        Protocol,
    pub zap_in_slippage_bps:  u16,
    pub zap_out_slippage_bps: u16,
    /// Commitment each bundle is confirmed at.
    pub commitment:           CommitmentLevel,
    pub skip_preflight:       bool,
}

impl Default for ZapConfig {
    fn default() -> Self {
        Self {
            canonical_mint:       USDC_MINT,
            swap_protocol:        Protocol::Jupiter,
            zap_in_slippage_bps:  100,
            zap_out_slippage_bps: 300,
            commitment:           CommitmentLevel::Confirmed,
            skip_preflight:       false,
        }
    }
}
