//! Registry file format and SPL account deserialization.
//!
//! The registry is the static catalogue of positions and pools (addresses,
//! mints, vault accounts). Reserves, LP supply and ledger balances are read
//! from chain by [`crate::source::RegistrySource`] using the parsers below.

use std::path::Path;

use serde::{Deserialize, Serialize};
use solana_sdk::{pubkey, pubkey::Pubkey};

use crate::error::{Error, Result};
use crate::types::{LedgerLayout, Pool, Position, PositionKind, Protocol, ZapConfig};

// ─── Well-known program IDs ───────────────────────────────────────────────────

pub const SPL_TOKEN_PROGRAM_ID: Pubkey = pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
pub const ATA_PROGRAM_ID: Pubkey = pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

/// Derive the Associated Token Account for a wallet + mint.
pub fn derive_ata(wallet: &Pubkey, mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[wallet.as_ref(), SPL_TOKEN_PROGRAM_ID.as_ref(), mint.as_ref()],
        &ATA_PROGRAM_ID,
    )
    .0
}

// ─── Registry ─────────────────────────────────────────────────────────────────

/// Static description of a pool; live reserves are fetched separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRecord {
    #[serde(with = "pubkey_str")]
    pub id:           Pubkey,
    pub protocol:     Protocol,
    #[serde(with = "pubkey_str")]
    pub token_a_mint: Pubkey,
    #[serde(with = "pubkey_str")]
    pub token_b_mint: Pubkey,
    #[serde(with = "pubkey_str")]
    pub lp_mint:      Pubkey,
    /// SPL token account holding the pool's token A reserve.
    #[serde(with = "pubkey_str")]
    pub vault_a:      Pubkey,
    /// SPL token account holding the pool's token B reserve.
    #[serde(with = "pubkey_str")]
    pub vault_b:      Pubkey,
}

impl PoolRecord {
    pub fn with_reserves(&self, reserve_a: u64, reserve_b: u64, lp_supply: u64) -> Pool {
        Pool {
            id:           self.id,
            protocol:     self.protocol,
            token_a_mint: self.token_a_mint,
            token_b_mint: self.token_b_mint,
            lp_mint:      self.lp_mint,
            reserve_a,
            reserve_b,
            lp_supply,
        }
    }
}

/// Registry file: zap settings plus the position and pool catalogue.
///
/// ```json
/// {
///   "zap":       { "canonical_mint": "EPjF…Dt1v", "zap_in_slippage_bps": 100 },
///   "pools":     [ { "id": "…", "protocol": "raydium", "token_a_mint": "…", … } ],
///   "positions": [ { "id": "…", "kind": { "farm": { "version": 5 } }, … } ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default)]
    pub zap:       ZapConfig,
    #[serde(default)]
    pub pools:     Vec<PoolRecord>,
    #[serde(default)]
    pub positions: Vec<Position>,
}

impl Registry {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn position(&self, id: &Pubkey) -> Result<&Position> {
        self.positions
            .iter()
            .find(|p| p.id == *id)
            .ok_or(Error::PositionNotFound(*id))
    }
}

// ─── Position ledgers ─────────────────────────────────────────────────────────

/// Farmer account seed for farm versions 3 to 5.
const FARMER_SEED_V5: &[u8] = b"staker_info_v2_associated_seed";
/// Farmer account seed for farm version 6.
const FARMER_SEED_V6: &[u8] = b"farmer_info_associated_seed";

/// `amount` in a packed SPL token account.
const TOKEN_AMOUNT_OFFSET: usize = 64;

/// An owner's ledger account for one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerAccount {
    pub address:       Pubkey,
    /// Byte offset of the little-endian u64 share amount.
    pub amount_offset: usize,
}

impl LedgerAccount {
    /// Share amount recorded in the account's `data`.
    pub fn amount(&self, data: &[u8]) -> Result<u64> {
        read_u64(data, self.amount_offset)
    }
}

/// Locate `owner`'s ledger for `position`.
///
/// Farmer accounts live at `[farm_id, owner, seed]` under the farm program:
/// - v3 to v5: `state(8) id(32) owner(32) deposited(8) …`
/// - v6: `discriminator(8) state(8) id(32) owner(32) deposited(8) …`
pub fn ledger_account(position: &Position, owner: &Pubkey) -> Result<LedgerAccount> {
    match &position.ledger {
        LedgerLayout::Farmer { program } => {
            let (seed, amount_offset) = match position.kind {
                PositionKind::Farm { version: 3..=5 } => (FARMER_SEED_V5, 72),
                PositionKind::Farm { version: 6 } => (FARMER_SEED_V6, 80),
                PositionKind::Farm { version } => {
                    return Err(Error::InvalidArgument(format!(
                        "farm version {version} has no known farmer ledger layout"
                    )))
                }
                PositionKind::Vault => {
                    return Err(Error::InvalidArgument(format!(
                        "vault {} cannot use a farmer ledger",
                        position.id
                    )))
                }
            };
            let address = find_ledger_address(&[position.id.as_ref(), owner.as_ref(), seed], program)?;
            Ok(LedgerAccount { address, amount_offset })
        }
        LedgerLayout::Depositor { program, seed, amount_offset } => {
            let address = find_ledger_address(
                &[position.id.as_ref(), owner.as_ref(), seed.as_bytes()],
                program,
            )?;
            Ok(LedgerAccount { address, amount_offset: *amount_offset })
        }
        LedgerLayout::Token { mint } => Ok(LedgerAccount {
            address:       derive_ata(owner, mint),
            amount_offset: TOKEN_AMOUNT_OFFSET,
        }),
    }
}

fn find_ledger_address(seeds: &[&[u8]], program: &Pubkey) -> Result<Pubkey> {
    Pubkey::try_find_program_address(seeds, program)
        .map(|(address, _)| address)
        .ok_or_else(|| Error::InvalidArgument(format!("no ledger address derivable under {program}")))
}

// ─── SPL token account ────────────────────────────────────────────────────────

/// The fields of a packed SPL token account the SDK reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAccount {
    pub mint:   Pubkey,
    pub owner:  Pubkey,
    pub amount: u64,
}

/// Deserialize a packed SPL token account.
///
/// Token account layout: `mint(32) owner(32) amount(8) …`
pub fn parse_token_account(data: &[u8]) -> Result<TokenAccount> {
    if data.len() < 72 {
        return Err(Error::ParseError {
            offset: 64,
            reason: format!("Token account is {} bytes; need at least 72", data.len()),
        });
    }
    Ok(TokenAccount {
        mint:   read_pubkey(data, 0)?,
        owner:  read_pubkey(data, 32)?,
        amount: read_u64(data, TOKEN_AMOUNT_OFFSET)?,
    })
}

/// Read the `supply` field from a packed SPL mint.
///
/// Mint layout: `mint_authority(4 + 32) supply(8) decimals(1) …`
pub fn parse_mint_supply(data: &[u8]) -> Result<u64> {
    if data.len() < 44 {
        return Err(Error::ParseError {
            offset: 36,
            reason: format!("Mint account is {} bytes; need at least 44", data.len()),
        });
    }
    read_u64(data, 36)
}

// ─── Byte-slice primitives ────────────────────────────────────────────────────

pub(crate) fn read_pubkey(data: &[u8], offset: usize) -> Result<Pubkey> {
    let b: [u8; 32] = data
        .get(offset..offset + 32)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| Error::ParseError {
            offset,
            reason: "slice too short for Pubkey (32 bytes)".into(),
        })?;
    Ok(Pubkey::from(b))
}

pub(crate) fn read_u64(data: &[u8], offset: usize) -> Result<u64> {
    let b: [u8; 8] = data
        .get(offset..offset + 8)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| Error::ParseError { offset, reason: "slice too short for u64".into() })?;
    Ok(u64::from_le_bytes(b))
}

// ─── Serde helpers ────────────────────────────────────────────────────────────

/// Serialize a `Pubkey` as its base-58 string rather than a byte array.
pub(crate) mod pubkey_str {
    use std::str::FromStr;

    use serde::{Deserialize, Deserializer, Serializer};
    use solana_sdk::pubkey::Pubkey;

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(key)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Pubkey::from_str(&raw).map_err(serde::de::Error::custom)
    }
}
