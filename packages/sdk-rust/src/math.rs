//! Amount resolution.
//!
//! Pure functions that size zap legs from pool reserves. All division floors;
//! no function here touches the network.

use crate::error::{Error, Result};
use crate::types::{Pool, TokenAmounts};

// ─── Constants ────────────────────────────────────────────────────────────────

/// Basis-point denominator for slippage and share fractions.
pub const BPS_DENOMINATOR: u128 = 10_000;

// ─── Share → token split ──────────────────────────────────────────────────────

/// Split `share_amount` LP/share units into the pool's two token legs.
///
/// `token_x = share_amount × reserve_x / lp_supply`, floored. A pool with no
/// LP supply or no reserves yields `{0, 0}` instead of an error; nothing can be
/// zapped through it and callers check [`Pool::has_liquidity`] up front.
///
/// This is a point-in-time read: reserves may move before the removal lands.
pub fn token_amounts(share_amount: u64, pool: &Pool) -> TokenAmounts {
    if pool.lp_supply == 0 || (pool.reserve_a == 0 && pool.reserve_b == 0) {
        return TokenAmounts::default();
    }
    TokenAmounts {
        token_a: proportion(share_amount, pool.reserve_a, pool.lp_supply),
        token_b: proportion(share_amount, pool.reserve_b, pool.lp_supply),
    }
}

/// `amount × numerator / denominator` in u128, saturating at `u64::MAX`.
fn proportion(amount: u64, numerator: u64, denominator: u64) -> u64 {
    let scaled = amount as u128 * numerator as u128 / denominator as u128;
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

// ─── Leg sizing ───────────────────────────────────────────────────────────────

/// Floor of half; the other half stays with the caller.
pub fn half(amount: u64) -> u64 {
    amount / 2
}

/// `amount × bps / 10_000`, floored. `bps` above 10 000 is rejected.
pub fn share_of(amount: u64, bps: u16) -> Result<u64> {
    if bps as u128 > BPS_DENOMINATOR {
        return Err(Error::InvalidArgument(format!(
            "share fraction {bps} bps exceeds 10000"
        )));
    }
    Ok((amount as u128 * bps as u128 / BPS_DENOMINATOR) as u64)
}

/// Slippage floor: `estimated − estimated × slippage_bps / 10_000`.
pub fn min_amount_out(estimated: u64, slippage_bps: u16) -> u64 {
    let cut = estimated as u128 * slippage_bps.min(10_000) as u128 / BPS_DENOMINATOR;
    estimated.saturating_sub(cut as u64)
}

/// Checked `a + b` for threading a pre-computed leg into a resolved output.
pub fn add_leg(resolved: u64, precomputed: u64) -> Result<u64> {
    resolved.checked_add(precomputed).ok_or(Error::MathOverflow)
}
