//! Preview gateway session.
//!
//! Quotes every appended step with constant-product math over the registry's
//! live reserves so a zap plan can be resolved and printed without an
//! instruction-building gateway. It cannot produce transactions.

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use zap_sdk::{
    math::{min_amount_out, BPS_DENOMINATOR},
    token_amounts, AddLiquidityParams, DepositParams, Error, GatewaySession, HarvestParams, Pool,
    RemoveLiquidityParams, Result, StakeParams, SwapParams, TransactionBundle, UnstakeParams,
    WithdrawParams, ZapStep,
};

/// LP fee assumed for every swap hop, in basis points.
const SWAP_FEE_BPS: u128 = 25;

/// One appended step and the output it was quoted at.
#[derive(Debug, Clone)]
pub struct Quote {
    pub step:   ZapStep,
    pub output: u64,
}

pub struct EstimateSession {
    pools:  Vec<Pool>,
    last:   u64,
    quotes: Vec<Quote>,
}

impl EstimateSession {
    pub fn new(pools: Vec<Pool>) -> Self {
        Self { pools, last: 0, quotes: Vec::new() }
    }

    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    fn pool(&self, id: &Pubkey) -> Result<&Pool> {
        self.pools
            .iter()
            .find(|p| p.id == *id)
            .ok_or_else(|| Error::Gateway(format!("pool {id} is not in the registry")))
    }

    /// A registry pool holding both mints, as `(pool, from_is_a)`.
    fn route(&self, from: &Pubkey, to: &Pubkey) -> Result<(&Pool, bool)> {
        self.pools
            .iter()
            .filter(|p| p.has_liquidity())
            .find_map(|p| {
                if p.token_a_mint == *from && p.token_b_mint == *to {
                    Some((p, true))
                } else if p.token_b_mint == *from && p.token_a_mint == *to {
                    Some((p, false))
                } else {
                    None
                }
            })
            .ok_or_else(|| Error::Gateway(format!("no registry pool routes {from} → {to}")))
    }

    fn record(&mut self, step: ZapStep, output: u64) -> Result<()> {
        self.last = output;
        self.quotes.push(Quote { step, output });
        Ok(())
    }
}

/// `x·y=k` output after the LP fee.
fn constant_product_out(amount_in: u64, reserve_in: u64, reserve_out: u64) -> u64 {
    let after_fees = amount_in as u128 * (BPS_DENOMINATOR - SWAP_FEE_BPS) / BPS_DENOMINATOR;
    let r_in = reserve_in as u128;
    if r_in + after_fees == 0 {
        return 0;
    }
    (reserve_out as u128 * after_fees / (r_in + after_fees)) as u64
}

/// LP minted for `amount` of one leg, the other leg supplied pro rata.
fn lp_for_leg(amount: u64, leg_reserve: u64, lp_supply: u64) -> u64 {
    if leg_reserve == 0 {
        return 0;
    }
    (amount as u128 * lp_supply as u128 / leg_reserve as u128).min(u64::MAX as u128) as u64
}

#[async_trait]
impl GatewaySession for EstimateSession {
    async fn swap(&mut self, params: &SwapParams) -> Result<()> {
        let (pool, from_is_a) = self.route(&params.from_mint, &params.to_mint)?;
        let (reserve_in, reserve_out) = if from_is_a {
            (pool.reserve_a, pool.reserve_b)
        } else {
            (pool.reserve_b, pool.reserve_a)
        };
        let estimated = constant_product_out(params.amount, reserve_in, reserve_out);
        let output = min_amount_out(estimated, params.slippage_bps);
        self.record(ZapStep::Swap(params.clone()), output)
    }

    async fn add_liquidity(&mut self, params: &AddLiquidityParams) -> Result<()> {
        let pool = self.pool(&params.pool_id)?;
        let leg_reserve = if params.token_in_mint == pool.token_a_mint {
            pool.reserve_a
        } else if params.token_in_mint == pool.token_b_mint {
            pool.reserve_b
        } else {
            return Err(Error::Gateway(format!(
                "mint {} is not a leg of pool {}",
                params.token_in_mint, pool.id
            )));
        };
        let output = lp_for_leg(params.token_in_amount, leg_reserve, pool.lp_supply);
        self.record(ZapStep::AddLiquidity(params.clone()), output)
    }

    async fn remove_liquidity(&mut self, params: &RemoveLiquidityParams) -> Result<()> {
        // Output is the token A leg of the shares released by the previous step.
        let legs = token_amounts(self.last, self.pool(&params.pool_id)?);
        self.record(ZapStep::RemoveLiquidity(params.clone()), legs.token_a)
    }

    async fn stake(&mut self, params: &StakeParams) -> Result<()> {
        let staked = self.last;
        self.record(ZapStep::Stake(params.clone()), staked)
    }

    async fn unstake(&mut self, params: &UnstakeParams) -> Result<()> {
        self.record(ZapStep::Unstake(params.clone()), params.share_amount)
    }

    async fn harvest(&mut self, params: &HarvestParams) -> Result<()> {
        self.record(ZapStep::Harvest(params.clone()), 0)
    }

    async fn deposit(&mut self, params: &DepositParams) -> Result<()> {
        self.record(ZapStep::Deposit(params.clone()), params.deposit_amount)
    }

    async fn withdraw(&mut self, params: &WithdrawParams) -> Result<()> {
        self.record(ZapStep::Withdraw(params.clone()), params.withdraw_amount)
    }

    fn last_output(&self) -> u64 {
        self.last
    }

    async fn finalize(&mut self) -> Result<()> {
        Err(Error::Gateway("preview session cannot build transactions".into()))
    }

    fn transactions(&self) -> Result<Vec<TransactionBundle>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zap_sdk::{
        execute_plan, zap_in_plan, LedgerLayout, Position, PositionKind, Protocol, ZapConfig,
        USDC_MINT,
    };

    fn pool(a: Pubkey, b: Pubkey, ra: u64, rb: u64, lp: u64) -> Pool {
        Pool {
            id: Pubkey::new_unique(),
            protocol: Protocol::Raydium,
            token_a_mint: a,
            token_b_mint: b,
            lp_mint: Pubkey::new_unique(),
            reserve_a: ra,
            reserve_b: rb,
            lp_supply: lp,
        }
    }

    #[test]
    fn constant_product_quote() {
        // 1_000 in, fee 25 bps → 997 after fees; 100_000 × 997 / 100_997
        assert_eq!(constant_product_out(1_000, 100_000, 100_000), 987);
        assert_eq!(constant_product_out(0, 0, 0), 0);
    }

    #[tokio::test]
    async fn previews_a_direct_zap_in() {
        let token = Pubkey::new_unique();
        let target = pool(token, USDC_MINT, 1_000_000, 1_000_000, 1_000_000);
        let vault = Position {
            id: Pubkey::new_unique(),
            kind: PositionKind::Vault,
            protocol: Protocol::Tulip,
            lp_mint: target.lp_mint,
            ledger: LedgerLayout::Token { mint: target.lp_mint },
            apr: 0.0,
        };
        let plan = zap_in_plan(&vault, &target, 20_000, &ZapConfig::default()).unwrap();
        let mut session = EstimateSession::new(vec![target.clone()]);

        let steps = execute_plan(&mut session, plan).await.unwrap();

        assert_eq!(steps.len(), 3);
        let quotes = session.quotes();
        assert!(quotes[0].output > 0 && quotes[0].output < 10_000);
        // LP minted for the swapped leg at a 1:1 reserve/supply ratio
        assert_eq!(quotes[1].output, quotes[0].output);
        assert_eq!(quotes[2].output, quotes[1].output);
        assert!(session.finalize().await.is_err());
    }

    #[tokio::test]
    async fn unknown_route_is_a_gateway_error() {
        let mut session = EstimateSession::new(Vec::new());
        let params = SwapParams {
            protocol:     Protocol::Jupiter,
            from_mint:    USDC_MINT,
            to_mint:      Pubkey::new_unique(),
            amount:       1,
            slippage_bps: 0,
        };
        assert!(matches!(session.swap(&params).await, Err(Error::Gateway(_))));
    }
}
