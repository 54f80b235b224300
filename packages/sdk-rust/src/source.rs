//! Position and pool data.

use std::collections::HashMap;

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{account::Account, commitment_config::CommitmentConfig, pubkey::Pubkey};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::state::{ledger_account, parse_mint_supply, parse_token_account, PoolRecord, Registry};
use crate::types::{Ledger, Pool, Position};

/// `getMultipleAccounts` accepts at most 100 keys; 99 keeps pool triples whole.
const ACCOUNTS_PER_REQUEST: usize = 99;

/// Read-only view of positions, pools and balances.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn get_all_positions(&self) -> Result<Vec<Position>>;
    async fn get_all_pools(&self) -> Result<Vec<Pool>>;
    /// Share balance of `owner` in `position`; zero when no account exists.
    async fn get_ledger(&self, position: &Position, owner: &Pubkey) -> Result<Ledger>;
}

/// [`DataSource`] backed by a [`Registry`] file and live RPC reads.
///
/// Reserves are the SPL balances of each pool's two vaults, LP supply is the
/// LP mint's `supply`, the ledger is the owner's account described by the
/// position's [`LedgerLayout`](crate::types::LedgerLayout).
pub struct RegistrySource {
    rpc:      RpcClient,
    registry: Registry,
}

impl RegistrySource {
    pub fn new(rpc_url: impl Into<String>, registry: Registry) -> Self {
        let commitment = CommitmentConfig { commitment: registry.zap.commitment };
        Self { rpc: RpcClient::new_with_commitment(rpc_url.into(), commitment), registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    async fn refresh(&self, records: &[PoolRecord]) -> Result<Vec<Pool>> {
        let keys: Vec<Pubkey> = records
            .iter()
            .flat_map(|r| [r.vault_a, r.vault_b, r.lp_mint])
            .collect();

        let mut accounts = Vec::with_capacity(keys.len());
        for chunk in keys.chunks(ACCOUNTS_PER_REQUEST) {
            accounts.extend(self.rpc.get_multiple_accounts(chunk).await?);
        }

        let pools = records
            .iter()
            .zip(accounts.chunks(3))
            .filter_map(|(record, accs)| match pool_from_accounts(record, accs) {
                Ok(pool) => Some(pool),
                Err(e) => {
                    warn!(pool = %record.id, error = %e, "skipping pool");
                    None
                }
            })
            .collect::<Vec<_>>();

        debug!(requested = records.len(), loaded = pools.len(), "pools refreshed");
        Ok(pools)
    }
}

/// `accounts` is `[vault_a, vault_b, lp_mint]`.
fn pool_from_accounts(record: &PoolRecord, accounts: &[Option<Account>]) -> Result<Pool> {
    let [Some(vault_a), Some(vault_b), Some(lp_mint)] = accounts else {
        return Err(Error::ParseError { offset: 0, reason: "pool account missing".into() });
    };
    Ok(record.with_reserves(
        parse_token_account(&vault_a.data)?.amount,
        parse_token_account(&vault_b.data)?.amount,
        parse_mint_supply(&lp_mint.data)?,
    ))
}

#[async_trait]
impl DataSource for RegistrySource {
    async fn get_all_positions(&self) -> Result<Vec<Position>> {
        Ok(self.registry.positions.clone())
    }

    async fn get_all_pools(&self) -> Result<Vec<Pool>> {
        self.refresh(&self.registry.pools).await
    }

    async fn get_ledger(&self, position: &Position, owner: &Pubkey) -> Result<Ledger> {
        let ledger = ledger_account(position, owner)?;
        let account = self
            .rpc
            .get_account_with_commitment(&ledger.address, self.rpc.commitment())
            .await?
            .value;
        let amount = match account {
            Some(acc) => ledger.amount(&acc.data)?,
            None => 0,
        };
        debug!(position = %position.id, ledger = %ledger.address, amount, "ledger read");
        Ok(Ledger { amount })
    }
}

// ─── Joining ──────────────────────────────────────────────────────────────────

/// Pair each position with the pool sharing its LP mint.
///
/// Positions without a backing pool are dropped. Sorted by position id.
pub fn actionable_positions(positions: Vec<Position>, pools: &[Pool]) -> Vec<(Position, Pool)> {
    let by_lp: HashMap<Pubkey, &Pool> = pools.iter().map(|p| (p.lp_mint, p)).collect();

    let mut joined: Vec<(Position, Pool)> = positions
        .into_iter()
        .filter_map(|position| {
            let pool = by_lp.get(&position.lp_mint).map(|p| (*p).clone());
            if pool.is_none() {
                debug!(position = %position.id, lp_mint = %position.lp_mint, "no backing pool");
            }
            pool.map(|pool| (position, pool))
        })
        .collect();

    joined.sort_by_cached_key(|(position, _)| position.id.to_string());
    joined
}

/// Fetch positions and pools from `source` and join them.
pub async fn load_actionable<D: DataSource + ?Sized>(source: &D) -> Result<Vec<(Position, Pool)>> {
    let positions = source.get_all_positions().await?;
    let pools = source.get_all_pools().await?;
    Ok(actionable_positions(positions, &pools))
}

/// The pool backing `position`.
pub fn pool_for<'p>(position: &Position, pools: &'p [Pool]) -> Result<&'p Pool> {
    pools
        .iter()
        .find(|p| p.lp_mint == position.lp_mint)
        .ok_or(Error::PoolNotFound(position.lp_mint))
}
