//! Zap plans.
//!
//! A plan is an ordered list of [`StepTemplate`]s. Amounts that depend on an
//! earlier step are [`AmountSlot`]s, and only [`StepTemplate::bind`] turns a
//! template into a [`ZapStep`] with concrete amounts. Sessions accept
//! `ZapStep`s only, so an unresolved amount can never be appended.
//!
//! [`execute_plan`] walks the plan strictly left to right: bind from the
//! previous output, append, await, read the new output. Step *n + 1* cannot be
//! sized before step *n* is quoted, so there is no reordering or parallelism.

use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::gateway::{
    AddLiquidityParams, DepositParams, GatewaySession, HarvestParams, RemoveLiquidityParams,
    StakeParams, SwapParams, UnstakeParams, WithdrawParams,
};
use crate::math::{add_leg, half, token_amounts};
use crate::types::{
    EntryOp, ExitOp, Pool, Position, Protocol, ZapConfig, ZapDirection,
};

// ─── Bound steps ──────────────────────────────────────────────────────────────

/// One protocol operation with every amount resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ZapStep {
    Swap(SwapParams),
    AddLiquidity(AddLiquidityParams),
    RemoveLiquidity(RemoveLiquidityParams),
    Stake(StakeParams),
    Unstake(UnstakeParams),
    Harvest(HarvestParams),
    Deposit(DepositParams),
    Withdraw(WithdrawParams),
}

impl ZapStep {
    pub fn name(&self) -> &'static str {
        match self {
            ZapStep::Swap(_)            => "swap",
            ZapStep::AddLiquidity(_)    => "add_liquidity",
            ZapStep::RemoveLiquidity(_) => "remove_liquidity",
            ZapStep::Stake(_)           => "stake",
            ZapStep::Unstake(_)         => "unstake",
            ZapStep::Harvest(_)         => "harvest",
            ZapStep::Deposit(_)         => "deposit",
            ZapStep::Withdraw(_)        => "withdraw",
        }
    }

    /// Append this step to `session`.
    pub async fn append_to<G: GatewaySession + ?Sized>(&self, session: &mut G) -> Result<()> {
        match self {
            ZapStep::Swap(p)            => session.swap(p).await,
            ZapStep::AddLiquidity(p)    => session.add_liquidity(p).await,
            ZapStep::RemoveLiquidity(p) => session.remove_liquidity(p).await,
            ZapStep::Stake(p)           => session.stake(p).await,
            ZapStep::Unstake(p)         => session.unstake(p).await,
            ZapStep::Harvest(p)         => session.harvest(p).await,
            ZapStep::Deposit(p)         => session.deposit(p).await,
            ZapStep::Withdraw(p)        => session.withdraw(p).await,
        }
    }
}

// ─── Unbound steps ────────────────────────────────────────────────────────────

/// An amount that is either known at planning time or derived from the
/// previous step's resolved output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountSlot {
    Known(u64),
    /// Floor of half the previous output.
    HalfOfPrevious,
    AllOfPrevious,
    /// Previous output plus a pre-computed leg.
    PreviousPlus(u64),
}

impl AmountSlot {
    fn resolve(self, previous: Option<u64>, step: &'static str) -> Result<u64> {
        let previous = || previous.ok_or(Error::UnresolvedAmount { step });
        match self {
            AmountSlot::Known(amount)       => Ok(amount),
            AmountSlot::HalfOfPrevious      => Ok(half(previous()?)),
            AmountSlot::AllOfPrevious       => previous(),
            AmountSlot::PreviousPlus(extra) => add_leg(previous()?, extra),
        }
    }
}

/// A step whose dependent amounts are still [`AmountSlot`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepTemplate {
    Swap {
        protocol:     Protocol,
        from_mint:    Pubkey,
        to_mint:      Pubkey,
        amount:       AmountSlot,
        slippage_bps: u16,
    },
    AddLiquidity {
        protocol:        Protocol,
        pool_id:         Pubkey,
        token_in_mint:   Pubkey,
        token_in_amount: AmountSlot,
    },
    RemoveLiquidity {
        protocol: Protocol,
        pool_id:  Pubkey,
    },
    Stake {
        protocol:    Protocol,
        position_id: Pubkey,
        version:     u8,
    },
    Unstake {
        protocol:     Protocol,
        position_id:  Pubkey,
        share_amount: u64,
        version:      u8,
    },
    Harvest {
        protocol:    Protocol,
        position_id: Pubkey,
        version:     u8,
    },
    Deposit {
        protocol:       Protocol,
        vault_id:       Pubkey,
        deposit_amount: AmountSlot,
    },
    Withdraw {
        protocol:        Protocol,
        vault_id:        Pubkey,
        withdraw_amount: u64,
    },
}

impl StepTemplate {
    /// Fill every slot from `previous` (the last resolved output, `None`
    /// before the first append).
    pub fn bind(self, previous: Option<u64>) -> Result<ZapStep> {
        Ok(match self {
            StepTemplate::Swap { protocol, from_mint, to_mint, amount, slippage_bps } => {
                ZapStep::Swap(SwapParams {
                    protocol,
                    from_mint,
                    to_mint,
                    amount: amount.resolve(previous, "swap")?,
                    slippage_bps,
                })
            }
            StepTemplate::AddLiquidity { protocol, pool_id, token_in_mint, token_in_amount } => {
                ZapStep::AddLiquidity(AddLiquidityParams {
                    protocol,
                    pool_id,
                    token_in_mint,
                    token_in_amount: token_in_amount.resolve(previous, "add_liquidity")?,
                })
            }
            StepTemplate::RemoveLiquidity { protocol, pool_id } => {
                ZapStep::RemoveLiquidity(RemoveLiquidityParams { protocol, pool_id })
            }
            StepTemplate::Stake { protocol, position_id, version } => {
                ZapStep::Stake(StakeParams { protocol, position_id, version })
            }
            StepTemplate::Unstake { protocol, position_id, share_amount, version } => {
                ZapStep::Unstake(UnstakeParams { protocol, position_id, share_amount, version })
            }
            StepTemplate::Harvest { protocol, position_id, version } => {
                ZapStep::Harvest(HarvestParams { protocol, position_id, version })
            }
            StepTemplate::Deposit { protocol, vault_id, deposit_amount } => {
                ZapStep::Deposit(DepositParams {
                    protocol,
                    vault_id,
                    deposit_amount: deposit_amount.resolve(previous, "deposit")?,
                })
            }
            StepTemplate::Withdraw { protocol, vault_id, withdraw_amount } => {
                ZapStep::Withdraw(WithdrawParams { protocol, vault_id, withdraw_amount })
            }
        })
    }
}

/// A template plus whether its failure may be skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub template:    StepTemplate,
    /// A failed append is logged and the plan carries on.
    pub best_effort: bool,
}

impl From<StepTemplate> for PlannedStep {
    fn from(template: StepTemplate) -> Self {
        Self { template, best_effort: false }
    }
}

/// Ordered steps for one user action. Consumed by [`execute_plan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZapPlan {
    direction: ZapDirection,
    steps:     Vec<PlannedStep>,
}

impl ZapPlan {
    pub fn direction(&self) -> ZapDirection {
        self.direction
    }

    pub fn steps(&self) -> &[PlannedStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

// ─── Planning ─────────────────────────────────────────────────────────────────

fn swap(
    config: &ZapConfig,
    from_mint: Pubkey,
    to_mint: Pubkey,
    amount: AmountSlot,
    slippage_bps: u16,
) -> StepTemplate {
    StepTemplate::Swap { protocol: config.swap_protocol, from_mint, to_mint, amount, slippage_bps }
}

/// Plan a zap from `entry_amount` of the canonical asset into `position`.
///
/// Two-hop path: swap all of it into token A, swap half of what comes out
/// into token B, add liquidity with the token B output, then stake or
/// deposit. When one pool leg already is the canonical asset only half of the
/// entry amount is swapped (into the other leg) and the second swap is
/// dropped. That check is on mint equality, before anything is appended.
pub fn zap_in_plan(
    position: &Position,
    pool: &Pool,
    entry_amount: u64,
    config: &ZapConfig,
) -> Result<ZapPlan> {
    if entry_amount == 0 {
        return Err(Error::InvalidArgument("zap-in amount must be > 0".into()));
    }
    if !pool.has_liquidity() {
        return Err(Error::NoLiquidity(pool.id));
    }

    let canonical = config.canonical_mint;
    let slippage = config.zap_in_slippage_bps;
    let mut steps: Vec<PlannedStep> = Vec::with_capacity(4);

    let token_in_mint = if pool.token_b_mint == canonical {
        steps.push(swap(config, canonical, pool.token_a_mint, AmountSlot::Known(half(entry_amount)), slippage).into());
        pool.token_a_mint
    } else if pool.token_a_mint == canonical {
        steps.push(swap(config, canonical, pool.token_b_mint, AmountSlot::Known(half(entry_amount)), slippage).into());
        pool.token_b_mint
    } else {
        steps.push(swap(config, canonical, pool.token_a_mint, AmountSlot::Known(entry_amount), slippage).into());
        steps.push(swap(config, pool.token_a_mint, pool.token_b_mint, AmountSlot::HalfOfPrevious, slippage).into());
        pool.token_b_mint
    };

    steps.push(
        StepTemplate::AddLiquidity {
            protocol:        pool.protocol,
            pool_id:         pool.id,
            token_in_mint,
            token_in_amount: AmountSlot::AllOfPrevious,
        }
        .into(),
    );

    let entry = match position.kind.capabilities().entry {
        EntryOp::Stake => StepTemplate::Stake {
            protocol:    position.protocol,
            position_id: position.id,
            version:     position.kind.version(),
        },
        EntryOp::Deposit => StepTemplate::Deposit {
            protocol:       position.protocol,
            vault_id:       position.id,
            deposit_amount: AmountSlot::AllOfPrevious,
        },
    };
    steps.push(entry.into());

    Ok(ZapPlan { direction: ZapDirection::In, steps })
}

/// Plan a zap of `share_amount` shares of `position` back into the canonical
/// asset.
///
/// Swap legs are sized from [`token_amounts`] at planning time, not from the
/// removal's on-chain result; reserve drift in between is covered only by
/// swap slippage.
pub fn zap_out_plan(
    position: &Position,
    pool: &Pool,
    share_amount: u64,
    config: &ZapConfig,
) -> Result<ZapPlan> {
    if share_amount == 0 {
        return Err(Error::NothingToWithdraw(position.id));
    }
    if !pool.has_liquidity() {
        return Err(Error::NoLiquidity(pool.id));
    }

    let canonical = config.canonical_mint;
    let slippage = config.zap_out_slippage_bps;
    let caps = position.kind.capabilities();
    let version = position.kind.version();
    let legs = token_amounts(share_amount, pool);
    let mut steps: Vec<PlannedStep> = Vec::with_capacity(5);

    if caps.harvest {
        steps.push(PlannedStep {
            template: StepTemplate::Harvest {
                protocol:    position.protocol,
                position_id: position.id,
                version,
            },
            best_effort: true,
        });
    }

    let exit = match caps.exit {
        ExitOp::Unstake => StepTemplate::Unstake {
            protocol:    position.protocol,
            position_id: position.id,
            share_amount,
            version,
        },
        ExitOp::Withdraw => StepTemplate::Withdraw {
            protocol:        position.protocol,
            vault_id:        position.id,
            withdraw_amount: share_amount,
        },
    };
    steps.push(exit.into());
    steps.push(StepTemplate::RemoveLiquidity { protocol: pool.protocol, pool_id: pool.id }.into());

    if pool.token_b_mint == canonical {
        steps.push(swap(config, pool.token_a_mint, pool.token_b_mint, AmountSlot::Known(legs.token_a), slippage).into());
    } else if pool.token_a_mint == canonical {
        steps.push(swap(config, pool.token_b_mint, pool.token_a_mint, AmountSlot::Known(legs.token_b), slippage).into());
    } else {
        steps.push(swap(config, pool.token_b_mint, pool.token_a_mint, AmountSlot::Known(legs.token_b), slippage).into());
        steps.push(swap(config, pool.token_a_mint, canonical, AmountSlot::PreviousPlus(legs.token_a), slippage).into());
    }

    Ok(ZapPlan { direction: ZapDirection::Out, steps })
}

// ─── Execution ────────────────────────────────────────────────────────────────

/// Append every step of `plan` to `session`, threading each resolved output
/// into the next step. Returns the bound steps actually appended.
pub async fn execute_plan<G: GatewaySession + ?Sized>(
    session: &mut G,
    plan: ZapPlan,
) -> Result<Vec<ZapStep>> {
    let direction = plan.direction;
    let mut previous: Option<u64> = None;
    let mut resolved = Vec::with_capacity(plan.steps.len());

    for (index, planned) in plan.steps.into_iter().enumerate() {
        let step = planned.template.bind(previous)?;
        debug!(%direction, index, step = step.name(), "appending step");

        if let Err(e) = step.append_to(session).await {
            if planned.best_effort {
                warn!(%direction, index, step = step.name(), error = %e, "best-effort step skipped");
                continue;
            }
            return Err(e);
        }

        let output = session.last_output();
        debug!(%direction, index, step = step.name(), output, "step resolved");
        previous = Some(output);
        resolved.push(step);
    }

    Ok(resolved)
}
