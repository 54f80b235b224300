//! Zap SDK
//!
//! Orchestrates multi-protocol "zaps" on Solana: one canonical asset in, a
//! farm or vault position out (and back), with a single wallet prompt per
//! action. Protocol instructions come from an external gateway session; this
//! crate plans the steps, threads each step's quoted output into the next,
//! and broadcasts the resulting bundles in order.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use zap_sdk::{load_actionable, GatewaySession, RegistrySource, Registry, ZapClient, ZapOutRequest};
//! use solana_sdk::signature::read_keypair_file;
//!
//! async fn run<G: GatewaySession>(new_session: impl Fn() -> G) -> Result<(), Box<dyn std::error::Error>> {
//!     let rpc      = "https://api.mainnet-beta.solana.com";
//!     let registry = Registry::load("registry.json")?;
//!     let keypair  = read_keypair_file("wallet.json")?;
//!     let client   = ZapClient::from_rpc(rpc, keypair, registry.zap.clone());
//!     let source   = RegistrySource::new(rpc, registry);
//!
//!     let (position, pool) = load_actionable(&source).await?.remove(0);
//!
//!     // 1. 10 USDC into the position
//!     let zap = client.zap_in(new_session(), &position, &pool, 10_000_000).await?;
//!     println!("zap-in: {} steps, {} bundles confirmed", zap.steps.len(), zap.report.confirmed_count());
//!
//!     // 2. Half of it back out
//!     let request = ZapOutRequest { share_bps: 5_000 };
//!     let zap = client.zap_out(new_session(), &source, &position, &pool, request).await?;
//!     println!("zap-out complete: {}", zap.report.all_confirmed());
//!     Ok(())
//! }
//! ```
//!
//! # Feature Overview
//!
//! | Item | Description |
//! |------|-------------|
//! | [`ZapClient::zap_in`] | Canonical asset → LP → stake / deposit |
//! | [`ZapClient::zap_out`] | Harvest → unstake / withdraw → remove liquidity → canonical asset |
//! | [`zap_in_plan`] / [`zap_out_plan`] | Build a plan without touching the network |
//! | [`execute_plan`] | Resolve a plan against any [`GatewaySession`] |
//! | [`Broadcaster`] | Batch-sign, then send and confirm bundles in order |
//! | [`token_amounts`] | Split LP shares into the pool's two legs |
//! | [`RegistrySource`] | Positions and pools from a registry file plus RPC |
//! | [`ledger_account`] | Locate an owner's farmer, depositor or token ledger |

pub mod broadcast;
pub mod client;
pub mod error;
pub mod gateway;
pub mod math;
pub mod notify;
pub mod plan;
pub mod source;
pub mod state;
pub mod types;

pub use broadcast::{
    diagnostic_dump, BroadcastOutcome, BroadcastReport, Broadcaster, OutcomeStatus, RpcTransport,
    Transport, WalletSigner,
};
pub use client::{ZapClient, ZapReport};
pub use error::{Error, Result};
pub use gateway::*;
pub use math::token_amounts;
pub use notify::{MemorySink, Notification, NotificationKind, NotificationSink, TracingSink};
pub use plan::{execute_plan, zap_in_plan, zap_out_plan, AmountSlot, PlannedStep, StepTemplate, ZapPlan, ZapStep};
pub use source::{actionable_positions, load_actionable, pool_for, DataSource, RegistrySource};
pub use state::{ledger_account, LedgerAccount, PoolRecord, Registry};
pub use types::*;
