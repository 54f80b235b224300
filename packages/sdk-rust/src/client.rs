//! [`ZapClient`], the entry point for zap actions.

use solana_sdk::commitment_config::CommitmentConfig;
use tracing::{info, warn};

use crate::{
    broadcast::{BroadcastReport, Broadcaster, RpcTransport, Transport, WalletSigner},
    error::{Error, Result},
    gateway::{GatewaySession, GuardedSession},
    math::share_of,
    notify::{Notification, NotificationSink, TracingSink, ZAP_FAILED},
    plan::{execute_plan, zap_in_plan, zap_out_plan, ZapPlan, ZapStep},
    source::DataSource,
    types::{Pool, Position, ZapConfig, ZapDirection, ZapOutRequest},
};

/// What one zap action did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZapReport {
    pub direction: ZapDirection,
    /// Steps appended to the session, amounts bound. Skipped best-effort
    /// steps are absent.
    pub steps:     Vec<ZapStep>,
    pub report:    BroadcastReport,
}

// ─── Client ───────────────────────────────────────────────────────────────────

/// Drives zap actions end to end: plan, resolve against a gateway session,
/// finalize, then sign and broadcast the bundles.
///
/// ```rust,no_run
/// # use zap_sdk::{ZapClient, ZapConfig, RegistrySource, Registry, DataSource, pool_for};
/// # use solana_sdk::signature::Keypair;
/// # async fn demo<G: zap_sdk::GatewaySession>(session: G) -> zap_sdk::Result<()> {
/// let registry = Registry::load("registry.json")?;
/// let config   = registry.zap.clone();
/// let source   = RegistrySource::new("https://api.mainnet-beta.solana.com", registry);
/// let client   = ZapClient::from_rpc("https://api.mainnet-beta.solana.com", Keypair::new(), config);
///
/// let position = source.get_all_positions().await?.remove(0);
/// let pools    = source.get_all_pools().await?;
/// let pool     = pool_for(&position, &pools)?;
/// let zap      = client.zap_in(session, &position, pool, 10_000_000).await?;
/// println!("{} bundles confirmed", zap.report.confirmed_count());
/// # Ok(())
/// # }
/// ```
pub struct ZapClient<T, W, N> {
    transport: T,
    wallet:    W,
    sink:      N,
    config:    ZapConfig,
}

impl<W: WalletSigner> ZapClient<RpcTransport, W, TracingSink> {
    /// Client over JSON-RPC that reports through `tracing`.
    pub fn from_rpc(rpc_url: impl Into<String>, wallet: W, config: ZapConfig) -> Self {
        let transport = RpcTransport::new(rpc_url, CommitmentConfig { commitment: config.commitment })
            .with_skip_preflight(config.skip_preflight);
        Self::new(transport, wallet, TracingSink, config)
    }
}

impl<T, W, N> ZapClient<T, W, N>
where
    T: Transport,
    W: WalletSigner,
    N: NotificationSink,
{
    pub fn new(transport: T, wallet: W, sink: N, config: ZapConfig) -> Self {
        Self { transport, wallet, sink, config }
    }

    pub fn config(&self) -> &ZapConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    pub fn sink(&self) -> &N {
        &self.sink
    }

    // ── Actions ───────────────────────────────────────────────────────────────

    /// Zap `amount` of the canonical asset into `position`.
    ///
    /// Any failure before submission emits one error notification and is
    /// returned. Submission failures land in the report instead.
    pub async fn zap_in<G: GatewaySession>(
        &self,
        session:  G,
        position: &Position,
        pool:     &Pool,
        amount:   u64,
    ) -> Result<ZapReport> {
        let result = self.try_zap_in(session, position, pool, amount).await;
        self.report_failure(result)
    }

    /// Zap `request.share_bps` of the owner's shares in `position` back into
    /// the canonical asset.
    pub async fn zap_out<G: GatewaySession, D: DataSource + ?Sized>(
        &self,
        session:  G,
        source:   &D,
        position: &Position,
        pool:     &Pool,
        request:  ZapOutRequest,
    ) -> Result<ZapReport> {
        let result = self.try_zap_out(session, source, position, pool, request).await;
        self.report_failure(result)
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    async fn try_zap_in<G: GatewaySession>(
        &self,
        session:  G,
        position: &Position,
        pool:     &Pool,
        amount:   u64,
    ) -> Result<ZapReport> {
        self.wallet.identity().ok_or(Error::WalletNotConnected)?;
        let plan = zap_in_plan(position, pool, amount, &self.config)?;
        self.run(session, plan).await
    }

    async fn try_zap_out<G: GatewaySession, D: DataSource + ?Sized>(
        &self,
        session:  G,
        source:   &D,
        position: &Position,
        pool:     &Pool,
        request:  ZapOutRequest,
    ) -> Result<ZapReport> {
        let owner = self.wallet.identity().ok_or(Error::WalletNotConnected)?;
        if !pool.has_liquidity() {
            return Err(Error::NoLiquidity(pool.id));
        }
        let ledger = source.get_ledger(position, &owner).await?;
        let shares = share_of(ledger.amount, request.share_bps)?;
        let plan = zap_out_plan(position, pool, shares, &self.config)?;
        self.run(session, plan).await
    }

    async fn run<G: GatewaySession>(&self, session: G, plan: ZapPlan) -> Result<ZapReport> {
        let direction = plan.direction();
        let mut session = GuardedSession::new(session);

        let steps = execute_plan(&mut session, plan).await?;
        session.finalize().await?;
        let bundles = session.transactions()?;
        if bundles.is_empty() {
            return Err(Error::EmptyBundleSet);
        }
        info!(%direction, steps = steps.len(), bundles = bundles.len(), "session finalized");

        let report = Broadcaster::new(&self.transport, &self.wallet, &self.sink)
            .with_commitment(CommitmentConfig { commitment: self.config.commitment })
            .broadcast(bundles)
            .await?;

        if report.is_partial() {
            warn!(
                %direction,
                confirmed = report.confirmed_count(),
                skipped   = report.skipped(),
                total     = report.total,
                "zap partially applied; confirmed bundles are not rolled back",
            );
        }
        Ok(ZapReport { direction, steps, report })
    }

    fn report_failure(&self, result: Result<ZapReport>) -> Result<ZapReport> {
        if let Err(e) = &result {
            self.sink.notify(Notification::error(ZAP_FAILED, Some(e.to_string()), None));
        }
        result
    }
}
