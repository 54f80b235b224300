mod estimate;

use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use serde_json::json;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair, Signer},
};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use zap_sdk::{
    execute_plan, ledger_account, load_actionable, math::share_of, pool_for, token_amounts,
    zap_in_plan, zap_out_plan, DataSource, Pool, Position, Registry, RegistrySource, ZapPlan,
    USDC_MINT, WSOL_MINT,
};

use estimate::{EstimateSession, Quote};

// ─── Token symbols (mainnet-beta) ─────────────────────────────────────────────

const KNOWN_TOKENS: &[(&str, Pubkey)] = &[("SOL", WSOL_MINT), ("USDC", USDC_MINT)];

/// Known symbol, or shortened address for unknowns.
fn resolve_symbol(mint: &Pubkey) -> String {
    if let Some((sym, _)) = KNOWN_TOKENS.iter().find(|(_, known)| known == mint) {
        return sym.to_string();
    }
    let addr = mint.to_string();
    format!("{}…{}", &addr[..4], &addr[addr.len() - 4..])
}

fn pair_label(pool: &Pool) -> String {
    format!("{}-{}", resolve_symbol(&pool.token_a_mint), resolve_symbol(&pool.token_b_mint))
}

/// Expand `~/` to `$HOME/` in file paths.
fn expand_home(path: &str) -> String {
    match path.strip_prefix("~/") {
        Some(rest) => format!("{}/{rest}", std::env::var("HOME").unwrap_or_default()),
        None => path.to_string(),
    }
}

fn load_keypair(path: &str) -> Result<Keypair> {
    let expanded = expand_home(path);
    read_keypair_file(&expanded).map_err(|e| {
        anyhow!(
            "Cannot load keypair from '{}': {}\n  \
             Set ZAP_KEYPAIR or pass --keypair to specify a different path.",
            expanded,
            e
        )
    })
}

fn load_source(rpc_url: &str, registry_path: &str) -> Result<RegistrySource> {
    let expanded = expand_home(registry_path);
    let registry = Registry::load(&expanded).with_context(|| {
        format!("Cannot load registry '{expanded}'. Set ZAP_REGISTRY or pass --registry.")
    })?;
    debug!(
        pools = registry.pools.len(),
        positions = registry.positions.len(),
        "registry loaded"
    );
    Ok(RegistrySource::new(rpc_url, registry))
}

/// Position by id plus its refreshed backing pool.
async fn position_with_pool(source: &RegistrySource, id: &str) -> Result<(Position, Pool, Vec<Pool>)> {
    let id = Pubkey::from_str(id).map_err(|_| anyhow!("--position '{id}' is not a base-58 address"))?;
    let position = source.registry().position(&id)?.clone();
    let pools = source.get_all_pools().await.context("fetch pool reserves")?;
    let pool = pool_for(&position, &pools)
        .with_context(|| format!("position {id} has no live backing pool"))?
        .clone();
    Ok((position, pool, pools))
}

// ─── Version banner ───────────────────────────────────────────────────────────

fn print_banner() {
    let ver = env!("CARGO_PKG_VERSION");
    println!();
    println!("  Zap  v{ver}  ·  one-signature farm & vault zaps on Solana");
    println!("  {}", "─".repeat(62));
    println!("  Canonical   USDC  ({USDC_MINT})");
    println!("  Network     Solana mainnet-beta");
    println!("  Mode        preview (plans are quoted, never submitted)");
    println!();
}

// ─── CLI definition ───────────────────────────────────────────────────────────

/// Zap: one canonical asset in, a farm or vault position out, and back.
///
/// Every command supports --json for machine-readable output.
/// Global options can also be set via environment variables:
///   ZAP_RPC_URL   Solana JSON-RPC endpoint
///   ZAP_KEYPAIR   path to the owner's Ed25519 keypair JSON
///   ZAP_REGISTRY  path to the position/pool registry JSON
#[derive(Parser)]
#[command(
    name    = "zap",
    version = env!("CARGO_PKG_VERSION"),
    about   = "Preview multi-protocol zaps into and out of Solana farms and vaults.",
    after_help = "\
ENVIRONMENT:
  ZAP_RPC_URL    Solana JSON-RPC endpoint  [default: https://api.mainnet-beta.solana.com]
  ZAP_KEYPAIR    Path to Ed25519 keypair JSON  [default: ~/.config/solana/id.json]
  ZAP_REGISTRY   Position/pool registry JSON  [default: registry.json]
  RUST_LOG       Log filter for stderr  [default: info]

QUICK START:
  zap positions
  zap ledger  --position <ID>
  zap zap-in  --position <ID> --amount 10000000
  zap zap-out --position <ID> --share-bps 5000"
)]
struct Cli {
    /// Solana JSON-RPC endpoint
    #[arg(
        long,
        global        = true,
        value_name    = "URL",
        default_value = "https://api.mainnet-beta.solana.com",
        env           = "ZAP_RPC_URL"
    )]
    rpc_url: String,

    /// Path to the owner's Ed25519 keypair JSON file
    #[arg(
        long,
        global        = true,
        value_name    = "PATH",
        default_value = "~/.config/solana/id.json",
        env           = "ZAP_KEYPAIR"
    )]
    keypair: String,

    /// Path to the registry describing positions and pools
    #[arg(
        long,
        global        = true,
        value_name    = "PATH",
        default_value = "registry.json",
        env           = "ZAP_REGISTRY"
    )]
    registry: String,

    /// Output machine-readable JSON instead of human-readable text
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List farms and vaults backed by a live pool
    ///
    /// Positions whose LP mint matches no pool in the registry are hidden.
    #[command(
        after_help = "\
EXAMPLES:
  zap positions
  zap positions --json
  zap positions --registry ~/zap/mainnet.json"
    )]
    Positions,

    /// Show the keypair's share balance in a position
    ///
    /// Also splits the balance into the pool's two token legs at current reserves.
    #[command(
        after_help = "\
EXAMPLES:
  zap ledger --position <ID>
  zap ledger --position <ID> --keypair ~/keys/main.json --json"
    )]
    Ledger {
        /// Position id (farm or vault address)
        #[arg(long, value_name = "ID")]
        position: String,
    },

    /// Quote a zap from the canonical asset into a position
    ///
    /// Builds the plan and resolves every step against current reserves.
    /// No transaction is sent.
    #[command(
        name = "zap-in",
        after_help = "\
EXAMPLES:
  # 10 USDC into a farm
  zap zap-in --position <ID> --amount 10000000

NOTES:
  Amounts are in atomic units of the canonical asset (μUSDC by default).
  Swap hops are routed through registry pools only."
    )]
    ZapIn {
        /// Position id (farm or vault address)
        #[arg(long, value_name = "ID")]
        position: String,

        /// Canonical asset to zap in, atomic units
        #[arg(long, value_name = "AMOUNT")]
        amount: u64,
    },

    /// Quote a zap from a position back into the canonical asset
    ///
    /// Reads the keypair's share balance first. Farms harvest before unstaking.
    #[command(
        name = "zap-out",
        after_help = "\
EXAMPLES:
  zap zap-out --position <ID>
  zap zap-out --position <ID> --share-bps 2500 --json"
    )]
    ZapOut {
        /// Position id (farm or vault address)
        #[arg(long, value_name = "ID")]
        position: String,

        /// Fraction of the balance to exit, in basis points (10000 = all)
        #[arg(long, value_name = "BPS", default_value_t = 10_000)]
        share_bps: u16,
    },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    // When invoked with no arguments, show banner + full help and exit cleanly.
    if std::env::args().len() == 1 {
        print_banner();
        Cli::command().print_long_help().ok();
        println!();
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Positions => {
            cmd_positions(&cli.rpc_url, &cli.registry, cli.json).await?;
        }
        Commands::Ledger { position } => {
            cmd_ledger(&cli.rpc_url, &cli.registry, &cli.keypair, position, cli.json).await?;
        }
        Commands::ZapIn { position, amount } => {
            cmd_zap_in(&cli.rpc_url, &cli.registry, position, *amount, cli.json).await?;
        }
        Commands::ZapOut { position, share_bps } => {
            cmd_zap_out(
                &cli.rpc_url, &cli.registry, &cli.keypair,
                position, *share_bps,
                cli.json,
            )
            .await?;
        }
    }

    Ok(())
}

// ─── positions ────────────────────────────────────────────────────────────────

async fn cmd_positions(rpc_url: &str, registry_path: &str, json_output: bool) -> Result<()> {
    let source = load_source(rpc_url, registry_path)?;
    let joined = load_actionable(&source).await.context("fetch positions and pools")?;

    if json_output {
        let items: Vec<_> = joined.iter().map(|(pos, pool)| json!({
            "position": pos.id.to_string(),
            "kind":     pos.kind.label(),
            "protocol": pos.protocol.to_string(),
            "lp_mint":  pos.lp_mint.to_string(),
            "pool":     pool.id.to_string(),
            "pair":     pair_label(pool),
            "apr":      pos.apr,
        })).collect();
        println!("{}", json!({ "status": "ok", "command": "positions", "positions": items }));
        return Ok(());
    }

    println!("─── Positions ────────────────────────────────────────────────────");
    if joined.is_empty() {
        println!("  No position in the registry is backed by a live pool.");
        return Ok(());
    }
    for (i, (pos, pool)) in joined.iter().enumerate() {
        println!("  [{i:>2}]  Pair       {}  ({} {})", pair_label(pool), pos.protocol, pos.kind.label());
        println!("        Position   {}", pos.id);
        println!("        LP mint    {}", pos.lp_mint);
        println!("        APR        {:>8.2}%", pos.apr);
        println!();
    }
    println!("  Total: {} position(s)  ·  run `zap ledger --position <ID>` for a balance", joined.len());
    Ok(())
}

// ─── ledger ───────────────────────────────────────────────────────────────────

async fn cmd_ledger(
    rpc_url: &str,
    registry_path: &str,
    keypair_path: &str,
    position_id: &str,
    json_output: bool,
) -> Result<()> {
    let owner = load_keypair(keypair_path)?.pubkey();
    let source = load_source(rpc_url, registry_path)?;
    let (position, pool, _) = position_with_pool(&source, position_id).await?;

    let account = ledger_account(&position, &owner).context("locate ledger account")?;
    let ledger = source.get_ledger(&position, &owner).await.context("fetch share balance")?;
    let legs = token_amounts(ledger.amount, &pool);

    if json_output {
        println!("{}", json!({
            "status":   "ok",
            "command":  "ledger",
            "owner":    owner.to_string(),
            "position": position.id.to_string(),
            "pair":     pair_label(&pool),
            "ledger":   account.address.to_string(),
            "shares":   ledger.amount,
            "token_a":  legs.token_a,
            "token_b":  legs.token_b,
        }));
    } else {
        println!("─── Ledger ───────────────────────────────────────────────────────");
        println!("  Owner      {owner}");
        println!("  Position   {}  ({})", position.id, pair_label(&pool));
        println!("  Ledger     {}", account.address);
        println!("  Shares     {:>20}", ledger.amount);
        println!("  Token A    {:>20}  ({})", legs.token_a, resolve_symbol(&pool.token_a_mint));
        println!("  Token B    {:>20}  ({})", legs.token_b, resolve_symbol(&pool.token_b_mint));
    }
    Ok(())
}

// ─── zap-in ───────────────────────────────────────────────────────────────────

async fn cmd_zap_in(
    rpc_url: &str,
    registry_path: &str,
    position_id: &str,
    amount: u64,
    json_output: bool,
) -> Result<()> {
    if amount == 0 {
        return Err(anyhow!("--amount must be > 0 (atomic units of the canonical asset)"));
    }
    let source = load_source(rpc_url, registry_path)?;
    let (position, pool, pools) = position_with_pool(&source, position_id).await?;

    let plan = zap_in_plan(&position, &pool, amount, &source.registry().zap)?;
    let quotes = preview(plan, pools).await?;
    print_preview("zap-in", &position, &pool, amount, &quotes, json_output);
    Ok(())
}

// ─── zap-out ──────────────────────────────────────────────────────────────────

async fn cmd_zap_out(
    rpc_url: &str,
    registry_path: &str,
    keypair_path: &str,
    position_id: &str,
    share_bps: u16,
    json_output: bool,
) -> Result<()> {
    let owner = load_keypair(keypair_path)?.pubkey();
    let source = load_source(rpc_url, registry_path)?;
    let (position, pool, pools) = position_with_pool(&source, position_id).await?;

    let ledger = source.get_ledger(&position, &owner).await.context("fetch share balance")?;
    let shares = share_of(ledger.amount, share_bps).context("--share-bps")?;

    let plan = zap_out_plan(&position, &pool, shares, &source.registry().zap)?;
    let quotes = preview(plan, pools).await?;
    print_preview("zap-out", &position, &pool, shares, &quotes, json_output);
    Ok(())
}

// ─── Shared utilities ─────────────────────────────────────────────────────────

async fn preview(plan: ZapPlan, pools: Vec<Pool>) -> Result<Vec<Quote>> {
    let mut session = EstimateSession::new(pools);
    execute_plan(&mut session, plan).await.context("resolve plan")?;
    Ok(session.quotes().to_vec())
}

fn print_preview(
    command: &str,
    position: &Position,
    pool: &Pool,
    input: u64,
    quotes: &[Quote],
    json_output: bool,
) {
    if json_output {
        let steps: Vec<_> = quotes
            .iter()
            .map(|q| json!({ "step": q.step, "quoted_output": q.output }))
            .collect();
        println!("{}", json!({
            "status":   "ok",
            "command":  command,
            "position": position.id.to_string(),
            "kind":     position.kind.label(),
            "pair":     pair_label(pool),
            "input":    input,
            "steps":    steps,
            "output":   quotes.last().map(|q| q.output).unwrap_or(0),
        }));
        return;
    }

    println!("─── {command} preview ───────────────────────────────────────────────");
    println!("  Position   {}  ({} {})", position.id, pair_label(pool), position.kind.label());
    println!("  Input      {input:>20}");
    println!();
    for (i, quote) in quotes.iter().enumerate() {
        println!("  [{i}]  {:<17} quoted out {:>20}", quote.step.name(), quote.output);
    }
    println!();
    println!("  No transaction sent.  Quotes use registry reserves and a 0.25% LP fee per hop.");
}
