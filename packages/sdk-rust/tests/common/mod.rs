//! Test doubles shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::{Transaction, TransactionError},
};
use zap_sdk::{
    AddLiquidityParams, DataSource, DepositParams, Error, GatewaySession, HarvestParams, Ledger,
    LedgerLayout, Pool, Position, PositionKind, Protocol, RemoveLiquidityParams, Result,
    StakeParams, SwapParams, TransactionBundle, Transport, UnstakeParams, WalletSigner,
    WithdrawParams, ZapStep, USDC_MINT,
};

// ─── Gateway session ──────────────────────────────────────────────────────────

/// Steps a [`ScriptedSession`] accepted, readable after the session is moved.
pub type Recorder = Arc<Mutex<Vec<ZapStep>>>;

/// Gateway double: each successful append pops the next scripted output.
pub struct ScriptedSession {
    outputs:  VecDeque<u64>,
    fail_on:  HashSet<usize>,
    calls:    usize,
    last:     u64,
    bundles:  usize,
    produced: Vec<TransactionBundle>,
    recorder: Recorder,
}

impl ScriptedSession {
    pub fn new(outputs: &[u64]) -> Self {
        Self {
            outputs:  outputs.iter().copied().collect(),
            fail_on:  HashSet::new(),
            calls:    0,
            last:     0,
            bundles:  2,
            produced: Vec::new(),
            recorder: Arc::default(),
        }
    }

    /// Fail the append with this zero-based call index.
    pub fn failing_at(mut self, call: usize) -> Self {
        self.fail_on.insert(call);
        self
    }

    pub fn with_bundles(mut self, bundles: usize) -> Self {
        self.bundles = bundles;
        self
    }

    pub fn recorder(&self) -> Recorder {
        Arc::clone(&self.recorder)
    }

    fn append(&mut self, step: ZapStep) -> Result<()> {
        let call = self.calls;
        self.calls += 1;
        if self.fail_on.contains(&call) {
            return Err(Error::Gateway(format!("quote failed for {}", step.name())));
        }
        self.last = self.outputs.pop_front().unwrap_or(0);
        self.recorder.lock().unwrap().push(step);
        Ok(())
    }
}

#[async_trait]
impl GatewaySession for ScriptedSession {
    async fn swap(&mut self, params: &SwapParams) -> Result<()> {
        self.append(ZapStep::Swap(params.clone()))
    }

    async fn add_liquidity(&mut self, params: &AddLiquidityParams) -> Result<()> {
        self.append(ZapStep::AddLiquidity(params.clone()))
    }

    async fn remove_liquidity(&mut self, params: &RemoveLiquidityParams) -> Result<()> {
        self.append(ZapStep::RemoveLiquidity(params.clone()))
    }

    async fn stake(&mut self, params: &StakeParams) -> Result<()> {
        self.append(ZapStep::Stake(params.clone()))
    }

    async fn unstake(&mut self, params: &UnstakeParams) -> Result<()> {
        self.append(ZapStep::Unstake(params.clone()))
    }

    async fn harvest(&mut self, params: &HarvestParams) -> Result<()> {
        self.append(ZapStep::Harvest(params.clone()))
    }

    async fn deposit(&mut self, params: &DepositParams) -> Result<()> {
        self.append(ZapStep::Deposit(params.clone()))
    }

    async fn withdraw(&mut self, params: &WithdrawParams) -> Result<()> {
        self.append(ZapStep::Withdraw(params.clone()))
    }

    fn last_output(&self) -> u64 {
        self.last
    }

    async fn finalize(&mut self) -> Result<()> {
        self.produced = bundles(self.bundles);
        Ok(())
    }

    fn transactions(&self) -> Result<Vec<TransactionBundle>> {
        Ok(self.produced.clone())
    }
}

/// `count` single-instruction bundles, instruction data = bundle index.
pub fn bundles(count: usize) -> Vec<TransactionBundle> {
    (0..count)
        .map(|i| {
            let ix = Instruction::new_with_bytes(Pubkey::new_unique(), &[i as u8], vec![]);
            TransactionBundle::new(vec![ix])
        })
        .collect()
}

// ─── Transport ────────────────────────────────────────────────────────────────

/// Records sends and confirms; optionally fails one of them.
pub struct MockTransport {
    pub blockhash:       Hash,
    pub fail_send_at:    Option<usize>,
    pub fail_confirm_at: Option<usize>,
    pub sent:            Mutex<Vec<Transaction>>,
    pub confirm_calls:   AtomicUsize,
    pub blockhash_calls: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            blockhash:       Hash::new_unique(),
            fail_send_at:    None,
            fail_confirm_at: None,
            sent:            Mutex::new(Vec::new()),
            confirm_calls:   AtomicUsize::new(0),
            blockhash_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_send(mut self, index: usize) -> Self {
        self.fail_send_at = Some(index);
        self
    }

    pub fn failing_confirm(mut self, index: usize) -> Self {
        self.fail_confirm_at = Some(index);
        self
    }

    pub fn sent(&self) -> Vec<Transaction> {
        self.sent.lock().unwrap().clone()
    }

    pub fn blockhash_calls(&self) -> usize {
        self.blockhash_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn latest_blockhash(&self) -> Result<Hash> {
        self.blockhash_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.blockhash)
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature> {
        let mut sent = self.sent.lock().unwrap();
        let index = sent.len();
        sent.push(transaction.clone());
        if self.fail_send_at == Some(index) {
            return Err(Error::Transaction(TransactionError::InsufficientFundsForFee));
        }
        Ok(transaction.signatures[0])
    }

    async fn confirm_transaction(&self, signature: &Signature, _: CommitmentConfig) -> Result<()> {
        let index = self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_confirm_at == Some(index) {
            return Err(Error::Unconfirmed(*signature));
        }
        Ok(())
    }
}

// ─── Wallets ──────────────────────────────────────────────────────────────────

/// Keypair wallet that counts signing prompts.
pub struct CountingWallet {
    pub keypair: Keypair,
    pub prompts: AtomicUsize,
}

impl CountingWallet {
    pub fn new() -> Self {
        Self { keypair: Keypair::new(), prompts: AtomicUsize::new(0) }
    }

    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletSigner for CountingWallet {
    fn identity(&self) -> Option<Pubkey> {
        Some(self.keypair.pubkey())
    }

    async fn sign_all_transactions(&self, transactions: Vec<Transaction>) -> Result<Vec<Transaction>> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.keypair.sign_all_transactions(transactions).await
    }
}

/// The user declines the signing prompt.
pub struct RejectingWallet(pub Pubkey);

#[async_trait]
impl WalletSigner for RejectingWallet {
    fn identity(&self) -> Option<Pubkey> {
        Some(self.0)
    }

    async fn sign_all_transactions(&self, _: Vec<Transaction>) -> Result<Vec<Transaction>> {
        Err(Error::Signing("User rejected the request".into()))
    }
}

pub struct DisconnectedWallet;

#[async_trait]
impl WalletSigner for DisconnectedWallet {
    fn identity(&self) -> Option<Pubkey> {
        None
    }

    async fn sign_all_transactions(&self, _: Vec<Transaction>) -> Result<Vec<Transaction>> {
        Err(Error::WalletNotConnected)
    }
}

// ─── Data source ──────────────────────────────────────────────────────────────

/// Fixed ledger balance for every position.
pub struct FixedLedger {
    pub amount: u64,
    pub calls:  AtomicUsize,
}

impl FixedLedger {
    pub fn new(amount: u64) -> Self {
        Self { amount, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataSource for FixedLedger {
    async fn get_all_positions(&self) -> Result<Vec<Position>> {
        Ok(Vec::new())
    }

    async fn get_all_pools(&self) -> Result<Vec<Pool>> {
        Ok(Vec::new())
    }

    async fn get_ledger(&self, _: &Position, _: &Pubkey) -> Result<Ledger> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Ledger { amount: self.amount })
    }
}

// ─── Fixtures ─────────────────────────────────────────────────────────────────

/// Neither leg is the canonical asset.
pub fn two_hop_pool() -> Pool {
    pool(Pubkey::new_unique(), Pubkey::new_unique())
}

/// Token B is the canonical asset.
pub fn usdc_pool() -> Pool {
    pool(Pubkey::new_unique(), USDC_MINT)
}

/// Token A is the canonical asset.
pub fn usdc_first_pool() -> Pool {
    pool(USDC_MINT, Pubkey::new_unique())
}

pub fn pool(token_a_mint: Pubkey, token_b_mint: Pubkey) -> Pool {
    Pool {
        id: Pubkey::new_unique(),
        protocol: Protocol::Raydium,
        token_a_mint,
        token_b_mint,
        lp_mint: Pubkey::new_unique(),
        reserve_a: 1_000_000,
        reserve_b: 4_000_000,
        lp_supply: 2_000_000,
    }
}

pub fn farm(pool: &Pool, version: u8) -> Position {
    let ledger = LedgerLayout::Farmer { program: Pubkey::new_unique() };
    position(pool, PositionKind::Farm { version }, Protocol::Raydium, ledger)
}

pub fn vault(pool: &Pool) -> Position {
    let ledger = LedgerLayout::Depositor {
        program:       Pubkey::new_unique(),
        seed:          "depositor".into(),
        amount_offset: 72,
    };
    position(pool, PositionKind::Vault, Protocol::Tulip, ledger)
}

fn position(pool: &Pool, kind: PositionKind, protocol: Protocol, ledger: LedgerLayout) -> Position {
    Position {
        id: Pubkey::new_unique(),
        kind,
        protocol,
        lp_mint: pool.lp_mint,
        ledger,
        apr: 0.0,
    }
}
