//! In-memory chain used by the unit tests

use std::collections::{HashMap, HashSet};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::address::canonical_address;
use crate::amount::Balance;
use crate::chain::{
    BalanceQuery, Bond, CandidateMetadata, ChainQuery, CollatorStatus, DelegatorState,
    IdentityRegistration, InflationConfig, PaymentInfo, RoundInfo, ScheduledRequest,
    StakingConstant, TransactionApi,
};
use crate::extrinsic::StakingCall;

pub const ALICE: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
pub const ALICE_KUSAMA: &str = "HNZata7iMYWmk5RvZRTiAsSDhV8366zq2YGb3tLH5Upf74F";
pub const BOB: &str = "5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty";
pub const BOB_POLKADOT: &str = "14E5nqKAp3oAJcmzgZhUD2RcptBeUBScxKHgJKU4HPNcKVf3";
pub const CHARLIE: &str = "5FLSigC9HGRKVhB9FiEo4Y3koPsNmBmLJbpXg2mp1hXcS59Y";
pub const DAVE: &str = "5DAAnrj7VHTznn2AWBemMuyBwZWs6FNFjdyVXUeYum3PTXFy";

pub struct MockChain {
    pub pool: Vec<Bond>,
    pub delegators: HashMap<String, DelegatorState>,
    pub commission: Decimal,
    pub scheduled: HashMap<String, Vec<ScheduledRequest>>,
    pub candidates: HashMap<String, CandidateMetadata>,
    pub identities: HashMap<String, IdentityRegistration>,
    pub round: RoundInfo,
    pub constants: HashMap<StakingConstant, u128>,
    pub staked: Balance,
    pub inflation: Option<InflationConfig>,
    pub fee: Balance,
    pub balances: HashMap<String, Balance>,
    pub failing: HashSet<&'static str>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self {
            pool: Vec::new(),
            delegators: HashMap::new(),
            commission: dec!(20),
            scheduled: HashMap::new(),
            candidates: HashMap::new(),
            identities: HashMap::new(),
            round: RoundInfo {
                current: 1,
                first: 0,
                length: 300,
            },
            constants: HashMap::from([
                (StakingConstant::MaxTopDelegationsPerCandidate, 300),
                (StakingConstant::MaxDelegationsPerDelegator, 100),
                (StakingConstant::MinDelegation, 5),
                (StakingConstant::DelegationBondLessDelay, 28),
            ]),
            staked: 0,
            inflation: None,
            fee: 0,
            balances: HashMap::new(),
            failing: HashSet::new(),
        }
    }
}

pub fn candidate(bond: Balance, delegation_count: u32, total_counted: Balance, lowest: Balance) -> CandidateMetadata {
    CandidateMetadata {
        bond,
        delegation_count,
        total_counted,
        lowest_top_delegation_amount: lowest,
        status: CollatorStatus::Active,
    }
}

impl MockChain {
    pub fn with_pool(mut self, pool: Vec<Bond>) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_delegator(mut self, state: DelegatorState) -> Self {
        self.delegators.insert(canonical_address(&state.id), state);
        self
    }

    pub fn with_scheduled(mut self, collator: &str, requests: Vec<ScheduledRequest>) -> Self {
        self.scheduled.insert(canonical_address(collator), requests);
        self
    }

    pub fn with_candidate(mut self, collator: &str, metadata: CandidateMetadata) -> Self {
        self.candidates.insert(canonical_address(collator), metadata);
        self
    }

    pub fn with_identity(mut self, address: &str, registration: IdentityRegistration) -> Self {
        self.identities.insert(canonical_address(address), registration);
        self
    }

    pub fn with_round(mut self, current: u32) -> Self {
        self.round.current = current;
        self
    }

    pub fn with_constant(mut self, constant: StakingConstant, value: u128) -> Self {
        self.constants.insert(constant, value);
        self
    }

    pub fn with_inflation(mut self, staked: Balance, config: InflationConfig) -> Self {
        self.staked = staked;
        self.inflation = Some(config);
        self
    }

    pub fn with_fee(mut self, fee: Balance) -> Self {
        self.fee = fee;
        self
    }

    pub fn with_balance(mut self, address: &str, free: Balance) -> Self {
        self.balances.insert(canonical_address(address), free);
        self
    }

    /// Make every call of `method` fail
    pub fn failing(mut self, method: &'static str) -> Self {
        self.failing.insert(method);
        self
    }

    fn check(&self, method: &'static str) -> Result<()> {
        if self.failing.contains(method) {
            return Err(anyhow!("{} unavailable", method));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainQuery for MockChain {
    async fn candidate_pool(&self) -> Result<Vec<Bond>> {
        self.check("candidate_pool")?;
        Ok(self.pool.clone())
    }

    async fn delegator_state(&self, delegator: &str) -> Result<Option<DelegatorState>> {
        self.check("delegator_state")?;
        Ok(self.delegators.get(&canonical_address(delegator)).cloned())
    }

    async fn collator_commission(&self) -> Result<Decimal> {
        self.check("collator_commission")?;
        Ok(self.commission)
    }

    async fn delegation_scheduled_requests(&self, collator: &str) -> Result<Vec<ScheduledRequest>> {
        self.check("delegation_scheduled_requests")?;
        Ok(self
            .scheduled
            .get(&canonical_address(collator))
            .cloned()
            .unwrap_or_default())
    }

    async fn candidate_info(&self, collator: &str) -> Result<Option<CandidateMetadata>> {
        self.check("candidate_info")?;
        Ok(self.candidates.get(&canonical_address(collator)).cloned())
    }

    async fn identity_of(&self, address: &str) -> Result<Option<IdentityRegistration>> {
        self.check("identity_of")?;
        Ok(self.identities.get(&canonical_address(address)).cloned())
    }

    async fn round(&self) -> Result<RoundInfo> {
        self.check("round")?;
        Ok(self.round)
    }

    async fn constant(&self, constant: StakingConstant) -> Result<u128> {
        self.check("constant")?;
        self.constants
            .get(&constant)
            .copied()
            .ok_or_else(|| anyhow!("constant {} not set", constant.name()))
    }

    async fn staked(&self, _round: u32) -> Result<Balance> {
        self.check("staked")?;
        Ok(self.staked)
    }

    async fn inflation_config(&self) -> Result<InflationConfig> {
        self.check("inflation_config")?;
        self.inflation
            .clone()
            .ok_or_else(|| anyhow!("inflation config not set"))
    }
}

#[async_trait]
impl TransactionApi for MockChain {
    async fn payment_info(&self, _call: &StakingCall, _signer: &str) -> Result<PaymentInfo> {
        self.check("payment_info")?;
        Ok(PaymentInfo {
            partial_fee: self.fee,
        })
    }
}

#[async_trait]
impl BalanceQuery for MockChain {
    async fn free_balance(&self, address: &str) -> Result<Balance> {
        self.check("free_balance")?;
        Ok(self
            .balances
            .get(&canonical_address(address))
            .copied()
            .unwrap_or_default())
    }
}
