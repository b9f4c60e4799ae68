//! Chain access seams
//!
//! Everything the staking logic needs from a parachain node goes through the
//! three traits below. The `http` module implements them against a JSON node
//! gateway; tests use an in-memory chain.

pub mod storage;

#[cfg(feature = "client")]
pub mod http;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::amount::Balance;
use crate::extrinsic::StakingCall;

pub use storage::{
    Bond, CandidateMetadata, CollatorStatus, DelegationAction, DelegationRequest,
    DelegatorState, IdentityRegistration, InflationConfig, PaymentInfo,
    PendingDelegationRequests, RequestAction, RoundInfo, ScheduledRequest,
};

/// `parachainStaking` runtime constants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StakingConstant {
    MaxTopDelegationsPerCandidate,
    MaxDelegationsPerDelegator,
    MinDelegation,
    DelegationBondLessDelay,
}

impl StakingConstant {
    pub fn name(&self) -> &'static str {
        match self {
            StakingConstant::MaxTopDelegationsPerCandidate => "maxTopDelegationsPerCandidate",
            StakingConstant::MaxDelegationsPerDelegator => "maxDelegationsPerDelegator",
            StakingConstant::MinDelegation => "minDelegation",
            StakingConstant::DelegationBondLessDelay => "delegationBondLessDelay",
        }
    }
}

/// Read-only access to `parachainStaking` and `identity` storage
#[async_trait]
pub trait ChainQuery: Send + Sync {
    async fn candidate_pool(&self) -> Result<Vec<Bond>>;

    async fn delegator_state(&self, delegator: &str) -> Result<Option<DelegatorState>>;

    /// Network-wide collator commission, in percent
    async fn collator_commission(&self) -> Result<Decimal>;

    async fn delegation_scheduled_requests(&self, collator: &str) -> Result<Vec<ScheduledRequest>>;

    async fn candidate_info(&self, collator: &str) -> Result<Option<CandidateMetadata>>;

    async fn identity_of(&self, address: &str) -> Result<Option<IdentityRegistration>>;

    async fn round(&self) -> Result<RoundInfo>;

    async fn constant(&self, constant: StakingConstant) -> Result<u128>;

    /// Total staked at `round`
    async fn staked(&self, round: u32) -> Result<Balance>;

    async fn inflation_config(&self) -> Result<InflationConfig>;
}

/// Fee estimation for an unsigned call
#[async_trait]
pub trait TransactionApi: Send + Sync {
    async fn payment_info(&self, call: &StakingCall, signer: &str) -> Result<PaymentInfo>;
}

#[async_trait]
pub trait BalanceQuery: Send + Sync {
    async fn free_balance(&self, address: &str) -> Result<Balance>;
}
