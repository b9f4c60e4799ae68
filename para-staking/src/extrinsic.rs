//! `parachainStaking` call selection
//!
//! The builder reads the delegator's position live on every call and picks
//! the extrinsic matching it. Calls are returned as typed descriptions; SCALE
//! encoding and signing happen in the signer.

use anyhow::{bail, Context, Result};
use futures::try_join;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::address::is_same_address;
use crate::amount::{format_balance, to_minimal_units, Balance};
use crate::chain::{storage::balance, BalanceQuery, ChainQuery, DelegatorState, TransactionApi};
use crate::network::NetworkProfile;
use crate::requests::RequestIndex;

pub const STAKING_PALLET: &str = "parachainStaking";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum StakingCall {
    #[serde(rename_all = "camelCase")]
    Delegate {
        candidate: String,
        #[serde(with = "balance")]
        amount: Balance,
        candidate_delegation_count: u32,
        delegation_count: u32,
    },
    DelegatorBondMore {
        candidate: String,
        #[serde(with = "balance")]
        more: Balance,
    },
    ScheduleDelegatorBondLess {
        candidate: String,
        #[serde(with = "balance")]
        less: Balance,
    },
    ScheduleRevokeDelegation { collator: String },
    ExecuteDelegationRequest { delegator: String, candidate: String },
    CancelDelegationRequest { candidate: String },
}

impl StakingCall {
    pub fn pallet(&self) -> &'static str {
        STAKING_PALLET
    }

    pub fn method(&self) -> &'static str {
        match self {
            StakingCall::Delegate { .. } => "delegate",
            StakingCall::DelegatorBondMore { .. } => "delegatorBondMore",
            StakingCall::ScheduleDelegatorBondLess { .. } => "scheduleDelegatorBondLess",
            StakingCall::ScheduleRevokeDelegation { .. } => "scheduleRevokeDelegation",
            StakingCall::ExecuteDelegationRequest { .. } => "executeDelegationRequest",
            StakingCall::CancelDelegationRequest { .. } => "cancelDelegationRequest",
        }
    }

    /// Amount leaving the free balance when the call executes
    pub fn bond_amount(&self) -> Balance {
        match self {
            StakingCall::Delegate { amount, .. } => *amount,
            StakingCall::DelegatorBondMore { more, .. } => *more,
            _ => 0,
        }
    }
}

/// Position of a delegator towards one collator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DelegationState {
    NotDelegated,
    Active,
    PendingDecrease,
    PendingRevoke,
}

impl DelegationState {
    pub fn resolve(
        state: Option<&DelegatorState>,
        requests: &RequestIndex,
        collator: &str,
    ) -> Self {
        if !is_bonded(state, collator) {
            DelegationState::NotDelegated
        } else if requests.has_revoke(collator) {
            DelegationState::PendingRevoke
        } else if requests.has_request(collator) {
            DelegationState::PendingDecrease
        } else {
            DelegationState::Active
        }
    }

    /// State after `call` executes, `None` if the chain would reject it
    pub fn transition(self, call: &StakingCall) -> Option<DelegationState> {
        use DelegationState::*;

        match (self, call) {
            (NotDelegated, StakingCall::Delegate { .. }) => Some(Active),
            (Active | PendingDecrease, StakingCall::DelegatorBondMore { .. }) => Some(self),
            (Active, StakingCall::ScheduleDelegatorBondLess { .. }) => Some(PendingDecrease),
            (Active, StakingCall::ScheduleRevokeDelegation { .. }) => Some(PendingRevoke),
            (PendingDecrease, StakingCall::ExecuteDelegationRequest { .. }) => Some(Active),
            (PendingRevoke, StakingCall::ExecuteDelegationRequest { .. }) => Some(NotDelegated),
            (PendingDecrease | PendingRevoke, StakingCall::CancelDelegationRequest { .. }) => {
                Some(Active)
            }
            _ => None,
        }
    }
}

fn is_bonded(state: Option<&DelegatorState>, collator: &str) -> bool {
    state.map_or(false, |s| {
        s.delegations
            .iter()
            .any(|bond| is_same_address(&bond.owner, collator))
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicTxInfo {
    /// `"<amount> <SYMBOL>"` with four fractional digits
    pub fee: String,
    #[serde(with = "balance")]
    pub raw_fee: Balance,
    pub balance_error: bool,
}

pub struct ExtrinsicBuilder<'a> {
    network: &'a NetworkProfile,
    chain: &'a dyn ChainQuery,
}

impl<'a> ExtrinsicBuilder<'a> {
    pub fn new(network: &'a NetworkProfile, chain: &'a dyn ChainQuery) -> Self {
        Self { network, chain }
    }

    /// Exact conversion of a user amount such as `"1.5"`
    pub fn parse_amount(&self, amount: &str) -> Result<Balance> {
        to_minimal_units(amount, self.network.decimals)
            .context(format!("Invalid {} amount", self.network.symbol))
    }

    pub async fn delegation_state(&self, delegator: &str, collator: &str) -> Result<DelegationState> {
        let state = self
            .chain
            .delegator_state(delegator)
            .await
            .context(format!("Failed to load delegator state on {}", self.network.key))?;

        let requests = RequestIndex::new(
            self.network
                .request_storage
                .pending_requests(self.chain, delegator, state.as_ref())
                .await?,
        );

        Ok(DelegationState::resolve(state.as_ref(), &requests, collator))
    }

    /// `delegate` for a new collator, `delegatorBondMore` otherwise
    pub async fn bonding_call(
        &self,
        delegator: &str,
        collator: &str,
        amount: Balance,
    ) -> Result<StakingCall> {
        let (state, candidate) = try_join!(
            self.chain.delegator_state(delegator),
            self.chain.candidate_info(collator),
        )
        .context(format!("Failed to load bonding state on {}", self.network.key))?;

        if is_bonded(state.as_ref(), collator) {
            return Ok(StakingCall::DelegatorBondMore {
                candidate: collator.to_string(),
                more: amount,
            });
        }

        let Some(candidate) = candidate else {
            bail!("{} is not a collator candidate on {}", collator, self.network.key);
        };

        let delegation_count = state
            .as_ref()
            .map(|s| s.delegations.len() as u32)
            .unwrap_or_default();

        debug!(
            "Delegating to {} ({} delegations) from {} ({} delegations)",
            collator,
            candidate.delegation_count,
            delegator,
            delegation_count
        );

        Ok(StakingCall::Delegate {
            candidate: collator.to_string(),
            amount,
            candidate_delegation_count: candidate.delegation_count,
            delegation_count,
        })
    }

    /// Revoke everything, or schedule a partial decrease
    pub fn unbonding_call(&self, collator: &str, amount: Balance, unstake_all: bool) -> StakingCall {
        if unstake_all {
            StakingCall::ScheduleRevokeDelegation {
                collator: collator.to_string(),
            }
        } else {
            StakingCall::ScheduleDelegatorBondLess {
                candidate: collator.to_string(),
                less: amount,
            }
        }
    }

    pub fn withdrawal_call(&self, delegator: &str, collator: &str) -> StakingCall {
        StakingCall::ExecuteDelegationRequest {
            delegator: delegator.to_string(),
            candidate: collator.to_string(),
        }
    }

    pub fn cancel_withdrawal_call(&self, collator: &str) -> StakingCall {
        StakingCall::CancelDelegationRequest {
            candidate: collator.to_string(),
        }
    }
}

/// Fee for `call` and whether `signer` can cover it together with the bond
pub async fn get_tx_info(
    network: &NetworkProfile,
    tx: &dyn TransactionApi,
    balances: &dyn BalanceQuery,
    call: &StakingCall,
    signer: &str,
) -> Result<BasicTxInfo> {
    let (payment, free) = try_join!(tx.payment_info(call, signer), balances.free_balance(signer))
        .context(format!("Failed to estimate {} on {}", call.method(), network.key))?;

    let raw_fee = payment.partial_fee;
    let balance_error = raw_fee.saturating_add(call.bond_amount()) > free;

    Ok(BasicTxInfo {
        fee: format_balance(raw_fee, network.decimals, &network.symbol)?,
        raw_fee,
        balance_error,
    })
}
