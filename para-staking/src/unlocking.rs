//! Earliest pending withdrawal of a delegator and when it can be executed

use anyhow::{Context, Result};
use futures::try_join;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::address::canonical_address;
use crate::amount::{to_display, Balance};
use crate::chain::ChainQuery;
use crate::network::NetworkProfile;
use crate::requests::{PendingRequest, WithdrawalAction};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextWithdrawal {
    pub request: PendingRequest,
    pub current_round: u32,
    /// Hours until the request can be executed, zero once it can
    pub next_withdrawal_hours: Decimal,
    /// Full request amount once matured, zero before
    pub redeemable: Balance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum UnlockingSchedule {
    Empty,
    Pending(NextWithdrawal),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockingStakeInfo {
    pub address: String,
    pub chain: String,
    pub next_withdrawal: Decimal,
    pub redeemable: Decimal,
    pub next_withdrawal_amount: Decimal,
    pub next_withdrawal_action: Option<WithdrawalAction>,
    pub validator_address: Option<String>,
}

/// Request with the lowest executable round. Equal rounds are ordered by
/// canonical collator address.
pub fn select_next(requests: Vec<PendingRequest>) -> Option<PendingRequest> {
    requests.into_iter().min_by(|a, b| {
        a.round.cmp(&b.round).then_with(|| {
            canonical_address(&a.collator).cmp(&canonical_address(&b.collator))
        })
    })
}

/// `(hours remaining clamped at zero, matured)` for a request executable at `round`
pub fn withdrawal_timing(round: u32, current_round: u32, era_length_hours: Decimal) -> (Decimal, bool) {
    let remaining_rounds = i64::from(round) - i64::from(current_round);
    let remaining = Decimal::from(remaining_rounds) * era_length_hours;

    let matured = remaining <= Decimal::ZERO;
    (remaining.max(Decimal::ZERO), matured)
}

fn schedule_for(
    request: Option<PendingRequest>,
    current_round: u32,
    era_length_hours: Decimal,
) -> UnlockingSchedule {
    let Some(request) = request else {
        return UnlockingSchedule::Empty;
    };

    let (next_withdrawal_hours, matured) =
        withdrawal_timing(request.round, current_round, era_length_hours);

    UnlockingSchedule::Pending(NextWithdrawal {
        redeemable: if matured { request.amount } else { 0 },
        request,
        current_round,
        next_withdrawal_hours,
    })
}

pub async fn get_unlocking_info(
    network: &NetworkProfile,
    chain: &dyn ChainQuery,
    delegator: &str,
) -> Result<UnlockingSchedule> {
    let (state, round) = try_join!(chain.delegator_state(delegator), chain.round())
        .context(format!("Failed to load unlocking state on {}", network.key))?;

    let requests = network
        .request_storage
        .pending_requests(chain, delegator, state.as_ref())
        .await?;

    Ok(schedule_for(
        select_next(requests),
        round.current,
        network.era_length_hours,
    ))
}

/// Display form of a schedule, amounts divided by `10^decimals`
pub fn handle_unlocking_info(
    network: &NetworkProfile,
    delegator: &str,
    schedule: &UnlockingSchedule,
) -> Result<UnlockingStakeInfo> {
    let info = match schedule {
        UnlockingSchedule::Empty => UnlockingStakeInfo {
            address: delegator.to_string(),
            chain: network.key.clone(),
            next_withdrawal: Decimal::ZERO,
            redeemable: Decimal::ZERO,
            next_withdrawal_amount: Decimal::ZERO,
            next_withdrawal_action: None,
            validator_address: None,
        },
        UnlockingSchedule::Pending(next) => UnlockingStakeInfo {
            address: delegator.to_string(),
            chain: network.key.clone(),
            next_withdrawal: next.next_withdrawal_hours,
            redeemable: to_display(next.redeemable, network.decimals)?,
            next_withdrawal_amount: to_display(next.request.amount, network.decimals)?,
            next_withdrawal_action: Some(next.request.action),
            validator_address: Some(next.request.collator.clone()),
        },
    };

    Ok(info)
}
