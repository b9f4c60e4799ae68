//! Staking overview of a network and of a single nominator

use anyhow::{Context, Result};
use futures::future::try_join_all;
use futures::try_join;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::amount::Balance;
use crate::bonding::merge_delegations;
use crate::chain::{storage::balance, ChainQuery, IdentityRegistration, StakingConstant};
use crate::network::NetworkProfile;
use crate::requests::RequestIndex;
use crate::unlocking::withdrawal_timing;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStakingMetadata {
    pub chain: String,
    /// Current round
    pub era: u32,
    /// Annual inflation in percent
    pub inflation: Decimal,
    #[serde(with = "balance")]
    pub min_stake: Balance,
    pub max_validator_per_nominator: u128,
    pub max_withdrawal_request_per_validator: u32,
    pub allow_cancel_unstaking: bool,
    /// Hours between scheduling and executing a withdrawal
    pub unstaking_period: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StakingStatus {
    NotStaking,
    EarningReward,
    PartiallyEarning,
    NotEarning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnstakingStatus {
    Claimable,
    Unlocking,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NominationInfo {
    pub validator_address: String,
    pub validator_identity: Option<String>,
    #[serde(with = "balance")]
    pub active_stake: Balance,
    #[serde(with = "balance")]
    pub validator_min_stake: Balance,
    pub has_unstaking: bool,
    pub status: StakingStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnstakingInfo {
    pub validator_address: String,
    #[serde(with = "balance")]
    pub claimable: Balance,
    pub status: UnstakingStatus,
    /// Hours left, zero once claimable
    pub waiting_time: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NominatorMetadata {
    pub chain: String,
    pub address: String,
    pub status: StakingStatus,
    #[serde(with = "balance")]
    pub active_stake: Balance,
    pub nominations: Vec<NominationInfo>,
    pub unstakings: Vec<UnstakingInfo>,
}

pub async fn get_chain_staking_metadata(
    network: &NetworkProfile,
    chain: &dyn ChainQuery,
) -> Result<ChainStakingMetadata> {
    let round = chain
        .round()
        .await
        .context(format!("Failed to load round on {}", network.key))?;

    let (staked, inflation_config, max_delegations, bond_less_delay, min_delegation) = try_join!(
        chain.staked(round.current),
        chain.inflation_config(),
        chain.constant(StakingConstant::MaxDelegationsPerDelegator),
        chain.constant(StakingConstant::DelegationBondLessDelay),
        chain.constant(StakingConstant::MinDelegation),
    )
    .context(format!("Failed to load staking metadata on {}", network.key))?;

    let bond_less_delay = u64::try_from(bond_less_delay)
        .context(format!("Bond-less delay {} out of range", bond_less_delay))?;

    Ok(ChainStakingMetadata {
        chain: network.key.clone(),
        era: round.current,
        inflation: inflation_config.current_inflation(staked),
        min_stake: min_delegation,
        max_validator_per_nominator: max_delegations,
        max_withdrawal_request_per_validator: 1,
        allow_cancel_unstaking: true,
        unstaking_period: Decimal::from(bond_less_delay) * network.era_length_hours,
    })
}

fn overall_status(total_active: Balance, nominations: &[NominationInfo]) -> StakingStatus {
    if nominations.is_empty() {
        return StakingStatus::NotStaking;
    }
    if total_active == 0 {
        return StakingStatus::NotEarning;
    }

    let earning = nominations
        .iter()
        .filter(|n| n.status == StakingStatus::EarningReward)
        .count();

    match earning {
        0 => StakingStatus::NotEarning,
        n if n == nominations.len() => StakingStatus::EarningReward,
        _ => StakingStatus::PartiallyEarning,
    }
}

pub async fn get_nominator_metadata(
    network: &NetworkProfile,
    chain: &dyn ChainQuery,
    delegator: &str,
) -> Result<NominatorMetadata> {
    let (state, round) = try_join!(chain.delegator_state(delegator), chain.round())
        .context(format!("Failed to load nominator state on {}", network.key))?;

    let Some(state) = state else {
        return Ok(NominatorMetadata {
            chain: network.key.clone(),
            address: delegator.to_string(),
            status: StakingStatus::NotStaking,
            active_stake: 0,
            nominations: Vec::new(),
            unstakings: Vec::new(),
        });
    };

    let requests = RequestIndex::new(
        network
            .request_storage
            .pending_requests(chain, delegator, Some(&state))
            .await?,
    );
    let delegations = merge_delegations(&state.delegations);

    let details = try_join_all(delegations.iter().map(|bond| async move {
        try_join!(chain.candidate_info(&bond.owner), chain.identity_of(&bond.owner))
            .context(format!("Failed to load collator {}", bond.owner))
    }))
    .await?;

    let mut nominations = Vec::with_capacity(delegations.len());
    let mut total_active: Balance = 0;

    for (bond, (metadata, identity)) in delegations.into_iter().zip(details) {
        let active_stake = bond
            .amount
            .saturating_sub(requests.pending_amount(&bond.owner));
        let validator_min_stake = metadata
            .map(|m| m.lowest_top_delegation_amount)
            .unwrap_or_default();

        let status = if active_stake > 0 && active_stake >= validator_min_stake {
            StakingStatus::EarningReward
        } else {
            StakingStatus::NotEarning
        };

        total_active = total_active.saturating_add(active_stake);
        nominations.push(NominationInfo {
            validator_identity: identity.as_ref().and_then(IdentityRegistration::display_name),
            has_unstaking: requests.has_request(&bond.owner),
            validator_address: bond.owner,
            active_stake,
            validator_min_stake,
            status,
        });
    }

    let unstakings = requests
        .requests()
        .iter()
        .map(|request| {
            let (waiting_time, matured) =
                withdrawal_timing(request.round, round.current, network.era_length_hours);
            UnstakingInfo {
                validator_address: request.collator.clone(),
                claimable: request.amount,
                status: if matured {
                    UnstakingStatus::Claimable
                } else {
                    UnstakingStatus::Unlocking
                },
                waiting_time,
            }
        })
        .collect();

    Ok(NominatorMetadata {
        chain: network.key.clone(),
        address: delegator.to_string(),
        status: overall_status(total_active, &nominations),
        active_stake: total_active,
        nominations,
        unstakings,
    })
}
