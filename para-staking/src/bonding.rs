//! Collator list and delegation summary for a delegator

use anyhow::{Context, Result};
use futures::future::try_join_all;
use futures::try_join;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

use crate::address::{canonical_address, is_same_address};
use crate::amount::{to_display, Balance};
use crate::chain::{
    storage::balance, Bond, CandidateMetadata, ChainQuery, CollatorStatus, IdentityRegistration,
    StakingConstant,
};
use crate::network::NetworkProfile;
use crate::requests::{bonded_collators, RequestIndex};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorInfo {
    pub address: String,
    pub chain: String,
    pub total_stake: Decimal,
    pub own_stake: Decimal,
    pub other_stake: Decimal,
    pub nominator_count: u32,
    pub commission: Decimal,
    /// Not computed for parachain collators
    pub expected_return: Decimal,
    pub min_bond: Decimal,
    pub blocked: bool,
    pub identity: Option<String>,
    pub is_verified: bool,
    pub is_nominated: bool,
    pub has_scheduled_request: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BondingOptions {
    pub max_nominator_per_validator: u128,
    /// Not computed
    pub era: Option<u32>,
    pub validators_info: Vec<ValidatorInfo>,
    pub is_bonded_before: bool,
    pub bonded_validators: Vec<String>,
    pub max_nominations: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationItem {
    pub owner: String,
    /// Delegated amount minus everything scheduled for withdrawal
    #[serde(with = "balance")]
    pub amount: Balance,
    pub identity: Option<String>,
    #[serde(with = "balance")]
    pub min_bond: Balance,
    pub has_scheduled_request: bool,
}

/// Every collator candidate, annotated with the delegator's position
pub async fn get_collators_info(
    network: &NetworkProfile,
    chain: &dyn ChainQuery,
    delegator: &str,
) -> Result<BondingOptions> {
    let (pool, state, commission) = try_join!(
        chain.candidate_pool(),
        chain.delegator_state(delegator),
        chain.collator_commission(),
    )
    .context(format!("Failed to load staking state on {}", network.key))?;

    let (max_nominator_per_validator, max_nominations, min_delegation) = try_join!(
        chain.constant(StakingConstant::MaxTopDelegationsPerCandidate),
        chain.constant(StakingConstant::MaxDelegationsPerDelegator),
        chain.constant(StakingConstant::MinDelegation),
    )
    .context(format!("Failed to load staking constants on {}", network.key))?;

    let is_bonded_before = state.is_some();
    let bonded_validators = bonded_collators(state.as_ref());
    let requests = RequestIndex::new(
        network
            .request_storage
            .pending_requests(chain, delegator, state.as_ref())
            .await?,
    );

    let details = try_join_all(pool.iter().map(|bond| async move {
        try_join!(chain.candidate_info(&bond.owner), chain.identity_of(&bond.owner))
            .context(format!("Failed to load collator {}", bond.owner))
    }))
    .await?;

    debug!(
        "Loaded {} collators on {}, delegator bonded to {}",
        pool.len(),
        network.key,
        bonded_validators.len()
    );

    let validators_info = pool
        .iter()
        .zip(details)
        .map(|(bond, (metadata, identity))| {
            let is_bonded = bonded_validators
                .iter()
                .any(|owner| is_same_address(owner, &bond.owner));

            build_validator_info(
                network,
                bond,
                metadata.as_ref(),
                identity.as_ref(),
                commission,
                min_delegation,
                is_bonded && !requests.has_revoke(&bond.owner),
                is_bonded && requests.has_request(&bond.owner),
            )
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(BondingOptions {
        max_nominator_per_validator,
        era: None,
        validators_info,
        is_bonded_before,
        bonded_validators,
        max_nominations,
    })
}

#[allow(clippy::too_many_arguments)]
fn build_validator_info(
    network: &NetworkProfile,
    bond: &Bond,
    metadata: Option<&CandidateMetadata>,
    identity: Option<&IdentityRegistration>,
    commission: Decimal,
    min_delegation: u128,
    is_nominated: bool,
    has_scheduled_request: bool,
) -> Result<ValidatorInfo> {
    let decimals = network.decimals;
    let own = metadata.map(|m| m.bond).unwrap_or_default();
    let lowest = metadata
        .map(|m| m.lowest_top_delegation_amount)
        .unwrap_or_default();

    let total_stake = to_display(bond.amount, decimals)?;
    let own_stake = to_display(own, decimals)?;

    Ok(ValidatorInfo {
        address: bond.owner.clone(),
        chain: network.key.clone(),
        other_stake: total_stake - own_stake,
        total_stake,
        own_stake,
        nominator_count: metadata.map(|m| m.delegation_count).unwrap_or_default(),
        commission,
        expected_return: Decimal::ZERO,
        min_bond: to_display(lowest.max(min_delegation), decimals)?,
        blocked: metadata.map_or(true, |m| m.status != CollatorStatus::Active),
        identity: identity.and_then(IdentityRegistration::display_name),
        is_verified: identity.map_or(false, IdentityRegistration::is_verified),
        is_nominated,
        has_scheduled_request,
    })
}

/// The delegator's delegations, one item per collator
pub async fn get_delegation_info(
    network: &NetworkProfile,
    chain: &dyn ChainQuery,
    delegator: &str,
) -> Result<Vec<DelegationItem>> {
    let state = chain
        .delegator_state(delegator)
        .await
        .context(format!("Failed to load delegator state on {}", network.key))?;

    let Some(state) = state else {
        return Ok(Vec::new());
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

    let items = delegations
        .into_iter()
        .zip(details)
        .map(|(bond, (metadata, identity))| {
            let pending = requests.pending_amount(&bond.owner);
            let amount = bond.amount.checked_sub(pending).unwrap_or_else(|| {
                warn!(
                    "Pending withdrawals {} exceed delegation {} to {}",
                    pending, bond.amount, bond.owner
                );
                0
            });
            DelegationItem {
                identity: identity.as_ref().and_then(IdentityRegistration::display_name),
                has_scheduled_request: requests.has_request(&bond.owner),
                min_bond: metadata
                    .map(|m| m.lowest_top_delegation_amount)
                    .unwrap_or_default(),
                amount,
                owner: bond.owner,
            }
        })
        .collect();

    Ok(items)
}

/// Sum duplicate entries for the same collator, keeping first-seen order
pub(crate) fn merge_delegations(delegations: &[Bond]) -> Vec<Bond> {
    let mut merged: Vec<(String, Bond)> = Vec::new();

    for bond in delegations {
        let key = canonical_address(&bond.owner);
        match merged.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => existing.amount = existing.amount.saturating_add(bond.amount),
            None => merged.push((key, bond.clone())),
        }
    }

    merged.into_iter().map(|(_, bond)| bond).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{
        DelegationAction, DelegationRequest, DelegatorState, PendingDelegationRequests,
        RequestAction, ScheduledRequest,
    };
    use crate::mock::{candidate, MockChain, ALICE, ALICE_KUSAMA, BOB, BOB_POLKADOT, CHARLIE, DAVE};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn moonbeam() -> NetworkProfile {
        NetworkProfile::new("moonbeam", 18, "GLMR")
    }

    fn delegator(delegations: Vec<Bond>) -> DelegatorState {
        DelegatorState {
            id: ALICE.to_string(),
            total: delegations.iter().map(|b| b.amount).sum(),
            delegations,
            requests: None,
        }
    }

    fn identity(value: serde_json::Value) -> IdentityRegistration {
        IdentityRegistration::from_value(value).unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_other_stake_is_exact() {
        let total: Balance = 1_234_567_890_123_456_789_012;
        let own: Balance = 987_654_321_987_654_321;
        let chain = MockChain::default()
            .with_pool(vec![Bond::new(BOB, total)])
            .with_candidate(BOB, candidate(own, 4, total, 10));

        let options = get_collators_info(&moonbeam(), &chain, ALICE).await.unwrap();
        let info = &options.validators_info[0];

        assert_eq!(info.other_stake, info.total_stake - info.own_stake);
        assert_eq!(info.other_stake, to_display(total - own, 18).unwrap());
        assert_eq!(info.nominator_count, 4);
        assert_eq!(info.expected_return, Decimal::ZERO);
        assert_eq!(info.commission, dec!(20));
        assert!(!info.blocked);
        assert!(options.era.is_none());
        assert!(!options.is_bonded_before);
    }

    #[tokio::test]
    async fn test_nominated_flags_follow_pending_requests() {
        let chain = MockChain::default()
            .with_pool(vec![
                Bond::new(BOB, 1000),
                Bond::new(CHARLIE, 1000),
                Bond::new(DAVE, 1000),
            ])
            .with_candidate(BOB, candidate(100, 1, 1000, 10))
            .with_candidate(CHARLIE, candidate(100, 1, 1000, 10))
            .with_candidate(DAVE, candidate(100, 1, 1000, 10))
            .with_delegator(delegator(vec![Bond::new(BOB, 50), Bond::new(CHARLIE, 50)]))
            .with_scheduled(
                BOB,
                vec![ScheduledRequest {
                    delegator: ALICE_KUSAMA.to_string(),
                    when_executable: 10,
                    action: DelegationAction::Decrease(20),
                }],
            )
            .with_scheduled(
                CHARLIE,
                vec![ScheduledRequest {
                    delegator: ALICE.to_string(),
                    when_executable: 10,
                    action: DelegationAction::Revoke(50),
                }],
            );

        let options = get_collators_info(&moonbeam(), &chain, ALICE).await.unwrap();
        let by_address = |address: &str| {
            options
                .validators_info
                .iter()
                .find(|v| v.address == address)
                .unwrap()
        };

        // pending decrease keeps the nomination
        assert!(by_address(BOB).is_nominated);
        assert!(by_address(BOB).has_scheduled_request);
        // pending revoke ends it
        assert!(!by_address(CHARLIE).is_nominated);
        assert!(by_address(CHARLIE).has_scheduled_request);
        assert!(!by_address(DAVE).is_nominated);
        assert!(!by_address(DAVE).has_scheduled_request);

        assert!(options.is_bonded_before);
        assert_eq!(options.bonded_validators, vec![BOB, CHARLIE]);
        assert_eq!(options.max_nominations, 100);
        assert_eq!(options.max_nominator_per_validator, 300);
    }

    #[tokio::test]
    async fn test_embedded_requests_on_bifrost() {
        let mut state = delegator(vec![Bond::new(BOB, 50)]);
        state.requests = Some(PendingDelegationRequests {
            requests: vec![DelegationRequest {
                collator: BOB_POLKADOT.to_string(),
                amount: 50,
                when_executable: 3,
                action: RequestAction::Revoke,
            }],
            revocations_count: 1,
            less_total: 50,
        });
        let chain = MockChain::default()
            .with_pool(vec![Bond::new(BOB, 1000)])
            .with_candidate(BOB, candidate(100, 1, 1000, 10))
            .with_delegator(state)
            // ignored on networks with inline requests
            .failing("delegation_scheduled_requests");

        let bifrost = NetworkProfile::new("bifrost", 12, "BNC");
        let options = get_collators_info(&bifrost, &chain, ALICE).await.unwrap();

        assert!(!options.validators_info[0].is_nominated);
        assert!(options.validators_info[0].has_scheduled_request);
    }

    #[tokio::test]
    async fn test_min_bond_and_identity() {
        let chain = MockChain::default()
            .with_pool(vec![Bond::new(BOB, 10_000), Bond::new(CHARLIE, 10_000)])
            .with_candidate(BOB, candidate(100, 1, 10_000, 2))
            .with_candidate(CHARLIE, candidate(100, 1, 10_000, 700))
            .with_constant(StakingConstant::MinDelegation, 500)
            .with_identity(
                BOB,
                identity(json!({
                    "judgements": [[0, "Reasonable"]],
                    "info": { "display": { "Raw": "0xabc" }, "legal": { "Raw": "Alice" } }
                })),
            );

        let network = NetworkProfile::new("devnet", 2, "UNIT");
        let options = get_collators_info(&network, &chain, ALICE).await.unwrap();

        let bob = &options.validators_info[0];
        assert_eq!(bob.min_bond, dec!(5));
        assert_eq!(bob.identity.as_deref(), Some("Alice"));
        assert!(bob.is_verified);

        let charlie = &options.validators_info[1];
        assert_eq!(charlie.min_bond, dec!(7));
        assert_eq!(charlie.identity, None);
        assert!(!charlie.is_verified);
    }

    #[tokio::test]
    async fn test_missing_or_idle_candidate_is_blocked() {
        let mut idle = candidate(100, 1, 1000, 10);
        idle.status = CollatorStatus::Idle;
        let chain = MockChain::default()
            .with_pool(vec![Bond::new(BOB, 1000), Bond::new(CHARLIE, 1000)])
            .with_candidate(BOB, idle);

        let options = get_collators_info(&moonbeam(), &chain, ALICE).await.unwrap();
        assert!(options.validators_info[0].blocked);
        assert!(options.validators_info[1].blocked);
        assert_eq!(options.validators_info[1].own_stake, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_any_failed_fetch_fails_the_call() {
        let chain = MockChain::default()
            .with_pool(vec![Bond::new(BOB, 1000)])
            .failing("identity_of");
        assert!(get_collators_info(&moonbeam(), &chain, ALICE).await.is_err());

        let chain = MockChain::default().failing("collator_commission");
        assert!(get_collators_info(&moonbeam(), &chain, ALICE).await.is_err());
    }

    #[tokio::test]
    async fn test_delegation_items_subtract_pending() {
        let chain = MockChain::default()
            .with_candidate(BOB, candidate(100, 1, 1000, 10))
            .with_candidate(CHARLIE, candidate(100, 1, 1000, 1))
            .with_delegator(delegator(vec![
                Bond::new(BOB, 60),
                Bond::new(CHARLIE, 30),
                Bond::new(BOB_POLKADOT, 40),
            ]))
            .with_scheduled(
                BOB,
                vec![ScheduledRequest {
                    delegator: ALICE.to_string(),
                    when_executable: 10,
                    action: DelegationAction::Decrease(25),
                }],
            )
            .with_scheduled(
                CHARLIE,
                vec![ScheduledRequest {
                    delegator: ALICE.to_string(),
                    when_executable: 10,
                    action: DelegationAction::Revoke(45),
                }],
            );

        let items = get_delegation_info(&moonbeam(), &chain, ALICE).await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].owner, BOB);
        // 60 + 40 merged, minus 25 pending
        assert_eq!(items[0].amount, 75);
        assert_eq!(items[0].min_bond, 10);
        assert!(items[0].has_scheduled_request);
        // pending exceeds the delegation
        assert_eq!(items[1].owner, CHARLIE);
        assert_eq!(items[1].amount, 0);
        assert_eq!(items[1].min_bond, 1);
    }

    #[tokio::test]
    async fn test_delegation_min_bond_is_collator_minimum() {
        let chain = MockChain::default()
            .with_candidate(BOB, candidate(100, 1, 1000, 2))
            .with_constant(StakingConstant::MinDelegation, 500)
            .with_delegator(delegator(vec![Bond::new(BOB, 60)]));

        let items = get_delegation_info(&moonbeam(), &chain, ALICE).await.unwrap();
        assert_eq!(items[0].min_bond, 2);
    }

    #[tokio::test]
    async fn test_empty_delegator_state_counts_as_bonded_before() {
        let chain = MockChain::default()
            .with_pool(vec![Bond::new(BOB, 1000)])
            .with_candidate(BOB, candidate(100, 1, 1000, 10))
            .with_delegator(delegator(Vec::new()));

        let options = get_collators_info(&moonbeam(), &chain, ALICE).await.unwrap();
        assert!(options.is_bonded_before);
        assert!(options.bonded_validators.is_empty());
        assert!(!options.validators_info[0].is_nominated);
    }

    #[tokio::test]
    async fn test_delegation_items_on_bifrost() {
        let mut state = delegator(vec![Bond::new(BOB, 80), Bond::new(CHARLIE, 50)]);
        state.requests = Some(PendingDelegationRequests {
            requests: vec![DelegationRequest {
                collator: BOB_POLKADOT.to_string(),
                amount: 30,
                when_executable: 3,
                action: RequestAction::Decrease,
            }],
            revocations_count: 0,
            less_total: 30,
        });
        let chain = MockChain::default()
            .with_candidate(BOB, candidate(100, 1, 1000, 10))
            .with_candidate(CHARLIE, candidate(100, 1, 1000, 10))
            .with_delegator(state)
            .failing("delegation_scheduled_requests");

        let bifrost = NetworkProfile::new("bifrost", 12, "BNC");
        let items = get_delegation_info(&bifrost, &chain, ALICE).await.unwrap();

        assert_eq!(items[0].amount, 50);
        assert!(items[0].has_scheduled_request);
        assert_eq!(items[1].amount, 50);
        assert!(!items[1].has_scheduled_request);
    }

    #[tokio::test]
    async fn test_no_delegator_state() {
        let chain = MockChain::default();
        let items = get_delegation_info(&moonbeam(), &chain, ALICE).await.unwrap();
        assert!(items.is_empty());
    }
}
