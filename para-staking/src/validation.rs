//! Pre-flight checks for bond and unbond requests

use serde::Serialize;
use thiserror::Error;

use crate::address::is_same_address;
use crate::amount::Balance;
use crate::metadata::{ChainStakingMetadata, NominationInfo, NominatorMetadata, StakingStatus};

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StakingTxError {
    #[error("stake is below the minimum of {min_stake}")]
    NotEnoughMinStake { min_stake: Balance },
    #[error("cannot nominate more than {max} collators")]
    ExceedMaxNominations { max: u128 },
    #[error("a withdrawal request for this collator is already pending")]
    ExistUnstakingRequest,
    #[error("remaining stake must be zero or at least the minimum stake")]
    InvalidActiveStake,
    #[error("no nomination found for collator {collator}")]
    UnknownNomination { collator: String },
}

fn find_nomination<'a>(nominator: &'a NominatorMetadata, collator: &str) -> Option<&'a NominationInfo> {
    nominator
        .nominations
        .iter()
        .find(|n| is_same_address(&n.validator_address, collator))
}

/// Checks for bonding `amount` to `collator`, whose own minimum is `collator_min_bond`
pub fn validate_bonding_condition(
    amount: Balance,
    collator: &str,
    collator_min_bond: Balance,
    chain_metadata: &ChainStakingMetadata,
    nominator: Option<&NominatorMetadata>,
) -> Vec<StakingTxError> {
    let mut errors = Vec::new();
    let min_stake = collator_min_bond.max(chain_metadata.min_stake);

    let nominator = match nominator {
        Some(n) if n.status != StakingStatus::NotStaking => n,
        _ => {
            if amount < min_stake {
                errors.push(StakingTxError::NotEnoughMinStake { min_stake });
            }
            return errors;
        }
    };

    match find_nomination(nominator, collator) {
        None => {
            if amount < min_stake {
                errors.push(StakingTxError::NotEnoughMinStake { min_stake });
            }
            let delegation_count = nominator.nominations.len() as u128 + 1;
            if delegation_count > chain_metadata.max_validator_per_nominator {
                errors.push(StakingTxError::ExceedMaxNominations {
                    max: chain_metadata.max_validator_per_nominator,
                });
            }
        }
        Some(nomination) => {
            if amount.saturating_add(nomination.active_stake) < min_stake {
                errors.push(StakingTxError::NotEnoughMinStake { min_stake });
            }
            if nomination.has_unstaking {
                errors.push(StakingTxError::ExistUnstakingRequest);
            }
        }
    }

    errors
}

/// Checks for unbonding `amount` from `collator`
pub fn validate_unbonding_condition(
    amount: Balance,
    collator: &str,
    chain_metadata: &ChainStakingMetadata,
    nominator: &NominatorMetadata,
) -> Vec<StakingTxError> {
    let Some(nomination) = find_nomination(nominator, collator) else {
        return vec![StakingTxError::UnknownNomination {
            collator: collator.to_string(),
        }];
    };

    let mut errors = Vec::new();
    let min_stake = nomination.validator_min_stake.max(chain_metadata.min_stake);

    if nomination.has_unstaking {
        errors.push(StakingTxError::ExistUnstakingRequest);
    }

    match nomination.active_stake.checked_sub(amount) {
        Some(0) => {}
        Some(remaining) if remaining >= min_stake => {}
        _ => errors.push(StakingTxError::InvalidActiveStake),
    }

    errors
}

/// Whether unbonding `amount` empties the nomination
pub fn is_unstake_all(collator: &str, nominator: &NominatorMetadata, amount: Balance) -> bool {
    find_nomination(nominator, collator).map_or(false, |n| n.active_stake == amount)
}
