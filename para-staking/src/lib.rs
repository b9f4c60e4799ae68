pub mod address;
pub mod amount;
pub mod bonding;
pub mod chain;
pub mod extrinsic;
pub mod metadata;
pub mod network;
pub mod requests;
pub mod unlocking;
pub mod validation;

#[cfg(test)]
mod mock;

// Re-export commonly used items

// Chain access
pub use chain::{BalanceQuery, ChainQuery, StakingConstant, TransactionApi};
#[cfg(feature = "client")]
pub use chain::http::GatewayClient;

// Delegation workflow
pub use bonding::{get_collators_info, get_delegation_info, BondingOptions, DelegationItem, ValidatorInfo};
pub use extrinsic::{get_tx_info, BasicTxInfo, DelegationState, ExtrinsicBuilder, StakingCall};
pub use unlocking::{get_unlocking_info, handle_unlocking_info, UnlockingSchedule, UnlockingStakeInfo};

// Supplementary views and checks
pub use metadata::{get_chain_staking_metadata, get_nominator_metadata, ChainStakingMetadata, NominatorMetadata};
pub use validation::{validate_bonding_condition, validate_unbonding_condition, StakingTxError};

pub use amount::Balance;
pub use network::{NetworkProfile, RequestStorage};
