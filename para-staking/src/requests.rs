//! Pending withdrawal requests of a delegator
//!
//! Bifrost keeps a delegator's requests inline in `delegatorState`; other
//! networks schedule them per collator under `delegationScheduledRequests`.
//! Both are flattened into [`PendingRequest`]s here.

use anyhow::{Context, Result};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

use crate::address::{canonical_address, is_same_address};
use crate::amount::Balance;
use crate::chain::{ChainQuery, DelegationAction, DelegatorState, RequestAction};
use crate::network::RequestStorage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithdrawalAction {
    #[serde(rename = "revoke")]
    Revoke,
    #[serde(rename = "bondless")]
    BondLess,
}

impl WithdrawalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalAction::Revoke => "revoke",
            WithdrawalAction::BondLess => "bondless",
        }
    }
}

impl From<RequestAction> for WithdrawalAction {
    fn from(action: RequestAction) -> Self {
        match action {
            RequestAction::Revoke => WithdrawalAction::Revoke,
            RequestAction::Decrease => WithdrawalAction::BondLess,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRequest {
    pub collator: String,
    pub action: WithdrawalAction,
    pub amount: Balance,
    /// Round from which the request can be executed
    pub round: u32,
}

impl PendingRequest {
    pub fn is_revoke(&self) -> bool {
        self.action == WithdrawalAction::Revoke
    }
}

/// Distinct collators the delegator is bonded to, in first-seen order
pub fn bonded_collators(state: Option<&DelegatorState>) -> Vec<String> {
    let mut seen = Vec::<String>::new();
    let mut collators = Vec::new();

    for bond in state.map(|s| s.delegations.as_slice()).unwrap_or_default() {
        let canonical = canonical_address(&bond.owner);
        if !seen.contains(&canonical) {
            seen.push(canonical);
            collators.push(bond.owner.clone());
        }
    }

    collators
}

impl RequestStorage {
    /// Every pending request `delegator` has, given its (already fetched) state
    pub async fn pending_requests(
        self,
        chain: &dyn ChainQuery,
        delegator: &str,
        state: Option<&DelegatorState>,
    ) -> Result<Vec<PendingRequest>> {
        match self {
            RequestStorage::Embedded => Ok(embedded_requests(state)),
            RequestStorage::PerCollator => {
                scheduled_requests(chain, delegator, &bonded_collators(state)).await
            }
        }
    }
}

fn embedded_requests(state: Option<&DelegatorState>) -> Vec<PendingRequest> {
    state
        .and_then(|s| s.requests.as_ref())
        .map(|pending| {
            pending
                .requests
                .iter()
                .map(|request| PendingRequest {
                    collator: request.collator.clone(),
                    action: request.action.into(),
                    amount: request.amount,
                    round: request.when_executable,
                })
                .collect()
        })
        .unwrap_or_default()
}

async fn scheduled_requests(
    chain: &dyn ChainQuery,
    delegator: &str,
    collators: &[String],
) -> Result<Vec<PendingRequest>> {
    let per_collator = try_join_all(collators.iter().map(|collator| async move {
        let scheduled = chain
            .delegation_scheduled_requests(collator)
            .await
            .context(format!("Failed to query scheduled requests of {}", collator))?;

        // node output may use another address format than the caller
        let mine = scheduled
            .into_iter()
            .filter(|request| is_same_address(&request.delegator, delegator))
            .map(|request| {
                let action = match request.action {
                    DelegationAction::Revoke(_) => WithdrawalAction::Revoke,
                    DelegationAction::Decrease(_) => WithdrawalAction::BondLess,
                };
                PendingRequest {
                    collator: collator.clone(),
                    action,
                    amount: request.action.amount(),
                    round: request.when_executable,
                }
            })
            .collect::<Vec<_>>();

        anyhow::Ok(mine)
    }))
    .await?;

    Ok(per_collator.into_iter().flatten().collect())
}

/// Lookup of pending requests by collator
#[derive(Debug, Clone, Default)]
pub struct RequestIndex {
    requests: Vec<PendingRequest>,
}

impl RequestIndex {
    pub fn new(requests: Vec<PendingRequest>) -> Self {
        Self { requests }
    }

    pub fn for_collator<'a>(&'a self, collator: &'a str) -> impl Iterator<Item = &'a PendingRequest> {
        self.requests
            .iter()
            .filter(move |request| is_same_address(&request.collator, collator))
    }

    pub fn has_request(&self, collator: &str) -> bool {
        self.for_collator(collator).next().is_some()
    }

    pub fn has_revoke(&self, collator: &str) -> bool {
        self.for_collator(collator).any(PendingRequest::is_revoke)
    }

    /// Sum of every pending amount against `collator`
    pub fn pending_amount(&self, collator: &str) -> Balance {
        self.for_collator(collator)
            .fold(0, |total: Balance, request| total.saturating_add(request.amount))
    }

    pub fn requests(&self) -> &[PendingRequest] {
        &self.requests
    }

    pub fn into_requests(self) -> Vec<PendingRequest> {
        self.requests
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
