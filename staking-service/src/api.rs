use anyhow::{Context, Result};
use futures::try_join;
use para_staking::extrinsic::DelegationState;
use para_staking::validation::is_unstake_all;
use para_staking::{
    get_chain_staking_metadata, get_collators_info, get_delegation_info, get_nominator_metadata,
    get_tx_info, get_unlocking_info, handle_unlocking_info, validate_bonding_condition,
    validate_unbonding_condition, BasicTxInfo, ChainQuery, ExtrinsicBuilder, GatewayClient,
    NetworkProfile, StakingCall, StakingTxError,
};
use poem_openapi::param::{Path, Query};
use poem_openapi::payload::Json;
use poem_openapi::{ApiResponse, Object, OpenApi};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A configured network and the gateway serving it
pub struct StakingNetwork {
    pub profile: NetworkProfile,
    pub client: GatewayClient,
}

pub struct Api {
    pub networks: Arc<HashMap<String, StakingNetwork>>,
}

#[derive(Debug, Object)]
pub struct BondRequest {
    /// Delegator address (SS58 or H160)
    pub delegator: String,
    /// Collator to bond to
    pub collator: String,
    /// Amount in whole tokens, e.g. "1.5"
    pub amount: String,
}

#[derive(Debug, Object)]
pub struct UnbondRequest {
    pub delegator: String,
    pub collator: String,
    /// Amount in whole tokens
    pub amount: String,
    /// Revoke the whole delegation. Derived from the active stake when omitted.
    pub unstake_all: Option<bool>,
}

#[derive(Debug, Object)]
pub struct RequestTarget {
    pub delegator: String,
    pub collator: String,
}

#[derive(Debug, Object)]
pub struct TxInfoResponse {
    /// Fee with symbol, e.g. "0.0123 GLMR"
    pub fee: String,
    /// Fee in minimal units
    pub raw_fee: String,
    /// Free balance cannot cover fee plus bond
    pub balance_error: bool,
}

impl From<BasicTxInfo> for TxInfoResponse {
    fn from(info: BasicTxInfo) -> Self {
        Self {
            fee: info.fee,
            raw_fee: info.raw_fee.to_string(),
            balance_error: info.balance_error,
        }
    }
}

#[derive(Debug, Object)]
pub struct TxResponse {
    /// `parachainStaking` call to sign and submit
    pub call: Value,
    pub tx_info: TxInfoResponse,
    /// Delegation state once the call executes
    pub next_state: Option<String>,
}

#[derive(Debug, Object)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

#[derive(Debug, Object)]
pub struct HealthResponse {
    pub status: String,
    pub networks: Vec<String>,
}

#[derive(ApiResponse)]
pub enum DataResult {
    #[oai(status = 200)]
    Ok(Json<Value>),
    #[oai(status = 404)]
    NotFound(Json<ErrorResponse>),
    #[oai(status = 500)]
    InternalError(Json<ErrorResponse>),
}

#[derive(ApiResponse)]
pub enum TxResult {
    #[oai(status = 200)]
    Ok(Json<TxResponse>),
    #[oai(status = 400)]
    BadRequest(Json<ErrorResponse>),
    #[oai(status = 404)]
    NotFound(Json<ErrorResponse>),
    #[oai(status = 500)]
    InternalError(Json<ErrorResponse>),
}

fn unknown_network(key: &str) -> Json<ErrorResponse> {
    Json(ErrorResponse {
        error: format!("Unknown network: {}", key),
    })
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).context("Failed to serialize response")
}

fn data_result(what: &str, result: Result<Value>) -> DataResult {
    match result {
        Ok(value) => DataResult::Ok(Json(value)),
        Err(e) => {
            tracing::error!("Failed to load {}: {:#}", what, e);
            DataResult::InternalError(Json(ErrorResponse {
                error: format!("Failed to load {}: {:#}", what, e),
            }))
        }
    }
}

fn validation_failed(errors: &[StakingTxError]) -> TxResult {
    let error = errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");

    tracing::info!("Rejected staking request: {}", error);
    TxResult::BadRequest(Json(ErrorResponse { error }))
}

/// Outcome of preparing a call, before fee estimation
enum Prepared {
    Call(StakingCall, DelegationState),
    Rejected(Vec<StakingTxError>),
}

impl Api {
    fn network(&self, key: &str) -> Option<&StakingNetwork> {
        self.networks.get(key)
    }

    async fn finish_tx(
        &self,
        network: &StakingNetwork,
        signer: &str,
        prepared: Result<Prepared>,
    ) -> TxResult {
        let (call, state) = match prepared {
            Ok(Prepared::Call(call, state)) => (call, state),
            Ok(Prepared::Rejected(errors)) => return validation_failed(&errors),
            Err(e) => {
                tracing::error!("Failed to build call on {}: {:#}", network.profile.key, e);
                return TxResult::BadRequest(Json(ErrorResponse {
                    error: format!("{:#}", e),
                }));
            }
        };

        let tx_info = get_tx_info(&network.profile, &network.client, &network.client, &call, signer).await;
        let response = tx_info.and_then(|info| {
            Ok(TxResponse {
                call: to_json(&call)?,
                tx_info: info.into(),
                next_state: state
                    .transition(&call)
                    .map(|next| to_json(&next))
                    .transpose()?
                    .and_then(|v| v.as_str().map(str::to_string)),
            })
        });

        match response {
            Ok(response) => {
                tracing::info!(
                    "Prepared {} on {} for {}",
                    call.method(),
                    network.profile.key,
                    signer
                );
                TxResult::Ok(Json(response))
            }
            Err(e) => {
                tracing::error!("Fee estimation failed on {}: {:#}", network.profile.key, e);
                TxResult::InternalError(Json(ErrorResponse {
                    error: format!("Fee estimation failed: {:#}", e),
                }))
            }
        }
    }
}

async fn prepare_bond(
    network: &NetworkProfile,
    chain: &dyn ChainQuery,
    req: &BondRequest,
) -> Result<Prepared> {
    let builder = ExtrinsicBuilder::new(network, chain);
    let amount = builder.parse_amount(&req.amount)?;

    let (chain_metadata, nominator, candidate, state) = try_join!(
        get_chain_staking_metadata(network, chain),
        get_nominator_metadata(network, chain, &req.delegator),
        chain.candidate_info(&req.collator),
        builder.delegation_state(&req.delegator, &req.collator),
    )?;

    let collator_min_bond = candidate
        .map(|c| c.lowest_top_delegation_amount)
        .unwrap_or_default();
    let errors = validate_bonding_condition(
        amount,
        &req.collator,
        collator_min_bond,
        &chain_metadata,
        Some(&nominator),
    );
    if !errors.is_empty() {
        return Ok(Prepared::Rejected(errors));
    }

    let call = builder
        .bonding_call(&req.delegator, &req.collator, amount)
        .await?;
    Ok(Prepared::Call(call, state))
}

async fn prepare_unbond(
    network: &NetworkProfile,
    chain: &dyn ChainQuery,
    req: &UnbondRequest,
) -> Result<Prepared> {
    let builder = ExtrinsicBuilder::new(network, chain);
    let amount = builder.parse_amount(&req.amount)?;

    let (chain_metadata, nominator, state) = try_join!(
        get_chain_staking_metadata(network, chain),
        get_nominator_metadata(network, chain, &req.delegator),
        builder.delegation_state(&req.delegator, &req.collator),
    )?;

    let errors = validate_unbonding_condition(amount, &req.collator, &chain_metadata, &nominator);
    if !errors.is_empty() {
        return Ok(Prepared::Rejected(errors));
    }

    let unstake_all = req
        .unstake_all
        .unwrap_or_else(|| is_unstake_all(&req.collator, &nominator, amount));

    Ok(Prepared::Call(
        builder.unbonding_call(&req.collator, amount, unstake_all),
        state,
    ))
}

#[OpenApi]
impl Api {
    /// Collator candidates annotated with the delegator's position
    #[oai(path = "/api/:network/collators", method = "get")]
    async fn collators(&self, network: Path<String>, delegator: Query<String>) -> DataResult {
        let Some(net) = self.network(&network.0) else {
            return DataResult::NotFound(unknown_network(&network.0));
        };

        let result = get_collators_info(&net.profile, &net.client, &delegator.0)
            .await
            .and_then(|options| to_json(&options));
        data_result("collators", result)
    }

    /// Delegations of a delegator with pending withdrawals subtracted
    #[oai(path = "/api/:network/delegations", method = "get")]
    async fn delegations(&self, network: Path<String>, delegator: Query<String>) -> DataResult {
        let Some(net) = self.network(&network.0) else {
            return DataResult::NotFound(unknown_network(&network.0));
        };

        let result = get_delegation_info(&net.profile, &net.client, &delegator.0)
            .await
            .and_then(|items| to_json(&items));
        data_result("delegations", result)
    }

    /// Next withdrawal of a delegator and when it can be executed
    #[oai(path = "/api/:network/unlocking", method = "get")]
    async fn unlocking(&self, network: Path<String>, delegator: Query<String>) -> DataResult {
        let Some(net) = self.network(&network.0) else {
            return DataResult::NotFound(unknown_network(&network.0));
        };

        let result = get_unlocking_info(&net.profile, &net.client, &delegator.0)
            .await
            .and_then(|schedule| handle_unlocking_info(&net.profile, &delegator.0, &schedule))
            .and_then(|info| to_json(&info));
        data_result("unlocking info", result)
    }

    /// Round, inflation and unstaking period of a network
    #[oai(path = "/api/:network/metadata", method = "get")]
    async fn metadata(&self, network: Path<String>) -> DataResult {
        let Some(net) = self.network(&network.0) else {
            return DataResult::NotFound(unknown_network(&network.0));
        };

        let result = get_chain_staking_metadata(&net.profile, &net.client)
            .await
            .and_then(|metadata| to_json(&metadata));
        data_result("staking metadata", result)
    }

    /// Nominations, unstakings and staking status of a delegator
    #[oai(path = "/api/:network/nominator", method = "get")]
    async fn nominator(&self, network: Path<String>, delegator: Query<String>) -> DataResult {
        let Some(net) = self.network(&network.0) else {
            return DataResult::NotFound(unknown_network(&network.0));
        };

        let result = get_nominator_metadata(&net.profile, &net.client, &delegator.0)
            .await
            .and_then(|metadata| to_json(&metadata));
        data_result("nominator metadata", result)
    }

    /// Build a `delegate` or `delegatorBondMore` call
    #[oai(path = "/api/:network/tx/bond", method = "post")]
    async fn bond(&self, network: Path<String>, req: Json<BondRequest>) -> TxResult {
        let Some(net) = self.network(&network.0) else {
            return TxResult::NotFound(unknown_network(&network.0));
        };

        let prepared = prepare_bond(&net.profile, &net.client, &req.0).await;
        self.finish_tx(net, &req.0.delegator, prepared).await
    }

    /// Build a `scheduleDelegatorBondLess` or `scheduleRevokeDelegation` call
    #[oai(path = "/api/:network/tx/unbond", method = "post")]
    async fn unbond(&self, network: Path<String>, req: Json<UnbondRequest>) -> TxResult {
        let Some(net) = self.network(&network.0) else {
            return TxResult::NotFound(unknown_network(&network.0));
        };

        let prepared = prepare_unbond(&net.profile, &net.client, &req.0).await;
        self.finish_tx(net, &req.0.delegator, prepared).await
    }

    /// Build an `executeDelegationRequest` call
    #[oai(path = "/api/:network/tx/withdraw", method = "post")]
    async fn withdraw(&self, network: Path<String>, req: Json<RequestTarget>) -> TxResult {
        let Some(net) = self.network(&network.0) else {
            return TxResult::NotFound(unknown_network(&network.0));
        };

        let builder = ExtrinsicBuilder::new(&net.profile, &net.client);
        let prepared = builder
            .delegation_state(&req.0.delegator, &req.0.collator)
            .await
            .map(|state| {
                Prepared::Call(
                    builder.withdrawal_call(&req.0.delegator, &req.0.collator),
                    state,
                )
            });
        self.finish_tx(net, &req.0.delegator, prepared).await
    }

    /// Build a `cancelDelegationRequest` call
    #[oai(path = "/api/:network/tx/cancel", method = "post")]
    async fn cancel(&self, network: Path<String>, req: Json<RequestTarget>) -> TxResult {
        let Some(net) = self.network(&network.0) else {
            return TxResult::NotFound(unknown_network(&network.0));
        };

        let builder = ExtrinsicBuilder::new(&net.profile, &net.client);
        let prepared = builder
            .delegation_state(&req.0.delegator, &req.0.collator)
            .await
            .map(|state| Prepared::Call(builder.cancel_withdrawal_call(&req.0.collator), state));
        self.finish_tx(net, &req.0.delegator, prepared).await
    }

    /// Health check
    #[oai(path = "/health", method = "get")]
    async fn health(&self) -> Json<HealthResponse> {
        let mut networks: Vec<String> = self.networks.keys().cloned().collect();
        networks.sort();

        Json(HealthResponse {
            status: "ok".to_string(),
            networks,
        })
    }
}
