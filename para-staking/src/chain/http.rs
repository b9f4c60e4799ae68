//! JSON node gateway client
//!
//! Talks to a gateway exposing parachain storage, constants, balances and fee
//! estimation over HTTP:
//!
//! - `GET  /pallets/{pallet}/storage/{item}?keys[]=...` -> `{ "value": ... }`
//! - `GET  /pallets/{pallet}/consts/{name}` -> `{ "value": ... }`
//! - `GET  /accounts/{address}/balance-info` -> `{ "free": ... }`
//! - `POST /transaction/fee-estimate` -> `{ "partialFee": ... }`

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::storage::{balance, Percentage, RawBalance};
use super::{
    BalanceQuery, Bond, CandidateMetadata, ChainQuery, DelegatorState, IdentityRegistration,
    InflationConfig, PaymentInfo, RoundInfo, ScheduledRequest, StakingConstant, TransactionApi,
};
use crate::amount::Balance;
use crate::extrinsic::{StakingCall, STAKING_PALLET};

const IDENTITY_PALLET: &str = "identity";

#[derive(Deserialize)]
struct ValueResponse<T> {
    value: T,
}

#[derive(Deserialize)]
struct BalanceInfoResponse {
    #[serde(with = "balance")]
    free: Balance,
}

#[derive(Serialize)]
struct FeeEstimateRequest<'a> {
    signer: &'a str,
    pallet: &'a str,
    call: &'a StakingCall,
}

#[derive(Debug, Clone)]
pub struct GatewayClient {
    base_url: String,
    client: reqwest::Client,
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn storage_url(&self, pallet: &str, item: &str) -> String {
        format!("{}/pallets/{}/storage/{}", self.base_url, pallet, item)
    }

    fn const_url(&self, pallet: &str, name: &str) -> String {
        format!("{}/pallets/{}/consts/{}", self.base_url, pallet, name)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .context(format!("Failed to call {}", url))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error = resp.text().await.unwrap_or_else(|_| "Unknown".to_string());
            anyhow::bail!("Gateway request {} failed ({}): {}", url, status, error);
        }

        resp.json()
            .await
            .context(format!("Failed to parse response of {}", url))
    }

    /// Read a storage item. Empty storage comes back as `null`.
    async fn storage<T: DeserializeOwned>(&self, pallet: &str, item: &str, keys: &[&str]) -> Result<T> {
        let query: Vec<(&str, &str)> = keys.iter().map(|key| ("keys[]", *key)).collect();
        let resp: ValueResponse<T> = self
            .get_json(&self.storage_url(pallet, item), &query)
            .await
            .context(format!("Failed to read {}.{}", pallet, item))?;

        Ok(resp.value)
    }
}

#[async_trait]
impl ChainQuery for GatewayClient {
    async fn candidate_pool(&self) -> Result<Vec<Bond>> {
        let pool: Option<Vec<Bond>> = self.storage(STAKING_PALLET, "candidatePool", &[]).await?;
        Ok(pool.unwrap_or_default())
    }

    async fn delegator_state(&self, delegator: &str) -> Result<Option<DelegatorState>> {
        self.storage(STAKING_PALLET, "delegatorState", &[delegator])
            .await
    }

    async fn collator_commission(&self) -> Result<Decimal> {
        let commission: Percentage = self
            .storage(STAKING_PALLET, "collatorCommission", &[])
            .await?;
        Ok(commission.0)
    }

    async fn delegation_scheduled_requests(&self, collator: &str) -> Result<Vec<ScheduledRequest>> {
        let requests: Option<Vec<ScheduledRequest>> = self
            .storage(STAKING_PALLET, "delegationScheduledRequests", &[collator])
            .await?;
        Ok(requests.unwrap_or_default())
    }

    async fn candidate_info(&self, collator: &str) -> Result<Option<CandidateMetadata>> {
        self.storage(STAKING_PALLET, "candidateInfo", &[collator])
            .await
    }

    async fn identity_of(&self, address: &str) -> Result<Option<IdentityRegistration>> {
        let raw: Value = self
            .storage(IDENTITY_PALLET, "identityOf", &[address])
            .await?;
        IdentityRegistration::from_value(raw).context(format!("Invalid identity of {}", address))
    }

    async fn round(&self) -> Result<RoundInfo> {
        self.storage(STAKING_PALLET, "round", &[]).await
    }

    async fn constant(&self, constant: StakingConstant) -> Result<u128> {
        let url = self.const_url(STAKING_PALLET, constant.name());
        let resp: ValueResponse<RawBalance> = self
            .get_json(&url, &[])
            .await
            .context(format!("Failed to read constant {}", constant.name()))?;

        Ok(resp.value.0)
    }

    async fn staked(&self, round: u32) -> Result<Balance> {
        let round = round.to_string();
        let staked: Option<RawBalance> = self
            .storage(STAKING_PALLET, "staked", &[round.as_str()])
            .await?;
        Ok(staked.map(|s| s.0).unwrap_or_default())
    }

    async fn inflation_config(&self) -> Result<InflationConfig> {
        self.storage(STAKING_PALLET, "inflationConfig", &[]).await
    }
}

#[async_trait]
impl TransactionApi for GatewayClient {
    async fn payment_info(&self, call: &StakingCall, signer: &str) -> Result<PaymentInfo> {
        let url = format!("{}/transaction/fee-estimate", self.base_url);

        debug!("Estimating fee of {}.{} for {}", call.pallet(), call.method(), signer);

        let resp = self
            .client
            .post(&url)
            .json(&FeeEstimateRequest {
                signer,
                pallet: call.pallet(),
                call,
            })
            .send()
            .await
            .context(format!("Failed to call {}", url))?;

        if !resp.status().is_success() {
            let error = resp.text().await.unwrap_or_else(|_| "Unknown".to_string());
            anyhow::bail!("Fee estimation of {} failed: {}", call.method(), error);
        }

        resp.json()
            .await
            .context("Failed to parse fee estimate response")
    }
}

#[async_trait]
impl BalanceQuery for GatewayClient {
    async fn free_balance(&self, address: &str) -> Result<Balance> {
        let url = format!("{}/accounts/{}/balance-info", self.base_url, address);
        let resp: BalanceInfoResponse = self
            .get_json(&url, &[])
            .await
            .context(format!("Failed to read balance of {}", address))?;

        Ok(resp.free)
    }
}
