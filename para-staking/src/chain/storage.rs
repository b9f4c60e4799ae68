//! Typed `parachainStaking` storage values
//!
//! Node gateways hand back storage in a few shapes depending on how the value
//! was rendered: plain JSON numbers, thousands-separated strings (`"1,000"`),
//! hex strings, `"20.00%"` percentages. All of that is absorbed here so the
//! rest of the crate only sees `u128`/`u32`/`Decimal`.

use std::fmt;

use rust_decimal::Decimal;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::amount::{parse_percentage, parse_raw_number, Balance};

/// One delegation, or one entry of the candidate pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bond {
    pub owner: String,
    #[serde(with = "balance")]
    pub amount: Balance,
}

impl Bond {
    pub fn new(owner: impl Into<String>, amount: Balance) -> Self {
        Self {
            owner: owner.into(),
            amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegatorState {
    pub id: String,
    #[serde(default)]
    pub delegations: Vec<Bond>,
    #[serde(default, with = "balance")]
    pub total: Balance,
    /// Only present on networks that keep requests inline (Bifrost)
    #[serde(default)]
    pub requests: Option<PendingDelegationRequests>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingDelegationRequests {
    #[serde(default, deserialize_with = "delegation_requests")]
    pub requests: Vec<DelegationRequest>,
    #[serde(default, with = "round_number")]
    pub revocations_count: u32,
    #[serde(default, with = "balance")]
    pub less_total: Balance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationRequest {
    #[serde(default)]
    pub collator: String,
    #[serde(with = "balance")]
    pub amount: Balance,
    #[serde(with = "round_number")]
    pub when_executable: u32,
    pub action: RequestAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestAction {
    #[serde(alias = "revoke")]
    Revoke,
    #[serde(alias = "decrease")]
    Decrease,
}

/// Entry of `delegationScheduledRequests(collator)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledRequest {
    pub delegator: String,
    #[serde(with = "round_number")]
    pub when_executable: u32,
    pub action: DelegationAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelegationAction {
    #[serde(alias = "revoke")]
    Revoke(#[serde(with = "balance")] Balance),
    #[serde(alias = "decrease")]
    Decrease(#[serde(with = "balance")] Balance),
}

impl DelegationAction {
    pub fn amount(&self) -> Balance {
        match self {
            DelegationAction::Revoke(amount) | DelegationAction::Decrease(amount) => *amount,
        }
    }

    pub fn is_revoke(&self) -> bool {
        matches!(self, DelegationAction::Revoke(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateMetadata {
    #[serde(with = "balance")]
    pub bond: Balance,
    #[serde(with = "round_number")]
    pub delegation_count: u32,
    #[serde(with = "balance")]
    pub total_counted: Balance,
    #[serde(with = "balance")]
    pub lowest_top_delegation_amount: Balance,
    pub status: CollatorStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollatorStatus {
    #[serde(alias = "active")]
    Active,
    #[serde(alias = "idle")]
    Idle,
    /// Round at which the candidate may leave
    #[serde(alias = "leaving")]
    Leaving(#[serde(with = "round_number")] u32),
}

/// `identity.identityOf` registration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IdentityRegistration {
    #[serde(default)]
    pub judgements: Vec<Value>,
    #[serde(default)]
    pub info: IdentityInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IdentityInfo {
    #[serde(default)]
    pub display: Value,
    #[serde(default)]
    pub legal: Value,
    #[serde(default)]
    pub twitter: Value,
    #[serde(default)]
    pub web: Value,
    #[serde(default)]
    pub email: Value,
    #[serde(default)]
    pub riot: Value,
}

impl IdentityRegistration {
    /// Decode a registration. Newer runtimes return `[registration, username]`.
    pub fn from_value(value: Value) -> Result<Option<Self>, serde_json::Error> {
        let registration = match value {
            Value::Null => return Ok(None),
            Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
            Value::Array(_) => return Ok(None),
            other => other,
        };

        if registration.is_null() {
            return Ok(None);
        }

        serde_json::from_value(registration).map(Some)
    }

    pub fn is_verified(&self) -> bool {
        !self.judgements.is_empty()
    }

    /// First usable name among display, legal, twitter, web, email and riot.
    /// Hex-encoded values are skipped.
    pub fn display_name(&self) -> Option<String> {
        let info = &self.info;
        [
            &info.display,
            &info.legal,
            &info.twitter,
            &info.web,
            &info.email,
            &info.riot,
        ]
        .into_iter()
        .filter_map(data_text)
        .find(|text| !text.is_empty() && !text.starts_with("0x"))
    }
}

/// Text carried by an identity `Data` field (`{"Raw": "..."}`)
fn data_text(data: &Value) -> Option<String> {
    match data {
        Value::String(text) if text == "None" => None,
        Value::String(text) => Some(text.trim().to_string()),
        Value::Object(map) => map
            .get("Raw")
            .or_else(|| map.get("raw"))
            .and_then(Value::as_str)
            .map(|text| text.trim().to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundInfo {
    #[serde(with = "round_number")]
    pub current: u32,
    #[serde(with = "round_number")]
    pub first: u32,
    #[serde(with = "round_number")]
    pub length: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InflationConfig {
    pub expect: ExpectedStake,
    pub annual: AnnualInflation,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExpectedStake {
    #[serde(with = "balance")]
    pub min: Balance,
    #[serde(with = "balance")]
    pub ideal: Balance,
    #[serde(with = "balance")]
    pub max: Balance,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnnualInflation {
    #[serde(deserialize_with = "percent")]
    pub min: Decimal,
    #[serde(deserialize_with = "percent")]
    pub ideal: Decimal,
    #[serde(deserialize_with = "percent")]
    pub max: Decimal,
}

impl InflationConfig {
    /// Annual inflation for the given total stake
    pub fn current_inflation(&self, staked: Balance) -> Decimal {
        if staked < self.expect.min {
            self.annual.min
        } else if staked > self.expect.max {
            self.annual.max
        } else {
            self.annual.ideal
        }
    }
}

/// Percentage given as `"20.00%"` or as `Perbill` parts
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Percentage(#[serde(deserialize_with = "percent")] pub Decimal);

/// Bare balance value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RawBalance(#[serde(with = "balance")] pub Balance);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    #[serde(with = "balance")]
    pub partial_fee: Balance,
}

/// Pending requests arrive either keyed by collator or as a plain list
fn delegation_requests<'de, D>(deserializer: D) -> Result<Vec<DelegationRequest>, D::Error>
where
    D: Deserializer<'de>,
{
    struct RequestsVisitor;

    impl<'de> Visitor<'de> for RequestsVisitor {
        type Value = Vec<DelegationRequest>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of collator to request, or a list of requests")
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut requests = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(request) = seq.next_element()? {
                requests.push(request);
            }
            Ok(requests)
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut requests = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((collator, mut request)) = map.next_entry::<String, DelegationRequest>()? {
                if request.collator.is_empty() {
                    request.collator = collator;
                }
                requests.push(request);
            }
            Ok(requests)
        }
    }

    deserializer.deserialize_any(RequestsVisitor)
}

fn percent<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => parse_percentage(&text).map_err(de::Error::custom),
        Value::Number(number) => number
            .as_u64()
            .ok_or_else(|| de::Error::custom(format!("invalid perbill value {}", number)))
            .and_then(|parts| {
                crate::amount::perbill_to_percent(parts as u128).map_err(de::Error::custom)
            }),
        other => Err(de::Error::custom(format!("invalid percentage {}", other))),
    }
}

/// Integers that may arrive as JSON numbers or formatted strings
struct RawNumberVisitor;

impl<'de> Visitor<'de> for RawNumberVisitor {
    type Value = u128;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an unsigned integer, decimal string or hex string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u128, E> {
        Ok(v as u128)
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<u128, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u128, E> {
        u128::try_from(v).map_err(|_| E::custom(format!("negative amount {}", v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<u128, E> {
        // f64 is exact only up to 2^53
        if v.fract() == 0.0 && (0.0..=9_007_199_254_740_992.0).contains(&v) {
            Ok(v as u128)
        } else {
            Err(E::custom(format!("{} is not an exact integer", v)))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<u128, E> {
        parse_raw_number(v).map_err(E::custom)
    }
}

pub mod balance {
    use serde::{Deserializer, Serializer};

    use super::RawNumberVisitor;
    use crate::amount::Balance;

    pub fn serialize<S: Serializer>(value: &Balance, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Balance, D::Error> {
        deserializer.deserialize_any(RawNumberVisitor)
    }
}

pub mod round_number {
    use serde::de::Error;
    use serde::{Deserializer, Serializer};

    use super::RawNumberVisitor;

    pub fn serialize<S: Serializer>(value: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(*value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let value = deserializer.deserialize_any(RawNumberVisitor)?;
        u32::try_from(value).map_err(|_| D::Error::custom(format!("{} does not fit in u32", value)))
    }
}
