//! Ledger JSON-RPC client with ordered endpoint failover
//!
//! The client never serializes or signs transactions itself: it is
//! handed a decrypted secret and uses the ledger's sign-and-submit mode.
//! Balance and reserve arithmetic stays in `Decimal`; drops travel as
//! integer strings on the wire.

use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::Config;
use crate::keygen::Keypair;

/// Funds every account must lock just to exist on the ledger.
pub const BASE_RESERVE_XRP: Decimal = dec!(1.0);
/// Additional reserve per owned ledger object.
pub const OWNER_RESERVE_XRP: Decimal = dec!(0.2);
/// Flat fee burned by an account-delete transaction.
pub const ACCOUNT_DELETE_FEE_XRP: Decimal = dec!(0.2);

/// Literal required before a ledger account is deleted.
pub const ACCOUNT_DELETE_CONFIRMATION: &str = "IAMDELETINGMYWALLET";

const DROPS_PER_XRP: Decimal = dec!(1000000);
const TAG_LIST_TTL: Duration = Duration::from_secs(3000);
const TAG_LIST_TIMEOUT: Duration = Duration::from_secs(10);

/// Validated state of a ledger account
#[derive(Debug, Clone, Copy)]
pub struct AccountState {
    pub balance_drops: u64,
    pub owner_count: u32,
}

impl AccountState {
    pub fn balance_xrp(&self) -> Decimal {
        drops_to_xrp(self.balance_drops)
    }

    /// Reserve the account must hold given its owned objects.
    pub fn minimum_reserve(&self) -> Decimal {
        BASE_RESERVE_XRP + OWNER_RESERVE_XRP * Decimal::from(self.owner_count)
    }

    /// Balance above the base reserve, floored at zero.
    pub fn spendable_xrp(&self) -> Decimal {
        (self.balance_xrp() - BASE_RESERVE_XRP).max(Decimal::ZERO)
    }
}

/// Outcome of a submitted transaction
#[derive(Debug, Clone)]
pub struct SubmitResult {
    pub success: bool,
    pub engine_result: String,
    pub hash: Option<String>,
}

/// Explicit time-to-live cache: the value plus the instant it was
/// fetched. Reads check freshness; nothing refreshes behind the
/// caller's back.
#[derive(Debug)]
struct TtlCache<T> {
    slot: Option<(T, Instant)>,
    ttl: Duration,
}

impl<T> TtlCache<T> {
    fn new(ttl: Duration) -> Self {
        Self { slot: None, ttl }
    }

    fn get(&self) -> Option<&T> {
        match &self.slot {
            Some((value, fetched_at)) if fetched_at.elapsed() < self.ttl => Some(value),
            _ => None,
        }
    }

    fn put(&mut self, value: T) {
        self.slot = Some((value, Instant::now()));
    }
}

pub struct LedgerClient {
    http: Client,
    endpoints: Vec<String>,
    tag_list_url: String,
    tag_cache: Mutex<TtlCache<HashSet<String>>>,
}

impl LedgerClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: Client::new(),
            endpoints: config.endpoints.clone(),
            tag_list_url: config.tag_list_url.clone(),
            tag_cache: Mutex::new(TtlCache::new(TAG_LIST_TTL)),
        }
    }

    /// Balance and owner count of an account, from the validated ledger.
    pub async fn query_account(&self, address: &str) -> Result<AccountState> {
        let result = self
            .request(
                "account_info",
                json!({ "account": address, "ledger_index": "validated" }),
            )
            .await?;
        let data = result
            .get("account_data")
            .ok_or_else(|| anyhow!("response missing account_data"))?;
        let balance_drops = data
            .get("Balance")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("response missing Balance"))?
            .parse::<u64>()
            .context("unparseable account balance")?;
        let owner_count = data.get("OwnerCount").and_then(Value::as_u64).unwrap_or(0) as u32;
        Ok(AccountState {
            balance_drops,
            owner_count,
        })
    }

    /// Submit a payment signed by the endpoint from the supplied secret.
    pub async fn submit_payment(
        &self,
        secret: &str,
        destination: &str,
        amount_xrp: Decimal,
        destination_tag: Option<u32>,
    ) -> Result<SubmitResult> {
        if !is_valid_address(destination) {
            bail!("invalid destination address");
        }
        let account = Keypair::from_secret(secret)?.address;
        let mut tx_json = json!({
            "TransactionType": "Payment",
            "Account": account,
            "Destination": destination,
            "Amount": xrp_to_drops(amount_xrp)?.to_string(),
        });
        if let Some(tag) = destination_tag {
            tx_json["DestinationTag"] = json!(tag);
        }
        self.submit(tx_json, secret).await
    }

    /// Delete the account behind `secret`, sending its remaining balance
    /// (minus the deletion fee) to `destination`.
    pub async fn submit_account_delete(
        &self,
        secret: &str,
        destination: &str,
    ) -> Result<SubmitResult> {
        if !is_valid_address(destination) {
            bail!("invalid destination address");
        }
        let account = Keypair::from_secret(secret)?.address;
        let tx_json = json!({
            "TransactionType": "AccountDelete",
            "Account": account,
            "Destination": destination,
            "Fee": xrp_to_drops(ACCOUNT_DELETE_FEE_XRP)?.to_string(),
        });
        self.submit(tx_json, secret).await
    }

    async fn submit(&self, tx_json: Value, secret: &str) -> Result<SubmitResult> {
        let result = self
            .request("submit", json!({ "tx_json": tx_json, "secret": secret }))
            .await?;
        let engine_result = result
            .get("engine_result")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let hash = result
            .pointer("/tx_json/hash")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(SubmitResult {
            success: engine_result == "tesSUCCESS",
            engine_result,
            hash,
        })
    }

    /// Accounts known to require a destination tag despite not setting
    /// the ledger flag. Served from the TTL cache; a fetch failure
    /// degrades to the empty set so sending keeps working offline.
    pub async fn tag_required_accounts(&self) -> HashSet<String> {
        let mut cache = self.tag_cache.lock().await;
        if let Some(cached) = cache.get() {
            return cached.clone();
        }
        match self.fetch_tag_list().await {
            Ok(accounts) => {
                cache.put(accounts.clone());
                accounts
            }
            Err(err) => {
                warn!(error = %err, "could not fetch destination-tag advisory list");
                HashSet::new()
            }
        }
    }

    async fn fetch_tag_list(&self) -> Result<HashSet<String>> {
        let raw = self
            .http
            .get(&self.tag_list_url)
            .timeout(TAG_LIST_TIMEOUT)
            .send()
            .await
            .context("advisory list request failed")?
            .error_for_status()
            .context("advisory list request rejected")?
            .text()
            .await
            .context("advisory list unreadable")?;
        Ok(parse_tag_list(&raw))
    }

    /// POST the request to each endpoint in order; first healthy answer
    /// wins, the last error surfaces if none is healthy.
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let body = json!({ "method": method, "params": [params] });
        let mut last_error = None;
        for (index, endpoint) in self.endpoints.iter().enumerate() {
            match self.request_one(endpoint, &body).await {
                Ok(result) => {
                    if index > 0 {
                        info!(endpoint, "fallback ledger endpoint served the request");
                    }
                    return Ok(result);
                }
                Err(err) => {
                    warn!(endpoint, error = %err, "ledger endpoint failed");
                    last_error = Some(err);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow!("no ledger endpoints configured")))
    }

    async fn request_one(&self, endpoint: &str, body: &Value) -> Result<Value> {
        let response = self
            .http
            .post(endpoint)
            .json(body)
            .send()
            .await
            .context("request failed")?;
        let status = response.status();
        if !status.is_success() {
            bail!("endpoint returned {status}");
        }
        let payload: Value = response.json().await.context("invalid json response")?;
        let result = payload
            .get("result")
            .cloned()
            .ok_or_else(|| anyhow!("response missing result"))?;
        // Ledger-level failures still arrive as HTTP 200.
        if result.get("status").and_then(Value::as_str) == Some("error") {
            let message = result
                .get("error_message")
                .and_then(Value::as_str)
                .or_else(|| result.get("error").and_then(Value::as_str))
                .unwrap_or("unknown ledger error");
            bail!("ledger error: {message}");
        }
        Ok(result)
    }
}

fn parse_tag_list(raw: &str) -> HashSet<String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(raw.as_bytes());
    let mut accounts = HashSet::new();
    for record in reader.records().flatten() {
        if let Some(address) = record.get(1) {
            if !address.is_empty() {
                accounts.insert(address.to_string());
            }
        }
    }
    accounts
}

/// Shape check for a classic address: the reserved leading `r` followed
/// by 24 to 34 base58 characters.
pub fn is_valid_address(address: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^r[1-9A-HJ-NP-Za-km-z]{24,34}$").expect("static pattern"))
        .is_match(address)
}

/// Whole-XRP-to-drops conversion; rejects sub-drop precision.
pub fn xrp_to_drops(amount: Decimal) -> Result<u64> {
    if amount.is_sign_negative() {
        bail!("amount cannot be negative");
    }
    let drops = amount * DROPS_PER_XRP;
    if !drops.fract().is_zero() {
        bail!("amount has sub-drop precision");
    }
    drops.to_u64().context("amount out of range")
}

pub fn drops_to_xrp(drops: u64) -> Decimal {
    Decimal::from(drops) / DROPS_PER_XRP
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_conversion() {
        assert_eq!(xrp_to_drops(dec!(1)).unwrap(), 1_000_000);
        assert_eq!(xrp_to_drops(dec!(0.000001)).unwrap(), 1);
        assert_eq!(xrp_to_drops(dec!(21.5)).unwrap(), 21_500_000);
        assert_eq!(drops_to_xrp(1_500_000), dec!(1.5));
        assert_eq!(drops_to_xrp(1), dec!(0.000001));
    }

    #[test]
    fn test_invalid_amounts() {
        assert!(xrp_to_drops(dec!(0.0000001)).is_err());
        assert!(xrp_to_drops(dec!(-1)).is_err());
    }

    #[test]
    fn test_reserve_arithmetic() {
        let state = AccountState {
            balance_drops: 12_000_000,
            owner_count: 3,
        };
        assert_eq!(state.balance_xrp(), dec!(12));
        assert_eq!(state.minimum_reserve(), dec!(1.6));
        assert_eq!(state.spendable_xrp(), dec!(11));

        let broke = AccountState {
            balance_drops: 400_000,
            owner_count: 0,
        };
        assert_eq!(broke.spendable_xrp(), Decimal::ZERO);
    }

    #[test]
    fn test_address_validation() {
        assert!(is_valid_address("rLTmPhvoAH4J4B1L36eoXUDGK3rY4BcBTG"));
        assert!(!is_valid_address("xLTmPhvoAH4J4B1L36eoXUDGK3rY4BcBTG"));
        assert!(!is_valid_address("rshort"));
        assert!(!is_valid_address("rLTmPhvoAH4J4B1L36eoXUDG0000000000"));
        assert!(!is_valid_address(""));
    }

    #[test]
    fn test_ttl_cache_expiry() {
        let mut cache = TtlCache::new(Duration::from_millis(30));
        assert!(cache.get().is_none());
        cache.put(7u32);
        assert_eq!(cache.get(), Some(&7));
        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_tag_list_parsing() {
        let raw = "id,address\n1,rAlice11111111111111111111\n2,rBob2222222222222222222222\n3,\n";
        let accounts = parse_tag_list(raw);
        assert_eq!(accounts.len(), 2);
        assert!(accounts.contains("rAlice11111111111111111111"));
    }
}
