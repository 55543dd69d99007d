//! The venue REST client.
//!
//! One struct, one seam: [`BinanceClient`] implements [`ExchangeApi`], the
//! trait the executor and orchestrator are generic over. Every call is rate
//! limited through the shared [`TokenBucket`] and retried on transient
//! failures with exponential backoff.

use crate::error::ExchangeError;
use crate::model::{
    AccountInfo, ApiErrorEnvelope, CancelAck, ExchangeInfo, OrderAck, TickerPrice, VenueOrder,
    VenueTrade,
};
use crate::rate_limit::TokenBucket;
use crate::signer::RequestSigner;
use arara_markets::Side;
use chrono::Utc;
use reqwest::{Method, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const MAINNET_URL: &str = "https://api.binance.com";
const TESTNET_URL: &str = "https://testnet.binance.vision";

/// Attempts per call, including the first.
const MAX_ATTEMPTS: u32 = 3;

/// Unified interface over the venue endpoints the trading loop needs.
///
/// Production uses [`BinanceClient`]; tests provide an in-memory venue.
#[allow(async_fn_in_trait)]
pub trait ExchangeApi {
    async fn account_info(&self) -> Result<AccountInfo, ExchangeError>;
    async fn open_orders(&self, pair: &str) -> Result<Vec<VenueOrder>, ExchangeError>;
    async fn place_order(&self, request: &PlaceOrder) -> Result<OrderAck, ExchangeError>;
    async fn cancel_order(&self, pair: &str, client_id: &str)
        -> Result<CancelAck, ExchangeError>;
    async fn current_price(&self, pair: &str) -> Result<Decimal, ExchangeError>;
    async fn my_trades(
        &self,
        pair: &str,
        since_ms: Option<i64>,
    ) -> Result<Vec<VenueTrade>, ExchangeError>;
    async fn exchange_info(&self, pair: &str) -> Result<ExchangeInfo, ExchangeError>;
}

/// A new-order request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrder {
    pub pair: String,
    pub side: Side,
    /// Venue order type nomenclature, e.g. "LIMIT".
    pub order_type: String,
    pub price: Decimal,
    pub qty: Decimal,
    pub client_id: String,
    /// Defaults to good-till-cancelled.
    pub time_in_force: String,
}

impl PlaceOrder {
    pub fn limit(
        pair: impl Into<String>,
        side: Side,
        price: Decimal,
        qty: Decimal,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            pair: pair.into(),
            side,
            order_type: "LIMIT".to_string(),
            price,
            qty,
            client_id: client_id.into(),
            time_in_force: "GTC".to_string(),
        }
    }
}

/// Configuration for the venue client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExchangeConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Secret key for signing requests.
    pub secret_key: String,
    /// Base URL override; `None` selects mainnet (or testnet, below).
    pub base_url: Option<String>,
    /// Whether to use the venue testnet.
    pub testnet: bool,
    /// Connection and read timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            secret_key: String::new(),
            base_url: None,
            testnet: false,
            timeout_ms: 10_000,
        }
    }
}

impl ExchangeConfig {
    fn resolve_base_url(&self) -> &str {
        match (&self.base_url, self.testnet) {
            (Some(url), _) => url.as_str(),
            (None, true) => TESTNET_URL,
            (None, false) => MAINNET_URL,
        }
    }
}

/// Signed, rate-limited, retrying REST client.
#[derive(Debug)]
pub struct BinanceClient {
    http: reqwest::Client,
    base_url: Url,
    signer: RequestSigner,
    limiter: TokenBucket,
}

impl BinanceClient {
    pub fn new(config: ExchangeConfig) -> Result<Self, ExchangeError> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|error| ExchangeError::BuildRequest(error.to_string()))?;
        let base_url = Url::parse(config.resolve_base_url())
            .map_err(|error| ExchangeError::BuildRequest(error.to_string()))?;

        Ok(Self {
            http,
            base_url,
            signer: RequestSigner::new(config.api_key, config.secret_key),
            limiter: TokenBucket::spot_default(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ExchangeError> {
        self.base_url
            .join(path)
            .map_err(|error| ExchangeError::BuildRequest(error.to_string()))
    }

    /// Signed request: sign the query, key in the header. GET/DELETE carry
    /// the signed query in the URL, POST in the form body.
    async fn signed<T>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ExchangeError>
    where
        T: DeserializeOwned,
    {
        let mut last = ExchangeError::Transport("request not attempted".to_string());
        for attempt in 1..=MAX_ATTEMPTS {
            self.limiter.acquire(1).await;

            // Timestamp and signature are regenerated per attempt so retries
            // stay within the receive window.
            let query = serde_urlencoded::to_string(params)
                .map_err(|error| ExchangeError::BuildRequest(error.to_string()))?;
            let signed_query = self.signer.sign_query(&query, Utc::now().timestamp_millis());

            let mut url = self.endpoint(path)?;
            let builder = if method == Method::POST {
                self.http
                    .post(url)
                    .header("Content-Type", "application/x-www-form-urlencoded")
                    .body(signed_query)
            } else {
                url.set_query(Some(&signed_query));
                self.http.request(method.clone(), url)
            };
            let builder = builder.header("X-MBX-APIKEY", self.signer.api_key());

            match self.dispatch::<T>(builder).await {
                Ok(value) => return Ok(value),
                Err(Outcome::Fatal(error)) => return Err(error),
                Err(Outcome::Transient(error)) => {
                    warn!(%error, attempt, path, "transient venue failure");
                    last = error;
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(Duration::from_secs(1u64 << attempt)).await;
                    }
                }
            }
        }
        Err(last)
    }

    /// Unsigned request (market data endpoints). Same rate limit and retry.
    async fn public<T>(&self, path: &str, params: &[(&str, String)]) -> Result<T, ExchangeError>
    where
        T: DeserializeOwned,
    {
        let mut last = ExchangeError::Transport("request not attempted".to_string());
        for attempt in 1..=MAX_ATTEMPTS {
            self.limiter.acquire(1).await;
            let url = self.endpoint(path)?;
            let builder = self.http.get(url).query(params);
            match self.dispatch::<T>(builder).await {
                Ok(value) => return Ok(value),
                Err(Outcome::Fatal(error)) => return Err(error),
                Err(Outcome::Transient(error)) => {
                    warn!(%error, attempt, path, "transient venue failure");
                    last = error;
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(Duration::from_secs(1u64 << attempt)).await;
                    }
                }
            }
        }
        Err(last)
    }

    async fn dispatch<T>(&self, builder: reqwest::RequestBuilder) -> Result<T, Outcome>
    where
        T: DeserializeOwned,
    {
        let response = builder
            .send()
            .await
            .map_err(|error| Outcome::Transient(ExchangeError::from(error)))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| Outcome::Transient(ExchangeError::from(error)))?;

        if status.is_success() {
            return serde_json::from_str::<T>(&body).map_err(|error| {
                // Malformed success bodies are treated as transient.
                Outcome::Transient(ExchangeError::Decode(error.to_string()))
            });
        }

        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            let error = match serde_json::from_str::<ApiErrorEnvelope>(&body) {
                Ok(envelope) => ExchangeError::Api {
                    code: envelope.code,
                    msg: envelope.msg,
                },
                Err(_) => ExchangeError::Transport(format!("venue returned {status}")),
            };
            return Err(Outcome::Transient(error));
        }

        match serde_json::from_str::<ApiErrorEnvelope>(&body) {
            Ok(envelope) => Err(Outcome::Fatal(ExchangeError::Api {
                code: envelope.code,
                msg: envelope.msg,
            })),
            Err(error) => Err(Outcome::Fatal(ExchangeError::Decode(format!(
                "unparseable {status} error body: {error}"
            )))),
        }
    }
}

enum Outcome {
    /// Worth another attempt (429, 5xx, transport, malformed body).
    Transient(ExchangeError),
    /// Venue made a decision; retrying would not change it.
    Fatal(ExchangeError),
}

impl ExchangeApi for BinanceClient {
    async fn account_info(&self) -> Result<AccountInfo, ExchangeError> {
        self.signed(Method::GET, "/api/v3/account", &[]).await
    }

    async fn open_orders(&self, pair: &str) -> Result<Vec<VenueOrder>, ExchangeError> {
        self.signed(
            Method::GET,
            "/api/v3/openOrders",
            &[("symbol", pair.to_string())],
        )
        .await
    }

    async fn place_order(&self, request: &PlaceOrder) -> Result<OrderAck, ExchangeError> {
        debug!(
            pair = %request.pair,
            side = %request.side,
            price = %request.price,
            qty = %request.qty,
            client_id = %request.client_id,
            "placing order"
        );
        self.signed(
            Method::POST,
            "/api/v3/order",
            &[
                ("symbol", request.pair.clone()),
                ("side", request.side.as_venue_str().to_string()),
                ("type", request.order_type.clone()),
                ("timeInForce", request.time_in_force.clone()),
                ("quantity", request.qty.to_string()),
                ("price", request.price.to_string()),
                ("newClientOrderId", request.client_id.clone()),
            ],
        )
        .await
    }

    async fn cancel_order(
        &self,
        pair: &str,
        client_id: &str,
    ) -> Result<CancelAck, ExchangeError> {
        debug!(pair, client_id, "cancelling order");
        self.signed(
            Method::DELETE,
            "/api/v3/order",
            &[
                ("symbol", pair.to_string()),
                ("origClientOrderId", client_id.to_string()),
            ],
        )
        .await
    }

    async fn current_price(&self, pair: &str) -> Result<Decimal, ExchangeError> {
        let ticker: TickerPrice = self
            .public("/api/v3/ticker/price", &[("symbol", pair.to_string())])
            .await?;
        Ok(ticker.price)
    }

    async fn my_trades(
        &self,
        pair: &str,
        since_ms: Option<i64>,
    ) -> Result<Vec<VenueTrade>, ExchangeError> {
        let mut params = vec![("symbol", pair.to_string())];
        if let Some(since_ms) = since_ms {
            params.push(("startTime", since_ms.to_string()));
        }
        self.signed(Method::GET, "/api/v3/myTrades", &params).await
    }

    async fn exchange_info(&self, pair: &str) -> Result<ExchangeInfo, ExchangeError> {
        self.public("/api/v3/exchangeInfo", &[("symbol", pair.to_string())])
            .await
    }
}
