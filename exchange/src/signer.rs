//! Request signing for authenticated endpoints.
//!
//! Authenticated calls append `timestamp` (ms) and `recvWindow`, then an
//! HMAC-SHA-256 signature over the full query string. The API key travels in
//! the `X-MBX-APIKEY` header; attaching it is the transport's job.

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Receive window appended to every signed request.
pub const RECV_WINDOW_MS: u64 = 60_000;

/// Signs venue requests with the account's API secret.
#[derive(Clone)]
pub struct RequestSigner {
    api_key: String,
    secret_key: String,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never leak credentials through Debug output.
        f.debug_struct("RequestSigner")
            .field("api_key", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

impl RequestSigner {
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            api_key,
            secret_key,
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Generate the HMAC-SHA256 signature over a query-string payload.
    pub fn signature(&self, payload: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret_key.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Extend `query` with `recvWindow`, `timestamp` and the signature,
    /// returning the final query string to send.
    pub fn sign_query(&self, query: &str, timestamp_ms: i64) -> String {
        let unsigned = if query.is_empty() {
            format!("recvWindow={RECV_WINDOW_MS}&timestamp={timestamp_ms}")
        } else {
            format!("{query}&recvWindow={RECV_WINDOW_MS}&timestamp={timestamp_ms}")
        };
        let signature = self.signature(&unsigned);
        format!("{unsigned}&signature={signature}")
    }
}
