//! Runtime configuration, resolved once at startup and injected into the
//! controller and market feed.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::error::DashboardError;

/// Deriverse program identity used when none is configured.
pub const DEFAULT_PROGRAM_ID: &str = "CDESjex4EDBKLwx9ZPzVbjiHEHatasb5fhSJZMzNfvw2";

/// Environment variable carrying the program identity.
pub const PROGRAM_ID_ENV: &str = "DERIVERSE_PROGRAM_ID";

pub const DEVNET_RPC_URL: &str = "https://api.devnet.solana.com";
pub const MARKET_API_URL: &str = "https://api.binance.com";

pub const HISTORY_LIMIT: usize = 20;
pub const FETCH_TIMEOUT_SECS: u64 = 10;
pub const POLL_INTERVAL_SECS: u64 = 5;

const BASE58_ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// A base58 encoded 32-byte account or program key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Pubkey {
    #[serde(skip)]
    bytes: [u8; 32],
    encoded: String,
}

impl Pubkey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    pub fn as_str(&self) -> &str {
        &self.encoded
    }
}

/// The all-zero key, written as 32 base58 ones.
impl Default for Pubkey {
    fn default() -> Self {
        Self { bytes: [0; 32], encoded: "1".repeat(32) }
    }
}

impl FromStr for Pubkey {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decoded = decode_base58(s).ok_or_else(|| DashboardError::InvalidProgramId(s.to_string()))?;
        let bytes: [u8; 32] = decoded
            .try_into()
            .map_err(|_| DashboardError::InvalidProgramId(s.to_string()))?;
        Ok(Self { bytes, encoded: s.to_string() })
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

fn decode_base58(s: &str) -> Option<Vec<u8>> {
    // little-endian accumulator
    let mut bytes: Vec<u8> = Vec::with_capacity(32);
    for c in s.bytes() {
        let mut carry = BASE58_ALPHABET.iter().position(|&a| a == c)? as u32;
        for b in bytes.iter_mut() {
            carry += u32::from(*b) * 58;
            *b = (carry & 0xff) as u8;
            carry >>= 8;
        }
        while carry > 0 {
            bytes.push((carry & 0xff) as u8);
            carry >>= 8;
        }
    }
    let leading_zeros = s.bytes().take_while(|&c| c == b'1').count();
    bytes.extend(std::iter::repeat(0).take(leading_zeros));
    bytes.reverse();
    Some(bytes)
}

/// Resolve the program identity. Unset or blank input falls back to
/// [`DEFAULT_PROGRAM_ID`]; malformed input falls back to the all-zero key.
pub fn resolve_program_id(raw: Option<&str>) -> Pubkey {
    let candidate = match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => DEFAULT_PROGRAM_ID,
    };
    match candidate.parse() {
        Ok(key) => key,
        Err(e) => {
            tracing::warn!(error = %e, "malformed program id, falling back to the zero key");
            Pubkey::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub rpc_url: String,
    pub market_url: String,
    pub program_id: Pubkey,
    pub history_limit: usize,
    pub fetch_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEVNET_RPC_URL.to_string(),
            market_url: MARKET_API_URL.to_string(),
            program_id: resolve_program_id(None),
            history_limit: HISTORY_LIMIT,
            fetch_timeout: Duration::from_secs(FETCH_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(POLL_INTERVAL_SECS),
        }
    }
}

impl DashboardConfig {
    #[must_use]
    pub fn with_rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = url.into();
        self
    }

    #[must_use]
    pub fn with_market_url(mut self, url: impl Into<String>) -> Self {
        self.market_url = url.into();
        self
    }

    #[must_use]
    pub fn with_program_id(mut self, program_id: Pubkey) -> Self {
        self.program_id = program_id;
        self
    }

    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}
