//! One-time access codes.
//!
//! Codes are six decimal digits drawn uniformly from `100000..=999999` using the operating
//! system's CSPRNG. A failing randomness source is reported as [`AppError::Internal`]; there is
//! no fallback generator.

use std::fmt;

use rand::rngs::OsRng;
use rand::TryRngCore;
use subtle::ConstantTimeEq;

use crate::error::AppError;

const CODE_MIN: u32 = 100_000;
const CODE_SPAN: u32 = 900_000;
/// Largest multiple of `CODE_SPAN` that fits in the u32 sample space.
const ACCEPT_LIMIT: u64 = (1u64 << 32) / CODE_SPAN as u64 * CODE_SPAN as u64;

/// A 6-digit secret code. `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct AccessCode(String);

impl AccessCode {
    /// Plaintext value. Only the owner ever sees it, in the upload-slot response and the
    /// notification email.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Exact, constant-time comparison against a submitted code.
    pub fn matches(&self, submitted: &str) -> bool {
        self.0.as_bytes().ct_eq(submitted.as_bytes()).into()
    }

    /// Wrap a value already known to be a code (e.g. read back from the store).
    pub fn from_stored(value: String) -> Self {
        AccessCode(value)
    }
}

impl fmt::Debug for AccessCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessCode(******)")
    }
}

/// Whether `value` has the shape of an access code (exactly six ASCII digits).
pub fn is_well_formed(value: &str) -> bool {
    value.len() == 6 && value.bytes().all(|b| b.is_ascii_digit())
}

/// Generate a code from the OS randomness source.
pub fn generate_access_code() -> Result<AccessCode, AppError> {
    generate_with(&mut OsRng)
}

/// Generate a code from any fallible RNG, rejecting samples that would bias the low range.
pub fn generate_with<R: TryRngCore + ?Sized>(rng: &mut R) -> Result<AccessCode, AppError> {
    loop {
        let sample = rng
            .try_next_u32()
            .map_err(|e| AppError::Internal(format!("randomness source failed: {}", e)))?;
        if (sample as u64) < ACCEPT_LIMIT {
            let code = CODE_MIN + sample % CODE_SPAN;
            return Ok(AccessCode(code.to_string()));
        }
    }
}
