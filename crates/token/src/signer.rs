use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use burrow_proto::Claims;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::SecretBytes;

type HmacSha256 = Hmac<Sha256>;

/// Domain separator mixed into the MAC input so this token format can never
/// collide with a MAC computed for an unrelated purpose under the same key.
const DOMAIN_TAG: &[u8] = b"burrow-capability-token:v1:";

/// Distinguishable verification failures, per spec.md §4.1.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is not in the expected b64url(claims).b64url(mac) shape")]
    Malformed,
    #[error("token signature does not match")]
    BadMac,
    #[error("token has expired")]
    Expired,
}

/// Signs and verifies capability tokens with a single shared secret.
///
/// Cheap to clone (wraps an `Arc`-free owned secret; callers share one
/// instance behind their own `Arc` since the secret never changes).
#[derive(Clone)]
pub struct TokenSigner {
    secret: SecretBytes,
}

impl TokenSigner {
    pub fn new(secret: impl Into<SecretBytes>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Seals `claims` into a compact token string.
    pub fn sign(&self, claims: &Claims) -> String {
        let claims_bytes = claims.canonical_json();
        let mac = self.mac_over(&claims_bytes);

        let mut token = URL_SAFE_NO_PAD.encode(&claims_bytes);
        token.push('.');
        token.push_str(&URL_SAFE_NO_PAD.encode(mac));
        token
    }

    /// Verifies `token`'s signature and expiry, returning the unpacked
    /// claims on success.
    ///
    /// `now_unix` is passed in rather than read from the clock so that
    /// expiry is testable without sleeping.
    pub fn verify(&self, token: &str, now_unix: u64) -> Result<Claims, TokenError> {
        let (claims_b64, mac_b64) = token.split_once('.').ok_or(TokenError::Malformed)?;
        // Reject a second dot outright: the format has exactly one separator.
        if mac_b64.contains('.') {
            return Err(TokenError::Malformed);
        }

        let claims_bytes = URL_SAFE_NO_PAD
            .decode(claims_b64)
            .map_err(|_| TokenError::Malformed)?;
        let mac_bytes = URL_SAFE_NO_PAD
            .decode(mac_b64)
            .map_err(|_| TokenError::Malformed)?;

        let expected_mac = self.mac_over(&claims_bytes);
        if expected_mac.len() != mac_bytes.len() || expected_mac.ct_eq(&mac_bytes).unwrap_u8() == 0
        {
            return Err(TokenError::BadMac);
        }

        let claims: Claims =
            serde_json::from_slice(&claims_bytes).map_err(|_| TokenError::Malformed)?;

        if claims.is_expired(now_unix) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn mac_over(&self, claims_bytes: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(DOMAIN_TAG);
        mac.update(claims_bytes);
        mac.finalize().into_bytes().to_vec()
    }
}
