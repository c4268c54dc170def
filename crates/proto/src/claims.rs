use serde::{Deserialize, Serialize};

use crate::{Role, SessionId};

/// The three claims a capability token carries, in the fixed field order
/// `sid`, `role`, `exp`. Field order matters: the signer's MAC is computed
/// over the canonical (compact, no whitespace) JSON serialization of this
/// struct, and two implementations must agree on the exact bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sid: SessionId,
    pub role: Role,
    /// Expiry as unix seconds.
    pub exp: u64,
}

impl Claims {
    pub fn new(sid: SessionId, role: Role, exp: u64) -> Self {
        Self { sid, role, exp }
    }

    pub fn is_expired(&self, now_unix: u64) -> bool {
        self.exp <= now_unix
    }

    /// Canonical serialization: compact JSON, fixed field order, no
    /// redundant escaping. `serde_json::to_vec` already produces this for a
    /// struct (field order follows declaration order, not a `HashMap`), so
    /// this exists mainly to name the invariant at the call site.
    pub fn canonical_json(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("Claims serialization is infallible")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_json_has_fixed_field_order() {
        let claims = Claims::new(SessionId::generate(), Role::Host, 123);
        let json = String::from_utf8(claims.canonical_json()).unwrap();
        let sid_pos = json.find("\"sid\"").unwrap();
        let role_pos = json.find("\"role\"").unwrap();
        let exp_pos = json.find("\"exp\"").unwrap();
        assert!(sid_pos < role_pos);
        assert!(role_pos < exp_pos);
        assert!(!json.contains(' '));
    }

    #[test]
    fn is_expired_boundary() {
        let claims = Claims::new(SessionId::generate(), Role::Joiner, 100);
        assert!(!claims.is_expired(99));
        assert!(claims.is_expired(100));
        assert!(claims.is_expired(101));
    }
}
