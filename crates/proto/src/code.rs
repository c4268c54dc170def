use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Unambiguous uppercase alphabet: excludes `I`, `L`, `O`, `U` so a human
/// reading a code aloud can't confuse it with `1`, `0`, or `V`.
const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";
const GROUP_LEN: usize = 4;
const GROUPS: usize = 3;
const CODE_LEN: usize = GROUP_LEN * GROUPS;

/// A short human-typable session code: three dash-separated uppercase
/// quartets, e.g. `AB12-CD34-EF56`.
///
/// Lookup is case-insensitive and tolerates missing dashes; the canonical
/// (display) form is always uppercase with dashes, which is what `create`
/// and `join` return to callers.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Code(String);

#[derive(Debug, thiserror::Error)]
pub enum CodeError {
    #[error("code must contain exactly {CODE_LEN} alphanumeric characters, got {0}")]
    WrongLength(usize),
    #[error("code character {0:?} is not in the canonical alphabet")]
    InvalidChar(char),
}

impl Code {
    /// Draws >=60 bits of entropy from a CSPRNG and renders a fresh code.
    ///
    /// 12 symbols over a 32-character alphabet carries 60 bits of entropy,
    /// comfortably over the spec's floor.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let raw: String = (0..CODE_LEN)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect();
        Self::group(&raw)
    }

    /// Normalizes arbitrary user input: uppercases, strips dashes and
    /// whitespace, validates the alphabet, and regroups to canonical form.
    pub fn normalize(input: &str) -> Result<Self, CodeError> {
        let stripped: String = input
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        if stripped.len() != CODE_LEN {
            return Err(CodeError::WrongLength(stripped.len()));
        }
        for c in stripped.chars() {
            if !ALPHABET.contains(&(c as u8)) {
                return Err(CodeError::InvalidChar(c));
            }
        }
        Ok(Self::group(&stripped))
    }

    fn group(raw: &str) -> Self {
        let grouped = raw
            .as_bytes()
            .chunks(GROUP_LEN)
            .map(|chunk| std::str::from_utf8(chunk).unwrap())
            .collect::<Vec<_>>()
            .join("-");
        Self(grouped)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Code({})", self.0)
    }
}

impl From<Code> for String {
    fn from(code: Code) -> Self {
        code.0
    }
}

impl TryFrom<String> for Code {
    type Error = CodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::normalize(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_code_is_canonical_shape() {
        let code = Code::generate();
        let s = code.as_str();
        assert_eq!(s.len(), 14);
        assert_eq!(&s[4..5], "-");
        assert_eq!(&s[9..10], "-");
        assert!(s.chars().all(|c| c == '-' || c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn normalize_is_case_insensitive_and_dash_optional() {
        let canonical = Code::generate();
        let lower_no_dash = canonical.as_str().to_ascii_lowercase().replace('-', "");
        let parsed = Code::normalize(&lower_no_dash).unwrap();
        assert_eq!(parsed, canonical);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(
            Code::normalize("AB12-CD34"),
            Err(CodeError::WrongLength(8))
        ));
    }

    #[test]
    fn rejects_ambiguous_characters() {
        // 'I', 'L', 'O', 'U' are deliberately excluded from the alphabet.
        assert!(matches!(
            Code::normalize("IIII-LLLL-OOOO"),
            Err(CodeError::InvalidChar('I'))
        ));
    }

    #[test]
    fn two_generated_codes_differ() {
        assert_ne!(Code::generate(), Code::generate());
    }
}
