use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MAX_NAME_LEN: usize = 12;

/// An account or project identity.
///
/// Names are 1 to 12 characters drawn from `a-z`, `1-5` and `.`, and may not
/// end with a dot. The restricted alphabet keeps them usable as storage keys
/// and lets the `\0` byte act as a separator in composite keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Name(String);

impl Name {
    pub fn new(value: impl Into<String>) -> Result<Self, LedgerError> {
        let value = value.into();
        if value.is_empty() || value.len() > MAX_NAME_LEN {
            return Err(LedgerError::Parse(format!(
                "name '{value}' must be 1 to {MAX_NAME_LEN} characters"
            )));
        }
        if !value
            .bytes()
            .all(|b| matches!(b, b'a'..=b'z' | b'1'..=b'5' | b'.'))
        {
            return Err(LedgerError::Parse(format!(
                "name '{value}' may only contain a-z, 1-5 and '.'"
            )));
        }
        if value.ends_with('.') {
            return Err(LedgerError::Parse(format!(
                "name '{value}' may not end with '.'"
            )));
        }
        Ok(Self(value))
    }

    /// For names written into the source, which are checked in debug builds only.
    pub(crate) fn from_static(value: &'static str) -> Self {
        debug_assert!(Self::new(value).is_ok(), "invalid static name {value}");
        Self(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Name {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Name {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Name> for String {
    fn from(name: Name) -> Self {
        name.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Secondary index key for grants and memberships: (subject, project).
///
/// Ordered by subject first, then project.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairKey {
    pub subject: Name,
    pub project: Name,
}

impl PairKey {
    pub fn new(subject: &Name, project: &Name) -> Self {
        Self {
            subject: subject.clone(),
            project: project.clone(),
        }
    }

    /// Byte encoding used by ordered key-value backends.
    ///
    /// `subject \0 project` sorts the same way as the derived `Ord`, since
    /// `\0` is lower than every character a name may contain.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.subject.0.len() + self.project.0.len() + 1);
        bytes.extend_from_slice(self.subject.0.as_bytes());
        bytes.push(0);
        bytes.extend_from_slice(self.project.0.as_bytes());
        bytes
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.subject, self.project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_validation() {
        assert!(Name::new("alice").is_ok());
        assert!(Name::new("proj.one").is_ok());
        assert!(Name::new("user12345").is_ok());

        assert!(matches!(Name::new(""), Err(LedgerError::Parse(_))));
        assert!(matches!(Name::new("Alice"), Err(LedgerError::Parse(_))));
        assert!(matches!(Name::new("user6"), Err(LedgerError::Parse(_))));
        assert!(matches!(Name::new("trailing."), Err(LedgerError::Parse(_))));
        assert!(matches!(
            Name::new("thirteenchars"),
            Err(LedgerError::Parse(_))
        ));
    }

    #[test]
    fn test_name_deserialization_rejects_invalid() {
        let ok: Name = serde_json::from_str("\"bob\"").unwrap();
        assert_eq!(ok.as_str(), "bob");
        assert!(serde_json::from_str::<Name>("\"BOB\"").is_err());
    }

    #[test]
    fn test_pair_key_order_matches_bytes() {
        let a = PairKey::new(&Name::new("ab").unwrap(), &Name::new("zz").unwrap());
        let b = PairKey::new(&Name::new("ab.c").unwrap(), &Name::new("aa").unwrap());
        assert!(a < b);
        assert!(a.to_bytes() < b.to_bytes());
    }

    #[test]
    fn test_pair_key_distinguishes_roles() {
        let alice = Name::new("alice").unwrap();
        let proj = Name::new("proj").unwrap();
        assert_ne!(PairKey::new(&alice, &proj), PairKey::new(&proj, &alice));
    }
}
