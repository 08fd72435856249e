//! Selection of the value domains an analysis run tracks

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// One abstract value domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Sign,
    Nullability,
    Range,
}

impl Domain {
    pub const ALL: [Domain; 3] = [Domain::Sign, Domain::Nullability, Domain::Range];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Sign => "sign",
            Domain::Nullability => "nullability",
            Domain::Range => "range",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "sign" => Ok(Domain::Sign),
            "nullability" => Ok(Domain::Nullability),
            "range" | "interval" => Ok(Domain::Range),
            _ => Err(ConfigError::unknown_domain(
                s,
                &Domain::ALL.map(|d| d.as_str()),
            )),
        }
    }

    fn bit(self) -> u8 {
        match self {
            Domain::Sign => 0b001,
            Domain::Nullability => 0b010,
            Domain::Range => 0b100,
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Subset of {Sign, Nullability, Range}
///
/// Serialized as a list of domain names (`[sign, range]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct DomainSet(u8);

impl DomainSet {
    pub fn all() -> Self {
        Self(0b111)
    }

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn only(domain: Domain) -> Self {
        Self(domain.bit())
    }

    pub fn with(self, domain: Domain) -> Self {
        Self(self.0 | domain.bit())
    }

    pub fn contains(&self, domain: Domain) -> bool {
        self.0 & domain.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Domain> + '_ {
        Domain::ALL.into_iter().filter(|d| self.contains(*d))
    }
}

impl Default for DomainSet {
    fn default() -> Self {
        Self::all()
    }
}

impl FromIterator<Domain> for DomainSet {
    fn from_iter<I: IntoIterator<Item = Domain>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), |set, d| set.with(d))
    }
}

impl TryFrom<Vec<String>> for DomainSet {
    type Error = ConfigError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        names.iter().map(|n| Domain::from_str(n)).collect()
    }
}

impl From<DomainSet> for Vec<String> {
    fn from(set: DomainSet) -> Self {
        set.iter().map(|d| d.as_str().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_operations() {
        let set = DomainSet::only(Domain::Sign).with(Domain::Range);
        assert!(set.contains(Domain::Sign));
        assert!(!set.contains(Domain::Nullability));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Domain::Sign, Domain::Range]);
        assert!(DomainSet::empty().is_empty());
    }

    #[test]
    fn test_parse_names() {
        let set = DomainSet::try_from(vec!["Sign".to_string(), "interval".to_string()]).unwrap();
        assert_eq!(set, DomainSet::only(Domain::Sign).with(Domain::Range));
        assert!(DomainSet::try_from(vec!["parity".to_string()]).is_err());
    }

    #[test]
    fn test_serializes_as_names() {
        let json = serde_json::to_string(&DomainSet::all()).unwrap();
        assert_eq!(json, r#"["sign","nullability","range"]"#);
    }
}
