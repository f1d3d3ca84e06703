//! Stop identity and ordered stop sequences.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::DomainError;

/// Unique key of a bus stop (TDX `StopUID`, e.g. `TPE15169`).
///
/// Any `StopUid` is non-empty and free of surrounding whitespace.
///
/// # Examples
///
/// ```
/// use bus_notifier::domain::StopUid;
///
/// let uid = StopUid::parse("TPE15169").unwrap();
/// assert_eq!(uid.as_str(), "TPE15169");
///
/// assert!(StopUid::parse("").is_err());
/// assert!(StopUid::parse("   ").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StopUid(String);

impl StopUid {
    /// Parse a stop key, trimming surrounding whitespace.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(DomainError::Empty("stop uid"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StopUid {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<StopUid> for String {
    fn from(uid: StopUid) -> Self {
        uid.0
    }
}

impl fmt::Debug for StopUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StopUid({})", self.0)
    }
}

impl fmt::Display for StopUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A localized name. Traditional Chinese is always present; English is not.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Name {
    pub zh_tw: String,
    pub en: Option<String>,
}

impl Name {
    /// Create a name with only the Traditional Chinese form.
    pub fn zh(zh_tw: impl Into<String>) -> Self {
        Self {
            zh_tw: zh_tw.into(),
            en: None,
        }
    }

    /// Attach an English form.
    pub fn with_en(mut self, en: impl Into<String>) -> Self {
        self.en = Some(en.into());
        self
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.zh_tw)
    }
}

/// A bus stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stop {
    pub uid: StopUid,
    pub id: String,
    pub name: Name,
}

impl Stop {
    pub fn new(uid: StopUid, id: impl Into<String>, name: Name) -> Self {
        Self {
            uid,
            id: id.into(),
            name,
        }
    }

    /// Whether this stop is the one a subscriber named.
    ///
    /// Subscriptions name stops by their Traditional Chinese name.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.zh_tw == name
    }
}

/// Stops of one (route, sub-route, direction) in physical travel order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopSequence {
    stops: Vec<Stop>,
}

impl StopSequence {
    /// Build a sequence keeping only the first occurrence of each stop key.
    ///
    /// Raw ETA feeds list a stop once per arriving vehicle, so a stop list
    /// derived from one carries repeats.
    pub fn dedup_first(stops: impl IntoIterator<Item = Stop>) -> Self {
        let mut seen = HashSet::new();
        let stops = stops
            .into_iter()
            .filter(|s| seen.insert(s.uid.clone()))
            .collect();
        Self { stops }
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }
}
