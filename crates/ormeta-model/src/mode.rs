//! Resolution modes
//!
//! Provides [`ResolutionMode`] and the closed flag set [`ResolutionModes`]
//! recording which resolution phases an entity (or package) has been through.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

/// One resolution phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionMode {
    /// Structural metadata (fields, strategies, identity, callbacks)
    Meta,

    /// Store mapping (tables, columns)
    Mapping,

    /// Query catalog (named queries)
    Query,
}

impl ResolutionMode {
    /// Every mode, in application order
    pub const ALL: [Self; 3] = [Self::Meta, Self::Mapping, Self::Query];

    /// Stable lowercase name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Meta => "meta",
            Self::Mapping => "mapping",
            Self::Query => "query",
        }
    }
}

impl Display for ResolutionMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "meta" | "metadata" | "structural" => Ok(Self::Meta),
            "mapping" => Ok(Self::Mapping),
            "query" | "queries" => Ok(Self::Query),
            other => Err(ModelError::InvalidMode(other.to_string())),
        }
    }
}

/// Set of resolution modes
///
/// Combined with `|`, compared with [`ResolutionModes::contains_all`].
/// Serialized as a list of mode names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<ResolutionMode>", into = "Vec<ResolutionMode>")]
pub struct ResolutionModes {
    meta: bool,
    mapping: bool,
    query: bool,
}

impl ResolutionModes {
    /// Empty set
    pub const NONE: Self = Self {
        meta: false,
        mapping: false,
        query: false,
    };

    /// Structural metadata only
    pub const META: Self = Self {
        meta: true,
        mapping: false,
        query: false,
    };

    /// Store mapping only
    pub const MAPPING: Self = Self {
        meta: false,
        mapping: true,
        query: false,
    };

    /// Query catalog only
    pub const QUERY: Self = Self {
        meta: false,
        mapping: false,
        query: true,
    };

    /// Every mode
    pub const ALL: Self = Self {
        meta: true,
        mapping: true,
        query: true,
    };

    /// Set holding a single mode
    #[inline]
    #[must_use]
    pub fn only(mode: ResolutionMode) -> Self {
        let mut set = Self::NONE;
        set.insert(mode);
        set
    }

    /// Add a mode
    #[inline]
    pub fn insert(&mut self, mode: ResolutionMode) {
        match mode {
            ResolutionMode::Meta => self.meta = true,
            ResolutionMode::Mapping => self.mapping = true,
            ResolutionMode::Query => self.query = true,
        }
    }

    /// Check membership of a single mode
    #[inline]
    #[must_use]
    pub fn contains(&self, mode: ResolutionMode) -> bool {
        match mode {
            ResolutionMode::Meta => self.meta,
            ResolutionMode::Mapping => self.mapping,
            ResolutionMode::Query => self.query,
        }
    }

    /// Check that every mode of `other` is in this set
    #[inline]
    #[must_use]
    pub fn contains_all(&self, other: Self) -> bool {
        other.iter().all(|m| self.contains(m))
    }

    /// Check that the two sets share at least one mode
    #[inline]
    #[must_use]
    pub fn intersects(&self, other: Self) -> bool {
        other.iter().any(|m| self.contains(m))
    }

    /// Set union
    #[inline]
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            meta: self.meta || other.meta,
            mapping: self.mapping || other.mapping,
            query: self.query || other.query,
        }
    }

    /// Set intersection
    #[inline]
    #[must_use]
    pub fn intersection(self, other: Self) -> Self {
        Self {
            meta: self.meta && other.meta,
            mapping: self.mapping && other.mapping,
            query: self.query && other.query,
        }
    }

    /// Modes in `self` that are not in `other`
    #[inline]
    #[must_use]
    pub fn difference(self, other: Self) -> Self {
        Self {
            meta: self.meta && !other.meta,
            mapping: self.mapping && !other.mapping,
            query: self.query && !other.query,
        }
    }

    /// True when no mode is set
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !(self.meta || self.mapping || self.query)
    }

    /// Iterate modes in application order (meta, mapping, query)
    pub fn iter(&self) -> impl Iterator<Item = ResolutionMode> + '_ {
        ResolutionMode::ALL.into_iter().filter(|m| self.contains(*m))
    }
}

impl From<ResolutionMode> for ResolutionModes {
    fn from(mode: ResolutionMode) -> Self {
        Self::only(mode)
    }
}

impl From<Vec<ResolutionMode>> for ResolutionModes {
    fn from(modes: Vec<ResolutionMode>) -> Self {
        modes.into_iter().collect()
    }
}

impl From<ResolutionModes> for Vec<ResolutionMode> {
    fn from(modes: ResolutionModes) -> Self {
        modes.iter().collect()
    }
}

impl FromIterator<ResolutionMode> for ResolutionModes {
    fn from_iter<I: IntoIterator<Item = ResolutionMode>>(iter: I) -> Self {
        let mut set = Self::NONE;
        for mode in iter {
            set.insert(mode);
        }
        set
    }
}

impl BitOr for ResolutionModes {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for ResolutionModes {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl Display for ResolutionModes {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<_> = self.iter().map(ResolutionMode::as_str).collect();
        f.write_str(&names.join("|"))
    }
}

impl FromStr for ResolutionModes {
    type Err = ModelError;

    /// Parse a comma or `|` separated list, e.g. `meta,mapping`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("none") {
            return Ok(Self::NONE);
        }
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::ALL);
        }
        s.split(|c: char| c == ',' || c == '|')
            .map(ResolutionMode::from_str)
            .collect::<Result<Self, _>>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn union_and_containment() {
        let modes = ResolutionModes::META | ResolutionModes::MAPPING;
        assert!(modes.contains(ResolutionMode::Meta));
        assert!(modes.contains(ResolutionMode::Mapping));
        assert!(!modes.contains(ResolutionMode::Query));
        assert!(modes.contains_all(ResolutionModes::META));
        assert!(!modes.contains_all(ResolutionModes::ALL));
    }

    #[test]
    fn difference_keeps_only_pending() {
        let resolved = ResolutionModes::META | ResolutionModes::MAPPING;
        let pending = ResolutionModes::ALL.difference(resolved);
        assert_eq!(pending, ResolutionModes::QUERY);
    }

    #[test]
    fn display_and_parse() {
        let modes: ResolutionModes = "meta,query".parse().unwrap();
        assert_eq!(modes.to_string(), "meta|query");
        assert_eq!("none".parse::<ResolutionModes>().unwrap(), ResolutionModes::NONE);
        assert_eq!("all".parse::<ResolutionModes>().unwrap(), ResolutionModes::ALL);
        assert!("meta,bogus".parse::<ResolutionModes>().is_err());
    }

    #[test]
    fn serializes_as_list() {
        let json = serde_json::to_string(&(ResolutionModes::META | ResolutionModes::QUERY)).unwrap();
        assert_eq!(json, r#"["meta","query"]"#);
        let back: ResolutionModes = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ResolutionModes::META | ResolutionModes::QUERY);
    }

    fn arb_modes() -> impl Strategy<Value = ResolutionModes> {
        (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(a, b, c)| ResolutionModes {
            meta: a,
            mapping: b,
            query: c,
        })
    }

    proptest! {
        #[test]
        fn prop_union_contains_both(a in arb_modes(), b in arb_modes()) {
            let u = a | b;
            prop_assert!(u.contains_all(a));
            prop_assert!(u.contains_all(b));
        }

        #[test]
        fn prop_difference_is_disjoint(a in arb_modes(), b in arb_modes()) {
            let d = a.difference(b);
            prop_assert!(!d.intersects(b));
            prop_assert_eq!(d | a.intersection(b), a);
        }
    }
}
