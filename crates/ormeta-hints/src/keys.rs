//! Hint key tables
//!
//! Every key the resolver knows natively, the aliases that map external
//! spellings onto the fetch-plan namespace, and the precedence groups that
//! stop a lower-priority alias from overwriting a higher one.

/// Namespace of fetch-plan properties
pub const FETCH_PLAN_PREFIX: &str = "ormeta.FetchPlan.";

pub const OPTIMIZE_RESULT_COUNT: &str = "ormeta.hint.OptimizeResultCount";
pub const RESULT_SET_TYPE: &str = "ormeta.hint.ResultSetType";
pub const IGNORE_FETCH_GROUPS: &str = "ormeta.hint.IgnoreFetchGroups";
pub const FILTER_LISTENER: &str = "ormeta.FilterListener";
pub const FILTER_LISTENERS: &str = "ormeta.FilterListeners";
pub const AGGREGATE_LISTENER: &str = "ormeta.AggregateListener";
pub const AGGREGATE_LISTENERS: &str = "ormeta.AggregateListeners";

/// Engine-native keys outside the fetch plan
pub const NATIVE_KEYS: [&str; 7] = [
    OPTIMIZE_RESULT_COUNT,
    RESULT_SET_TYPE,
    IGNORE_FETCH_GROUPS,
    FILTER_LISTENER,
    FILTER_LISTENERS,
    AGGREGATE_LISTENER,
    AGGREGATE_LISTENERS,
];

/// Fetch-plan properties, each reachable as `ormeta.FetchPlan.<name>`
pub const FETCH_PLAN_PROPERTIES: [&str; 9] = [
    "FetchBatchSize",
    "MaxFetchDepth",
    "LockTimeout",
    "QueryTimeout",
    "ReadLockMode",
    "WriteLockMode",
    "FetchGroups",
    "ExtendedPathLookup",
    "Isolation",
];

/// External spelling to fetch-plan key
pub const ALIASES: [(&str, &str); 12] = [
    ("javax.persistence.lock.timeout", "ormeta.FetchPlan.LockTimeout"),
    ("jakarta.persistence.lock.timeout", "ormeta.FetchPlan.LockTimeout"),
    ("ormeta.LockTimeout", "ormeta.FetchPlan.LockTimeout"),
    ("javax.persistence.query.timeout", "ormeta.FetchPlan.QueryTimeout"),
    ("jakarta.persistence.query.timeout", "ormeta.FetchPlan.QueryTimeout"),
    ("ormeta.QueryTimeout", "ormeta.FetchPlan.QueryTimeout"),
    ("javax.persistence.lock.mode", "ormeta.FetchPlan.ReadLockMode"),
    ("jakarta.persistence.lock.mode", "ormeta.FetchPlan.ReadLockMode"),
    ("ormeta.ReadLockMode", "ormeta.FetchPlan.ReadLockMode"),
    ("ormeta.FetchBatchSize", "ormeta.FetchPlan.FetchBatchSize"),
    ("ormeta.MaxFetchDepth", "ormeta.FetchPlan.MaxFetchDepth"),
    ("ormeta.WriteLockMode", "ormeta.FetchPlan.WriteLockMode"),
];

/// Aliases of one setting, highest precedence first
pub const PRECEDENCE: [&[&str]; 6] = [
    &[
        "ormeta.FetchPlan.LockTimeout",
        "jakarta.persistence.lock.timeout",
        "javax.persistence.lock.timeout",
        "ormeta.LockTimeout",
    ],
    &[
        "ormeta.FetchPlan.QueryTimeout",
        "jakarta.persistence.query.timeout",
        "javax.persistence.query.timeout",
        "ormeta.QueryTimeout",
    ],
    &[
        "ormeta.FetchPlan.ReadLockMode",
        "jakarta.persistence.lock.mode",
        "javax.persistence.lock.mode",
        "ormeta.ReadLockMode",
    ],
    &["ormeta.FetchPlan.FetchBatchSize", "ormeta.FetchBatchSize"],
    &["ormeta.FetchPlan.MaxFetchDepth", "ormeta.MaxFetchDepth"],
    &["ormeta.FetchPlan.WriteLockMode", "ormeta.WriteLockMode"],
];

/// Prefixes whose unknown keys are still forwarded
pub const KNOWN_PREFIXES: [&str; 3] = ["ormeta", "javax", "jakarta"];

/// Fetch-plan key an alias stands for, or the key itself
#[must_use]
pub fn canonical(key: &str) -> &str {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map_or(key, |(_, target)| *target)
}

/// Precedence group containing `key` and its position in it
#[must_use]
pub fn precedence_of(key: &str) -> Option<(&'static [&'static str], usize)> {
    PRECEDENCE
        .iter()
        .find_map(|group| group.iter().position(|k| *k == key).map(|rank| (*group, rank)))
}

/// Substring before the first `.`
#[must_use]
pub fn prefix(key: &str) -> &str {
    key.split('.').next().unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_into_fetch_plan() {
        assert_eq!(canonical("javax.persistence.lock.timeout"), "ormeta.FetchPlan.LockTimeout");
        assert_eq!(canonical("ormeta.FetchPlan.Isolation"), "ormeta.FetchPlan.Isolation");
        for (_, target) in ALIASES {
            let property = target.strip_prefix(FETCH_PLAN_PREFIX).unwrap();
            assert!(FETCH_PLAN_PROPERTIES.contains(&property), "{target}");
        }
    }

    #[test]
    fn precedence_groups_share_a_target() {
        for group in PRECEDENCE {
            let target = canonical(group[0]);
            assert!(group.iter().all(|key| canonical(key) == target), "{group:?}");
        }
        assert_eq!(precedence_of("javax.persistence.lock.mode").map(|(_, rank)| rank), Some(2));
        assert!(precedence_of("ormeta.FetchPlan.Isolation").is_none());
    }

    #[test]
    fn every_alias_is_ranked_below_its_target() {
        for (alias, target) in ALIASES {
            let (group, rank) = precedence_of(alias).unwrap_or_else(|| panic!("{alias} has no precedence group"));
            assert_eq!(group[0], target, "{alias}");
            assert!(rank > 0, "{alias}");
        }
    }

    #[test]
    fn prefix_is_first_segment() {
        assert_eq!(prefix("javax.persistence.foo"), "javax");
        assert_eq!(prefix("plain"), "plain");
    }
}
