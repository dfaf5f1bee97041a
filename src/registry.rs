//! Endpoint registry: the single source of truth for upstream CAMARA paths
//!
//! Maps an operation key to one path template per supported API
//! generation. The table is validated in full when the registry is
//! built, so a missing (operation, version) pair blocks startup instead
//! of failing on the first request that needs it.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// Upstream API generation selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiVersion {
    /// Spring 2025 release train
    #[default]
    Spring25,
    /// Fall 2025 release train
    Fall25,
}

impl ApiVersion {
    /// All supported generations, in declaration order
    pub const ALL: [Self; 2] = [Self::Spring25, Self::Fall25];

    /// Canonical lowercase tag
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Spring25 => "spring25",
            Self::Fall25 => "fall25",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Spring25 => 0,
            Self::Fall25 => 1,
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "spring25" => Ok(Self::Spring25),
            "fall25" => Ok(Self::Fall25),
            other => Err(Error::Config(format!("Unknown API version: {other}"))),
        }
    }
}

/// One row of the declarative endpoint table
pub type TableRow = (&'static str, &'static [(ApiVersion, &'static str)]);

/// All 23 upstream endpoints, both release trains.
///
/// Paths follow the operator aggregation platform layout; several APIs
/// kept the same path across both trains, others bumped their version
/// segment between spring25 and fall25.
const ENDPOINT_TABLE: &[TableRow] = &[
    // DeviceReachabilityStatus + subscriptions
    (
        "device_reachability_retrieve",
        &[
            (ApiVersion::Spring25, "/device-reachability-status/v1/retrieve"),
            (ApiVersion::Fall25, "/device-reachability-status/v1/retrieve"),
        ],
    ),
    (
        "device_reachability_subs_create",
        &[
            (
                ApiVersion::Spring25,
                "/device-reachability-status-subscriptions/v0.7/subscriptions",
            ),
            (
                ApiVersion::Fall25,
                "/device-reachability-status-subscriptions/v1/subscriptions",
            ),
        ],
    ),
    // DeviceRoamingStatus + subscriptions
    (
        "device_roaming_retrieve",
        &[
            (ApiVersion::Spring25, "/device-roaming-status/v1/retrieve"),
            (ApiVersion::Fall25, "/device-roaming-status/v1/retrieve"),
        ],
    ),
    (
        "device_roaming_subs_create",
        &[
            (
                ApiVersion::Spring25,
                "/device-roaming-status-subscriptions/v0.7/subscriptions",
            ),
            (
                ApiVersion::Fall25,
                "/device-roaming-status-subscriptions/v1/subscriptions",
            ),
        ],
    ),
    // DeviceLocation family
    (
        "location_verification",
        &[
            (ApiVersion::Spring25, "/location-verification/v0/verify"),
            (ApiVersion::Fall25, "/location-verification/v3/verify"),
        ],
    ),
    (
        "location_retrieval",
        &[
            (ApiVersion::Spring25, "/location-retrieval/v0/retrieve"),
            (ApiVersion::Fall25, "/location-retrieval/v0.5/retrieve"),
        ],
    ),
    (
        "geofencing_subs_create",
        &[
            (ApiVersion::Spring25, "/geofencing-subscriptions/v0.3/subscriptions"),
            (ApiVersion::Fall25, "/geofencing-subscriptions/v0.5/subscriptions"),
        ],
    ),
    // NumberVerification
    (
        "number_verification_verify",
        &[
            (ApiVersion::Spring25, "/number-verification/v2/verify"),
            (ApiVersion::Fall25, "/number-verification/v2/verify"),
        ],
    ),
    (
        "number_verification_phone",
        &[
            (ApiVersion::Spring25, "/number-verification/v2/device-phone-number"),
            (ApiVersion::Fall25, "/number-verification/v2/device-phone-number"),
        ],
    ),
    // OTPValidation
    (
        "otp_send",
        &[
            (ApiVersion::Spring25, "/one-time-password-sms/v1/send-code"),
            (ApiVersion::Fall25, "/one-time-password-sms/v1/send-code"),
        ],
    ),
    (
        "otp_validate",
        &[
            (ApiVersion::Spring25, "/one-time-password-sms/v1/validate-code"),
            (ApiVersion::Fall25, "/one-time-password-sms/v1/validate-code"),
        ],
    ),
    // QualityOnDemand: profiles + sessions
    (
        "qos_profiles_list",
        &[
            (ApiVersion::Spring25, "/qos-profiles/v0.11/qos-profiles"),
            (ApiVersion::Fall25, "/qos-profiles/v1/qos-profiles"),
        ],
    ),
    (
        "qos_profiles_detail",
        &[
            (ApiVersion::Spring25, "/qos-profiles/v0.11/qos-profiles/{name}"),
            (ApiVersion::Fall25, "/qos-profiles/v1/qos-profiles/{name}"),
        ],
    ),
    (
        "qod_sessions_create",
        &[
            (ApiVersion::Spring25, "/quality-on-demand/v0.11/sessions"),
            (ApiVersion::Fall25, "/quality-on-demand/v1/sessions"),
        ],
    ),
    (
        "qod_sessions_get",
        &[
            (ApiVersion::Spring25, "/quality-on-demand/v0.11/sessions/{id}"),
            (ApiVersion::Fall25, "/quality-on-demand/v1/sessions/{id}"),
        ],
    ),
    (
        "qod_sessions_delete",
        &[
            (ApiVersion::Spring25, "/quality-on-demand/v0.11/sessions/{id}"),
            (ApiVersion::Fall25, "/quality-on-demand/v1/sessions/{id}"),
        ],
    ),
    (
        "qod_sessions_extend",
        &[
            (ApiVersion::Spring25, "/quality-on-demand/v0.11/sessions/{id}/extend"),
            (ApiVersion::Fall25, "/quality-on-demand/v1/sessions/{id}/extend"),
        ],
    ),
    // SimSwap + subscriptions
    (
        "sim_swap_check",
        &[
            (ApiVersion::Spring25, "/sim-swap/v2/check"),
            (ApiVersion::Fall25, "/sim-swap/v2/check"),
        ],
    ),
    (
        "sim_swap_date",
        &[
            (ApiVersion::Spring25, "/sim-swap/v2/retrieve-date"),
            (ApiVersion::Fall25, "/sim-swap/v2/retrieve-date"),
        ],
    ),
    (
        "sim_swap_subs_create",
        &[
            (ApiVersion::Spring25, "/sim-swap-subscriptions/v0.2/subscriptions"),
            (ApiVersion::Fall25, "/sim-swap-subscriptions/v1/subscriptions"),
        ],
    ),
    // SimpleEdgeDiscovery
    (
        "simple_edge_discovery",
        &[
            (ApiVersion::Spring25, "/simple-edge-discovery/v1/edge-resources"),
            (ApiVersion::Fall25, "/simple-edge-discovery/v2/edge-resources"),
        ],
    ),
    // DeviceSwap
    (
        "device_swap_check",
        &[
            (ApiVersion::Spring25, "/device-swap/v0.2/check"),
            (ApiVersion::Fall25, "/device-swap/v1/check"),
        ],
    ),
    (
        "device_swap_date",
        &[
            (ApiVersion::Spring25, "/device-swap/v0.2/retrieve-date"),
            (ApiVersion::Fall25, "/device-swap/v1/retrieve-date"),
        ],
    ),
];

/// Validated endpoint registry, read-only after construction
#[derive(Debug)]
pub struct EndpointRegistry {
    entries: HashMap<&'static str, [&'static str; 2]>,
}

impl EndpointRegistry {
    /// Build the registry from the built-in endpoint table
    ///
    /// # Errors
    ///
    /// Returns a configuration error if any operation is missing a
    /// template for a supported version, carries a duplicate version
    /// entry, or declares a malformed template.
    pub fn new() -> Result<Self> {
        Self::from_table(ENDPOINT_TABLE)
    }

    /// Build a registry from an explicit table (exposed for tests)
    pub fn from_table(table: &[TableRow]) -> Result<Self> {
        let mut entries = HashMap::with_capacity(table.len());

        for (key, templates) in table {
            let mut row: [Option<&'static str>; 2] = [None, None];
            for &(version, template) in *templates {
                // Reject unclosed/empty placeholders up front
                placeholders(template)?;
                let slot = &mut row[version.index()];
                if slot.is_some() {
                    return Err(Error::Config(format!(
                        "Operation '{key}' declares '{version}' twice"
                    )));
                }
                *slot = Some(template);
            }

            let complete = match row {
                [Some(spring), Some(fall)] => [spring, fall],
                _ => {
                    let missing = ApiVersion::ALL
                        .iter()
                        .find(|v| row[v.index()].is_none())
                        .map(|v| v.as_str())
                        .unwrap_or_default();
                    return Err(Error::Config(format!(
                        "Operation '{key}' is missing a template for '{missing}'"
                    )));
                }
            };

            if entries.insert(*key, complete).is_some() {
                return Err(Error::Config(format!("Duplicate operation key '{key}'")));
            }
        }

        Ok(Self { entries })
    }

    /// Look up the path template for an operation under a version tag
    ///
    /// # Errors
    ///
    /// `UnknownOperation` if the key is absent. `UnsupportedVersion` is
    /// unreachable for a registry built from a validated table but kept
    /// in the contract for callers holding partial tables.
    pub fn lookup(&self, operation: &str, version: ApiVersion) -> Result<&'static str> {
        self.entries
            .get(operation)
            .map(|row| row[version.index()])
            .ok_or_else(|| Error::UnknownOperation(operation.to_string()))
    }

    /// All declared operation keys, unordered
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    /// Number of declared operations
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Names of all `{placeholder}` segments in a template, in order
///
/// # Errors
///
/// Returns a configuration error for an unclosed or empty placeholder.
pub fn placeholders(template: &str) -> Result<Vec<&str>> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let end = after.find('}').ok_or_else(|| {
            Error::Config(format!("Unclosed placeholder in template '{template}'"))
        })?;
        let name = &after[..end];
        if name.is_empty() {
            return Err(Error::Config(format!(
                "Empty placeholder in template '{template}'"
            )));
        }
        names.push(name);
        rest = &after[end + 1..];
    }
    Ok(names)
}

/// Substitute placeholder values into a path template
///
/// Pure and deterministic. Values are percent-encoded as single path
/// segments, so a value containing `/`, `%`, or `?` cannot escape its
/// segment or smuggle extra path structure.
///
/// # Errors
///
/// `MissingPathParameter` if the template names a placeholder absent
/// from the map.
pub fn resolve_path(template: &str, params: &HashMap<String, String>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}').ok_or_else(|| {
            Error::Config(format!("Unclosed placeholder in template '{template}'"))
        })?;
        let name = &after[..end];
        let value = params
            .get(name)
            .ok_or_else(|| Error::MissingPathParameter(name.to_string()))?;
        out.push_str(&encode_segment(value));
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Percent-encode one value with the url crate's path-segment rules
fn encode_segment(value: &str) -> String {
    // Url::path_segments_mut applies the exact encode set a path segment
    // needs; round-tripping through a throwaway URL avoids hand-rolling it.
    let mut buf = Url::parse("http://placeholder.invalid").expect("static URL");
    buf.path_segments_mut()
        .expect("http URLs have path segments")
        .push(value);
    buf.path().trim_start_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn builtin_table_builds_and_covers_both_versions() {
        let registry = EndpointRegistry::new().unwrap();
        assert_eq!(registry.len(), 23);

        for key in registry.keys() {
            for version in ApiVersion::ALL {
                let template = registry.lookup(key, version).unwrap();
                assert!(template.starts_with('/'), "{key}: {template}");
            }
        }
    }

    #[test]
    fn version_drift_shows_in_lookup() {
        let registry = EndpointRegistry::new().unwrap();
        assert_eq!(
            registry.lookup("qos_profiles_list", ApiVersion::Spring25).unwrap(),
            "/qos-profiles/v0.11/qos-profiles"
        );
        assert_eq!(
            registry.lookup("qos_profiles_list", ApiVersion::Fall25).unwrap(),
            "/qos-profiles/v1/qos-profiles"
        );
    }

    #[test]
    fn unknown_operation_is_rejected() {
        let registry = EndpointRegistry::new().unwrap();
        let err = registry.lookup("nope", ApiVersion::Spring25).unwrap_err();
        assert!(matches!(err, Error::UnknownOperation(_)));
    }

    #[test]
    fn incomplete_table_is_rejected_at_construction() {
        const BAD: &[TableRow] = &[(
            "half_covered",
            &[(ApiVersion::Spring25, "/thing/v1/do")],
        )];
        let err = EndpointRegistry::from_table(BAD).unwrap_err();
        assert!(err.to_string().contains("fall25"));
    }

    #[test]
    fn duplicate_key_is_rejected_at_construction() {
        const BAD: &[TableRow] = &[
            (
                "dup",
                &[
                    (ApiVersion::Spring25, "/a/v1"),
                    (ApiVersion::Fall25, "/a/v2"),
                ],
            ),
            (
                "dup",
                &[
                    (ApiVersion::Spring25, "/b/v1"),
                    (ApiVersion::Fall25, "/b/v2"),
                ],
            ),
        ];
        let err = EndpointRegistry::from_table(BAD).unwrap_err();
        assert!(err.to_string().contains("Duplicate"));
    }

    #[test]
    fn resolve_substitutes_all_placeholders() {
        let path = resolve_path(
            "/quality-on-demand/v1/sessions/{id}",
            &params(&[("id", "abc-123")]),
        )
        .unwrap();
        assert_eq!(path, "/quality-on-demand/v1/sessions/abc-123");
    }

    #[test]
    fn resolve_is_deterministic() {
        let map = params(&[("name", "gold")]);
        let first = resolve_path("/qos-profiles/v1/qos-profiles/{name}", &map).unwrap();
        let second = resolve_path("/qos-profiles/v1/qos-profiles/{name}", &map).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn resolve_fails_iff_any_placeholder_is_unsatisfied() {
        let template = "/users/{id}/posts/{post_id}";
        let pairs = [("id", "7"), ("post_id", "42")];

        // Every subset of the required placeholders: success only for
        // the full set, MissingPathParameter otherwise.
        for mask in 0u32..4 {
            let map: HashMap<String, String> = pairs
                .iter()
                .enumerate()
                .filter(|&(i, _)| mask & (1 << i) != 0)
                .map(|(_, (k, v))| ((*k).to_string(), (*v).to_string()))
                .collect();

            let result = resolve_path(template, &map);
            if mask == 0b11 {
                assert_eq!(result.unwrap(), "/users/7/posts/42");
            } else {
                assert!(matches!(result, Err(Error::MissingPathParameter(_))));
            }
        }
    }

    #[test]
    fn resolve_missing_placeholder_names_the_parameter() {
        let err = resolve_path("/sessions/{id}/extend", &params(&[])).unwrap_err();
        match err {
            Error::MissingPathParameter(name) => assert_eq!(name, "id"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn resolve_encodes_reserved_characters() {
        let path = resolve_path(
            "/qos-profiles/v1/qos-profiles/{name}",
            &params(&[("name", "gold/../../admin")]),
        )
        .unwrap();
        assert_eq!(path, "/qos-profiles/v1/qos-profiles/gold%2F..%2F..%2Fadmin");

        let path = resolve_path("/sessions/{id}", &params(&[("id", "a b%c?d")])).unwrap();
        assert_eq!(path, "/sessions/a%20b%25c%3Fd");
    }

    #[test]
    fn placeholder_scan_finds_names_in_order() {
        let names = placeholders("/users/{id}/posts/{post_id}").unwrap();
        assert_eq!(names, vec!["id", "post_id"]);
        assert!(placeholders("/flat/path").unwrap().is_empty());
    }

    #[test]
    fn malformed_templates_are_config_errors() {
        assert!(placeholders("/broken/{id").is_err());
        assert!(placeholders("/broken/{}").is_err());
    }

    #[test]
    fn version_tags_round_trip() {
        for version in ApiVersion::ALL {
            assert_eq!(version.as_str().parse::<ApiVersion>().unwrap(), version);
        }
        assert!("winter26".parse::<ApiVersion>().is_err());
    }
}
