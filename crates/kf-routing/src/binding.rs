//! Route bindings: what an App asks for and the fully-resolved form

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Weight of a binding that doesn't declare one
pub const DEFAULT_ROUTE_WEIGHT: i32 = 1;

/// Port traffic is sent to when a binding doesn't declare one
pub const DEFAULT_ROUTE_DESTINATION_PORT: i32 = 80;

/// The address part of a route: hostname, domain and path
#[derive(
    Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpecFields {
    /// Subdomain of the route, e.g. `hostname` in `hostname.example.com`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hostname: String,

    /// Domain of the route, e.g. `example.com`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub domain: String,

    /// URL path of the route
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
}

impl RouteSpecFields {
    /// Fields for a hostname, domain and path
    pub fn new(hostname: &str, domain: &str, path: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            domain: domain.to_string(),
            path: path.to_string(),
        }
    }

    /// `hostname.domain`, or just the domain without a hostname
    pub fn host(&self) -> String {
        if self.hostname.is_empty() {
            self.domain.clone()
        } else {
            format!("{}.{}", self.hostname, self.domain)
        }
    }

    /// Returns true for `*` hostnames
    pub fn is_wildcard(&self) -> bool {
        self.hostname == "*"
    }
}

impl fmt::Display for RouteSpecFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let segments: Vec<&str> = self.path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return f.write_str(&self.host());
        }
        write!(f, "{}/{}", self.host(), segments.join("/"))
    }
}

/// A route an App asks to be bound to
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RouteWeightBinding {
    /// Address of the route
    #[serde(flatten)]
    pub fields: RouteSpecFields,

    /// Share of the route's traffic, [`DEFAULT_ROUTE_WEIGHT`] when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i32>,

    /// Port on the App's service, [`DEFAULT_ROUTE_DESTINATION_PORT`] when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_port: Option<i32>,
}

impl RouteWeightBinding {
    /// A binding with no weight or port
    pub fn new(fields: RouteSpecFields) -> Self {
        Self {
            fields,
            weight: None,
            destination_port: None,
        }
    }

    /// Set the weight
    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Set the destination port
    pub fn with_destination_port(mut self, port: i32) -> Self {
        self.destination_port = Some(port);
        self
    }

    /// The weight, falling back to the default
    pub fn effective_weight(&self) -> i32 {
        self.weight.unwrap_or(DEFAULT_ROUTE_WEIGHT)
    }

    /// Resolve every default into a [`QualifiedRouteBinding`]
    pub fn qualify(&self, default_domain: &str, service_name: &str) -> QualifiedRouteBinding {
        let mut source = self.fields.clone();
        if source.domain.is_empty() {
            source.domain = default_domain.to_string();
        }

        QualifiedRouteBinding {
            source,
            destination: RouteDestination {
                service_name: service_name.to_string(),
                port: self
                    .destination_port
                    .unwrap_or(DEFAULT_ROUTE_DESTINATION_PORT),
                weight: self.effective_weight(),
            },
        }
    }
}

/// Where a route sends traffic
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct RouteDestination {
    /// Service receiving traffic; for Apps this is the App name
    pub service_name: String,

    /// Port on the service
    pub port: i32,

    /// Share of the route's traffic
    pub weight: i32,
}

/// A binding with every default resolved
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct QualifiedRouteBinding {
    /// Route traffic arrives on
    pub source: RouteSpecFields,

    /// Traffic sink
    pub destination: RouteDestination,
}

impl QualifiedRouteBinding {
    /// Back to the form an App declares, with every field set
    pub fn to_unqualified(&self) -> RouteWeightBinding {
        RouteWeightBinding {
            fields: self.source.clone(),
            weight: Some(self.destination.weight),
            destination_port: Some(self.destination.port),
        }
    }

    /// Same source, service and port
    pub fn mergeable_with(&self, other: &QualifiedRouteBinding) -> bool {
        self.source == other.source
            && self.destination.port == other.destination.port
            && self.destination.service_name == other.destination.service_name
    }

    /// Add `other`'s weight into this binding, saturating at `i32::MAX`
    pub fn merge(&mut self, other: &QualifiedRouteBinding) {
        self.destination.weight = self
            .destination
            .weight
            .saturating_add(other.destination.weight);
    }
}

/// Combine bindings to the same hostname, domain and path
///
/// Weights are summed, unset weights counting as [`DEFAULT_ROUTE_WEIGHT`];
/// sums saturate at `i32::MAX`.
/// The output keeps first-occurrence order, always carries a weight, and
/// merging it again changes nothing.
pub fn merge_bindings(bindings: &[RouteWeightBinding]) -> Vec<RouteWeightBinding> {
    let mut merged: Vec<RouteWeightBinding> = Vec::with_capacity(bindings.len());
    for binding in bindings {
        match merged.iter_mut().find(|m| m.fields == binding.fields) {
            Some(existing) => {
                existing.weight = Some(
                    existing
                        .effective_weight()
                        .saturating_add(binding.effective_weight()),
                );
            }
            None => {
                let mut first = binding.clone();
                first.weight = Some(binding.effective_weight());
                merged.push(first);
            }
        }
    }
    merged
}

/// Combine qualified bindings that are [mergeable](QualifiedRouteBinding::mergeable_with)
pub fn merge_qualified_bindings(bindings: &[QualifiedRouteBinding]) -> Vec<QualifiedRouteBinding> {
    let mut merged: Vec<QualifiedRouteBinding> = Vec::with_capacity(bindings.len());
    for binding in bindings {
        match merged.iter_mut().find(|m| m.mergeable_with(binding)) {
            Some(existing) => existing.merge(binding),
            None => merged.push(binding.clone()),
        }
    }
    merged
}

/// Qualify every binding against the same defaults
pub fn qualify_bindings(
    bindings: &[RouteWeightBinding],
    default_domain: &str,
    service_name: &str,
) -> Vec<QualifiedRouteBinding> {
    bindings
        .iter()
        .map(|b| b.qualify(default_domain, service_name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn on(domain: &str) -> RouteWeightBinding {
        RouteWeightBinding::new(RouteSpecFields::new("", domain, ""))
    }

    mod fields {
        use super::*;

        #[rstest]
        #[case::domain_only("", "example.com", "", "example.com")]
        #[case::hostname("app", "example.com", "", "app.example.com")]
        #[case::root_path("app", "example.com", "/", "app.example.com")]
        #[case::path("app", "example.com", "/api", "app.example.com/api")]
        #[case::unrooted_path("", "example.com", "api/v1/", "example.com/api/v1")]
        fn test_display(
            #[case] hostname: &str,
            #[case] domain: &str,
            #[case] path: &str,
            #[case] expected: &str,
        ) {
            assert_eq!(RouteSpecFields::new(hostname, domain, path).to_string(), expected);
        }

        #[test]
        fn test_wildcard() {
            assert!(RouteSpecFields::new("*", "example.com", "").is_wildcard());
            assert!(!RouteSpecFields::new("www", "example.com", "").is_wildcard());
        }

        #[test]
        fn test_binding_wire_format_is_flat() {
            let binding = RouteWeightBinding::new(RouteSpecFields::new("app", "example.com", "/x"))
                .with_weight(3);
            assert_eq!(
                serde_json::to_value(&binding).unwrap(),
                serde_json::json!({"hostname": "app", "domain": "example.com", "path": "/x", "weight": 3})
            );
        }
    }

    mod merge {
        use super::*;

        #[test]
        fn test_sums_default_weights_in_first_occurrence_order() {
            let merged = merge_bindings(&[on("a"), on("b"), on("a")]);
            assert_eq!(merged, vec![on("a").with_weight(2), on("b").with_weight(1)]);
        }

        #[test]
        fn test_sums_explicit_weights() {
            let merged = merge_bindings(&[on("a").with_weight(5), on("a"), on("a").with_weight(0)]);
            assert_eq!(merged, vec![on("a").with_weight(6)]);
        }

        #[test]
        fn test_weight_sum_saturates() {
            let merged = merge_bindings(&[
                on("a").with_weight(i32::MAX),
                on("a").with_weight(i32::MAX),
                on("a"),
            ]);
            assert_eq!(merged, vec![on("a").with_weight(i32::MAX)]);
        }

        #[test]
        fn test_qualified_weight_sum_saturates() {
            let big = on("a").with_weight(i32::MAX).qualify("", "app");
            let merged = merge_qualified_bindings(&[big.clone(), big]);
            assert_eq!(merged.len(), 1);
            assert_eq!(merged[0].destination.weight, i32::MAX);
        }

        #[test]
        fn test_keeps_first_destination_port() {
            let merged = merge_bindings(&[
                on("a").with_destination_port(8080),
                on("a").with_destination_port(9090),
            ]);
            assert_eq!(merged.len(), 1);
            assert_eq!(merged[0].destination_port, Some(8080));
        }

        #[test]
        fn test_path_is_part_of_identity() {
            let merged = merge_bindings(&[
                RouteWeightBinding::new(RouteSpecFields::new("", "a", "/x")),
                RouteWeightBinding::new(RouteSpecFields::new("", "a", "/y")),
            ]);
            assert_eq!(merged.len(), 2);
        }

        #[rstest]
        #[case::empty(vec![])]
        #[case::single(vec![on("a")])]
        #[case::duplicates(vec![on("a"), on("b"), on("a"), on("b").with_weight(4), on("c")])]
        #[case::zero_weights(vec![on("a").with_weight(0), on("a").with_weight(0)])]
        #[case::max_weights(vec![on("a").with_weight(i32::MAX), on("a").with_weight(i32::MAX)])]
        fn test_is_idempotent(#[case] input: Vec<RouteWeightBinding>) {
            let once = merge_bindings(&input);
            assert_eq!(merge_bindings(&once), once);
        }

        #[test]
        fn test_qualified_merge_needs_same_service_and_port() {
            let a = on("a").qualify("", "app");
            let other_app = on("a").qualify("", "other");
            let other_port = on("a").with_destination_port(8080).qualify("", "app");

            let merged = merge_qualified_bindings(&[a.clone(), other_app, a.clone(), other_port]);
            assert_eq!(merged.len(), 3);
            assert_eq!(merged[0].destination.weight, 2);
        }
    }

    mod qualify {
        use super::*;

        #[test]
        fn test_fills_defaults() {
            let q = RouteWeightBinding::new(RouteSpecFields::new("www", "", "/")).qualify("example.com", "my-app");
            assert_eq!(q.source, RouteSpecFields::new("www", "example.com", "/"));
            assert_eq!(
                q.destination,
                RouteDestination {
                    service_name: "my-app".to_string(),
                    port: DEFAULT_ROUTE_DESTINATION_PORT,
                    weight: DEFAULT_ROUTE_WEIGHT,
                }
            );
        }

        #[test]
        fn test_keeps_declared_values() {
            let q = on("apps.internal")
                .with_weight(0)
                .with_destination_port(8080)
                .qualify("example.com", "my-app");
            assert_eq!(q.source.domain, "apps.internal");
            assert_eq!(q.destination.port, 8080);
            assert_eq!(q.destination.weight, 0);
        }

        #[test]
        fn test_unqualified_round_trip_keeps_source() {
            let q = on("a").qualify("", "app");
            let back = q.to_unqualified();
            assert_eq!(back.fields, q.source);
            assert_eq!(back.qualify("unused", "app"), q);
        }

        #[test]
        fn test_qualify_bindings_preserves_order() {
            let qualified = qualify_bindings(&[on("b"), on("")], "example.com", "app");
            assert_eq!(qualified[0].source.domain, "b");
            assert_eq!(qualified[1].source.domain, "example.com");
        }
    }
}
