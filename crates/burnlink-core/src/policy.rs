//! Secret lifecycle policy and its validation rules
//!
//! The policy is plaintext and server-visible. Clients validate it before any
//! encryption happens; storage collaborators validate it again and use
//! `after_view` / `is_expired` / `allows_ip` to enforce it, so both sides
//! share one definition of "burn".

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use thiserror::Error;

use crate::types::Creator;

/// Default time-to-live: 3 days.
pub const DEFAULT_TTL: u64 = 259_200;

/// Upper bound on `max_views`.
pub const MAX_VIEWS_LIMIT: u32 = 999;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    #[error("ttl of {ttl}s is not available to {creator} creators")]
    TtlNotAllowed { ttl: u64, creator: Creator },

    #[error("max views must be between 1 and {max} (got {got})")]
    MaxViewsOutOfRange { got: u32, max: u32 },

    #[error("allowed IP {0:?} is not a valid IPv4 or IPv6 address")]
    InvalidAllowedIp(String),

    #[error("secret text must not be empty")]
    EmptyText,

    #[error("file name is {len} bytes long (limit {limit})")]
    FileNameTooLong { len: usize, limit: usize },
}

/// Plaintext lifecycle rules attached to every envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretPolicy {
    /// Time-to-live in seconds
    pub ttl: u64,
    /// Maximum retrievals when `prevent_burn` is set
    pub max_views: u32,
    /// Keep the secret alive for up to `max_views` reads instead of burning
    /// it on the first one
    pub prevent_burn: bool,
    /// Only this client IP may retrieve the secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_ip: Option<String>,
    /// Set by envelope assembly; never taken from user input
    #[serde(default)]
    pub password_protected: bool,
}

impl Default for SecretPolicy {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            max_views: 1,
            prevent_burn: false,
            allowed_ip: None,
            password_protected: false,
        }
    }
}

/// What a storage collaborator does after serving a retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewOutcome {
    Retain { remaining: u32 },
    Destroy,
}

impl SecretPolicy {
    /// The parsed allow-list entry. Blank strings mean "no restriction".
    pub fn allowed_ip_addr(&self) -> Result<Option<IpAddr>, PolicyViolation> {
        match self.allowed_ip.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse::<IpAddr>()
                .map(Some)
                .map_err(|_| PolicyViolation::InvalidAllowedIp(raw.to_string())),
        }
    }

    /// Whether `client` may retrieve the secret.
    ///
    /// An unknown client address never satisfies an IP restriction.
    /// IPv4-mapped IPv6 addresses match their IPv4 form.
    pub fn allows_ip(&self, client: Option<IpAddr>) -> bool {
        match self.allowed_ip_addr() {
            Ok(None) => true,
            Ok(Some(allowed)) => {
                client.is_some_and(|c| c.to_canonical() == allowed.to_canonical())
            }
            Err(_) => false,
        }
    }

    /// Decide the secret's fate after its `views`-th successful retrieval.
    ///
    /// Without `prevent_burn` the first read burns the secret regardless of
    /// `max_views`. With it, the secret survives until `max_views` reads.
    pub fn after_view(&self, views: u32) -> ViewOutcome {
        if !self.prevent_burn || views >= self.max_views {
            ViewOutcome::Destroy
        } else {
            ViewOutcome::Retain {
                remaining: self.max_views - views,
            }
        }
    }

    /// Whether the TTL has elapsed. Times are Unix seconds.
    pub fn is_expired(&self, created_at: u64, now: u64) -> bool {
        now >= created_at.saturating_add(self.ttl)
    }
}

/// Allow-lists governing which policies a creator may choose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyLimits {
    /// TTLs (seconds) available to everyone
    pub anonymous_ttls: Vec<u64>,
    /// Additional TTLs unlocked for authenticated creators
    pub authenticated_ttls: Vec<u64>,
    /// Upper bound for `max_views`
    pub max_views: u32,
    /// TTL used when the creator does not pick one
    pub default_ttl: u64,
}

impl Default for PolicyLimits {
    fn default() -> Self {
        Self {
            anonymous_ttls: vec![300, 1800, 3600, 14_400, 43_200, 86_400, 259_200, 604_800],
            authenticated_ttls: vec![1_209_600, 2_419_200],
            max_views: MAX_VIEWS_LIMIT,
            default_ttl: DEFAULT_TTL,
        }
    }
}

impl PolicyLimits {
    pub fn ttl_allowed(&self, ttl: u64, creator: Creator) -> bool {
        self.anonymous_ttls.contains(&ttl)
            || (creator == Creator::Authenticated && self.authenticated_ttls.contains(&ttl))
    }

    /// TTLs `creator` may choose, longest first (the order a picker shows them).
    pub fn ttl_choices(&self, creator: Creator) -> Vec<u64> {
        let mut choices = self.anonymous_ttls.clone();
        if creator == Creator::Authenticated {
            choices.extend_from_slice(&self.authenticated_ttls);
        }
        choices.sort_unstable_by(|a, b| b.cmp(a));
        choices.dedup();
        choices
    }

    /// A policy with the configured defaults.
    pub fn default_policy(&self) -> SecretPolicy {
        SecretPolicy {
            ttl: self.default_ttl,
            ..SecretPolicy::default()
        }
    }

    pub fn validate(&self, policy: &SecretPolicy, creator: Creator) -> Result<(), PolicyViolation> {
        if !self.ttl_allowed(policy.ttl, creator) {
            return Err(PolicyViolation::TtlNotAllowed {
                ttl: policy.ttl,
                creator,
            });
        }

        if policy.max_views < 1 || policy.max_views > self.max_views {
            return Err(PolicyViolation::MaxViewsOutOfRange {
                got: policy.max_views,
                max: self.max_views,
            });
        }

        policy.allowed_ip_addr()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(ttl: u64, max_views: u32) -> SecretPolicy {
        SecretPolicy {
            ttl,
            max_views,
            ..SecretPolicy::default()
        }
    }

    #[test]
    fn test_max_views_boundaries() {
        let limits = PolicyLimits::default();

        assert!(limits.validate(&policy(3600, 1), Creator::Anonymous).is_ok());
        assert!(limits.validate(&policy(3600, 999), Creator::Anonymous).is_ok());
        assert_eq!(
            limits.validate(&policy(3600, 0), Creator::Anonymous),
            Err(PolicyViolation::MaxViewsOutOfRange { got: 0, max: 999 })
        );
        assert_eq!(
            limits.validate(&policy(3600, 1000), Creator::Anonymous),
            Err(PolicyViolation::MaxViewsOutOfRange { got: 1000, max: 999 })
        );
    }

    #[test]
    fn test_ttl_outside_set_rejected() {
        let limits = PolicyLimits::default();
        assert!(matches!(
            limits.validate(&policy(999, 1), Creator::Anonymous),
            Err(PolicyViolation::TtlNotAllowed { ttl: 999, .. })
        ));
        assert!(limits.validate(&policy(999, 1), Creator::Authenticated).is_err());
    }

    #[test]
    fn test_extended_ttl_needs_authentication() {
        let limits = PolicyLimits::default();
        for ttl in [1_209_600, 2_419_200] {
            assert!(limits.validate(&policy(ttl, 1), Creator::Anonymous).is_err());
            assert!(limits.validate(&policy(ttl, 1), Creator::Authenticated).is_ok());
        }
    }

    #[test]
    fn test_every_anonymous_ttl_accepted() {
        let limits = PolicyLimits::default();
        for ttl in limits.anonymous_ttls.clone() {
            assert!(limits.validate(&policy(ttl, 1), Creator::Anonymous).is_ok());
        }
    }

    #[test]
    fn test_allowed_ip_validation() {
        let limits = PolicyLimits::default();
        for ip in ["192.168.1.10", "::1", "2001:db8::ff00:42:8329", "  10.0.0.1  ", ""] {
            let mut p = policy(3600, 1);
            p.allowed_ip = Some(ip.to_string());
            assert!(limits.validate(&p, Creator::Anonymous).is_ok(), "{ip:?}");
        }
        for ip in ["example.com", "256.1.1.1", "10.0.0", "1.2.3.4/24"] {
            let mut p = policy(3600, 1);
            p.allowed_ip = Some(ip.to_string());
            assert!(
                matches!(
                    limits.validate(&p, Creator::Anonymous),
                    Err(PolicyViolation::InvalidAllowedIp(_))
                ),
                "{ip:?}"
            );
        }
    }

    #[test]
    fn test_allows_ip() {
        let mut p = policy(3600, 1);
        assert!(p.allows_ip(None));

        p.allowed_ip = Some("10.0.0.1".into());
        assert!(p.allows_ip(Some("10.0.0.1".parse().unwrap())));
        assert!(p.allows_ip(Some("::ffff:10.0.0.1".parse().unwrap())));
        assert!(!p.allows_ip(Some("10.0.0.2".parse().unwrap())));
        assert!(!p.allows_ip(None));
    }

    #[test]
    fn test_burn_on_first_read_without_prevent_burn() {
        let p = SecretPolicy {
            max_views: 5,
            prevent_burn: false,
            ..SecretPolicy::default()
        };
        assert_eq!(p.after_view(1), ViewOutcome::Destroy);
    }

    #[test]
    fn test_prevent_burn_counts_views() {
        let p = SecretPolicy {
            max_views: 3,
            prevent_burn: true,
            ..SecretPolicy::default()
        };
        assert_eq!(p.after_view(1), ViewOutcome::Retain { remaining: 2 });
        assert_eq!(p.after_view(2), ViewOutcome::Retain { remaining: 1 });
        assert_eq!(p.after_view(3), ViewOutcome::Destroy);
    }

    #[test]
    fn test_expiry() {
        let p = policy(300, 1);
        assert!(!p.is_expired(1_000, 1_299));
        assert!(p.is_expired(1_000, 1_300));
    }

    #[test]
    fn test_ttl_choices_order() {
        let limits = PolicyLimits::default();
        let anon = limits.ttl_choices(Creator::Anonymous);
        assert_eq!(anon.first(), Some(&604_800));
        assert_eq!(anon.last(), Some(&300));

        let auth = limits.ttl_choices(Creator::Authenticated);
        assert_eq!(auth.first(), Some(&2_419_200));
        assert_eq!(auth.len(), 10);
    }

    #[test]
    fn test_policy_wire_names() {
        let p = SecretPolicy {
            allowed_ip: Some("127.0.0.1".into()),
            ..SecretPolicy::default()
        };
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["ttl"], 259_200);
        assert_eq!(json["maxViews"], 1);
        assert_eq!(json["preventBurn"], false);
        assert_eq!(json["allowedIp"], "127.0.0.1");
        assert_eq!(json["passwordProtected"], false);
    }
}
