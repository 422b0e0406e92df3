//! Role-gating seam.
//!
//! Handlers consult the policy before acting, so a deployment that needs
//! real role enforcement can substitute a stricter decision function
//! without touching any handler. The clinic currently runs with the
//! allow-all default.

use std::sync::Arc;

use crate::auth::Identity;

type DecisionFn = dyn Fn(&Identity, &str) -> bool + Send + Sync;

/// Decides whether an identity may perform a named action.
#[derive(Clone)]
pub struct AccessPolicy {
    decide: Arc<DecisionFn>,
}

impl AccessPolicy {
    /// The default policy: every identity may perform every action.
    pub fn allow_all() -> Self {
        Self {
            decide: Arc::new(|_, _| true),
        }
    }

    /// Build a policy from a custom decision function.
    pub fn from_fn(decide: impl Fn(&Identity, &str) -> bool + Send + Sync + 'static) -> Self {
        Self {
            decide: Arc::new(decide),
        }
    }

    pub fn allows(&self, identity: &Identity, action: &str) -> bool {
        (self.decide)(identity, action)
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::allow_all()
    }
}

impl std::fmt::Debug for AccessPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessPolicy").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod policy_tests {
    use super::*;

    #[test]
    fn default_policy_allows_everything() {
        let policy = AccessPolicy::default();
        let public = Identity::public();
        assert!(policy.allows(&public, "patients.write"));
        assert!(policy.allows(&public, "pharmacy.delete"));
    }

    #[test]
    fn custom_policies_can_deny() {
        let policy =
            AccessPolicy::from_fn(|identity, action| {
                identity.user_id.is_some() || !action.ends_with(".write")
            });
        let public = Identity::public();
        assert!(policy.allows(&public, "patients.read"));
        assert!(!policy.allows(&public, "patients.write"));
    }
}
