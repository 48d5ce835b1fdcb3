//! Rule evaluation for conditional libraries and arguments.
//!
//! A rule list is a set of independent filters: an item is included only when every
//! rule permits it. This means a `disallow` rule with no conditions excludes the item
//! no matter what else the list says.

use crate::game::installer::types::PlatformIdentity;
use crate::game::launcher::version_parser::{Rule, RuleAction};
use std::collections::HashMap;

/// Feature flags consulted by `features` conditions
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    flags: HashMap<String, bool>,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, enabled: bool) -> Self {
        self.flags.insert(name.to_string(), enabled);
        self
    }

    /// Flags the environment does not define read as `false`
    pub fn get(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }
}

/// Environment a rule is evaluated against. Built once per run.
#[derive(Debug, Clone)]
pub struct RuleContext {
    pub platform: PlatformIdentity,
    pub features: FeatureSet,
}

impl RuleContext {
    pub fn new(platform: PlatformIdentity, features: FeatureSet) -> Self {
        Self { platform, features }
    }

    fn matches(&self, rule: &Rule) -> bool {
        if let Some(os) = &rule.os {
            if let Some(name) = &os.name {
                if name != self.platform.os.as_str() {
                    return false;
                }
            }
            if let Some(arch) = &os.arch {
                if arch != self.platform.arch.as_str() {
                    return false;
                }
            }
        }

        if let Some(features) = &rule.features {
            for (name, expected) in features {
                if self.features.get(name) != *expected {
                    return false;
                }
            }
        }

        true
    }

    /// Whether a single rule permits inclusion
    pub fn permits(&self, rule: Option<&Rule>) -> bool {
        let Some(rule) = rule else {
            return true;
        };
        let Some(action) = rule.action else {
            return true;
        };

        match action {
            RuleAction::Allow => self.matches(rule),
            RuleAction::Disallow => !self.matches(rule),
            RuleAction::Unknown => {
                log::warn!("Unknown rule action in {:?}, allowing", rule);
                true
            }
        }
    }

    /// Whether every rule in the list permits inclusion. Stops at the first refusal.
    pub fn permits_all(&self, rules: Option<&[Rule]>) -> bool {
        rules
            .unwrap_or_default()
            .iter()
            .all(|rule| self.permits(Some(rule)))
    }
}
