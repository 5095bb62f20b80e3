//! Team routing policy
//!
//! *Le Routage* - an ordered rule list evaluated first-match-wins. Rules can
//! overlap (an International Enterprise Upgrade matches all three), so the
//! order is the business precedence: region, then request type, then size.

use lestockage::RequestDetails;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handling team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    /// Sales (also the fallback team)
    Sales,
    /// Technical services
    Technical,
    /// Key accounts
    Accounts,
}

impl Team {
    /// Return the stored team name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Team::Sales => "Sales",
            Team::Technical => "Technical",
            Team::Accounts => "Accounts",
        }
    }

    /// Create a team from its stored name
    #[must_use]
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s {
            "Sales" => Some(Team::Sales),
            "Technical" => Some(Team::Technical),
            "Accounts" => Some(Team::Accounts),
            _ => None,
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The request attributes routing looks at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoutingAttributes<'a> {
    /// Sales region
    pub region: Option<&'a str>,
    /// Kind of request
    pub request_type: Option<&'a str>,
    /// Company size band
    pub company_size: Option<&'a str>,
}

impl<'a> From<&'a RequestDetails> for RoutingAttributes<'a> {
    fn from(details: &'a RequestDetails) -> Self {
        Self {
            region: details.region.as_deref(),
            request_type: details.request_type.as_deref(),
            company_size: details.company_size.as_deref(),
        }
    }
}

/// Single-attribute equality test
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleCondition {
    /// `region` equals the value
    RegionIs(String),
    /// `request_type` equals the value
    RequestTypeIs(String),
    /// `company_size` equals the value
    CompanySizeIs(String),
}

impl RuleCondition {
    /// Evaluate against a request's attributes; absent attributes never match
    #[must_use]
    pub fn matches(&self, attrs: &RoutingAttributes<'_>) -> bool {
        match self {
            RuleCondition::RegionIs(v) => attrs.region == Some(v.as_str()),
            RuleCondition::RequestTypeIs(v) => attrs.request_type == Some(v.as_str()),
            RuleCondition::CompanySizeIs(v) => attrs.company_size == Some(v.as_str()),
        }
    }
}

/// Condition and the team it routes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingRule {
    /// Rule name, used in logs
    pub name: String,
    /// Match condition
    pub condition: RuleCondition,
    /// Team assigned on match
    pub team: Team,
}

impl RoutingRule {
    /// Create a rule
    pub fn new(name: impl Into<String>, condition: RuleCondition, team: Team) -> Self {
        Self {
            name: name.into(),
            condition,
            team,
        }
    }
}

/// Ordered, first-match-wins routing policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingPolicy {
    rules: Vec<RoutingRule>,
    default_team: Team,
}

static STANDARD_POLICY: Lazy<RoutingPolicy> = Lazy::new(RoutingPolicy::standard);

impl RoutingPolicy {
    /// Build a policy from rules in evaluation order
    #[must_use]
    pub fn new(rules: Vec<RoutingRule>, default_team: Team) -> Self {
        Self {
            rules,
            default_team,
        }
    }

    /// The built-in rule set
    ///
    /// 1. International region → Sales
    /// 2. Upgrade request → Technical
    /// 3. Enterprise company → Accounts
    /// 4. otherwise → Sales
    #[must_use]
    pub fn standard() -> Self {
        Self::new(
            vec![
                RoutingRule::new(
                    "international",
                    RuleCondition::RegionIs("International".to_string()),
                    Team::Sales,
                ),
                RoutingRule::new(
                    "upgrade",
                    RuleCondition::RequestTypeIs("Upgrade".to_string()),
                    Team::Technical,
                ),
                RoutingRule::new(
                    "enterprise",
                    RuleCondition::CompanySizeIs("Enterprise".to_string()),
                    Team::Accounts,
                ),
            ],
            Team::Sales,
        )
    }

    /// Rules in evaluation order
    #[must_use]
    pub fn rules(&self) -> &[RoutingRule] {
        &self.rules
    }

    /// Team used when no rule matches
    #[must_use]
    pub fn default_team(&self) -> Team {
        self.default_team
    }

    /// First matching rule, if any
    #[must_use]
    pub fn matching_rule(&self, attrs: &RoutingAttributes<'_>) -> Option<&RoutingRule> {
        self.rules.iter().find(|rule| rule.condition.matches(attrs))
    }

    /// Pick a team; always returns one
    #[must_use]
    pub fn assign_team(&self, attrs: &RoutingAttributes<'_>) -> Team {
        self.matching_rule(attrs)
            .map_or(self.default_team, |rule| rule.team)
    }
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Route a request with the built-in rule set
#[must_use]
pub fn assign_team(details: &RequestDetails) -> Team {
    STANDARD_POLICY.assign_team(&RoutingAttributes::from(details))
}
