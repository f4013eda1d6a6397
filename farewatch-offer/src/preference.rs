use serde::{Deserialize, Serialize};
use farewatch_core::Query;
use std::fmt;

/// Ranking criterion
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Price,
    Stops,
    EarliestArrival,
    EarliestDeparture,
    Duration,
}

impl SortBy {
    pub fn label(&self) -> &'static str {
        match self {
            SortBy::Price => "lowest price",
            SortBy::Stops => "fewest stops",
            SortBy::EarliestArrival => "earliest arrival",
            SortBy::EarliestDeparture => "earliest departure",
            SortBy::Duration => "shortest duration",
        }
    }
}

/// Ranking policy, fixed for the lifetime of a monitoring task
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Preference {
    pub sort_by: SortBy,
    pub nonstop: bool,
}

impl fmt::Display for Preference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nonstop {
            write!(f, "nonstop first + {}", self.sort_by.label())
        } else {
            f.write_str(self.sort_by.label())
        }
    }
}

const NONSTOP_KEYWORDS: &[&str] = &["直飞", "nonstop", "non-stop", "direct"];

/// A keyword category mapping phrasing to a sort criterion
#[derive(Debug, Clone)]
pub struct PreferenceRule {
    pub sort_by: SortBy,
    pub keywords: &'static [&'static str],
    pub priority: i32,
}

/// Evaluates keyword rules in descending priority; the first matching rule wins.
pub struct PreferenceEngine {
    rules: Vec<PreferenceRule>,
}

impl PreferenceEngine {
    pub fn new(rules: Vec<PreferenceRule>) -> Self {
        let mut rules = rules;
        rules.sort_by_key(|r| -r.priority);
        Self { rules }
    }

    pub fn infer(&self, request_text: &str, query: &Query) -> Preference {
        let text = request_text.to_lowercase();

        let sort_by = self
            .rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| text.contains(k)))
            .map(|rule| rule.sort_by)
            .unwrap_or_default();

        let nonstop = query.nonstop || NONSTOP_KEYWORDS.iter().any(|k| text.contains(k));

        Preference { sort_by, nonstop }
    }
}

impl Default for PreferenceEngine {
    fn default() -> Self {
        Self::new(get_default_rules())
    }
}

/// Infer a preference with the default keyword rules
pub fn infer_preference(request_text: &str, query: &Query) -> Preference {
    PreferenceEngine::default().infer(request_text, query)
}

pub fn get_default_rules() -> Vec<PreferenceRule> {
    vec![
        PreferenceRule {
            sort_by: SortBy::Stops,
            keywords: &["转机最少", "stop最少", "少转机", "stops least", "fewest stops", "least stops"],
            priority: 100,
        },
        PreferenceRule {
            sort_by: SortBy::EarliestArrival,
            keywords: &["最早到", "早点到", "earliest arrival", "arrive earliest"],
            priority: 90,
        },
        PreferenceRule {
            sort_by: SortBy::EarliestDeparture,
            keywords: &["最早飞", "早点出发", "earliest departure", "depart earliest"],
            priority: 80,
        },
        PreferenceRule {
            sort_by: SortBy::Duration,
            keywords: &["最短", "时间最短", "飞行时间最短", "duration", "shortest"],
            priority: 70,
        },
        // Same as the default; listed so explicit phrasing is recognised
        PreferenceRule {
            sort_by: SortBy::Price,
            keywords: &["价格最低", "最便宜", "lowest price", "cheapest"],
            priority: 60,
        },
    ]
}
