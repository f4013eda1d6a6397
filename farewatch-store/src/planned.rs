use farewatch_core::Query;
use parking_lot::RwLock;
use std::collections::HashMap;

/// The last successfully planned query of a user, kept so `@poll` can reuse it
#[derive(Debug, Clone)]
pub struct PlannedQuery {
    pub query: Query,
    pub request_text: String,
}

#[derive(Default)]
pub struct PlannedQueryStore {
    planned: RwLock<HashMap<String, PlannedQuery>>,
}

impl PlannedQueryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember(&self, user_id: &str, query: Query, request_text: impl Into<String>) {
        self.planned
            .write()
            .insert(user_id.to_string(), PlannedQuery { query, request_text: request_text.into() });
    }

    pub fn last(&self, user_id: &str) -> Option<PlannedQuery> {
        self.planned.read().get(user_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_remember_replaces_previous() {
        let store = PlannedQueryStore::new();
        let date = NaiveDate::from_ymd_opt(2026, 3, 4).unwrap();
        assert!(store.last("u1").is_none());

        store.remember("u1", Query::new("SFO", "HND", date), "SFO to Tokyo");
        store.remember("u1", Query::new("SFO", "NRT", date), "SFO to Narita, nonstop");

        let last = store.last("u1").unwrap();
        assert_eq!(last.query.to, "NRT");
        assert_eq!(last.request_text, "SFO to Narita, nonstop");
        assert!(store.last("u2").is_none());
    }
}
