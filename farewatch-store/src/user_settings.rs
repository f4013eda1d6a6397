use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-user chat settings: which extractor backend and model to plan with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub provider: Option<String>,
    pub model: Option<String>,
}

pub struct UserSettingsStore {
    defaults: UserSettings,
    settings: RwLock<HashMap<String, UserSettings>>,
}

impl UserSettingsStore {
    pub fn new(defaults: UserSettings) -> Self {
        Self { defaults, settings: RwLock::new(HashMap::new()) }
    }

    /// Settings for `user_id`, materialising the defaults on first access
    pub fn get(&self, user_id: &str) -> UserSettings {
        if let Some(existing) = self.settings.read().get(user_id) {
            return existing.clone();
        }
        self.settings
            .write()
            .entry(user_id.to_string())
            .or_insert_with(|| self.defaults.clone())
            .clone()
    }

    pub fn update(&self, user_id: &str, patch: SettingsPatch) -> UserSettings {
        let mut settings = self.settings.write();
        let current = settings.entry(user_id.to_string()).or_insert_with(|| self.defaults.clone());
        if let Some(provider) = patch.provider {
            current.provider = provider;
        }
        if let Some(model) = patch.model {
            current.model = model;
        }
        current.clone()
    }
}
