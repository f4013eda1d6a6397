pub mod app_config;
pub mod result_cache;
pub mod user_settings;
pub mod planned;

pub use app_config::Config;
pub use result_cache::{ResultCache, TtlCache};
pub use user_settings::{SettingsPatch, UserSettings, UserSettingsStore};
pub use planned::{PlannedQuery, PlannedQueryStore};
