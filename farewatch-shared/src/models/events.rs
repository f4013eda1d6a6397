use uuid::Uuid;

/// Why a monitoring cycle decided to tell the user something.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// First completed cycle of a task, reported unconditionally.
    FirstResult,
    /// A later cycle found a different and strictly better best offer.
    Improved,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::FirstResult => "first_result",
            NotificationKind::Improved => "improved",
        }
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct UserNotification {
    pub user_id: String,
    pub task_id: Uuid,
    pub kind: NotificationKind,
    pub text: String,
    pub sent_at: i64,
}

impl UserNotification {
    pub fn new(user_id: &str, task_id: Uuid, kind: NotificationKind, text: String) -> Self {
        Self {
            user_id: user_id.to_string(),
            task_id,
            kind,
            text,
            sent_at: chrono::Utc::now().timestamp(),
        }
    }
}
