use serde::{Serialize, Deserialize, Serializer};
use std::fmt;

/// A wrapper for credentials (API keys, client secrets) that masks its value in Debug and Display output.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Config dumps go through Serialize, so the secret never leaves as plain text.
        "********".serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl Masked<String> {
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_hides_value() {
        let secret = Masked("sk-live-123".to_string());
        assert_eq!(format!("{:?}", secret), "********");
        assert_eq!(format!("{}", secret), "********");
        assert_eq!(secret.expose(), "sk-live-123");
        assert_eq!(serde_json::to_string(&secret).unwrap(), "\"********\"");
    }

    #[test]
    fn test_masked_deserializes_transparently() {
        let secret: Masked<String> = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(secret.into_inner(), "abc");
        let blank: Masked<String> = serde_json::from_str("\"  \"").unwrap();
        assert!(blank.is_blank());
    }
}
