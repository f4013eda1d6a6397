use regex::{Captures, Regex};

/// Cleans chat input before it reaches the query planner
pub struct TextNormalizer {
    zero_width: Regex,
    odd_spaces: Regex,
    whitespace: Regex,
    airport_code: Regex,
}

impl TextNormalizer {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            zero_width: Regex::new(r"[\x{200B}-\x{200D}\x{FEFF}]")?,
            odd_spaces: Regex::new(r"[\x{00A0}\x{1680}\x{2000}-\x{200A}\x{202F}\x{205F}\x{3000}]")?,
            whitespace: Regex::new(r"\s+")?,
            // ASCII boundaries, so codes glued to CJK text still match
            airport_code: Regex::new(r"(?-u:\b)([a-z]{3})(?-u:\b)")?,
        })
    }

    /// Unify line endings and spacing, drop zero-width characters, and upper-case
    /// three-letter lowercase tokens so airport codes read as codes.
    pub fn normalize(&self, text: &str) -> String {
        let text = text.replace("\r\n", "\n");
        let text = self.zero_width.replace_all(&text, "");
        let text = self.odd_spaces.replace_all(&text, " ");
        let text = self.whitespace.replace_all(&text, " ");
        self.airport_code
            .replace_all(text.trim(), |caps: &Captures| caps[1].to_ascii_uppercase())
            .into_owned()
    }
}
