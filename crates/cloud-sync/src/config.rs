//! Hosted document configuration.
//!
//! Credentials ship as placeholders; sync stays disabled until both the API
//! key and the bin id carry real values. A disabled configuration is a
//! supported mode, not an error, and the app runs local-only.

/// Default base URL of the document host.
pub const DEFAULT_BASE_URL: &str = "https://api.jsonbin.io/v3";

/// Placeholder API key value shipped in default builds.
pub const PLACEHOLDER_API_KEY: &str = "YOUR_JSONBIN_API_KEY";

/// Placeholder bin id value shipped in default builds.
pub const PLACEHOLDER_BIN_ID: &str = "YOUR_JSONBIN_BIN_ID";

/// Connection settings for the hosted shared document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudConfig {
    pub api_key: String,
    pub bin_id: String,
    pub base_url: String,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            api_key: PLACEHOLDER_API_KEY.to_string(),
            bin_id: PLACEHOLDER_BIN_ID.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl CloudConfig {
    pub fn new(
        api_key: impl Into<String>,
        bin_id: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            bin_id: bin_id.into(),
            base_url: base_url.into(),
        }
    }

    /// True when both credentials are present and not the shipped
    /// placeholders. Everything else means local-only mode.
    pub fn is_enabled(&self) -> bool {
        let api_key = self.api_key.trim();
        let bin_id = self.bin_id.trim();
        !api_key.is_empty()
            && !bin_id.is_empty()
            && api_key != PLACEHOLDER_API_KEY
            && bin_id != PLACEHOLDER_BIN_ID
    }
}
