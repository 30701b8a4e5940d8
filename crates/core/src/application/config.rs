use serde::{Deserialize, Serialize};

/// The `[application]` configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Ask the operator before every submission.
    #[serde(default)]
    pub pause_before_submit: bool,

    /// Enables `manual_pause_timeout_secs`.
    #[serde(default)]
    pub safe_mode: bool,

    /// In safe mode, discard a paused application after this long.
    #[serde(default)]
    pub manual_pause_timeout_secs: Option<u64>,

    /// Forms with more pages than this are treated as broken.
    #[serde(default = "default_max_form_pages")]
    pub max_form_pages: u32,

    /// Leave fields the board already filled in untouched.
    #[serde(default = "default_skip_prefilled")]
    pub skip_prefilled: bool,
}

fn default_max_form_pages() -> u32 {
    10
}

fn default_skip_prefilled() -> bool {
    true
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            pause_before_submit: false,
            safe_mode: false,
            manual_pause_timeout_secs: None,
            max_form_pages: default_max_form_pages(),
            skip_prefilled: default_skip_prefilled(),
        }
    }
}

impl ApplicationConfig {
    /// Effective operator timeout, if any.
    pub fn pause_timeout(&self) -> Option<std::time::Duration> {
        if !self.safe_mode {
            return None;
        }
        self.manual_pause_timeout_secs
            .map(std::time::Duration::from_secs)
    }
}
