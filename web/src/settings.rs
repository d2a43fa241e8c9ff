use chrono::Duration;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const PAGE_SIZE_MAXIMUM: u32 = 1000;

/// Request-independent settings the handlers and middleware read.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Serve plain HTTP without redirecting to HTTPS.
    pub allow_unencrypted_traffic: bool,
    pub public_host: String,
    pub page_size: u32,
    pub show_media_by_default: bool,
    /// Lifetime of a signed media link.
    pub media_token_ttl: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            allow_unencrypted_traffic: false,
            public_host: String::new(),
            page_size: DEFAULT_PAGE_SIZE,
            show_media_by_default: true,
            media_token_ttl: Duration::hours(1),
        }
    }
}

impl Settings {
    pub fn with_unencrypted_traffic(mut self, allow: bool) -> Self {
        self.allow_unencrypted_traffic = allow;
        self
    }
}
