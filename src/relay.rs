//! Rate check followed by translation, shared by every Telegram entry point.

use tracing::info;

use crate::config::Config;
use crate::rate_limit::RateLimiter;
use crate::translator::TranslationClient;

pub struct Relay {
    limiter: RateLimiter,
    translator: TranslationClient,
}

impl Relay {
    pub fn new(limiter: RateLimiter, translator: TranslationClient) -> Self {
        Self { limiter, translator }
    }

    pub fn from_config(config: &Config) -> Self {
        let limiter = RateLimiter::new(config.rate_limit);
        let translator = TranslationClient::new(
            config.openrouter_api_key.clone(),
            config.openrouter_api_url.clone(),
            config.model_tier,
        );
        Self::new(limiter, translator)
    }

    /// Record a request for `user_id`. Returns false if the user must slow down.
    pub fn admit(&self, user_id: u64) -> bool {
        if self.limiter.is_rate_limited(&user_id) {
            info!("Rate limited user {user_id}");
            return false;
        }
        true
    }

    pub async fn translate(&self, text: &str) -> String {
        self.translator.translate(text).await
    }

    /// True once the free model has failed and the paid model is in use.
    pub fn is_downgraded(&self) -> bool {
        self.translator.is_downgraded()
    }
}
