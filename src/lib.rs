//! LimpehSays: a Telegram bot that rewrites messages into Singlish.

pub mod config;
pub mod logging;
pub mod rate_limit;
pub mod relay;
pub mod replies;
pub mod translator;
