//! User-facing texts and the small parsing helpers the Telegram handlers need.

use crate::translator::REPO_URL;

pub const SLOW_DOWN: &str = "Eh slow down lah! You sending too many messages. Wait a while can?";
pub const SLOW_DOWN_ALERT: &str = "Eh slow down lah! Wait a while can?";
pub const THINKING: &str = "Wait ah, limpeh thinking how to translate... 🤔";
pub const EMPTY_MESSAGE: &str = "Eh bro, send me some text lah! Cannot translate empty message one!";
pub const CALLBACK_ACK: &str = "Translating...";
pub const TRANSLATE_BUTTON: &str = "🔄 Translate to Singlish";

pub const INLINE_EMPTY_TITLE: &str = "Enter text to translate";
pub const INLINE_EMPTY_DESCRIPTION: &str = "Type your message...";
pub const INLINE_EMPTY_CONTENT: &str = "Please enter some text to translate";
pub const INLINE_TITLE: &str = "Translate to Singlish";
pub const INLINE_ERROR_TITLE: &str = "❌ Error";
pub const INLINE_ERROR_DESCRIPTION: &str = "Try again later";
pub const INLINE_ERROR_CONTENT: &str = "System error! Try again later.";
pub const THUMBNAIL_URL: &str = "https://raw.githubusercontent.com/tengfone/limpeh_says/master/icon.jpeg";

const CALLBACK_PREFIX: &str = "translate:";
/// Telegram rejects callback data longer than this many bytes.
const MAX_CALLBACK_BYTES: usize = 64;

pub fn start_text(bot_username: &str) -> String {
    format!(
        "Hello! I am LimpehSays, a bot that converts text to Singlish.\n\n\
         You can:\n\
         1. Chat with me directly and I'll respond in Singlish\n\
         2. Mention me in a group chat (@{bot_username} text)\n   \
         ⚠️ Important: Grant me permission to read messages in groups!\n\
         3. Use me inline in any chat by typing @{bot_username} followed by text\n\n\
         Try saying something to me! 🇸🇬"
    )
}

pub fn help_text(bot_username: &str) -> String {
    format!(
        "LimpehSays Bot Help\n\n\
         I convert text to Singlish using AI. Here's how to use me:\n\n\
         1. Direct chat: Just send me any message and I'll respond in Singlish\n\
         2. In group chats: \n   \
         • Mention me with @{bot_username} Hello, how are you?\n   \
         • ⚠️ Important: Make sure to grant me permission to read messages in the group!\n\
         3. Inline mode: Type @{bot_username} in any chat, followed by your text\n\n\
         I have a rate limit to prevent spam. Please be patient if you hit the limit.\n\n\
         🔗 GitHub: {REPO_URL}"
    )
}

pub fn mention_usage(bot_username: &str) -> String {
    format!("Tell me what to translate lah! Just type @{bot_username} followed by your text.")
}

pub fn inline_prompt(query: &str) -> String {
    format!("🇬🇧 Text: {query}\n\n👇 Click below to translate!")
}

pub fn callback_translating(original: &str) -> String {
    format!("🇬🇧 Original: {original}\n\n🤔 Wait ah limpeh translating...")
}

pub fn callback_result(original: &str, translated: &str) -> String {
    format!("🇬🇧 Original: {original}\n🇸🇬 Singlish: {translated}")
}

/// Build the callback payload for the inline translate button.
///
/// The text is cut on a char boundary so the payload fits Telegram's limit.
pub fn callback_payload(text: &str) -> String {
    let budget = MAX_CALLBACK_BYTES - CALLBACK_PREFIX.len();
    let mut end = text.len().min(budget);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{CALLBACK_PREFIX}{}", &text[..end])
}

/// Text to translate from a callback payload, if it is a translate request.
pub fn parse_callback(data: &str) -> Option<&str> {
    data.strip_prefix(CALLBACK_PREFIX).filter(|text| !text.trim().is_empty())
}

pub fn is_mention_of(mention: &str, bot_username: &str) -> bool {
    mention
        .strip_prefix('@')
        .is_some_and(|name| name.eq_ignore_ascii_case(bot_username))
}

/// Text following a mention that starts at byte `mention_start`.
pub fn text_after_mention(text: &str, mention_start: usize) -> Option<&str> {
    let (_, rest) = text.get(mention_start..)?.split_once(' ')?;
    let rest = rest.trim();
    (!rest.is_empty()).then_some(rest)
}
