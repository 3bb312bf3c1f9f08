//! Telegram update handlers.

use std::sync::Arc;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQuery, ChatAction, InlineKeyboardButton, InlineKeyboardMarkup, InlineQuery, InlineQueryResult, InlineQueryResultArticle,
    InputMessageContent, InputMessageContentText, Me, MessageEntityKind, ReplyParameters,
};
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};

use limpeh_says::relay::Relay;
use limpeh_says::replies;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "LimpehSays commands:")]
pub enum Command {
    #[command(description = "say hello")]
    Start,
    #[command(description = "show how to use the bot")]
    Help,
}

pub fn schema() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .branch(dptree::entry().filter_command::<Command>().endpoint(handle_command))
                .branch(dptree::filter(|msg: Message| msg.chat.is_private()).endpoint(handle_direct_message))
                .branch(
                    dptree::filter(|msg: Message| msg.chat.is_group() || msg.chat.is_supergroup())
                        .endpoint(handle_group_message),
                ),
        )
        .branch(Update::filter_inline_query().endpoint(handle_inline_query))
        .branch(Update::filter_callback_query().endpoint(handle_callback_query))
}

async fn handle_command(bot: Bot, msg: Message, cmd: Command, me: Me) -> ResponseResult<()> {
    let text = match cmd {
        Command::Start => replies::start_text(me.username()),
        Command::Help => replies::help_text(me.username()),
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

async fn handle_direct_message(bot: Bot, msg: Message, relay: Arc<Relay>) -> ResponseResult<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    let Some(text) = msg.text() else {
        info!("Received non-text direct message from user {}", user.id);
        bot.send_message(msg.chat.id, replies::EMPTY_MESSAGE).await?;
        return Ok(());
    };

    info!("Received direct message from user {}: {}", user.id, preview(text));

    // Unknown commands
    if text.starts_with('/') {
        return Ok(());
    }

    relay_and_reply(&bot, &msg, user.id, text, &relay).await
}

async fn handle_group_message(bot: Bot, msg: Message, me: Me, relay: Arc<Relay>) -> ResponseResult<()> {
    let (Some(user), Some(text)) = (msg.from.as_ref(), msg.text()) else {
        return Ok(());
    };

    let mention_start = msg.parse_entities().and_then(|entities| {
        entities
            .iter()
            .find(|e| matches!(e.kind(), MessageEntityKind::Mention) && replies::is_mention_of(e.text(), me.username()))
            .map(|e| e.start())
    });
    let Some(mention_start) = mention_start else {
        return Ok(());
    };

    let Some(request) = replies::text_after_mention(text, mention_start) else {
        bot.send_message(msg.chat.id, replies::mention_usage(me.username()))
            .reply_parameters(ReplyParameters::new(msg.id))
            .await?;
        return Ok(());
    };

    info!("Mentioned by user {} in chat {}: {}", user.id, msg.chat.id, preview(request));
    relay_and_reply(&bot, &msg, user.id, request, &relay).await
}

async fn relay_and_reply(bot: &Bot, msg: &Message, user_id: UserId, text: &str, relay: &Relay) -> ResponseResult<()> {
    let reply_to = ReplyParameters::new(msg.id);

    if !relay.admit(user_id.0) {
        bot.send_message(msg.chat.id, replies::SLOW_DOWN)
            .reply_parameters(reply_to)
            .await?;
        return Ok(());
    }

    let placeholder = bot
        .send_message(msg.chat.id, replies::THINKING)
        .reply_parameters(reply_to.clone())
        .await?;
    if let Err(e) = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await {
        warn!("Failed to send typing action: {e}");
    }

    let translated = relay.translate(text).await;
    info!("Translated for user {}: {} -> {}", user_id, preview(text), preview(&translated));

    if let Err(e) = bot.delete_message(msg.chat.id, placeholder.id).await {
        warn!("Failed to delete placeholder: {e}");
    }
    bot.send_message(msg.chat.id, translated)
        .reply_parameters(reply_to)
        .await?;
    Ok(())
}

async fn handle_inline_query(bot: Bot, q: InlineQuery) -> ResponseResult<()> {
    let query = q.query.trim();
    info!("Received inline query from user {}: {:?}", q.from.id, preview(query));

    let result = if query.is_empty() {
        article(
            "empty",
            replies::INLINE_EMPTY_TITLE,
            replies::INLINE_EMPTY_DESCRIPTION,
            replies::INLINE_EMPTY_CONTENT.to_string(),
        )
    } else {
        let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
            replies::TRANSLATE_BUTTON,
            replies::callback_payload(query),
        )]]);
        article("translate_option", replies::INLINE_TITLE, query, replies::inline_prompt(query)).reply_markup(keyboard)
    };

    let answer = bot
        .answer_inline_query(q.id.clone(), vec![InlineQueryResult::Article(result)])
        .cache_time(0)
        .await;

    if let Err(e) = answer {
        error!("Error answering inline query: {e}");
        let fallback = article(
            "error",
            replies::INLINE_ERROR_TITLE,
            replies::INLINE_ERROR_DESCRIPTION,
            replies::INLINE_ERROR_CONTENT.to_string(),
        );
        bot.answer_inline_query(q.id, vec![InlineQueryResult::Article(fallback)])
            .cache_time(0)
            .await?;
    }
    Ok(())
}

fn article(id: &str, title: &str, description: &str, content: String) -> InlineQueryResultArticle {
    let article = InlineQueryResultArticle::new(
        id,
        title,
        InputMessageContent::Text(InputMessageContentText::new(content)),
    )
    .description(description);

    match reqwest::Url::parse(replies::THUMBNAIL_URL) {
        Ok(url) => article.thumbnail_url(url),
        Err(_) => article,
    }
}

async fn handle_callback_query(bot: Bot, q: CallbackQuery, relay: Arc<Relay>) -> ResponseResult<()> {
    info!("Received callback query from user {}: {:?}", q.from.id, q.data);

    let Some(text) = q.data.as_deref().and_then(replies::parse_callback) else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    if !relay.admit(q.from.id.0) {
        bot.answer_callback_query(q.id.clone())
            .text(replies::SLOW_DOWN_ALERT)
            .show_alert(true)
            .await?;
        return Ok(());
    }

    bot.answer_callback_query(q.id.clone()).text(replies::CALLBACK_ACK).await?;
    edit_callback_message(&bot, &q, replies::callback_translating(text)).await?;

    let translated = relay.translate(text).await;
    info!("Translated callback for user {}: {} -> {}", q.from.id, preview(text), preview(&translated));

    edit_callback_message(&bot, &q, replies::callback_result(text, &translated)).await
}

/// Edit the message carrying the button, whether it was sent inline or to a chat.
async fn edit_callback_message(bot: &Bot, q: &CallbackQuery, text: String) -> ResponseResult<()> {
    if let Some(ref inline_id) = q.inline_message_id {
        bot.edit_message_text_inline(inline_id.clone(), text).await?;
    } else if let Some(msg) = q.message.as_ref() {
        bot.edit_message_text(msg.chat().id, msg.id(), text).await?;
    } else {
        warn!("Callback query {:?} has no editable message", q.id);
    }
    Ok(())
}

fn preview(text: &str) -> String {
    text.chars().take(100).collect()
}
