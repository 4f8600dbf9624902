use hnb_core::{domain::ChatKind, intent::Intent, messaging::types::TextMessage, Result};

use crate::router::AppState;

use super::{admit, audit_inbound, features, games, track, within_rate_limit, Ctx, Surface};

/// Free text with nothing pending: private chats always, groups only when the
/// bot is named or replied to.
pub(crate) fn addresses_bot(kind: ChatKind, text: &str, reply_to_bot: bool, bot_name: &str) -> bool {
    if kind.is_private() || reply_to_bot {
        return true;
    }
    let name = bot_name.trim().to_lowercase();
    !name.is_empty() && text.to_lowercase().contains(&name)
}

pub(super) async fn handle_text(state: &AppState, msg: TextMessage) -> Result<()> {
    let ctx = Ctx::new(msg.chat.clone(), msg.sender.clone());
    audit_inbound(state, &ctx, "text", &msg.text);
    track(state, &ctx).await;

    let pending = state.sessions.consume_intent(ctx.key()).await;

    if !admit(state, &ctx, Surface::Text).await? {
        return Ok(());
    }

    let Some(intent) = pending else {
        if !addresses_bot(ctx.chat.kind, &msg.text, msg.reply_to_bot, &state.cfg.bot_name) {
            return Ok(());
        }
        if !within_rate_limit(state, &ctx).await? {
            return Ok(());
        }
        return features::hinata(state, &ctx, &msg.text, false).await;
    };

    if !within_rate_limit(state, &ctx).await? {
        // Keep the follow-up for the next try.
        state.sessions.set_intent(ctx.key(), intent).await;
        return Ok(());
    }

    match intent {
        Intent::Feature(feature) => features::run(state, &ctx, feature, msg.text.trim()).await,
        Intent::Guess { secret, attempts } => {
            games::answer_guess(state, &ctx, secret, attempts, &msg.text).await
        }
        Intent::Riddle { answer } => games::answer_riddle(state, &ctx, &answer, &msg.text).await,
        Intent::Trivia { answer } => games::answer_trivia(state, &ctx, &answer, &msg.text).await,
    }
}
