use hnb_core::{actions::CallbackAction, messaging::types::CallbackQuery, Result};

use crate::router::AppState;

use super::{ack, admit, audit_inbound, features, games, menus, track, Ctx, Surface};

/// Button presses. Every query is answered exactly once; tic-tac-toe answers
/// its own so rejections can show an alert.
pub(super) async fn handle_callback(state: &AppState, q: CallbackQuery) -> Result<()> {
    let (Some(chat), Some(msg)) = (q.chat.clone(), q.message) else {
        ack(state, &q.callback_id, None).await;
        return Ok(());
    };
    let ctx = Ctx::new(chat, q.sender.clone());
    audit_inbound(state, &ctx, "callback", &q.data);
    track(state, &ctx).await;

    if !admit(state, &ctx, Surface::Callback).await? {
        ack(state, &q.callback_id, None).await;
        return Ok(());
    }

    let Some(action) = q.action() else {
        tracing::debug!(data = %q.data, "unknown callback ignored");
        ack(state, &q.callback_id, None).await;
        return Ok(());
    };

    match action {
        CallbackAction::TttJoin => return games::ttt_join(state, &ctx, &q.callback_id, msg).await,
        CallbackAction::TttMove(cell) => {
            return games::ttt_move(state, &ctx, &q.callback_id, msg, cell).await
        }
        CallbackAction::StylePick(index) => {
            return features::style_pick(state, &ctx, &q.callback_id, index).await
        }
        _ => ack(state, &q.callback_id, None).await,
    }

    match action {
        CallbackAction::Menu(page) => menus::show_page(state, &ctx, msg, page).await,
        CallbackAction::Help => menus::help(state, &ctx, Some(msg)).await,
        CallbackAction::AskFeature(feature) => features::ask(state, &ctx, feature, Some(msg)).await,
        CallbackAction::Game(game) => games::launch(state, &ctx, game).await,
        CallbackAction::Rps(hand) => games::rps_pick(state, msg, hand).await,
        CallbackAction::Tod(mode) => games::tod_pick(state, msg, mode).await,
        CallbackAction::ImageRatio(ratio) => features::generate_image(state, &ctx, msg, ratio).await,
        CallbackAction::TempMailRefresh => features::temp_mail_refresh(state, &ctx, msg).await,
        CallbackAction::TempMailNew => features::temp_mail_create(state, &ctx).await,
        CallbackAction::TempMailClose => features::temp_mail_close(state, &ctx, msg).await,
        CallbackAction::TttJoin | CallbackAction::TttMove(_) | CallbackAction::StylePick(_) => Ok(()),
    }
}
