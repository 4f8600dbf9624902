//! Game launches, follow-up answers and the tic-tac-toe board.
//!
//! Randomness is drawn into a local before any await: `ThreadRng` must not be
//! held across suspension points.

use hnb_core::{
    actions::GameLaunch,
    domain::MessageRef,
    game::{
        minigames::{
            answer_matches, coin_flip, judge_guess, local_riddle, new_guess, parse_riddle,
            parse_trivia, random_hand, riddle_prompt, rps_summary_html, slot_html, spin_slots,
            trivia_matches, trivia_prompt, Hand, TodMode, GUESS_INTRO_HTML,
        },
        MoveResult, Played,
    },
    intent::Intent,
    Result,
};
use hnb_upstream::Engine;

use crate::router::AppState;

use super::{ack, render, Ctx};

pub(super) async fn launch(state: &AppState, ctx: &Ctx, game: GameLaunch) -> Result<()> {
    tracing::debug!(game = game.slug(), user_id = ctx.sender.id.0, "game launched");
    let chat = ctx.chat_id();
    match game {
        GameLaunch::Guess => {
            let intent = new_guess(&mut rand::thread_rng());
            state.sessions.set_intent(ctx.key(), intent).await;
            state.messenger.send_html(chat, GUESS_INTRO_HTML).await?;
        }
        GameLaunch::Riddle => riddle(state, ctx).await?,
        GameLaunch::Trivia => trivia(state, ctx).await?,
        GameLaunch::Rps => {
            state
                .messenger
                .send_keyboard(chat, render::RPS_INTRO_HTML, render::rps_keyboard())
                .await?;
        }
        GameLaunch::TruthOrDare => {
            state
                .messenger
                .send_keyboard(chat, render::TOD_INTRO_HTML, render::tod_keyboard())
                .await?;
        }
        GameLaunch::Slot => {
            let reels = spin_slots(&mut rand::thread_rng());
            state
                .messenger
                .send_keyboard(chat, &slot_html(reels), render::slot_again())
                .await?;
        }
        GameLaunch::Coin => {
            let side = coin_flip(&mut rand::thread_rng());
            let (html, kb) = render::coin_view(side);
            state.messenger.send_keyboard(chat, &html, kb).await?;
        }
        GameLaunch::TicTacToe => {
            let player = ctx.player();
            let lobby = state
                .messenger
                .send_keyboard(chat, &render::ttt_lobby_html(&player.name), render::ttt_join_keyboard())
                .await?;
            state.games.create(lobby, player).await;
        }
    }
    Ok(())
}

/// Ask the AI for a fresh riddle; the local pool covers any failure.
async fn riddle(state: &AppState, ctx: &Ctx) -> Result<()> {
    let placeholder = state
        .messenger
        .send_html(ctx.chat_id(), "🧩 <i>Summoning a riddle...</i>")
        .await?;

    let prompt = riddle_prompt(&mut rand::thread_rng());
    let generated = match state.upstream.chat(Engine::ChatGpt, &prompt).await {
        Ok(reply) => parse_riddle(&reply),
        Err(e) => {
            tracing::warn!("riddle generation failed: {e}");
            None
        }
    };
    let riddle = match generated {
        Some(r) => r,
        None => local_riddle(&mut rand::thread_rng()),
    };

    state
        .sessions
        .set_intent(
            ctx.key(),
            Intent::Riddle {
                answer: riddle.answer.clone(),
            },
        )
        .await;
    let (html, kb) = render::riddle_view(&riddle);
    state.messenger.edit_html(placeholder, &html, Some(kb)).await
}

async fn trivia(state: &AppState, ctx: &Ctx) -> Result<()> {
    let placeholder = state
        .messenger
        .send_html(ctx.chat_id(), "🧠 <i>Preparing a trivia question...</i>")
        .await?;

    let (difficulty, prompt) = trivia_prompt(&mut rand::thread_rng());
    let question = match state.upstream.chat(Engine::ChatGpt, &prompt).await {
        Ok(reply) => parse_trivia(&reply),
        Err(e) => {
            tracing::warn!("trivia generation failed: {e}");
            None
        }
    };
    let Some(question) = question else {
        return state
            .messenger
            .edit_html(
                placeholder,
                "⚠️ <b>Trivia is unavailable right now.</b> Try again in a moment.",
                None,
            )
            .await;
    };

    state
        .sessions
        .set_intent(
            ctx.key(),
            Intent::Trivia {
                answer: question.answer.clone(),
            },
        )
        .await;
    let (html, kb) = render::trivia_view(difficulty, &question.question);
    state.messenger.edit_html(placeholder, &html, Some(kb)).await
}

pub(super) async fn answer_guess(
    state: &AppState,
    ctx: &Ctx,
    secret: u32,
    attempts: u32,
    text: &str,
) -> Result<()> {
    let outcome = judge_guess(secret, attempts, text);
    if let Some(next) = outcome.next_intent() {
        state.sessions.set_intent(ctx.key(), next).await;
    }
    state
        .messenger
        .send_html(ctx.chat_id(), &outcome.reply_html())
        .await?;
    Ok(())
}

pub(super) async fn answer_riddle(state: &AppState, ctx: &Ctx, answer: &str, text: &str) -> Result<()> {
    let (html, kb) = render::riddle_verdict(answer_matches(text, answer), answer);
    state.messenger.send_keyboard(ctx.chat_id(), &html, kb).await?;
    Ok(())
}

pub(super) async fn answer_trivia(state: &AppState, ctx: &Ctx, answer: &str, text: &str) -> Result<()> {
    let (html, kb) = render::trivia_verdict(trivia_matches(text, answer), answer);
    state.messenger.send_keyboard(ctx.chat_id(), &html, kb).await?;
    Ok(())
}

/// Second player joins the lobby hosted by `board`.
pub(super) async fn ttt_join(state: &AppState, ctx: &Ctx, callback_id: &str, board: MessageRef) -> Result<()> {
    let game = match state.games.join(board, ctx.player()).await {
        Ok(game) => game,
        Err(rejection) => {
            ack(state, callback_id, Some(rejection.message())).await;
            return Ok(());
        }
    };
    ack(state, callback_id, None).await;
    state
        .messenger
        .edit_html(
            board,
            &render::ttt_turn_html(&game),
            Some(render::ttt_board_keyboard(&game.board)),
        )
        .await
}

pub(super) async fn ttt_move(
    state: &AppState,
    ctx: &Ctx,
    callback_id: &str,
    board: MessageRef,
    cell: u8,
) -> Result<()> {
    let Played { game, outcome } = match state.games.play(board, ctx.sender.id, usize::from(cell)).await {
        Ok(played) => played,
        Err(rejection) => {
            ack(state, callback_id, Some(rejection.message())).await;
            return Ok(());
        }
    };
    ack(state, callback_id, None).await;

    let (html, keyboard) = match outcome {
        MoveResult::Won { winner, loser, mark } => {
            tracing::info!(winner = winner.id.0, "tic-tac-toe won");
            (
                render::ttt_won_html(&game.board, &winner.name, &loser.name, mark.symbol()),
                None,
            )
        }
        MoveResult::Draw => (render::ttt_draw_html(&game.board), None),
        MoveResult::Continue => (
            render::ttt_turn_html(&game),
            Some(render::ttt_board_keyboard(&game.board)),
        ),
    };
    state.messenger.edit_html(board, &html, keyboard).await
}

pub(super) async fn rps_pick(state: &AppState, msg: MessageRef, hand: Hand) -> Result<()> {
    let bot = random_hand(&mut rand::thread_rng());
    let html = rps_summary_html(hand, bot, &state.cfg.bot_name);
    state.messenger.edit_html(msg, &html, Some(render::rps_again())).await
}

pub(super) async fn tod_pick(state: &AppState, msg: MessageRef, mode: TodMode) -> Result<()> {
    state
        .messenger
        .edit_html(msg, &format!("🎲 <i>Picking a {}...</i>", mode.slug()), None)
        .await?;
    let html = match state.upstream.chat(Engine::ChatGpt, &mode.prompt()).await {
        Ok(body) => render::tod_html(mode, &body),
        Err(e) => e.user_html(),
    };
    state
        .messenger
        .edit_html(msg, &html, Some(render::tod_keyboard()))
        .await
}

#[cfg(test)]
mod tests {
    use hnb_core::{
        domain::{ChatId, MessageId, MessageRef},
        intent::Intent,
        messaging::recording::Sent,
    };

    use crate::handlers::test_support::*;

    // The lobby is the first message of the test; the recording messenger numbers from 100.
    const LOBBY: MessageRef = MessageRef {
        chat_id: ChatId(-100),
        message_id: MessageId(100),
    };

    #[tokio::test]
    async fn tic_tac_toe_from_lobby_to_win() {
        let h = Harness::new().await;
        let chat = group_chat(-100);
        let (ann, bob) = (user(10, "Ann"), user(20, "Bob"));

        h.command(&chat, &ann, "/ttt").await;
        let board = LOBBY;

        h.press(&chat, &ann, board, "ttt:join").await;
        h.press(&chat, &bob, board, "ttt:join").await;
        for (who, cell) in [(&ann, 0), (&bob, 3), (&ann, 1), (&bob, 4)] {
            h.press(&chat, who, board, &format!("ttt:move:{cell}")).await;
        }
        // Out of turn.
        h.press(&chat, &bob, board, "ttt:move:8").await;
        h.press(&chat, &ann, board, "ttt:move:2").await;

        let sent = h.messenger.sent();
        assert!(sent.contains(&Sent::CallbackAnswer {
            id: "cb-ttt:join".into(),
            text: Some("⚠️ You created this game!".into()),
            alert: true,
        }));
        assert!(sent.contains(&Sent::CallbackAnswer {
            id: "cb-ttt:move:8".into(),
            text: Some("🚫 It's not your turn!".into()),
            alert: true,
        }));
        match h.messenger.last() {
            Some(Sent::Edit { html, keyboard, .. }) => {
                assert!(html.contains("🏆 <b>Winner:</b> Ann (❌)"), "{html}");
                assert!(keyboard.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(h.state.games.get(board).await.is_none());
    }

    #[tokio::test]
    async fn players_are_shown_by_full_name() {
        let h = Harness::new().await;
        let chat = group_chat(-100);
        let mut ann = user(10, "Ann");
        ann.full_name = "Ann Lee".to_string();
        let bob = user(20, "Bob");

        h.command(&chat, &ann, "/ttt").await;
        h.press(&chat, &bob, LOBBY, "ttt:join").await;

        let game = h.state.games.get(LOBBY).await.expect("game");
        assert_eq!(game.player_one.name, "Ann Lee");
        match h.messenger.last() {
            Some(Sent::Edit { html, .. }) => assert!(html.contains("Ann Lee"), "{html}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn trivia_arms_its_answer() {
        let h = Harness::new().await;
        h.chatgpt_replies("QUESTION: Largest planet? ANSWER: Jupiter.").await;
        let chat = private_chat(10);
        let ann = user(10, "Ann");

        h.command(&chat, &ann, "/trivia").await;
        h.text(&chat, &ann, "I think jupiter").await;

        let texts = h.messenger.texts();
        assert!(texts[1].contains("<i>Largest planet?</i>"), "{}", texts[1]);
        assert!(texts[2].starts_with("🎉 <b>Correct!</b>"), "{}", texts[2]);
    }

    #[tokio::test]
    async fn riddle_falls_back_to_local_pool() {
        let h = Harness::new().await;
        h.chatgpt_replies("no riddle here").await;
        let chat = private_chat(10);
        let ann = user(10, "Ann");

        h.command(&chat, &ann, "/riddle").await;

        assert!(h.messenger.texts()[1].starts_with("🧩 <b>Classic Riddle Challenge</b>"));
        assert!(matches!(
            h.state.sessions.peek_intent(h.key(&chat, &ann)).await,
            Some(Intent::Riddle { .. })
        ));
    }
}
