use hnb_core::{
    actions::GameLaunch, intent::Feature, messaging::types::CommandMessage, Result,
};

use crate::router::AppState;

use super::{
    admit, audit_inbound, features, games, menus, owner::OwnerCommand, track, within_rate_limit,
    Ctx, Surface,
};

/// Public commands registered with Telegram at startup.
pub const COMMAND_MENU: &[(&str, &str)] = &[
    ("start", "Open the main menu"),
    ("help", "Help center, or ask Hinata a question"),
    ("alive", "Uptime and status"),
    ("ping", "Latency check"),
    ("commands", "Every command at a glance"),
    ("ai", "GPT-5 and Gemini side by side"),
    ("gemini", "Gemini 3 Pro"),
    ("deepseek", "DeepSeek reasoning"),
    ("chatgpt", "GPT-5 Ultra"),
    ("copilot", "Think deeper with Copilot"),
    ("dolphin", "Dolphin unrestricted"),
    ("mistral", "Mistral 3.1"),
    ("granite", "Granite 4.0"),
    ("llama4", "Llama 4"),
    ("hinata", "Talk to Hinata"),
    ("zerotwo", "Talk to Zero Two"),
    ("flirt", "Flirty replies"),
    ("code", "Code assistant"),
    ("translate", "Translate to English"),
    ("summarize", "Summarize text"),
    ("grammar", "Fix grammar"),
    ("lyrics", "Find song lyrics"),
    ("write", "Creative writing"),
    ("ask", "Ask a question"),
    ("bio", "Generate a bio"),
    ("poem", "Write a poem"),
    ("story", "Write a story"),
    ("advice", "Life advice"),
    ("roast", "Brutal roast"),
    ("joke", "Tell a joke"),
    ("detector", "Detect AI-written text"),
    ("shorten", "Shorten a URL"),
    ("email", "Send an anonymous email"),
    ("webss", "Screenshot a website"),
    ("webzip", "Download a website as zip"),
    ("pinterest", "Search Pinterest images"),
    ("ytsearch", "Search YouTube"),
    ("ttstalk", "TikTok profile lookup"),
    ("ff", "Free Fire player lookup"),
    ("visit", "Send Free Fire profile visits"),
    ("insta", "Instagram profile lookup"),
    ("styletext", "Fancy text styles"),
    ("userinfo", "Telegram profile of a user"),
    ("keeper", "Add a URL to the uptime keeper"),
    ("unkeeper", "Remove a URL from the uptime keeper"),
    ("imagine", "Generate an image"),
    ("tempmail", "Temporary mailbox"),
    ("ttt", "Tic tac toe for two"),
    ("guess", "Number guessing game"),
    ("riddle", "Riddle challenge"),
    ("trivia", "Trivia challenge"),
    ("rps", "Rock paper scissors"),
    ("coin", "Flip a coin"),
    ("slot", "Slot machine"),
    ("dice", "Roll a dice"),
    ("tod", "Truth or dare"),
];

fn game_for_command(name: &str) -> Option<GameLaunch> {
    Some(match name {
        "ttt" | "tictactoe" => GameLaunch::TicTacToe,
        "guess" => GameLaunch::Guess,
        "riddle" => GameLaunch::Riddle,
        "trivia" => GameLaunch::Trivia,
        "rps" => GameLaunch::Rps,
        "coin" => GameLaunch::Coin,
        "slot" => GameLaunch::Slot,
        "tod" | "truthordare" => GameLaunch::TruthOrDare,
        _ => return None,
    })
}

pub(super) async fn handle_command(state: &AppState, cmd: CommandMessage) -> Result<()> {
    let ctx = Ctx::new(cmd.chat.clone(), cmd.sender.clone());
    audit_inbound(state, &ctx, "command", &format!("/{} {}", cmd.name, cmd.args));
    track(state, &ctx).await;

    // Any command abandons whatever follow-up was pending.
    state.sessions.clear_all(ctx.key()).await;

    if !admit(state, &ctx, Surface::Command).await? {
        return Ok(());
    }

    if let Some(owner_cmd) = OwnerCommand::parse(&cmd.name) {
        if !ctx.is_owner(state) {
            tracing::debug!(user_id = ctx.sender.id.0, command = %cmd.name, "owner command ignored");
            return Ok(());
        }
        return super::owner::handle(state, &ctx, owner_cmd, &cmd.args, cmd.reply_to.as_ref())
            .await;
    }

    if !within_rate_limit(state, &ctx).await? {
        return Ok(());
    }

    let args = cmd.args.trim();
    match cmd.name.as_str() {
        "start" => menus::start(state, &ctx, None).await,
        "help" if args.is_empty() => menus::help(state, &ctx, None).await,
        "help" => features::help_answer(state, &ctx, args).await,
        "alive" => menus::alive(state, &ctx).await,
        "ping" => menus::ping(state, &ctx).await,
        "commands" => menus::command_list(state, &ctx).await,
        "userinfo" | "id" => features::user_info(state, &ctx, args, cmd.reply_to.as_ref()).await,
        "dice" => {
            state.messenger.send_dice(ctx.chat_id()).await?;
            Ok(())
        }
        "ai" if args.is_empty() => {
            state
                .messenger
                .send_html(ctx.chat_id(), "💡 Usage: <code>/ai &lt;prompt&gt;</code>")
                .await?;
            Ok(())
        }
        "ai" => features::compare(state, &ctx, args).await,
        "tempmail" => features::temp_mail_create(state, &ctx).await,
        name => {
            if let Some(game) = game_for_command(name) {
                return games::launch(state, &ctx, game).await;
            }
            match Feature::from_command(name) {
                Some(feature) if args.is_empty() => features::ask(state, &ctx, feature, None).await,
                Some(feature) => features::run(state, &ctx, feature, args).await,
                None => {
                    tracing::debug!(command = name, "unknown command ignored");
                    Ok(())
                }
            }
        }
    }
}
