//! Start screen, menu pages, help center and status commands.

use std::time::Instant;

use hnb_core::{
    actions::{CallbackAction, GameLaunch},
    domain::MessageRef,
    formatting::{escape_html, format_uptime},
    intent::{Feature, MenuPage},
    messaging::types::{InlineButton, InlineKeyboard},
    Result,
};

use crate::router::AppState;

use super::{
    render::{self, back_row},
    Ctx,
};

const HELP_HTML: &str = "✨ <b>Hinata Bot Help Center</b> ✨\n\n\
🤖 <b>AI Support:</b> Type <code>/help &lt;your question&gt;</code> for AI assistance!\n\n\
🛠 <b>Common Tools:</b>\n\
• <code>/ai &lt;prompt&gt;</code> - GPT-5 and Gemini side by side\n\
• <code>/imagine &lt;prompt&gt;</code> - AI Image Studio\n\
• <code>/tempmail</code> - Secure temp inbox\n\
• <code>/ttt</code> - Tic tac toe with a friend\n\
• <code>/commands</code> - Every command at a glance\n\n\
<i>Every feature also works without arguments: send the command and I will ask for the input.</i>";

const OWNER_HTML: &str = "👑 <b>Owner Dashboard</b>\n\n\
📊 <code>/stats</code> - Bot metrics\n\
⛔ <code>/gban &lt;id&gt;</code> · <code>/ungban &lt;id&gt;</code> - Global ban\n\
🔐 <code>/toggle_access</code> - Public or private mode\n\
📢 <code>/broadcastall &lt;msg&gt;</code> - Every user and group\n\
👤 <code>/broadcastuser &lt;id&gt; &lt;msg&gt;</code> - One user\n\
🏠 <code>/broadcast &lt;chat_id&gt; &lt;msg&gt;</code> - One chat\n\
🖼 <code>/broadcast_media [caption]</code> - Reply to a photo to send it to every group\n\
🧹 <code>/delbroadcast</code> - Delete broadcast messages\n\
🛡 <code>/ban|unban|mute|unmute|kick|addadmin &lt;chat_id&gt; &lt;user_id&gt;</code>\n\
📂 <code>/download_db</code> - Database backup\n\n\
<i>Every owner command also answers to an <code>s_</code> prefix, e.g. <code>/s_gban</code>.</i>";

fn welcome_html(first_name: &str) -> String {
    format!(
        "🌌 <b>GREETINGS FROM HINATA NEURAL HUB v3.0</b>\n\
────────────────────────\n\
👋 <b>Welcome back, {}!</b>\n\n\
I am <b>Hinata</b>, your elite AI companion. My systems are live, \
providing state-of-the-art neural engines, creative writing and utility matrices.\n\n\
💎 <b>CORE SYSTEMS:</b>\n\
├ 🤖 <b>AI Hub:</b> Gemini, DeepSeek, GPT-5, Copilot and more\n\
├ ✍️ <b>Writing:</b> Translate, Summarize, Poems, Stories\n\
├ 🛠 <b>Utility:</b> Shortener, Temp Mail, Web Screenshot\n\
└ 🕹 <b>Games:</b> Tic Tac Toe, Riddles, Trivia, Slots\n\n\
✨ <i>Select a quadrant below to initiate command:</i>",
        escape_html(first_name)
    )
}

fn home_keyboard(is_owner: bool) -> InlineKeyboard {
    let page = |label: &str, page| InlineButton::action(label, CallbackAction::Menu(page));
    let mut kb = InlineKeyboard::new(vec![
        vec![page("🤖 AI HUB", MenuPage::Ai), page("✍️ WRITING", MenuPage::Writing)],
        vec![page("🛠 UTILITY CORE", MenuPage::Tools), page("🕹 GAME SELECTOR", MenuPage::Games)],
        vec![
            InlineButton::action("📧 Temp Mail", CallbackAction::TempMailNew),
            InlineButton::action("❓ Help", CallbackAction::Help),
        ],
    ]);
    if is_owner {
        kb = kb.push_row(vec![page("👑 OWNER DASH", MenuPage::Owner)]);
    }
    kb
}

fn page_view(page: MenuPage) -> (String, InlineKeyboard) {
    let features = |page: MenuPage| -> Vec<InlineButton> {
        Feature::ALL
            .into_iter()
            .filter(|f| f.menu_page() == page)
            .map(|f| InlineButton::action(f.label(), CallbackAction::AskFeature(f)))
            .collect()
    };
    let (html, buttons) = match page {
        MenuPage::Ai => ("🤖 <b>AI Hub</b>\n\n👇 Pick an engine:", features(page)),
        MenuPage::Writing => ("✍️ <b>Writing Studio</b>\n\n👇 Pick a tool:", features(page)),
        MenuPage::Tools => ("🛠 <b>Utility Core</b>\n\n👇 Pick a tool:", features(page)),
        MenuPage::Games => (
            "🕹 <b>Game Selector</b>\n\n👇 Pick a game:",
            GameLaunch::ALL
                .into_iter()
                .map(|g| InlineButton::action(g.label(), CallbackAction::Game(g)))
                .collect(),
        ),
        MenuPage::Owner => (OWNER_HTML, Vec::new()),
        // Handled by `start`.
        MenuPage::Home => ("", Vec::new()),
    };
    (html.to_string(), InlineKeyboard::grid(buttons, 2).push_row(back_row()))
}

/// Send or (from a button) redraw a screen.
async fn show(
    state: &AppState,
    ctx: &Ctx,
    edit: Option<MessageRef>,
    html: &str,
    keyboard: InlineKeyboard,
) -> Result<()> {
    match edit {
        Some(msg) => state.messenger.edit_html(msg, html, Some(keyboard)).await,
        None => {
            state.messenger.send_keyboard(ctx.chat_id(), html, keyboard).await?;
            Ok(())
        }
    }
}

pub(super) async fn start(state: &AppState, ctx: &Ctx, edit: Option<MessageRef>) -> Result<()> {
    let html = welcome_html(&ctx.sender.first_name);
    show(state, ctx, edit, &html, home_keyboard(ctx.is_owner(state))).await
}

pub(super) async fn show_page(state: &AppState, ctx: &Ctx, msg: MessageRef, page: MenuPage) -> Result<()> {
    match page {
        MenuPage::Home => start(state, ctx, Some(msg)).await,
        MenuPage::Owner if !ctx.is_owner(state) => {
            tracing::debug!(user_id = ctx.sender.id.0, "owner page refused");
            start(state, ctx, Some(msg)).await
        }
        page => {
            let (html, kb) = page_view(page);
            show(state, ctx, Some(msg), &html, kb).await
        }
    }
}

pub(super) async fn help(state: &AppState, ctx: &Ctx, edit: Option<MessageRef>) -> Result<()> {
    let kb = InlineKeyboard::new(vec![back_row()]);
    show(state, ctx, edit, HELP_HTML, kb).await
}

pub(super) async fn alive(state: &AppState, ctx: &Ctx) -> Result<()> {
    let html = format!(
        "🌸 <b>{} Neural v3.0 is ALIVE</b> 🌸\n\n\
🛰 <b>Uptime:</b> <code>{}</code>\n\
📶 <b>System:</b> Operational 100%\n\
🧠 <b>Engines:</b> Gemini, DeepSeek, GPT-5\n\n\
✨ <i>Talk to me, I'm here for you!</i>",
        escape_html(&state.cfg.bot_name),
        format_uptime(state.started_at.elapsed())
    );
    show(state, ctx, None, &html, home_keyboard(ctx.is_owner(state))).await
}

pub(super) async fn command_list(state: &AppState, ctx: &Ctx) -> Result<()> {
    let html = render::command_list_html(super::COMMAND_MENU);
    show(state, ctx, None, &html, InlineKeyboard::new(vec![back_row()])).await
}

/// Round trip of one send, shown by editing that message.
pub(super) async fn ping(state: &AppState, ctx: &Ctx) -> Result<()> {
    let started = Instant::now();
    let msg = state
        .messenger
        .send_html(ctx.chat_id(), "🏓 <b>Pinging...</b>")
        .await?;
    let latency_ms = started.elapsed().as_millis();

    let username = state.me.username.as_deref().unwrap_or("unknown");
    let html = format!(
        "🏓 <b>System Status: Online</b>\n\n\
📶 <b>Latency:</b> <code>{latency_ms} ms</code>\n\
🛰 <b>Uptime:</b> <code>{}</code>\n\
🤖 <b>Username:</b> @{}\n\
🖥 <b>Server:</b> Active ✅",
        format_uptime(state.started_at.elapsed()),
        escape_html(username)
    );
    state
        .messenger
        .edit_html(msg, &html, Some(InlineKeyboard::new(vec![back_row()])))
        .await
}
