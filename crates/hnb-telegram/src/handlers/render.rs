//! HTML bodies and keyboards for replies. Pure functions, no I/O.

use hnb_core::{
    actions::{AspectRatio, CallbackAction, GameLaunch},
    formatting::{escape_html, thousands, truncate_chars},
    game::{minigames::{Hand, Riddle, TodMode}, Board, Cell, TicTacToe},
    messaging::types::{InlineButton, InlineKeyboard, UserProfile},
    session::TempMailAccount,
};
use hnb_upstream::{
    lookups::{DetectorReport, FreeFireProfile, InstaProfile, TikTokProfile, VideoHit, VisitReport},
    shortener::{ShortLink, Shortened},
    tempmail::MailMessage,
};

const RULE: &str = "───────────────────";

pub(crate) fn back_row() -> Vec<InlineButton> {
    vec![InlineButton::action(
        "🔙 Back",
        CallbackAction::Menu(hnb_core::intent::MenuPage::Home),
    )]
}

fn again(label: &str, game: GameLaunch) -> InlineKeyboard {
    InlineKeyboard::new(vec![vec![InlineButton::action(
        label,
        CallbackAction::Game(game),
    )]])
}

// ============== AI replies ==============

pub(crate) fn thinking_html(title_html: &str) -> String {
    format!("{title_html}\n\n<i>⏳ Thinking...</i>")
}

pub(crate) fn titled_html(title_html: &str, body: &str) -> String {
    format!("{title_html}\n\n{}", escape_html(body.trim()))
}

pub(crate) fn compare_html(
    gpt: &hnb_core::Result<String>,
    gemini: &hnb_core::Result<String>,
) -> String {
    let side = |r: &hnb_core::Result<String>| match r {
        Ok(text) => escape_html(text.trim()),
        Err(e) => e.user_html(),
    };
    format!(
        "⚔️ <b>AI Battle Arena</b>\n{RULE}\n\n🤖 <b>GPT-5:</b>\n{}\n\n🧠 <b>Gemini:</b>\n{}",
        side(gpt),
        side(gemini)
    )
}

// ============== Lookups ==============

pub(crate) fn detector_html(report: &DetectorReport) -> String {
    format!(
        "🛡 <b>AI Detection Report</b>\n\n🤖 <b>AI Percentage:</b> <code>{}%</code>\n📊 <b>Classification:</b> <b>{}</b>",
        escape_html(&report.ai_percentage),
        escape_html(&report.classification)
    )
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "Yes"
    } else {
        "No"
    }
}

/// Fits a photo caption: the bio is cut short.
pub(crate) fn tiktok_html(p: &TikTokProfile) -> String {
    format!(
        "📱 <b>TikTok Intelligence:</b>\n{RULE}\n\
👤 <b>Name:</b> {}\n\
🆔 <b>Username:</b> <code>{}</code>\n\
🏢 <b>ID:</b> <code>{}</code>\n\
🔐 <b>Private:</b> {}\n\
✅ <b>Verified:</b> {}\n\n\
📊 <b>Statistics:</b>\n\
👤 <b>Followers:</b> {}\n\
👣 <b>Following:</b> {}\n\
❤️ <b>Hearts:</b> {}\n\
🎬 <b>Videos:</b> {}\n\n\
📝 <b>Bio:</b>\n<i>{}</i>",
        escape_html(&p.nickname),
        escape_html(&p.username),
        escape_html(&p.id),
        yes_no(p.private),
        yes_no(p.verified),
        thousands(p.followers),
        thousands(p.following),
        thousands(p.hearts),
        thousands(p.videos),
        escape_html(&truncate_chars(&p.bio, 300)),
    )
}

pub(crate) fn free_fire_html(p: &FreeFireProfile) -> String {
    format!(
        "🎮 <b>FREE FIRE AGENT SCAN</b> 🎮\n{RULE}\n\
👤 <b>Agent:</b> <code>{}</code>\n\
🆔 <b>UID:</b> <code>{}</code>\n\
🏅 <b>Level:</b> <code>{}</code>\n\
📈 <b>Experience:</b> <code>{}</code>\n\
🌍 <b>Sector:</b> <code>{}</code>\n\
🎗 <b>Badge:</b> <code>{}</code>\n{RULE}\n\
📜 <b>Signature:</b>\n<i>{}</i>",
        escape_html(&p.name),
        escape_html(&p.uid),
        escape_html(&p.level),
        escape_html(&p.exp),
        escape_html(&p.region),
        escape_html(&p.badge),
        escape_html(&p.bio),
    )
}

pub(crate) fn visit_html(r: &VisitReport) -> String {
    format!(
        "🚀 <b>Account Visited Successfully</b>\n\n\
👤 <b>Player:</b> {}\n\
🆔 <b>UID:</b> <code>{}</code>\n\n\
📊 <b>Visit Stats:</b>\n\
✨ <b>Successful:</b> {}\n\
❌ <b>Failed:</b> {}\n\
📈 <b>Total:</b> {}",
        escape_html(&r.nickname),
        escape_html(&r.uid),
        thousands(r.successful),
        thousands(r.failed),
        thousands(r.total),
    )
}

/// Fits a photo caption: the bio is cut short.
pub(crate) fn insta_html(p: &InstaProfile) -> String {
    let flag = |b: bool, on: &str, off: &str| format!("{} {}", yes_no(b), if b { on } else { off });
    format!(
        "🌌 <b>INSTAGRAM NEURAL DOSSIER</b> 🌌\n{RULE}\n\
👤 <b>Name:</b> <code>{}</code>\n\
📸 <b>Handle:</b> @{}\n\
🆔 <b>Entity ID:</b> <code>{}</code>\n\n\
📊 <b>Network Stats:</b>\n\
├ 👥 <b>Followers:</b> <code>{}</code>\n\
├ 📡 <b>Following:</b> <code>{}</code>\n\
└ 📤 <b>Posts:</b> <code>{}</code>\n\n\
🛡 <b>Verification:</b>\n\
├ 🔒 <b>Private:</b> <code>{}</code>\n\
├ ✅ <b>Verified:</b> <code>{}</code>\n\
└ 🏢 <b>Business:</b> <code>{}</code>\n\n\
📜 <b>Bio:</b>\n<i>{}</i>",
        escape_html(&p.full_name),
        escape_html(&p.username),
        escape_html(&p.id),
        thousands(p.followers),
        thousands(p.following),
        thousands(p.posts),
        flag(p.private, "🔒", "🔓"),
        flag(p.verified, "✅", "❌"),
        flag(p.business, "🏢", "👤"),
        escape_html(&truncate_chars(&p.bio, 300)),
    )
}

/// Rough account age from the size of the id.
pub(crate) fn account_era(id: i64) -> &'static str {
    match id {
        i64::MIN..=99_999_999 => "Ancient 🏛️",
        100_000_000..=499_999_999 => "Glory Days 🎖️",
        500_000_000..=999_999_999 => "Pre-Global 🌍",
        1_000_000_000..=4_999_999_999 => "Global Era 🚀",
        5_000_000_000..=6_999_999_999 => "New Wave 🌊",
        _ => "The Future ✨",
    }
}

pub(crate) fn user_profile_html(p: &UserProfile) -> String {
    let full_name = match &p.last_name {
        Some(last) => format!("{} {last}", p.first_name),
        None => p.first_name.clone(),
    };
    let username = p
        .username
        .as_ref()
        .map(|u| format!("@{}", escape_html(u)))
        .unwrap_or_else(|| "None".to_string());
    format!(
        "👤 <b>TELEGRAM NEURAL PROFILE</b> 👤\n{RULE}\n\
🆔 <b>User ID:</b> <code>{id}</code>\n\
👤 <b>Name:</b> <a href=\"tg://user?id={id}\">{}</a>\n\
📝 <b>First Name:</b> <code>{}</code>\n\
📝 <b>Last Name:</b> <code>{}</code>\n\
🌐 <b>Username:</b> {username}\n\
📅 <b>Account Era:</b> <code>{}</code>\n\
💎 <b>Premium:</b> {}\n{RULE}\n\
📜 <b>Bio:</b>\n<i>{}</i>\n{RULE}\n\
🔗 <b>Permanent Link:</b>\n<a href=\"tg://user?id={id}\">tg://user?id={id}</a>",
        escape_html(full_name.trim()),
        escape_html(&p.first_name),
        escape_html(p.last_name.as_deref().unwrap_or("N/A")),
        account_era(p.id),
        if p.is_premium { "Yes 💎" } else { "No" },
        escape_html(p.bio.as_deref().unwrap_or("No Bio")),
        id = p.id,
    )
}

/// One button per style, two per row. Long styles get a shortened label.
pub(crate) fn style_picker(original: &str, styles: &[String]) -> (String, InlineKeyboard) {
    let text = format!(
        "✨ <b>Pick your favorite style:</b>\n\nOriginal: <code>{}</code>",
        escape_html(original)
    );
    let buttons = styles
        .iter()
        .enumerate()
        .map(|(i, style)| {
            let label = if style.chars().count() > 15 {
                truncate_chars(style, 12)
            } else {
                style.clone()
            };
            InlineButton::action(label, CallbackAction::StylePick(i as u8))
        })
        .collect();
    let mut kb = InlineKeyboard::grid(buttons, 2);
    kb.rows.push(back_row());
    (text, kb)
}

pub(crate) fn styled_html(style: &str) -> String {
    format!(
        "✅ <b>Styled Text (Click to copy):</b>\n\n<code>{}</code>",
        escape_html(style)
    )
}

/// Every public command, one per line.
pub(crate) fn command_list_html(menu: &[(&str, &str)]) -> String {
    let mut out = String::from("📜 <b>Hinata Bot: Command Matrix</b>\n");
    for (name, description) in menu {
        out.push_str(&format!("\n<code>/{name}</code> - {}", escape_html(description)));
    }
    out
}

pub(crate) fn youtube_view(query: &str, hits: &[VideoHit]) -> (String, InlineKeyboard) {
    let mut text = format!("🎬 <b>YouTube Search:</b> <code>{}</code>\n\n", escape_html(query));
    let mut buttons = Vec::new();
    for (i, hit) in hits.iter().enumerate() {
        text.push_str(&format!("{}. <b>{}</b>\n", i + 1, escape_html(&hit.title)));
        if let Some(url) = &hit.url {
            buttons.push(InlineButton::url(format!("📹 Video {}", i + 1), url.clone()));
        }
    }
    (text, InlineKeyboard::grid(buttons, 2))
}

pub(crate) fn shortened_html(outcome: &Shortened) -> String {
    match outcome {
        Shortened::Link(ShortLink {
            original,
            short,
            provider,
        }) if !provider.is_fallback() => format!(
            "✨ <b>Link Shortened Successfully!</b>\n\n🔗 <b>Original:</b> {}\n🚀 <b>Shortened:</b> <code>{}</code>",
            escape_html(original),
            escape_html(short)
        ),
        Shortened::Link(ShortLink {
            original,
            short,
            provider,
        }) => format!(
            "🔗 <b>Link Shortened ({}):</b>\n\nOriginal: {}\nShort: {}",
            provider.name(),
            escape_html(original),
            escape_html(short)
        ),
        Shortened::AllFailed => {
            "❌ <b>Shortening Failed:</b> every provider refused this URL. Check the link and try again."
                .to_string()
        }
    }
}

// ============== Image generation ==============

pub(crate) fn ratio_picker(prompt: &str) -> (String, InlineKeyboard) {
    let text = format!(
        "🎨 <b>AI Image Generator</b>\n\n<b>Prompt:</b> <code>{}</code>\n\n⚡ Select your aspect ratio:",
        escape_html(prompt)
    );
    let buttons = AspectRatio::ALL
        .into_iter()
        .map(|r| InlineButton::action(format!("📐 {}", r.as_str()), CallbackAction::ImageRatio(r)))
        .collect();
    (text, InlineKeyboard::grid(buttons, 3))
}

pub(crate) fn art_caption(prompt: &str, ratio: AspectRatio) -> String {
    format!(
        "🎨 <b>Art Generated:</b> <code>{}</code>\n📏 <b>Ratio:</b> {}",
        escape_html(&truncate_chars(prompt, 800)),
        ratio.as_str()
    )
}

// ============== Temp mail ==============

pub(crate) fn temp_mail_keyboard() -> InlineKeyboard {
    InlineKeyboard::new(vec![
        vec![
            InlineButton::action("🔄 Refresh", CallbackAction::TempMailRefresh),
            InlineButton::action("🆕 New", CallbackAction::TempMailNew),
        ],
        vec![InlineButton::action("❌ Close", CallbackAction::TempMailClose)],
    ])
}

pub(crate) fn temp_mail_ready_html(account: &TempMailAccount) -> String {
    format!(
        "📧 <b>Temporary Mail Ready</b>\n\n📨 <b>Email:</b> <code>{}</code>\n🔑 <b>Password:</b> <code>{}</code>\n\n<i>Tap Refresh to check the inbox.</i>",
        escape_html(&account.address),
        escape_html(&account.password)
    )
}

pub(crate) fn temp_mail_message_html(address: &str, mail: &MailMessage) -> String {
    let mut out = format!(
        "📩 <b>New Email Received!</b>\n\n📨 <b>To:</b> <code>{}</code>\n👤 <b>From:</b> {}\n📝 <b>Subject:</b> {}\n\n{}",
        escape_html(address),
        escape_html(&mail.summary.from),
        escape_html(&mail.summary.subject),
        escape_html(&truncate_chars(mail.body.trim(), 500)),
    );
    if let Some(otp) = &mail.otp {
        out.push_str(&format!("\n\n🔐 <b>OTP Detected:</b> <code>{}</code>", escape_html(otp)));
    }
    out
}

// ============== Games ==============

pub(crate) fn ttt_lobby_html(host: &str) -> String {
    format!(
        "❌ <b>Tic Tac Toe</b> ⭕\n\n👤 <b>Player 1 (❌):</b> {}\n👤 <b>Player 2 (⭕):</b> <i>Waiting...</i>\n\n✨ Click below to join and play!",
        escape_html(host)
    )
}

pub(crate) fn ttt_join_keyboard() -> InlineKeyboard {
    InlineKeyboard::new(vec![vec![InlineButton::action(
        "🎮 Join Game",
        CallbackAction::TttJoin,
    )]])
}

fn cell_label(cell: Cell) -> &'static str {
    match cell {
        Cell::Empty => "✨",
        Cell::Mark(m) => m.symbol(),
    }
}

pub(crate) fn ttt_board_keyboard(board: &Board) -> InlineKeyboard {
    let buttons = board
        .0
        .iter()
        .enumerate()
        .map(|(i, cell)| InlineButton::action(cell_label(*cell), CallbackAction::TttMove(i as u8)))
        .collect();
    InlineKeyboard::grid(buttons, 3)
}

fn board_text(board: &Board) -> String {
    board
        .0
        .chunks(3)
        .map(|row| row.iter().map(|c| cell_label(*c)).collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn ttt_turn_html(game: &TicTacToe) -> String {
    let p2 = game
        .player_two
        .as_ref()
        .map(|p| escape_html(&p.name))
        .unwrap_or_else(|| "?".to_string());
    let current = game.current_player();
    let symbol = game.mark_of(current.id).map(|m| m.symbol()).unwrap_or("");
    format!(
        "⚔️ <b>{}</b> vs ⚔️ <b>{}</b>\n\n➡️ <b>Turn:</b> {} ({})",
        escape_html(&game.player_one.name),
        p2,
        escape_html(&current.name),
        symbol
    )
}

pub(crate) fn ttt_won_html(board: &Board, winner: &str, loser: &str, symbol: &str) -> String {
    format!(
        "🎊 <b>GAME OVER!</b> 🎊\n\n{}\n\n🏆 <b>Winner:</b> {} ({symbol})\n💀 <b>Loser:</b> {}",
        board_text(board),
        escape_html(winner),
        escape_html(loser)
    )
}

pub(crate) fn ttt_draw_html(board: &Board) -> String {
    format!(
        "🤝 <b>It's a DRAW!</b>\n\n{}\n\nNo one won this time.",
        board_text(board)
    )
}

pub(crate) fn riddle_view(riddle: &Riddle) -> (String, InlineKeyboard) {
    let kind = if riddle.from_ai { "AI" } else { "Classic" };
    let text = format!(
        "🧩 <b>{kind} Riddle Challenge</b>\n\n<i>{}</i>\n\n<b>What am I?</b> Send your answer below:",
        escape_html(&riddle.question)
    );
    (text, again("⏭ Give Up / Next", GameLaunch::Riddle))
}

pub(crate) fn riddle_verdict(correct: bool, answer: &str) -> (String, InlineKeyboard) {
    let text = if correct {
        format!(
            "🌟 <b>Perfect!</b> You got it right.\n\nAnswer: <code>{}</code>",
            escape_html(answer)
        )
    } else {
        format!(
            "❌ <b>Wrong!</b>\n\nThe correct answer was: <code>{}</code>",
            escape_html(answer)
        )
    };
    (text, again("🧩 Next Riddle", GameLaunch::Riddle))
}

pub(crate) fn trivia_view(difficulty: &str, question: &str) -> (String, InlineKeyboard) {
    let mut title: Vec<char> = difficulty.chars().collect();
    if let Some(first) = title.first_mut() {
        *first = first.to_ascii_uppercase();
    }
    let text = format!(
        "🧠 <b>Trivia Challenge ({})</b>\n\n<i>{}</i>\n\n<b>Answer?</b> Send your guess below:",
        title.into_iter().collect::<String>(),
        escape_html(question)
    );
    (text, again("⏭ Give Up / Next", GameLaunch::Trivia))
}

pub(crate) fn trivia_verdict(correct: bool, answer: &str) -> (String, InlineKeyboard) {
    let text = if correct {
        format!("🎉 <b>Correct!</b>\n\nAnswer: <code>{}</code>", escape_html(answer))
    } else {
        format!(
            "❌ <b>Incorrect!</b>\n\nThe right answer was: <code>{}</code>",
            escape_html(answer)
        )
    };
    (text, again("🧠 Next Trivia", GameLaunch::Trivia))
}

pub(crate) fn rps_keyboard() -> InlineKeyboard {
    let buttons = Hand::ALL
        .into_iter()
        .map(|h| InlineButton::action(h.label(), CallbackAction::Rps(h)))
        .collect();
    InlineKeyboard::grid(buttons, 3)
}

pub(crate) const RPS_INTRO_HTML: &str = "✊ <b>Rock Paper Scissors</b> ✌️\n\n👇 Pick your hand:";

pub(crate) fn rps_again() -> InlineKeyboard {
    again("🔁 Play Again", GameLaunch::Rps)
}

pub(crate) fn tod_keyboard() -> InlineKeyboard {
    InlineKeyboard::new(vec![vec![
        InlineButton::action("😂 Truth", CallbackAction::Tod(TodMode::Truth)),
        InlineButton::action("🔥 Dare", CallbackAction::Tod(TodMode::Dare)),
    ]])
}

pub(crate) const TOD_INTRO_HTML: &str = "🎲 <b>Truth or Dare?</b>\n\n👇 Select one below:";

pub(crate) fn tod_html(mode: TodMode, body: &str) -> String {
    format!("🎲 <b>{}:</b>\n\n{}", mode.title(), escape_html(body.trim()))
}

pub(crate) fn coin_view(side: &str) -> (String, InlineKeyboard) {
    (
        format!("🪙 <b>Coin Flip</b>\n\nThe coin landed on: <b>{side}</b>!"),
        again("🔁 Flip Again", GameLaunch::Coin),
    )
}

pub(crate) fn slot_again() -> InlineKeyboard {
    again("🎰 Spin Again", GameLaunch::Slot)
}
