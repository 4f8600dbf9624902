//! Feature runners: AI engines, writing tasks, lookups, image studio and temp mail.
//!
//! Each runner posts a placeholder, calls upstream once, then replaces the
//! placeholder with the result or the error's user-facing text.

use hnb_core::{
    actions::AspectRatio,
    domain::{ChatId, MessageRef, Sender},
    errors::Error,
    formatting::{code_reply_html, escape_html},
    intent::{Feature, Intent},
    messaging::types::{ChatAction, InlineKeyboard, ReplyRef, UserLookup, UserProfile},
    ports::{ChatRole, ChatTurn},
    prompts::{hinata_system, task_prompt, TaskPrompt},
    Result,
};
use hnb_upstream::{
    lookups::{insta_handle, EmailRequest, KeeperTarget},
    Engine,
};

use crate::router::AppState;

use super::{ack, deliver, render, send_long, Ctx};

async fn chat_action(state: &AppState, chat: ChatId, action: ChatAction) {
    if let Err(e) = state.messenger.send_chat_action(chat, action).await {
        tracing::debug!(chat_id = chat.0, "chat action failed: {e}");
    }
}

async fn placeholder(state: &AppState, ctx: &Ctx, title_html: &str) -> Result<MessageRef> {
    state
        .messenger
        .send_html(ctx.chat_id(), &render::thinking_html(title_html))
        .await
}

/// Remove a placeholder once a photo has replaced it.
async fn drop_placeholder(state: &AppState, msg: MessageRef) {
    if let Err(e) = state.messenger.delete_message(msg).await {
        tracing::debug!("placeholder delete failed: {e}");
    }
}

/// Show a feature's input prompt and wait for the next text.
pub(super) async fn ask(
    state: &AppState,
    ctx: &Ctx,
    feature: Feature,
    edit: Option<MessageRef>,
) -> Result<()> {
    state
        .sessions
        .set_intent(ctx.key(), Intent::Feature(feature))
        .await;
    let html = feature.prompt_html();
    let kb = InlineKeyboard::new(vec![render::back_row()]);
    match edit {
        Some(msg) => state.messenger.edit_html(msg, &html, Some(kb)).await,
        None => {
            state.messenger.send_keyboard(ctx.chat_id(), &html, kb).await?;
            Ok(())
        }
    }
}

/// Run `feature` on the user's input.
pub(super) async fn run(state: &AppState, ctx: &Ctx, feature: Feature, input: &str) -> Result<()> {
    tracing::debug!(feature = feature.command(), user_id = ctx.sender.id.0, "running feature");
    match feature {
        Feature::Hinata => hinata(state, ctx, input, true).await,
        Feature::Gemini
        | Feature::DeepSeek
        | Feature::ChatGpt
        | Feature::Copilot
        | Feature::Dolphin
        | Feature::Mistral
        | Feature::Granite
        | Feature::Llama4
        | Feature::ZeroTwo
        | Feature::Flirt
        | Feature::Code
        | Feature::Translate
        | Feature::Summarize
        | Feature::Grammar
        | Feature::Lyrics
        | Feature::Write
        | Feature::Ask
        | Feature::Bio
        | Feature::Poem
        | Feature::Story
        | Feature::Advice
        | Feature::Roast
        | Feature::Joke => ai_reply(state, ctx, feature, input).await,
        Feature::Detector => detector(state, ctx, input).await,
        Feature::Shorten => shorten(state, ctx, input).await,
        Feature::Email => email(state, ctx, input).await,
        Feature::WebScreenshot => screenshot(state, ctx, input).await,
        Feature::WebZip => web_zip(state, ctx, input).await,
        Feature::Pinterest => pinterest(state, ctx, input).await,
        Feature::YtSearch => youtube(state, ctx, input).await,
        Feature::TikTok => tiktok(state, ctx, input).await,
        Feature::FreeFire => free_fire(state, ctx, input).await,
        Feature::FreeFireVisit => free_fire_visit(state, ctx, input).await,
        Feature::Insta => insta(state, ctx, input).await,
        Feature::StyleText => style_text(state, ctx, input).await,
        Feature::KeeperAdd => keeper_add(state, ctx, input).await,
        Feature::KeeperDel => keeper_del(state, ctx, input).await,
        Feature::Imagine => imagine(state, ctx, input).await,
    }
}

// ============== AI ==============

/// Which engine answers a writing or persona feature, and with what prompt.
async fn answer(state: &AppState, feature: Feature, input: &str) -> Result<String> {
    if let Some(engine) = Engine::for_feature(feature) {
        return state.upstream.chat(engine, input).await;
    }
    match task_prompt(feature, input) {
        Some(TaskPrompt::System(system)) => state.upstream.chatgpt_with(Some(system), &[], input).await,
        Some(TaskPrompt::Prefixed(prompt)) if feature == Feature::ZeroTwo => {
            state.upstream.chat(Engine::Dolphin, &prompt).await
        }
        Some(TaskPrompt::Prefixed(prompt)) => state.upstream.chat(Engine::ChatGpt, &prompt).await,
        None => state.upstream.chat(Engine::ChatGpt, input).await,
    }
}

async fn ai_reply(state: &AppState, ctx: &Ctx, feature: Feature, input: &str) -> Result<()> {
    chat_action(state, ctx.chat_id(), ChatAction::Typing).await;
    let title = feature.title_html();
    let msg = placeholder(state, ctx, title).await?;

    let html = match answer(state, feature, input).await {
        Ok(reply) if feature == Feature::Code => format!("{title}\n\n{}", code_reply_html(&reply)),
        Ok(reply) => render::titled_html(title, &reply),
        Err(e) => {
            tracing::warn!(feature = feature.command(), "engine failed: {e}");
            e.user_html()
        }
    };
    deliver(state, msg, &html, None).await
}

/// The Hinata persona with per-chat memory. Both turns are stored only once a
/// reply came back.
pub(super) async fn hinata(state: &AppState, ctx: &Ctx, input: &str, titled: bool) -> Result<()> {
    let chat = ctx.chat_id();
    chat_action(state, chat, ChatAction::Typing).await;

    let history: Vec<ChatTurn> = match state
        .persistence
        .get_recent_chat_turns(chat, state.cfg.history_turns)
        .await
    {
        Ok(turns) => turns,
        Err(e) => {
            tracing::warn!(chat_id = chat.0, "history unavailable: {e}");
            Vec::new()
        }
    };
    let system = hinata_system(&ctx.sender.first_name, &mut rand::thread_rng());

    let reply = match state.upstream.chatgpt_with(Some(&system), &history, input).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!("hinata failed: {e}");
            state.messenger.send_html(chat, &e.user_html()).await?;
            return Ok(());
        }
    };

    let user = ctx.sender.id;
    state
        .persistence
        .append_chat_turn(chat, user, ChatRole::User, input)
        .await?;
    state
        .persistence
        .append_chat_turn(chat, user, ChatRole::Assistant, &reply)
        .await?;

    let html = if titled {
        render::titled_html(Feature::Hinata.title_html(), &reply)
    } else {
        escape_html(reply.trim())
    };
    send_long(state, chat, &html, None).await
}

/// `/help <question>`: one-shot answer in the Hinata voice, no memory.
pub(super) async fn help_answer(state: &AppState, ctx: &Ctx, question: &str) -> Result<()> {
    let msg = state
        .messenger
        .send_html(ctx.chat_id(), "🌸 <b>Analyzing your question...</b>")
        .await?;
    let system = hinata_system(&ctx.sender.first_name, &mut rand::thread_rng());
    let prompt = format!(
        "User Question: {question}\n\nAnswer the user as Hinata, based on the information above."
    );
    let html = match state.upstream.chatgpt_with(Some(&system), &[], &prompt).await {
        Ok(reply) => format!(
            "🌸 <b>Hinata AI Response</b> 🌸\n\n{}\n\n✨ <i>Powered by Hinata Neural Engine</i>",
            escape_html(reply.trim())
        ),
        Err(e) => e.user_html(),
    };
    deliver(state, msg, &html, None).await
}

/// `/ai <prompt>`: GPT and Gemini side by side.
pub(super) async fn compare(state: &AppState, ctx: &Ctx, prompt: &str) -> Result<()> {
    chat_action(state, ctx.chat_id(), ChatAction::Typing).await;
    let msg = placeholder(state, ctx, "⚔️ <b>AI Battle Arena</b>").await?;
    let (gpt, gemini) = state.upstream.compare(prompt).await;
    deliver(state, msg, &render::compare_html(&gpt, &gemini), None).await
}

// ============== Lookups ==============

async fn detector(state: &AppState, ctx: &Ctx, input: &str) -> Result<()> {
    let msg = placeholder(state, ctx, Feature::Detector.title_html()).await?;
    let html = match state.upstream.detect_ai(input).await {
        Ok(report) => render::detector_html(&report),
        Err(e) => e.user_html(),
    };
    deliver(state, msg, &html, None).await
}

/// `url [alias]`.
async fn shorten(state: &AppState, ctx: &Ctx, input: &str) -> Result<()> {
    let mut parts = input.split_whitespace();
    let Some(url) = parts.next() else {
        return ask(state, ctx, Feature::Shorten, None).await;
    };
    let alias = parts.next();
    let msg = placeholder(state, ctx, Feature::Shorten.title_html()).await?;
    let outcome = state.upstream.shorten(url, alias).await;
    deliver(state, msg, &render::shortened_html(&outcome), None).await
}

/// `to|subject|message`. A malformed line keeps the prompt armed.
async fn email(state: &AppState, ctx: &Ctx, input: &str) -> Result<()> {
    let Some(req) = EmailRequest::parse(input) else {
        state
            .sessions
            .set_intent(ctx.key(), Intent::Feature(Feature::Email))
            .await;
        state
            .messenger
            .send_html(
                ctx.chat_id(),
                "⚠️ <b>Invalid format.</b> Send <code>to|subject|message</code> with a valid address.",
            )
            .await?;
        return Ok(());
    };

    let msg = placeholder(state, ctx, Feature::Email.title_html()).await?;
    let html = match state.upstream.send_email(&req).await {
        Ok(()) => format!(
            "✅ <b>Email Sent Successfully!</b>\n\n📨 <b>To:</b> <code>{}</code>\n📝 <b>Subject:</b> {}",
            escape_html(&req.to),
            escape_html(&req.subject)
        ),
        Err(e) => e.user_html(),
    };
    deliver(state, msg, &html, None).await
}

async fn screenshot(state: &AppState, ctx: &Ctx, input: &str) -> Result<()> {
    let chat = ctx.chat_id();
    chat_action(state, chat, ChatAction::UploadPhoto).await;
    let msg = placeholder(state, ctx, Feature::WebScreenshot.title_html()).await?;

    let url = match state.upstream.web_screenshot(input).await {
        Ok(url) => url,
        Err(e) => return deliver(state, msg, &e.user_html(), None).await,
    };
    let caption = format!("📸 <b>Screenshot:</b> {}", escape_html(input.trim()));
    match state.messenger.send_photo(chat, &url, &caption).await {
        Ok(_) => {
            drop_placeholder(state, msg).await;
            Ok(())
        }
        Err(e) => deliver(state, msg, &e.user_html(), None).await,
    }
}

async fn web_zip(state: &AppState, ctx: &Ctx, input: &str) -> Result<()> {
    let msg = placeholder(state, ctx, Feature::WebZip.title_html()).await?;
    let html = match state.upstream.web_zip(input).await {
        Ok(link) => format!(
            "📦 <b>Website Zipped!</b>\n\n🔗 <b>Site:</b> {}\n📥 <a href=\"{}\">Download ZIP</a>",
            escape_html(input.trim()),
            escape_html(&link)
        ),
        Err(e) => e.user_html(),
    };
    deliver(state, msg, &html, None).await
}

async fn pinterest(state: &AppState, ctx: &Ctx, input: &str) -> Result<()> {
    let chat = ctx.chat_id();
    chat_action(state, chat, ChatAction::UploadPhoto).await;
    let msg = placeholder(state, ctx, Feature::Pinterest.title_html()).await?;

    let urls = match state.upstream.pinterest_search(input).await {
        Ok(urls) => urls,
        Err(e) => return deliver(state, msg, &e.user_html(), None).await,
    };
    let caption = format!(
        "📌 <b>Pinterest:</b> <code>{}</code> ({} images)",
        escape_html(input.trim()),
        urls.len()
    );
    let sent = match urls.as_slice() {
        [single] => state.messenger.send_photo(chat, single, &caption).await.map(drop),
        many => state.messenger.send_photo_group(chat, many).await,
    };
    match sent {
        Ok(()) if urls.len() > 1 => deliver(state, msg, &caption, None).await,
        Ok(()) => {
            drop_placeholder(state, msg).await;
            Ok(())
        }
        Err(e) => deliver(state, msg, &e.user_html(), None).await,
    }
}

async fn youtube(state: &AppState, ctx: &Ctx, input: &str) -> Result<()> {
    let msg = placeholder(state, ctx, Feature::YtSearch.title_html()).await?;
    match state.upstream.youtube_search(input).await {
        Ok(hits) => {
            let (html, kb) = render::youtube_view(input, &hits);
            deliver(state, msg, &html, Some(kb)).await
        }
        Err(e) => deliver(state, msg, &e.user_html(), None).await,
    }
}

async fn tiktok(state: &AppState, ctx: &Ctx, input: &str) -> Result<()> {
    let chat = ctx.chat_id();
    let handle = input.trim().trim_start_matches('@');
    let msg = placeholder(state, ctx, Feature::TikTok.title_html()).await?;

    let profile = match state.upstream.tiktok_profile(handle).await {
        Ok(p) => p,
        Err(e) => return deliver(state, msg, &e.user_html(), None).await,
    };
    let html = render::tiktok_html(&profile);
    if let Some(avatar) = &profile.avatar {
        match state.messenger.send_photo(chat, avatar, &html).await {
            Ok(_) => {
                drop_placeholder(state, msg).await;
                return Ok(());
            }
            Err(e) => tracing::debug!("avatar photo failed, sending text: {e}"),
        }
    }
    deliver(state, msg, &html, None).await
}

async fn free_fire(state: &AppState, ctx: &Ctx, input: &str) -> Result<()> {
    let msg = placeholder(state, ctx, Feature::FreeFire.title_html()).await?;
    let html = match state.upstream.free_fire_profile(input.trim()).await {
        Ok(profile) => render::free_fire_html(&profile),
        Err(e) => e.user_html(),
    };
    deliver(state, msg, &html, None).await
}

async fn free_fire_visit(state: &AppState, ctx: &Ctx, input: &str) -> Result<()> {
    let Some(uid) = input.split_whitespace().next() else {
        return ask(state, ctx, Feature::FreeFireVisit, None).await;
    };
    let msg = placeholder(state, ctx, Feature::FreeFireVisit.title_html()).await?;
    let html = match state.upstream.free_fire_visit(uid).await {
        Ok(report) => render::visit_html(&report),
        Err(e) => e.user_html(),
    };
    deliver(state, msg, &html, None).await
}

async fn insta(state: &AppState, ctx: &Ctx, input: &str) -> Result<()> {
    let Some(handle) = insta_handle(input) else {
        return ask(state, ctx, Feature::Insta, None).await;
    };
    let msg = placeholder(state, ctx, Feature::Insta.title_html()).await?;
    let profile = match state.upstream.insta_profile(&handle).await {
        Ok(p) => p,
        Err(e) => return deliver(state, msg, &e.user_html(), None).await,
    };
    let html = render::insta_html(&profile);
    if let Some(avatar) = &profile.avatar {
        match state.messenger.send_photo(ctx.chat_id(), avatar, &html).await {
            Ok(_) => {
                drop_placeholder(state, msg).await;
                return Ok(());
            }
            Err(e) => tracing::debug!("profile photo failed, sending text: {e}"),
        }
    }
    deliver(state, msg, &html, None).await
}

/// Offer the styled variants as buttons; the pick is answered from the session.
async fn style_text(state: &AppState, ctx: &Ctx, input: &str) -> Result<()> {
    let text = input.trim();
    let msg = placeholder(state, ctx, Feature::StyleText.title_html()).await?;
    match state.upstream.style_text(text).await {
        Ok(styles) => {
            let (html, kb) = render::style_picker(text, &styles);
            state.sessions.set_styles(ctx.key(), styles).await;
            deliver(state, msg, &html, Some(kb)).await
        }
        Err(Error::NoPayload { .. }) => {
            deliver(state, msg, "❌ No styles found for this text.", None).await
        }
        Err(e) => deliver(state, msg, &e.user_html(), None).await,
    }
}

pub(super) async fn style_pick(
    state: &AppState,
    ctx: &Ctx,
    callback_id: &str,
    index: u8,
) -> Result<()> {
    let Some(style) = state.sessions.style(ctx.key(), usize::from(index)).await else {
        ack(state, callback_id, Some("❌ Session expired. Please try again.")).await;
        return Ok(());
    };
    if let Err(e) = state
        .messenger
        .answer_callback_query(callback_id, Some("✨ Style Selected!"), false)
        .await
    {
        tracing::debug!("callback answer failed: {e}");
    }
    state
        .messenger
        .send_html(ctx.chat_id(), &render::styled_html(&style))
        .await?;
    Ok(())
}

fn profile_of(sender: &Sender) -> UserProfile {
    let last_name = sender
        .full_name
        .strip_prefix(sender.first_name.as_str())
        .map(str::trim)
        .filter(|rest| !rest.is_empty())
        .map(str::to_string);
    UserProfile {
        id: sender.id.0,
        first_name: sender.first_name.clone(),
        last_name,
        username: sender.username.clone(),
        bio: None,
        is_premium: sender.is_premium,
    }
}

/// Fill in the bio when the user's chat is reachable.
async fn with_bio(state: &AppState, mut profile: UserProfile) -> UserProfile {
    match state.messenger.lookup_user(&UserLookup::Id(profile.id)).await {
        Ok(chat) => profile.bio = chat.bio,
        Err(e) => tracing::debug!(user_id = profile.id, "bio unavailable: {e}"),
    }
    profile
}

/// `/userinfo [id|@username]`, or about the author of the replied message, or
/// about the caller.
pub(super) async fn user_info(
    state: &AppState,
    ctx: &Ctx,
    args: &str,
    reply_to: Option<&ReplyRef>,
) -> Result<()> {
    let profile = if let Some(author) = reply_to.and_then(|r| r.author.as_ref()) {
        with_bio(state, profile_of(author)).await
    } else if let Some(who) = args.split_whitespace().next().and_then(UserLookup::parse) {
        match state.messenger.lookup_user(&who).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::debug!(?who, "user lookup failed: {e}");
                let html = match &who {
                    UserLookup::Id(_) => "❌ <b>User not found by ID.</b>".to_string(),
                    UserLookup::Username(name) => {
                        format!("❌ <b>User @{} not found.</b>", escape_html(name))
                    }
                };
                state.messenger.send_html(ctx.chat_id(), &html).await?;
                return Ok(());
            }
        }
    } else {
        with_bio(state, profile_of(&ctx.sender)).await
    };
    state
        .messenger
        .send_html(ctx.chat_id(), &render::user_profile_html(&profile))
        .await?;
    Ok(())
}

async fn keeper_add(state: &AppState, ctx: &Ctx, input: &str) -> Result<()> {
    let Some(target) = KeeperTarget::parse(input) else {
        return ask(state, ctx, Feature::KeeperAdd, None).await;
    };
    let msg = placeholder(state, ctx, Feature::KeeperAdd.title_html()).await?;
    let html = match state.upstream.keeper_add(&target).await {
        Ok(()) => format!(
            "✅ <b>Added to Uptime Keeper</b>\n\n🔗 <b>URL:</b> {}\n⏱ <b>Interval:</b> {} mins",
            escape_html(&target.url),
            target.interval_mins
        ),
        Err(e) => e.user_html(),
    };
    deliver(state, msg, &html, None).await
}

async fn keeper_del(state: &AppState, ctx: &Ctx, input: &str) -> Result<()> {
    let Some(site) = input.split_whitespace().next() else {
        return ask(state, ctx, Feature::KeeperDel, None).await;
    };
    let msg = placeholder(state, ctx, Feature::KeeperDel.title_html()).await?;
    let html = match state.upstream.keeper_delete(site).await {
        Ok(()) => format!(
            "❌ <b>Removed from Uptime Keeper</b>\n\n🔗 <b>URL:</b> {}",
            escape_html(site)
        ),
        Err(e) => e.user_html(),
    };
    deliver(state, msg, &html, None).await
}

// ============== Image studio ==============

/// Remember the prompt and offer the aspect ratios.
async fn imagine(state: &AppState, ctx: &Ctx, input: &str) -> Result<()> {
    let prompt = input.trim().to_string();
    state.sessions.set_image_prompt(ctx.key(), prompt.clone()).await;
    let (html, kb) = render::ratio_picker(&prompt);
    state.messenger.send_keyboard(ctx.chat_id(), &html, kb).await?;
    Ok(())
}

pub(super) async fn generate_image(
    state: &AppState,
    ctx: &Ctx,
    picker: MessageRef,
    ratio: AspectRatio,
) -> Result<()> {
    let Some(prompt) = state.sessions.image_prompt(ctx.key()).await else {
        return state
            .messenger
            .edit_html(
                picker,
                "⚠️ <b>Image session expired.</b> Send /imagine again.",
                None,
            )
            .await;
    };

    let chat = ctx.chat_id();
    state
        .messenger
        .edit_html(
            picker,
            &format!("🎨 <i>Painting your {} masterpiece...</i>", ratio.as_str()),
            None,
        )
        .await?;
    chat_action(state, chat, ChatAction::UploadPhoto).await;

    let url = match state.upstream.generate_image(&prompt, ratio).await {
        Ok(url) => url,
        Err(e) => return state.messenger.edit_html(picker, &e.user_html(), None).await,
    };
    match state
        .messenger
        .send_photo(chat, &url, &render::art_caption(&prompt, ratio))
        .await
    {
        Ok(_) => {
            drop_placeholder(state, picker).await;
            Ok(())
        }
        Err(e) => state.messenger.edit_html(picker, &e.user_html(), None).await,
    }
}

// ============== Temp mail ==============

pub(super) async fn temp_mail_create(state: &AppState, ctx: &Ctx) -> Result<()> {
    let msg = state
        .messenger
        .send_html(ctx.chat_id(), "📧 <i>Creating a temporary mailbox...</i>")
        .await?;
    match state.upstream.create_temp_mail().await {
        Ok(account) => {
            let html = render::temp_mail_ready_html(&account);
            state.sessions.set_temp_mail(ctx.key(), account).await;
            state
                .messenger
                .edit_html(msg, &html, Some(render::temp_mail_keyboard()))
                .await
        }
        Err(e) => state.messenger.edit_html(msg, &e.user_html(), None).await,
    }
}

pub(super) async fn temp_mail_refresh(state: &AppState, ctx: &Ctx, msg: MessageRef) -> Result<()> {
    let kb = render::temp_mail_keyboard();
    let Some(mut account) = state.sessions.temp_mail(ctx.key()).await else {
        return state
            .messenger
            .edit_html(
                msg,
                "⚠️ <b>No active mailbox.</b> Tap New to create one.",
                Some(kb),
            )
            .await;
    };

    let latest = state.upstream.temp_mail_latest(&mut account).await;
    // The token may have been renewed.
    state.sessions.set_temp_mail(ctx.key(), account.clone()).await;

    let html = match latest {
        Ok(Some(mail)) => render::temp_mail_message_html(&account.address, &mail),
        Ok(None) => format!(
            "{}\n\n📭 <i>Inbox is empty.</i>",
            render::temp_mail_ready_html(&account)
        ),
        Err(e) => e.user_html(),
    };
    state.messenger.edit_html(msg, &html, Some(kb)).await
}

pub(super) async fn temp_mail_close(state: &AppState, ctx: &Ctx, msg: MessageRef) -> Result<()> {
    state.sessions.take_temp_mail(ctx.key()).await;
    if let Err(e) = state.messenger.delete_message(msg).await {
        tracing::debug!("mailbox message delete failed: {e}");
        return state
            .messenger
            .edit_html(msg, "📧 <b>Mailbox closed.</b>", None)
            .await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use hnb_core::{
        domain::{ChatId, MessageId, MessageRef},
        intent::{Feature, Intent},
        messaging::recording::Sent,
    };
    use serde_json::json;
    use wiremock::{
        matchers::{method, path},
        Mock, ResponseTemplate,
    };

    use crate::handlers::test_support::*;

    #[tokio::test]
    async fn engine_error_replaces_placeholder() {
        let h = Harness::new().await;
        Mock::given(method("GET"))
            .and(path("/gemini"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&h.server)
            .await;

        h.command(&private_chat(10), &user(10, "Ann"), "/gemini hi").await;

        assert_eq!(
            h.messenger.texts().last().unwrap(),
            "❌ <b>Gemini Error:</b> Status Code 502"
        );
    }

    #[tokio::test]
    async fn code_answers_render_as_pre_blocks() {
        let h = Harness::new().await;
        h.chatgpt_replies("Here:\n```rust\nfn main() {}\n```").await;

        h.command(&private_chat(10), &user(10, "Ann"), "/code hello world").await;

        let last = h.messenger.texts().pop().unwrap();
        assert!(last.starts_with("👨‍💻 <b>Code AI:</b>\n\n"), "{last}");
        assert!(last.contains("<pre><code>fn main() {}</code></pre>"), "{last}");
    }

    #[tokio::test]
    async fn malformed_email_keeps_prompt_armed() {
        let h = Harness::new().await;
        let (chat, ann) = (private_chat(10), user(10, "Ann"));

        h.command(&chat, &ann, "/email").await;
        h.text(&chat, &ann, "not an email").await;

        assert_eq!(
            h.state.sessions.peek_intent(h.key(&chat, &ann)).await,
            Some(Intent::Feature(Feature::Email))
        );
        assert!(h.messenger.texts()[1].contains("Invalid format."));
    }

    #[tokio::test]
    async fn imagine_picks_ratio_then_posts_photo() {
        let h = Harness::new().await;
        Mock::given(method("GET"))
            .and(path("/ai/gemimage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({ "status": true, "image_url": "https://img.example/cat.png" }),
            ))
            .mount(&h.server)
            .await;
        let (chat, ann) = (private_chat(10), user(10, "Ann"));

        h.command(&chat, &ann, "/imagine a cat").await;
        let picker = MessageRef {
            chat_id: ChatId(10),
            message_id: MessageId(100),
        };
        h.press(&chat, &ann, picker, "img:16:9").await;

        let sent = h.messenger.sent();
        assert!(sent.contains(&Sent::Photo {
            chat_id: ChatId(10),
            url: "https://img.example/cat.png".into(),
            caption: "🎨 <b>Art Generated:</b> <code>a cat</code>\n📏 <b>Ratio:</b> 16:9".into(),
        }));
        assert_eq!(h.messenger.last(), Some(Sent::Delete(picker)));
    }

    #[tokio::test]
    async fn stale_ratio_press_explains_itself() {
        let h = Harness::new().await;
        let picker = MessageRef {
            chat_id: ChatId(10),
            message_id: MessageId(3),
        };

        h.press(&private_chat(10), &user(10, "Ann"), picker, "img:1:1").await;

        assert!(h.messenger.texts()[0].contains("Image session expired."));
    }

    #[tokio::test]
    async fn refresh_without_mailbox_offers_a_new_one() {
        let h = Harness::new().await;
        let msg = MessageRef {
            chat_id: ChatId(10),
            message_id: MessageId(4),
        };

        h.press(&private_chat(10), &user(10, "Ann"), msg, "mail:refresh").await;

        match h.messenger.last() {
            Some(Sent::Edit { html, keyboard, .. }) => {
                assert!(html.contains("No active mailbox."));
                assert!(keyboard.unwrap().callback_data().contains(&"mail:new"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn style_pick_sends_the_chosen_variant() {
        let h = Harness::new().await;
        Mock::given(method("GET"))
            .and(path("/tools/allstyles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({ "result": ["𝐡𝐞𝐲", { "styled_text": "ʜᴇʏ" }] }),
            ))
            .mount(&h.server)
            .await;
        let (chat, ann) = (private_chat(10), user(10, "Ann"));

        h.command(&chat, &ann, "/styletext hey").await;
        let picker = MessageRef {
            chat_id: ChatId(10),
            message_id: MessageId(100),
        };
        match h.messenger.last() {
            Some(Sent::Edit { keyboard, .. }) => {
                let kb = keyboard.unwrap();
                assert!(kb.callback_data().contains(&"style:0"));
                assert!(kb.callback_data().contains(&"style:1"));
            }
            other => panic!("unexpected {other:?}"),
        }

        h.press(&chat, &ann, picker, "style:1").await;

        assert_eq!(
            h.messenger.last(),
            Some(Sent::Html {
                chat_id: ChatId(10),
                html: "✅ <b>Styled Text (Click to copy):</b>\n\n<code>ʜᴇʏ</code>".into(),
                keyboard: None,
            })
        );
    }

    #[tokio::test]
    async fn stale_style_pick_is_answered_with_an_alert() {
        let h = Harness::new().await;
        let picker = MessageRef {
            chat_id: ChatId(10),
            message_id: MessageId(5),
        };

        h.press(&private_chat(10), &user(10, "Ann"), picker, "style:3").await;

        assert_eq!(
            h.messenger.sent(),
            vec![Sent::CallbackAnswer {
                id: "cb-style:3".into(),
                text: Some("❌ Session expired. Please try again.".into()),
                alert: true,
            }]
        );
    }
}
