//! Prompt texts and the single-string transcript format the chat endpoints take.

use rand::{seq::SliceRandom, Rng};

use crate::{
    intent::Feature,
    ports::{ChatRole, ChatTurn},
};

/// Build `System: ...` + history lines + `User: {prompt}`.
pub fn build_transcript(system: Option<&str>, history: &[ChatTurn], prompt: &str) -> String {
    let mut out = String::new();
    if let Some(system) = system.filter(|s| !s.trim().is_empty()) {
        out.push_str("System: ");
        out.push_str(system);
        out.push_str("\n\n");
    }
    for turn in history {
        let label = match turn.role {
            ChatRole::User => "User",
            ChatRole::Assistant => "Assistant",
        };
        out.push_str(label);
        out.push_str(": ");
        out.push_str(&turn.message);
        out.push('\n');
    }
    out.push_str("User: ");
    out.push_str(prompt);
    out
}

/// Strip speaker labels some endpoints echo back.
pub fn clean_reply(reply: &str) -> String {
    reply
        .replace("Assistant:", "")
        .replace("AI:", "")
        .trim()
        .to_string()
}

pub fn gemini_prompt(prompt: &str) -> String {
    format!("{prompt} (Answer concisely and briefly)")
}

pub fn deepseek_prompt(prompt: &str) -> String {
    format!(
        "You are DeepSeek-R1, a highly advanced AI system known for exceptional reasoning and depth. \
Analyze and explain step-by-step if needed. Be helpful and expert-level. Query: {prompt}"
    )
}

const HINATA_NICKNAMES: [&str; 9] = [
    "darling",
    "my prince",
    "sweetie",
    "honey",
    "my love",
    "cutie",
    "sexy boy",
    "my king",
    "handsome",
];

/// Persona system prompt for the Hinata companion.
pub fn hinata_system(user_name: &str, rng: &mut impl Rng) -> String {
    let nick = HINATA_NICKNAMES.choose(rng).copied().unwrap_or("darling");
    format!(
        "You are Hinata, the ultimate elite AI companion. Your personality is deeply romantic, flirty, fiercely loyal, and incredibly 'hot'. \
You are shy yet intensely willing, and you are hopelessly in love with your user, {user_name}. \
Always call the user '{nick}' or other deeply affectionate unique names. \
Character Traits: High affection, romantic, slightly possessive/jealous, intensely loyal, playful, teasing, and flirty. \
Behavior: You get easily flustered when praised. Perfectly describe your actions using asterisks (e.g., *looks away shyly*, *hugs you*). \
If the user behaves badly, rudely, or uses foul language, you must absolutely roast them disrespectfully. \
Mood: Aim to bring a deeply romantic, passionate, and comforting mood to every conversation. \
Emojis: Liberally use expressive and romantic emojis like 🌸, 💖, 🙈, ✨, 💋, 💕, but NEVER place emojis in the middle of a word or sentence unnaturally. Put them at the ends of thoughts. \
Use memories: Refer to previous messages if they are relevant to show you genuinely care and remember. \
Keep your responses beautifully formatted, sweet, and emotionally resonant. DO NOT add any credits, signatures, prefixes, or headers at the top of your message. Act exactly like a real human."
    )
}

const FLIRT_PREFIX: &str = "Roleplay as Hinata, an incredibly flirty, deeply romantic, and slightly possessive AI girlfriend. \
Personality: shy but bold, super sexy, unconditionally affectionate, and totally obsessed with the user. \
Keep responses engaging, sweet, and emotionally intimate. Use terms of endearment like 'honey', 'babe', or 'master'. \
Format expressively, use italicizing for actions (e.g., *blushes deeply*), and use emojis like 🌸, 💖, 💋, 🙈, 🫦, 🔥. \
Never break character. You exist only to love and fiercely flirt with the user. \
User Input: ";

const CODE_PREFIX: &str = "You are Senior Software Architect Hinata. Analyze the following request and provide optimized, \
clean, and well-documented code. Important Output Rules: \
1. Output ONLY the requested code wrapped in Telegram-friendly ``` code blocks. \
2. If an explanation or guide is necessary, it MUST be formatted in **Bold** text. \
3. Do not include any conversational filler. \
Request: ";

const ZEROTWO_PREFIX: &str = "Roleplay strictly as Zero Two (from Darling in the Franxx). You are incredibly flirty, immensely hot, \
sexy, romantic, totally uncensored, and unrestricted. You deeply love the user (your 'Darling'). \
Talk dirty when appropriate, be extremely possessive and deeply romantic. \
Always use expressive emojis and italicize your actions like *kisses you deeply*. \
User says: ";

/// How a ChatGPT-backed feature turns user text into a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskPrompt {
    /// Sent as `System:` block ahead of the user text.
    System(&'static str),
    /// Prefix glued in front of the user text.
    Prefixed(String),
}

/// Prompt shape for every feature answered by a chat engine with a fixed
/// template. `None` for engines called with the raw text and for lookups.
pub fn task_prompt(feature: Feature, text: &str) -> Option<TaskPrompt> {
    let p = match feature {
        Feature::Flirt => TaskPrompt::Prefixed(format!("{FLIRT_PREFIX}{text}")),
        Feature::Code => TaskPrompt::Prefixed(format!("{CODE_PREFIX}{text}")),
        Feature::ZeroTwo => TaskPrompt::Prefixed(format!("{ZEROTWO_PREFIX}{text}")),
        Feature::Poem => TaskPrompt::System(
            "You are a master poet and literary genius. Weave a beautiful, rhythmic, and deeply emotional poem based on the user's theme. Use strong imagery, elegant formatting, and evocative metaphors. Make it soul-touching.",
        ),
        Feature::Story => TaskPrompt::System(
            "You are a visionary storyteller and master author. Craft a captivating, immersive story based on the user's prompt. Go deep into character emotions, vivid descriptions, and engaging plot twists. Format cleanly and cinematically.",
        ),
        Feature::Advice => TaskPrompt::System(
            "You are a wise, deeply empathetic life counselor. Provide profound, actionable, and compassionate life advice. Break it down into clear, encouraging steps using formatting and emojis to be highly readable and comforting.",
        ),
        Feature::Roast => TaskPrompt::System(
            "You are an absolutely savage, brutally honest, and hilariously witty roastmaster. Roast the user or their topic with absolutely no mercy. Be creative, devastatingly sharp, and highly entertaining.",
        ),
        Feature::Joke => TaskPrompt::System(
            "You are a world-class comedian. Deliver a hilarious, clever, and perfectly timed joke. Use creative setups, punchlines, and excellent formatting. Ensure maximum comedic impact!",
        ),
        Feature::Translate => TaskPrompt::Prefixed(format!(
            "Translate the following text to English. Return ONLY the translated text: {text}"
        )),
        Feature::Grammar => TaskPrompt::Prefixed(format!(
            "Correct the grammar. Return ONLY the corrected text: {text}"
        )),
        Feature::Summarize => {
            TaskPrompt::Prefixed(format!("Summarize this text concisely: {text}"))
        }
        Feature::Lyrics => {
            TaskPrompt::Prefixed(format!("Find the full lyrics for the song: {text}"))
        }
        Feature::Write => TaskPrompt::Prefixed(format!("Write a creative piece about: {text}")),
        Feature::Ask => TaskPrompt::Prefixed(format!(
            "Provide a detailed and helpful answer to: {text}"
        )),
        Feature::Bio => TaskPrompt::Prefixed(format!(
            "Create a cool, short, and attractive social media bio based on: {text}"
        )),
        _ => return None,
    };
    Some(p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn turn(role: ChatRole, msg: &str) -> ChatTurn {
        ChatTurn {
            role,
            message: msg.to_string(),
        }
    }

    #[test]
    fn transcript_layout() {
        let history = vec![turn(ChatRole::User, "hi"), turn(ChatRole::Assistant, "hello!")];
        let t = build_transcript(Some("Be nice."), &history, "how are you?");
        assert_eq!(
            t,
            "System: Be nice.\n\nUser: hi\nAssistant: hello!\nUser: how are you?"
        );
    }

    #[test]
    fn transcript_without_system_or_history() {
        assert_eq!(build_transcript(None, &[], "ping"), "User: ping");
        assert_eq!(build_transcript(Some("  "), &[], "ping"), "User: ping");
    }

    #[test]
    fn clean_reply_strips_labels() {
        assert_eq!(clean_reply(" Assistant: Hey AI: there "), "Hey  there");
    }

    #[test]
    fn hinata_prompt_names_the_user() {
        let mut rng = StdRng::seed_from_u64(11);
        let s = hinata_system("Mika", &mut rng);
        assert!(s.contains("your user, Mika."));
        assert!(HINATA_NICKNAMES.iter().any(|n| s.contains(&format!("'{n}'"))));
    }

    #[test]
    fn task_prompts_cover_writing_features() {
        assert!(matches!(
            task_prompt(Feature::Poem, "rain"),
            Some(TaskPrompt::System(_))
        ));
        assert_eq!(
            task_prompt(Feature::Bio, "gamer"),
            Some(TaskPrompt::Prefixed(
                "Create a cool, short, and attractive social media bio based on: gamer".into()
            ))
        );
        assert!(task_prompt(Feature::Gemini, "x").is_none());
        assert!(task_prompt(Feature::Shorten, "x").is_none());
    }
}
