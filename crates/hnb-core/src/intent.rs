//! Pending intents: what the next free-text message of a session means.

/// Every feature that can wait for follow-up text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Feature {
    // AI engines
    Gemini,
    DeepSeek,
    ChatGpt,
    Copilot,
    Dolphin,
    Mistral,
    Granite,
    Llama4,
    // Personas and writing tasks
    Hinata,
    ZeroTwo,
    Flirt,
    Code,
    Translate,
    Summarize,
    Grammar,
    Lyrics,
    Write,
    Ask,
    Bio,
    Poem,
    Story,
    Advice,
    Roast,
    Joke,
    // Lookups and tools
    Detector,
    Shorten,
    Email,
    WebScreenshot,
    WebZip,
    Pinterest,
    YtSearch,
    TikTok,
    FreeFire,
    FreeFireVisit,
    Insta,
    StyleText,
    KeeperAdd,
    KeeperDel,
    // Image generation
    Imagine,
}

/// Menu page a feature button lives on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MenuPage {
    Home,
    Ai,
    Writing,
    Tools,
    Games,
    Owner,
}

impl MenuPage {
    pub const ALL: [MenuPage; 6] = [
        MenuPage::Home,
        MenuPage::Ai,
        MenuPage::Writing,
        MenuPage::Tools,
        MenuPage::Games,
        MenuPage::Owner,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            MenuPage::Home => "home",
            MenuPage::Ai => "ai",
            MenuPage::Writing => "writing",
            MenuPage::Tools => "tools",
            MenuPage::Games => "games",
            MenuPage::Owner => "owner",
        }
    }

    pub fn from_slug(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.slug() == s)
    }
}

impl Feature {
    pub const ALL: [Feature; 39] = [
        Feature::Gemini,
        Feature::DeepSeek,
        Feature::ChatGpt,
        Feature::Copilot,
        Feature::Dolphin,
        Feature::Mistral,
        Feature::Granite,
        Feature::Llama4,
        Feature::Hinata,
        Feature::ZeroTwo,
        Feature::Flirt,
        Feature::Code,
        Feature::Translate,
        Feature::Summarize,
        Feature::Grammar,
        Feature::Lyrics,
        Feature::Write,
        Feature::Ask,
        Feature::Bio,
        Feature::Poem,
        Feature::Story,
        Feature::Advice,
        Feature::Roast,
        Feature::Joke,
        Feature::Detector,
        Feature::Shorten,
        Feature::Email,
        Feature::WebScreenshot,
        Feature::WebZip,
        Feature::Pinterest,
        Feature::YtSearch,
        Feature::TikTok,
        Feature::FreeFire,
        Feature::FreeFireVisit,
        Feature::Insta,
        Feature::StyleText,
        Feature::KeeperAdd,
        Feature::KeeperDel,
        Feature::Imagine,
    ];

    /// Slash command (without `/`) that runs this feature.
    pub fn command(self) -> &'static str {
        match self {
            Feature::Gemini => "gemini",
            Feature::DeepSeek => "deepseek",
            Feature::ChatGpt => "chatgpt",
            Feature::Copilot => "copilot",
            Feature::Dolphin => "dolphin",
            Feature::Mistral => "mistral",
            Feature::Granite => "granite",
            Feature::Llama4 => "llama4",
            Feature::Hinata => "hinata",
            Feature::ZeroTwo => "zerotwo",
            Feature::Flirt => "flirt",
            Feature::Code => "code",
            Feature::Translate => "translate",
            Feature::Summarize => "summarize",
            Feature::Grammar => "grammar",
            Feature::Lyrics => "lyrics",
            Feature::Write => "write",
            Feature::Ask => "ask",
            Feature::Bio => "bio",
            Feature::Poem => "poem",
            Feature::Story => "story",
            Feature::Advice => "advice",
            Feature::Roast => "roast",
            Feature::Joke => "joke",
            Feature::Detector => "detector",
            Feature::Shorten => "shorten",
            Feature::Email => "email",
            Feature::WebScreenshot => "webss",
            Feature::WebZip => "webzip",
            Feature::Pinterest => "pinterest",
            Feature::YtSearch => "ytsearch",
            Feature::TikTok => "ttstalk",
            Feature::FreeFire => "ff",
            Feature::FreeFireVisit => "visit",
            Feature::Insta => "insta",
            Feature::StyleText => "styletext",
            Feature::KeeperAdd => "keeper",
            Feature::KeeperDel => "unkeeper",
            Feature::Imagine => "imagine",
        }
    }

    pub fn from_command(cmd: &str) -> Option<Self> {
        let cmd = cmd.to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.command() == cmd)
    }

    /// Bold HTML title used both in the prompt and as the reply header.
    pub fn title_html(self) -> &'static str {
        match self {
            Feature::Gemini => "🧠 <b>Gemini 3 Pro:</b>",
            Feature::DeepSeek => "🔥 <b>DeepSeek:</b>",
            Feature::ChatGpt => "🤖 <b>GPT-5 Ultra:</b>",
            Feature::Copilot => "💡 <b>Copilot Thinking Hub:</b>",
            Feature::Dolphin => "🐬 <b>Dolphin Unrestricted:</b>",
            Feature::Mistral => "🌪 <b>Mistral 3.1:</b>",
            Feature::Granite => "💎 <b>Granite 4.0:</b>",
            Feature::Llama4 => "🦙 <b>Llama 4:</b>",
            Feature::Hinata => "🌸 <b>Hinata:</b>",
            Feature::ZeroTwo => "💕 <b>Zero Two:</b>",
            Feature::Flirt => "💖 <b>Flirt AI:</b>",
            Feature::Code => "👨‍💻 <b>Code AI:</b>",
            Feature::Translate => "🌐 <b>Translated:</b>",
            Feature::Summarize => "📝 <b>Summary:</b>",
            Feature::Grammar => "🔡 <b>Corrected Text:</b>",
            Feature::Lyrics => "🎵 <b>Lyrics Finder:</b>",
            Feature::Write => "✍️ <b>Creative Writer:</b>",
            Feature::Ask => "❓ <b>Question Hub:</b>",
            Feature::Bio => "👤 <b>Bio Generator:</b>",
            Feature::Poem => "📜 <b>Poem Master:</b>",
            Feature::Story => "✍️ <b>Story AI:</b>",
            Feature::Advice => "💡 <b>Advice Hub:</b>",
            Feature::Roast => "🔥 <b>Brutal Roast:</b>",
            Feature::Joke => "😂 <b>AI Joke:</b>",
            Feature::Detector => "🛡️ <b>AI Detector:</b>",
            Feature::Shorten => "🔗 <b>URL Shortener:</b>",
            Feature::Email => "📧 <b>Anonymous Email:</b>",
            Feature::WebScreenshot => "📸 <b>Web Screenshot:</b>",
            Feature::WebZip => "📦 <b>Web to Zip:</b>",
            Feature::Pinterest => "📌 <b>Pinterest Discovery:</b>",
            Feature::YtSearch => "🎬 <b>YouTube Intelligence:</b>",
            Feature::TikTok => "📱 <b>TikTok Intel Stalker:</b>",
            Feature::FreeFire => "🛡️ <b>Free Fire Stats:</b>",
            Feature::FreeFireVisit => "🚀 <b>Free Fire Visits:</b>",
            Feature::Insta => "📸 <b>Instagram Hub:</b>",
            Feature::StyleText => "✨ <b>Style Text Matrix</b>",
            Feature::KeeperAdd => "✅ <b>Uptime Keeper Add:</b>",
            Feature::KeeperDel => "❌ <b>Uptime Keeper Delete:</b>",
            Feature::Imagine => "🎨 <b>AI Image Studio:</b>",
        }
    }

    /// Instruction shown when the feature waits for input.
    pub fn ask_html(self) -> &'static str {
        match self {
            Feature::Gemini | Feature::DeepSeek => "⚡ Enter your prompt below:",
            Feature::ChatGpt
            | Feature::Dolphin
            | Feature::Mistral
            | Feature::Granite
            | Feature::Llama4 => "⚡ Enter your message:",
            Feature::Copilot => "⚡ Enter your complex query for deep analysis:",
            Feature::Hinata => "<i>Go ahead, talk to me...</i>",
            Feature::ZeroTwo => "Hey darling... tell me what's on your mind~",
            Feature::Flirt => "😏 Enter text to flirt with:",
            Feature::Code => "⌨️ Describe the code/task you need help with:",
            Feature::Translate => "⌨️ Enter text to translate to English:",
            Feature::Summarize => "⌨️ Enter text to summarize:",
            Feature::Grammar => "⌨️ Enter text to correct:",
            Feature::Lyrics => "Enter the song name and artist:",
            Feature::Write => "Enter the topic you want me to write about:",
            Feature::Ask => "Enter your question:",
            Feature::Bio => "Enter some details about yourself:",
            Feature::Poem => "⚡ Enter a theme or topic for the poem:",
            Feature::Story => "⚡ Enter a prompt or title for the story:",
            Feature::Advice => "⚡ Ask me anything you need guidance on:",
            Feature::Roast => "⚡ Enter a name or topic to roast:",
            Feature::Joke => "⚡ Enter a topic or just say 'joke':",
            Feature::Detector => "⌨️ Enter the text you want to analyze for AI patterns:",
            Feature::Shorten => "⚡ Enter the long URL to shorten (optionally followed by an alias):",
            Feature::Email => {
                "⚡ Send <code>to|subject|message</code>\n\n<i>Note: Use '|' as a separator.</i>"
            }
            Feature::WebScreenshot => "🔗 Enter the URL you want to capture:",
            Feature::WebZip => "🔗 Enter the URL to zip:",
            Feature::Pinterest => "⚡ Enter your search query below:",
            Feature::YtSearch => "⚡ Enter video search query:",
            Feature::TikTok => "⚡ Enter TikTok Username:",
            Feature::FreeFire | Feature::FreeFireVisit => "🆔 Enter Player UID:",
            Feature::Insta => "⚡ Enter Username or Profile URL:",
            Feature::StyleText => "⚡ Enter the text you want to style:",
            Feature::KeeperAdd => {
                "🔗 Enter URL (and optionally interval in mins, e.g. 'https://example.com 5'):"
            }
            Feature::KeeperDel => "🔗 Enter URL to remove:",
            Feature::Imagine => "⌨️ Enter your image prompt:",
        }
    }

    /// Full prompt message: title, blank line, instruction.
    pub fn prompt_html(self) -> String {
        format!("{}\n\n{}", self.title_html(), self.ask_html())
    }

    /// Short label for menu buttons and `/help`.
    pub fn label(self) -> &'static str {
        match self {
            Feature::Gemini => "🧠 Gemini",
            Feature::DeepSeek => "🔥 DeepSeek",
            Feature::ChatGpt => "🤖 GPT-5",
            Feature::Copilot => "💡 Copilot",
            Feature::Dolphin => "🐬 Dolphin",
            Feature::Mistral => "🌪 Mistral",
            Feature::Granite => "💎 Granite",
            Feature::Llama4 => "🦙 Llama 4",
            Feature::Hinata => "🌸 Hinata",
            Feature::ZeroTwo => "💕 Zero Two",
            Feature::Flirt => "💖 Flirt",
            Feature::Code => "👨‍💻 Code",
            Feature::Translate => "🌐 Translate",
            Feature::Summarize => "📝 Summarize",
            Feature::Grammar => "🔡 Grammar",
            Feature::Lyrics => "🎵 Lyrics",
            Feature::Write => "✍️ Write",
            Feature::Ask => "❓ Ask",
            Feature::Bio => "👤 Bio",
            Feature::Poem => "📜 Poem",
            Feature::Story => "📖 Story",
            Feature::Advice => "💡 Advice",
            Feature::Roast => "🔥 Roast",
            Feature::Joke => "😂 Joke",
            Feature::Detector => "🛡️ AI Detector",
            Feature::Shorten => "🔗 Shorten",
            Feature::Email => "📧 Email",
            Feature::WebScreenshot => "📸 Screenshot",
            Feature::WebZip => "📦 Web Zip",
            Feature::Pinterest => "📌 Pinterest",
            Feature::YtSearch => "🎬 YouTube",
            Feature::TikTok => "📱 TikTok",
            Feature::FreeFire => "🎮 Free Fire",
            Feature::FreeFireVisit => "🚀 FF Visits",
            Feature::Insta => "📸 Instagram",
            Feature::StyleText => "✨ Style Text",
            Feature::KeeperAdd => "✅ Keeper Add",
            Feature::KeeperDel => "❌ Keeper Del",
            Feature::Imagine => "🎨 Imagine",
        }
    }

    pub fn menu_page(self) -> MenuPage {
        match self {
            Feature::Gemini
            | Feature::DeepSeek
            | Feature::ChatGpt
            | Feature::Copilot
            | Feature::Dolphin
            | Feature::Mistral
            | Feature::Granite
            | Feature::Llama4
            | Feature::Hinata
            | Feature::ZeroTwo
            | Feature::Flirt
            | Feature::Code
            | Feature::Imagine => MenuPage::Ai,
            Feature::Translate
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
            | Feature::Joke
            | Feature::StyleText => MenuPage::Writing,
            Feature::Detector
            | Feature::Shorten
            | Feature::Email
            | Feature::WebScreenshot
            | Feature::WebZip
            | Feature::Pinterest
            | Feature::YtSearch
            | Feature::TikTok
            | Feature::FreeFire
            | Feature::FreeFireVisit
            | Feature::Insta
            | Feature::KeeperAdd
            | Feature::KeeperDel => MenuPage::Tools,
        }
    }
}

/// The single pending intent of a session. Game variants carry their own state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    Feature(Feature),
    Guess { secret: u32, attempts: u32 },
    Riddle { answer: String },
    Trivia { answer: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn commands_are_unique_and_round_trip() {
        let mut seen = HashSet::new();
        for f in Feature::ALL {
            assert!(seen.insert(f.command()), "duplicate command {}", f.command());
            assert_eq!(Feature::from_command(f.command()), Some(f));
        }
        assert_eq!(Feature::from_command("FF"), Some(Feature::FreeFire));
        assert_eq!(Feature::from_command("start"), None);
    }

    #[test]
    fn prompt_starts_with_title() {
        let p = Feature::Imagine.prompt_html();
        assert!(p.starts_with("🎨 <b>AI Image Studio:</b>\n\n"));
    }

    #[test]
    fn menu_slugs_round_trip() {
        for p in MenuPage::ALL {
            assert_eq!(MenuPage::from_slug(p.slug()), Some(p));
        }
        assert_eq!(MenuPage::from_slug("nope"), None);
    }
}
