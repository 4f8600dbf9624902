//! Typed inline-button payloads.
//!
//! Telegram hands back the `callback_data` string verbatim, so every button the
//! bot renders goes through [`CallbackAction::to_data`] and comes back through
//! [`CallbackAction::parse`].

use crate::{
    game::minigames::{Hand, TodMode},
    intent::{Feature, MenuPage},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AspectRatio {
    Square,
    Landscape,
    Portrait,
    Classic,
    ClassicPortrait,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Landscape,
        AspectRatio::Portrait,
        AspectRatio::Classic,
        AspectRatio::ClassicPortrait,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Classic => "4:3",
            AspectRatio::ClassicPortrait => "3:4",
        }
    }

    pub fn from_str_ratio(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == s)
    }
}

/// Games that can be (re)started from a button.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameLaunch {
    Guess,
    Riddle,
    Trivia,
    Rps,
    TruthOrDare,
    Slot,
    Coin,
    TicTacToe,
}

impl GameLaunch {
    pub const ALL: [GameLaunch; 8] = [
        GameLaunch::Guess,
        GameLaunch::Riddle,
        GameLaunch::Trivia,
        GameLaunch::Rps,
        GameLaunch::TruthOrDare,
        GameLaunch::Slot,
        GameLaunch::Coin,
        GameLaunch::TicTacToe,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            GameLaunch::Guess => "guess",
            GameLaunch::Riddle => "riddle",
            GameLaunch::Trivia => "trivia",
            GameLaunch::Rps => "rps",
            GameLaunch::TruthOrDare => "tod",
            GameLaunch::Slot => "slot",
            GameLaunch::Coin => "coin",
            GameLaunch::TicTacToe => "ttt",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GameLaunch::Guess => "🔢 Guess",
            GameLaunch::Riddle => "🧩 Riddle",
            GameLaunch::Trivia => "🧠 Trivia",
            GameLaunch::Rps => "✊ RPS",
            GameLaunch::TruthOrDare => "🎲 Truth or Dare",
            GameLaunch::Slot => "🎰 Slot",
            GameLaunch::Coin => "🪙 Coin",
            GameLaunch::TicTacToe => "❌ Tic Tac Toe ⭕",
        }
    }

    fn from_slug(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.slug() == s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    Menu(MenuPage),
    Help,
    AskFeature(Feature),
    Game(GameLaunch),
    TttJoin,
    TttMove(u8),
    Rps(Hand),
    Tod(TodMode),
    ImageRatio(AspectRatio),
    TempMailRefresh,
    TempMailNew,
    TempMailClose,
    /// Index into the session's style picker.
    StylePick(u8),
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        let mut parts = data.splitn(3, ':');
        let head = parts.next()?;
        let a = parts.next();
        let b = parts.next();

        let action = match (head, a, b) {
            ("menu", Some(page), None) => CallbackAction::Menu(MenuPage::from_slug(page)?),
            ("help", None, None) => CallbackAction::Help,
            ("ask", Some(cmd), None) => CallbackAction::AskFeature(Feature::from_command(cmd)?),
            ("game", Some(g), None) => CallbackAction::Game(GameLaunch::from_slug(g)?),
            ("ttt", Some("join"), None) => CallbackAction::TttJoin,
            ("ttt", Some("move"), Some(n)) => {
                let cell = n.parse::<u8>().ok().filter(|c| *c < 9)?;
                CallbackAction::TttMove(cell)
            }
            ("rps", Some(hand), None) => CallbackAction::Rps(Hand::from_slug(hand)?),
            ("tod", Some(mode), None) => CallbackAction::Tod(TodMode::from_slug(mode)?),
            // Ratios contain ':' themselves, hence the 3-way split.
            ("img", Some(w), Some(h)) => {
                CallbackAction::ImageRatio(AspectRatio::from_str_ratio(&format!("{w}:{h}"))?)
            }
            ("mail", Some("refresh"), None) => CallbackAction::TempMailRefresh,
            ("mail", Some("new"), None) => CallbackAction::TempMailNew,
            ("mail", Some("close"), None) => CallbackAction::TempMailClose,
            ("style", Some(n), None) => CallbackAction::StylePick(n.parse().ok()?),
            _ => return None,
        };
        Some(action)
    }

    pub fn to_data(self) -> String {
        match self {
            CallbackAction::Menu(page) => format!("menu:{}", page.slug()),
            CallbackAction::Help => "help".to_string(),
            CallbackAction::AskFeature(f) => format!("ask:{}", f.command()),
            CallbackAction::Game(g) => format!("game:{}", g.slug()),
            CallbackAction::TttJoin => "ttt:join".to_string(),
            CallbackAction::TttMove(n) => format!("ttt:move:{n}"),
            CallbackAction::Rps(h) => format!("rps:{}", h.slug()),
            CallbackAction::Tod(m) => format!("tod:{}", m.slug()),
            CallbackAction::ImageRatio(r) => format!("img:{}", r.as_str()),
            CallbackAction::TempMailRefresh => "mail:refresh".to_string(),
            CallbackAction::TempMailNew => "mail:new".to_string(),
            CallbackAction::TempMailClose => "mail:close".to_string(),
            CallbackAction::StylePick(n) => format!("style:{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_action_parses_back() {
        let mut all = vec![
            CallbackAction::Help,
            CallbackAction::TttJoin,
            CallbackAction::TempMailRefresh,
            CallbackAction::TempMailNew,
            CallbackAction::TempMailClose,
            CallbackAction::Tod(TodMode::Truth),
            CallbackAction::Tod(TodMode::Dare),
        ];
        all.extend(MenuPage::ALL.map(CallbackAction::Menu));
        all.extend(Feature::ALL.map(CallbackAction::AskFeature));
        all.extend(GameLaunch::ALL.map(CallbackAction::Game));
        all.extend((0..9).map(CallbackAction::TttMove));
        all.extend([0, 23].map(CallbackAction::StylePick));
        all.extend(Hand::ALL.map(CallbackAction::Rps));
        all.extend(AspectRatio::ALL.map(CallbackAction::ImageRatio));

        for action in all {
            let data = action.to_data();
            assert!(data.len() <= 64, "callback data too long: {data}");
            assert_eq!(CallbackAction::parse(&data), Some(action), "{data}");
        }
    }

    #[test]
    fn garbage_is_rejected() {
        for data in [
            "",
            "ttt:move:9",
            "ttt:move:x",
            "ask:unknown",
            "img:2:1",
            "menu",
            "btn_back",
            "style:-1",
        ] {
            assert_eq!(CallbackAction::parse(data), None, "{data}");
        }
    }
}
