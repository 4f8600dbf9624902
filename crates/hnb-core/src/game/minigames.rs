//! Single-player games. Pure logic; randomness comes from the caller's `Rng`.

use rand::{seq::SliceRandom, Rng};

use crate::intent::Intent;

// ============== Number guessing ==============

pub fn new_guess(rng: &mut impl Rng) -> Intent {
    Intent::Guess {
        secret: rng.gen_range(1..=100),
        attempts: 0,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuessOutcome {
    Correct { secret: u32, attempts: u32 },
    Higher { secret: u32, attempts: u32 },
    Lower { secret: u32, attempts: u32 },
    NotANumber { secret: u32, attempts: u32 },
}

impl GuessOutcome {
    /// Intent to re-arm so the game continues. `None` once the number is found.
    pub fn next_intent(&self) -> Option<Intent> {
        match *self {
            GuessOutcome::Correct { .. } => None,
            GuessOutcome::Higher { secret, attempts }
            | GuessOutcome::Lower { secret, attempts }
            | GuessOutcome::NotANumber { secret, attempts } => {
                Some(Intent::Guess { secret, attempts })
            }
        }
    }

    pub fn reply_html(&self) -> String {
        match self {
            GuessOutcome::Correct { secret, attempts } => format!(
                "✅ <b>Correct!</b> The number was <code>{secret}</code>. It took you {attempts} tries!"
            ),
            GuessOutcome::Higher { .. } => "🔼 <b>Higher!</b> Try again:".to_string(),
            GuessOutcome::Lower { .. } => "🔽 <b>Lower!</b> Try again:".to_string(),
            GuessOutcome::NotANumber { .. } => "⚠️ Please enter a valid number.".to_string(),
        }
    }
}

/// Judge one guess. Non-numbers do not count as an attempt.
pub fn judge_guess(secret: u32, attempts: u32, text: &str) -> GuessOutcome {
    let Ok(guess) = text.trim().parse::<i64>() else {
        return GuessOutcome::NotANumber { secret, attempts };
    };
    let attempts = attempts + 1;
    match guess.cmp(&i64::from(secret)) {
        std::cmp::Ordering::Equal => GuessOutcome::Correct { secret, attempts },
        std::cmp::Ordering::Less => GuessOutcome::Higher { secret, attempts },
        std::cmp::Ordering::Greater => GuessOutcome::Lower { secret, attempts },
    }
}

pub const GUESS_INTRO_HTML: &str = "🔢 <b>Number Guessing Game</b>\n\n\
I have picked a number between <b>1 and 100</b>.\n\
Try to guess it! Send your first number below:";

// ============== Riddles ==============

pub const LOCAL_RIDDLES: &[(&str, &str)] = &[
    ("What has keys but can't open locks?", "piano"),
    ("What has to be broken before you can use it?", "egg"),
    ("I'm tall when I'm young, and I'm short when I'm old. What am I?", "candle"),
    ("What month of the year has 28 days?", "all"),
    ("What is full of holes but still holds water?", "sponge"),
    ("What question can you never answer yes to?", "asleep"),
    ("What is always in front of you but can't be seen?", "future"),
    (
        "There's a one-story house in which everything is yellow. Yellow walls, yellow doors, yellow furniture. What color are the stairs?",
        "none",
    ),
    ("What can you break, even if you never pick it up or touch it?", "promise"),
    ("What goes up but never comes down?", "age"),
    (
        "A man who was outside in the rain without an umbrella or hat didn't get a single hair on his head wet. Why?",
        "bald",
    ),
    ("What gets wet while drying?", "towel"),
    ("What can you keep after giving to someone?", "word"),
    ("I shave every day, but my beard stays the same. What am I?", "barber"),
    (
        "You see a boat filled with people. It has not sunk, but when you look again you don't see a single person on the boat. Why?",
        "married",
    ),
    ("I have branches, but no fruit, trunk or leaves. What am I?", "bank"),
    ("What can't talk but will reply when spoken to?", "echo"),
    ("The more of this there is, the less you see. What is it?", "darkness"),
    (
        "David's parents have three sons: Snap, Crackle, and what's the name of the third son?",
        "david",
    ),
    ("I follow you all day long, but when the night comes, I'm gone. What am I?", "shadow"),
    ("What has a head and a tail but no body?", "coin"),
    ("What building has the most stories?", "library"),
    ("I am an odd number. Take away a letter and I become even. What number am I?", "seven"),
    (
        "If you drop me I'm sure to crack, but give me a smile and I'll always smile back. What am I?",
        "mirror",
    ),
    ("What has hands, but can't clap?", "clock"),
    ("What has one eye, but can't see?", "needle"),
    ("What has many needles, but doesn't sew?", "pine"),
    ("What has a thumb and four fingers, but is not a hand?", "glove"),
    ("What has words, but never speaks?", "book"),
    ("What has many teeth, but cannot bite?", "comb"),
    ("What has a neck but no head?", "bottle"),
    ("What has a bottom at the top?", "legs"),
    ("What has four legs, but can't walk?", "table"),
    ("What kind of band never plays music?", "rubber"),
    ("What belongs to you, but others use it more than you do?", "name"),
    (
        "I'm light as a feather, yet the strongest man can't hold me for much more than a minute. What am I?",
        "breath",
    ),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Riddle {
    pub question: String,
    pub answer: String,
    pub from_ai: bool,
}

pub fn local_riddle(rng: &mut impl Rng) -> Riddle {
    let (q, a) = LOCAL_RIDDLES
        .choose(rng)
        .copied()
        .unwrap_or(("What has keys but can't open locks?", "piano"));
    Riddle {
        question: q.to_string(),
        answer: a.to_string(),
        from_ai: false,
    }
}

pub fn riddle_prompt(rng: &mut impl Rng) -> String {
    let difficulty = ["easy", "medium", "hard", "tricky", "funny", "impossible"]
        .choose(rng)
        .copied()
        .unwrap_or("tricky");
    let seed: u32 = rng.gen_range(1..=1_000_000);
    format!(
        "Generate a unique, creative {difficulty} riddle. Random seed: {seed}. \
Return strictly in this format: RIDDLE: [text] ANSWER: [one word answer]"
    )
}

/// Parse `RIDDLE: ... ANSWER: word` from an AI reply.
pub fn parse_riddle(reply: &str) -> Option<Riddle> {
    let (head, tail) = reply.split_once("ANSWER:")?;
    let question = head.split_once("RIDDLE:")?.1.trim().to_string();
    let answer = tail
        .split_whitespace()
        .next()?
        .to_lowercase()
        .replace(|c| c == '.' || c == ',', "");
    if question.is_empty() || answer.is_empty() {
        return None;
    }
    Some(Riddle {
        question,
        answer,
        from_ai: true,
    })
}

/// Loose riddle check: exact, answer inside the guess (answers longer than 3
/// chars), or the guess inside the answer.
pub fn answer_matches(guess: &str, answer: &str) -> bool {
    let guess = guess.trim().to_lowercase();
    let answer = answer.trim().to_lowercase();
    if guess.is_empty() {
        return false;
    }
    if guess == answer {
        return true;
    }
    if answer.chars().count() > 3 && guess.contains(&answer) {
        return true;
    }
    answer.contains(&guess)
}

// ============== Trivia ==============

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Trivia {
    pub question: String,
    pub answer: String,
}

/// Returns the difficulty shown to the user and the prompt for the AI.
pub fn trivia_prompt(rng: &mut impl Rng) -> (&'static str, String) {
    let difficulty = ["easy", "medium", "hard"]
        .choose(rng)
        .copied()
        .unwrap_or("medium");
    let seed: u32 = rng.gen_range(1..=1_000_000);
    let prompt = format!(
        "Generate a unique {difficulty} trivia question. Random seed: {seed}. \
Return strictly in this format: QUESTION: [text] ANSWER: [one word answer]"
    );
    (difficulty, prompt)
}

/// Parse `QUESTION: ... ANSWER: ...`; the answer is reduced to its first
/// alphanumeric word.
pub fn parse_trivia(reply: &str) -> Option<Trivia> {
    let (head, tail) = reply.split_once("ANSWER:")?;
    let question = head.split_once("QUESTION:")?.1.trim().to_string();
    let cleaned: String = tail
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    let answer = cleaned.split_whitespace().next()?.to_string();
    if question.is_empty() {
        return None;
    }
    Some(Trivia { question, answer })
}

pub fn trivia_matches(guess: &str, answer: &str) -> bool {
    let guess = guess.trim().to_lowercase();
    let answer = answer.trim().to_lowercase();
    !answer.is_empty() && (guess == answer || guess.contains(&answer))
}

// ============== Rock paper scissors ==============

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hand {
    Rock,
    Paper,
    Scissors,
}

impl Hand {
    pub const ALL: [Hand; 3] = [Hand::Rock, Hand::Paper, Hand::Scissors];

    pub fn slug(self) -> &'static str {
        match self {
            Hand::Rock => "rock",
            Hand::Paper => "paper",
            Hand::Scissors => "scissors",
        }
    }

    pub fn from_slug(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|h| h.slug() == s)
    }

    pub fn label(self) -> &'static str {
        match self {
            Hand::Rock => "✊ Rock",
            Hand::Paper => "✋ Paper",
            Hand::Scissors => "✌️ Scissors",
        }
    }

    fn beats(self, other: Hand) -> bool {
        matches!(
            (self, other),
            (Hand::Rock, Hand::Scissors) | (Hand::Paper, Hand::Rock) | (Hand::Scissors, Hand::Paper)
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RpsResult {
    Tie,
    UserWins,
    BotWins,
}

pub fn rps(user: Hand, bot: Hand) -> RpsResult {
    if user == bot {
        RpsResult::Tie
    } else if user.beats(bot) {
        RpsResult::UserWins
    } else {
        RpsResult::BotWins
    }
}

pub fn rps_summary_html(user: Hand, bot: Hand, bot_name: &str) -> String {
    let verdict = match rps(user, bot) {
        RpsResult::Tie => "🎲 <b>It's a Tie!</b>".to_string(),
        RpsResult::UserWins => "🏆 <b>You Won!</b>".to_string(),
        RpsResult::BotWins => format!("💀 <b>{bot_name} Won!</b>"),
    };
    format!(
        "✊ <b>RPS Battle Summary</b> ✌️\n──────────────────\n👤 <b>You:</b> {}\n🤖 <b>{bot_name}:</b> {}\n\n👉 {verdict}",
        user.label(),
        bot.label()
    )
}

pub fn random_hand(rng: &mut impl Rng) -> Hand {
    Hand::ALL[rng.gen_range(0..Hand::ALL.len())]
}

// ============== Coin and slots ==============

pub fn coin_flip(rng: &mut impl Rng) -> &'static str {
    if rng.gen_bool(0.5) {
        "Heads"
    } else {
        "Tails"
    }
}

pub const SLOT_SYMBOLS: [&str; 6] = ["🍒", "🍋", "🍇", "🔔", "7️⃣", "💎"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotOutcome {
    Jackpot,
    TwoOfAKind,
    Lose,
}

pub fn slot_outcome(reels: [&str; 3]) -> SlotOutcome {
    let [a, b, c] = reels;
    if a == b && b == c {
        SlotOutcome::Jackpot
    } else if a == b || b == c || a == c {
        SlotOutcome::TwoOfAKind
    } else {
        SlotOutcome::Lose
    }
}

pub fn spin_slots(rng: &mut impl Rng) -> [&'static str; 3] {
    let mut pick = || SLOT_SYMBOLS[rng.gen_range(0..SLOT_SYMBOLS.len())];
    [pick(), pick(), pick()]
}

pub fn slot_html(reels: [&str; 3]) -> String {
    let [a, b, c] = reels;
    let verdict = match slot_outcome(reels) {
        SlotOutcome::Jackpot => "🎉 <b>JACKPOT! YOU WIN!</b> 🎉",
        SlotOutcome::TwoOfAKind => "✨ <b>Nice! Two of a kind!</b>",
        SlotOutcome::Lose => "✨ <b>Better luck next time!</b>",
    };
    format!(
        "🎰 <b>Slot Machine</b> 🎰\n\n------------------\n| {a} | {b} | {c} |\n------------------\n\n{verdict}"
    )
}

// ============== Truth or dare ==============

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TodMode {
    Truth,
    Dare,
}

impl TodMode {
    pub fn slug(self) -> &'static str {
        match self {
            TodMode::Truth => "truth",
            TodMode::Dare => "dare",
        }
    }

    pub fn from_slug(s: &str) -> Option<Self> {
        match s {
            "truth" => Some(TodMode::Truth),
            "dare" => Some(TodMode::Dare),
            _ => None,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            TodMode::Truth => "Truth",
            TodMode::Dare => "Dare",
        }
    }

    pub fn prompt(self) -> String {
        let mode = self.slug();
        format!(
            "Generate a creative and engaging {mode} for a Truth or Dare game. Return only the {mode} text."
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn guess_secret_is_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            match new_guess(&mut rng) {
                Intent::Guess { secret, attempts } => {
                    assert!((1..=100).contains(&secret));
                    assert_eq!(attempts, 0);
                }
                other => panic!("unexpected intent {other:?}"),
            }
        }
    }

    #[test]
    fn guess_hints_and_rearm() {
        let low = judge_guess(50, 0, "10");
        assert_eq!(low, GuessOutcome::Higher { secret: 50, attempts: 1 });
        assert_eq!(low.next_intent(), Some(Intent::Guess { secret: 50, attempts: 1 }));

        let high = judge_guess(50, 1, " 99 ");
        assert_eq!(high, GuessOutcome::Lower { secret: 50, attempts: 2 });

        let hit = judge_guess(50, 2, "50");
        assert_eq!(hit, GuessOutcome::Correct { secret: 50, attempts: 3 });
        assert_eq!(hit.next_intent(), None);
        assert!(hit.reply_html().contains("3 tries"));
    }

    #[test]
    fn non_number_keeps_attempts() {
        let out = judge_guess(50, 4, "fifty");
        assert_eq!(out.next_intent(), Some(Intent::Guess { secret: 50, attempts: 4 }));
        assert_eq!(out.reply_html(), "⚠️ Please enter a valid number.");
    }

    #[test]
    fn riddle_parsing() {
        let r = parse_riddle("RIDDLE: What runs but never walks? ANSWER: River.").unwrap();
        assert_eq!(r.question, "What runs but never walks?");
        assert_eq!(r.answer, "river");
        assert!(r.from_ai);

        assert!(parse_riddle("no format here").is_none());
        assert!(parse_riddle("RIDDLE: x ANSWER:   ").is_none());
    }

    #[test]
    fn riddle_answers_match_loosely() {
        assert!(answer_matches("Piano", "piano"));
        assert!(answer_matches("it is a candle", "candle"));
        assert!(answer_matches("pian", "piano"));
        // Short answers are not searched for inside longer guesses.
        assert!(!answer_matches("an egg yolk", "egg"));
        assert!(!answer_matches("   ", "egg"));
        assert!(!answer_matches("clock", "piano"));
    }

    #[test]
    fn trivia_parsing_and_match() {
        let t = parse_trivia("QUESTION: Capital of France? ANSWER: Paris, of course").unwrap();
        assert_eq!(t.question, "Capital of France?");
        assert_eq!(t.answer, "paris");
        assert!(trivia_matches("I think PARIS", &t.answer));
        assert!(!trivia_matches("London", &t.answer));
        assert!(parse_trivia("QUESTION: only").is_none());
    }

    #[test]
    fn local_riddle_comes_from_pool() {
        let mut rng = StdRng::seed_from_u64(1);
        let r = local_riddle(&mut rng);
        assert!(!r.from_ai);
        assert!(LOCAL_RIDDLES.iter().any(|(q, a)| *q == r.question && *a == r.answer));
    }

    #[test]
    fn rps_rules() {
        assert_eq!(rps(Hand::Rock, Hand::Scissors), RpsResult::UserWins);
        assert_eq!(rps(Hand::Rock, Hand::Paper), RpsResult::BotWins);
        assert_eq!(rps(Hand::Paper, Hand::Paper), RpsResult::Tie);
        assert!(rps_summary_html(Hand::Rock, Hand::Paper, "Hinata").contains("Hinata Won!"));
    }

    #[test]
    fn slot_outcomes() {
        assert_eq!(slot_outcome(["7️⃣", "7️⃣", "7️⃣"]), SlotOutcome::Jackpot);
        assert_eq!(slot_outcome(["🍒", "🍋", "🍒"]), SlotOutcome::TwoOfAKind);
        assert_eq!(slot_outcome(["🍒", "🍋", "🔔"]), SlotOutcome::Lose);
    }

    #[test]
    fn prompts_follow_the_expected_format() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(riddle_prompt(&mut rng).contains("RIDDLE: [text] ANSWER:"));
        let (difficulty, prompt) = trivia_prompt(&mut rng);
        assert!(prompt.contains(difficulty));
        assert_eq!(TodMode::from_slug("dare"), Some(TodMode::Dare));
        assert!(TodMode::Truth.prompt().contains("truth"));
    }
}
