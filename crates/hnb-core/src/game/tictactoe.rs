use std::fmt;

use crate::domain::UserId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mark {
    Cross,
    Nought,
}

impl Mark {
    pub fn symbol(self) -> &'static str {
        match self {
            Mark::Cross => "❌",
            Mark::Nought => "⭕",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Mark(Mark),
}

pub const WINNING_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Board(pub [Cell; 9]);

impl Board {
    pub fn cell(&self, idx: usize) -> Option<Cell> {
        self.0.get(idx).copied()
    }

    pub fn is_full(&self) -> bool {
        self.0.iter().all(|c| *c != Cell::Empty)
    }
}

/// True iff some row, column or diagonal holds three identical marks.
pub fn check_win(board: &Board) -> bool {
    WINNING_LINES.iter().any(|[a, b, c]| {
        let first = board.0[*a];
        first != Cell::Empty && first == board.0[*b] && first == board.0[*c]
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Player {
    pub id: UserId,
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameStatus {
    Waiting,
    Active,
    Finished,
}

/// Why a join or a move was refused. The state is never touched on rejection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    UnknownGame,
    AlreadyStarted,
    SelfJoin,
    NotActive,
    NotYourTurn,
    CellOutOfRange,
    CellTaken,
}

impl Rejection {
    /// Alert text shown on the button press.
    pub fn message(self) -> &'static str {
        match self {
            Rejection::UnknownGame => "⚠️ Game expired or ended.",
            Rejection::AlreadyStarted => "⚠️ Game already started!",
            Rejection::SelfJoin => "⚠️ You created this game!",
            Rejection::NotActive => "⚠️ Game not active.",
            Rejection::NotYourTurn => "🚫 It's not your turn!",
            Rejection::CellOutOfRange => "⚠️ Invalid cell.",
            Rejection::CellTaken => "⚠️ Spot taken!",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MoveResult {
    Won {
        winner: Player,
        loser: Player,
        mark: Mark,
    },
    Draw,
    Continue,
}

impl MoveResult {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, MoveResult::Continue)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TicTacToe {
    pub player_one: Player,
    pub player_two: Option<Player>,
    pub board: Board,
    pub turn: UserId,
    pub status: GameStatus,
}

impl TicTacToe {
    pub fn new(player_one: Player) -> Self {
        Self {
            turn: player_one.id,
            player_one,
            player_two: None,
            board: Board::default(),
            status: GameStatus::Waiting,
        }
    }

    pub fn join(&mut self, player: Player) -> Result<(), Rejection> {
        if self.status != GameStatus::Waiting {
            return Err(Rejection::AlreadyStarted);
        }
        if player.id == self.player_one.id {
            return Err(Rejection::SelfJoin);
        }
        self.player_two = Some(player);
        self.status = GameStatus::Active;
        self.turn = self.player_one.id;
        Ok(())
    }

    pub fn play(&mut self, user: UserId, cell: usize) -> Result<MoveResult, Rejection> {
        if self.status != GameStatus::Active {
            return Err(Rejection::NotActive);
        }
        let Some(player_two) = self.player_two.clone() else {
            return Err(Rejection::NotActive);
        };
        if user != self.turn {
            return Err(Rejection::NotYourTurn);
        }
        match self.board.cell(cell) {
            None => return Err(Rejection::CellOutOfRange),
            Some(Cell::Mark(_)) => return Err(Rejection::CellTaken),
            Some(Cell::Empty) => {}
        }

        let mark = self.mark_of(user).ok_or(Rejection::NotYourTurn)?;
        self.board.0[cell] = Cell::Mark(mark);

        if check_win(&self.board) {
            self.status = GameStatus::Finished;
            let (winner, loser) = if user == self.player_one.id {
                (self.player_one.clone(), player_two)
            } else {
                (player_two, self.player_one.clone())
            };
            return Ok(MoveResult::Won {
                winner,
                loser,
                mark,
            });
        }
        if self.board.is_full() {
            self.status = GameStatus::Finished;
            return Ok(MoveResult::Draw);
        }

        self.turn = if user == self.player_one.id {
            player_two.id
        } else {
            self.player_one.id
        };
        Ok(MoveResult::Continue)
    }

    pub fn mark_of(&self, user: UserId) -> Option<Mark> {
        if user == self.player_one.id {
            return Some(Mark::Cross);
        }
        match &self.player_two {
            Some(p) if p.id == user => Some(Mark::Nought),
            _ => None,
        }
    }

    /// The player whose turn it is.
    pub fn current_player(&self) -> &Player {
        match &self.player_two {
            Some(p) if p.id == self.turn => p,
            _ => &self.player_one,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(id: i64, name: &str) -> Player {
        Player {
            id: UserId(id),
            name: name.to_string(),
        }
    }

    fn active() -> TicTacToe {
        let mut g = TicTacToe::new(p(1, "Ann"));
        g.join(p(2, "Bob")).unwrap();
        g
    }

    fn board(marks: &str) -> Board {
        let mut b = Board::default();
        for (i, ch) in marks.chars().enumerate() {
            b.0[i] = match ch {
                'X' => Cell::Mark(Mark::Cross),
                'O' => Cell::Mark(Mark::Nought),
                _ => Cell::Empty,
            };
        }
        b
    }

    #[test]
    fn empty_board_has_no_win() {
        assert!(!check_win(&Board::default()));
    }

    #[test]
    fn top_row_wins() {
        assert!(check_win(&board("XXX......")));
        assert!(check_win(&board("O...O...O")));
        assert!(check_win(&board("..X.X.X..")));
        assert!(!check_win(&board("XXO......")));
    }

    #[test]
    fn join_activates_and_player_one_starts() {
        let g = active();
        assert_eq!(g.status, GameStatus::Active);
        assert_eq!(g.turn, UserId(1));
        assert_eq!(g.current_player().name, "Ann");
    }

    #[test]
    fn self_join_is_rejected_and_game_keeps_waiting() {
        let mut g = TicTacToe::new(p(1, "Ann"));
        assert_eq!(g.join(p(1, "Ann")), Err(Rejection::SelfJoin));
        assert_eq!(g.status, GameStatus::Waiting);
        assert!(g.player_two.is_none());
    }

    #[test]
    fn third_player_cannot_join() {
        let mut g = active();
        assert_eq!(g.join(p(3, "Cid")), Err(Rejection::AlreadyStarted));
    }

    #[test]
    fn illegal_moves_leave_state_untouched() {
        let mut waiting = TicTacToe::new(p(1, "Ann"));
        assert_eq!(waiting.play(UserId(1), 0), Err(Rejection::NotActive));

        let mut g = active();
        let before = g.clone();
        assert_eq!(g.play(UserId(2), 0), Err(Rejection::NotYourTurn));
        assert_eq!(g.play(UserId(1), 9), Err(Rejection::CellOutOfRange));
        assert_eq!(g, before);

        g.play(UserId(1), 4).unwrap();
        let before = g.clone();
        assert_eq!(g.play(UserId(2), 4), Err(Rejection::CellTaken));
        assert_eq!(g, before);
    }

    #[test]
    fn turns_alternate_and_marks_follow_players() {
        let mut g = active();
        assert_eq!(g.play(UserId(1), 0), Ok(MoveResult::Continue));
        assert_eq!(g.turn, UserId(2));
        assert_eq!(g.play(UserId(2), 3), Ok(MoveResult::Continue));
        assert_eq!(g.board.cell(0), Some(Cell::Mark(Mark::Cross)));
        assert_eq!(g.board.cell(3), Some(Cell::Mark(Mark::Nought)));
        assert_eq!(g.turn, UserId(1));
    }

    #[test]
    fn three_in_a_row_wins() {
        let mut g = active();
        for (user, cell) in [(1, 0), (2, 3), (1, 1), (2, 4)] {
            g.play(UserId(user), cell).unwrap();
        }
        let out = g.play(UserId(1), 2).unwrap();
        assert_eq!(
            out,
            MoveResult::Won {
                winner: p(1, "Ann"),
                loser: p(2, "Bob"),
                mark: Mark::Cross,
            }
        );
        assert_eq!(g.status, GameStatus::Finished);
        assert_eq!(g.play(UserId(2), 5), Err(Rejection::NotActive));
    }

    #[test]
    fn full_board_without_line_is_a_draw() {
        // X O X
        // X O O
        // O X X
        let mut g = active();
        let moves = [(1, 0), (2, 1), (1, 2), (2, 4), (1, 3), (2, 5), (1, 7), (2, 6)];
        for (user, cell) in moves {
            assert_eq!(g.play(UserId(user), cell), Ok(MoveResult::Continue));
        }
        assert_eq!(g.play(UserId(1), 8), Ok(MoveResult::Draw));
        assert!(!check_win(&g.board));
        assert_eq!(g.status, GameStatus::Finished);
    }
}
