//! Games: two-player tic-tac-toe sessions and the single-player minigames.

pub mod minigames;
pub mod store;
pub mod tictactoe;

pub use store::{GameStore, Played};
pub use tictactoe::{
    check_win, Board, Cell, GameStatus, Mark, MoveResult, Player, Rejection, TicTacToe,
};
