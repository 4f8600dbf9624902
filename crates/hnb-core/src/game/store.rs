use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::{
    domain::{MessageRef, UserId},
    expiring::ExpiringMap,
    game::tictactoe::{MoveResult, Player, Rejection, TicTacToe},
};

/// Result of an accepted move: the board after the move and what it led to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Played {
    pub game: TicTacToe,
    pub outcome: MoveResult,
}

/// Tic-tac-toe sessions keyed by the message that hosts the board.
pub struct GameStore {
    inner: Mutex<ExpiringMap<MessageRef, TicTacToe>>,
}

impl GameStore {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(ExpiringMap::new(idle_ttl)),
        }
    }

    pub async fn create(&self, id: MessageRef, player_one: Player) -> TicTacToe {
        let game = TicTacToe::new(player_one);
        self.inner.lock().await.put(id, game.clone());
        game
    }

    pub async fn join(&self, id: MessageRef, player: Player) -> Result<TicTacToe, Rejection> {
        let mut map = self.inner.lock().await;
        let game = map.get_mut(&id).ok_or(Rejection::UnknownGame)?;
        game.join(player)?;
        Ok(game.clone())
    }

    /// Apply a move. Finished games leave the store.
    pub async fn play(&self, id: MessageRef, user: UserId, cell: usize) -> Result<Played, Rejection> {
        self.play_at(id, user, cell, Instant::now()).await
    }

    pub async fn play_at(
        &self,
        id: MessageRef,
        user: UserId,
        cell: usize,
        now: Instant,
    ) -> Result<Played, Rejection> {
        let mut map = self.inner.lock().await;
        let game = map.get_mut_at(&id, now).ok_or(Rejection::UnknownGame)?;
        let outcome = game.play(user, cell)?;
        let game = game.clone();
        if outcome.is_terminal() {
            map.remove_at(&id, now);
        }
        Ok(Played { game, outcome })
    }

    pub async fn get(&self, id: MessageRef) -> Option<TicTacToe> {
        self.inner.lock().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: MessageRef) -> Option<TicTacToe> {
        self.inner.lock().await.remove(&id)
    }

    pub async fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Instant::now()).await
    }

    pub async fn sweep_expired_at(&self, now: Instant) -> usize {
        self.inner.lock().await.sweep_expired_at(now)
    }

    pub async fn create_at(&self, id: MessageRef, player_one: Player, now: Instant) -> TicTacToe {
        let game = TicTacToe::new(player_one);
        self.inner.lock().await.put_at(id, game.clone(), now);
        game
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatId, MessageId};
    use crate::game::tictactoe::GameStatus;

    fn id(msg: i32) -> MessageRef {
        MessageRef {
            chat_id: ChatId(-100),
            message_id: MessageId(msg),
        }
    }

    fn p(uid: i64, name: &str) -> Player {
        Player {
            id: UserId(uid),
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn unknown_ids_are_rejected() {
        let store = GameStore::new(Duration::from_secs(60));
        assert_eq!(store.join(id(1), p(2, "Bob")).await, Err(Rejection::UnknownGame));
        assert_eq!(
            store.play(id(1), UserId(1), 0).await,
            Err(Rejection::UnknownGame)
        );
    }

    #[tokio::test]
    async fn games_are_independent_per_message() {
        let store = GameStore::new(Duration::from_secs(60));
        store.create(id(1), p(1, "Ann")).await;
        store.create(id(2), p(1, "Ann")).await;

        store.join(id(1), p(2, "Bob")).await.unwrap();
        assert_eq!(store.get(id(1)).await.unwrap().status, GameStatus::Active);
        assert_eq!(store.get(id(2)).await.unwrap().status, GameStatus::Waiting);
    }

    #[tokio::test]
    async fn win_removes_the_game() {
        let store = GameStore::new(Duration::from_secs(60));
        store.create(id(7), p(1, "Ann")).await;
        store.join(id(7), p(2, "Bob")).await.unwrap();

        for (user, cell) in [(1, 0), (2, 3), (1, 1), (2, 4)] {
            let played = store.play(id(7), UserId(user), cell).await.unwrap();
            assert_eq!(played.outcome, MoveResult::Continue);
        }
        let last = store.play(id(7), UserId(1), 2).await.unwrap();
        assert!(matches!(last.outcome, MoveResult::Won { .. }));
        assert_eq!(last.game.status, GameStatus::Finished);

        assert!(store.get(id(7)).await.is_none());
        assert_eq!(
            store.play(id(7), UserId(2), 5).await,
            Err(Rejection::UnknownGame)
        );
    }

    #[tokio::test]
    async fn draw_removes_the_game() {
        let store = GameStore::new(Duration::from_secs(60));
        store.create(id(8), p(1, "Ann")).await;
        store.join(id(8), p(2, "Bob")).await.unwrap();

        let moves = [(1, 0), (2, 1), (1, 2), (2, 4), (1, 3), (2, 5), (1, 7), (2, 6)];
        for (user, cell) in moves {
            let played = store.play(id(8), UserId(user), cell).await.unwrap();
            assert_eq!(played.outcome, MoveResult::Continue);
        }
        let last = store.play(id(8), UserId(1), 8).await.unwrap();
        assert_eq!(last.outcome, MoveResult::Draw);
        assert_eq!(last.game.status, GameStatus::Finished);

        assert!(store.get(id(8)).await.is_none());
        assert_eq!(
            store.play(id(8), UserId(2), 8).await,
            Err(Rejection::UnknownGame)
        );
    }

    #[tokio::test]
    async fn rejected_move_keeps_the_game() {
        let store = GameStore::new(Duration::from_secs(60));
        store.create(id(3), p(1, "Ann")).await;
        store.join(id(3), p(2, "Bob")).await.unwrap();

        assert_eq!(
            store.play(id(3), UserId(2), 0).await,
            Err(Rejection::NotYourTurn)
        );
        assert!(store.get(id(3)).await.is_some());
    }

    #[tokio::test]
    async fn idle_games_are_evicted() {
        let store = GameStore::new(Duration::from_secs(10));
        let start = Instant::now();
        store.create_at(id(4), p(1, "Ann"), start).await;

        assert_eq!(store.sweep_expired_at(start + Duration::from_secs(5)).await, 0);
        assert_eq!(store.sweep_expired_at(start + Duration::from_secs(11)).await, 1);
        assert_eq!(
            store.play_at(id(4), UserId(1), 0, start + Duration::from_secs(12)).await,
            Err(Rejection::UnknownGame)
        );
    }
}
