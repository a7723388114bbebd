//! One way queue between the game loop and the durable store. Gameplay
//! handlers enqueue jobs and move on, a single worker owns the store and
//! logs failures. Only game creation reports its result back, through a
//! oneshot carried in the job.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};

use crate::app::{
    errors::DbError,
    server::storage::{
        interface::{
            game::GameInterface, lobby::LobbyInterface, round::RoundInterface,
            stats::StatsInterface,
        },
        models, Store,
    },
};

pub enum PersistJob {
    CreateLobby(models::LobbyRecord),
    TouchLobby {
        room_id: String,
    },
    SetLobbyStatus {
        room_id: String,
        status: models::LobbyStatus,
        game_id: Option<String>,
    },
    SetLobbyPlayers {
        room_id: String,
        user_ids: Vec<String>,
    },
    CreateGame {
        game: models::GameRecord,
        reply: oneshot::Sender<Result<(), DbError>>,
    },
    SetGameStatus {
        game_id: String,
        status: models::GameStatus,
    },
    FinishGame {
        game_id: String,
        winner_id: Option<String>,
        rounds_played: u32,
        final_scores: HashMap<String, i32>,
    },
    CreateRound(models::RoundRecord),
    RecordRoundResult {
        round_id: String,
        average: f64,
        winning_number: f64,
        winner_id: String,
    },
    CompleteRound {
        round_id: String,
        eliminated_user_ids: Vec<String>,
    },
    InsertChoice(models::ChoiceRecord),
    BumpStats {
        user_id: String,
        delta: models::StatsDelta,
    },
}

impl PersistJob {
    fn name(&self) -> &'static str {
        match self {
            PersistJob::CreateLobby(_) => "create_lobby",
            PersistJob::TouchLobby { .. } => "touch_lobby",
            PersistJob::SetLobbyStatus { .. } => "set_lobby_status",
            PersistJob::SetLobbyPlayers { .. } => "set_lobby_players",
            PersistJob::CreateGame { .. } => "create_game",
            PersistJob::SetGameStatus { .. } => "set_game_status",
            PersistJob::FinishGame { .. } => "finish_game",
            PersistJob::CreateRound(_) => "create_round",
            PersistJob::RecordRoundResult { .. } => "record_round_result",
            PersistJob::CompleteRound { .. } => "complete_round",
            PersistJob::InsertChoice(_) => "insert_choice",
            PersistJob::BumpStats { .. } => "bump_stats",
        }
    }
}

#[derive(Clone)]
pub struct PersistHandle {
    tx: mpsc::UnboundedSender<PersistJob>,
}

impl PersistHandle {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PersistJob>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Fire and forget. A closed outbox is logged and the job dropped, the
    /// in-memory game never waits on the store.
    pub fn enqueue(&self, job: PersistJob) {
        let job_name = job.name();
        if self.tx.send(job).is_err() {
            tracing::warn!(job_name, "persistence outbox closed, dropping job");
        }
    }

    /// Game creation is the one durable write gameplay waits for, a game
    /// without a record must not start.
    pub async fn create_game(&self, game: models::GameRecord) -> Result<(), DbError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.enqueue(PersistJob::CreateGame {
            game,
            reply: reply_tx,
        });

        match reply_rx.await {
            Ok(result) => result,
            Err(_) => Err(DbError::Others(fred::error::RedisError::new(
                fred::error::RedisErrorKind::Unknown,
                "persistence outbox unavailable",
            ))),
        }
    }
}

pub fn spawn_outbox(store: Store) -> PersistHandle {
    let (handle, rx) = PersistHandle::channel();
    tokio::spawn(run_outbox(store, rx));
    handle
}

pub async fn run_outbox(store: Store, mut rx: mpsc::UnboundedReceiver<PersistJob>) {
    while let Some(job) = rx.recv().await {
        let job_name = job.name();
        if let Err(db_error) = handle_job(&store, job).await {
            tracing::error!(job_name, ?db_error, "durable write failed");
        }
    }
}

async fn handle_job(store: &Store, job: PersistJob) -> Result<(), DbError> {
    match job {
        PersistJob::CreateLobby(lobby) => {
            store.insert_lobby(lobby).await?;
        }
        PersistJob::TouchLobby { room_id } => {
            let mut lobby = store.find_lobby(&room_id).await?;
            lobby.touch();
            store.update_lobby(lobby).await?;
        }
        PersistJob::SetLobbyStatus {
            room_id,
            status,
            game_id,
        } => {
            let mut lobby = store.find_lobby(&room_id).await?;
            lobby.status = status;
            lobby.game_id = game_id;
            lobby.touch();
            store.update_lobby(lobby).await?;
        }
        PersistJob::SetLobbyPlayers { room_id, user_ids } => {
            let mut lobby = store.find_lobby(&room_id).await?;
            lobby.pending_user_ids = user_ids;
            lobby.touch();
            store.update_lobby(lobby).await?;
        }
        PersistJob::CreateGame { game, reply } => {
            let result = store.insert_game(game).await.map(|_| ());
            // the requester may have timed out and gone away
            let _ = reply.send(result);
        }
        PersistJob::SetGameStatus { game_id, status } => {
            let mut game = store.find_game(&game_id).await?;
            game.game_status = status;
            store.update_game(game).await?;
        }
        PersistJob::FinishGame {
            game_id,
            winner_id,
            rounds_played,
            final_scores,
        } => {
            let mut game = store.find_game(&game_id).await?;
            game.game_status = models::GameStatus::End;
            game.winner_id = winner_id;
            game.rounds_played = rounds_played;
            game.final_scores = final_scores;
            store.update_game(game).await?;
        }
        PersistJob::CreateRound(round) => {
            store.insert_round(round).await?;
        }
        PersistJob::RecordRoundResult {
            round_id,
            average,
            winning_number,
            winner_id,
        } => {
            let mut round = store.find_round(&round_id).await?;
            round.average = average;
            round.winning_number = winning_number;
            round.winner_id = Some(winner_id);
            store.update_round(round).await?;
        }
        PersistJob::CompleteRound {
            round_id,
            eliminated_user_ids,
        } => {
            let mut round = store.find_round(&round_id).await?;
            round.eliminated_user_ids = eliminated_user_ids;
            round.completed = true;
            store.update_round(round).await?;
        }
        PersistJob::InsertChoice(choice) => {
            store.insert_choice(choice).await?;
        }
        PersistJob::BumpStats { user_id, delta } => {
            store.increment_user_stats(&user_id, delta).await?;
        }
    }

    Ok(())
}
