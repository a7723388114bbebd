use std::time::Duration;

use crate::app::server::{
    engine::{
        room::{Phase, Player, Room, RoundOutcome},
        rules,
    },
    errors::ApiError,
    events::{ChoiceView, ScoreDelta, ServerEvent},
    outbox::PersistJob,
    service::GameServer,
    storage::models,
};

/// Deferred room work carried by the room's single timer slot.
#[derive(Clone, Copy, Debug)]
enum PhaseTask {
    ProcessRound,
    ProcessScoring,
    NextRound,
    EndGame,
    CloseRoom,
}

/// Host starts the game. The durable game record is the one write gameplay
/// waits for, without it there is nothing to attach rounds to.
pub async fn start_game(server: &GameServer, room_id: &str, user_id: &str) -> Result<(), ApiError> {
    let user_ids = {
        let mut rooms = server.rooms.lock().unwrap();
        let room = rooms.get_mut(room_id).ok_or_else(|| ApiError::RoomNotFound {
            room_id: room_id.to_string(),
        })?;

        if room.phase != Phase::Waiting {
            return Err(ApiError::bad_request("Game has already started"));
        }
        if room.host_id != user_id {
            return Err(ApiError::NotHost);
        }

        let connected: Vec<&Player> = room
            .players
            .iter()
            .filter(|player| player.connected)
            .collect();
        if connected.len() < 3 {
            return Err(ApiError::bad_request(
                "Need at least 3 connected players to start",
            ));
        }
        if connected.iter().any(|player| !player.ready) {
            return Err(ApiError::bad_request("All players must be ready"));
        }

        connected
            .iter()
            .map(|player| player.user_id.clone())
            .collect::<Vec<_>>()
    };

    let game = models::GameRecord::new(room_id.to_string(), user_ids);
    let game_id = game.game_id.clone();
    server.persist.create_game(game).await.map_err(|db_error| {
        tracing::error!(?db_error, room_id, "could not create game record");
        ApiError::InternalServerError
    })?;

    // the room may have changed while the record was being written
    let mut rooms = server.rooms.lock().unwrap();
    let room = rooms.get_mut(room_id).ok_or_else(|| ApiError::RoomNotFound {
        room_id: room_id.to_string(),
    })?;
    if room.phase != Phase::Waiting {
        return Err(ApiError::bad_request("Game has already started"));
    }

    room.game_id = Some(game_id.clone());
    room.touch();
    server.sessions.broadcast_room(
        room,
        &ServerEvent::GameStarting {
            game_id: game_id.clone(),
        },
    );
    server.persist.enqueue(PersistJob::SetLobbyStatus {
        room_id: room_id.to_string(),
        status: models::LobbyStatus::Playing,
        game_id: Some(game_id),
    });

    start_round(server, room);
    Ok(())
}

/// Reset submission state, recompute rules, open the submission window and
/// start the countdown. The round record is written best-effort.
pub(crate) fn start_round(server: &GameServer, room: &mut Room) {
    for player in room
        .players
        .iter_mut()
        .filter(|player| !player.eliminated)
    {
        player.has_submitted = false;
        player.current_choice = None;
    }

    room.active_rules = rules::active_rules(room.elimination_count);
    room.phase = Phase::Submission;
    room.time_remaining = room.round_duration_secs;
    room.pending_round = None;
    room.touch();

    let game_id = room.game_id.clone().unwrap_or_default();
    if room.round == 1 {
        server.persist.enqueue(PersistJob::SetGameStatus {
            game_id: game_id.clone(),
            status: models::GameStatus::InProgress,
        });
    }

    let round_record = models::RoundRecord::new(game_id, room.round);
    room.current_round_id = Some(round_record.round_id.clone());

    tracing::info!(
        room_id = %room.room_id,
        round = room.round,
        rules = ?room.active_rules,
        "round started"
    );

    server.sessions.broadcast_room(
        room,
        &ServerEvent::RoundStart {
            round: room.round,
            rules: room.active_rules.clone(),
            duration: room.round_duration_secs,
            players: room.players.iter().map(Player::view).collect(),
        },
    );
    server.persist.enqueue(PersistJob::CreateRound(round_record));

    start_countdown(server, room);
}

fn start_countdown(server: &GameServer, room: &mut Room) {
    let server = server.clone();
    let room_id = room.room_id.clone();
    let round = room.round;

    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        // the first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;

            let remaining = {
                let mut rooms = server.rooms.lock().unwrap();
                match rooms.get_mut(&room_id) {
                    Some(room) if room.phase == Phase::Submission && room.round == round => {
                        room.time_remaining = room.time_remaining.saturating_sub(1);
                        server.sessions.broadcast_room(
                            room,
                            &ServerEvent::TimerUpdate {
                                remaining: room.time_remaining,
                            },
                        );
                        Some(room.time_remaining)
                    }
                    _ => None,
                }
            };

            match remaining {
                Some(0) => {
                    process_round(&server, &room_id);
                    break;
                }
                Some(_) => {}
                None => break,
            }
        }
    });

    room.replace_timer(handle);
}

pub fn submit_number(
    server: &GameServer,
    room_id: &str,
    user_id: &str,
    number: i64,
) -> Result<(), ApiError> {
    let mut rooms = server.rooms.lock().unwrap();
    let room = rooms.get_mut(room_id).ok_or_else(|| ApiError::RoomNotFound {
        room_id: room_id.to_string(),
    })?;

    if room.phase != Phase::Submission {
        return Err(ApiError::bad_request("Not accepting numbers right now"));
    }

    let locked = room.locked_submissions();
    let active_rules = room.active_rules.clone();

    let player = room
        .find_player_mut(user_id)
        .ok_or_else(|| ApiError::PlayerNotFound {
            user_id: user_id.to_string(),
        })?;
    if player.eliminated {
        return Err(ApiError::bad_request("Eliminated players cannot submit"));
    }
    if !player.connected {
        return Err(ApiError::bad_request("Player is not connected"));
    }
    if player.has_submitted {
        return Err(ApiError::bad_request(
            "Number already locked in for this round",
        ));
    }

    let choice = rules::validate_choice(number, &locked, &active_rules)
        .map_err(|choice_error| ApiError::bad_request(choice_error.to_string()))?;

    player.current_choice = Some(choice);
    player.has_submitted = true;
    let user_name = player.user_name.clone();
    room.touch();

    // identity only, the value stays hidden until the reveal
    server.sessions.broadcast_room(
        room,
        &ServerEvent::PlayerSubmitted {
            user_id: user_id.to_string(),
            user_name,
        },
    );
    server
        .sessions
        .send_to_user(user_id, ServerEvent::SubmissionConfirmed { number: choice });

    if let Some(round_id) = room.current_round_id.clone() {
        server
            .persist
            .enqueue(PersistJob::InsertChoice(models::ChoiceRecord::new(
                round_id,
                user_id.to_string(),
                choice,
            )));
    }

    let all_submitted = room
        .players
        .iter()
        .filter(|player| player.connected && !player.eliminated)
        .all(|player| player.has_submitted);
    if all_submitted {
        // cancel the countdown and let the submitted notice land client
        // side before the reveal
        schedule_phase_task(
            server,
            room,
            server.tunables.all_submitted_delay_ms,
            PhaseTask::ProcessRound,
        );
    }

    Ok(())
}

/// Close the submission window, compute the round result and move to the
/// reveal. With nobody left to score the game ends as abandoned.
pub(crate) fn process_round(server: &GameServer, room_id: &str) {
    let mut rooms = server.rooms.lock().unwrap();
    let Some(room) = rooms.get_mut(room_id) else {
        return;
    };
    if room.phase != Phase::Submission {
        return;
    }

    let submissions = room.collect_submissions();
    if submissions.is_empty() || room.connected_active_count() == 0 {
        tracing::info!(room_id, "no eligible submissions, ending game early");
        end_game(server, room);
        return;
    }

    let choices: Vec<u8> = submissions.iter().map(|submission| submission.choice).collect();
    let sum: u32 = choices.iter().map(|choice| u32::from(*choice)).sum();
    let average = f64::from(sum) / choices.len() as f64;
    let winning_number = rules::winning_number(&choices);
    let exact_match = rules::has_exact_match(&submissions, winning_number);

    let winner_id = {
        let special = if room.active_rules.contains(&rules::RULE_ZERO_HUNDRED) {
            rules::special_winner(&submissions)
        } else {
            None
        };
        match special.or_else(|| rules::pick_winner(&submissions, winning_number)) {
            Some(winner) => winner.user_id.clone(),
            None => return,
        }
    };

    let choice_views: Vec<ChoiceView> = submissions
        .iter()
        .map(|submission| ChoiceView {
            user_id: submission.user_id.clone(),
            user_name: room
                .find_player(&submission.user_id)
                .map(|player| player.user_name.clone())
                .unwrap_or_default(),
            choice: submission.choice,
        })
        .collect();

    let outcome = RoundOutcome {
        round_id: room.current_round_id.clone().unwrap_or_default(),
        submissions,
        average,
        winning_number,
        winner_id: winner_id.clone(),
        exact_match,
    };

    room.phase = Phase::Reveal;
    room.touch();

    server.sessions.broadcast_room(
        room,
        &ServerEvent::RoundReveal {
            round: room.round,
            choices: choice_views,
            average,
            winning_number,
            winner_id: winner_id.clone(),
        },
    );
    server.persist.enqueue(PersistJob::RecordRoundResult {
        round_id: outcome.round_id.clone(),
        average,
        winning_number,
        winner_id,
    });

    room.pending_round = Some(outcome);
    schedule_phase_task(
        server,
        room,
        server.tunables.reveal_delay_ms,
        PhaseTask::ProcessScoring,
    );
}

/// Apply score deltas, detect eliminations and unlock rules. The broadcast
/// goes out before any durable write is even enqueued.
pub(crate) fn process_scoring(server: &GameServer, room_id: &str) {
    let mut rooms = server.rooms.lock().unwrap();
    let Some(room) = rooms.get_mut(room_id) else {
        return;
    };
    if room.phase != Phase::Reveal {
        return;
    }
    let Some(outcome) = room.pending_round.take() else {
        return;
    };

    let active_ids: Vec<String> = room
        .players
        .iter()
        .filter(|player| !player.eliminated)
        .map(|player| player.user_id.clone())
        .collect();
    let double_penalty =
        room.active_rules.contains(&rules::RULE_EXACT_DOUBLE) && outcome.exact_match;
    let deltas = rules::score_deltas(&active_ids, &outcome.winner_id, double_penalty);

    let mut delta_views = Vec::new();
    for player in room.players.iter_mut() {
        if let Some(delta) = deltas.get(&player.user_id) {
            player.score += delta;
            delta_views.push(ScoreDelta {
                user_id: player.user_id.clone(),
                delta: *delta,
                score: player.score,
            });
        }
    }

    let round = room.round;
    let mut newly_eliminated = Vec::new();
    for player in room.players.iter_mut() {
        if !player.eliminated && player.score <= rules::ELIMINATION_FLOOR {
            player.eliminated = true;
            player.eliminated_round = Some(round);
            newly_eliminated.push(player.user_id.clone());
        }
    }
    room.elimination_count += newly_eliminated.len() as u32;

    let updated_rules = rules::active_rules(room.elimination_count);
    let unlocked_rules: Vec<u8> = updated_rules
        .iter()
        .copied()
        .filter(|rule| !room.active_rules.contains(rule))
        .collect();
    room.active_rules = updated_rules;

    room.phase = Phase::Scoring;
    room.touch();

    if !newly_eliminated.is_empty() {
        tracing::info!(
            room_id,
            eliminated = ?newly_eliminated,
            elimination_count = room.elimination_count,
            "players eliminated"
        );
    }

    server.sessions.broadcast_room(
        room,
        &ServerEvent::RoundScored {
            deltas: delta_views,
            eliminated: newly_eliminated.clone(),
            unlocked_rules,
        },
    );
    server.persist.enqueue(PersistJob::CompleteRound {
        round_id: outcome.round_id,
        eliminated_user_ids: newly_eliminated,
    });

    if rules::is_game_over(&room.players) {
        schedule_phase_task(
            server,
            room,
            server.tunables.game_over_delay_ms,
            PhaseTask::EndGame,
        );
    } else {
        room.round += 1;
        schedule_phase_task(
            server,
            room,
            server.tunables.next_round_delay_ms,
            PhaseTask::NextRound,
        );
    }
}

pub(crate) fn end_game(server: &GameServer, room: &mut Room) {
    room.phase = Phase::Finished;
    room.touch();

    let survivors: Vec<&Player> = room
        .players
        .iter()
        .filter(|player| !player.eliminated)
        .collect();
    let winner_id = if survivors.len() == 1 {
        Some(survivors[0].user_id.clone())
    } else {
        None
    };

    let standings = rules::standings(&room.players)
        .into_iter()
        .map(Player::view)
        .collect();

    tracing::info!(room_id = %room.room_id, ?winner_id, rounds = room.round, "game over");

    server.sessions.broadcast_room(
        room,
        &ServerEvent::GameOver {
            standings,
            winner_id: winner_id.clone(),
        },
    );

    if let Some(game_id) = room.game_id.clone() {
        let final_scores = room
            .players
            .iter()
            .map(|player| (player.user_id.clone(), player.score))
            .collect();
        server.persist.enqueue(PersistJob::FinishGame {
            game_id,
            winner_id: winner_id.clone(),
            rounds_played: room.round,
            final_scores,
        });
    }

    // lifetime statistics only count for identifiable accounts
    for player in room.players.iter().filter(|player| !player.is_guest()) {
        let rounds_survived = match player.eliminated_round {
            Some(eliminated_round) => i64::from(eliminated_round.saturating_sub(1)),
            None => i64::from(room.round),
        };
        let games_won = if winner_id.as_deref() == Some(player.user_id.as_str()) {
            1
        } else {
            0
        };

        server.persist.enqueue(PersistJob::BumpStats {
            user_id: player.user_id.clone(),
            delta: models::StatsDelta {
                games_played: 1,
                games_won,
                rounds_played: i64::from(room.round),
                rounds_survived,
            },
        });
    }

    schedule_phase_task(
        server,
        room,
        server.tunables.room_close_delay_ms,
        PhaseTask::CloseRoom,
    );
}

/// Drop the finished room and reset its durable lobby so the code can host
/// a fresh game.
fn close_room(server: &GameServer, room_id: &str) {
    let mut rooms = server.rooms.lock().unwrap();
    if rooms.delete_room(room_id).is_some() {
        tracing::info!(room_id, "closed finished room");
        server.persist.enqueue(PersistJob::SetLobbyStatus {
            room_id: room_id.to_string(),
            status: models::LobbyStatus::Waiting,
            game_id: None,
        });
        server.persist.enqueue(PersistJob::SetLobbyPlayers {
            room_id: room_id.to_string(),
            user_ids: Vec::new(),
        });
    }
}

/// Park the next transition on the room's timer slot, aborting whatever
/// was scheduled before it.
fn schedule_phase_task(server: &GameServer, room: &mut Room, delay_ms: u64, task: PhaseTask) {
    let server = server.clone();
    let room_id = room.room_id.clone();

    let handle = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        run_phase_task(&server, &room_id, task);
    });

    room.replace_timer(handle);
}

fn run_phase_task(server: &GameServer, room_id: &str, task: PhaseTask) {
    match task {
        PhaseTask::ProcessRound => process_round(server, room_id),
        PhaseTask::ProcessScoring => process_scoring(server, room_id),
        PhaseTask::NextRound => {
            let mut rooms = server.rooms.lock().unwrap();
            if let Some(room) = rooms.get_mut(room_id) {
                if room.phase == Phase::Scoring {
                    start_round(server, room);
                }
            }
        }
        PhaseTask::EndGame => {
            let mut rooms = server.rooms.lock().unwrap();
            if let Some(room) = rooms.get_mut(room_id) {
                if room.phase == Phase::Scoring {
                    end_game(server, room);
                }
            }
        }
        PhaseTask::CloseRoom => close_room(server, room_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{
        server::{outbox::PersistHandle, sessions::Sessions},
        types::GameConfig,
    };

    fn fast_config() -> GameConfig {
        GameConfig {
            all_submitted_delay_ms: 10,
            reveal_delay_ms: 10,
            next_round_delay_ms: 10,
            game_over_delay_ms: 10,
            room_close_delay_ms: 50,
            ..GameConfig::default()
        }
    }

    /// Server with the outbox drained by a stub that approves every game
    /// creation, no redis involved.
    fn test_server() -> GameServer {
        let (persist, mut rx) = PersistHandle::channel();
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                if let PersistJob::CreateGame { reply, .. } = job {
                    let _ = reply.send(Ok(()));
                }
            }
        });
        GameServer::new(Sessions::new(), persist, fast_config())
    }

    fn seed_room(server: &GameServer, room_id: &str, player_ids: &[&str]) {
        let mut room = Room::new(
            room_id.to_string(),
            "test room".to_string(),
            player_ids[0].to_string(),
            8,
            60,
            None,
        );
        for player_id in player_ids {
            let mut player = Player::new(player_id.to_string(), player_id.to_string(), None);
            player.ready = true;
            room.players.push(player);

            let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
            server.sessions.insert_channel(player_id, tx);
        }
        server.rooms.lock().unwrap().insert_room(room);
    }

    fn set_phase(server: &GameServer, room_id: &str, phase: Phase) {
        let mut rooms = server.rooms.lock().unwrap();
        rooms.get_mut(room_id).unwrap().phase = phase;
    }

    #[tokio::test]
    async fn start_game_requires_the_host() {
        let server = test_server();
        seed_room(&server, "100001", &["user_a", "user_b", "user_c"]);

        let result = start_game(&server, "100001", "user_b").await;
        assert!(matches!(result, Err(ApiError::NotHost)));

        let result = start_game(&server, "100001", "user_a").await;
        assert!(result.is_ok());

        let rooms = server.rooms.lock().unwrap();
        let room = rooms.get("100001").unwrap();
        assert_eq!(room.phase, Phase::Submission);
        assert!(room.game_id.is_some());
        assert_eq!(room.time_remaining, 60);
    }

    #[tokio::test]
    async fn start_game_needs_three_ready_players() {
        let server = test_server();
        seed_room(&server, "100001", &["user_a", "user_b"]);

        let result = start_game(&server, "100001", "user_a").await;
        assert!(result.is_err());

        seed_room(&server, "100002", &["user_d", "user_e", "user_f"]);
        {
            let mut rooms = server.rooms.lock().unwrap();
            let room = rooms.get_mut("100002").unwrap();
            room.find_player_mut("user_f").unwrap().ready = false;
        }
        let result = start_game(&server, "100002", "user_d").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn submissions_are_validated_and_locked() {
        let server = test_server();
        seed_room(&server, "100001", &["user_a", "user_b", "user_c"]);
        start_game(&server, "100001", "user_a").await.unwrap();

        assert!(submit_number(&server, "100001", "user_a", 40).is_ok());
        // out of range
        assert!(submit_number(&server, "100001", "user_b", 101).is_err());
        // double submit
        assert!(submit_number(&server, "100001", "user_a", 50).is_err());
        // unknown player
        assert!(submit_number(&server, "100001", "user_x", 10).is_err());

        let rooms = server.rooms.lock().unwrap();
        let room = rooms.get("100001").unwrap();
        assert_eq!(room.find_player("user_a").unwrap().current_choice, Some(40));
    }

    #[tokio::test]
    async fn duplicate_choices_rejected_once_rule_one_is_active() {
        let server = test_server();
        seed_room(&server, "100001", &["user_a", "user_b", "user_c"]);
        {
            let mut rooms = server.rooms.lock().unwrap();
            let room = rooms.get_mut("100001").unwrap();
            room.elimination_count = 2;
        }
        start_game(&server, "100001", "user_a").await.unwrap();

        assert!(submit_number(&server, "100001", "user_a", 40).is_ok());
        assert!(submit_number(&server, "100001", "user_b", 40).is_err());
        assert!(submit_number(&server, "100001", "user_b", 41).is_ok());
    }

    #[tokio::test]
    async fn full_round_scores_and_advances() {
        let server = test_server();
        seed_room(&server, "100001", &["user_a", "user_b", "user_c"]);
        start_game(&server, "100001", "user_a").await.unwrap();

        submit_number(&server, "100001", "user_a", 10).unwrap();
        submit_number(&server, "100001", "user_b", 20).unwrap();
        submit_number(&server, "100001", "user_c", 30).unwrap();

        process_round(&server, "100001");
        {
            let rooms = server.rooms.lock().unwrap();
            let room = rooms.get("100001").unwrap();
            assert_eq!(room.phase, Phase::Reveal);
            let outcome = room.pending_round.as_ref().unwrap();
            assert_eq!(outcome.winning_number, 16.0);
            // 20 is closest to 16
            assert_eq!(outcome.winner_id, "user_b");
        }

        process_scoring(&server, "100001");
        let rooms = server.rooms.lock().unwrap();
        let room = rooms.get("100001").unwrap();
        assert_eq!(room.phase, Phase::Scoring);
        assert_eq!(room.find_player("user_a").unwrap().score, -1);
        assert_eq!(room.find_player("user_b").unwrap().score, 1);
        assert_eq!(room.find_player("user_c").unwrap().score, -1);
        // next round already lined up
        assert_eq!(room.round, 2);
    }

    #[tokio::test]
    async fn elimination_at_the_floor_is_terminal_and_unlocks_rules() {
        let server = test_server();
        seed_room(&server, "100001", &["user_a", "user_b", "user_c"]);
        start_game(&server, "100001", "user_a").await.unwrap();

        {
            let mut rooms = server.rooms.lock().unwrap();
            let room = rooms.get_mut("100001").unwrap();
            room.find_player_mut("user_a").unwrap().score = -9;
            room.find_player_mut("user_b").unwrap().score = -9;
        }

        submit_number(&server, "100001", "user_a", 10).unwrap();
        submit_number(&server, "100001", "user_b", 20).unwrap();
        submit_number(&server, "100001", "user_c", 90).unwrap();

        process_round(&server, "100001");
        process_scoring(&server, "100001");

        let rooms = server.rooms.lock().unwrap();
        let room = rooms.get("100001").unwrap();
        // winning number 32, user_b (20) wins, user_a and user_c lose one
        let user_a = room.find_player("user_a").unwrap();
        assert!(user_a.eliminated);
        assert_eq!(user_a.eliminated_round, Some(1));
        assert!(!room.find_player("user_b").unwrap().eliminated);
        assert_eq!(room.elimination_count, 1);
        // one elimination does not unlock anything yet
        assert!(room.active_rules.is_empty());
    }

    #[tokio::test]
    async fn game_ends_when_one_player_remains() {
        let server = test_server();
        seed_room(&server, "100001", &["user_a", "user_b", "user_c"]);
        start_game(&server, "100001", "user_a").await.unwrap();

        {
            let mut rooms = server.rooms.lock().unwrap();
            let room = rooms.get_mut("100001").unwrap();
            let player_a = room.find_player_mut("user_a").unwrap();
            player_a.eliminated = true;
            player_a.eliminated_round = Some(1);
            room.find_player_mut("user_b").unwrap().score = -9;
            room.elimination_count = 1;
        }

        submit_number(&server, "100001", "user_b", 80).unwrap();
        submit_number(&server, "100001", "user_c", 20).unwrap();

        process_round(&server, "100001");
        process_scoring(&server, "100001");

        {
            let rooms = server.rooms.lock().unwrap();
            let room = rooms.get("100001").unwrap();
            assert!(room.find_player("user_b").unwrap().eliminated);
        }

        // the scheduled end-of-game transition fires after the delay
        tokio::time::sleep(Duration::from_millis(50)).await;

        let rooms = server.rooms.lock().unwrap();
        let room = rooms.get("100001").unwrap();
        assert_eq!(room.phase, Phase::Finished);
    }

    #[tokio::test]
    async fn abandonment_ends_the_game_without_submissions() {
        let server = test_server();
        seed_room(&server, "100001", &["user_a", "user_b", "user_c"]);
        start_game(&server, "100001", "user_a").await.unwrap();

        {
            let mut rooms = server.rooms.lock().unwrap();
            let room = rooms.get_mut("100001").unwrap();
            for player in room.players.iter_mut() {
                player.connected = false;
            }
        }

        process_round(&server, "100001");

        let rooms = server.rooms.lock().unwrap();
        let room = rooms.get("100001").unwrap();
        assert_eq!(room.phase, Phase::Finished);
    }

    #[tokio::test]
    async fn scoring_applies_the_doubled_penalty_on_an_exact_match() {
        let server = test_server();
        seed_room(&server, "100001", &["user_a", "user_b", "user_c"]);
        {
            let mut rooms = server.rooms.lock().unwrap();
            let room = rooms.get_mut("100001").unwrap();
            room.elimination_count = 2;
        }
        start_game(&server, "100001", "user_a").await.unwrap();

        // average 20 -> winning number 16, submitted exactly by user_a
        submit_number(&server, "100001", "user_a", 16).unwrap();
        submit_number(&server, "100001", "user_b", 10).unwrap();
        submit_number(&server, "100001", "user_c", 34).unwrap();

        process_round(&server, "100001");
        process_scoring(&server, "100001");

        let rooms = server.rooms.lock().unwrap();
        let room = rooms.get("100001").unwrap();
        assert_eq!(room.find_player("user_a").unwrap().score, 1);
        assert_eq!(room.find_player("user_b").unwrap().score, -2);
        assert_eq!(room.find_player("user_c").unwrap().score, -2);
    }

    #[tokio::test]
    async fn stale_transitions_are_ignored() {
        let server = test_server();
        seed_room(&server, "100001", &["user_a", "user_b", "user_c"]);

        // room is still waiting, a stray round processing must be a no-op
        process_round(&server, "100001");
        process_scoring(&server, "100001");

        let rooms = server.rooms.lock().unwrap();
        let room = rooms.get("100001").unwrap();
        assert_eq!(room.phase, Phase::Waiting);

        // no room at all
        drop(rooms);
        process_round(&server, "999999");
    }
}
