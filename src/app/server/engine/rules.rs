//! Pure scoring rules. No state lives here, the lifecycle functions feed
//! submissions in and apply the results to the room.

use std::collections::HashMap;

use super::room::Player;

/// Score at or below which a player is eliminated
pub const ELIMINATION_FLOOR: i32 = -10;

pub const RULE_NO_DUPLICATES: u8 = 1;
pub const RULE_EXACT_DOUBLE: u8 = 2;
pub const RULE_ZERO_HUNDRED: u8 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub user_id: String,
    pub choice: u8,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ChoiceError {
    #[error("Number must be between 0 and 100")]
    OutOfRange,
    #[error("Another player has already picked that number")]
    DuplicateChoice,
}

/// Target value for the round, average of all choices times 0.8
pub fn winning_number(choices: &[u8]) -> f64 {
    let sum: u32 = choices.iter().map(|choice| u32::from(*choice)).sum();
    (f64::from(sum) / choices.len() as f64) * 0.8
}

/// Closest submission to the winning number. Ties go to the submission
/// seen first.
pub fn pick_winner(submissions: &[Submission], winning_number: f64) -> Option<&Submission> {
    let mut winner: Option<(&Submission, f64)> = None;

    for submission in submissions {
        let distance = (f64::from(submission.choice) - winning_number).abs();
        match winner {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => winner = Some((submission, distance)),
        }
    }

    winner.map(|(submission, _)| submission)
}

/// Rule 3 override. When the round contains both a 0 and a 100, the first
/// player who picked 100 wins outright.
pub fn special_winner(submissions: &[Submission]) -> Option<&Submission> {
    let has_zero = submissions.iter().any(|submission| submission.choice == 0);
    let has_hundred = submissions
        .iter()
        .any(|submission| submission.choice == 100);

    if has_zero && has_hundred {
        submissions.iter().find(|submission| submission.choice == 100)
    } else {
        None
    }
}

/// Whether any choice landed exactly on the winning number. Compared
/// against the raw float, so this only fires when the winning number is
/// itself integral.
pub fn has_exact_match(submissions: &[Submission], winning_number: f64) -> bool {
    submissions
        .iter()
        .any(|submission| f64::from(submission.choice) == winning_number)
}

/// Rules unlocked at the given elimination count. Monotonic, never shrinks
/// within a game.
pub fn active_rules(elimination_count: u32) -> Vec<u8> {
    match elimination_count {
        0 | 1 => Vec::new(),
        2 => vec![RULE_NO_DUPLICATES, RULE_EXACT_DOUBLE],
        _ => vec![RULE_NO_DUPLICATES, RULE_EXACT_DOUBLE, RULE_ZERO_HUNDRED],
    }
}

/// Validate an incoming number against the range and, under rule 1, against
/// the choices already locked in this round.
pub fn validate_choice(
    number: i64,
    locked: &[Submission],
    rules: &[u8],
) -> Result<u8, ChoiceError> {
    if !(0..=100).contains(&number) {
        return Err(ChoiceError::OutOfRange);
    }
    let choice = number as u8;

    if rules.contains(&RULE_NO_DUPLICATES)
        && locked.iter().any(|submission| submission.choice == choice)
    {
        return Err(ChoiceError::DuplicateChoice);
    }

    Ok(choice)
}

/// Score deltas for every non-eliminated player. Winner gains 1, everyone
/// else loses 1, or 2 when the doubled penalty applies.
pub fn score_deltas(
    active_user_ids: &[String],
    winner_id: &str,
    double_penalty: bool,
) -> HashMap<String, i32> {
    let penalty = if double_penalty { -2 } else { -1 };

    active_user_ids
        .iter()
        .map(|user_id| {
            let delta = if user_id == winner_id { 1 } else { penalty };
            (user_id.clone(), delta)
        })
        .collect()
}

pub fn is_game_over(players: &[Player]) -> bool {
    players.iter().filter(|player| !player.eliminated).count() <= 1
}

/// All players ranked by score descending. Stable, so equal scores keep
/// join order.
pub fn standings(players: &[Player]) -> Vec<&Player> {
    let mut ranked: Vec<&Player> = players.iter().collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(user_id: &str, choice: u8) -> Submission {
        Submission {
            user_id: user_id.to_string(),
            choice,
        }
    }

    #[test]
    fn winning_number_is_scaled_average() {
        assert_eq!(winning_number(&[10, 20, 30]), 16.0);
        assert_eq!(winning_number(&[0, 0, 0]), 0.0);
        assert_eq!(winning_number(&[100]), 80.0);
    }

    #[test]
    fn closest_choice_wins() {
        let submissions = vec![
            submission("user_1", 10),
            submission("user_2", 20),
            submission("user_3", 30),
        ];
        let target = winning_number(&[10, 20, 30]);

        let winner = pick_winner(&submissions, target).unwrap();
        assert_eq!(winner.user_id, "user_2");
    }

    #[test]
    fn exact_ties_go_to_first_submitter() {
        // winning number 16, both 12 and 20 are distance 4 away
        let submissions = vec![submission("user_1", 12), submission("user_2", 20)];

        let winner = pick_winner(&submissions, 16.0).unwrap();
        assert_eq!(winner.user_id, "user_1");
    }

    #[test]
    fn zero_and_hundred_pair_wins_for_the_hundred() {
        let submissions = vec![
            submission("user_1", 0),
            submission("user_2", 100),
            submission("user_3", 50),
        ];

        let winner = special_winner(&submissions).unwrap();
        assert_eq!(winner.user_id, "user_2");

        let no_pair = vec![submission("user_1", 100), submission("user_2", 50)];
        assert!(special_winner(&no_pair).is_none());
    }

    #[test]
    fn exact_match_uses_float_equality() {
        // average 20 -> winning number 16.0, hit exactly
        let submissions = vec![
            submission("user_1", 16),
            submission("user_2", 10),
            submission("user_3", 34),
        ];
        assert!(has_exact_match(&submissions, winning_number(&[16, 10, 34])));

        // average 21 -> winning number 16.8, never an integer choice
        let submissions = vec![
            submission("user_1", 17),
            submission("user_2", 12),
            submission("user_3", 34),
        ];
        assert!(!has_exact_match(&submissions, winning_number(&[17, 12, 34])));
    }

    #[test]
    fn rules_unlock_monotonically() {
        assert!(active_rules(0).is_empty());
        assert!(active_rules(1).is_empty());
        assert_eq!(active_rules(2), vec![1, 2]);
        assert_eq!(active_rules(3), vec![1, 2, 3]);
        assert_eq!(active_rules(5), vec![1, 2, 3]);
    }

    #[test]
    fn out_of_range_choices_are_rejected() {
        assert_eq!(validate_choice(-1, &[], &[]), Err(ChoiceError::OutOfRange));
        assert_eq!(validate_choice(101, &[], &[]), Err(ChoiceError::OutOfRange));
        assert_eq!(validate_choice(0, &[], &[]), Ok(0));
        assert_eq!(validate_choice(100, &[], &[]), Ok(100));
    }

    #[test]
    fn duplicates_rejected_only_under_rule_one() {
        let locked = vec![submission("user_1", 42)];

        assert_eq!(validate_choice(42, &locked, &[]), Ok(42));
        assert_eq!(
            validate_choice(42, &locked, &[RULE_NO_DUPLICATES]),
            Err(ChoiceError::DuplicateChoice)
        );
        assert_eq!(validate_choice(43, &locked, &[RULE_NO_DUPLICATES]), Ok(43));
    }

    #[test]
    fn deltas_reward_winner_and_charge_the_rest() {
        let active = vec![
            "user_1".to_string(),
            "user_2".to_string(),
            "user_3".to_string(),
        ];

        let deltas = score_deltas(&active, "user_2", false);
        assert_eq!(deltas["user_1"], -1);
        assert_eq!(deltas["user_2"], 1);
        assert_eq!(deltas["user_3"], -1);

        let doubled = score_deltas(&active, "user_2", true);
        assert_eq!(doubled["user_1"], -2);
        assert_eq!(doubled["user_2"], 1);
    }

    #[test]
    fn game_over_when_one_active_player_remains() {
        let mut players = vec![
            Player::new("user_1".to_string(), "Alice".to_string(), None),
            Player::new("user_2".to_string(), "Bob".to_string(), None),
        ];
        assert!(!is_game_over(&players));

        players[0].eliminated = true;
        assert!(is_game_over(&players));

        players[1].eliminated = true;
        assert!(is_game_over(&players));
    }

    #[test]
    fn standings_sort_is_stable() {
        let mut first = Player::new("user_1".to_string(), "Alice".to_string(), None);
        first.score = -3;
        let mut second = Player::new("user_2".to_string(), "Bob".to_string(), None);
        second.score = 2;
        let mut third = Player::new("user_3".to_string(), "Carol".to_string(), None);
        third.score = -3;

        let players = vec![first, second, third];
        let ranked = standings(&players);

        assert_eq!(ranked[0].user_id, "user_2");
        assert_eq!(ranked[1].user_id, "user_1");
        assert_eq!(ranked[2].user_id, "user_3");
    }
}
