use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::entity::is_valid_id;
use crate::repositories::errors::repository_errors::RepositoryError;

pub const MAX_PLAYERS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Ongoing,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundStatus {
    Ongoing,
    Finished,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub users_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRoundRequest {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMoveRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub user_id: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    pub id: String,
    pub user_id: String,
    pub value: f64,
    pub created_at: DateTime<Utc>,
}

impl Move {
    pub fn new(id: Option<String>, user_id: &str, value: f64) -> Result<Self, RepositoryError> {
        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        check_id("moveId", &id)?;
        check_id("userId", user_id)?;
        if !value.is_finite() {
            return Err(RepositoryError::validation(
                "value",
                "move value must be a finite number",
            ));
        }
        Ok(Move {
            id,
            user_id: user_id.to_string(),
            value,
            created_at: Utc::now(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub id: String,
    pub moves: Vec<Move>,
    pub status: RoundStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Round {
    fn finished(&self, at: DateTime<Utc>) -> Round {
        Round {
            status: RoundStatus::Finished,
            finished_at: Some(at),
            ..self.clone()
        }
    }
}

/// A multi-round game. Rounds and moves live inside the game document and have
/// no storage identity of their own.
///
/// Every mutation returns a new `Game`; the receiver is left untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub users_ids: Vec<String>,
    pub rounds: Vec<Round>,
    pub status: GameStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

fn check_id(field: &str, id: &str) -> Result<(), RepositoryError> {
    if is_valid_id(id) {
        Ok(())
    } else {
        Err(RepositoryError::validation(
            field,
            format!("{} must match ^[A-Za-z0-9._-]{{1,128}}$", field),
        ))
    }
}

impl Game {
    pub fn new(id: Option<String>, users_ids: Vec<String>) -> Result<Self, RepositoryError> {
        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        check_id("id", &id)?;
        validate_users_ids(&users_ids)?;
        Ok(Game {
            id,
            users_ids,
            rounds: Vec::new(),
            status: GameStatus::Ongoing,
            created_at: Utc::now(),
            finished_at: None,
        })
    }

    pub fn round(&self, round_id: &str) -> Option<&Round> {
        self.rounds.iter().find(|round| round.id == round_id)
    }

    pub fn is_finished(&self) -> bool {
        self.status == GameStatus::Finished
    }

    fn ensure_ongoing(&self) -> Result<(), RepositoryError> {
        if self.is_finished() {
            return Err(RepositoryError::validation(
                "status",
                format!("game {} is already finished", self.id),
            ));
        }
        Ok(())
    }

    fn existing_round(&self, round_id: &str) -> Result<&Round, RepositoryError> {
        self.round(round_id).ok_or_else(|| {
            RepositoryError::validation(
                "roundId",
                format!("round {} does not exist in game {}", round_id, self.id),
            )
        })
    }

    fn with_round_replaced(&self, replacement: Round) -> Game {
        Game {
            rounds: self
                .rounds
                .iter()
                .map(|round| {
                    if round.id == replacement.id {
                        replacement.clone()
                    } else {
                        round.clone()
                    }
                })
                .collect(),
            ..self.clone()
        }
    }

    pub fn add_round(&self, round_id: Option<String>) -> Result<Game, RepositoryError> {
        self.ensure_ongoing()?;
        let round_id = round_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        check_id("roundId", &round_id)?;
        if self.round(&round_id).is_some() {
            return Err(RepositoryError::validation(
                "roundId",
                format!("round {} already exists in game {}", round_id, self.id),
            ));
        }

        let mut rounds = self.rounds.clone();
        rounds.push(Round {
            id: round_id,
            moves: Vec::new(),
            status: RoundStatus::Ongoing,
            finished_at: None,
        });
        Ok(Game {
            rounds,
            ..self.clone()
        })
    }

    pub fn add_move_to_round(&self, round_id: &str, mv: Move) -> Result<Game, RepositoryError> {
        self.ensure_ongoing()?;
        let round = self.existing_round(round_id)?;
        if round.status == RoundStatus::Finished {
            return Err(RepositoryError::validation(
                "roundId",
                format!("round {} is already finished", round_id),
            ));
        }
        if !self.users_ids.contains(&mv.user_id) {
            return Err(RepositoryError::validation(
                "userId",
                format!("user {} is not playing game {}", mv.user_id, self.id),
            ));
        }
        if round.moves.iter().any(|existing| existing.id == mv.id) {
            return Err(RepositoryError::validation(
                "moveId",
                format!("move {} already exists in round {}", mv.id, round_id),
            ));
        }

        let mut moves = round.moves.clone();
        moves.push(mv);
        Ok(self.with_round_replaced(Round {
            moves,
            ..round.clone()
        }))
    }

    pub fn finish_round(&self, round_id: &str) -> Result<Game, RepositoryError> {
        self.ensure_ongoing()?;
        let round = self.existing_round(round_id)?;
        if round.status == RoundStatus::Finished {
            return Err(RepositoryError::validation(
                "roundId",
                format!("round {} is already finished", round_id),
            ));
        }
        Ok(self.with_round_replaced(round.finished(Utc::now())))
    }

    /// Finishes the game along with every round still open.
    pub fn finish(&self) -> Result<Game, RepositoryError> {
        self.ensure_ongoing()?;
        let now = Utc::now();
        Ok(Game {
            rounds: self
                .rounds
                .iter()
                .map(|round| match round.status {
                    RoundStatus::Ongoing => round.finished(now),
                    RoundStatus::Finished => round.clone(),
                })
                .collect(),
            status: GameStatus::Finished,
            finished_at: Some(now),
            ..self.clone()
        })
    }
}

fn validate_users_ids(users_ids: &[String]) -> Result<(), RepositoryError> {
    if users_ids.is_empty() || users_ids.len() > MAX_PLAYERS {
        return Err(RepositoryError::validation(
            "usersIds",
            format!("a game needs between 1 and {} users", MAX_PLAYERS),
        ));
    }
    let mut seen = HashSet::new();
    for user_id in users_ids {
        check_id("usersIds", user_id)?;
        if !seen.insert(user_id.as_str()) {
            return Err(RepositoryError::validation(
                "usersIds",
                format!("user {} is listed more than once", user_id),
            ));
        }
    }
    Ok(())
}
