use std::sync::Arc;

use tracing::{debug, warn};

use crate::models::entity::{to_entity, Entity, Page, Versioned};
use crate::models::game::{AddMoveRequest, AddRoundRequest, CreateGameRequest, Game, Move};
use crate::repositories::document_repository::{
    DocumentRepository, FindOptions, Preconditions, SaveOptions,
};
use crate::repositories::errors::repository_errors::RepositoryError;
use crate::repositories::etag::{etag_matches, normalize_etag};

#[derive(Clone)]
pub struct GameService {
    repository: Arc<dyn DocumentRepository>,
}

impl GameService {
    pub fn new(repository: Arc<dyn DocumentRepository>) -> Self {
        GameService { repository }
    }

    pub async fn create_game(
        &self,
        request: CreateGameRequest,
    ) -> Result<Versioned<Game>, RepositoryError> {
        let game = Game::new(request.id, request.users_ids)?;
        let saved = self
            .repository
            .save(&to_entity(&game.id, &game)?, &SaveOptions::create_only())
            .await?;
        debug!("Created game {} for {} users", game.id, game.users_ids.len());
        Versioned::from_entity(saved)
    }

    pub async fn get_game(
        &self,
        game_id: &str,
        preconditions: Preconditions,
    ) -> Result<Versioned<Game>, RepositoryError> {
        let entity = self
            .repository
            .find_by_id(game_id, &preconditions.find_options())
            .await?;
        Versioned::from_entity(entity)
    }

    pub async fn delete_game(
        &self,
        game_id: &str,
        preconditions: Preconditions,
    ) -> Result<(), RepositoryError> {
        self.repository
            .delete(game_id, &preconditions.delete_options())
            .await
    }

    pub async fn list_games(
        &self,
        limit: Option<usize>,
        cursor: Option<&str>,
    ) -> Result<Page<Entity>, RepositoryError> {
        self.repository.find_all("", limit, cursor).await
    }

    pub async fn add_round(
        &self,
        game_id: &str,
        request: AddRoundRequest,
        if_match: Option<String>,
    ) -> Result<Versioned<Game>, RepositoryError> {
        self.update(game_id, if_match, |game| game.add_round(request.id))
            .await
    }

    pub async fn add_move(
        &self,
        game_id: &str,
        round_id: &str,
        request: AddMoveRequest,
        if_match: Option<String>,
    ) -> Result<Versioned<Game>, RepositoryError> {
        let mv = Move::new(request.id, &request.user_id, request.value)?;
        self.update(game_id, if_match, |game| game.add_move_to_round(round_id, mv))
            .await
    }

    pub async fn finish_round(
        &self,
        game_id: &str,
        round_id: &str,
        if_match: Option<String>,
    ) -> Result<Versioned<Game>, RepositoryError> {
        self.update(game_id, if_match, |game| game.finish_round(round_id))
            .await
    }

    pub async fn finish_game(
        &self,
        game_id: &str,
        if_match: Option<String>,
    ) -> Result<Versioned<Game>, RepositoryError> {
        self.update(game_id, if_match, Game::finish).await
    }

    /// Reads the game, applies `change` and writes the result back guarded by
    /// the etag that was read, so a concurrent writer surfaces as
    /// `PreconditionFailed` instead of being overwritten.
    async fn update<F>(
        &self,
        game_id: &str,
        if_match: Option<String>,
        change: F,
    ) -> Result<Versioned<Game>, RepositoryError>
    where
        F: FnOnce(&Game) -> Result<Game, RepositoryError> + Send,
    {
        let current: Versioned<Game> = Versioned::from_entity(
            self.repository
                .find_by_id(game_id, &FindOptions::default())
                .await?,
        )?;

        if let (Some(expected), Some(actual)) = (if_match.as_deref(), current.etag.as_deref()) {
            if !etag_matches(expected, actual) {
                warn!("Stale etag for game {}: {} != {}", game_id, expected, actual);
                return Err(RepositoryError::PreconditionFailed {
                    expected: normalize_etag(expected),
                    actual: actual.to_string(),
                });
            }
        }

        let updated = change(&current.value)?;
        let options = SaveOptions {
            if_match: current.etag.or(if_match),
            ..Default::default()
        };
        let saved = self
            .repository
            .save(&to_entity(game_id, &updated)?, &options)
            .await?;
        Versioned::from_entity(saved)
    }
}
