//! URL mapping operations: creation, listing, deletion with id compaction,
//! and short-code resolution.
//!
//! Every write to the `urls` table goes through [`UrlService`], which
//! serializes them behind one async mutex. Reads (list, resolve) do not take
//! the lock.

use crate::{
    db,
    error::AppError,
    models::UrlMapping,
    probe::{normalize_url, parse_target, UrlProbe},
    shortcode,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;

mod delete;
mod resolve;

/// Rounds of allocate-then-insert tolerated when the insert itself hits the
/// UNIQUE constraint on `short`.
const INSERT_ROUNDS: u32 = 3;

const SAVE_FAILED: &str = "Failed to save URL to database";

pub struct UrlService {
    db: SqlitePool,
    probe: Arc<dyn UrlProbe>,
    write_lock: Mutex<()>,
}

impl UrlService {
    pub fn new(db: SqlitePool, probe: Arc<dyn UrlProbe>) -> Self {
        Self {
            db,
            probe,
            write_lock: Mutex::new(()),
        }
    }

    /// Validate `input`, mint a short code and store a new mapping.
    ///
    /// Nothing is written unless the normalized, parsed URL answers the
    /// liveness check with 200.
    pub async fn create(&self, input: &str) -> Result<UrlMapping, AppError> {
        if input.trim().chars().count() < 2 {
            return Err(AppError::Validation(
                "URL must be at least 2 characters.".into(),
            ));
        }

        // The parsed form is what gets checked, stored and later redirected to.
        let original = parse_target(&normalize_url(input))?;
        self.probe.check(&original).await?;

        let _guard = self.write_lock.lock().await;

        for round in 1..=INSERT_ROUNDS {
            let short = shortcode::allocate_unique_code(
                |code| {
                    let pool = self.db.clone();
                    async move {
                        db::code_exists(&pool, &code)
                            .await
                            .map_err(AppError::persistence_as("checking short code", SAVE_FAILED))
                    }
                },
                shortcode::MAX_ATTEMPTS,
            )
            .await?;

            match self.insert(&original, &short).await {
                Ok(mapping) => {
                    tracing::info!(
                        "Created mapping {} -> {} (id {})",
                        mapping.short,
                        mapping.original,
                        mapping.id
                    );
                    return Ok(mapping);
                }
                Err(e) if db::is_unique_violation(&e) => {
                    tracing::warn!(
                        "Short code '{}' was taken at insert time (round {}/{})",
                        short,
                        round,
                        INSERT_ROUNDS
                    );
                }
                Err(e) => return Err(AppError::persistence_as("saving URL", SAVE_FAILED)(e)),
            }
        }

        Err(AppError::CodeExhaustion)
    }

    async fn insert(&self, original: &str, short: &str) -> Result<UrlMapping, sqlx::Error> {
        let mut tx = self.db.begin().await?;
        let id = db::next_id(&mut *tx).await?;
        let now = chrono::Utc::now().naive_utc();
        let mapping = db::insert_mapping(&mut tx, id, original, short, now).await?;
        tx.commit().await?;
        Ok(mapping)
    }

    /// Every stored mapping, ascending by id.
    pub async fn list_all(&self) -> Result<Vec<UrlMapping>, AppError> {
        db::list_all(&self.db)
            .await
            .map_err(AppError::persistence("listing URLs"))
    }
}
