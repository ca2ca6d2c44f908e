use super::UrlService;
use crate::{db, error::AppError, models::UrlMapping};
use sqlx::SqliteConnection;

impl UrlService {
    /// Remove a mapping, then renumber the survivors to `1..=N` and rewind
    /// the id counter to `N`.
    ///
    /// The delete, both renumbering phases and the counter reset share one
    /// transaction, and the whole operation holds the write lock, so no
    /// create or other delete can observe the intermediate negative ids.
    pub async fn delete(&self, id: i64) -> Result<UrlMapping, AppError> {
        let _guard = self.write_lock.lock().await;

        let mut tx = self
            .db
            .begin()
            .await
            .map_err(AppError::persistence("starting delete"))?;

        let Some(mapping) = db::find_by_id(&mut *tx, id)
            .await
            .map_err(AppError::persistence("looking up URL to delete"))?
        else {
            return Err(AppError::NotFound);
        };

        db::delete_by_id(&mut *tx, id)
            .await
            .map_err(AppError::persistence("deleting URL"))?;

        let remaining = db::ids_ascending(&mut *tx)
            .await
            .map_err(AppError::persistence("loading remaining URLs"))?;

        compact(&mut tx, &remaining).await?;

        db::reset_counter(&mut tx, remaining.len() as i64)
            .await
            .map_err(|e| {
                tracing::error!("Failed to reset id counter: {:?}", e);
                AppError::Renumbering
            })?;

        tx.commit()
            .await
            .map_err(AppError::persistence("committing delete"))?;

        tracing::info!(
            "Deleted mapping {} (id {}), {} remaining",
            mapping.short,
            mapping.id,
            remaining.len()
        );
        Ok(mapping)
    }
}

/// Two-phase renumber of `ids` (ascending) onto `1..=ids.len()`.
///
/// Source and target ranges overlap, so every row is first parked on a
/// distinct negative id and only then moved to its final slot.
async fn compact(conn: &mut SqliteConnection, ids: &[i64]) -> Result<(), AppError> {
    for (rank, &id) in ids.iter().enumerate() {
        move_row(conn, id, -(rank as i64 + 1)).await?;
    }

    for rank in 0..ids.len() as i64 {
        move_row(conn, -(rank + 1), rank + 1).await?;
    }

    Ok(())
}

async fn move_row(conn: &mut SqliteConnection, from: i64, to: i64) -> Result<(), AppError> {
    match db::move_id(&mut *conn, from, to).await {
        Ok(true) => Ok(()),
        Ok(false) => {
            tracing::error!("Renumbering lost track of row {} (target {})", from, to);
            Err(AppError::Renumbering)
        }
        Err(e) => {
            tracing::error!("Failed to move row {} to {}: {:?}", from, to, e);
            Err(AppError::Renumbering)
        }
    }
}
