use super::UrlService;
use crate::{db, error::AppError, models::UrlMapping};

/// Outcome of resolving a short code that exists.
#[derive(Debug)]
pub struct Resolved {
    /// The row as it was read, before this visit was counted.
    pub mapping: UrlMapping,
    /// `false` when the visit could not be recorded; the caller decides
    /// whether to redirect anyway.
    pub visit_recorded: bool,
}

impl UrlService {
    /// Look up `code` and count one visit against it.
    pub async fn resolve(&self, code: &str) -> Result<Resolved, AppError> {
        let mapping = db::find_by_code(&self.db, code)
            .await
            .map_err(AppError::persistence("looking up short code"))?
            .ok_or(AppError::NotFound)?;

        let now = chrono::Utc::now().naive_utc();
        let visit_recorded = match db::record_visit(&self.db, &mapping.short, now).await {
            Ok(true) => true,
            Ok(false) => {
                tracing::warn!("Visit to '{}' not recorded: mapping was deleted", code);
                false
            }
            Err(e) => {
                tracing::error!("Failed to record visit to '{}': {:?}", code, e);
                false
            }
        };

        Ok(Resolved {
            mapping,
            visit_recorded,
        })
    }
}
