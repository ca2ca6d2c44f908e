use chrono::NaiveDateTime;
use serde::Serialize;

/// A short URL mapping from the `urls` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UrlMapping {
    pub id: i64,
    pub original: String,
    pub short: String,
    pub visit_count: i64,
    pub created_at: NaiveDateTime,
    pub last_visited: Option<NaiveDateTime>,
}

/// A mapping pre-formatted for the dashboard table.
#[derive(Debug, Clone)]
pub struct MappingRow {
    pub id: i64,
    pub original: String,
    pub short: String,
    pub short_url: String,
    pub visit_count: i64,
    pub created_at: String,
    pub last_visited: String,
}

impl MappingRow {
    pub fn new(mapping: UrlMapping, base_url: &str) -> Self {
        Self {
            short_url: format!("{}/{}", base_url, mapping.short),
            id: mapping.id,
            original: mapping.original,
            short: mapping.short,
            visit_count: mapping.visit_count,
            created_at: format_timestamp(Some(mapping.created_at)),
            last_visited: format_timestamp(mapping.last_visited),
        }
    }
}

fn format_timestamp(ts: Option<NaiveDateTime>) -> String {
    match ts {
        Some(ts) => ts.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "N/A".to_owned(),
    }
}
