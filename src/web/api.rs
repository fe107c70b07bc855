use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::server::AppState;
use crate::config::EntriesConfig;
use crate::tail::{self, Filter};

/// API routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/varlog/{filename}", get(get_entries))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntriesQuery {
    /// Number of entries to return, newest first
    pub num_entries: Option<i64>,
    /// Literal substring an entry must contain
    pub filter_by_text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EntriesResponse {
    pub entries: Vec<String>,
}

impl EntriesQuery {
    fn num_lines(&self, limits: &EntriesConfig) -> Result<usize, ApiError> {
        match self.num_entries {
            None => Ok(limits.default),
            Some(n) if n <= 0 => Err(ApiError::BadRequest(
                "numEntries value cannot be less than 1".to_string(),
            )),
            Some(n) => match usize::try_from(n) {
                Ok(n) if n <= limits.max => Ok(n),
                _ => Err(ApiError::BadRequest(format!(
                    "numEntries value cannot be larger than {}",
                    limits.max
                ))),
            },
        }
    }

    fn filter(&self) -> Result<Filter, ApiError> {
        Ok(Filter::from_text(self.filter_by_text.as_deref())?)
    }
}

/// Return the most recent entries of a file in the log directory
async fn get_entries(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    query: Result<Query<EntriesQuery>, QueryRejection>,
) -> Result<Json<EntriesResponse>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let max_lines = query.num_lines(&state.entries)?;
    let filter = query.filter()?;

    tracing::debug!(
        file = %filename,
        max_lines,
        filter = ?filter.needle(),
        "Reading entries"
    );

    let entries = tokio::task::spawn_blocking(move || -> Result<Vec<String>, ApiError> {
        let mut file = state.logs.open(&filename)?;
        let lines = tail::tail(&mut file, max_lines, &filter)?;
        Ok(lines)
    })
    .await
    .map_err(ApiError::internal)??;

    Ok(Json(EntriesResponse { entries }))
}
