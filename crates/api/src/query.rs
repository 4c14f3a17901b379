//! Shared query parameter types for API handlers.

use serde::Deserialize;

use crate::error::AppError;

/// Pagination parameters (`?offset=&limit=`).
///
/// An omitted `offset` starts at the first record; an omitted `limit`
/// returns everything from `offset` onward.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

impl PaginationParams {
    /// Resolve to `(offset, limit)`, rejecting negative values.
    pub fn resolve(&self) -> Result<(i64, Option<i64>), AppError> {
        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            return Err(AppError::BadRequest(format!(
                "offset must be non-negative, got {offset}"
            )));
        }
        if let Some(limit) = self.limit.filter(|&limit| limit < 0) {
            return Err(AppError::BadRequest(format!(
                "limit must be non-negative, got {limit}"
            )));
        }
        Ok((offset, self.limit))
    }
}
