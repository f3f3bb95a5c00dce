//! HTTP handlers, one module per resource.

pub mod admin;
pub mod ledger;
pub mod notifications;
pub mod products;
pub mod reports;
pub mod system;

use std::str::FromStr;

use crate::error::ApiError;

fn parse_id<T: FromStr>(entity: &str, raw: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid {entity} id: {raw}")))
}
