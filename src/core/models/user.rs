use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Directory entry. Only ever used for presentation, never for balance math.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub avatar_url: Option<String>,
}
