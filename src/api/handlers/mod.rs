mod admin;
mod auth;
mod favorites;
mod files;
mod images;
mod shares;
mod tags;
mod upload;

use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::storage::BatchOutcome;

pub use admin::{
    health, manage_block, manage_delete, manage_label, manage_list, manage_white,
};
pub use auth::{current_user, login, profile, register, update_avatar};
pub use favorites::{
    add_favorite, batch_favorites, favorite_status, list_favorites, remove_favorite,
};
pub use files::serve_file;
pub use images::{delete_image, list_images, search_images, update_image};
pub use shares::{access_share, create_share, delete_share, get_share_info, list_shares};
pub use tags::{batch_tags, create_tag, delete_tag, list_tags, tag_images, update_tag};
pub use upload::{picgo_upload, upload};

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

fn success() -> Json<SuccessResponse> {
    Json(SuccessResponse { success: true })
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub succeeded: usize,
    pub failed: usize,
}

impl From<BatchOutcome> for BatchResponse {
    fn from(outcome: BatchOutcome) -> Self {
        Self {
            succeeded: outcome.succeeded,
            failed: outcome.failed,
        }
    }
}

/// Distinguishes between a missing field (`None`) and an explicit `null` (`Some(None)`).
fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: DeserializeOwned,
    D: Deserializer<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}
