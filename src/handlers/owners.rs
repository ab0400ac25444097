use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use crate::error::ApiError;
use crate::models::{Owner, Pet};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindOwnersQuery {
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PetList {
    pub pet_list: Vec<Pet>,
}

// GET /owners/find?lastName= (the rate limited route by default)
pub async fn find_owners_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FindOwnersQuery>,
) -> Result<Json<Vec<Owner>>, ApiError> {
    let last_name = query.last_name.unwrap_or_default();
    let owners = state.repository.find_by_last_name(last_name.trim())?;
    Ok(Json(owners))
}

// GET /pets
pub async fn pets_handler(State(state): State<Arc<AppState>>) -> Result<Json<PetList>, ApiError> {
    let pet_list = state
        .repository
        .find_all()?
        .into_iter()
        .flat_map(|o| o.pets)
        .collect();

    Ok(Json(PetList { pet_list }))
}
