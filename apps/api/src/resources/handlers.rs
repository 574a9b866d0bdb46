use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::dashboard::{select_dashboard_resources, AnnotatedResource, ResourceBuckets};
use super::models::{location_name, Location, ResourceType, AVAILABLE_LOCATIONS, DEFAULT_LOCATION};
use super::relevance::UserNeeds;
use crate::auth::extractor::MaybeUser;
use crate::auth::handlers::INITIAL_SETUP_PATH;
use crate::errors::AppError;
use crate::profile::service::{load_user_profile, UserProfile};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub location: Option<String>,
    #[serde(default)]
    pub preview: bool,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum DashboardResponse {
    NeedsOnboarding {
        needs_onboarding: bool,
        redirect: String,
    },
    Ready {
        location: String,
        location_name: &'static str,
        /// Location whose data was served; differs from `location` when it has no data of its own.
        catalog_location: String,
        preview: bool,
        profile: UserProfile,
        resources: ResourceBuckets,
    },
}

#[derive(Serialize)]
pub struct ResourceDetailResponse {
    pub resource: AnnotatedResource,
    pub related: Vec<AnnotatedResource>,
}

/// Location precedence: an explicit `?location=`, then the signed-in user's saved
/// location, then the default. Switching via the query never touches stored preferences.
fn resolve_requested_location(profile: &UserProfile, query: Option<&str>) -> String {
    if let Some(requested) = query.map(str::trim).filter(|l| !l.is_empty()) {
        return requested.to_string();
    }
    if !profile.is_guest && !profile.location.is_empty() {
        return profile.location.clone();
    }
    DEFAULT_LOCATION.to_string()
}

/// GET /api/v1/locations
pub async fn handle_list_locations() -> Json<&'static [Location]> {
    Json(AVAILABLE_LOCATIONS.as_slice())
}

/// GET /api/v1/dashboard
pub async fn handle_dashboard(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Query(query): Query<DashboardQuery>,
) -> Json<DashboardResponse> {
    // Preview browsing never reads the viewer's profile.
    let user = if query.preview { None } else { viewer.user() };
    let profile = load_user_profile(state.store.as_ref(), user).await;

    if !profile.is_guest && !profile.onboarding_completed {
        return Json(DashboardResponse::NeedsOnboarding {
            needs_onboarding: true,
            redirect: INITIAL_SETUP_PATH.to_string(),
        });
    }

    let location = resolve_requested_location(&profile, query.location.as_deref());
    let catalog_location = state.catalog.resolve_location(&location).to_string();
    let needs = UserNeeds::from_profile(&profile);
    let resources =
        select_dashboard_resources(&state.catalog, &location, needs.as_ref(), query.preview);
    debug!(
        "Dashboard for {location} (data: {catalog_location}, personalised: {})",
        needs.is_some()
    );

    Json(DashboardResponse::Ready {
        location_name: location_name(&location).unwrap_or("New York City"),
        location,
        catalog_location,
        preview: query.preview,
        profile,
        resources,
    })
}

/// GET /api/v1/resources/:location/:category/:id
pub async fn handle_resource_detail(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path((location, category, id)): Path<(String, String, u32)>,
) -> Result<Json<ResourceDetailResponse>, AppError> {
    let resource_type = ResourceType::parse(&category)
        .ok_or_else(|| AppError::NotFound(format!("Unknown resource category '{category}'")))?;
    let resource = state
        .catalog
        .find(&location, resource_type, id)
        .ok_or_else(|| AppError::NotFound(format!("Resource {id} not found")))?;

    let profile = load_user_profile(state.store.as_ref(), viewer.user()).await;
    let needs = UserNeeds::from_profile(&profile);

    Ok(Json(ResourceDetailResponse {
        resource: AnnotatedResource::new(resource, needs.as_ref(), false),
        related: state
            .catalog
            .related(resource)
            .into_iter()
            .map(|r| AnnotatedResource::new(r, needs.as_ref(), false))
            .collect(),
    }))
}
