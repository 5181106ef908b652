//! API service routes

use axum::{
    Extension, Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use common::{database, error::ConstraintViolation};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    middleware::{CurrentUser, auth_middleware},
    models::{
        RemovalOutcome,
        attendance::{AttendanceOutcome, ParticipationResponse},
        event::{EventBatchResponse, EventForm, SlotOutcome, SlotResult},
        group::{AddMembersRequest, CreateGroupRequest, GroupMembershipResponse, GroupWithMembers},
        user::UpdateUserRequest,
    },
    repositories::UserUpdate,
    roster::{self, XLSX_CONTENT_TYPE},
    state::AppState,
    validation::{parse_slot, validate_event_form, validate_group_name, validate_user_update},
};

/// Query for the per-title roster export
#[derive(Deserialize)]
pub struct RosterQuery {
    pub title: String,
}

/// Create the router for the API service
pub fn create_router(state: AppState, max_upload_bytes: usize) -> Router {
    let protected_routes = Router::new()
        .route("/events", get(list_events).post(save_events))
        .route("/events/:id", delete(delete_event))
        .route("/events/:id/participants", get(event_participants))
        .route("/events/:id/participation", get(event_participation))
        .route(
            "/events/:id/attendance",
            post(attend_event).delete(leave_event),
        )
        .route("/events/:id/roster", get(export_event_roster))
        .route("/rosters", get(export_title_roster))
        .route("/groups", get(list_groups).post(create_group))
        .route("/groups/:id", get(get_group).delete(delete_group))
        .route("/groups/:id/members", post(add_group_members))
        .route("/groups/:id/members/:user_id", delete(remove_group_member))
        .route(
            "/groups/:id/import",
            post(import_group_members).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/users", get(list_users))
        .route("/users/:id", put(update_user).delete(delete_user))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .with_state(state)
}

fn not_found(what: &str) -> ApiError {
    ApiError::NotFound(format!("{} not found", what))
}

/// The event's group was deleted between validation and the write
fn group_vanished() -> ApiError {
    ApiError::Validation("Group no longer exists".to_string())
}

/// The group or one of the users was deleted while adding memberships
fn membership_target_vanished() -> ApiError {
    ApiError::NotFound("Group or user no longer exists".to_string())
}

fn xlsx_attachment(bytes: Vec<u8>, filename: String) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = database::health_check(&state.db_pool).await.unwrap_or(false);
    let cache = state.revocations.health_check().await.unwrap_or(false);
    let healthy = database && cache;

    (
        if healthy {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        },
        Json(json!({
            "status": if healthy { "ok" } else { "degraded" },
            "service": "api-service",
            "database": database,
            "cache": cache,
        })),
    )
}

/// Events visible to the caller, with participation and colors
pub async fn list_events(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    let events = state.visibility.visible_events(user.id, user.role).await?;
    Ok(Json(events))
}

/// Create one event per slot, or update a single event in place
///
/// Invalid slots are reported without blocking the valid ones.
pub async fn save_events(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(form): Json<EventForm>,
) -> ApiResult<impl IntoResponse> {
    user.require_admin()?;

    let details = validate_event_form(&form).map_err(ApiError::Validation)?;

    if let Some(group_id) = details.group_id {
        state
            .group_repository
            .find_by_id(group_id)
            .await?
            .ok_or_else(|| ApiError::Validation(format!("Unknown group {}", group_id)))?;
    }

    let parsed: Vec<_> = form.slots.iter().map(parse_slot).collect();
    let valid: Vec<_> = parsed.iter().filter_map(|slot| slot.as_ref().ok().copied()).collect();

    let saved = match (form.event_id, valid.first()) {
        (_, None) => Vec::new(),
        (Some(id), Some(slot)) => {
            let updated = state
                .event_repository
                .update(id, &details, slot)
                .await
                .map_err(|e| ApiError::from_storage(e, |_| group_vanished()))?;
            if !updated {
                return Err(not_found("Event"));
            }
            vec![id]
        }
        (None, Some(_)) => state
            .event_repository
            .create_many(&details, &valid)
            .await
            .map_err(|e| ApiError::from_storage(e, |_| group_vanished()))?,
    };

    let mut saved_ids = saved.iter().copied();
    let mut results = Vec::with_capacity(parsed.len());
    for (index, slot) in parsed.into_iter().enumerate() {
        let outcome = match slot {
            Err(reason) => SlotOutcome::Rejected { reason },
            Ok(_) => match saved_ids.next() {
                Some(event_id) if form.event_id.is_some() => SlotOutcome::Updated { event_id },
                Some(event_id) => SlotOutcome::Created { event_id },
                None => return Err(anyhow::anyhow!("Saved fewer events than valid slots").into()),
            },
        };
        results.push(SlotResult { index, outcome });
    }

    let response = EventBatchResponse {
        saved: saved.len(),
        rejected: results.len() - saved.len(),
        results,
    };

    let status = match (response.saved, form.event_id) {
        (0, _) => StatusCode::UNPROCESSABLE_ENTITY,
        (_, Some(_)) => StatusCode::OK,
        (_, None) => StatusCode::CREATED,
    };

    Ok((status, Json(response)))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    user.require_admin()?;

    match state.event_repository.delete(id).await? {
        RemovalOutcome::Removed => Ok(StatusCode::NO_CONTENT),
        RemovalOutcome::NotFound => Err(not_found("Event")),
    }
}

/// Participants of an event the caller can see
pub async fn event_participants(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let event = state
        .visibility
        .visible_event(&user, id)
        .await?
        .ok_or_else(|| not_found("Event"))?;

    let participants = state.attendance_repository.participants_of(event.id).await?;
    Ok(Json(participants))
}

pub async fn event_participation(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let event = state
        .visibility
        .visible_event(&user, id)
        .await?
        .ok_or_else(|| not_found("Event"))?;

    let participates = state
        .attendance_repository
        .is_attending(user.id, event.id)
        .await?;

    Ok(Json(ParticipationResponse {
        event_id: event.id,
        participates,
    }))
}

/// Opt the caller in to an event
pub async fn attend_event(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let event = state
        .visibility
        .visible_event(&user, id)
        .await?
        .ok_or_else(|| not_found("Event"))?;

    let outcome = state.attendance_repository.add(user.id, event.id).await?;
    let status = match outcome {
        AttendanceOutcome::Added => StatusCode::CREATED,
        AttendanceOutcome::AlreadyAttending => StatusCode::OK,
    };

    Ok((
        status,
        Json(json!({ "event_id": event.id, "status": outcome })),
    ))
}

/// Opt the caller out of an event
pub async fn leave_event(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    match state.attendance_repository.remove(user.id, id).await? {
        RemovalOutcome::Removed => Ok(Json(json!({ "event_id": id, "status": "removed" }))),
        RemovalOutcome::NotFound => Err(ApiError::NotFound(
            "Not attending this event".to_string(),
        )),
    }
}

/// Download the participants of one event
pub async fn export_event_roster(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    user.require_admin()?;

    let event = state
        .event_repository
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Event"))?;

    let participants = state.attendance_repository.participants_of(event.id).await?;
    let bytes = roster::event_roster(&participants).to_xlsx("Participants")?;

    Ok(xlsx_attachment(
        bytes,
        roster::attachment_filename(&format!("event_{}", event.id)),
    ))
}

/// Download the participants of every occurrence of a title
pub async fn export_title_roster(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<RosterQuery>,
) -> ApiResult<impl IntoResponse> {
    user.require_admin()?;

    let title = query.title.trim();
    if title.is_empty() {
        return Err(ApiError::Validation("Must select a title".to_string()));
    }

    let events = state.event_repository.find_by_title(title).await?;
    if events.is_empty() {
        return Err(ApiError::NotFound(format!("No events titled '{}'", title)));
    }

    let mut occurrences = Vec::with_capacity(events.len());
    for event in events {
        let participants = state.attendance_repository.participants_of(event.id).await?;
        occurrences.push((event, participants));
    }

    let bytes = roster::cohort_roster(&occurrences).to_xlsx("Participants")?;

    Ok(xlsx_attachment(bytes, roster::attachment_filename(title)))
}

pub async fn list_groups(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    user.require_admin()?;

    let groups = state.group_repository.list_with_members().await?;
    Ok(Json(groups))
}

/// Create a group, or add members to the group with that name
pub async fn create_group(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<CreateGroupRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require_admin()?;

    let name = validate_group_name(&request.name).map_err(ApiError::Validation)?;
    let (group, created) = state.group_repository.create_or_get(&name).await?;
    let results = state
        .group_repository
        .add_members(group.id, &request.user_ids)
        .await
        .map_err(|e| ApiError::from_storage(e, |_| membership_target_vanished()))?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(GroupMembershipResponse {
            group,
            created,
            results,
        }),
    ))
}

pub async fn get_group(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    user.require_admin()?;

    let group = state
        .group_repository
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Group"))?;
    let members = state.group_repository.members_of(group.id).await?;

    Ok(Json(GroupWithMembers {
        id: group.id,
        name: group.name,
        members,
    }))
}

pub async fn delete_group(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    user.require_admin()?;

    match state.group_repository.delete(id).await? {
        RemovalOutcome::Removed => Ok(StatusCode::NO_CONTENT),
        RemovalOutcome::NotFound => Err(not_found("Group")),
    }
}

pub async fn add_group_members(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<AddMembersRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require_admin()?;

    let group = state
        .group_repository
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Group"))?;
    let results = state
        .group_repository
        .add_members(group.id, &request.user_ids)
        .await
        .map_err(|e| ApiError::from_storage(e, |_| membership_target_vanished()))?;

    Ok(Json(GroupMembershipResponse {
        group,
        created: false,
        results,
    }))
}

/// Remove a member; removing a non-member succeeds
pub async fn remove_group_member(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((group_id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    user.require_admin()?;

    let outcome = state.group_repository.remove(user_id, group_id).await?;
    Ok(Json(json!({
        "group_id": group_id,
        "user_id": user_id,
        "status": outcome,
    })))
}

/// Import members from an xlsx upload in the `file` field
pub async fn import_group_members(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    user.require_admin()?;

    let group = state
        .group_repository
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Group"))?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            upload = Some(field.bytes().await?);
            break;
        }
    }
    let bytes = upload
        .ok_or_else(|| ApiError::Validation("A spreadsheet file is required".to_string()))?;

    let mut rows = Vec::new();
    let mut rejected = Vec::new();
    for parsed in roster::read_import(&bytes)? {
        match parsed {
            Ok(row) => rows.push(row),
            Err(rejection) => rejected.push(rejection),
        }
    }

    let mut report = state
        .group_repository
        .import_members(group.id, &rows)
        .await
        .map_err(|e| {
            ApiError::from_storage(e, |violation| match violation {
                ConstraintViolation::ForeignKey => not_found("Group"),
                ConstraintViolation::Unique => ApiError::Conflict(
                    "A username in the sheet was registered during the import".to_string(),
                ),
            })
        })?;
    report.rejected = rejected;

    info!(
        "Imported {} row(s) into group '{}', {} rejected",
        rows.len(),
        group.name,
        report.rejected.len()
    );

    Ok(Json(report))
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    user.require_admin()?;

    let users = state.user_repository.list().await?;
    Ok(Json(users))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(update): Json<UpdateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require_admin()?;
    validate_user_update(&update).map_err(ApiError::Validation)?;

    match state.user_repository.update(id, &update).await? {
        UserUpdate::Updated(updated) => Ok(Json(updated)),
        UserUpdate::NotFound => Err(not_found("User")),
        UserUpdate::NameTaken => Err(ApiError::Conflict(
            "Name and surname already exist".to_string(),
        )),
    }
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    user.require_admin()?;

    match state.user_repository.delete(id).await? {
        RemovalOutcome::Removed => Ok(StatusCode::NO_CONTENT),
        RemovalOutcome::NotFound => Err(not_found("User")),
    }
}
