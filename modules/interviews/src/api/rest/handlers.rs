use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, Query},
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::api::rest::dto::{
    CreateInterviewReq, CreatedDto, DashboardDto, DashboardQuery, DeletionReportDto, ExportDto,
    InterviewListDto, ListInterviewsQuery, ProfileDto, SessionDto, SignInReq,
    UpdateInterviewReq, UpdateProfileReq,
};
use crate::api::rest::error::{bad_request, map_domain_error, ProblemResponse};
use crate::api::rest::sse;
use crate::contract::model::{ImageSlot, ImageUpload, RecordId};
use crate::domain::ports::BlobStore;
use crate::domain::service::Service;
use crate::domain::views::InterviewFilter;
use crate::infra::LocalSession;

/// How long sign-in waits for the first snapshot of the new user.
const FIRST_SNAPSHOT_WAIT: Duration = Duration::from_secs(2);

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Sign in the local session and make sure the profile exists
pub async fn sign_in(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Extension(session): Extension<Arc<LocalSession>>,
    Json(req): Json<SignInReq>,
) -> Result<Json<SessionDto>, ProblemResponse> {
    if req.user_id.trim().is_empty() {
        return Err(bad_request("user_id: must not be blank", uri.path()));
    }
    info!(user_id = %req.user_id, "Signing in");

    let user = session.sign_in_user(req.into());
    if let Err(e) = svc.profile().await {
        error!("Failed to prepare profile for {}: {}", user.id, e);
        return Err(map_domain_error(&e, uri.path()));
    }
    svc.wait_until_bound(&user.id, FIRST_SNAPSHOT_WAIT).await;
    Ok(Json(SessionDto::from(user)))
}

pub async fn sign_out(Extension(session): Extension<Arc<LocalSession>>) -> StatusCode {
    info!("Signing out");
    session.sign_out();
    StatusCode::NO_CONTENT
}

/// List the canonical interviews with search, status and priority applied
pub async fn list_interviews(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Query(query): Query<ListInterviewsQuery>,
) -> Result<Json<InterviewListDto>, ProblemResponse> {
    let filter = InterviewFilter {
        search: query.search.unwrap_or_default(),
        status: query
            .status
            .as_deref()
            .unwrap_or("all")
            .parse()
            .map_err(|e: String| bad_request(format!("status: {e}"), uri.path()))?,
        priority: query
            .priority
            .as_deref()
            .unwrap_or("all")
            .parse()
            .map_err(|e: String| bad_request(format!("priority: {e}"), uri.path()))?,
    };

    let state = svc.state().map_err(|e| map_domain_error(&e, uri.path()))?;
    let filtered = filter.apply(&state.interviews);
    Ok(Json(InterviewListDto::new(&filtered, &state)))
}

pub async fn dashboard(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardDto>, ProblemResponse> {
    match svc.dashboard(query.search.as_deref().unwrap_or_default()) {
        Ok(view) => Ok(Json(DashboardDto::from(view))),
        Err(e) => Err(map_domain_error(&e, uri.path())),
    }
}

/// Create a new interview
pub async fn create_interview(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Json(req_body): Json<CreateInterviewReq>,
) -> Result<(StatusCode, Json<CreatedDto>), ProblemResponse> {
    info!("Creating interview at {}", req_body.company_name);

    match svc.create_interview(req_body.into()).await {
        Ok(id) => Ok((
            StatusCode::CREATED,
            Json(CreatedDto { id: id.to_string() }),
        )),
        Err(e) => {
            error!("Failed to create interview: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn update_interview(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
    Json(req_body): Json<UpdateInterviewReq>,
) -> Result<StatusCode, ProblemResponse> {
    info!("Updating interview {}", id);

    match svc.update_interview(RecordId::new(id.clone()), req_body.into()).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => {
            error!("Failed to update interview {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn delete_interview(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ProblemResponse> {
    info!("Deleting interview {}", id);

    match svc.delete_interview(RecordId::new(id.clone())).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => {
            error!("Failed to delete interview {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// SSE endpoint streaming the signed-in user's snapshots.
pub async fn interview_events(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
) -> Result<Response, ProblemResponse> {
    let state = svc.state().map_err(|e| map_domain_error(&e, uri.path()))?;
    let user_id = state.user_id.unwrap_or_default();
    info!(%user_id, "New SSE connection for interview snapshots");
    Ok(sse::snapshot_response(svc.synchronizer().watch_state(), user_id).into_response())
}

pub async fn get_profile(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
) -> Result<Json<ProfileDto>, ProblemResponse> {
    match svc.profile().await {
        Ok(p) => Ok(Json(ProfileDto::from(p))),
        Err(e) => {
            error!("Failed to load profile: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn update_profile(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Json(req_body): Json<UpdateProfileReq>,
) -> Result<Json<ProfileDto>, ProblemResponse> {
    match svc.update_profile(req_body.into()).await {
        Ok(p) => Ok(Json(ProfileDto::from(p))),
        Err(e) => {
            error!("Failed to update profile: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn accept_terms(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
) -> Result<Json<ProfileDto>, ProblemResponse> {
    match svc.accept_terms().await {
        Ok(p) => Ok(Json(ProfileDto::from(p))),
        Err(e) => Err(map_domain_error(&e, uri.path())),
    }
}

async fn upload(
    slot: ImageSlot,
    uri: Uri,
    svc: Arc<Service>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ProfileDto>, ProblemResponse> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    info!(?slot, %content_type, size = body.len(), "Uploading profile image");

    let upload = ImageUpload {
        bytes: body.to_vec(),
        content_type,
    };
    match svc.upload_image(slot, upload).await {
        Ok(p) => Ok(Json(ProfileDto::from(p))),
        Err(e) => {
            error!("Failed to upload {:?} image: {}", slot, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn upload_avatar(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ProfileDto>, ProblemResponse> {
    upload(ImageSlot::Avatar, uri, svc, headers, body).await
}

pub async fn upload_cover(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ProfileDto>, ProblemResponse> {
    upload(ImageSlot::Cover, uri, svc, headers, body).await
}

/// JSON download of everything the user owns
pub async fn export_data(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
) -> Result<Response, ProblemResponse> {
    let data = svc
        .export_data()
        .await
        .map_err(|e| map_domain_error(&e, uri.path()))?;

    let disposition = format!("attachment; filename=\"{}\"", data.file_name());
    let mut resp = Json(ExportDto::from(&data)).into_response();
    match HeaderValue::from_str(&disposition) {
        Ok(v) => {
            resp.headers_mut().insert(header::CONTENT_DISPOSITION, v);
        }
        Err(e) => warn!("Invalid content-disposition header: {}", e),
    }
    Ok(resp)
}

/// Delete the account, then end the session
pub async fn delete_account(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Extension(session): Extension<Arc<LocalSession>>,
) -> Result<Json<DeletionReportDto>, ProblemResponse> {
    info!("Deleting account");

    match svc.delete_account().await {
        Ok(report) => {
            session.sign_out();
            Ok(Json(DeletionReportDto::from(report)))
        }
        Err(e) => {
            error!("Account deletion failed: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Serve a stored image.
pub async fn get_file(
    Extension(blobs): Extension<Arc<dyn BlobStore>>,
    Path(path): Path<String>,
) -> Response {
    match blobs.get(&path).await {
        Ok(Some(blob)) => {
            let content_type = HeaderValue::from_str(&blob.content_type)
                .unwrap_or(HeaderValue::from_static("application/octet-stream"));
            ([(header::CONTENT_TYPE, content_type)], blob.bytes).into_response()
        }
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            error!("Blob read failed for {}: {}", path, e);
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}
