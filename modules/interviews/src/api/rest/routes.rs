use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    routing::{delete, get, patch, post, put},
    Extension, Json, Router,
};
use serde_json::Value;
use tower_http::timeout::TimeoutLayer;

use crate::api::rest::openapi::ApiCatalog;
use crate::api::rest::{dto, handlers};
use crate::domain::ports::BlobStore;
use crate::domain::service::Service;
use crate::infra::LocalSession;

/// Shared handles injected into handlers via `Extension`.
#[derive(Clone)]
pub struct RouteDeps {
    pub service: Arc<Service>,
    pub session: Arc<LocalSession>,
    pub blobs: Arc<dyn BlobStore>,
    pub max_upload_bytes: usize,
}

pub fn register_routes(mut router: Router, catalog: &mut ApiCatalog, deps: RouteDeps) -> Router {
    // POST /api/session - Sign in
    router = router.route(
        "/api/session",
        post(handlers::sign_in).delete(handlers::sign_out),
    );
    catalog
        .operation("POST", "/api/session")
        .operation_id("interviews.sign_in")
        .summary("Sign in the local session")
        .tag("session")
        .json_request::<dto::SignInReq>("Session user")
        .json_response::<dto::SessionDto>(200, "Signed in")
        .problem_response(400, "Bad Request")
        .problem_response(502, "Backend error")
        .register();
    catalog
        .operation("DELETE", "/api/session")
        .operation_id("interviews.sign_out")
        .summary("Sign out")
        .tag("session")
        .empty_response(204, "Signed out")
        .register();

    // GET/POST /api/interviews
    router = router.route(
        "/api/interviews",
        get(handlers::list_interviews).post(handlers::create_interview),
    );
    catalog
        .operation("GET", "/api/interviews")
        .operation_id("interviews.list")
        .summary("List interviews with search, status and priority filters")
        .query_param("search", "Case-insensitive match on company, position or interviewer")
        .query_param("status", "`all` or a status label")
        .query_param("priority", "`all` or a priority label")
        .json_response::<dto::InterviewListDto>(200, "Filtered interviews")
        .problem_response(400, "Bad Request")
        .problem_response(401, "Unauthorized")
        .register();
    catalog
        .operation("POST", "/api/interviews")
        .operation_id("interviews.create")
        .summary("Create an interview")
        .json_request::<dto::CreateInterviewReq>("Interview draft")
        .json_response::<dto::CreatedDto>(201, "Created")
        .problem_response(400, "Bad Request")
        .problem_response(401, "Unauthorized")
        .problem_response(502, "Backend error")
        .register();

    // GET /api/interviews/events - SSE
    router = router.route(
        "/api/interviews/events",
        get(handlers::interview_events).layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(60 * 60),
        )),
    );
    catalog
        .operation("GET", "/api/interviews/events")
        .operation_id("interviews.events")
        .summary("Interview snapshots stream (SSE)")
        .sse_json::<dto::SnapshotEvent>("SSE stream of `interviews_snapshot` events")
        .problem_response(401, "Unauthorized")
        .register();

    // PATCH/DELETE /api/interviews/{id}
    router = router.route(
        "/api/interviews/{id}",
        patch(handlers::update_interview).delete(handlers::delete_interview),
    );
    catalog
        .operation("PATCH", "/api/interviews/{id}")
        .operation_id("interviews.update")
        .summary("Update an interview")
        .path_param("id", "Interview id")
        .json_request::<dto::UpdateInterviewReq>("Fields to change")
        .empty_response(204, "Updated")
        .problem_response(400, "Bad Request")
        .problem_response(401, "Unauthorized")
        .problem_response(404, "Not Found")
        .problem_response(502, "Backend error")
        .register();
    catalog
        .operation("DELETE", "/api/interviews/{id}")
        .operation_id("interviews.delete")
        .summary("Delete an interview")
        .path_param("id", "Interview id")
        .empty_response(204, "Deleted")
        .problem_response(401, "Unauthorized")
        .problem_response(502, "Backend error")
        .register();

    // GET /api/dashboard
    router = router.route("/api/dashboard", get(handlers::dashboard));
    catalog
        .operation("GET", "/api/dashboard")
        .operation_id("interviews.dashboard")
        .summary("Stats and the upcoming pending interviews")
        .query_param("search", "Narrows the pending list")
        .json_response::<dto::DashboardDto>(200, "Dashboard")
        .problem_response(401, "Unauthorized")
        .register();

    // Profile
    router = router
        .route(
            "/api/profile",
            get(handlers::get_profile).patch(handlers::update_profile),
        )
        .route("/api/profile/terms", post(handlers::accept_terms))
        .route(
            "/api/profile/avatar",
            put(handlers::upload_avatar).layer(DefaultBodyLimit::max(deps.max_upload_bytes)),
        )
        .route(
            "/api/profile/cover",
            put(handlers::upload_cover).layer(DefaultBodyLimit::max(deps.max_upload_bytes)),
        );
    catalog
        .operation("GET", "/api/profile")
        .operation_id("interviews.profile.get")
        .summary("Fetch the profile, creating it on first use")
        .tag("profile")
        .json_response::<dto::ProfileDto>(200, "Profile")
        .problem_response(401, "Unauthorized")
        .problem_response(502, "Backend error")
        .register();
    catalog
        .operation("PATCH", "/api/profile")
        .operation_id("interviews.profile.update")
        .summary("Update profile fields; null unsets a field")
        .tag("profile")
        .json_request::<dto::UpdateProfileReq>("Profile changes")
        .json_response::<dto::ProfileDto>(200, "Updated profile")
        .problem_response(400, "Bad Request")
        .problem_response(401, "Unauthorized")
        .register();
    catalog
        .operation("POST", "/api/profile/terms")
        .operation_id("interviews.profile.accept_terms")
        .summary("Accept the terms and finish onboarding")
        .tag("profile")
        .json_response::<dto::ProfileDto>(200, "Updated profile")
        .problem_response(401, "Unauthorized")
        .register();
    for (path, id) in [
        ("/api/profile/avatar", "interviews.profile.upload_avatar"),
        ("/api/profile/cover", "interviews.profile.upload_cover"),
    ] {
        catalog
            .operation("PUT", path)
            .operation_id(id)
            .summary("Upload an image (raw body, image/* content type)")
            .tag("profile")
            .binary_request("image/*", "Image bytes")
            .json_response::<dto::ProfileDto>(200, "Updated profile")
            .problem_response(400, "Bad Request")
            .problem_response(401, "Unauthorized")
            .problem_response(502, "Backend error")
            .register();
    }

    // Export and account
    router = router
        .route("/api/export", get(handlers::export_data))
        .route("/api/account", delete(handlers::delete_account));
    catalog
        .operation("GET", "/api/export")
        .operation_id("interviews.export")
        .summary("Download all user data as JSON")
        .tag("account")
        .json_response::<dto::ExportDto>(200, "Export document")
        .problem_response(401, "Unauthorized")
        .problem_response(502, "Backend error")
        .register();
    catalog
        .operation("DELETE", "/api/account")
        .operation_id("interviews.account.delete")
        .summary("Delete interviews, images and profile, then sign out")
        .tag("account")
        .json_response::<dto::DeletionReportDto>(200, "Account deleted")
        .problem_response(401, "Unauthorized")
        .problem_response(500, "Account deletion incomplete")
        .problem_response(502, "Backend error")
        .register();

    router = router
        .route("/files/{*path}", get(handlers::get_file))
        .route("/health", get(handlers::health_check));

    router
        .layer(Extension(deps.service))
        .layer(Extension(deps.session))
        .layer(Extension(deps.blobs))
}

/// Serve a prebuilt OpenAPI document.
pub fn register_openapi_route(router: Router, doc: Value) -> Router {
    let doc = Arc::new(doc);
    router.route(
        "/api/openapi.json",
        get(move || {
            let doc = Arc::clone(&doc);
            async move { Json((*doc).clone()) }
        }),
    )
}
