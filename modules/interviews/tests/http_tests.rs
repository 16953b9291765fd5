use std::time::Duration;

use anyhow::Result;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use interviews::api::rest::dto::{
    CreatedDto, DashboardDto, DeletionReportDto, ExportDto, InterviewListDto, ProfileDto,
    SessionDto,
};
use interviews::api::rest::error::Problem;
use interviews::{Interviews, InterviewsConfig};

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(
    response: axum::response::Response,
) -> Result<T> {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&body)?)
}

async fn sign_in(router: &Router, user_id: &str) -> Result<SessionDto> {
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/session",
            json!({ "user_id": user_id, "email": format!("{user_id}@example.com") }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

fn interview_body(company: &str, date: &str) -> Value {
    json!({
        "company_name": company,
        "job_position": "Backend Engineer",
        "interviewer_name": "Sam",
        "interview_date": date,
        "priority_level": "High"
    })
}

/// Poll the list endpoint until it holds `count` records.
async fn list_until(router: &Router, count: usize) -> Result<InterviewListDto> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let response = router
            .clone()
            .oneshot(empty_request("GET", "/api/interviews"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let list: InterviewListDto = body_json(response).await?;
        if list.loaded && list.total == count {
            return Ok(list);
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "list never reached {count} records"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn health_endpoint_reports_healthy() -> Result<()> {
    let module = Interviews::init(InterviewsConfig::default());
    let response = module
        .router()
        .oneshot(empty_request("GET", "/health"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = body_json(response).await?;
    assert_eq!(body["status"], "healthy");
    Ok(())
}

#[tokio::test]
async fn openapi_document_lists_every_route() -> Result<()> {
    let module = Interviews::init(InterviewsConfig::default());
    let response = module
        .router()
        .oneshot(empty_request("GET", "/api/openapi.json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let doc: Value = body_json(response).await?;
    assert_eq!(doc["openapi"], "3.1.0");
    for path in [
        "/api/session",
        "/api/interviews",
        "/api/interviews/{id}",
        "/api/interviews/events",
        "/api/dashboard",
        "/api/profile",
        "/api/profile/terms",
        "/api/profile/avatar",
        "/api/profile/cover",
        "/api/export",
        "/api/account",
    ] {
        assert!(doc["paths"][path].is_object(), "missing {path}");
    }
    assert!(doc["paths"]["/api/interviews"]["get"].is_object());
    assert!(doc["paths"]["/api/interviews"]["post"].is_object());
    assert!(doc["components"]["schemas"]["InterviewDto"].is_object());
    assert!(doc["components"]["schemas"]["Problem"].is_object());
    Ok(())
}

#[tokio::test]
async fn requests_without_a_session_get_401_problems() -> Result<()> {
    let module = Interviews::init(InterviewsConfig::default());
    let router = module.router();

    for (method, uri) in [
        ("GET", "/api/interviews"),
        ("GET", "/api/dashboard"),
        ("GET", "/api/profile"),
        ("GET", "/api/export"),
        ("DELETE", "/api/account"),
    ] {
        let response = router
            .clone()
            .oneshot(empty_request(method, uri))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/problem+json"
        );
        let problem: Problem = body_json(response).await?;
        assert_eq!(problem.status, 401);
        assert_eq!(problem.instance, uri);
    }
    Ok(())
}

#[tokio::test]
async fn interview_lifecycle_over_http() -> Result<()> {
    let module = Interviews::init(InterviewsConfig::default());
    let router = module.router();

    let session = sign_in(&router, "u1").await?;
    assert_eq!(session.user_id, "u1");

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/interviews",
            interview_body("Acme", "2024-03-10"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: CreatedDto = body_json(response).await?;

    let list = list_until(&router, 1).await?;
    assert_eq!(list.interviews[0].id, created.id);
    assert_eq!(list.interviews[0].status, "Pending");
    assert!(list.sync_error.is_none());

    let response = router
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/interviews/{}", created.id),
            json!({ "status": "passed" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = router
        .clone()
        .oneshot(empty_request("GET", "/api/dashboard"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let dashboard: DashboardDto = body_json(response).await?;
    assert_eq!(dashboard.stats.total, 1);

    let response = router
        .clone()
        .oneshot(empty_request(
            "DELETE",
            &format!("/api/interviews/{}", created.id),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    list_until(&router, 0).await?;

    module.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn errors_map_to_problem_statuses() -> Result<()> {
    let module = Interviews::init(InterviewsConfig::default());
    let router = module.router();
    sign_in(&router, "u1").await?;

    // blank company name
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/interviews",
            interview_body("  ", "2024-03-10"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let problem: Problem = body_json(response).await?;
    assert_eq!(problem.field.as_deref(), Some("company_name"));

    // unknown status label
    let mut body = interview_body("Acme", "2024-03-10");
    body["status"] = json!("Ghosted");
    let response = router
        .clone()
        .oneshot(json_request("POST", "/api/interviews", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = router
        .clone()
        .oneshot(empty_request("GET", "/api/interviews?status=bogus"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = router
        .clone()
        .oneshot(json_request(
            "PATCH",
            "/api/interviews/missing",
            json!({ "company_name": "Acme" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = router
        .clone()
        .oneshot(empty_request("DELETE", "/api/interviews/missing"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let problem: Problem = body_json(response).await?;
    assert_eq!(problem.code, "INTERVIEWS_BACKEND");

    // the owner field cannot be patched
    let response = router
        .clone()
        .oneshot(json_request(
            "PATCH",
            "/api/interviews/missing",
            json!({ "user_id": "u2" }),
        ))
        .await
        .unwrap();
    assert!(response.status().is_client_error());

    module.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn profile_image_is_uploaded_and_served() -> Result<()> {
    let module = Interviews::init(InterviewsConfig::default());
    let router = module.router();
    sign_in(&router, "u1").await?;

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/profile/avatar")
                .header(header::CONTENT_TYPE, "image/png")
                .body(Body::from(vec![0x89, b'P', b'N', b'G']))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let profile: ProfileDto = body_json(response).await?;
    let url = profile.avatar_url.expect("avatar url");
    let path = url
        .strip_prefix("http://127.0.0.1:8087")
        .expect("url under the configured base");

    let response = router
        .clone()
        .oneshot(empty_request("GET", path))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(&bytes[..], &[0x89, b'P', b'N', b'G']);

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/profile/cover")
                .header(header::CONTENT_TYPE, "text/plain")
                .body(Body::from("not an image"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    module.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn profile_patch_and_terms() -> Result<()> {
    let module = Interviews::init(InterviewsConfig::default());
    let router = module.router();
    sign_in(&router, "u1").await?;

    let response = router
        .clone()
        .oneshot(empty_request("GET", "/api/profile"))
        .await
        .unwrap();
    let profile: ProfileDto = body_json(response).await?;
    assert!(profile.needs_onboarding);

    let response = router
        .clone()
        .oneshot(json_request(
            "PATCH",
            "/api/profile",
            json!({ "full_name": "Uma One", "onboarding_completed": true }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let profile: ProfileDto = body_json(response).await?;
    assert_eq!(profile.full_name.as_deref(), Some("Uma One"));

    let response = router
        .clone()
        .oneshot(json_request("PATCH", "/api/profile", json!({ "full_name": null })))
        .await
        .unwrap();
    let profile: ProfileDto = body_json(response).await?;
    assert_eq!(profile.full_name, None);

    let response = router
        .clone()
        .oneshot(empty_request("POST", "/api/profile/terms"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let profile: ProfileDto = body_json(response).await?;
    assert!(profile.terms_accepted);
    assert!(!profile.needs_onboarding);

    module.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn export_is_served_as_an_attachment() -> Result<()> {
    let module = Interviews::init(InterviewsConfig::default());
    let router = module.router();
    sign_in(&router, "u1").await?;
    router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/interviews",
            interview_body("Acme", "2024-03-10"),
        ))
        .await
        .unwrap();

    let response = router
        .clone()
        .oneshot(empty_request("GET", "/api/export"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"interfy-export-"));

    let export: ExportDto = body_json(response).await?;
    assert_eq!(export.total_interviews, 1);
    assert_eq!(export.interviews[0].company_name, "Acme");
    assert_eq!(
        export.profile.map(|p| p.email),
        Some("u1@example.com".to_string())
    );

    module.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn account_deletion_signs_the_user_out() -> Result<()> {
    let module = Interviews::init(InterviewsConfig::default());
    let router = module.router();
    sign_in(&router, "u1").await?;
    router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/interviews",
            interview_body("Acme", "2024-03-10"),
        ))
        .await
        .unwrap();

    let response = router
        .clone()
        .oneshot(empty_request("DELETE", "/api/account"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report: DeletionReportDto = body_json(response).await?;
    assert_eq!(report.interviews_removed, 1);
    assert!(report.profile_removed);

    let response = router
        .clone()
        .oneshot(empty_request("GET", "/api/interviews"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    module.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn partial_account_deletion_is_a_500_with_steps() -> Result<()> {
    let module = Interviews::init(InterviewsConfig::default());
    let router = module.router();
    sign_in(&router, "u1").await?;
    module.blobs().set_offline(true);

    let response = router
        .clone()
        .oneshot(empty_request("DELETE", "/api/account"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let problem: Problem = body_json(response).await?;
    assert_eq!(problem.completed_steps, Some(vec!["interviews".to_string()]));
    assert_eq!(problem.failed_step.as_deref(), Some("images"));

    // still signed in: nothing was fully removed
    let response = router
        .clone()
        .oneshot(empty_request("GET", "/api/profile"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    module.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn sign_in_rejects_a_blank_user_id() -> Result<()> {
    let module = Interviews::init(InterviewsConfig::default());
    let response = module
        .router()
        .oneshot(json_request(
            "POST",
            "/api/session",
            json!({ "user_id": " ", "email": "x@example.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
