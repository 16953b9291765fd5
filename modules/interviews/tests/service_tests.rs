use std::time::Duration;

use anyhow::Result;

use interviews::contract::error::InterviewsError;
use interviews::contract::model::{
    DeletionStep, FieldUpdate, ImageSlot, ImageUpload, InterviewDraft, InterviewPatch,
    InterviewStatus, PriorityLevel, ProfilePatch,
};
use interviews::domain::error::DomainError;
use interviews::domain::ports::{BlobStore, RecordStore};
use interviews::domain::views::{InterviewFilter, PriorityFilter, Selector, StatusFilter};
use interviews::{Interviews, InterviewsConfig};

const WAIT: Duration = Duration::from_secs(2);

/// Module with `u1` signed in and the first snapshot delivered.
async fn signed_in_module() -> Interviews {
    let module = Interviews::init(InterviewsConfig::default());
    module.session().sign_in("u1", "u1@example.com");
    assert!(module.service().wait_until_bound("u1", WAIT).await);
    module
}

async fn wait_for_count(module: &Interviews, count: usize) {
    let mut rx = module.service().synchronizer().watch_state();
    tokio::time::timeout(
        WAIT,
        rx.wait_for(|s| s.loaded && s.interviews.len() == count),
    )
    .await
    .expect("timed out waiting for the canonical list")
    .expect("synchronizer dropped");
}

fn draft(
    company: &str,
    position: &str,
    date: &str,
    priority: PriorityLevel,
    status: InterviewStatus,
) -> InterviewDraft {
    InterviewDraft {
        company_name: company.to_string(),
        job_position: position.to_string(),
        interviewer_name: "Sam Carter".to_string(),
        interview_date: date.to_string(),
        priority_level: priority,
        status: Some(status),
    }
}

async fn seed_board(module: &Interviews) -> Result<()> {
    let svc = module.service();
    svc.create_interview(draft(
        "Acme",
        "Rust Engineer",
        "2024-03-10",
        PriorityLevel::High,
        InterviewStatus::Pending,
    ))
    .await?;
    svc.create_interview(draft(
        "Globex",
        "Platform Engineer",
        "2024-02-01",
        PriorityLevel::Low,
        InterviewStatus::Pending,
    ))
    .await?;
    svc.create_interview(draft(
        "Initech",
        "Data Engineer",
        "2024-01-15",
        PriorityLevel::Medium,
        InterviewStatus::Passed,
    ))
    .await?;
    svc.create_interview(draft(
        "Umbrella",
        "SRE",
        "2024-04-20",
        PriorityLevel::High,
        InterviewStatus::NoFeedback,
    ))
    .await?;
    wait_for_count(module, 4).await;
    Ok(())
}

#[tokio::test]
async fn waiting_for_a_user_who_never_signs_in_times_out() {
    let module = Interviews::init(InterviewsConfig::default());
    module.session().sign_in("u1", "u1@example.com");

    let bound = module
        .service()
        .wait_until_bound("u2", Duration::from_millis(100))
        .await;

    assert!(!bound);
    assert!(module.service().wait_until_bound("u1", WAIT).await);
    module.shutdown().await;
}

#[tokio::test]
async fn dashboard_reflects_the_canonical_list() -> Result<()> {
    let module = signed_in_module().await;
    seed_board(&module).await?;

    let view = module.service().dashboard("")?;
    assert_eq!(view.stats.total, 4);
    assert_eq!(view.stats.pending, 2);
    assert_eq!(view.stats.passed, 1);
    assert_eq!(view.stats.failed, 0);
    assert_eq!(view.stats.no_feedback, 1);

    let pending: Vec<&str> = view.pending.iter().map(|i| i.company_name.as_str()).collect();
    assert_eq!(pending, vec!["Globex", "Acme"]);

    let searched = module.service().dashboard("ACME")?;
    assert_eq!(searched.pending.len(), 1);
    assert_eq!(searched.stats.total, 4);

    module.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn list_applies_search_status_and_priority_together() -> Result<()> {
    let module = signed_in_module().await;
    seed_board(&module).await?;
    let svc = module.service();

    let all = svc.list_interviews(&InterviewFilter::default())?;
    let dates: Vec<String> = all.iter().map(|i| i.interview_date.to_string()).collect();
    assert_eq!(
        dates,
        vec!["2024-04-20", "2024-03-10", "2024-02-01", "2024-01-15"]
    );

    let engineers_high = svc.list_interviews(&InterviewFilter {
        search: "engineer".into(),
        status: StatusFilter::All,
        priority: PriorityFilter::Only(PriorityLevel::High),
    })?;
    assert_eq!(engineers_high.len(), 1);
    assert_eq!(engineers_high[0].company_name, "Acme");

    let by_interviewer = svc.list_interviews(&InterviewFilter {
        search: "carter".into(),
        status: Selector::Only(InterviewStatus::Pending),
        priority: Selector::All,
    })?;
    assert_eq!(by_interviewer.len(), 2);

    let none = svc.list_interviews(&InterviewFilter {
        search: "zzz".into(),
        ..Default::default()
    })?;
    assert!(none.is_empty());

    module.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn reads_without_a_session_are_unauthenticated() -> Result<()> {
    let module = Interviews::init(InterviewsConfig::default());

    let err = module
        .service()
        .list_interviews(&InterviewFilter::default())
        .unwrap_err();
    assert!(matches!(err, DomainError::Unauthenticated));
    assert!(matches!(
        module.service().dashboard(""),
        Err(DomainError::Unauthenticated)
    ));

    module.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn switching_users_never_shows_the_previous_list() -> Result<()> {
    let module = signed_in_module().await;
    seed_board(&module).await?;

    module.session().sign_in("u2", "u2@example.com");
    // before or after the binding catches up, u2 sees nothing of u1's
    assert!(module
        .service()
        .list_interviews(&InterviewFilter::default())?
        .is_empty());
    assert!(module.service().wait_until_bound("u2", WAIT).await);
    assert!(module
        .service()
        .list_interviews(&InterviewFilter::default())?
        .is_empty());

    module.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn profile_is_created_once_on_first_access() -> Result<()> {
    let module = signed_in_module().await;
    let svc = module.service();

    let first = svc.profile().await?;
    assert_eq!(first.id, "u1");
    assert_eq!(first.email, "u1@example.com");
    assert!(first.needs_onboarding());

    let second = svc.profile().await?;
    assert_eq!(second.created_at, first.created_at);
    assert_eq!(module.store().len("profiles"), 1);

    module.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn profile_update_sets_and_clears_fields() -> Result<()> {
    let module = signed_in_module().await;
    let svc = module.service();

    let updated = svc
        .update_profile(ProfilePatch {
            full_name: FieldUpdate::Set("Uma One".into()),
            professional_title: FieldUpdate::Set("Engineer".into()),
            onboarding_completed: Some(true),
            ..Default::default()
        })
        .await?;
    assert_eq!(updated.full_name.as_deref(), Some("Uma One"));
    assert!(updated.onboarding_completed);

    let cleared = svc
        .update_profile(ProfilePatch {
            professional_title: FieldUpdate::Unset,
            ..Default::default()
        })
        .await?;
    assert_eq!(cleared.professional_title, None);
    assert_eq!(cleared.full_name.as_deref(), Some("Uma One"));

    let accepted = svc.accept_terms().await?;
    assert!(accepted.terms_accepted);
    assert!(accepted.terms_accepted_at.is_some());
    assert!(!accepted.needs_onboarding());

    let err = svc
        .update_profile(ProfilePatch {
            full_name: FieldUpdate::Set("x".repeat(500)),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(err.is_validation());

    module.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn avatar_upload_stores_the_image_and_links_it() -> Result<()> {
    let module = signed_in_module().await;
    let svc = module.service();

    let profile = svc
        .upload_image(
            ImageSlot::Avatar,
            ImageUpload {
                bytes: vec![0x89, b'P', b'N', b'G'],
                content_type: "image/png".into(),
            },
        )
        .await?;

    let paths = module.blobs().paths();
    assert_eq!(paths.len(), 1);
    assert!(paths[0].starts_with("avatars/u1-"));
    assert!(paths[0].ends_with(".png"));
    assert_eq!(
        profile.avatar_url.as_deref(),
        Some(module.blobs().url_for(&paths[0]).as_str())
    );

    let blob = module.blobs().get(&paths[0]).await?.expect("stored blob");
    assert_eq!(blob.content_type, "image/png");

    let err = svc
        .upload_image(
            ImageSlot::Cover,
            ImageUpload {
                bytes: b"%PDF".to_vec(),
                content_type: "application/pdf".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_validation());

    module.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn export_contains_profile_and_interviews() -> Result<()> {
    let module = signed_in_module().await;
    seed_board(&module).await?;
    module.service().profile().await?;

    let data = module.service().export_data().await?;
    assert_eq!(data.interviews.len(), 4);
    assert_eq!(data.interviews[0].company_name, "Umbrella");
    assert_eq!(
        data.profile.as_ref().map(|p| p.email.as_str()),
        Some("u1@example.com")
    );
    assert!(data.file_name().starts_with("interfy-export-"));
    assert!(data.file_name().ends_with(".json"));

    module.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn account_deletion_removes_everything_the_user_owns() -> Result<()> {
    let module = signed_in_module().await;
    seed_board(&module).await?;
    let svc = module.service();
    svc.upload_image(
        ImageSlot::Cover,
        ImageUpload {
            bytes: vec![1, 2, 3],
            content_type: "image/jpeg".into(),
        },
    )
    .await?;

    let report = svc.delete_account().await?;
    assert_eq!(report.interviews_removed, 4);
    assert_eq!(report.images_removed, 1);
    assert!(report.profile_removed);

    assert!(module.store().is_empty("interviews"));
    assert!(module.store().is_empty("profiles"));
    assert!(module.blobs().paths().is_empty());
    assert!(svc.synchronizer().current().interviews.is_empty());

    module.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn account_deletion_reports_the_failed_step() -> Result<()> {
    let module = signed_in_module().await;
    seed_board(&module).await?;
    module.service().profile().await?;
    module.blobs().set_offline(true);

    let err = module.service().delete_account().await.unwrap_err();
    match &err {
        DomainError::AccountDeletionIncomplete {
            completed,
            failed,
            removed,
            ..
        } => {
            assert_eq!(completed, &vec![DeletionStep::Interviews]);
            assert_eq!(*failed, DeletionStep::Images);
            assert_eq!(removed.interviews_removed, 4);
        }
        other => panic!("expected AccountDeletionIncomplete, got {other:?}"),
    }
    assert!(module.store().is_empty("interviews"));
    assert_eq!(module.store().len("profiles"), 1);

    match InterviewsError::from(err) {
        InterviewsError::AccountDeletionIncomplete {
            completed,
            failed,
            removed,
            ..
        } => {
            assert_eq!(removed.interviews_removed, 4);
            assert_eq!(completed, vec!["interviews".to_string()]);
            assert_eq!(failed, "images");
        }
        other => panic!("unexpected mapping: {other:?}"),
    }

    module.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn owner_rule_keeps_profiles_private() -> Result<()> {
    let module = signed_in_module().await;
    module.service().profile().await?;

    module.session().sign_in("u2", "u2@example.com");
    let store = module.store();
    let err = store
        .get("profiles", &"u1".into())
        .await
        .unwrap_err();
    assert!(matches!(
        InterviewsError::from(DomainError::from(err)),
        InterviewsError::Auth { .. }
    ));

    module.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn local_client_maps_domain_errors() -> Result<()> {
    let module = signed_in_module().await;
    let client = module.client();

    let id = client
        .create_interview(draft(
            "Acme",
            "Rust Engineer",
            "2024-03-10T09:30",
            PriorityLevel::Medium,
            InterviewStatus::Pending,
        ))
        .await?;
    wait_for_count(&module, 1).await;

    let listed = client.list_interviews(InterviewFilter::default()).await?;
    assert_eq!(listed[0].id, id);
    assert_eq!(listed[0].interview_date.to_string(), "2024-03-10");

    let err = client
        .update_interview(id.clone(), InterviewPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, InterviewsError::Validation { .. }));

    let err = client.delete_interview("x".into()).await.unwrap_err();
    assert!(matches!(err, InterviewsError::Backend { .. }));

    client.delete_interview(id).await?;
    wait_for_count(&module, 0).await;

    module.session().sign_out();
    let err = client.dashboard("").await.unwrap_err();
    assert!(matches!(err, InterviewsError::Auth { .. }));

    module.shutdown().await;
    Ok(())
}
