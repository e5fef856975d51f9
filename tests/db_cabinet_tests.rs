mod common;

use chrono::{NaiveDate, Utc};
use common::TestDb;
use gabinete::GabineteError;
use gabinete::db::{CabinetCreate, CabinetPatch, CalendarTokens};
use gabinete::error::IntegrityKind;
use gabinete_schema::{CabinetStatus, FieldUpdate, Plan};
use uuid::Uuid;

#[tokio::test]
async fn create_applies_column_defaults() {
    let db = TestDb::new("cabinet-defaults").await;

    let cabinet = db
        .handle
        .create_cabinet(CabinetCreate::new("Gabinete Central"))
        .await
        .unwrap();

    assert_eq!(cabinet.name, "Gabinete Central");
    assert_eq!(cabinet.plan, Plan::Free);
    assert_eq!(cabinet.status, CabinetStatus::Active);
    assert_eq!(cabinet.plan_tier, "basic");
    assert_eq!(cabinet.mrr_value, 0.0);
    assert!(!cabinet.use_letterhead);
    assert_eq!(cabinet.google_calendar_id, "primary");
    assert!(cabinet.agent_access_token.is_none());

    let fetched = db.handle.get_cabinet(cabinet.id).await.unwrap();
    assert_eq!(fetched, cabinet);
}

#[tokio::test]
async fn create_honours_explicit_plan_and_status() {
    let db = TestDb::new("cabinet-explicit").await;

    let create = CabinetCreate {
        plan: Some(Plan::Enterprise),
        status: Some(CabinetStatus::Trial),
        official_name: Some("Ana Lima".into()),
        ..CabinetCreate::new("Gabinete Norte")
    };
    let cabinet = db.handle.create_cabinet(create).await.unwrap();

    assert_eq!(cabinet.plan, Plan::Enterprise);
    assert_eq!(cabinet.status, CabinetStatus::Trial);
    assert_eq!(cabinet.official_name.as_deref(), Some("Ana Lima"));
}

#[tokio::test]
async fn blank_name_is_a_validation_error() {
    let db = TestDb::new("cabinet-blank").await;

    let err = db
        .handle
        .create_cabinet(CabinetCreate::new("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, GabineteError::Validation(ref v) if v.field == "name"));
}

#[tokio::test]
async fn unknown_plan_is_rejected_by_the_engine() {
    let db = TestDb::new("cabinet-plan-check").await;
    let id = db.cabinet("Gabinete Sul").await;
    let pool = db.raw_pool().await;

    let err = sqlx::query("UPDATE cabinets SET plan = 'gold' WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .unwrap_err();
    match GabineteError::from(err) {
        GabineteError::Integrity {
            kind, constraint, ..
        } => {
            assert_eq!(kind, IntegrityKind::Check);
            assert_eq!(constraint, "cabinets_plan_check");
        }
        other => panic!("expected integrity error, got {other:?}"),
    }

    let err = sqlx::query("UPDATE cabinets SET status = 'deleted' WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .unwrap_err();
    assert!(GabineteError::from(err).is_integrity());

    let cabinet = db.handle.get_cabinet(id).await.unwrap();
    assert_eq!(cabinet.plan, Plan::Free);
    assert_eq!(cabinet.status, CabinetStatus::Active);

    // The typed path never gets that far.
    assert!(serde_json::from_str::<Plan>(r#""gold""#).is_err());
    pool.close().await;
}

#[tokio::test]
async fn agent_access_token_is_unique() {
    let db = TestDb::new("cabinet-token-unique").await;

    let first = CabinetCreate {
        agent_access_token: Some("agt_shared_token_1".into()),
        ..CabinetCreate::new("Gabinete A")
    };
    db.handle.create_cabinet(first).await.unwrap();

    let second = CabinetCreate {
        agent_access_token: Some("agt_shared_token_1".into()),
        ..CabinetCreate::new("Gabinete B")
    };
    let err = db.handle.create_cabinet(second).await.unwrap_err();
    match err {
        GabineteError::Integrity {
            kind, constraint, ..
        } => {
            assert_eq!(kind, IntegrityKind::Unique);
            assert!(constraint.contains("agent_access_token"), "{constraint}");
        }
        other => panic!("expected integrity error, got {other:?}"),
    }

    // The failed create rolled back as a whole.
    let counts = db.handle.table_counts().await.unwrap();
    assert_eq!(counts[0], ("cabinets", 1));
}

#[tokio::test]
async fn agent_token_lookup_skips_archived_cabinets() {
    let db = TestDb::new("cabinet-token-lookup").await;

    let create = CabinetCreate {
        agent_access_token: Some("agt_lookup_token".into()),
        ..CabinetCreate::new("Gabinete Leste")
    };
    let cabinet = db.handle.create_cabinet(create).await.unwrap();

    let found = db
        .handle
        .find_cabinet_by_agent_token("agt_lookup_token")
        .await
        .unwrap();
    assert_eq!(found.id, cabinet.id);

    let missing = db
        .handle
        .find_cabinet_by_agent_token("agt_unknown_token")
        .await
        .unwrap_err();
    assert!(matches!(missing, GabineteError::NotFound { entity: "cabinet", .. }));

    let archived = db.handle.archive_cabinet(cabinet.id).await.unwrap();
    assert!(archived.is_archived());
    assert!(
        db.handle
            .find_cabinet_by_agent_token("agt_lookup_token")
            .await
            .is_err()
    );

    // Archived, not deleted.
    assert!(db.handle.get_cabinet(cabinet.id).await.is_ok());
}

#[tokio::test]
async fn patch_only_touches_provided_fields() {
    let db = TestDb::new("cabinet-patch").await;
    let create = CabinetCreate {
        official_name: Some("Ana Lima".into()),
        ..CabinetCreate::new("Gabinete Oeste")
    };
    let before = db.handle.create_cabinet(create).await.unwrap();

    let patch = CabinetPatch {
        plan: Some(Plan::Pro),
        mrr_value: Some(199.9),
        next_payment: FieldUpdate::Set(NaiveDate::from_ymd_opt(2026, 11, 5).unwrap()),
        use_letterhead: Some(true),
        gemini_api_key: FieldUpdate::Set("AIzaSyTESTKEY".into()),
        ..Default::default()
    };
    db.handle.patch_cabinet(before.id, patch).await.unwrap();

    let after = db.handle.get_cabinet(before.id).await.unwrap();
    assert_eq!(after.plan, Plan::Pro);
    assert_eq!(after.mrr_value, 199.9);
    assert_eq!(after.next_payment, NaiveDate::from_ymd_opt(2026, 11, 5));
    assert!(after.use_letterhead);
    assert_eq!(after.gemini_api_key.as_deref(), Some("AIzaSyTESTKEY"));
    assert_eq!(after.name, before.name);
    assert_eq!(after.official_name, before.official_name);
    assert_eq!(after.status, before.status);
    assert_eq!(after.timestamps.created_at, before.timestamps.created_at);
    assert!(after.timestamps.updated_at >= before.timestamps.updated_at);

    let err = db
        .handle
        .patch_cabinet(Uuid::new_v4(), CabinetPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GabineteError::NotFound { entity: "cabinet", .. }));
}

#[tokio::test]
async fn patch_rejects_blank_name_and_token() {
    let db = TestDb::new("cabinet-patch-blank").await;
    let create = CabinetCreate {
        agent_access_token: Some("tok-oeste".into()),
        ..CabinetCreate::new("Gabinete Oeste")
    };
    let before = db.handle.create_cabinet(create).await.unwrap();

    let blank_name = CabinetPatch {
        name: Some("   ".into()),
        ..Default::default()
    };
    let err = db.handle.patch_cabinet(before.id, blank_name).await.unwrap_err();
    assert!(matches!(err, GabineteError::Validation(ref v) if v.field == "name"));

    let empty_token = CabinetPatch {
        agent_access_token: FieldUpdate::Set(String::new()),
        ..Default::default()
    };
    let err = db.handle.patch_cabinet(before.id, empty_token).await.unwrap_err();
    assert!(matches!(err, GabineteError::Validation(ref v) if v.field == "agent_access_token"));

    let after = db.handle.get_cabinet(before.id).await.unwrap();
    assert_eq!(after.name, "Gabinete Oeste");
    assert_eq!(after.agent_access_token.as_deref(), Some("tok-oeste"));
}

#[tokio::test]
async fn patch_null_clears_optional_settings() {
    let db = TestDb::new("cabinet-patch-clear").await;
    let create = CabinetCreate {
        official_name: Some("Ana Lima".into()),
        agent_access_token: Some("tok-sul".into()),
        ..CabinetCreate::new("Gabinete Sul")
    };
    let cabinet = db.handle.create_cabinet(create).await.unwrap();
    let set = CabinetPatch {
        payment_method: FieldUpdate::Set("pix".into()),
        openai_api_key: FieldUpdate::Set("sk-test".into()),
        ..Default::default()
    };
    db.handle.patch_cabinet(cabinet.id, set).await.unwrap();

    let clear: CabinetPatch = serde_json::from_value(serde_json::json!({
        "payment_method": null,
        "openai_api_key": null,
        "agent_access_token": null,
    }))
    .unwrap();
    db.handle.patch_cabinet(cabinet.id, clear).await.unwrap();

    let after = db.handle.get_cabinet(cabinet.id).await.unwrap();
    assert!(after.payment_method.is_none());
    assert!(after.openai_api_key.is_none());
    assert!(after.agent_access_token.is_none());
    assert_eq!(after.official_name.as_deref(), Some("Ana Lima"));

    // A revoked token no longer authenticates.
    assert!(db.handle.find_cabinet_by_agent_token("tok-sul").await.is_err());
}

#[tokio::test]
async fn calendar_tokens_are_stored_and_cleared() {
    let db = TestDb::new("cabinet-calendar").await;
    let id = db.cabinet("Gabinete Agenda").await;
    let expires_at = Utc::now().timestamp_millis() + 3_600_000;

    db.handle
        .update_calendar_tokens(
            id,
            CalendarTokens {
                access_token: "ya29.first".into(),
                refresh_token: Some("1//refresh".into()),
                expires_at,
                calendar_id: None,
                email: Some("agenda@example.com".into()),
            },
        )
        .await
        .unwrap();

    let linked = db.handle.get_cabinet(id).await.unwrap();
    assert!(linked.has_calendar_link());
    assert_eq!(linked.google_token_expires_at, Some(expires_at));
    assert_eq!(linked.google_calendar_id, "primary");
    assert!(!linked.calendar_token_expired(Utc::now()));

    // A refresh without a new refresh token keeps the stored one.
    db.handle
        .update_calendar_tokens(
            id,
            CalendarTokens {
                access_token: "ya29.second".into(),
                refresh_token: None,
                expires_at: expires_at + 1,
                calendar_id: None,
                email: None,
            },
        )
        .await
        .unwrap();
    let refreshed = db.handle.get_cabinet(id).await.unwrap();
    assert_eq!(refreshed.google_access_token.as_deref(), Some("ya29.second"));
    assert_eq!(refreshed.google_refresh_token.as_deref(), Some("1//refresh"));
    assert_eq!(refreshed.google_email.as_deref(), Some("agenda@example.com"));

    db.handle.disconnect_calendar(id).await.unwrap();
    let cleared = db.handle.get_cabinet(id).await.unwrap();
    assert!(!cleared.has_calendar_link());
    assert!(cleared.google_access_token.is_none());
    assert!(cleared.google_token_expires_at.is_none());
    assert_eq!(cleared.google_email.as_deref(), Some("agenda@example.com"));
}

#[tokio::test]
async fn status_changes_are_validated_by_type() {
    let db = TestDb::new("cabinet-status").await;
    let id = db.cabinet("Gabinete Status").await;

    let suspended = db
        .handle
        .set_cabinet_status(id, CabinetStatus::Suspended)
        .await
        .unwrap();
    assert_eq!(suspended.status, CabinetStatus::Suspended);

    let err = db
        .handle
        .set_cabinet_status(Uuid::new_v4(), CabinetStatus::Active)
        .await
        .unwrap_err();
    assert!(matches!(err, GabineteError::NotFound { .. }));
}
