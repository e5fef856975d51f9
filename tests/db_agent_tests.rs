mod common;

use chrono::NaiveDate;
use common::TestDb;
use gabinete::GabineteError;
use gabinete::db::{AgentConfigurationUpsert, AgentLogCreate, CabinetCreate};
use gabinete::error::IntegrityKind;
use gabinete::prompt::PromptContext;
use gabinete_schema::{FieldUpdate, TenantContext};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn first_upsert_creates_from_defaults() {
    let db = TestDb::new("agent-defaults").await;
    let cabinet_id = db.cabinet("Gabinete Agente").await;

    let missing = db.handle.get_agent_configuration(cabinet_id).await.unwrap_err();
    assert!(matches!(missing, GabineteError::NotFound { .. }));

    let cfg = db
        .handle
        .upsert_agent_configuration(cabinet_id, AgentConfigurationUpsert::default())
        .await
        .unwrap();
    assert_eq!(cfg.cabinet_id, cabinet_id);
    assert_eq!(cfg.agent_name, "Assistente Virtual");
    assert_eq!(cfg.tone, "Empático e Acolhedor");
    assert!(cfg.is_active);
    assert!(cfg.system_prompt.contains("{{politician_name}}"));
    assert!(cfg.copilot_system_prompt.is_none());
}

#[tokio::test]
async fn upsert_keeps_one_configuration_per_cabinet() {
    let db = TestDb::new("agent-single").await;
    let cabinet_id = db.cabinet("Gabinete Único").await;

    let first = db
        .handle
        .upsert_agent_configuration(
            cabinet_id,
            AgentConfigurationUpsert {
                agent_name: Some("Clara".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let second = db
        .handle
        .upsert_agent_configuration(
            cabinet_id,
            AgentConfigurationUpsert {
                tone: Some("Formal".into()),
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(second.agent_name, "Clara");
    assert_eq!(second.tone, "Formal");
    assert!(!second.is_active);

    let counts = db.handle.table_counts().await.unwrap();
    assert!(counts.contains(&("agent_configurations", 1)));

    // A second row for the same cabinet is refused by the engine.
    let pool = db.raw_pool().await;
    let err = sqlx::query("INSERT INTO agent_configurations (cabinet_id) VALUES (?)")
        .bind(cabinet_id)
        .execute(&pool)
        .await
        .unwrap_err();
    match GabineteError::from(err) {
        GabineteError::Integrity { kind, .. } => assert_eq!(kind, IntegrityKind::Unique),
        other => panic!("expected integrity error, got {other:?}"),
    }
    pool.close().await;
}

#[tokio::test]
async fn upsert_for_unknown_cabinet_is_an_integrity_error() {
    let db = TestDb::new("agent-fk").await;

    let err = db
        .handle
        .upsert_agent_configuration(Uuid::new_v4(), AgentConfigurationUpsert::default())
        .await
        .unwrap_err();
    match err {
        GabineteError::Integrity { kind, .. } => assert_eq!(kind, IntegrityKind::ForeignKey),
        other => panic!("expected integrity error, got {other:?}"),
    }
}

#[tokio::test]
async fn stored_prompt_renders_for_its_cabinet() {
    let db = TestDb::new("agent-prompt").await;
    let cabinet = db
        .handle
        .create_cabinet(CabinetCreate {
            official_name: Some("Ana Lima".into()),
            ..CabinetCreate::new("Gabinete Prompt")
        })
        .await
        .unwrap();
    let cfg = db
        .handle
        .upsert_agent_configuration(cabinet.id, AgentConfigurationUpsert::default())
        .await
        .unwrap();

    let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
    let prompt = cfg.render_system_prompt(&PromptContext::for_cabinet(&cabinet, today));
    assert!(prompt.contains("Vereador Ana Lima"));
    assert!(prompt.contains("Empático e Acolhedor"));
    assert!(prompt.contains("16/10/2026"));
    assert!(!prompt.contains("{{"));
}

#[tokio::test]
async fn logs_are_listed_newest_first_per_cabinet() {
    let db = TestDb::new("agent-logs").await;
    let cabinet_a = db.cabinet("Gabinete A").await;
    let cabinet_b = db.cabinet("Gabinete B").await;

    for action in ["receive_message", "generate_reply", "send_message"] {
        db.handle
            .append_agent_log(
                Some(TenantContext::new(cabinet_a)),
                AgentLogCreate::new(Some(cabinet_a), "whatsapp", action, "success")
                    .with_payload(json!({ "action": action })),
            )
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }
    db.handle
        .append_agent_log(
            Some(TenantContext::new(cabinet_b)),
            AgentLogCreate::new(Some(cabinet_b), "whatsapp", "receive_message", "error"),
        )
        .await
        .unwrap();
    let orphan = db
        .handle
        .append_agent_log(None, AgentLogCreate::new(None, "gateway", "auth", "denied"))
        .await
        .unwrap();
    assert!(orphan.cabinet_id.is_none());
    assert_eq!(orphan.payload.0, json!({}));

    let logs = db.handle.list_agent_logs(cabinet_a, 10).await.unwrap();
    let actions: Vec<_> = logs.iter().map(|l| l.action.as_str()).collect();
    assert_eq!(actions, ["send_message", "generate_reply", "receive_message"]);
    assert!(logs.iter().all(|l| l.cabinet_id == Some(cabinet_a)));
    assert_eq!(logs[0].payload.0, json!({ "action": "send_message" }));

    let limited = db.handle.list_agent_logs(cabinet_a, 1).await.unwrap();
    assert_eq!(limited.len(), 1);

    let blank = db
        .handle
        .append_agent_log(None, AgentLogCreate::new(None, "gateway", " ", "ok"))
        .await
        .unwrap_err();
    assert!(matches!(blank, GabineteError::Validation(ref v) if v.field == "action"));
}

#[tokio::test]
async fn logs_cannot_be_rewritten() {
    let db = TestDb::new("agent-logs-append-only").await;
    let cabinet_id = db.cabinet("Gabinete Auditoria").await;
    let log = db
        .handle
        .append_agent_log(
            Some(TenantContext::new(cabinet_id)),
            AgentLogCreate::new(Some(cabinet_id), "n8n", "sync", "success"),
        )
        .await
        .unwrap();

    let pool = db.raw_pool().await;
    let err = sqlx::query("UPDATE agent_logs SET status = 'error' WHERE id = ?")
        .bind(log.id)
        .execute(&pool)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("append-only"), "{err}");

    // Removing the cabinet keeps its history, detached.
    sqlx::query("DELETE FROM cabinets WHERE id = ?")
        .bind(cabinet_id)
        .execute(&pool)
        .await
        .unwrap();
    let detached: Option<Uuid> = sqlx::query_scalar("SELECT cabinet_id FROM agent_logs WHERE id = ?")
        .bind(log.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(detached.is_none());
    pool.close().await;
}

#[tokio::test]
async fn logs_cannot_be_written_for_another_cabinet() {
    let db = TestDb::new("agent-logs-tenant").await;
    let cabinet_a = db.cabinet("Gabinete A").await;
    let cabinet_b = db.cabinet("Gabinete B").await;

    let foreign = db
        .handle
        .append_agent_log(
            Some(TenantContext::new(cabinet_a)),
            AgentLogCreate::new(Some(cabinet_b), "whatsapp", "send_message", "success"),
        )
        .await
        .unwrap_err();
    assert!(matches!(foreign, GabineteError::Validation(ref v) if v.field == "cabinet_id"));

    let unscoped = db
        .handle
        .append_agent_log(
            None,
            AgentLogCreate::new(Some(cabinet_b), "whatsapp", "send_message", "success"),
        )
        .await
        .unwrap_err();
    assert!(matches!(unscoped, GabineteError::Validation(ref v) if v.field == "cabinet_id"));

    assert!(db.handle.list_agent_logs(cabinet_b, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn upsert_null_clears_optional_texts() {
    let db = TestDb::new("agent-clear").await;
    let cabinet_id = db.cabinet("Gabinete Limpo").await;

    let cfg = db
        .handle
        .upsert_agent_configuration(
            cabinet_id,
            AgentConfigurationUpsert {
                welcome_message: FieldUpdate::Set("Olá!".into()),
                copilot_system_prompt: FieldUpdate::Set("Apoie a equipe.".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(cfg.welcome_message.as_deref(), Some("Olá!"));

    let untouched = db
        .handle
        .upsert_agent_configuration(cabinet_id, AgentConfigurationUpsert::default())
        .await
        .unwrap();
    assert_eq!(untouched.copilot_system_prompt.as_deref(), Some("Apoie a equipe."));

    let clear: AgentConfigurationUpsert =
        serde_json::from_value(json!({ "welcome_message": null, "copilot_system_prompt": null }))
            .unwrap();
    let cleared = db
        .handle
        .upsert_agent_configuration(cabinet_id, clear)
        .await
        .unwrap();
    assert!(cleared.welcome_message.is_none());
    assert!(cleared.copilot_system_prompt.is_none());
    assert_eq!(cleared.agent_name, untouched.agent_name);
}
