#![allow(clippy::expect_used, clippy::unwrap_used)]

mod common;

use std::sync::Arc;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use sigec_codec::{FieldValue, SchemaBuilder, SchemaError, ValueKind, decode, encode};
use sigec_store::{
    HeaderPolicy, MemorySheet, Operation, SaveOutcome, SyncConfig, SyncCoordinator, SyncError,
};
use tokio_util::sync::CancellationToken;

use common::{client, coordinator, fast_config, schema, stored};

#[tokio::test]
async fn first_save_writes_header_then_appends() {
    let sheet = Arc::new(MemorySheet::new());
    let sync = coordinator(&sheet);
    let record = client("c-1", "Padaria Central");

    assert_eq!(sync.save(&record).await.expect("save"), SaveOutcome::Appended);

    let rows = sheet.rows().await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], sync.schema().header());
    assert_eq!(decode(&rows[1], sync.schema()), record);
    assert_eq!(sheet.calls(Operation::WriteRow).await, 1);
    assert_eq!(sheet.calls(Operation::AppendRow).await, 1);
}

#[tokio::test]
async fn saving_a_known_id_overwrites_its_row() {
    let sheet = Arc::new(MemorySheet::new());
    let sync = coordinator(&sheet);
    sync.save(&client("c-1", "Padaria Central")).await.expect("save");
    sync.save(&client("c-2", "Oficina do Zé")).await.expect("save");

    let mut changed = client("c-1", "Padaria Central LTDA");
    changed.set_group_field("partner", 3, "nome", "Carla");
    assert_eq!(
        sync.save(&changed).await.expect("save"),
        SaveOutcome::Updated { row: 2 }
    );

    let rows = sheet.rows().await;
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1], stored(encode(&changed, sync.schema()).expect("encodes")));
    assert_eq!(decode(&rows[2], sync.schema()).id(), Some("c-2"));
}

#[tokio::test]
async fn update_keeps_creation_time_when_omitted() {
    let sheet = Arc::new(MemorySheet::new());
    let sync = coordinator(&sheet);
    let (id, outcome) = sync
        .create(&client("", "Padaria Central"))
        .await
        .expect("create");
    assert_eq!(outcome, SaveOutcome::Appended);

    let created = sync.fetch(&id).await.expect("fetch").expect("stored");
    let created_at = created.record.get("criado_em").cloned();
    assert!(matches!(created_at, Some(FieldValue::Timestamp(_))));

    sync.save(&client(&id, "Padaria Central LTDA")).await.expect("update");
    let updated = sync.fetch(&id).await.expect("fetch").expect("stored");
    assert_eq!(updated.row, 2);
    assert_eq!(updated.record.get("criado_em").cloned(), created_at);
    assert_eq!(
        updated.record.get("nome_empresa"),
        Some(&FieldValue::text("Padaria Central LTDA"))
    );
}

#[tokio::test]
async fn create_assigns_a_uuid() {
    let sheet = Arc::new(MemorySheet::new());
    let sync = coordinator(&sheet);
    let (first, _) = sync.create(&client("", "A")).await.expect("create");
    let (second, _) = sync.create(&client("", "B")).await.expect("create");

    assert_ne!(first, second);
    assert!(uuid_like(&first), "{first}");
    assert_eq!(sync.locate(&second).await.expect("locate"), Some(3));
}

fn uuid_like(id: &str) -> bool {
    id.len() == 36 && id.chars().filter(|c| *c == '-').count() == 4
}

#[tokio::test]
async fn header_mismatch_refuses_to_write() {
    let schema = schema();
    let mut header = schema.header();
    header.swap(1, 2);
    let sheet = Arc::new(MemorySheet::with_rows(vec![header]));
    let sync = coordinator(&sheet);

    let err = sync
        .save(&client("c-1", "Padaria Central"))
        .await
        .expect_err("header differs");
    match err {
        SyncError::SchemaMismatch { position, expected, found } => {
            assert_eq!(position, 2);
            assert_eq!(expected, "razao_social");
            assert_eq!(found, "nome_fantasia");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(sheet.writes().await, 0);
}

#[tokio::test]
async fn older_header_prefix_depends_on_policy() {
    let v1 = schema();
    let v2 = Arc::new(
        SchemaBuilder::extending(&v1, 2)
            .scalar("nire", ValueKind::Text)
            .build()
            .expect("v2"),
    );
    let seeded = || Arc::new(MemorySheet::with_rows(vec![v1.header()]));

    let strict_sheet = seeded();
    let strict = SyncCoordinator::new(Arc::clone(&strict_sheet), Arc::clone(&v2), fast_config());
    let err = strict
        .save(&client("c-1", "A"))
        .await
        .expect_err("strict policy rejects older header");
    assert!(matches!(err, SyncError::SchemaMismatch { position, .. } if position == v1.width() + 1));
    assert_eq!(strict_sheet.writes().await, 0);

    let lenient_sheet = seeded();
    let config = SyncConfig {
        header_policy: HeaderPolicy::ExtendPrefix,
        ..fast_config()
    };
    let lenient = SyncCoordinator::new(Arc::clone(&lenient_sheet), Arc::clone(&v2), config);
    lenient.save(&client("c-1", "A")).await.expect("header extended");
    assert_eq!(lenient_sheet.rows().await[0], v2.header());
}

#[tokio::test]
async fn list_skips_rows_without_id() {
    let schema = schema();
    let mut orphan = vec![String::new(); schema.width()];
    orphan[0] = "Sem identificador".to_string();
    let sheet = Arc::new(MemorySheet::with_rows(vec![schema.header(), orphan]));
    let sync = coordinator(&sheet);
    sync.save(&client("c-1", "A")).await.expect("save");
    sync.save(&client("c-2", "B")).await.expect("save");

    let listed: Vec<_> = sync
        .list()
        .await
        .expect("list")
        .into_iter()
        .map(|c| (c.row, c.record.id().map(str::to_string)))
        .collect();
    assert_eq!(
        listed,
        vec![(3, Some("c-1".to_string())), (4, Some("c-2".to_string()))]
    );
}

#[tokio::test]
async fn delete_removes_the_row() {
    let sheet = Arc::new(MemorySheet::new());
    let sync = coordinator(&sheet);
    sync.save(&client("c-1", "A")).await.expect("save");
    sync.save(&client("c-2", "B")).await.expect("save");

    assert!(sync.delete("c-1").await.expect("delete"));
    assert!(!sync.delete("c-1").await.expect("delete"));
    assert_eq!(sync.locate("c-2").await.expect("locate"), Some(2));
    assert_eq!(sheet.rows().await.len(), 2);
}

#[tokio::test]
async fn locate_ignores_surrounding_whitespace() {
    let schema = schema();
    let id_column = schema.column_for("id").expect("id column");
    let mut row = vec![String::new(); schema.width()];
    row[0] = "A".to_string();
    row[id_column - 1] = "  c-7 ".to_string();
    let sheet = Arc::new(MemorySheet::with_rows(vec![schema.header(), row]));
    let sync = coordinator(&sheet);

    assert_eq!(sync.locate("c-7").await.expect("locate"), Some(2));
    assert_eq!(sync.locate(" c-7").await.expect("locate"), Some(2));
    assert_eq!(sync.locate("c-8").await.expect("locate"), None);
}

#[tokio::test]
async fn invalid_record_never_reaches_the_store() {
    let sheet = Arc::new(MemorySheet::new());
    let sync = coordinator(&sheet);
    let mut record = client("c-1", "A");
    record.set_group_field("partner", 11, "nome", "Demais");

    let err = sync.save(&record).await.expect_err("out of range");
    assert!(err.is_validation_failure());
    assert_eq!(sheet.calls(Operation::AllRows).await, 0);

    let nameless = client("c-2", "");
    assert!(matches!(
        sync.save(&nameless).await,
        Err(SyncError::Schema(_))
    ));
}

#[tokio::test]
async fn cancelled_requests_issue_no_calls() {
    let sheet = Arc::new(MemorySheet::new());
    let token = CancellationToken::new();
    let sync = coordinator(&sheet).with_cancellation(token.clone());
    token.cancel();

    assert!(matches!(
        sync.save(&client("c-1", "A")).await,
        Err(SyncError::Cancelled)
    ));
    assert_eq!(sheet.calls(Operation::AllRows).await, 0);
}

#[tokio::test]
async fn typed_fields_survive_the_sheet() {
    let sheet = Arc::new(MemorySheet::new());
    let sync = coordinator(&sheet);
    let mut record = client("c-1", "A");
    record.set("servico_ct", true);
    record.set(
        "data_inicio_servicos",
        NaiveDate::from_ymd_opt(2023, 8, 1).expect("valid date"),
    );
    record.set_group_field("power_of_attorney", 1, "orgao", "RFB");
    record.set_group_field("power_of_attorney", 1, "possui", true);
    sync.save(&record).await.expect("save");

    let fetched = sync.fetch("c-1").await.expect("fetch").expect("stored");
    assert_eq!(fetched.record, record);
}

#[tokio::test]
async fn ensure_header_row_is_idempotent() {
    let sheet = Arc::new(MemorySheet::new());
    let sync = coordinator(&sheet);
    sync.ensure_header_row().await.expect("header written");
    sync.ensure_header_row().await.expect("header already current");
    assert_eq!(sheet.calls(Operation::WriteRow).await, 1);
    assert_eq!(sheet.rows().await, vec![sync.schema().header()]);
}

#[tokio::test]
async fn blank_ids_never_match_a_row() {
    let schema = schema();
    let mut orphan = vec![String::new(); schema.width()];
    orphan[0] = "Sem identificador".to_string();
    let created_at = schema.column_for("criado_em").expect("criado_em column");
    orphan[created_at - 1] = "2024-03-01T09:30:00".to_string();
    let sheet = Arc::new(MemorySheet::with_rows(vec![schema.header(), orphan]));
    let sync = coordinator(&sheet);

    for id in ["", "   "] {
        assert!(matches!(
            sync.locate(id).await,
            Err(SyncError::Schema(SchemaError::RequiredFieldMissing(ref field))) if field == "id"
        ));
        assert!(matches!(sync.fetch(id).await, Err(SyncError::Schema(_))));
        assert!(matches!(sync.delete(id).await, Err(SyncError::Schema(_))));
    }
    assert_eq!(sheet.rows().await.len(), 2);
    assert_eq!(sheet.calls(Operation::AllRows).await, 0);
}

#[tokio::test]
async fn header_from_a_newer_schema_refuses_to_write() {
    let schema = schema();
    let mut header = schema.header();
    header.push("nire".to_string());
    let sheet = Arc::new(MemorySheet::with_rows(vec![header]));
    let sync = coordinator(&sheet);

    let err = sync
        .save(&client("c-1", "A"))
        .await
        .expect_err("sheet is wider than the schema");
    match err {
        SyncError::SchemaMismatch { position, expected, found } => {
            assert_eq!(position, schema.width() + 1);
            assert_eq!(expected, "");
            assert_eq!(found, "nire");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(sheet.writes().await, 0);
}
