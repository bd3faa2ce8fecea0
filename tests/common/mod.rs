use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue::Set};
use tempfile::TempDir;
use uuid::Uuid;

use domainstore_api::{
    config::AppConfig,
    db,
    entities::{product, ProductModel},
    events::{self, EventSender},
    AppState,
};

/// Helper harness for spinning up an application state backed by a
/// file-based SQLite database in a temp directory.
pub struct TestApp {
    pub state: AppState,
    _tmp: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let db_path = tmp.path().join("domainstore_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = 5;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let event_sender = EventSender::new(256);
        let event_task = tokio::spawn(events::process_events(event_sender.subscribe()));

        let state = AppState::new(db_arc, cfg, event_sender);

        Self {
            state,
            _tmp: tmp,
            _event_task: event_task,
        }
    }

    /// Insert a catalog product directly, bypassing the remote sync.
    pub async fn seed_product(&self, name: &str, price: Decimal) -> ProductModel {
        let row = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            external_id: Set(rand_external_id()),
            domain_name: Set(name.to_string()),
            price: Set(price),
            image_url: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        row.insert(&*self.state.db)
            .await
            .expect("seed product insert")
    }
}

fn rand_external_id() -> i64 {
    use std::sync::atomic::{AtomicI64, Ordering};
    static NEXT: AtomicI64 = AtomicI64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}
