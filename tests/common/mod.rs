#![allow(dead_code)]

use gabinete::db::{CabinetCreate, DbActorHandle};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

static SEQ: AtomicU64 = AtomicU64::new(0);

/// A fresh SQLite file behind its own actor. The file is removed on drop.
pub struct TestDb {
    pub handle: DbActorHandle,
    pub url: String,
    path: PathBuf,
}

impl TestDb {
    pub async fn new(label: &str) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before UNIX_EPOCH")
            .as_nanos();
        let seq = SEQ.fetch_add(1, Ordering::Relaxed);

        let mut path = std::env::temp_dir();
        path.push(format!(
            "gabinete-{label}-{}-{nanos}-{seq}.sqlite",
            std::process::id()
        ));
        let url = format!("sqlite:{}", path.display());
        let handle = gabinete::db::spawn(&url).await.expect("spawn DbActor");

        Self { handle, url, path }
    }

    /// A second, raw pool on the same file, for writes that bypass the typed API.
    pub async fn raw_pool(&self) -> SqlitePool {
        SqlitePool::connect(&self.url).await.expect("raw pool")
    }

    pub async fn cabinet(&self, name: &str) -> Uuid {
        self.handle
            .create_cabinet(CabinetCreate::new(name))
            .await
            .expect("create cabinet")
            .id
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
        let _ = std::fs::remove_file(self.path.with_extension("sqlite-wal"));
        let _ = std::fs::remove_file(self.path.with_extension("sqlite-shm"));
    }
}
