use tempfile::TempDir;

use crate::auth::PasswordHasher;
use crate::config;
use crate::db::Database;

pub(crate) struct TestDb {
    pub db: Database,
    _dir: TempDir,
}

pub(crate) async fn test_db() -> TestDb {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("linkdeck.db")).await.unwrap();
    TestDb { db, _dir: dir }
}

/// Minimum argon2 cost so tests don't spend seconds hashing.
pub(crate) fn fast_hasher() -> PasswordHasher {
    PasswordHasher::new(config::PasswordHash {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap()
}
