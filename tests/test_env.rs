use assert_cmd::Command;
use std::fs;
use std::sync::{Mutex, MutexGuard, OnceLock};
use tempfile::TempDir;

pub fn lock_test_env() -> MutexGuard<'static, ()> {
    static TEST_ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    TEST_ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|err| err.into_inner())
}

/// Temporary HOME with an rc file pointing at a fresh database
pub fn setup_test_env(user: Option<&str>) -> (TempDir, MutexGuard<'static, ()>) {
    let guard = lock_test_env();
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let config_dir = temp_dir.path().join(".hubtrack");
    fs::create_dir_all(&config_dir).unwrap();
    let mut rc = format!("data.location={}\n", db_path.display());
    if let Some(user) = user {
        rc.push_str(&format!("user.id={}\n", user));
    }
    fs::write(config_dir.join("rc"), rc).unwrap();
    (temp_dir, guard)
}

pub fn hubtrack(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("hubtrack").unwrap();
    cmd.env("HOME", temp_dir.path());
    cmd.env_remove("HUBTRACK_USER");
    cmd
}
