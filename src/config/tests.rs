use super::load::{default_config_path, resolve_config_path};
use super::schema::*;
use std::sync::{Mutex, OnceLock};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}

struct EnvGuard {
    key: &'static str,
    old: Option<std::ffi::OsString>,
}

impl EnvGuard {
    fn set(key: &'static str, val: &str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::set_var(key, val);
        }
        Self { key, old }
    }

    fn remove(key: &'static str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::remove_var(key);
        }
        Self { key, old }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match self.old.take() {
            Some(v) => unsafe {
                std::env::set_var(self.key, v);
            },
            None => unsafe {
                std::env::remove_var(self.key);
            },
        }
    }
}

#[test]
fn resolve_config_path_prefers_encore_config_path() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("ENCORE_CONFIG_PATH", "/tmp/encore-test-config.toml");
    assert_eq!(
        resolve_config_path().unwrap(),
        std::path::PathBuf::from("/tmp/encore-test-config.toml")
    );
}

#[test]
fn default_config_path_prefers_xdg_config_home() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("XDG_CONFIG_HOME", "/tmp/xdg-config-home");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-should-not-win");

    let p = default_config_path().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/xdg-config-home")
            .join("encore")
            .join("config.toml")
    );
}

#[test]
fn default_config_path_falls_back_to_home_dot_config() {
    let _lock = env_lock();
    let _g1 = EnvGuard::remove("XDG_CONFIG_HOME");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-dir");

    let p = default_config_path().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/home-dir")
            .join(".config")
            .join("encore")
            .join("config.toml")
    );
}

#[test]
fn data_dir_resolution_order() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("XDG_DATA_HOME", "/tmp/xdg-data");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-dir");

    let explicit = StorageSettings {
        data_dir: Some("/srv/encore".into()),
    };
    assert_eq!(explicit.resolve_data_dir().unwrap(), std::path::PathBuf::from("/srv/encore"));

    let default = StorageSettings::default();
    assert_eq!(
        default.resolve_data_dir().unwrap(),
        std::path::PathBuf::from("/tmp/xdg-data/encore")
    );

    drop(_g1);
    let _g3 = EnvGuard::remove("XDG_DATA_HOME");
    assert_eq!(
        default.resolve_data_dir().unwrap(),
        std::path::PathBuf::from("/tmp/home-dir/.local/share/encore")
    );
}

#[test]
fn settings_load_from_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[audio]
quit_fade_out_ms = 123

[engine]
tick_ms = 50

[controller]
progress_interval_ms = 250

[library]
extensions = ["mp3"]
recursive = false
include_hidden = true
follow_links = false
max_depth = 3
min_duration_ms = 0
rescan_interval_secs = 60

[storage]
data_dir = "/var/lib/encore"
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("ENCORE_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::remove("ENCORE__ENGINE__TICK_MS");

    let s = Settings::load().unwrap();
    assert_eq!(s.audio.quit_fade_out_ms, 123);
    assert_eq!(s.engine.tick_ms, 50);
    assert_eq!(s.controller.progress_interval_ms, 250);
    assert_eq!(s.library.extensions, vec!["mp3".to_string()]);
    assert!(!s.library.recursive);
    assert!(s.library.include_hidden);
    assert!(!s.library.follow_links);
    assert_eq!(s.library.max_depth, Some(3));
    assert_eq!(s.library.min_duration_ms, 0);
    assert_eq!(s.library.rescan_interval_secs, 60);
    assert_eq!(
        s.storage.data_dir,
        Some(std::path::PathBuf::from("/var/lib/encore"))
    );
    assert!(s.validate().is_ok());
}

#[test]
fn missing_file_yields_defaults() {
    let _lock = env_lock();
    let dir = tempfile::tempdir().unwrap();
    let _g1 = EnvGuard::set(
        "ENCORE_CONFIG_PATH",
        dir.path().join("absent.toml").to_str().unwrap(),
    );
    let _g2 = EnvGuard::remove("ENCORE__ENGINE__TICK_MS");

    let s = Settings::load().unwrap();
    assert_eq!(s.engine.tick_ms, 200);
    assert_eq!(s.controller.progress_interval_ms, 500);
    assert_eq!(s.library.min_duration_ms, 5_000);
    assert_eq!(s.library.rescan_interval_secs, 21_600);
}

#[test]
fn settings_env_overrides_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[engine]
tick_ms = 250
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("ENCORE_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::set("ENCORE__ENGINE__TICK_MS", "20");

    let s = Settings::load().unwrap();
    assert_eq!(s.engine.tick_ms, 20);
}

#[test]
fn validate_rejects_zero_intervals() {
    let mut s = Settings::default();
    assert!(s.validate().is_ok());

    s.engine.tick_ms = 0;
    assert!(s.validate().unwrap_err().contains("tick_ms"));

    s.engine.tick_ms = 10;
    s.controller.progress_interval_ms = 0;
    assert!(s.validate().unwrap_err().contains("progress_interval_ms"));
}

#[test]
fn load_from_explicit_file_ignores_config_path_var() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("explicit.toml");
    std::fs::write(&cfg_path, "[engine]\ntick_ms = 75\n").unwrap();

    let _g1 = EnvGuard::set("ENCORE_CONFIG_PATH", "/nonexistent/encore.toml");
    let _g2 = EnvGuard::remove("ENCORE__ENGINE__TICK_MS");

    let s = Settings::load_from(Some(&cfg_path)).unwrap();
    assert_eq!(s.engine.tick_ms, 75);

    let s = Settings::load_from(None).unwrap();
    assert_eq!(s.engine.tick_ms, EngineSettings::default().tick_ms);
}

#[test]
fn validate_reports_every_problem_at_once() {
    let mut s = Settings::default();
    s.engine.tick_ms = 0;
    s.controller.progress_interval_ms = 0;
    s.library.extensions = vec![" ".into(), ".".into()];

    let msg = s.validate().unwrap_err();
    assert!(msg.contains("tick_ms"));
    assert!(msg.contains("progress_interval_ms"));
    assert!(msg.contains("extensions"));
}
