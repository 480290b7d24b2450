//! notegrid.toml configuration parser.
//!
//! Configuration is read once at boot and never reloaded. A deployment
//! ships a base file plus an optional per-install overlay; the overlay is
//! deep-merged over the base (tables merge key by key, scalars replace).

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::types::{Capabilities, escape_session_name};

/// Full configuration surface consumed by the control plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteConfig {
    /// Port the request-routing layer listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum number of session containers this node hosts. The Load
    /// metric is derived from it (active / max × 100).
    #[serde(default = "default_num_sessions_max")]
    pub num_sessions_max: u32,

    #[serde(default)]
    pub cloud: CloudConfig,

    #[serde(default)]
    pub housekeeping: HousekeepingConfig,
}

/// Cloud backend enablement and addressing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    /// Shared metrics store enabled.
    #[serde(default)]
    pub metrics: bool,

    /// Compute fleet control enabled.
    #[serde(default)]
    pub compute: bool,

    /// Object storage for session backups enabled.
    #[serde(default)]
    pub object_store: bool,

    /// Cloud region backends connect to.
    #[serde(default = "default_region")]
    pub region: String,

    /// Install identifier, used as the metric namespace. Distinct
    /// installs must never mix snapshots.
    #[serde(default = "default_install_id")]
    pub install_id: String,

    /// Upper bound on any single remote backend call.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

/// Housekeeping loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HousekeepingConfig {
    /// Seconds between housekeeping ticks.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Maximum total session age in seconds. Zero disables age eviction.
    #[serde(default)]
    pub expire_secs: u64,

    /// Seconds of inactivity after which a session is evicted.
    #[serde(default = "default_inactivity_timeout_secs")]
    pub inactivity_timeout_secs: u64,

    /// Session names (raw, unescaped) that maintenance never evicts.
    #[serde(default)]
    pub protected_sessions: Vec<String>,

    /// Fleet auto-shrink: allow this node to terminate itself when idle.
    #[serde(default)]
    pub scale_down: bool,
}

fn default_port() -> u16 {
    8080
}
fn default_num_sessions_max() -> u32 {
    10
}
fn default_region() -> String {
    "us-east-1".to_string()
}
fn default_install_id() -> String {
    "NoteGrid".to_string()
}
fn default_call_timeout_secs() -> u64 {
    10
}
fn default_interval_secs() -> u64 {
    5 * 60
}
fn default_inactivity_timeout_secs() -> u64 {
    30 * 60
}

impl Default for NoteConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            num_sessions_max: default_num_sessions_max(),
            cloud: CloudConfig::default(),
            housekeeping: HousekeepingConfig::default(),
        }
    }
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            metrics: false,
            compute: false,
            object_store: false,
            region: default_region(),
            install_id: default_install_id(),
            call_timeout_secs: default_call_timeout_secs(),
        }
    }
}

impl Default for HousekeepingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            expire_secs: 0,
            inactivity_timeout_secs: default_inactivity_timeout_secs(),
            protected_sessions: Vec::new(),
            scale_down: false,
        }
    }
}

impl NoteConfig {
    /// Parse a configuration file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: NoteConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Parse a configuration file with an optional user overlay merged on
    /// top. A missing overlay file is not an error.
    pub fn load_with_overlay(path: &Path, overlay: Option<&Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut base: toml::Value = toml::from_str(&content)?;

        if let Some(overlay_path) = overlay
            && overlay_path.is_file()
        {
            let overlay_content = std::fs::read_to_string(overlay_path)?;
            let overlay_value: toml::Value = toml::from_str(&overlay_content)?;
            merge_value(&mut base, overlay_value);
        }

        Ok(base.try_into()?)
    }

    /// Backend capability set derived from the cloud section.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            metrics: self.cloud.metrics,
            compute: self.cloud.compute,
            object_store: self.cloud.object_store,
        }
    }

    /// Protected session names escaped into container-name form, as
    /// handed to the container collaborator's maintenance call.
    pub fn protected_docknames(&self) -> Vec<String> {
        self.housekeeping
            .protected_sessions
            .iter()
            .map(|name| format!("/{}", escape_session_name(name)))
            .collect()
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.cloud.call_timeout_secs)
    }

    pub fn housekeeping_interval(&self) -> Duration {
        Duration::from_secs(self.housekeeping.interval_secs)
    }
}

/// Deep-merge `overlay` into `base`: tables merge key by key, everything
/// else replaces.
fn merge_value(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_entry) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(base_entry) => merge_value(base_entry, overlay_entry),
                    None => {
                        base_table.insert(key, overlay_entry);
                    }
                }
            }
        }
        (base_slot, overlay_value) => *base_slot = overlay_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_minimal() {
        let config: NoteConfig = toml::from_str("").unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.num_sessions_max, 10);
        assert!(!config.cloud.metrics);
        assert_eq!(config.cloud.install_id, "NoteGrid");
        assert_eq!(config.housekeeping.interval_secs, 300);
        assert!(!config.housekeeping.scale_down);
    }

    #[test]
    fn parse_full() {
        let toml_str = r#"
port = 9000
num_sessions_max = 20

[cloud]
metrics = true
compute = true
region = "eu-west-1"
install_id = "NoteGridStaging"

[housekeeping]
interval_secs = 60
expire_secs = 28800
inactivity_timeout_secs = 900
protected_sessions = ["admin@example.com"]
scale_down = true
"#;
        let config: NoteConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.port, 9000);
        assert!(config.cloud.metrics);
        assert_eq!(config.cloud.install_id, "NoteGridStaging");
        assert_eq!(config.housekeeping.expire_secs, 28800);
        assert!(config.housekeeping.scale_down);
        assert_eq!(
            config.capabilities(),
            note_core_caps(true, true, false)
        );
    }

    fn note_core_caps(metrics: bool, compute: bool, object_store: bool) -> Capabilities {
        Capabilities {
            metrics,
            compute,
            object_store,
        }
    }

    #[test]
    fn protected_docknames_escaped() {
        let toml_str = r#"
[housekeeping]
protected_sessions = ["admin@example.com", "demo.user"]
"#;
        let config: NoteConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.protected_docknames(),
            vec!["/admin_at_example_com", "/demo_user"]
        );
    }

    #[test]
    fn overlay_merges_nested_tables() {
        let dir = tempfile::tempdir().unwrap();
        let base_path = dir.path().join("notegrid.toml");
        let overlay_path = dir.path().join("notegrid.user.toml");

        let mut base = std::fs::File::create(&base_path).unwrap();
        write!(
            base,
            r#"
port = 9000

[cloud]
metrics = true
install_id = "NoteGridBase"
"#
        )
        .unwrap();

        let mut overlay = std::fs::File::create(&overlay_path).unwrap();
        write!(
            overlay,
            r#"
[cloud]
install_id = "NoteGridUser"

[housekeeping]
scale_down = true
"#
        )
        .unwrap();

        let config =
            NoteConfig::load_with_overlay(&base_path, Some(&overlay_path)).unwrap();
        // Overlay replaces the scalar it names...
        assert_eq!(config.cloud.install_id, "NoteGridUser");
        // ...but keeps base keys it does not mention.
        assert!(config.cloud.metrics);
        assert_eq!(config.port, 9000);
        assert!(config.housekeeping.scale_down);
    }

    #[test]
    fn missing_overlay_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let base_path = dir.path().join("notegrid.toml");
        std::fs::write(&base_path, "port = 9000\n").unwrap();

        let config = NoteConfig::load_with_overlay(
            &base_path,
            Some(&dir.path().join("absent.toml")),
        )
        .unwrap();
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn durations_derived_from_seconds() {
        let config: NoteConfig = toml::from_str("").unwrap();
        assert_eq!(config.call_timeout(), Duration::from_secs(10));
        assert_eq!(config.housekeeping_interval(), Duration::from_secs(300));
    }
}
