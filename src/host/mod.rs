//! Host data source bridge.
//!
//! The host surface mirrors `window.Telegram.WebApp`: a payload object with
//! identity, chat, theme, and viewport fields plus a small command API. On
//! desktop the payload comes from a JSON file named by the `TGVIEW_HOST`
//! environment variable; when the variable is unset or the file is unreadable
//! at startup the app runs in demo mode for the whole session.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::time::{self, Duration};
use tracing::{debug, warn};

use crate::event::AppEvent;

pub const HOST_ENV_VAR: &str = "TGVIEW_HOST";

const WATCH_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to read host payload {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse host payload {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("host state lock poisoned")]
    Poisoned,
}

/// The six named theme color keys exposed by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ThemeColors {
    pub bg_color: Option<String>,
    pub text_color: Option<String>,
    pub hint_color: Option<String>,
    pub link_color: Option<String>,
    pub button_color: Option<String>,
    pub button_text_color: Option<String>,
}

impl ThemeColors {
    pub const KEYS: [&'static str; 6] = [
        "bg_color",
        "text_color",
        "hint_color",
        "link_color",
        "button_color",
        "button_text_color",
    ];

    pub fn get(&self, key: &str) -> Option<&str> {
        let value = match key {
            "bg_color" => &self.bg_color,
            "text_color" => &self.text_color,
            "hint_color" => &self.hint_color,
            "link_color" => &self.link_color,
            "button_color" => &self.button_color,
            "button_text_color" => &self.button_text_color,
            _ => return None,
        };
        value.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HostUser {
    pub id: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HostChat {
    pub id: Option<i64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub title: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct InitDataUnsafe {
    pub user: Option<HostUser>,
    pub chat: Option<HostChat>,
    pub auth_date: Option<i64>,
}

/// Full host payload surface. Every field is optional; internal code relies
/// on this schema instead of re-checking for missing values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct HostPayload {
    pub init_data: Option<String>,
    pub init_data_unsafe: InitDataUnsafe,
    pub theme_params: ThemeColors,
    pub platform: Option<String>,
    pub version: Option<String>,
    pub color_scheme: Option<String>,
    pub viewport_height: Option<f64>,
    pub viewport_stable_height: Option<f64>,
    pub is_expanded: Option<bool>,
    pub header_color: Option<String>,
    pub background_color: Option<String>,
}

pub fn read_payload(path: &Path) -> Result<HostPayload, HostError> {
    let data = std::fs::read(path).map_err(|source| HostError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&data).map_err(|source| HostError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Which host events a payload change corresponds to: `(theme, viewport)`.
fn diff_events(prev: &HostPayload, next: &HostPayload) -> (bool, bool) {
    let theme = prev.theme_params != next.theme_params;
    let viewport = prev.viewport_height != next.viewport_height
        || prev.viewport_stable_height != next.viewport_stable_height;
    (theme, viewport)
}

fn outbox_path(payload_path: &Path) -> PathBuf {
    let mut name = payload_path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "host".into());
    name.push(".outbox.jsonl");
    payload_path.with_file_name(name)
}

async fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.write_all(b"\n").await?;
    Ok(())
}

/// Handle to a present host data source.
///
/// Holds the last-read payload and synthesizes the host's `themeChanged` /
/// `viewportChanged` events by watching the payload file from a background
/// task, posting them onto the single app event channel.
#[derive(Clone)]
pub struct HostClient {
    path: PathBuf,
    state: Arc<RwLock<HostPayload>>,
    tx: Sender<AppEvent>,
    runtime_handle: Handle,
}

impl HostClient {
    /// Detect the host at startup. The result is final for the session:
    /// a `None` here means demo mode, never re-checked at runtime.
    pub fn detect(tx: Sender<AppEvent>, runtime_handle: Handle) -> Option<Self> {
        let path = std::env::var_os(HOST_ENV_VAR).map(PathBuf::from)?;
        match read_payload(&path) {
            Ok(payload) => Some(Self {
                path,
                state: Arc::new(RwLock::new(payload)),
                tx,
                runtime_handle,
            }),
            Err(err) => {
                warn!("host payload unavailable, falling back to demo mode: {err}");
                None
            }
        }
    }

    #[cfg(test)]
    pub fn with_payload(
        path: PathBuf,
        payload: HostPayload,
        tx: Sender<AppEvent>,
        runtime_handle: Handle,
    ) -> Self {
        Self {
            path,
            state: Arc::new(RwLock::new(payload)),
            tx,
            runtime_handle,
        }
    }

    pub fn current(&self) -> Result<HostPayload, HostError> {
        self.state
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| HostError::Poisoned)
    }

    pub fn is_expanded(&self) -> bool {
        self.state
            .read()
            .map(|guard| guard.is_expanded.unwrap_or(false))
            .unwrap_or(false)
    }

    pub fn expand(&self) {
        if let Ok(mut guard) = self.state.write() {
            guard.is_expanded = Some(true);
        }
    }

    pub fn set_header_color(&self, hex: &str) {
        if let Ok(mut guard) = self.state.write() {
            guard.header_color = Some(hex.to_string());
        }
    }

    pub fn set_background_color(&self, hex: &str) {
        if let Ok(mut guard) = self.state.write() {
            guard.background_color = Some(hex.to_string());
        }
    }

    /// Fire-and-forget send back to the host: one line appended to the
    /// outbox file next to the payload. Failures come back over the event
    /// channel rather than blocking the caller.
    pub fn send_data(&self, payload: String) {
        let outbox = outbox_path(&self.path);
        let tx = self.tx.clone();
        self.runtime_handle.spawn(async move {
            if let Err(err) = append_line(&outbox, &payload).await {
                warn!("failed to write host outbox {}: {err}", outbox.display());
                let _ = tx.send(AppEvent::HostError(format!(
                    "failed to send data to host: {err}"
                )));
            }
        });
    }

    /// Start the payload-file watcher. Runs for the process lifetime;
    /// there is no cancellation, teardown happens with the process.
    pub fn start(&self) {
        let path = self.path.clone();
        let state = Arc::clone(&self.state);
        let tx = self.tx.clone();
        self.runtime_handle.spawn(async move {
            let mut ticker = time::interval(WATCH_INTERVAL);
            loop {
                ticker.tick().await;

                let next = match read_payload(&path) {
                    Ok(payload) => payload,
                    Err(err) => {
                        debug!("host payload re-read failed: {err}");
                        continue;
                    }
                };

                let (theme_changed, viewport_changed) = {
                    let Ok(prev) = state.read() else { break };
                    if *prev == next {
                        continue;
                    }
                    diff_events(&prev, &next)
                };

                let Ok(mut guard) = state.write() else { break };
                *guard = next.clone();
                drop(guard);

                if theme_changed
                    && tx
                        .send(AppEvent::ThemeChanged(next.theme_params.clone()))
                        .is_err()
                {
                    break;
                }
                if viewport_changed
                    && tx
                        .send(AppEvent::ViewportChanged {
                            height: next.viewport_height,
                            stable_height: next.viewport_stable_height,
                        })
                        .is_err()
                {
                    break;
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_tolerates_missing_fields() {
        let payload: HostPayload = serde_json::from_str("{}").expect("empty payload should parse");
        assert_eq!(payload.init_data, None);
        assert_eq!(payload.init_data_unsafe.user, None);
        assert_eq!(payload.theme_params, ThemeColors::default());
        assert_eq!(payload.viewport_height, None);
    }

    #[test]
    fn payload_reads_host_surface_field_names() {
        let data = r##"{
            "initData": "query_id=abc",
            "initDataUnsafe": {
                "user": { "id": 42, "first_name": "A" },
                "auth_date": 1700000000
            },
            "themeParams": { "bg_color": "#18222d" },
            "platform": "tdesktop",
            "colorScheme": "dark",
            "viewportHeight": 640,
            "viewportStableHeight": 620,
            "isExpanded": true
        }"##;
        let payload: HostPayload = serde_json::from_str(data).expect("payload should parse");
        assert_eq!(payload.init_data.as_deref(), Some("query_id=abc"));
        let user = payload.init_data_unsafe.user.expect("user should be set");
        assert_eq!(user.id, Some(42));
        assert_eq!(user.first_name.as_deref(), Some("A"));
        assert_eq!(user.last_name, None);
        assert_eq!(payload.init_data_unsafe.auth_date, Some(1_700_000_000));
        assert_eq!(payload.theme_params.bg_color.as_deref(), Some("#18222d"));
        assert_eq!(payload.color_scheme.as_deref(), Some("dark"));
        assert_eq!(payload.viewport_height, Some(640.0));
        assert_eq!(payload.is_expanded, Some(true));
    }

    #[test]
    fn chat_type_field_maps_to_kind() {
        let chat: HostChat =
            serde_json::from_str(r#"{ "id": -100, "type": "group" }"#).expect("chat should parse");
        assert_eq!(chat.kind.as_deref(), Some("group"));
        let round_trip = serde_json::to_value(&chat).expect("chat should serialize");
        assert_eq!(round_trip["type"], "group");
    }

    #[test]
    fn diff_events_separates_theme_from_viewport() {
        let base = HostPayload::default();

        let mut themed = base.clone();
        themed.theme_params.bg_color = Some("#ffffff".to_string());
        assert_eq!(diff_events(&base, &themed), (true, false));

        let mut resized = base.clone();
        resized.viewport_height = Some(480.0);
        assert_eq!(diff_events(&base, &resized), (false, true));

        let mut stable_only = base.clone();
        stable_only.viewport_stable_height = Some(480.0);
        assert_eq!(diff_events(&base, &stable_only), (false, true));

        assert_eq!(diff_events(&base, &base.clone()), (false, false));
    }

    #[test]
    fn outbox_path_sits_next_to_payload() {
        let outbox = outbox_path(Path::new("/tmp/host.json"));
        assert_eq!(outbox, PathBuf::from("/tmp/host.json.outbox.jsonl"));
    }

    #[test]
    fn read_payload_reports_parse_errors() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        let path = dir.path().join("host.json");
        std::fs::write(&path, "not json").expect("fixture should write");
        let err = read_payload(&path).expect_err("junk payload should fail");
        assert!(matches!(err, HostError::Parse { .. }));
    }
}
