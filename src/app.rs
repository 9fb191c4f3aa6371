use chrono::{Local, Utc};
use eframe::egui::{self, Align2, Color32, CornerRadius, Margin, RichText, ScrollArea, Sense};
use serde_json::json;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::event::AppEvent;
use crate::host::{HostClient, ThemeColors};
use crate::notify::{Notifier, Severity};
use crate::snapshot::{self, Snapshot, Source, PLACEHOLDER};
use crate::store::{self, SnapshotStore};
use crate::theme::{self, Palette};

// Colors pushed back to the host on a connected startup.
const HEADER_COLOR: &str = "#8774e1";
const BACKGROUND_COLOR: &str = "#18222d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionStatus {
    Connected,
    Demo,
    Error,
}

impl ConnectionStatus {
    fn label(self) -> (&'static str, Color32) {
        match self {
            ConnectionStatus::Connected => {
                ("Connected to Telegram", Color32::from_rgb(0x48, 0xbb, 0x78))
            }
            ConnectionStatus::Demo => {
                ("Demo mode (not in Telegram)", Color32::from_rgb(0x99, 0x99, 0x99))
            }
            ConnectionStatus::Error => {
                ("Data load error", Color32::from_rgb(0xf5, 0x65, 0x65))
            }
        }
    }
}

/// Destructive actions wait for an explicit confirmation dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingAction {
    ClearData,
    CloseApp,
}

pub struct ViewerApp {
    rx: Receiver<AppEvent>,
    host: Option<HostClient>,
    store: SnapshotStore,
    snapshot: Snapshot,
    status: ConnectionStatus,
    palette: Palette,
    palette_dirty: bool,
    notifier: Notifier,
    alert: Option<String>,
    pending: Option<PendingAction>,
    last_update: String,
}

impl ViewerApp {
    pub fn new(rx: Receiver<AppEvent>, host: Option<HostClient>, store: SnapshotStore) -> Self {
        let mut app = Self {
            rx,
            host,
            store,
            snapshot: Snapshot::default(),
            status: ConnectionStatus::Demo,
            palette: Palette::default(),
            palette_dirty: true,
            notifier: Notifier::new(),
            alert: None,
            pending: None,
            last_update: String::new(),
        };
        app.startup();
        app
    }

    /// Startup population. Also re-run after a storage clear so nothing
    /// stale survives the wipe.
    fn startup(&mut self) {
        self.alert = None;
        self.pending = None;
        self.touch();

        if self.host.is_some() {
            self.populate_from_host();
            self.setup_host_ui();
        } else {
            self.populate_demo();
        }

        if let Some(record) = self.store.load_prior() {
            // Informational only: the prior record is never merged into
            // the live snapshot.
            info!(
                "prior snapshot found (source {:?}, captured at {})",
                record.source, record.timestamp
            );
        }
    }

    fn source(&self) -> Source {
        if self.host.is_some() {
            Source::Telegram
        } else {
            Source::Demo
        }
    }

    fn touch(&mut self) {
        self.last_update = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    }

    fn set_theme(&mut self, theme: Option<&ThemeColors>) {
        self.palette = Palette::from_theme(theme);
        self.palette_dirty = true;
    }

    fn populate_from_host(&mut self) {
        let Some(host) = self.host.clone() else { return };

        host.expand();
        match host.current() {
            Ok(payload) => {
                self.snapshot = Snapshot::from_host(&payload);
                self.status = ConnectionStatus::Connected;
                self.set_theme(self.snapshot.theme.clone().as_ref());
                self.touch();
                self.store.save(&self.snapshot, self.source());
                self.notifier.info("Telegram data loaded");
            }
            Err(err) => {
                warn!("failed to read host data: {err}");
                self.status = ConnectionStatus::Error;
                self.notifier.notify("Failed to load Telegram data", Severity::Error);
            }
        }
    }

    fn populate_demo(&mut self) {
        self.snapshot = Snapshot::demo();
        self.status = ConnectionStatus::Demo;
        self.set_theme(self.snapshot.theme.clone().as_ref());
        self.touch();
        self.notifier.notify("Running in demo mode", Severity::Warning);
    }

    fn setup_host_ui(&mut self) {
        let Some(host) = &self.host else { return };
        host.set_header_color(HEADER_COLOR);
        host.set_background_color(BACKGROUND_COLOR);
    }

    fn drain_events(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => self.apply_event(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("event channel disconnected");
                    break;
                }
            }
        }
    }

    fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Tick => self.refresh_volatile(),
            AppEvent::ThemeChanged(theme) => {
                self.snapshot.refresh_theme(theme);
                self.set_theme(self.snapshot.theme.clone().as_ref());
                self.notifier.info("Theme changed");
            }
            AppEvent::ViewportChanged { height, stable_height } => {
                self.snapshot.refresh_volatile(height, stable_height);
                self.touch();
            }
            AppEvent::HostError(message) => {
                self.notifier.notify(message, Severity::Error);
            }
        }
    }

    /// Periodic re-pull of the two viewport numbers. A no-op in demo mode.
    fn refresh_volatile(&mut self) {
        let Some(host) = &self.host else { return };
        match host.current() {
            Ok(payload) => {
                self.snapshot
                    .refresh_volatile(payload.viewport_height, payload.viewport_stable_height);
                self.touch();
            }
            Err(err) => warn!("volatile refresh skipped: {err}"),
        }
    }

    // ── Action surface ──────────────────────────────────────────────────

    fn refresh_action(&mut self) {
        if self.host.is_some() {
            self.populate_from_host();
        }
    }

    fn copy_action(&mut self, ctx: &egui::Context) {
        let Some(text) = self.raw_dump() else { return };
        ctx.copy_text(text);
        self.notifier.info("JSON copied to clipboard");
    }

    fn download_action(&mut self) {
        let now_ms = Utc::now().timestamp_millis();
        match store::export_snapshot(&self.snapshot, &store::export_dir(), now_ms) {
            Ok(path) => {
                info!("snapshot exported to {}", path.display());
                self.notifier.info("Data downloaded");
            }
            Err(err) => {
                warn!("snapshot export failed: {err}");
                self.notifier.notify("Failed to export data", Severity::Error);
            }
        }
    }

    fn send_test_action(&mut self) {
        match &self.host {
            Some(host) => {
                let payload = json!({
                    "action": "test",
                    "timestamp": Utc::now().timestamp_millis(),
                    "random": rand::random::<f64>(),
                });
                host.send_data(payload.to_string());
                self.alert = Some("Test data sent!".to_string());
                self.notifier.info("Data sent to the bot");
            }
            None => {
                self.alert = Some("Run inside Telegram to send data".to_string());
            }
        }
    }

    fn alert_action(&mut self) {
        self.alert = Some(if self.host.is_some() {
            "Hello from Telegram Mini App! 🚀".to_string()
        } else {
            "Hello from demo mode! 🎮".to_string()
        });
    }

    fn toggle_expand_action(&mut self) {
        match &self.host {
            Some(host) => {
                if host.is_expanded() {
                    self.alert = Some("The app is already expanded".to_string());
                } else {
                    host.expand();
                    self.notifier.info("App expanded");
                }
            }
            None => {
                self.alert =
                    Some("Screen size cannot be controlled in demo mode".to_string());
            }
        }
    }

    fn confirm_pending(&mut self, ctx: &egui::Context) {
        let Some(action) = self.pending.take() else { return };
        match action {
            PendingAction::ClearData => {
                self.store.clear();
                self.notifier.notify("Data cleared", Severity::Warning);
                self.restart();
            }
            PendingAction::CloseApp => {
                if self.host.is_some() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                } else {
                    // Demo-mode exit wipes storage and restarts clean.
                    self.store.clear();
                    self.restart();
                }
            }
        }
    }

    /// Reset the snapshot and run startup again so no stale in-memory
    /// state survives a storage wipe.
    fn restart(&mut self) {
        self.snapshot = Snapshot::default();
        self.startup();
    }

    fn prompt_text(&self, action: PendingAction) -> &'static str {
        match action {
            PendingAction::ClearData => "Delete all saved data?",
            PendingAction::CloseApp => {
                if self.host.is_some() {
                    "Close the app?"
                } else {
                    "Exit demo mode?"
                }
            }
        }
    }

    // ── Presenter ───────────────────────────────────────────────────────

    fn raw_dump(&self) -> Option<String> {
        let raw = self.snapshot.raw.as_ref()?;
        serde_json::to_string_pretty(raw).ok()
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        let (status_text, status_color) = self.status.label();
        let connected = self.status == ConnectionStatus::Connected;
        let accent = self.palette.accent;
        let accent_text = self.palette.accent_text;

        let mut refresh_clicked = false;
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.strong("Telegram Data Viewer");
                ui.separator();
                ui.label(RichText::new("●").color(status_color));
                ui.label(status_text);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(
                        RichText::new(format!("Updated {}", self.last_update)).small(),
                    );
                    if connected {
                        let button = egui::Button::new(
                            RichText::new("📊 Refresh data").color(accent_text),
                        )
                        .fill(accent);
                        refresh_clicked = ui.add(button).clicked();
                    }
                });
            });
        });

        if refresh_clicked {
            self.refresh_action();
        }
    }

    fn render_actions_panel(&mut self, ctx: &egui::Context) {
        let connected = self.host.is_some();
        let mut refresh = false;
        let mut copy = false;
        let mut download = false;
        let mut send_test = false;
        let mut alert = false;
        let mut toggle_expand = false;
        let mut clear = false;
        let mut close = false;

        egui::SidePanel::right("actions_panel")
            .resizable(false)
            .show(ctx, |ui| {
                ui.heading("Actions");
                ui.separator();
                refresh = ui
                    .add_enabled(connected, egui::Button::new("Check connection"))
                    .clicked();
                copy = ui.button("Copy JSON").clicked();
                download = ui.button("Download data").clicked();
                send_test = ui.button("Send test data").clicked();
                alert = ui.button("Show alert").clicked();
                toggle_expand = ui.button("Toggle expand").clicked();
                ui.separator();
                clear = ui.button("Clear saved data").clicked();
                close = ui.button("Close app").clicked();
            });

        if refresh {
            self.refresh_action();
        }
        if copy {
            self.copy_action(ctx);
        }
        if download {
            self.download_action();
        }
        if send_test {
            self.send_test_action();
        }
        if alert {
            self.alert_action();
        }
        if toggle_expand {
            self.toggle_expand_action();
        }
        if clear {
            self.pending = Some(PendingAction::ClearData);
        }
        if close {
            self.pending = Some(PendingAction::CloseApp);
        }
    }

    fn render_sections(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ScrollArea::vertical().show(ui, |ui| {
                self.render_user_section(ui);
                self.render_chat_section(ui);
                self.render_app_section(ui);
                self.render_theme_section(ui);
                self.render_raw_section(ui);
            });
        });
    }

    fn render_user_section(&self, ui: &mut egui::Ui) {
        let user = self.snapshot.user.as_ref();
        ui.heading("👤 User");
        egui::Grid::new("user_grid").num_columns(2).show(ui, |ui| {
            row(ui, "ID", snapshot::display_int(user.and_then(|u| u.id)));
            row(
                ui,
                "First name",
                snapshot::display_text(user.and_then(|u| u.first_name.as_deref())),
            );
            row(
                ui,
                "Last name",
                snapshot::display_text(user.and_then(|u| u.last_name.as_deref())),
            );
            row(
                ui,
                "Username",
                snapshot::display_username(user.and_then(|u| u.username.as_deref())),
            );
            row(
                ui,
                "Language",
                snapshot::display_text(user.and_then(|u| u.language_code.as_deref())),
            );
            row(
                ui,
                "Authorized",
                snapshot::display_auth_date(user.and_then(|u| u.auth_date)),
            );
        });
        ui.separator();
    }

    fn render_chat_section(&self, ui: &mut egui::Ui) {
        let chat = self.snapshot.chat.as_ref();
        ui.heading("💬 Chat");
        egui::Grid::new("chat_grid").num_columns(2).show(ui, |ui| {
            row(ui, "ID", snapshot::display_int(chat.and_then(|c| c.id)));
            row(
                ui,
                "Type",
                snapshot::display_text(chat.and_then(|c| c.kind.as_deref())),
            );
            row(
                ui,
                "Title",
                snapshot::display_text(chat.and_then(|c| c.title.as_deref())),
            );
            row(
                ui,
                "Username",
                snapshot::display_username(chat.and_then(|c| c.username.as_deref())),
            );
        });
        ui.separator();
    }

    fn render_app_section(&self, ui: &mut egui::Ui) {
        let app = self.snapshot.app.as_ref();
        ui.heading("⚙ App");
        egui::Grid::new("app_grid").num_columns(2).show(ui, |ui| {
            row(
                ui,
                "Platform",
                snapshot::display_text(app.and_then(|a| a.platform.as_deref())),
            );
            row(
                ui,
                "Version",
                snapshot::display_text(app.and_then(|a| a.version.as_deref())),
            );
            row(
                ui,
                "Color scheme",
                snapshot::display_text(app.and_then(|a| a.color_scheme.as_deref())),
            );
            row(
                ui,
                "Viewport height",
                snapshot::display_number(app.and_then(|a| a.viewport_height)),
            );
            row(
                ui,
                "Stable height",
                snapshot::display_number(app.and_then(|a| a.viewport_stable_height)),
            );
        });
        ui.separator();
    }

    fn render_theme_section(&self, ui: &mut egui::Ui) {
        let theme = self.snapshot.theme.as_ref();
        ui.heading("🎨 Theme");
        egui::Grid::new("theme_grid").num_columns(3).show(ui, |ui| {
            for key in ThemeColors::KEYS {
                let value = theme
                    .and_then(|t| t.get(key))
                    .filter(|v| !v.is_empty())
                    .unwrap_or(theme::FALLBACK_SWATCH_HEX);
                let color = theme::swatch_color(theme, key);

                ui.label(key);
                let (rect, _) =
                    ui.allocate_exact_size(egui::vec2(18.0, 18.0), Sense::hover());
                ui.painter().rect_filled(rect, CornerRadius::same(4), color);
                ui.monospace(value);
                ui.end_row();
            }
        });
        ui.separator();
    }

    fn render_raw_section(&self, ui: &mut egui::Ui) {
        ui.heading("🧾 Raw data");
        let dump = self.raw_dump().unwrap_or_else(|| PLACEHOLDER.to_string());
        ui.monospace(dump);
    }

    fn render_toasts(&mut self, ctx: &egui::Context) {
        let now = Instant::now();
        self.notifier.sweep(now);

        for (index, toast) in self.notifier.toasts().iter().enumerate() {
            let Some(opacity) = toast.opacity(now) else { continue };
            egui::Area::new(egui::Id::new(("toast", index)))
                .anchor(
                    Align2::RIGHT_TOP,
                    egui::vec2(-16.0, 16.0 + 44.0 * index as f32),
                )
                .interactable(false)
                .show(ctx, |ui| {
                    egui::Frame::new()
                        .fill(toast.severity.background().gamma_multiply(opacity))
                        .corner_radius(CornerRadius::same(8))
                        .inner_margin(Margin::symmetric(12, 8))
                        .show(ui, |ui| {
                            ui.label(
                                RichText::new(&toast.message)
                                    .color(Color32::WHITE.gamma_multiply(opacity)),
                            );
                        });
                });
        }
    }

    fn render_dialogs(&mut self, ctx: &egui::Context) {
        if let Some(message) = self.alert.clone() {
            let mut dismissed = false;
            egui::Window::new("Alert")
                .collapsible(false)
                .resizable(false)
                .anchor(Align2::CENTER_CENTER, egui::Vec2::ZERO)
                .show(ctx, |ui| {
                    ui.label(message);
                    dismissed = ui.button("OK").clicked();
                });
            if dismissed {
                self.alert = None;
            }
        }

        if let Some(action) = self.pending {
            let prompt = self.prompt_text(action);
            let mut confirmed = false;
            let mut cancelled = false;
            egui::Window::new("Confirm")
                .collapsible(false)
                .resizable(false)
                .anchor(Align2::CENTER_CENTER, egui::Vec2::ZERO)
                .show(ctx, |ui| {
                    ui.label(prompt);
                    ui.horizontal(|ui| {
                        confirmed = ui.button("OK").clicked();
                        cancelled = ui.button("Cancel").clicked();
                    });
                });
            if confirmed {
                self.confirm_pending(ctx);
            } else if cancelled {
                self.pending = None;
            }
        }
    }
}

fn row(ui: &mut egui::Ui, label: &str, value: String) {
    ui.label(label);
    ui.monospace(value);
    ui.end_row();
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();

        if self.palette_dirty {
            self.palette.apply_visuals(ctx);
            self.palette_dirty = false;
        }

        self.render_top_bar(ctx);
        self.render_actions_panel(ctx);
        self.render_sections(ctx);
        self.render_dialogs(ctx);
        self.render_toasts(ctx);

        // Channel events arrive from background tasks; keep polling even
        // while the user is idle.
        ctx.request_repaint_after(Duration::from_millis(250));
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.store.save(&self.snapshot, self.source());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn demo_app(dir: &tempfile::TempDir) -> ViewerApp {
        let (_tx, rx) = mpsc::channel();
        let store = SnapshotStore::at(dir.path().join("snapshot.json"));
        ViewerApp::new(rx, None, store)
    }

    #[test]
    fn startup_without_host_enters_demo_mode() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        let app = demo_app(&dir);

        assert_eq!(app.status, ConnectionStatus::Demo);
        assert_eq!(app.source(), Source::Demo);
        assert_eq!(app.snapshot, Snapshot::demo());
        // The demo-mode warning toast is up.
        assert_eq!(app.notifier.toasts().len(), 1);
        assert_eq!(app.notifier.toasts()[0].severity, Severity::Warning);
    }

    #[test]
    fn startup_with_host_populates_and_persists_telegram_source() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime should build");
        let (tx, rx) = mpsc::channel();

        let mut payload = crate::host::HostPayload::default();
        payload.init_data_unsafe.user = Some(crate::host::HostUser {
            id: Some(42),
            first_name: Some("A".to_string()),
            ..Default::default()
        });
        payload.platform = Some("tdesktop".to_string());

        let host = HostClient::with_payload(
            dir.path().join("host.json"),
            payload,
            tx,
            runtime.handle().clone(),
        );
        let record_path = dir.path().join("snapshot.json");
        let app = ViewerApp::new(rx, Some(host), SnapshotStore::at(record_path.clone()));

        assert_eq!(app.status, ConnectionStatus::Connected);
        let user = app.snapshot.user.as_ref().expect("user should populate");
        assert_eq!(user.id, Some(42));
        assert_eq!(user.first_name.as_deref(), Some("A"));
        assert_eq!(user.last_name, None);
        // The expand-on-start command is reflected in the aggregate.
        assert_eq!(
            app.snapshot.app.as_ref().and_then(|a| a.is_expanded),
            Some(true)
        );

        let record = SnapshotStore::at(record_path)
            .load_prior()
            .expect("startup should persist a record");
        assert_eq!(record.source, Source::Telegram);
        assert_eq!(record.snapshot, app.snapshot);
    }

    #[test]
    fn theme_event_re_renders_only_the_color_section() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        let mut app = demo_app(&dir);
        let before = app.snapshot.clone();

        app.apply_event(AppEvent::ThemeChanged(ThemeColors {
            bg_color: Some("#ffffff".to_string()),
            ..ThemeColors::default()
        }));

        assert_eq!(app.snapshot.user, before.user);
        assert_eq!(app.snapshot.chat, before.chat);
        assert_eq!(app.snapshot.app, before.app);
        assert_eq!(
            app.snapshot
                .theme
                .as_ref()
                .and_then(|theme| theme.bg_color.as_deref()),
            Some("#ffffff")
        );
        // An info toast joins the startup warning.
        let toasts = app.notifier.toasts();
        assert_eq!(toasts.last().map(|t| t.severity), Some(Severity::Info));
    }

    #[test]
    fn tick_is_a_no_op_in_demo_mode() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        let mut app = demo_app(&dir);
        let before = app.snapshot.clone();

        app.apply_event(AppEvent::Tick);

        assert_eq!(app.snapshot, before);
    }

    #[test]
    fn send_test_in_demo_mode_raises_a_local_alert() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        let mut app = demo_app(&dir);

        app.send_test_action();

        assert_eq!(app.alert.as_deref(), Some("Run inside Telegram to send data"));
    }

    #[test]
    fn destructive_prompts_depend_on_mode() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        let app = demo_app(&dir);

        assert_eq!(app.prompt_text(PendingAction::ClearData), "Delete all saved data?");
        assert_eq!(app.prompt_text(PendingAction::CloseApp), "Exit demo mode?");
    }
}
