mod app;
mod event;
mod host;
mod notify;
mod snapshot;
mod store;
mod theme;

use app::ViewerApp;
use eframe::egui;
use event::AppEvent;
use host::HostClient;
use std::sync::mpsc;
use store::SnapshotStore;
use tracing_subscriber::EnvFilter;

/// Volatile viewport data is re-polled every five seconds for the whole
/// process lifetime, in both modes.
const REFRESH_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5);

fn init_logging() {
    let filter = EnvFilter::try_from_env("TGVIEW_LOG")
        .unwrap_or_else(|_| EnvFilter::new("tgview=info,warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let (tx, rx) = mpsc::channel();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("tgview-runtime")
        .build()?;

    // Connected vs demo is decided here, once, for the whole session.
    let host = HostClient::detect(tx.clone(), runtime.handle().clone());
    if let Some(host) = &host {
        host.start();
    }

    let tick_tx = tx;
    runtime.spawn(async move {
        let mut ticker = tokio::time::interval(REFRESH_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if tick_tx.send(AppEvent::Tick).is_err() {
                break;
            }
        }
    });

    let viewer = ViewerApp::new(rx, host, SnapshotStore::new());
    let _runtime = runtime;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([520.0, 760.0])
            .with_min_inner_size([420.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Telegram Data Viewer",
        native_options,
        Box::new(move |_creation_context| Ok(Box::new(viewer))),
    )?;

    Ok(())
}
