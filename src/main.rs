mod app;
mod backend;
mod config;
mod constants;
mod error;
mod game_events;
mod models;
mod obs;
#[cfg(test)]
mod tests;
mod udp;

use std::sync::Arc;

use eframe::{NativeOptions, egui};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::app::HighlightApp;
use crate::backend::Repaint;
use crate::config::AppConfig;
use crate::constants::APP_TITLE;

fn main() {
    let _log_guard = init_tracing();

    let config = AppConfig::load_or_default();
    let config_path = config::config_path().ok();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("rl-highlight-backend")
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(error = %err, "Failed to start async runtime");
            eprintln!("Failed to start async runtime: {err}");
            return;
        }
    };
    let runtime_handle = runtime.handle().clone();

    let native_options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 640.0])
            .with_min_inner_size([480.0, 420.0]),
        ..Default::default()
    };

    info!(version = env!("CARGO_PKG_VERSION"), "Starting {APP_TITLE}");
    if let Err(err) = eframe::run_native(
        APP_TITLE,
        native_options,
        Box::new(move |cc| {
            let ctx = cc.egui_ctx.clone();
            let repaint: Repaint = Arc::new(move || ctx.request_repaint());
            let backend = backend::spawn(&runtime_handle, config.clone(), config_path, repaint);
            Box::new(HighlightApp::new(&config, backend))
        }),
    ) {
        error!(error = %err, "UI exited with an error");
        eprintln!("Failed to start {APP_TITLE}: {err}");
    }

    runtime.shutdown_background();
}

/// Logs go to a daily file under the data directory, or stderr when there is none.
fn init_tracing() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rl_highlight=info"));

    match config::log_dir() {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "rl-highlight.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        Err(_) => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    }
}
