use eframe::egui;
use embassy_executor::{Executor, Spawner};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use env_logger::Builder;
use log::{LevelFilter, info, warn};
use std::thread;

use crate::config::AppConfig;
use crate::ui::{AppState, UICommand, UIRefreshState};

mod analyzer;
mod config;
mod ui;

const UI_REFRESH_QUEUE_SIZE: usize = 16;
pub type UIRefreshQueue = embassy_sync::channel::Channel<CriticalSectionRawMutex, UIRefreshState, UI_REFRESH_QUEUE_SIZE>;
pub type UIRefreshQueueReceiver = embassy_sync::channel::Receiver<'static, CriticalSectionRawMutex, UIRefreshState, UI_REFRESH_QUEUE_SIZE>;
pub type UIRefreshQueueSender = embassy_sync::channel::Sender<'static, CriticalSectionRawMutex, UIRefreshState, UI_REFRESH_QUEUE_SIZE>;

const UI_COMMAND_QUEUE_SIZE: usize = 16;
pub type UICommandQueue = embassy_sync::channel::Channel<CriticalSectionRawMutex, UICommand, UI_COMMAND_QUEUE_SIZE>;
pub type UICommandQueueReceiver = embassy_sync::channel::Receiver<'static, CriticalSectionRawMutex, UICommand, UI_COMMAND_QUEUE_SIZE>;
pub type UICommandQueueSender = embassy_sync::channel::Sender<'static, CriticalSectionRawMutex, UICommand, UI_COMMAND_QUEUE_SIZE>;

fn embassy_init(spawner: Spawner, ui_refresh_tx: UIRefreshQueueSender, ui_command_rx: UICommandQueueReceiver) {
    let _ = spawner.spawn(analyzer::analyzer_task(ui_refresh_tx, ui_command_rx));
}

fn main() {
    // Config errors are reported once the logger is up; defaults are used meanwhile
    let config_path = AppConfig::config_path();
    let (config, config_error) = match AppConfig::load_optional(&config_path) {
        Ok(config) => (config.unwrap_or_default(), None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    // Logging setup
    Builder::new()
        .filter_level(LevelFilter::Warn)
        .filter(Some("training_visualizer"), config.log_level_filter())
        .parse_default_env()
        .init();

    info!("Starting up");
    if let Some(e) = config_error {
        warn!("Ignoring config: {:#}", e);
    }
    info!(
        "Window size {}, quote normalization '{}'",
        config.window_size,
        config.quote_normalization.label()
    );

    let ui_refresh_queue: &'static UIRefreshQueue = Box::leak(Box::new(UIRefreshQueue::new()));
    let ui_command_queue: &'static UICommandQueue = Box::leak(Box::new(UICommandQueue::new()));

    let ui_refresh_tx = ui_refresh_queue.sender();
    let ui_refresh_rx = ui_refresh_queue.receiver();
    let ui_command_tx = ui_command_queue.sender();
    let ui_command_rx = ui_command_queue.receiver();

    // Spawn Embassy executor on a dedicated background thread
    let embassy_thread = thread::Builder::new().name("embassy-executor".to_string()).spawn(move || {
        // Leak the executor to satisfy the 'static lifetime required by run()
        let executor: &'static mut Executor = Box::leak(Box::new(Executor::new()));
        executor.run(|spawner| embassy_init(spawner, ui_refresh_tx, ui_command_rx));
    });
    if let Err(e) = embassy_thread {
        log::error!("Failed to spawn analyzer thread: {}", e);
        return;
    }

    // Start the GUI on the main thread (required on macOS)
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 800.0]),
        ..Default::default()
    };
    let analysis_config = config.analysis();
    if let Err(e) = eframe::run_native(
        "Training Log Visualizer",
        native_options,
        Box::new(move |cc| Ok(Box::new(AppState::new(ui_refresh_rx, ui_command_tx, cc.storage, analysis_config)))),
    ) {
        log::error!("GUI exited with error: {}", e);
    }
}
