//! Analyzer async task: owns ingestion runs on behalf of the UI.
//!
//! Runs on the Embassy executor and:
//! - Waits for `UICommand`s from the viewer
//! - Reads the selected log file (the only suspension point of a run)
//! - Runs the parse → aggregate → smooth pipeline to completion
//! - Publishes the immutable result back to the UI, tagged with its run id
//!
//! The UI keeps only the newest run id it requested, so a result that is
//! overtaken by a later request is simply discarded there.

use std::sync::Arc;

use crate::ui::{UICommand, UIRefreshState};
use crate::{UICommandQueueReceiver, UIRefreshQueueSender};

use super::log_loader::{load_log_text, source_label};
use super::pipeline::analyze;

/// Text of the most recently loaded file, kept so the UI can re-run the
/// pipeline with a different configuration without reading the file again.
struct LoadedLog {
    source: String,
    text: String,
}

/// Main analyzer task that runs on the Embassy executor.
///
/// # Parameters
///
/// * `ui_refresh_tx` - Channel for sending results to the UI
/// * `ui_command_rx` - Channel for receiving UI commands
#[embassy_executor::task]
pub async fn analyzer_task(ui_refresh_tx: UIRefreshQueueSender, ui_command_rx: UICommandQueueReceiver) {
    log::info!("Analyzer task started");

    let mut loaded: Option<LoadedLog> = None;

    loop {
        let command = ui_command_rx.receive().await;
        if let Some(reply) = handle_command(command, &mut loaded) {
            ui_refresh_tx.send(reply).await;
        }
    }
}

/// Execute one command synchronously and build the reply for the UI.
fn handle_command(command: UICommand, loaded: &mut Option<LoadedLog>) -> Option<UIRefreshState> {
    match command {
        UICommand::LoadFile { run_id, path, config } => {
            log::info!("Run {}: loading {}", run_id, path.display());
            match load_log_text(&path) {
                Ok(text) => {
                    let source = source_label(&path);
                    let result = analyze(source.clone(), &text, &config);
                    *loaded = Some(LoadedLog { source, text });
                    Some(UIRefreshState::AnalysisReady {
                        run_id,
                        result: Arc::new(result),
                    })
                }
                Err(e) => {
                    log::error!("Run {}: {:#}", run_id, e);
                    Some(UIRefreshState::LoadFailed {
                        run_id,
                        message: format!("{:#}", e),
                    })
                }
            }
        }
        UICommand::Reanalyze { run_id, config } => match loaded {
            Some(log) => {
                log::debug!("Run {}: re-analyzing {} with window {}", run_id, log.source, config.window_size);
                Some(UIRefreshState::AnalysisReady {
                    run_id,
                    result: Arc::new(analyze(log.source.clone(), &log.text, &config)),
                })
            }
            None => {
                log::debug!("Run {}: nothing loaded, ignoring re-analysis", run_id);
                None
            }
        },
    }
}
