#![forbid(unsafe_code)]

mod adapters;
mod app;
mod commands;
mod domain;
mod infrastructure;
mod ports;

use tauri::{Emitter, Manager, WindowEvent};
use tokio::sync::broadcast::error::RecvError;

use app::AppController;
use commands::{
    // Settings commands
    get_voice_models, get_voice_settings, save_voice_settings,
    // Session commands
    voice_connect, voice_disconnect, voice_session_state, voice_toggle_mute,
    // App commands
    get_paths,
};

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    // Initialize the application controller
    let controller = match AppController::new() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    tauri::Builder::default()
        .plugin(tauri_plugin_shell::init())
        .manage(controller)
        .setup(|app| {
            // Forward session events (state changes, transcripts, channel
            // errors) to the frontend as toast/status updates.
            let mut events = app.state::<AppController>().session().subscribe();
            let handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                loop {
                    match events.recv().await {
                        Ok(event) => {
                            let _ = handle.emit("voice-session-event", &event);
                        }
                        Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => break,
                    }
                }
            });
            Ok(())
        })
        .on_window_event(|window, event| {
            // The session must not outlive the UI that controls it: window
            // teardown funnels into the same disconnect path as the button.
            if let WindowEvent::Destroyed = event {
                let session = window.state::<AppController>().session();
                tauri::async_runtime::spawn(async move {
                    session.disconnect().await;
                });
            }
        })
        .invoke_handler(tauri::generate_handler![
            // Settings commands
            get_voice_settings,
            get_voice_models,
            save_voice_settings,
            // Session commands
            voice_connect,
            voice_disconnect,
            voice_toggle_mute,
            voice_session_state,
            // App commands
            get_paths,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
