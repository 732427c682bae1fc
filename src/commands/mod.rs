use tauri::State;

use crate::app::AppController;
use crate::domain::settings::{VoiceModel, VoiceSettings};
use crate::domain::SessionSnapshot;

// ==================== Settings Commands ====================

/// Get the current voice settings.
#[tauri::command]
pub fn get_voice_settings(controller: State<'_, AppController>) -> VoiceSettings {
    controller.voice_settings()
}

/// List the selectable voice models for the settings form.
#[tauri::command]
pub fn get_voice_models() -> Vec<VoiceModel> {
    VoiceModel::all().to_vec()
}

/// Persist edited voice settings (explicit save from the settings form).
#[tauri::command]
pub fn save_voice_settings(
    controller: State<'_, AppController>,
    settings: VoiceSettings,
) -> Result<VoiceSettings, String> {
    controller
        .save_voice_settings(settings)
        .map_err(|e| e.to_string())
}

// ==================== Session Commands ====================

/// Open a voice session bound to a support-chat session.
#[tauri::command]
pub async fn voice_connect(
    controller: State<'_, AppController>,
    chat_session_id: String,
) -> Result<SessionSnapshot, String> {
    controller
        .connect(chat_session_id)
        .await
        .map_err(|e| e.to_string())
}

/// Close the active voice session. Safe to call when none is active.
#[tauri::command]
pub async fn voice_disconnect(
    controller: State<'_, AppController>,
) -> Result<SessionSnapshot, String> {
    controller.disconnect().await;
    Ok(controller.session_snapshot())
}

/// Toggle the local mute flag; returns the new value.
#[tauri::command]
pub fn voice_toggle_mute(controller: State<'_, AppController>) -> bool {
    controller.toggle_mute()
}

/// Current session state.
#[tauri::command]
pub fn voice_session_state(controller: State<'_, AppController>) -> SessionSnapshot {
    controller.session_snapshot()
}

// ==================== App Commands ====================

/// Get application paths information.
#[tauri::command]
pub fn get_paths(controller: State<'_, AppController>) -> AppPaths {
    AppPaths {
        data_dir: controller.data_dir(),
        logs_dir: controller.logs_dir(),
        config_path: controller.config_path(),
    }
}

/// Application paths information.
#[derive(serde::Serialize)]
pub struct AppPaths {
    pub data_dir: String,
    pub logs_dir: String,
    pub config_path: String,
}
