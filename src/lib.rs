pub mod age;
#[cfg(feature = "desktop")]
mod commands;
pub mod editor;
pub mod error;
pub mod extraction;
pub mod gateway;
pub mod guard;
pub mod intake;
pub mod search;
pub mod session;
pub mod state;
pub mod store;
pub mod types;
pub mod util;

#[cfg(feature = "desktop")]
use std::sync::Arc;

#[cfg(feature = "desktop")]
use state::AppState;

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let state = match AppState::new() {
        Ok(state) => Arc::new(state),
        Err(e) => {
            log::error!("Startup failed: {}. {}", e, e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .setup(move |app| {
            use tauri::Manager;

            app.manage(state.clone());

            // Load the roll in the background so the window appears immediately.
            let startup_state = state.clone();
            tauri::async_runtime::spawn(async move {
                if let Err(e) = startup_state.session.load().await {
                    log::warn!("Initial roll load failed: {}", e);
                }
            });

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::get_config,
            commands::load_roll,
            commands::get_session_view,
            // Search
            commands::set_search_mode,
            commands::set_search_query,
            commands::select_booth,
            commands::select_ward,
            commands::select_house,
            // Editor
            commands::select_member,
            commands::update_draft_field,
            commands::close_editor,
            commands::attach_photo,
            commands::export_photo,
            commands::extract_document_fields,
            // Save / delete
            commands::save_draft,
            commands::acknowledge_duplicate,
            commands::request_delete,
            commands::set_delete_reason,
            commands::cancel_delete,
            commands::confirm_delete,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
