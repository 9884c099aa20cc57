//! Application state shared by every handler.

use ephemera_core::Config;
use ephemera_services::Files;

#[derive(Clone)]
pub struct AppState {
    pub files: Files,
    pub config: Config,
}

impl AppState {
    pub fn new(files: Files, config: Config) -> Self {
        Self { files, config }
    }
}
