use std::path::PathBuf;

use server_api::ApiContext;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) api: ApiContext,
}

impl AppState {
    pub(crate) fn upload_dir(&self) -> &PathBuf {
        &self.api.settings.upload_dir
    }
}
