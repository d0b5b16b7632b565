//! World backend that replays snapshot files instead of calling the service.

use std::{
    collections::VecDeque,
    fs,
    path::{Path, PathBuf},
};

use log::debug;
use prompt_world_core::snapshot::{GenerateRequest, ModifyRequest};
use prompt_world_session::{BackendError, WorldBackend};

/// Serves the generation file once, then one modification file per request.
#[derive(Debug)]
pub(crate) struct FileBackend {
    generate: PathBuf,
    modifications: VecDeque<PathBuf>,
}

impl FileBackend {
    /// Creates a backend over the provided snapshot files.
    pub(crate) fn new(generate: PathBuf, modifications: Vec<PathBuf>) -> Self {
        Self {
            generate,
            modifications: modifications.into(),
        }
    }
}

fn read(path: &Path) -> Result<String, BackendError> {
    debug!("serving snapshot {}", path.display());
    fs::read_to_string(path)
        .map_err(|error| BackendError::Transport(format!("{}: {error}", path.display())))
}

impl WorldBackend for FileBackend {
    fn generate_world(&mut self, request: &GenerateRequest) -> Result<String, BackendError> {
        debug!("generate prompt: {}", request.prompt);
        read(&self.generate)
    }

    fn modify_world(&mut self, request: &ModifyRequest) -> Result<String, BackendError> {
        debug!(
            "modify command `{}` at {:?}",
            request.command, request.player_position
        );
        match self.modifications.pop_front() {
            Some(path) => read(&path),
            None => Err(BackendError::Status {
                status: 404,
                body: "no modification snapshot left".to_owned(),
            }),
        }
    }
}
