//! Host platform utility functions

use std::{env, path::PathBuf};

/// Name of the environment variable pointing at the root of the workspace, under which the
/// `params` and `sessions` directories live.
pub const ROOT_ENV_VAR: &str = "RACELINE_ROOT";

/// Get the root directory of the racing line software.
pub fn get_raceline_root() -> Result<PathBuf, env::VarError> {
    env::var(ROOT_ENV_VAR).map(PathBuf::from)
}
