use std::{env, io, path::PathBuf};

use directories::ProjectDirs;

const PROJECT_ROOT: &str = env!("CARGO_MANIFEST_DIR");
const DATA_DIR_ENV: &str = "PODFLOW_DATA_DIR";

/// File name of the SQLite database holding the session slots
pub const SLOTS_DB_FILE: &str = "podflow.sqlite";

/// Directory where the workbench keeps its local state.
///
/// `PODFLOW_DATA_DIR` wins when set. Debug builds use `dev_assets/` at the
/// workspace root so local runs never touch the real user profile.
pub fn data_dir() -> io::Result<PathBuf> {
    let path = if let Ok(custom_dir) = env::var(DATA_DIR_ENV) {
        PathBuf::from(custom_dir)
    } else if cfg!(debug_assertions) {
        PathBuf::from(PROJECT_ROOT).join("../../dev_assets")
    } else {
        ProjectDirs::from("app", "podflow", "podflow")
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, "OS didn't give us a home directory")
            })?
            .data_dir()
            .to_path_buf()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path)?;
        tracing::info!("Created data directory: {}", path.display());
    }

    Ok(path)
    // macOS → ~/Library/Application Support/app.podflow.podflow
    // Linux → ~/.local/share/podflow   (respects XDG_DATA_HOME)
}

pub fn slots_db_path() -> io::Result<PathBuf> {
    Ok(data_dir()?.join(SLOTS_DB_FILE))
}
