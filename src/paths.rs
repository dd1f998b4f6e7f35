use std::path::PathBuf;
use std::sync::OnceLock;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the logs directory: `<exe_dir>/logs/`
pub fn get_logs_dir() -> PathBuf {
    get_exe_dir().join("logs")
}

/// Returns the model directory: `<exe_dir>/resources/model/`
pub fn get_model_dir() -> PathBuf {
    get_exe_dir().join("resources").join("model")
}

/// Returns the configuration directory: `<exe_dir>/config/`
pub fn get_config_dir() -> PathBuf {
    get_exe_dir().join("config")
}

/// Default location of the class names vocabulary.
pub fn get_default_labels_path() -> PathBuf {
    get_model_dir().join("class_names.json")
}

/// Default location of the per-resolution slot layout.
pub fn get_default_layout_path() -> PathBuf {
    get_config_dir().join("layout_coordinates.json")
}

/// Ensures all output directories exist. Call at startup.
pub fn ensure_directories() -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir())?;
    std::fs::create_dir_all(get_model_dir())?;
    std::fs::create_dir_all(get_config_dir())?;
    Ok(())
}
