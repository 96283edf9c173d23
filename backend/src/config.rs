//! Runtime settings.
//!
//! Constants plus the few values that may come from the environment
//! (`.env` is loaded by the binary through `dotenvy`).

use std::env;
use std::path::PathBuf;

/// Rows returned by a preview.
pub const PREVIEW_ROWS: usize = 10;

/// HTTP port when neither `--port` nor `PORT` is given.
pub const DEFAULT_PORT: u16 = 3000;

/// Largest accepted upload, in bytes.
pub const MAX_UPLOAD_SIZE: usize = 20 * 1024 * 1024;

/// Profile store used when `YNAB_CONVERTER_PROFILES` is unset.
pub const DEFAULT_PROFILES_FILE: &str = ".ynab-converter/profiles.json";

pub const PORT_ENV: &str = "PORT";
pub const PROFILES_ENV: &str = "YNAB_CONVERTER_PROFILES";

/// Port from `PORT`, falling back to [`DEFAULT_PORT`] when unset or invalid.
pub fn port() -> u16 {
    env::var(PORT_ENV)
        .ok()
        .and_then(|p| p.trim().parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

/// Location of the profile store.
pub fn profiles_path() -> PathBuf {
    match env::var(PROFILES_ENV) {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_PROFILES_FILE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        assert_eq!(PREVIEW_ROWS, 10);
        assert!(MAX_UPLOAD_SIZE >= 1024 * 1024);
        assert!(DEFAULT_PROFILES_FILE.ends_with(".json"));
    }
}
