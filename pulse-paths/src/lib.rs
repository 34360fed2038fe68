//! XDG Base Directory paths for pulse.
//!
//! The scheduler that drives `pulse` runs on servers and laptops alike, so
//! state lives under XDG paths rather than platform-native ones.

use std::path::PathBuf;

/// Environment variable that pins the data directory for a single run.
pub const DATA_DIR_ENV: &str = "PULSE_DATA_DIR";

/// Get the pulse config directory.
///
/// Returns `$XDG_CONFIG_HOME/pulse` if set, otherwise `~/.config/pulse`.
///
/// # Examples
///
/// ```
/// use pulse_paths::config_dir;
///
/// let config = config_dir();
/// let user_config = config.join("config.toml");
/// ```
pub fn config_dir() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config).join("pulse")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".config/pulse")
    } else {
        PathBuf::from(".config/pulse")
    }
}

/// Get the pulse data directory.
///
/// `PULSE_DATA_DIR` wins when set. Otherwise returns `$XDG_DATA_HOME/pulse`,
/// falling back to `~/.local/share/pulse`. Learning state, post history and
/// the published recommendation all live here.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        PathBuf::from(dir)
    } else if let Ok(xdg_data) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg_data).join("pulse")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".local/share/pulse")
    } else {
        PathBuf::from(".local/share/pulse")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env-mutating assertions share one test so they cannot race each other.
    #[test]
    fn test_dirs_respect_env() {
        unsafe {
            std::env::remove_var(DATA_DIR_ENV);
            std::env::set_var("XDG_CONFIG_HOME", "/tmp/test-config");
            std::env::set_var("XDG_DATA_HOME", "/tmp/test-data");
        }
        assert_eq!(config_dir(), PathBuf::from("/tmp/test-config/pulse"));
        assert_eq!(data_dir(), PathBuf::from("/tmp/test-data/pulse"));

        unsafe {
            std::env::set_var(DATA_DIR_ENV, "/srv/pulse");
        }
        assert_eq!(data_dir(), PathBuf::from("/srv/pulse"));

        unsafe {
            std::env::remove_var(DATA_DIR_ENV);
            std::env::remove_var("XDG_CONFIG_HOME");
            std::env::remove_var("XDG_DATA_HOME");
        }
        assert!(config_dir().ends_with("pulse"));
        assert!(data_dir().ends_with("pulse"));
    }
}
