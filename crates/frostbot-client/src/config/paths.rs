use std::path::PathBuf;

/// Where frostbot keeps its files.
///
/// Follows the XDG base directory layout on unix (`$XDG_CONFIG_HOME/frostbot`,
/// `$XDG_DATA_HOME/frostbot`) and `%APPDATA%\frostbot` on Windows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl ProjectPaths {
    /// Resolves the directories for `name`. Returns `None` when no home
    /// directory can be found.
    pub fn new(name: &str) -> Option<Self> {
        let home = home_dir()?;
        Some(Self {
            config_dir: base_dir("XDG_CONFIG_HOME", &home, ".config").join(name),
            data_dir: base_dir("XDG_DATA_HOME", &home, ".local/share").join(name),
        })
    }

    pub fn config_dir(&self) -> &PathBuf {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

#[cfg(not(target_os = "windows"))]
fn base_dir(var: &str, home: &std::path::Path, fallback: &str) -> PathBuf {
    std::env::var_os(var)
        .map(PathBuf::from)
        .filter(|dir| dir.is_absolute())
        .unwrap_or_else(|| home.join(fallback))
}

#[cfg(target_os = "windows")]
fn base_dir(_var: &str, home: &std::path::Path, _fallback: &str) -> PathBuf {
    std::env::var_os("APPDATA")
        .map(PathBuf::from)
        .unwrap_or_else(|| home.join("AppData").join("Roaming"))
}
