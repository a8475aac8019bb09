use std::env;
use std::path::{Path, PathBuf};

/// Locations of the configuration files read at startup.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub config_path: PathBuf,
    pub secrets_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let project_root = discover_project_root();
        let config_path = env::var("KB_AGENT_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| project_root.join("config.yml"));
        let secrets_path = env::var("KB_AGENT_SECRETS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| project_root.join("secrets.yaml"));

        AppPaths {
            project_root,
            config_path,
            secrets_path,
        }
    }

    /// Resolves a possibly relative path (e.g. the log directory) against the project root.
    pub fn resolve(&self, raw: &Path) -> PathBuf {
        if raw.is_absolute() {
            raw.to_path_buf()
        } else {
            self.project_root.join(raw)
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_project_root() -> PathBuf {
    if let Ok(root) = env::var("KB_AGENT_ROOT") {
        return PathBuf::from(root);
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let cwd = env::current_dir().unwrap_or_else(|_| manifest_dir.clone());
    if cwd.join("config.yml").exists() {
        return cwd;
    }
    if manifest_dir.join("config.yml").exists() {
        return manifest_dir;
    }
    cwd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_keeps_absolute_and_joins_relative() {
        let paths = AppPaths {
            project_root: PathBuf::from("/srv/agent"),
            config_path: PathBuf::from("/srv/agent/config.yml"),
            secrets_path: PathBuf::from("/srv/agent/secrets.yaml"),
        };
        assert_eq!(paths.resolve(Path::new("logs")), PathBuf::from("/srv/agent/logs"));
        assert_eq!(paths.resolve(Path::new("/var/log/kb")), PathBuf::from("/var/log/kb"));
    }
}
