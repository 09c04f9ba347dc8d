/*
 * Session configuration: which directory is walked, what is pruned or excluded
 * during the walk, and where and under which name exports are written.
 * Nothing here is persisted between runs; a `SessionConfig` is assembled from
 * command-line arguments at startup and handed to the core services.
 */
use glob::Pattern;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_PRUNED_DIR_NAMES: &[&str] = &[".env", ".venv"];

// Earlier exports and session logs must never be fed back into a new export.
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &["*_context_[0-9]*_[0-9]*.txt", "codestract_*.log"];

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    InvalidRoot(PathBuf),
    InvalidPattern(String, glob::PatternError),
}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Configuration I/O error: {e}"),
            ConfigError::InvalidRoot(p) => write!(f, "Root path is not a directory: {p:?}"),
            ConfigError::InvalidPattern(p, e) => write!(f, "Invalid exclude pattern '{p}': {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::InvalidPattern(_, e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/*
 * Base names that are omitted from the candidate list. Entries containing glob
 * metacharacters are compiled as patterns, everything else is compared literally.
 */
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    names: Vec<String>,
    patterns: Vec<Pattern>,
}

impl ExclusionSet {
    pub fn new() -> Self {
        ExclusionSet::default()
    }

    pub fn add(&mut self, entry: &str) -> Result<()> {
        let trimmed = entry.trim();
        if trimmed.is_empty() {
            return Ok(());
        }
        if trimmed.contains(['*', '?', '[']) {
            let pattern = Pattern::new(trimmed)
                .map_err(|e| ConfigError::InvalidPattern(trimmed.to_string(), e))?;
            self.patterns.push(pattern);
        } else if !self.names.iter().any(|n| n == trimmed) {
            self.names.push(trimmed.to_string());
        }
        Ok(())
    }

    pub fn matches_name(&self, name: &OsStr) -> bool {
        let name = name.to_string_lossy();
        self.names.iter().any(|n| *n == name) || self.patterns.iter().any(|p| p.matches(&name))
    }

    #[cfg(test)]
    pub fn matches_path(&self, path: &Path) -> bool {
        path.file_name().is_some_and(|name| self.matches_name(name))
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.patterns.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub root_path: PathBuf,
    pub exclusions: ExclusionSet,
    pub pruned_dir_names: Vec<String>,
    pub respect_ignore_files: bool,
    pub output_dir: PathBuf,
    pub project_name: String,
}

impl SessionConfig {
    /*
     * Builds a configuration rooted at `root_path` with the default pruning and
     * exclusion rules. The root is canonicalised so that every path produced by
     * the walk is absolute. The running executable's own file name is always
     * excluded.
     */
    pub fn new(root_path: &Path) -> Result<Self> {
        if !root_path.is_dir() {
            return Err(ConfigError::InvalidRoot(root_path.to_path_buf()));
        }
        let root_path = root_path.canonicalize()?;
        let working_dir = std::env::current_dir()?;

        let mut exclusions = ExclusionSet::new();
        for pattern in DEFAULT_EXCLUDE_PATTERNS {
            exclusions.add(pattern)?;
        }
        if let Some(exe_name) = running_executable_name() {
            exclusions.add(&exe_name)?;
        }

        let config = SessionConfig {
            root_path,
            exclusions,
            pruned_dir_names: DEFAULT_PRUNED_DIR_NAMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            respect_ignore_files: false,
            project_name: project_name_for(&working_dir),
            output_dir: working_dir,
        };
        log::debug!("SessionConfig: Created {config:?}");
        Ok(config)
    }

    pub fn add_exclusions<S: AsRef<str>>(&mut self, entries: &[S]) -> Result<()> {
        for entry in entries {
            self.exclusions.add(entry.as_ref())?;
        }
        Ok(())
    }

    pub fn add_pruned_dirs<S: AsRef<str>>(&mut self, names: &[S]) {
        for name in names {
            let name = name.as_ref().trim().trim_end_matches(['/', '\\']);
            if !name.is_empty() && !self.pruned_dir_names.iter().any(|n| n == name) {
                self.pruned_dir_names.push(name.to_string());
            }
        }
    }

    pub fn is_pruned_dir_name(&self, name: &OsStr) -> bool {
        self.pruned_dir_names.iter().any(|n| OsStr::new(n) == name)
    }
}

/*
 * Name used as the prefix of export files: the base name of `dir`, or
 * "export" when the directory has no usable name (e.g. a filesystem root).
 */
pub fn project_name_for(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "export".to_string())
}

fn running_executable_name() -> Option<String> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.file_name().map(|n| n.to_string_lossy().into_owned()))
}
