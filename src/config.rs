//! Layered application configuration.
//!
//! A [`Config`] is assembled once at start-up and handed to the
//! [`Comparer`](crate::comparer::Comparer). Sources, lowest priority first:
//!
//! 1. built-in defaults
//! 2. `config.toml` in the config directory (or the file given with `--config`)
//! 3. `PICDUPE_*` environment variables, e.g. `PICDUPE_IO_THREADS=8`
//! 4. command-line flags, applied by [`crate::cli::ScanArgs::apply_to`]
//!
//! The config directory is the platform one (`~/.config/picdupe` on Linux)
//! or `./config` in portable mode.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::duplicates::PerceptualAlgorithm;
use crate::scanner::{SignatureAlgorithm, UNBOUNDED_DEPTH};

/// Name of the configuration file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "PICDUPE_";

/// Errors raised while loading, checking or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No home directory to derive the config directory from.
    #[error("Could not determine the configuration directory")]
    NoConfigDir,

    /// A source could not be parsed or has a wrongly typed value.
    #[error("Invalid configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// A value is out of range.
    #[error("Invalid value for `{key}`: {message}")]
    Invalid {
        /// Offending key
        key: &'static str,
        /// What is wrong with it
        message: String,
    },

    /// Serializing to TOML failed.
    #[error("Could not serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Reading or writing the config file failed.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Config file or directory
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

/// Every tunable of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Descend into sub-directories without limit.
    pub recursive: bool,
    /// Explicit depth limit; takes precedence over `recursive`.
    pub max_depth: Option<usize>,
    /// Run the perceptual stage.
    pub perceptual_hash: bool,
    /// Run the pixel-exact stage.
    pub pixel_by_pixel: bool,
    /// Hash used by the perceptual stage.
    pub perceptual_algorithm: PerceptualAlgorithm,
    /// Maximum Hamming distance between perceptual hashes (0 = equal hashes).
    pub similarity_threshold: u32,
    /// Perceptual hash side length in bits.
    pub hash_size: u32,
    /// Coarse content signature.
    pub signature: SignatureAlgorithm,
    /// Where `move` puts duplicates; the working directory when unset.
    pub move_destination: Option<PathBuf>,
    /// Worker pool size.
    pub io_threads: usize,
    /// Follow symbolic links during expansion.
    pub follow_symlinks: bool,
    /// Skip dot-files and dot-directories during expansion.
    pub skip_hidden: bool,
    /// Delete permanently; `false` sends files to the system trash.
    pub permanent_delete: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recursive: false,
            max_depth: None,
            perceptual_hash: true,
            pixel_by_pixel: true,
            perceptual_algorithm: PerceptualAlgorithm::Phash,
            similarity_threshold: 0,
            hash_size: 8,
            signature: SignatureAlgorithm::Crc32,
            move_destination: None,
            io_threads: 4,
            follow_symlinks: false,
            skip_hidden: false,
            permanent_delete: true,
        }
    }
}

impl Config {
    /// Load defaults, the config file and the environment.
    ///
    /// `explicit` replaces the default config file location; a missing
    /// default file is fine, a missing explicit one is an error.
    ///
    /// # Errors
    ///
    /// Fails on unreadable or malformed sources and on out-of-range values.
    pub fn load(explicit: Option<&Path>, portable: bool) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::Io {
                        path: path.to_path_buf(),
                        source: io::Error::from(io::ErrorKind::NotFound),
                    });
                }
                path.to_path_buf()
            }
            None => config_path(portable)?,
        };

        log::debug!("Loading configuration from {}", path.display());
        let config: Self = Self::figment(&path).extract().map_err(Box::new)?;
        config.check()?;
        Ok(config)
    }

    /// The provider stack for a given config file, without CLI overrides.
    #[must_use]
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Reject values the pipeline cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad key.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.io_threads == 0 {
            return Err(ConfigError::Invalid {
                key: "io_threads",
                message: "must be at least 1".to_string(),
            });
        }
        if self.max_depth == Some(0) {
            return Err(ConfigError::Invalid {
                key: "max_depth",
                message: "must be at least 1".to_string(),
            });
        }
        if !(2..=64).contains(&self.hash_size) {
            return Err(ConfigError::Invalid {
                key: "hash_size",
                message: format!("{} is outside 2..=64", self.hash_size),
            });
        }
        let max_distance = self.hash_size * self.hash_size;
        if self.similarity_threshold > max_distance {
            return Err(ConfigError::Invalid {
                key: "similarity_threshold",
                message: format!(
                    "{} exceeds the {}-bit hash length",
                    self.similarity_threshold, max_distance
                ),
            });
        }
        Ok(())
    }

    /// Directory expansion depth implied by `max_depth` and `recursive`.
    #[must_use]
    pub fn effective_depth(&self) -> usize {
        match self.max_depth {
            Some(depth) => depth.max(1),
            None if self.recursive => UNBOUNDED_DEPTH,
            None => 1,
        }
    }

    /// Destination for `move`, falling back to the working directory.
    ///
    /// # Errors
    ///
    /// Fails only if no destination is configured and the working directory
    /// cannot be determined.
    pub fn move_destination(&self) -> Result<PathBuf, ConfigError> {
        match self.move_destination {
            Some(ref dir) => Ok(dir.clone()),
            None => env::current_dir().map_err(|source| ConfigError::Io {
                path: PathBuf::from("."),
                source,
            }),
        }
    }

    /// Render as TOML.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write as TOML to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Fails if the directory or file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, self.to_toml()?).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// Directory holding `config.toml`.
///
/// # Errors
///
/// Returns [`ConfigError::NoConfigDir`] when the platform directory is
/// unknown, or an I/O error if the working directory is unavailable in
/// portable mode.
pub fn config_dir(portable: bool) -> Result<PathBuf, ConfigError> {
    if portable {
        let cwd = env::current_dir().map_err(|source| ConfigError::Io {
            path: PathBuf::from("."),
            source,
        })?;
        return Ok(cwd.join("config"));
    }
    ProjectDirs::from("org", "picdupe", "picdupe")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or(ConfigError::NoConfigDir)
}

/// Default location of the config file.
///
/// # Errors
///
/// See [`config_dir`].
pub fn config_path(portable: bool) -> Result<PathBuf, ConfigError> {
    Ok(config_dir(portable)?.join(CONFIG_FILE_NAME))
}
