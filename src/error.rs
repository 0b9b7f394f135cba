// Error types at the process boundary (§7)
//
// The core itself never returns a `Result` - decode failures and invalid
// accesses are handled in place (abort via `Cpu::undefined_instruction`, or
// logged and ignored). These types only cover the host-side failure modes:
// loading a ROM/BIOS, persisting a save file, and reading the settings file.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BootError {
    #[error("failed to read ROM file {path}: {source}")]
    RomRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read BIOS file {path}: {source}")]
    BiosRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("BIOS image is {actual} bytes, expected {expected}")]
    BiosSize { expected: usize, actual: usize },

    #[error("ROM file {path} is empty")]
    EmptyRom { path: PathBuf },
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("failed to write save file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read save file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
