// src/errors.rs

//! Crate-wide error types and aliases.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LivecapError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Task id already registered: {0}")]
    DuplicateId(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error(transparent)]
    Spawn(#[from] SpawnError),

    #[error("Stream resolution failed: {0}")]
    Resolve(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Why a capture process could not be started.
///
/// Surfaced synchronously from `Orchestrator::start`; a task that fails to
/// spawn never enters the registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpawnError {
    #[error("capture executable not found: {}", .0.display())]
    ExecutableMissing(PathBuf),

    #[error("failed to launch capture process: {0}")]
    LaunchFailed(String),
}

/// Failure of the best-effort orphan sweep. Logged, never returned from
/// `stop_all`.
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("sweep worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("cannot locate {} on PATH; orphan sweep skipped", .0.display())]
    Unresolved(PathBuf),

    #[error("{0}")]
    Other(String),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, LivecapError>;
