// src/core/error.rs

use std::time::Duration;

use hickory_resolver::error::ResolveError;
use thiserror::Error;

/// Errors raised while turning user input into a scan plan.
///
/// These are the only errors that abort a scan: they are returned before any
/// probe is dispatched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("target is empty")]
    EmptyTarget,
    #[error("could not extract a hostname from `{0}`")]
    InvalidTarget(String),
    #[error("unsupported scheme `{0}`, expected http or https")]
    UnsupportedScheme(String),
    #[error("unknown port profile `{0}`, expected one of: top30, top100, custom")]
    UnknownPortProfile(String),
    #[error("the custom port profile requires a non-empty port list")]
    MissingCustomPorts,
    #[error("invalid port `{0}`, expected an integer between 1 and 65535")]
    InvalidPort(String),
    #[error("{0} must be at least 1")]
    ZeroConcurrency(&'static str),
    #[error("{0} must be a positive number of seconds")]
    InvalidTimeout(&'static str),
}

/// Failures local to a single probe. They never leave the orchestrator: each one
/// is folded into a `Slot::Failed` for the probe that produced it.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("DNS error: {0}")]
    Dns(#[from] ResolveError),
    #[error("TLS error: {0}")]
    Tls(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("probe task aborted: {0}")]
    Aborted(String),
}

pub type ProbeResult<T> = Result<T, ProbeError>;
