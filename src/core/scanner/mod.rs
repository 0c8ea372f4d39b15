// src/core/scanner/mod.rs

//! Every check against the scan target implements one of the two probe traits
//! below. A probe takes a target and its own timeout and returns a typed result
//! or a `ProbeError`. The takeover check is the exception: it works on the
//! subdomain results and is driven by the orchestrator directly.

pub mod axfr_scanner;
pub mod cookies_scanner;
pub mod cors_scanner;
pub mod dns_scanner;
pub mod fingerprint_scanner;
pub mod headers_scanner;
pub mod mixed_content_scanner;
#[cfg(feature = "native-scan")]
pub mod native;
pub mod port_scanner;
pub mod preview_scanner;
pub mod security_txt_scanner;
pub mod ssl_scanner;
pub mod subdomain_scanner;
pub mod takeover_scanner;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderMap;
use tokio::task::spawn_blocking;
use tracing::{debug, error};

use crate::core::error::{ProbeError, ProbeResult};
use crate::core::models::CheckKind;
use crate::core::target::Target;

const USER_AGENT: &str = concat!("SentinelScope/", env!("CARGO_PKG_VERSION"));

/// A non-blocking check driven by the async runtime.
pub trait Probe: Send + Sync {
    type Output: Send + 'static;

    fn kind(&self) -> CheckKind;

    fn probe(
        &self,
        target: &Target,
        timeout: Duration,
    ) -> impl Future<Output = ProbeResult<Self::Output>> + Send;
}

/// A check built on blocking OS calls. Wrap it in `Offloaded` to run it on the
/// runtime's blocking pool.
pub trait BlockingProbe: Send + Sync + 'static {
    type Output: Send + 'static;

    fn kind(&self) -> CheckKind;

    fn probe_blocking(&self, target: &Target, timeout: Duration) -> ProbeResult<Self::Output>;
}

/// Adapts a `BlockingProbe` to the async contract by moving each call onto a
/// blocking worker thread.
pub struct Offloaded<P>(Arc<P>);

impl<P> Offloaded<P> {
    pub fn new(probe: P) -> Self {
        Self(Arc::new(probe))
    }
}

impl<P: BlockingProbe> Probe for Offloaded<P> {
    type Output = P::Output;

    fn kind(&self) -> CheckKind {
        self.0.kind()
    }

    async fn probe(&self, target: &Target, timeout: Duration) -> ProbeResult<P::Output> {
        let probe = Arc::clone(&self.0);
        let target = target.clone();
        let kind = probe.kind();
        debug!(check = %kind, "Offloading blocking probe.");
        spawn_blocking(move || probe.probe_blocking(&target, timeout))
            .await
            .unwrap_or_else(|e| {
                error!(check = %kind, error = %e, "Blocking probe task did not complete.");
                Err(ProbeError::Aborted(e.to_string()))
            })
    }
}

/// Builds the HTTP client shared by the web probes: redirects followed, the
/// probe's timeout applied to the whole request.
pub(crate) fn http_client(timeout: Duration) -> ProbeResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()?)
}

/// Returns a header value as text; non-UTF-8 values are replaced lossily.
pub(crate) fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
}
