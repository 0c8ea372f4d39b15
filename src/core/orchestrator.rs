// src/core/orchestrator.rs

//! Runs one scan end to end: normalize the request, dispatch every enabled
//! probe as its own task, wait for each to settle, and assemble the report.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use chrono::Utc;
use strum::Display;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::core::config::{ScanPlan, ScanRequest};
use crate::core::error::{InputError, ProbeResult};
use crate::core::models::{CheckKind, ScanReport, Slot, SubdomainReport, TakeoverAssessment};
use crate::core::scanner::axfr_scanner::AxfrProbe;
use crate::core::scanner::cookies_scanner::CookiesProbe;
use crate::core::scanner::cors_scanner::CorsProbe;
use crate::core::scanner::dns_scanner::{DnsExtrasProbe, DnsProbe};
use crate::core::scanner::fingerprint_scanner::FingerprintProbe;
use crate::core::scanner::headers_scanner::HeadersProbe;
use crate::core::scanner::mixed_content_scanner::MixedContentProbe;
use crate::core::scanner::port_scanner::{PortScanBackend, PortScanProbe};
use crate::core::scanner::preview_scanner::PreviewProbe;
use crate::core::scanner::security_txt_scanner::SecurityTxtProbe;
use crate::core::scanner::ssl_scanner::TlsProbe;
use crate::core::scanner::subdomain_scanner::{LiveSources, SubdomainSources};
use crate::core::scanner::takeover_scanner::TakeoverCheck;
use crate::core::scanner::{Offloaded, Probe};
use crate::core::target::Target;

/// The lifecycle of a single scan. Every transition is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ScanPhase {
    Normalizing,
    Dispatching,
    Awaiting,
    Aggregating,
    Done,
}

/// A spawned probe that is aborted when dropped, so a scan whose caller goes
/// away does not leave its probes running.
struct ProbeHandle<T>(JoinHandle<ProbeResult<T>>);

impl<T> Future for ProbeHandle<T> {
    type Output = Result<ProbeResult<T>, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl<T> Drop for ProbeHandle<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

type ProbeTask<T> = Option<ProbeHandle<T>>;

/// The takeover check depends on the subdomain results, so its state is only
/// known once they have settled.
enum TakeoverTask {
    Disabled,
    Skipped(String),
    Running(ProbeHandle<TakeoverAssessment>),
}

/// Owns the port scanning backend chosen at start-up and the subdomain
/// sources. Holds no per-scan state, so one instance can serve any number of
/// concurrent scans.
#[derive(Debug, Clone, Copy)]
pub struct Orchestrator<S = LiveSources> {
    backend: PortScanBackend,
    subdomain_sources: S,
}

impl Orchestrator {
    pub fn new(prefer_native: bool) -> Self {
        Self::with_backend(PortScanBackend::select(prefer_native))
    }

    pub fn with_backend(backend: PortScanBackend) -> Self {
        Self { backend, subdomain_sources: LiveSources }
    }
}

impl<S: SubdomainSources> Orchestrator<S> {
    /// Replaces where subdomain names come from.
    pub fn with_subdomain_sources<T: SubdomainSources>(self, subdomain_sources: T) -> Orchestrator<T> {
        Orchestrator { backend: self.backend, subdomain_sources }
    }

    pub fn backend(&self) -> PortScanBackend {
        self.backend
    }

    /// Validates `request` and runs the scan. Only input errors are returned;
    /// probe failures end up in the report.
    pub async fn scan_request(&self, request: ScanRequest) -> Result<ScanReport, InputError> {
        enter(ScanPhase::Normalizing, &request.domain);
        let plan = request.into_plan().inspect_err(|e| {
            warn!(error = %e, "Scan request rejected.");
        })?;
        Ok(self.scan(plan).await)
    }

    pub async fn scan(&self, plan: ScanPlan) -> ScanReport {
        let ScanPlan { target, ports, checks, settings } = plan;
        let http = settings.http_timeout;
        let dns = settings.dns_timeout;

        let started_at = Utc::now();
        enter(ScanPhase::Dispatching, target.host());

        let subdomains = spawn_probe(checks.subdomains, &target, http, || {
            self.subdomain_sources.build_probe(dns, settings.dns_concurrency)
        });
        let port_scan = spawn_probe(checks.ports, &target, settings.port_timeout, || {
            PortScanProbe::new(self.backend, ports, settings.concurrency)
        });
        let tls = spawn_probe(checks.tls, &target, http, || Offloaded::new(TlsProbe::default()));
        let headers = spawn_probe(checks.headers, &target, http, || HeadersProbe);
        let dns_records = spawn_probe(checks.dns, &target, dns, || DnsProbe);
        let preview = spawn_probe(checks.preview, &target, http, || PreviewProbe);
        let cors = spawn_probe(checks.cors, &target, http, || CorsProbe);
        let cookies = spawn_probe(checks.cookies, &target, http, || CookiesProbe);
        let fingerprint = spawn_probe(checks.fingerprint, &target, http, || FingerprintProbe);
        let security_txt = spawn_probe(checks.security_txt, &target, http, || SecurityTxtProbe);
        let mixed_content = spawn_probe(checks.mixed_content, &target, http, || MixedContentProbe);
        let dns_extras = spawn_probe(checks.dns_extras, &target, dns, || DnsExtrasProbe);
        let axfr = spawn_probe(checks.axfr, &target, dns, || AxfrProbe);

        enter(ScanPhase::Awaiting, target.host());
        let subdomains = settle(CheckKind::Subdomains, subdomains).await;

        let takeover_task = if !checks.takeover {
            TakeoverTask::Disabled
        } else {
            match takeover_candidates(&subdomains) {
                Ok(names) => {
                    let check = TakeoverCheck::new(settings.concurrency);
                    TakeoverTask::Running(ProbeHandle(tokio::spawn(async move { check.assess(&names, http).await })))
                }
                Err(reason) => {
                    info!(check = %CheckKind::Takeover, reason = %reason, "Check skipped.");
                    TakeoverTask::Skipped(reason)
                }
            }
        };

        let ports = settle(CheckKind::Ports, port_scan).await;
        let tls = settle(CheckKind::Tls, tls).await;
        let headers = settle(CheckKind::Headers, headers).await;
        let dns_records = settle(CheckKind::Dns, dns_records).await;
        let preview = settle(CheckKind::Preview, preview).await;
        let cors = settle(CheckKind::Cors, cors).await;
        let cookies = settle(CheckKind::Cookies, cookies).await;
        let fingerprint = settle(CheckKind::Fingerprint, fingerprint).await;
        let security_txt = settle(CheckKind::SecurityTxt, security_txt).await;
        let mixed_content = settle(CheckKind::MixedContent, mixed_content).await;
        let dns_extras = settle(CheckKind::DnsExtras, dns_extras).await;
        let axfr = settle(CheckKind::Axfr, axfr).await;
        let takeover = match takeover_task {
            TakeoverTask::Disabled => Slot::Disabled,
            TakeoverTask::Skipped(reason) => Slot::Skipped { reason },
            TakeoverTask::Running(handle) => settle(CheckKind::Takeover, Some(handle)).await,
        };

        enter(ScanPhase::Aggregating, target.host());
        let finished_at = Utc::now().max(started_at);
        let report = ScanReport {
            target,
            started_at,
            finished_at,
            subdomains,
            ports,
            tls,
            headers,
            dns: dns_records,
            preview,
            takeover,
            cors,
            cookies,
            fingerprint,
            security_txt,
            mixed_content,
            dns_extras,
            axfr,
        };

        let completed = report.slot_statuses().iter().filter(|(_, status)| *status == "completed").count();
        info!(
            phase = %ScanPhase::Done,
            target = report.target.host(),
            completed,
            elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
            "Scan finished."
        );
        report
    }
}

fn enter(phase: ScanPhase, target: &str) {
    info!(phase = %phase, target, "Scan phase changed.");
}

/// Spawns an enabled probe as an independent task. Disabled probes are never
/// constructed.
fn spawn_probe<P, F>(enabled: bool, target: &Target, timeout: Duration, build: F) -> ProbeTask<P::Output>
where
    P: Probe + 'static,
    F: FnOnce() -> P,
{
    if !enabled {
        return None;
    }
    let probe = build();
    let kind = probe.kind();
    let target = target.clone();
    debug!(check = %kind, timeout_ms = timeout.as_millis() as u64, "Dispatching probe.");
    Some(ProbeHandle(tokio::spawn(async move { probe.probe(&target, timeout).await })))
}

/// Waits for one probe and folds its outcome into a slot. Errors and panics
/// become `Failed`.
async fn settle<T>(kind: CheckKind, task: ProbeTask<T>) -> Slot<T> {
    let Some(handle) = task else {
        debug!(check = %kind, "Check disabled.");
        return Slot::Disabled;
    };
    match handle.await {
        Ok(Ok(result)) => {
            info!(check = %kind, "Check completed.");
            Slot::Completed { result }
        }
        Ok(Err(e)) => {
            warn!(check = %kind, error = %e, "Check failed.");
            Slot::Failed { reason: e.to_string() }
        }
        Err(e) => {
            error!(check = %kind, error = %e, "Check task did not complete.");
            Slot::Failed { reason: format!("probe task aborted: {e}") }
        }
    }
}

/// The names to check for takeover, or why the check cannot run.
pub fn takeover_candidates(subdomains: &Slot<SubdomainReport>) -> Result<Vec<String>, String> {
    match subdomains {
        Slot::Completed { result } if !result.discovered.is_empty() => Ok(result.discovered.clone()),
        Slot::Completed { .. } => Err("no subdomains were discovered".to_string()),
        Slot::Disabled => Err("subdomain enumeration is disabled".to_string()),
        Slot::Skipped { .. } | Slot::Failed { .. } => Err("subdomain enumeration did not complete".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn report_with(names: &[&str]) -> Slot<SubdomainReport> {
        Slot::Completed {
            result: SubdomainReport {
                root_domain: "example.com".to_string(),
                discovered: names.iter().map(|n| n.to_string()).collect(),
                source_counts: BTreeMap::new(),
            },
        }
    }

    #[test]
    fn takeover_runs_only_with_discovered_names() {
        assert_eq!(
            takeover_candidates(&report_with(&["api.example.com"])),
            Ok(vec!["api.example.com".to_string()])
        );
        assert!(takeover_candidates(&report_with(&[])).is_err());
        assert!(takeover_candidates(&Slot::Disabled).is_err());
        assert!(takeover_candidates(&Slot::Failed { reason: "timed out".to_string() }).is_err());
    }

    #[tokio::test]
    async fn disabled_task_settles_as_disabled() {
        let slot: Slot<u8> = settle(CheckKind::Cors, None).await;
        assert!(matches!(slot, Slot::Disabled));
    }

    #[tokio::test]
    async fn panicking_task_settles_as_failed() {
        let handle: JoinHandle<ProbeResult<u8>> = tokio::spawn(async { panic!("probe blew up") });
        let slot = settle(CheckKind::Headers, Some(ProbeHandle(handle))).await;
        assert!(matches!(slot, Slot::Failed { .. }));
    }

    #[tokio::test]
    async fn dropped_handle_aborts_its_task() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle: JoinHandle<ProbeResult<u8>> = tokio::spawn(async move {
            let _tx = tx;
            std::future::pending::<()>().await;
            Ok(0)
        });
        drop(ProbeHandle(handle));
        // The sender is dropped once the aborted task is torn down.
        assert!(rx.await.is_err());
    }
}
