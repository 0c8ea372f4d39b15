// src/core/scanner/port_scanner.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::core::error::ProbeResult;
use crate::core::models::{CheckKind, PortProbeOutcome, PortScanReport};
use crate::core::profiles::PortCandidateSet;
use crate::core::scheduler::BoundedScheduler;
use crate::core::scanner::Probe;
use crate::core::target::Target;

#[cfg(feature = "native-scan")]
use crate::core::scanner::native::{self, NativeScanner};

pub const CONNECT_BACKEND: &str = "connect";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortScanSettings {
    pub concurrency: usize,
    pub timeout: Duration,
}

/// One TCP connect attempt. Refused, unreachable and timed out all read as closed.
pub async fn probe_port(host: &str, port: u16, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(stream)) => {
            drop(stream);
            true
        }
        Ok(Err(e)) => {
            debug!(host, port, error = %e, "Port closed.");
            false
        }
        Err(_) => false,
    }
}

/// The default backend: one scheduler unit per port.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectScanner;

impl ConnectScanner {
    pub async fn scan(&self, host: &str, ports: &[u16], settings: PortScanSettings) -> Vec<PortProbeOutcome> {
        let scheduler = BoundedScheduler::new(settings.concurrency);
        let host: Arc<str> = Arc::from(host);
        let timeout = settings.timeout;

        let results = scheduler
            .run(ports.iter().copied(), |port| {
                let host = Arc::clone(&host);
                async move {
                    PortProbeOutcome { port, is_open: probe_port(&host, port, timeout).await }
                }
            })
            .await;

        results
            .into_iter()
            .zip(ports)
            .map(|(result, &port)| result.unwrap_or(PortProbeOutcome { port, is_open: false }))
            .collect()
    }
}

/// The port scanning strategy, chosen once at start-up.
#[derive(Debug, Clone, Copy)]
pub enum PortScanBackend {
    Connect(ConnectScanner),
    #[cfg(feature = "native-scan")]
    Native(NativeScanner),
}

impl PortScanBackend {
    /// Picks the accelerated backend when it is preferred and reports itself
    /// available, the connect scanner otherwise.
    pub fn select(prefer_native: bool) -> Self {
        #[cfg(feature = "native-scan")]
        {
            if let Some(scanner) = prefer_native.then(NativeScanner::detect).flatten() {
                info!(backend = native::NATIVE_BACKEND, "Selected port scan backend.");
                return Self::Native(scanner);
            }
        }
        debug!(prefer_native, "Accelerated port scanning unavailable or not requested.");
        info!(backend = CONNECT_BACKEND, "Selected port scan backend.");
        Self::Connect(ConnectScanner)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Connect(_) => CONNECT_BACKEND,
            #[cfg(feature = "native-scan")]
            Self::Native(_) => native::NATIVE_BACKEND,
        }
    }

    pub async fn scan(&self, host: &str, ports: &PortCandidateSet, settings: PortScanSettings) -> PortScanReport {
        info!(host, ports = ports.len(), backend = self.name(), concurrency = settings.concurrency, "Starting port scan.");
        let outcomes = match self {
            Self::Connect(scanner) => scanner.scan(host, ports.as_slice(), settings).await,
            #[cfg(feature = "native-scan")]
            Self::Native(scanner) => scanner.scan(host, ports.as_slice(), settings).await,
        };
        let report = PortScanReport::assemble(host, self.name(), ports.as_slice(), outcomes);
        info!(host, open = report.open_ports.len(), "Port scan finished.");
        report
    }
}

/// Adapts a backend and a candidate set to the probe contract. The probe's
/// timeout applies to each connect attempt.
pub struct PortScanProbe {
    backend: PortScanBackend,
    ports: PortCandidateSet,
    concurrency: usize,
}

impl PortScanProbe {
    pub fn new(backend: PortScanBackend, ports: PortCandidateSet, concurrency: usize) -> Self {
        Self { backend, ports, concurrency }
    }
}

impl Probe for PortScanProbe {
    type Output = PortScanReport;

    fn kind(&self) -> CheckKind {
        CheckKind::Ports
    }

    async fn probe(&self, target: &Target, timeout: Duration) -> ProbeResult<PortScanReport> {
        let settings = PortScanSettings { concurrency: self.concurrency, timeout };
        Ok(self.backend.scan(target.host(), &self.ports, settings).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    fn settings(concurrency: usize) -> PortScanSettings {
        PortScanSettings { concurrency, timeout: Duration::from_millis(500) }
    }

    #[tokio::test]
    async fn reports_listening_port_open_and_freed_port_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open = listener.local_addr().unwrap().port();
        let closed = closed_port().await;

        let ports = PortCandidateSet::new([closed, open]).unwrap();
        let report = PortScanBackend::Connect(ConnectScanner).scan("127.0.0.1", &ports, settings(10)).await;

        assert_eq!(report.backend, CONNECT_BACKEND);
        assert_eq!(report.ports_scanned, ports.as_slice());
        assert_eq!(report.open_ports, vec![open]);
    }

    #[tokio::test]
    async fn concurrency_limit_does_not_change_the_open_set() {
        let first = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let second = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut candidates = vec![
            first.local_addr().unwrap().port(),
            second.local_addr().unwrap().port(),
        ];
        for _ in 0..5 {
            candidates.push(closed_port().await);
        }
        let ports = PortCandidateSet::new(candidates).unwrap();

        let backend = PortScanBackend::Connect(ConnectScanner);
        let serial = backend.scan("127.0.0.1", &ports, settings(1)).await;
        let wide = backend.scan("127.0.0.1", &ports, settings(200)).await;

        assert_eq!(serial.open_ports, wide.open_ports);
        assert_eq!(serial.open_ports.len(), 2);
    }

    #[tokio::test]
    async fn unresolvable_host_yields_all_closed() {
        let ports = PortCandidateSet::new([80, 443]).unwrap();
        let report = PortScanBackend::Connect(ConnectScanner)
            .scan("no-such-host.invalid", &ports, settings(4))
            .await;
        assert!(report.open_ports.is_empty());
        assert_eq!(report.outcomes.len(), 2);
    }

    #[test]
    fn not_preferring_native_selects_connect() {
        assert_eq!(PortScanBackend::select(false).name(), CONNECT_BACKEND);
    }
}
