// src/core/scanner/native.rs

//! Accelerated port probing backend, compiled in with the `native-scan` feature.
//!
//! The host is resolved once up front, and every attempt then connects straight
//! to socket addresses from a single in-task pool: no task spawn and no name
//! lookup per port. Semantics match the connect scanner: same timeout per
//! attempt, same bound on in-flight connects, every resolved address tried in
//! turn, and any failure reads as closed.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::net::{TcpStream, lookup_host};
use tracing::{debug, warn};

use crate::core::models::PortProbeOutcome;
use crate::core::scanner::port_scanner::PortScanSettings;

pub const NATIVE_BACKEND: &str = "native";

/// Whether the accelerated backend can be used in this build.
pub fn is_available() -> bool {
    cfg!(feature = "native-scan")
}

#[derive(Debug, Clone, Copy)]
pub struct NativeScanner {
    _detected: (),
}

impl NativeScanner {
    pub fn detect() -> Option<Self> {
        is_available().then_some(Self { _detected: () })
    }

    pub async fn scan(&self, host: &str, ports: &[u16], settings: PortScanSettings) -> Vec<PortProbeOutcome> {
        let timeout_ms = u64::try_from(settings.timeout.as_millis()).unwrap_or(u64::MAX).max(1);
        scan_ports_native(host, ports, timeout_ms, settings.concurrency)
            .await
            .into_iter()
            .map(|(port, is_open)| PortProbeOutcome { port, is_open })
            .collect()
    }
}

/// Probes every port in `ports` and returns `(port, is_open)` pairs in
/// completion order. At most `concurrency` connects are in flight.
pub async fn scan_ports_native(
    host: &str,
    ports: &[u16],
    timeout_ms: u64,
    concurrency: usize,
) -> Vec<(u16, bool)> {
    let timeout = Duration::from_millis(timeout_ms);
    let addrs = match tokio::time::timeout(timeout, lookup_host((host, 0))).await {
        Ok(Ok(resolved)) => {
            let mut addrs: Vec<IpAddr> = Vec::new();
            for addr in resolved {
                if !addrs.contains(&addr.ip()) {
                    addrs.push(addr.ip());
                }
            }
            addrs
        }
        Ok(Err(e)) => {
            warn!(host, error = %e, "Host did not resolve, every port reads closed.");
            Vec::new()
        }
        Err(_) => {
            warn!(host, "Host resolution timed out, every port reads closed.");
            Vec::new()
        }
    };
    if addrs.is_empty() {
        return ports.iter().map(|&port| (port, false)).collect();
    }
    debug!(host, addresses = addrs.len(), "Resolved host once for native scan.");

    let limit = concurrency.max(1);
    let mut pending = ports.iter().copied();
    let mut in_flight = FuturesUnordered::new();
    let mut outcomes = Vec::with_capacity(ports.len());

    loop {
        while in_flight.len() < limit {
            match pending.next() {
                Some(port) => in_flight.push(connect_any(&addrs, port, timeout)),
                None => break,
            }
        }
        match in_flight.next().await {
            Some(outcome) => outcomes.push(outcome),
            None => break,
        }
    }
    outcomes
}

async fn connect_any(addrs: &[IpAddr], port: u16, timeout: Duration) -> (u16, bool) {
    let attempt = async {
        for ip in addrs {
            if TcpStream::connect(SocketAddr::new(*ip, port)).await.is_ok() {
                return true;
            }
        }
        false
    };
    (port, tokio::time::timeout(timeout, attempt).await.unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::profiles::PortCandidateSet;
    use crate::core::scanner::port_scanner::{ConnectScanner, PortScanBackend};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn native_scan_reports_every_port_once() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open = listener.local_addr().unwrap().port();

        let mut results = scan_ports_native("127.0.0.1", &[open, 1], 500, 1).await;
        results.sort_unstable();
        assert_eq!(results, vec![(1, false), (open, true)]);
    }

    #[tokio::test]
    async fn native_and_connect_backends_converge() {
        let a = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let b = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let freed = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap().port();
        let ports = PortCandidateSet::new([
            a.local_addr().unwrap().port(),
            b.local_addr().unwrap().port(),
            freed,
        ])
        .unwrap();
        let settings = PortScanSettings { concurrency: 2, timeout: Duration::from_millis(500) };

        let native = PortScanBackend::Native(NativeScanner::detect().unwrap())
            .scan("127.0.0.1", &ports, settings)
            .await;
        let connect = PortScanBackend::Connect(ConnectScanner).scan("127.0.0.1", &ports, settings).await;

        assert_eq!(native.backend, NATIVE_BACKEND);
        assert_eq!(native.open_ports, connect.open_ports);
        assert_eq!(native.ports_scanned, connect.ports_scanned);
    }

    #[tokio::test]
    async fn unresolvable_host_reads_all_closed() {
        let results = scan_ports_native("no-such-host.invalid", &[80, 443], 300, 8).await;
        assert_eq!(results, vec![(80, false), (443, false)]);
    }

    #[test]
    fn selection_prefers_native_when_available() {
        assert!(is_available());
        assert_eq!(PortScanBackend::select(true).name(), NATIVE_BACKEND);
    }
}
