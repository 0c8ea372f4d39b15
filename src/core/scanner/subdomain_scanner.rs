// src/core/scanner/subdomain_scanner.rs

//! Subdomain enumeration from two sources run side by side: names seen in
//! certificate transparency logs, and a DNS sweep over a fixed wordlist.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::time::Duration;

use hickory_resolver::TokioAsyncResolver;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::core::error::{ProbeError, ProbeResult};
use crate::core::models::{CheckKind, SubdomainReport};
use crate::core::profiles::SUBDOMAIN_WORDLIST;
use crate::core::scanner::dns_scanner::build_resolver;
use crate::core::scanner::{Probe, http_client};
use crate::core::scheduler::BoundedScheduler;
use crate::core::target::Target;

pub const CT_SOURCE: &str = "crt.sh";
pub const WORDLIST_SOURCE: &str = "dns-wordlist";

const CRT_SH_URL: &str = "https://crt.sh";

/// A source of candidate names that does not touch the target itself.
pub trait PassiveSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn fetch(&self, root: &str, timeout: Duration) -> impl Future<Output = ProbeResult<Vec<String>>> + Send;
}

/// Decides whether a name exists. Cloned into every scheduler unit.
pub trait HostResolver: Clone + Send + Sync + 'static {
    fn resolves(&self, name: String) -> impl Future<Output = bool> + Send;
}

/// Certificate transparency lookup against crt.sh.
#[derive(Debug, Clone)]
pub struct CrtShSource {
    base_url: String,
}

impl Default for CrtShSource {
    fn default() -> Self {
        Self { base_url: CRT_SH_URL.to_string() }
    }
}

impl CrtShSource {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into().trim_end_matches('/').to_string() }
    }
}

impl PassiveSource for CrtShSource {
    fn name(&self) -> &'static str {
        CT_SOURCE
    }

    async fn fetch(&self, root: &str, timeout: Duration) -> ProbeResult<Vec<String>> {
        let url = format!("{}/?q=%25.{root}&output=json", self.base_url);
        debug!(url = %url, "Querying certificate transparency logs.");
        let response = http_client(timeout)?.get(&url).send().await?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(ProbeError::Malformed(format!("crt.sh answered {}", response.status())));
        }
        let body = response.text().await?;
        parse_ct_names(&body, root)
    }
}

#[derive(Deserialize)]
struct CtEntry {
    #[serde(default)]
    name_value: Option<String>,
}

/// Extracts the unique, sorted names under `root` from a crt.sh JSON body.
/// Wildcard prefixes are stripped.
pub fn parse_ct_names(body: &str, root: &str) -> ProbeResult<Vec<String>> {
    let entries: Vec<CtEntry> =
        serde_json::from_str(body).map_err(|e| ProbeError::Malformed(e.to_string()))?;

    let names: BTreeSet<String> = entries
        .iter()
        .filter_map(|entry| entry.name_value.as_deref())
        .flat_map(str::lines)
        .map(normalize_name)
        .filter(|name| belongs_to_domain(name, root))
        .collect();
    Ok(names.into_iter().collect())
}

/// Lowercases a name and drops the wildcard prefix and the root-label dot.
fn normalize_name(raw: &str) -> String {
    let name = raw.trim().trim_end_matches('.').to_ascii_lowercase();
    match name.strip_prefix("*.") {
        Some(stripped) => stripped.to_string(),
        None => name,
    }
}

/// True when `name` is `root` itself or a label under it. A shared suffix is
/// not enough: `evilexample.com` does not belong to `example.com`.
pub fn belongs_to_domain(name: &str, root: &str) -> bool {
    let name = name.to_ascii_lowercase();
    let root = root.to_ascii_lowercase();
    name == root || name.strip_suffix(&root).is_some_and(|head| head.ends_with('.') && head.len() > 1)
}

/// Resolves names with an A lookup through the system resolver configuration.
#[derive(Clone)]
pub struct DnsHostResolver {
    resolver: TokioAsyncResolver,
    timeout: Duration,
}

impl DnsHostResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { resolver: build_resolver(timeout), timeout }
    }
}

impl HostResolver for DnsHostResolver {
    async fn resolves(&self, name: String) -> bool {
        match tokio::time::timeout(self.timeout, self.resolver.ipv4_lookup(name.as_str())).await {
            Ok(Ok(lookup)) => lookup.iter().next().is_some(),
            Ok(Err(e)) => {
                debug!(name, error = %e, "Candidate did not resolve.");
                false
            }
            Err(_) => false,
        }
    }
}

pub struct SubdomainEnumerator<P, R> {
    passive: P,
    resolver: R,
    wordlist: &'static [&'static str],
    dns_concurrency: usize,
}

impl<P: PassiveSource, R: HostResolver> SubdomainEnumerator<P, R> {
    pub fn new(passive: P, resolver: R, dns_concurrency: usize) -> Self {
        Self { passive, resolver, wordlist: SUBDOMAIN_WORDLIST, dns_concurrency }
    }

    pub fn with_wordlist(mut self, wordlist: &'static [&'static str]) -> Self {
        self.wordlist = wordlist;
        self
    }

    /// Runs both sources concurrently. A failing passive source contributes
    /// nothing; it never aborts the enumeration.
    pub async fn enumerate(&self, root: &str, passive_timeout: Duration) -> SubdomainReport {
        let root = root.to_ascii_lowercase();
        info!(root = %root, wordlist = self.wordlist.len(), "Starting subdomain enumeration.");

        let (passive, active) = tokio::join!(
            self.passive_names(&root, passive_timeout),
            self.active_names(&root)
        );

        let mut source_counts = BTreeMap::new();
        source_counts.insert(self.passive.name().to_string(), passive.len());
        source_counts.insert(WORDLIST_SOURCE.to_string(), active.len());

        let discovered: BTreeSet<String> = passive.into_iter().chain(active).collect();
        info!(root = %root, discovered = discovered.len(), "Subdomain enumeration finished.");

        SubdomainReport {
            root_domain: root,
            discovered: discovered.into_iter().collect(),
            source_counts,
        }
    }

    async fn passive_names(&self, root: &str, timeout: Duration) -> Vec<String> {
        match self.passive.fetch(root, timeout).await {
            Ok(names) => {
                let names: BTreeSet<String> = names
                    .iter()
                    .map(|name| normalize_name(name))
                    .filter(|name| belongs_to_domain(name, root))
                    .collect();
                names.into_iter().collect()
            }
            Err(e) => {
                warn!(source = self.passive.name(), error = %e, "Passive source failed, continuing without it.");
                Vec::new()
            }
        }
    }

    async fn active_names(&self, root: &str) -> Vec<String> {
        let candidates = self.wordlist.iter().map(|label| format!("{label}.{root}"));
        let scheduler = BoundedScheduler::new(self.dns_concurrency);

        scheduler
            .run(candidates, |name| {
                let resolver = self.resolver.clone();
                async move { resolver.resolves(name.clone()).await.then_some(name) }
            })
            .await
            .into_iter()
            .filter_map(|outcome| outcome.ok().flatten())
            .collect()
    }
}

/// The enumerator as a probe. The probe's timeout bounds the passive lookup;
/// DNS candidates use the resolver's own timeout.
pub struct SubdomainProbe<P, R> {
    enumerator: SubdomainEnumerator<P, R>,
}

impl<P: PassiveSource, R: HostResolver> SubdomainProbe<P, R> {
    pub fn new(enumerator: SubdomainEnumerator<P, R>) -> Self {
        Self { enumerator }
    }
}

/// Where the orchestrator gets its subdomain sources from, once per scan.
pub trait SubdomainSources: Clone + Send + Sync + 'static {
    type Passive: PassiveSource + 'static;
    type Resolver: HostResolver;

    fn passive(&self) -> Self::Passive;

    fn resolver(&self, dns_timeout: Duration) -> Self::Resolver;

    fn build_probe(
        &self,
        dns_timeout: Duration,
        dns_concurrency: usize,
    ) -> SubdomainProbe<Self::Passive, Self::Resolver> {
        SubdomainProbe::new(SubdomainEnumerator::new(
            self.passive(),
            self.resolver(dns_timeout),
            dns_concurrency,
        ))
    }
}

/// crt.sh plus the DNS wordlist sweep.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveSources;

impl SubdomainSources for LiveSources {
    type Passive = CrtShSource;
    type Resolver = DnsHostResolver;

    fn passive(&self) -> CrtShSource {
        CrtShSource::default()
    }

    fn resolver(&self, dns_timeout: Duration) -> DnsHostResolver {
        DnsHostResolver::new(dns_timeout)
    }
}

impl<P: PassiveSource, R: HostResolver> Probe for SubdomainProbe<P, R> {
    type Output = SubdomainReport;

    fn kind(&self) -> CheckKind {
        CheckKind::Subdomains
    }

    async fn probe(&self, target: &Target, timeout: Duration) -> ProbeResult<SubdomainReport> {
        Ok(self.enumerator.enumerate(target.host(), timeout).await)
    }
}
