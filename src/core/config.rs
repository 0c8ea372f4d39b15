// src/core/config.rs

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::InputError;
use crate::core::models::CheckKind;
use crate::core::profiles::{PortCandidateSet, resolve_port_profile};
use crate::core::target::Target;

/// One boolean per check. Every check is on unless switched off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckToggles {
    pub subdomains: bool,
    pub ports: bool,
    pub tls: bool,
    pub headers: bool,
    pub dns: bool,
    pub preview: bool,
    pub takeover: bool,
    pub cors: bool,
    pub cookies: bool,
    pub fingerprint: bool,
    pub security_txt: bool,
    pub mixed_content: bool,
    pub dns_extras: bool,
    pub axfr: bool,
}

impl Default for CheckToggles {
    fn default() -> Self {
        Self::all(true)
    }
}

impl CheckToggles {
    pub fn all(enabled: bool) -> Self {
        Self {
            subdomains: enabled,
            ports: enabled,
            tls: enabled,
            headers: enabled,
            dns: enabled,
            preview: enabled,
            takeover: enabled,
            cors: enabled,
            cookies: enabled,
            fingerprint: enabled,
            security_txt: enabled,
            mixed_content: enabled,
            dns_extras: enabled,
            axfr: enabled,
        }
    }

    /// Only the listed checks enabled.
    pub fn only(kinds: &[CheckKind]) -> Self {
        let mut toggles = Self::all(false);
        for kind in kinds {
            *toggles.get_mut(*kind) = true;
        }
        toggles
    }

    pub fn is_enabled(&self, kind: CheckKind) -> bool {
        match kind {
            CheckKind::Subdomains => self.subdomains,
            CheckKind::Ports => self.ports,
            CheckKind::Tls => self.tls,
            CheckKind::Headers => self.headers,
            CheckKind::Dns => self.dns,
            CheckKind::Preview => self.preview,
            CheckKind::Takeover => self.takeover,
            CheckKind::Cors => self.cors,
            CheckKind::Cookies => self.cookies,
            CheckKind::Fingerprint => self.fingerprint,
            CheckKind::SecurityTxt => self.security_txt,
            CheckKind::MixedContent => self.mixed_content,
            CheckKind::DnsExtras => self.dns_extras,
            CheckKind::Axfr => self.axfr,
        }
    }

    fn get_mut(&mut self, kind: CheckKind) -> &mut bool {
        match kind {
            CheckKind::Subdomains => &mut self.subdomains,
            CheckKind::Ports => &mut self.ports,
            CheckKind::Tls => &mut self.tls,
            CheckKind::Headers => &mut self.headers,
            CheckKind::Dns => &mut self.dns,
            CheckKind::Preview => &mut self.preview,
            CheckKind::Takeover => &mut self.takeover,
            CheckKind::Cors => &mut self.cors,
            CheckKind::Cookies => &mut self.cookies,
            CheckKind::Fingerprint => &mut self.fingerprint,
            CheckKind::SecurityTxt => &mut self.security_txt,
            CheckKind::MixedContent => &mut self.mixed_content,
            CheckKind::DnsExtras => &mut self.dns_extras,
            CheckKind::Axfr => &mut self.axfr,
        }
    }
}

/// The scan configuration as it arrives from the CLI or the HTTP API.
///
/// Only `domain` is required; timeouts are in seconds. Unknown fields are
/// rejected. The flat switches (`scan_ports`, `analyze_tls`, ...) are the
/// older payload shape and take precedence over `checks` when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanRequest {
    #[serde(alias = "target")]
    pub domain: String,
    #[serde(default = "default_port_profile")]
    pub port_profile: String,
    #[serde(default)]
    pub custom_ports: Option<Vec<u16>>,
    #[serde(default)]
    pub checks: CheckToggles,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_dns_concurrency")]
    pub dns_concurrency: usize,
    #[serde(default = "default_http_timeout")]
    pub timeout: f64,
    #[serde(default = "default_dns_timeout")]
    pub dns_timeout: f64,
    #[serde(default = "default_port_timeout")]
    pub port_timeout: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_subdomains: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_ports: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyze_headers: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyze_tls: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyze_dns: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_preview: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyze_cors: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyze_cookies: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint_web: Option<bool>,
}

fn default_port_profile() -> String {
    "top30".to_string()
}

fn default_concurrency() -> usize {
    200
}

fn default_dns_concurrency() -> usize {
    50
}

fn default_http_timeout() -> f64 {
    6.0
}

fn default_dns_timeout() -> f64 {
    2.0
}

fn default_port_timeout() -> f64 {
    1.0
}

impl ScanRequest {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            port_profile: default_port_profile(),
            custom_ports: None,
            checks: CheckToggles::default(),
            concurrency: default_concurrency(),
            dns_concurrency: default_dns_concurrency(),
            timeout: default_http_timeout(),
            dns_timeout: default_dns_timeout(),
            port_timeout: default_port_timeout(),
            scan_subdomains: None,
            scan_ports: None,
            analyze_headers: None,
            analyze_tls: None,
            analyze_dns: None,
            web_preview: None,
            analyze_cors: None,
            analyze_cookies: None,
            fingerprint_web: None,
        }
    }

    /// The toggles after applying any flat switch on top of `checks`.
    pub fn effective_checks(&self) -> CheckToggles {
        let mut checks = self.checks;
        let overrides = [
            (CheckKind::Subdomains, self.scan_subdomains),
            (CheckKind::Ports, self.scan_ports),
            (CheckKind::Headers, self.analyze_headers),
            (CheckKind::Tls, self.analyze_tls),
            (CheckKind::Dns, self.analyze_dns),
            (CheckKind::Preview, self.web_preview),
            (CheckKind::Cors, self.analyze_cors),
            (CheckKind::Cookies, self.analyze_cookies),
            (CheckKind::Fingerprint, self.fingerprint_web),
        ];
        for (kind, enabled) in overrides {
            if let Some(enabled) = enabled {
                *checks.get_mut(kind) = enabled;
            }
        }
        checks
    }

    /// Validates the request and resolves it into an executable plan.
    pub fn into_plan(self) -> Result<ScanPlan, InputError> {
        let checks = self.effective_checks();
        let target = Target::parse(&self.domain)?;
        let ports = resolve_port_profile(&self.port_profile, self.custom_ports.as_deref())?;
        let settings = ScanSettings {
            concurrency: positive_count(self.concurrency, "concurrency")?,
            dns_concurrency: positive_count(self.dns_concurrency, "dns concurrency")?,
            http_timeout: seconds(self.timeout, "timeout")?,
            dns_timeout: seconds(self.dns_timeout, "dns timeout")?,
            port_timeout: seconds(self.port_timeout, "port timeout")?,
        };
        Ok(ScanPlan { target, ports, checks, settings })
    }
}

/// Validated numeric settings of a scan. Each probe gets its own timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSettings {
    pub concurrency: usize,
    pub dns_concurrency: usize,
    pub http_timeout: Duration,
    pub dns_timeout: Duration,
    pub port_timeout: Duration,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            dns_concurrency: default_dns_concurrency(),
            http_timeout: Duration::from_secs_f64(default_http_timeout()),
            dns_timeout: Duration::from_secs_f64(default_dns_timeout()),
            port_timeout: Duration::from_secs_f64(default_port_timeout()),
        }
    }
}

/// A normalized, validated scan ready for the orchestrator.
#[derive(Debug, Clone)]
pub struct ScanPlan {
    pub target: Target,
    pub ports: PortCandidateSet,
    pub checks: CheckToggles,
    pub settings: ScanSettings,
}

fn positive_count(value: usize, name: &'static str) -> Result<usize, InputError> {
    if value == 0 {
        return Err(InputError::ZeroConcurrency(name));
    }
    Ok(value)
}

fn seconds(value: f64, name: &'static str) -> Result<Duration, InputError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(InputError::InvalidTimeout(name));
    }
    Ok(Duration::from_secs_f64(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_fill_every_option() {
        let request: ScanRequest = serde_json::from_str(r#"{"domain": "example.com"}"#).unwrap();
        let plan = request.into_plan().unwrap();
        assert_eq!(plan.target.host(), "example.com");
        assert_eq!(plan.ports.len(), 30);
        assert_eq!(plan.checks, CheckToggles::all(true));
        assert_eq!(plan.settings, ScanSettings::default());
    }

    #[test]
    fn partial_toggles_keep_other_checks_on() {
        let request: ScanRequest = serde_json::from_str(
            r#"{"target": "example.com", "checks": {"subdomains": false, "axfr": false}}"#,
        )
        .unwrap();
        assert!(!request.checks.subdomains);
        assert!(!request.checks.axfr);
        assert!(request.checks.ports && request.checks.tls);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let top_level = serde_json::from_str::<ScanRequest>(r#"{"domain": "example.com", "scan_portz": false}"#);
        assert!(top_level.unwrap_err().to_string().contains("unknown field `scan_portz`"));

        let nested =
            serde_json::from_str::<ScanRequest>(r#"{"domain": "example.com", "checks": {"portz": false}}"#);
        assert!(nested.unwrap_err().to_string().contains("unknown field `portz`"));
    }

    #[test]
    fn flat_switches_override_nested_toggles() {
        let request: ScanRequest = serde_json::from_str(
            r#"{"domain": "example.com", "scan_ports": false, "scan_subdomains": false,
                "fingerprint_web": true, "checks": {"ports": true, "fingerprint": false}}"#,
        )
        .unwrap();
        let plan = request.into_plan().unwrap();
        assert!(!plan.checks.ports);
        assert!(!plan.checks.subdomains);
        assert!(plan.checks.fingerprint);
        assert!(plan.checks.takeover && plan.checks.axfr);
    }

    #[test]
    fn invalid_numbers_are_input_errors() {
        let mut request = ScanRequest::new("example.com");
        request.concurrency = 0;
        assert_eq!(request.into_plan().unwrap_err(), InputError::ZeroConcurrency("concurrency"));

        let mut request = ScanRequest::new("example.com");
        request.dns_timeout = f64::NAN;
        assert_eq!(request.into_plan().unwrap_err(), InputError::InvalidTimeout("dns timeout"));
    }

    #[test]
    fn custom_profile_without_ports_is_rejected() {
        let mut request = ScanRequest::new("example.com");
        request.port_profile = "custom".to_string();
        assert_eq!(request.into_plan().unwrap_err(), InputError::MissingCustomPorts);
    }

    #[test]
    fn only_enables_the_listed_checks() {
        let toggles = CheckToggles::only(&[CheckKind::Ports, CheckKind::Dns]);
        assert!(toggles.is_enabled(CheckKind::Ports));
        assert!(toggles.is_enabled(CheckKind::Dns));
        assert!(!toggles.is_enabled(CheckKind::Subdomains));
        assert!(!toggles.is_enabled(CheckKind::Takeover));
    }
}
