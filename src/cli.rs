// src/cli.rs

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{ArgAction, Args, Parser, Subcommand};
use color_eyre::eyre::Result;
use tracing::info;

use crate::api;
use crate::core::config::{CheckToggles, ScanRequest};
use crate::core::error::InputError;
use crate::core::models::{CheckKind, Slot};
use crate::core::orchestrator::Orchestrator;
use crate::core::profiles::parse_port_list;
use crate::report;

/// Unauthenticated, read-only reconnaissance of a domain.
#[derive(Parser, Debug)]
#[command(name = "sscan")]
#[command(author, version, about = "Domain reconnaissance: subdomains, ports and security checks", long_about = None)]
pub struct Cli {
    /// Upper bound of the runtime's blocking thread pool
    #[arg(long, global = true, default_value_t = 8, value_parser = clap::value_parser!(u16).range(1..))]
    pub blocking_threads: u16,

    /// Console log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a full domain scan
    Domain(DomainArgs),
    /// Scan TCP ports only
    Ports(PortsArgs),
    /// Grade the HTTP security headers of a URL
    Headers(CheckArgs),
    /// Inspect the TLS certificate of a host
    Tls(CheckArgs),
    /// Check the CORS policy of a URL
    Cors(CheckArgs),
    /// Inspect the flags of the cookies a URL sets
    Cookies(CheckArgs),
    /// Detect the server, frameworks and WAF/CDN behind a URL
    Fingerprint(CheckArgs),
    /// Check whether any authoritative nameserver allows a zone transfer
    Axfr(CheckArgs),
    /// Serve the HTTP API
    Serve(ServeArgs),
}

/// Options shared by every command that runs a scan.
#[derive(Args, Debug, Clone)]
pub struct ScanOptions {
    /// Port profile
    #[arg(long = "ports", default_value = "top30", value_parser = ["top30", "top100", "custom"])]
    pub port_profile: String,

    /// Comma-separated ports for the custom profile
    #[arg(long, value_name = "CSV")]
    pub custom_ports: Option<String>,

    /// Maximum concurrent port probes
    #[arg(long, default_value_t = 200)]
    pub concurrency: usize,

    /// Maximum concurrent DNS lookups
    #[arg(long, default_value_t = 50)]
    pub dns_concurrency: usize,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 6.0)]
    pub timeout: f64,

    /// DNS timeout in seconds
    #[arg(long, default_value_t = 2.0)]
    pub dns_timeout: f64,

    /// Per-port connect timeout in seconds
    #[arg(long, default_value_t = 1.0)]
    pub port_timeout: f64,

    /// Always use the portable connect backend
    #[arg(long)]
    pub no_native: bool,
}

impl ScanOptions {
    pub fn to_request(&self, domain: &str, checks: CheckToggles) -> Result<ScanRequest, InputError> {
        let custom_ports = self.custom_ports.as_deref().map(parse_port_list).transpose()?;
        Ok(ScanRequest {
            port_profile: self.port_profile.clone(),
            custom_ports,
            checks,
            concurrency: self.concurrency,
            dns_concurrency: self.dns_concurrency,
            timeout: self.timeout,
            dns_timeout: self.dns_timeout,
            port_timeout: self.port_timeout,
            ..ScanRequest::new(domain)
        })
    }
}

/// One switch per check; every check runs unless switched off.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct CheckFlags {
    #[arg(long)]
    pub no_subdomains: bool,
    #[arg(long)]
    pub no_ports: bool,
    #[arg(long)]
    pub no_headers: bool,
    #[arg(long)]
    pub no_tls: bool,
    #[arg(long)]
    pub no_dns: bool,
    #[arg(long)]
    pub no_preview: bool,
    #[arg(long)]
    pub no_takeover: bool,
    #[arg(long)]
    pub no_cors: bool,
    #[arg(long)]
    pub no_cookies: bool,
    #[arg(long)]
    pub no_fingerprint: bool,
    #[arg(long)]
    pub no_security_txt: bool,
    #[arg(long)]
    pub no_mixed_content: bool,
    #[arg(long)]
    pub no_dns_extras: bool,
    #[arg(long)]
    pub no_axfr: bool,
}

impl CheckFlags {
    pub fn toggles(&self) -> CheckToggles {
        CheckToggles {
            subdomains: !self.no_subdomains,
            ports: !self.no_ports,
            tls: !self.no_tls,
            headers: !self.no_headers,
            dns: !self.no_dns,
            preview: !self.no_preview,
            takeover: !self.no_takeover,
            cors: !self.no_cors,
            cookies: !self.no_cookies,
            fingerprint: !self.no_fingerprint,
            security_txt: !self.no_security_txt,
            mixed_content: !self.no_mixed_content,
            dns_extras: !self.no_dns_extras,
            axfr: !self.no_axfr,
        }
    }
}

#[derive(Args, Debug)]
pub struct DomainArgs {
    /// Domain or URL to scan
    pub target: String,

    #[command(flatten)]
    pub options: ScanOptions,

    #[command(flatten)]
    pub checks: CheckFlags,

    /// Write the report as JSON
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// Write the report as HTML
    #[arg(long, value_name = "PATH")]
    pub html: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct PortsArgs {
    /// Host to scan
    pub host: String,

    #[command(flatten)]
    pub options: ScanOptions,

    /// Write the report as JSON
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,
}

/// Arguments of the single-check commands.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Domain or URL to check
    pub target: String,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 6.0)]
    pub timeout: f64,

    /// DNS timeout in seconds
    #[arg(long, default_value_t = 2.0)]
    pub dns_timeout: f64,

    /// Write the check result as JSON
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,
}

impl CheckArgs {
    pub fn to_request(&self, kind: CheckKind) -> ScanRequest {
        ScanRequest {
            checks: CheckToggles::only(&[kind]),
            timeout: self.timeout,
            dns_timeout: self.dns_timeout,
            ..ScanRequest::new(self.target.as_str())
        }
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    /// Always use the portable connect backend
    #[arg(long)]
    pub no_native: bool,
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Domain(args) => run_domain(args).await,
        Command::Ports(args) => run_ports(args).await,
        Command::Serve(args) => {
            let orchestrator = Arc::new(Orchestrator::new(!args.no_native));
            api::serve(args.bind, orchestrator).await
        }
        Command::Headers(args) => run_check(CheckKind::Headers, &args).await,
        Command::Tls(args) => run_check(CheckKind::Tls, &args).await,
        Command::Cors(args) => run_check(CheckKind::Cors, &args).await,
        Command::Cookies(args) => run_check(CheckKind::Cookies, &args).await,
        Command::Fingerprint(args) => run_check(CheckKind::Fingerprint, &args).await,
        Command::Axfr(args) => run_check(CheckKind::Axfr, &args).await,
    }
}

async fn run_check(kind: CheckKind, args: &CheckArgs) -> Result<()> {
    info!(check = %kind, target = %args.target, "Single check requested.");
    let report = Orchestrator::new(false).scan_request(args.to_request(kind)).await?;

    println!("{}: {kind} {}", report.target.host(), report.slot_status(kind));
    println!("{}", report::slot_to_json(&report, kind)?);
    if let Some(path) = &args.json {
        report::write_slot_json(&report, kind, path)?;
    }
    Ok(())
}

async fn run_domain(args: DomainArgs) -> Result<()> {
    let request = args.options.to_request(&args.target, args.checks.toggles())?;
    let orchestrator = Orchestrator::new(!args.options.no_native);
    let report = orchestrator.scan_request(request).await?;

    print!("{}", report::render_console(&report));
    if let Some(path) = &args.json {
        report::write_json(&report, path)?;
    }
    if let Some(path) = &args.html {
        report::write_html(&report, path)?;
    }
    Ok(())
}

async fn run_ports(args: PortsArgs) -> Result<()> {
    let request = args.options.to_request(&args.host, CheckToggles::only(&[CheckKind::Ports]))?;
    let orchestrator = Orchestrator::new(!args.options.no_native);
    info!(host = %args.host, backend = orchestrator.backend().name(), "Port scan requested.");
    let report = orchestrator.scan_request(request).await?;

    match &report.ports {
        Slot::Completed { result } => {
            println!(
                "{}: {} of {} ports open ({} backend)",
                result.host,
                result.open_ports.len(),
                result.ports_scanned.len(),
                result.backend
            );
            for port in &result.open_ports {
                println!("  {port}/tcp open");
            }
        }
        other => println!("{}: port scan {}", report.target.host(), other.status()),
    }
    if let Some(path) = &args.json {
        report::write_json(&report, path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn single_check(command: Command) -> Option<(CheckKind, CheckArgs)> {
        match command {
            Command::Headers(args) => Some((CheckKind::Headers, args)),
            Command::Tls(args) => Some((CheckKind::Tls, args)),
            Command::Cors(args) => Some((CheckKind::Cors, args)),
            Command::Cookies(args) => Some((CheckKind::Cookies, args)),
            Command::Fingerprint(args) => Some((CheckKind::Fingerprint, args)),
            Command::Axfr(args) => Some((CheckKind::Axfr, args)),
            Command::Domain(_) | Command::Ports(_) | Command::Serve(_) => None,
        }
    }

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn domain_defaults_enable_every_check() {
        let cli = Cli::try_parse_from(["sscan", "domain", "example.com"]).unwrap();
        assert_eq!(cli.blocking_threads, 8);
        let Command::Domain(args) = cli.command else { panic!("expected domain") };
        let request = args.options.to_request(&args.target, args.checks.toggles()).unwrap();
        assert_eq!(request.port_profile, "top30");
        assert_eq!(request.concurrency, 200);
        assert_eq!(request.dns_concurrency, 50);
        assert_eq!(request.timeout, 6.0);
        assert_eq!(request.checks, CheckToggles::all(true));
    }

    #[test]
    fn no_flags_switch_checks_off() {
        let cli = Cli::try_parse_from([
            "sscan", "-vv", "domain", "example.com", "--no-subdomains", "--no-security-txt", "--no-axfr",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Domain(args) = cli.command else { panic!("expected domain") };
        let toggles = args.checks.toggles();
        assert!(!toggles.subdomains && !toggles.security_txt && !toggles.axfr);
        assert!(toggles.ports && toggles.takeover && toggles.mixed_content);
    }

    #[test]
    fn custom_ports_are_parsed() {
        let cli = Cli::try_parse_from([
            "sscan", "ports", "localhost", "--ports", "custom", "--custom-ports", "8080,22,8080",
        ])
        .unwrap();
        let Command::Ports(args) = cli.command else { panic!("expected ports") };
        let request = args.options.to_request(&args.host, CheckToggles::only(&[CheckKind::Ports])).unwrap();
        let plan = request.into_plan().unwrap();
        assert_eq!(plan.ports.as_slice(), &[22, 8080]);
        assert!(!plan.checks.subdomains);
    }

    #[test]
    fn single_check_commands_select_one_check() {
        let cases = [
            ("headers", CheckKind::Headers),
            ("tls", CheckKind::Tls),
            ("cors", CheckKind::Cors),
            ("cookies", CheckKind::Cookies),
            ("fingerprint", CheckKind::Fingerprint),
            ("axfr", CheckKind::Axfr),
        ];
        for (command, expected) in cases {
            let cli = Cli::try_parse_from(["sscan", command, "https://example.com/login", "--json", "out/check.json"])
                .unwrap();
            let (kind, args) = single_check(cli.command).expect("single-check command");
            assert_eq!(kind, expected);
            assert_eq!(args.json.as_deref(), Some(std::path::Path::new("out/check.json")));

            let plan = args.to_request(kind).into_plan().unwrap();
            assert_eq!(plan.target.host(), "example.com");
            assert_eq!(plan.checks, CheckToggles::only(&[expected]));
        }
    }

    #[test]
    fn single_check_timeouts_are_forwarded() {
        let cli = Cli::try_parse_from(["sscan", "axfr", "example.com", "--dns-timeout", "0.5", "--timeout", "3"]).unwrap();
        let (kind, args) = single_check(cli.command).unwrap();
        let request = args.to_request(kind);
        assert_eq!(request.dns_timeout, 0.5);
        assert_eq!(request.timeout, 3.0);
        assert!(args.json.is_none());
        assert!(single_check(Cli::try_parse_from(["sscan", "domain", "example.com"]).unwrap().command).is_none());
    }

    #[test]
    fn unknown_profile_is_rejected_by_the_parser() {
        assert!(Cli::try_parse_from(["sscan", "domain", "example.com", "--ports", "all"]).is_err());
        assert!(Cli::try_parse_from(["sscan", "serve", "--bind", "not-an-address"]).is_err());
    }
}
