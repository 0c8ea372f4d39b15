// src/core/knowledge_base.rs

//! A static, read-only database of every finding code the checks can emit,
//! with a human-readable explanation and remediation for each.

use crate::core::models::Severity;
use std::fmt;

/// High-level grouping used when findings are printed or rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FindingCategory {
    /// SPF, DMARC, CAA, DNSSEC and zone transfers.
    Dns,
    Ssl,
    Http,
    /// Browser-facing behaviour of the site: CORS, cookies, mixed content.
    Web,
    Subdomains,
}

impl fmt::Display for FindingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FindingCategory::Dns => write!(f, "DNS Configuration"),
            FindingCategory::Ssl => write!(f, "SSL/TLS Certificate"),
            FindingCategory::Http => write!(f, "HTTP Security Headers"),
            FindingCategory::Web => write!(f, "Web Application"),
            FindingCategory::Subdomains => write!(f, "Subdomains"),
        }
    }
}

/// Everything needed to present one finding to a user.
#[derive(Debug)]
pub struct FindingDetail {
    /// Machine-readable identifier, e.g. `DNS_DMARC_MISSING`.
    pub code: &'static str,
    pub title: &'static str,
    pub category: FindingCategory,
    /// Nominal severity. A check may raise it for a specific result.
    pub severity: Severity,
    pub description: &'static str,
    pub remediation: &'static str,
}

static FINDINGS: &[FindingDetail] = &[
    // --- DNS: Email Security & Domain Integrity ---
    FindingDetail {
        code: "DNS_DMARC_MISSING",
        title: "DMARC Record Missing",
        category: FindingCategory::Dns,
        severity: Severity::Critical,
        description: "DMARC is an email authentication policy that protects your domain from being used for email spoofing and phishing. It tells receiving mail servers how to handle emails that fail authentication checks.",
        remediation: "Add a TXT record at _dmarc.<your domain>. Start with a monitoring policy like 'v=DMARC1; p=none;' and move to 'p=quarantine' or 'p=reject' after analyzing reports.",
    },
    FindingDetail {
        code: "DNS_DMARC_POLICY_NONE",
        title: "DMARC Policy is 'none'",
        category: FindingCategory::Dns,
        severity: Severity::Warning,
        description: "Your DMARC policy is in monitoring-only mode. It reports fraudulent emails but does not instruct receivers to block or quarantine them.",
        remediation: "Once legitimate mail passes SPF/DKIM, update the policy to 'p=quarantine' or 'p=reject'.",
    },
    FindingDetail {
        code: "DNS_SPF_MISSING",
        title: "SPF Record Missing",
        category: FindingCategory::Dns,
        severity: Severity::Warning,
        description: "Sender Policy Framework (SPF) lists the servers authorized to send email for your domain. Without it, attackers can more easily spoof emails from your domain.",
        remediation: "Publish a TXT record such as 'v=spf1 include:_spf.google.com -all' listing your authorized mail servers.",
    },
    FindingDetail {
        code: "DNS_SPF_POLICY_WEAK",
        title: "SPF Policy is Permissive",
        category: FindingCategory::Dns,
        severity: Severity::Warning,
        description: "Your SPF record ends with '+all' or '?all', which lets any server send mail for your domain or gives receivers no guidance at all.",
        remediation: "End the SPF record with '-all' (fail) or at least '~all' (softfail).",
    },
    FindingDetail {
        code: "DNS_SPF_POLICY_SOFTFAIL",
        title: "SPF Policy is 'Softfail'",
        category: FindingCategory::Dns,
        severity: Severity::Info,
        description: "Your SPF record uses '~all', so receivers accept but mark suspicious mail. '-all' instructs them to reject it.",
        remediation: "If your SPF record lists every legitimate mail source, change '~all' to '-all'.",
    },
    FindingDetail {
        code: "DNS_CAA_MISSING",
        title: "CAA Record Missing",
        category: FindingCategory::Dns,
        severity: Severity::Info,
        description: "A Certificate Authority Authorization (CAA) record specifies which CAs may issue certificates for your domain, guarding against mis-issuance.",
        remediation: "Add a CAA record naming your certificate provider, e.g. '0 issue \"letsencrypt.org\"'.",
    },
    FindingDetail {
        code: "DNS_DNSSEC_MISSING",
        title: "DNSSEC Not Enabled",
        category: FindingCategory::Dns,
        severity: Severity::Info,
        description: "No DNSKEY records were found. Without DNSSEC, resolvers cannot verify that answers for your zone are authentic.",
        remediation: "Enable DNSSEC signing at your DNS provider and publish the DS record at your registrar.",
    },
    FindingDetail {
        code: "DNS_AXFR_ALLOWED",
        title: "Zone Transfer Allowed",
        category: FindingCategory::Dns,
        severity: Severity::Critical,
        description: "At least one authoritative name server answered a zone transfer (AXFR) request from an arbitrary client, exposing every record in the zone.",
        remediation: "Restrict AXFR on your name servers to the IP addresses of your secondary servers, or use TSIG-authenticated transfers.",
    },
    // --- SSL/TLS ---
    FindingDetail {
        code: "SSL_EXPIRED",
        title: "SSL Certificate Expired",
        category: FindingCategory::Ssl,
        severity: Severity::Critical,
        description: "The certificate is expired or not yet valid. Browsers will show prominent security warnings and block access.",
        remediation: "Renew the certificate immediately and automate renewals (e.g. Let's Encrypt with Certbot).",
    },
    FindingDetail {
        code: "SSL_EXPIRING_SOON",
        title: "SSL Certificate Expiring Soon",
        category: FindingCategory::Ssl,
        severity: Severity::Warning,
        description: "The certificate expires within 30 days.",
        remediation: "Renew the certificate before it expires. If renewals are automated, verify the job is running.",
    },
    FindingDetail {
        code: "SSL_HOSTNAME_MISMATCH",
        title: "Certificate Does Not Cover Hostname",
        category: FindingCategory::Ssl,
        severity: Severity::Warning,
        description: "Neither the common name nor any subject alternative name of the certificate matches the scanned host.",
        remediation: "Issue a certificate that lists this hostname, or a matching wildcard, in its subject alternative names.",
    },
    // --- HTTP Headers ---
    FindingDetail {
        code: "HEADERS_CSP_MISSING",
        title: "CSP Header Missing",
        category: FindingCategory::Http,
        severity: Severity::Warning,
        description: "Content-Security-Policy restricts which resources a browser may load, mitigating cross-site scripting and data injection.",
        remediation: "Add a Content-Security-Policy header starting from a restrictive base such as \"default-src 'self'\".",
    },
    FindingDetail {
        code: "HEADERS_CSP_WEAK",
        title: "CSP Allows Wildcards or Inline Script",
        category: FindingCategory::Http,
        severity: Severity::Info,
        description: "The Content-Security-Policy contains '*' or 'unsafe-inline', which defeats much of its protection.",
        remediation: "Replace wildcards with explicit sources and move inline scripts to files or use nonces.",
    },
    FindingDetail {
        code: "HEADERS_HSTS_MISSING",
        title: "HSTS Header Missing",
        category: FindingCategory::Http,
        severity: Severity::Warning,
        description: "Strict-Transport-Security tells browsers to only use HTTPS for your site, protecting against downgrade attacks and cookie hijacking.",
        remediation: "Send 'Strict-Transport-Security: max-age=31536000; includeSubDomains; preload'.",
    },
    FindingDetail {
        code: "HEADERS_HSTS_WEAK",
        title: "HSTS Without Subdomains or Preload",
        category: FindingCategory::Http,
        severity: Severity::Info,
        description: "The HSTS header does not include 'includeSubDomains' or 'preload', leaving subdomains or first visits unprotected.",
        remediation: "Add 'includeSubDomains; preload' once every subdomain serves HTTPS.",
    },
    FindingDetail {
        code: "HEADERS_X_FRAME_OPTIONS_MISSING",
        title: "X-Frame-Options Missing",
        category: FindingCategory::Http,
        severity: Severity::Warning,
        description: "This header protects visitors against clickjacking, where your site is loaded in an invisible frame to trick users into clicking.",
        remediation: "Set 'X-Frame-Options' to 'DENY' or 'SAMEORIGIN'.",
    },
    FindingDetail {
        code: "HEADERS_X_CONTENT_TYPE_OPTIONS_MISSING",
        title: "X-Content-Type-Options Missing",
        category: FindingCategory::Http,
        severity: Severity::Info,
        description: "Without this header browsers may guess content types (MIME sniffing), which can turn an uploaded file into executable script.",
        remediation: "Set 'X-Content-Type-Options: nosniff'.",
    },
    FindingDetail {
        code: "HEADERS_REFERRER_POLICY_MISSING",
        title: "Referrer-Policy Missing",
        category: FindingCategory::Http,
        severity: Severity::Info,
        description: "Without a Referrer-Policy, full URLs including paths and query strings may leak to third-party sites.",
        remediation: "Set 'Referrer-Policy: strict-origin-when-cross-origin' or 'no-referrer'.",
    },
    FindingDetail {
        code: "HEADERS_PERMISSIONS_POLICY_MISSING",
        title: "Permissions-Policy Missing",
        category: FindingCategory::Http,
        severity: Severity::Info,
        description: "Permissions-Policy controls access to powerful browser features such as the camera, microphone and geolocation.",
        remediation: "Send a Permissions-Policy that disables features the site does not use, e.g. 'camera=(), microphone=()'.",
    },
    // --- Web ---
    FindingDetail {
        code: "CORS_WILDCARD_CREDENTIALS",
        title: "CORS Wildcard With Credentials",
        category: FindingCategory::Web,
        severity: Severity::Critical,
        description: "The server allows any origin and also allows credentials, so any website may read authenticated responses.",
        remediation: "Never combine 'Access-Control-Allow-Origin: *' with credentials. Return an explicit allow-list of origins instead.",
    },
    FindingDetail {
        code: "CORS_WILDCARD",
        title: "CORS Allows Any Origin",
        category: FindingCategory::Web,
        severity: Severity::Info,
        description: "Any website may read unauthenticated responses from this server. This is fine for public APIs and assets.",
        remediation: "If the content is not meant to be public, restrict 'Access-Control-Allow-Origin' to known origins.",
    },
    FindingDetail {
        code: "CORS_ORIGIN_REFLECTED",
        title: "CORS Reflects Arbitrary Origin",
        category: FindingCategory::Web,
        severity: Severity::Warning,
        description: "The server echoed a foreign Origin back in 'Access-Control-Allow-Origin'. Combined with credentials, any site can read authenticated data.",
        remediation: "Validate the Origin header against an explicit allow-list before reflecting it.",
    },
    FindingDetail {
        code: "COOKIE_MISSING_SECURE",
        title: "Cookie Without Secure Flag",
        category: FindingCategory::Web,
        severity: Severity::Warning,
        description: "At least one cookie may be sent over plain HTTP, where it can be intercepted.",
        remediation: "Set the 'Secure' attribute on every cookie.",
    },
    FindingDetail {
        code: "COOKIE_MISSING_HTTPONLY",
        title: "Cookie Without HttpOnly Flag",
        category: FindingCategory::Web,
        severity: Severity::Warning,
        description: "At least one cookie is readable from JavaScript, so a cross-site scripting bug can steal it.",
        remediation: "Set the 'HttpOnly' attribute on session and authentication cookies.",
    },
    FindingDetail {
        code: "COOKIE_MISSING_SAMESITE",
        title: "Cookie Without SameSite",
        category: FindingCategory::Web,
        severity: Severity::Info,
        description: "At least one cookie does not declare a SameSite policy, leaving its cross-site behaviour to browser defaults.",
        remediation: "Set 'SameSite=Lax' or 'SameSite=Strict' on cookies.",
    },
    FindingDetail {
        code: "MIXED_CONTENT",
        title: "Insecure Resource References",
        category: FindingCategory::Web,
        severity: Severity::Warning,
        description: "The page references resources over plain http://. Browsers block or warn about these on HTTPS pages, and they can be tampered with in transit.",
        remediation: "Serve every referenced resource over HTTPS and update the links.",
    },
    // --- Subdomains ---
    FindingDetail {
        code: "TAKEOVER_SIGNATURE",
        title: "Possible Subdomain Takeover",
        category: FindingCategory::Subdomains,
        severity: Severity::Critical,
        description: "A subdomain serves the error page of a hosting provider for an unclaimed resource. Anyone who claims it can serve content under your domain.",
        remediation: "Remove the dangling DNS record or claim the resource at the provider.",
    },
];

/// Looks up the detail for a finding code.
pub fn get_finding_detail(code: &str) -> Option<&'static FindingDetail> {
    FINDINGS.iter().find(|f| f.code == code)
}
