// src/core/profiles.rs

//! Static scan data: port profiles and the subdomain wordlist.
//! Everything here is immutable and compiled into the binary.

use serde::Serialize;

use crate::core::error::InputError;

/// The thirty most commonly exposed TCP services.
pub const TOP_30_PORTS: [u16; 30] = [
    21, 22, 23, 25, 53, 80, 110, 111, 135, 139, 143, 443, 445, 993, 995, 1521, 1723, 3306, 3389,
    5000, 5432, 5900, 6379, 8000, 8080, 8443, 9200, 11211, 25565, 27017,
];

/// `TOP_30_PORTS` extended with directory, database, remote-management and
/// middleware ports.
pub const TOP_100_PORTS: [u16; 100] = [
    19, 20, 21, 22, 23, 25, 26, 37, 49, 53, 79, 80, 81, 88, 106, 110, 111, 113, 119, 135, 139,
    143, 144, 161, 162, 179, 199, 389, 427, 443, 444, 445, 465, 513, 514, 515, 543, 544, 548, 554,
    587, 631, 636, 646, 873, 990, 993, 995, 1025, 1026, 1027, 1028, 1029, 1110, 1433, 1521, 1720,
    1723, 1755, 1900, 2000, 2001, 2049, 2082, 2083, 2086, 2087, 2121, 2483, 2484, 2717, 3000, 3268,
    3269, 3306, 3389, 4444, 5000, 5001, 5060, 5222, 5432, 5900, 5985, 5986, 6379, 6380, 8000, 8080,
    8081, 8443, 9000, 9090, 9200, 9300, 11211, 25565, 27017, 27018, 27019,
];

/// Labels tried by the active DNS sweep, in the order they are queried.
pub const SUBDOMAIN_WORDLIST: &[&str] = &[
    "www", "api", "dev", "staging", "test", "mail", "blog", "app", "cdn", "static", "admin",
    "portal", "vpn", "shop", "beta", "docs", "status", "m",
];

/// An ordered, de-duplicated, non-empty set of TCP ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PortCandidateSet(Vec<u16>);

impl PortCandidateSet {
    /// Sorts and de-duplicates `ports`. Port 0 and an empty input are rejected.
    pub fn new(ports: impl IntoIterator<Item = u16>) -> Result<Self, InputError> {
        let mut ports: Vec<u16> = ports.into_iter().collect();
        if ports.contains(&0) {
            return Err(InputError::InvalidPort("0".to_string()));
        }
        ports.sort_unstable();
        ports.dedup();
        if ports.is_empty() {
            return Err(InputError::MissingCustomPorts);
        }
        Ok(Self(ports))
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Resolves a named profile (`top30`, `top100`, `custom`) into a candidate set.
/// `custom` requires a non-empty explicit port list.
pub fn resolve_port_profile(
    profile: &str,
    custom: Option<&[u16]>,
) -> Result<PortCandidateSet, InputError> {
    match profile.trim().to_ascii_lowercase().as_str() {
        "top30" => PortCandidateSet::new(TOP_30_PORTS),
        "top100" => PortCandidateSet::new(TOP_100_PORTS),
        "custom" => match custom {
            Some(ports) if !ports.is_empty() => PortCandidateSet::new(ports.iter().copied()),
            _ => Err(InputError::MissingCustomPorts),
        },
        other => Err(InputError::UnknownPortProfile(other.to_string())),
    }
}

/// Parses a comma-separated port list such as `"22, 80,443"`. Blank entries are skipped.
pub fn parse_port_list(csv: &str) -> Result<Vec<u16>, InputError> {
    csv.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| match token.parse::<u16>() {
            Ok(port) if port > 0 => Ok(port),
            _ => Err(InputError::InvalidPort(token.to_string())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_profiles_are_sorted_and_unique() {
        let top30 = resolve_port_profile("top30", None).unwrap();
        assert_eq!(top30.len(), 30);
        assert_eq!(top30.as_slice(), &TOP_30_PORTS[..]);

        let top100 = resolve_port_profile("TOP100", None).unwrap();
        assert_eq!(top100.len(), 100);
        assert_eq!(top100.as_slice(), &TOP_100_PORTS[..]);
        assert!(TOP_30_PORTS.iter().all(|p| top100.as_slice().contains(p)));
    }

    #[test]
    fn candidate_set_sorts_and_dedups() {
        let set = PortCandidateSet::new([443, 22, 80, 22, 443]).unwrap();
        assert_eq!(set.as_slice(), &[22, 80, 443]);
    }

    #[test]
    fn custom_profile_requires_ports() {
        assert_eq!(resolve_port_profile("custom", None), Err(InputError::MissingCustomPorts));
        assert_eq!(resolve_port_profile("custom", Some(&[])), Err(InputError::MissingCustomPorts));
        let set = resolve_port_profile("custom", Some(&[8443, 22])).unwrap();
        assert_eq!(set.as_slice(), &[22, 8443]);
    }

    #[test]
    fn unknown_profile_is_rejected() {
        assert_eq!(
            resolve_port_profile("all", None),
            Err(InputError::UnknownPortProfile("all".to_string()))
        );
    }

    #[test]
    fn port_list_parsing() {
        assert_eq!(parse_port_list("22, 80,,443 ").unwrap(), vec![22, 80, 443]);
        assert_eq!(parse_port_list("22,http"), Err(InputError::InvalidPort("http".to_string())));
        assert_eq!(parse_port_list("70000"), Err(InputError::InvalidPort("70000".to_string())));
        assert_eq!(parse_port_list("0"), Err(InputError::InvalidPort("0".to_string())));
        assert!(parse_port_list(" , ").unwrap().is_empty());
    }

    #[test]
    fn wordlist_has_no_duplicates() {
        let mut labels = SUBDOMAIN_WORDLIST.to_vec();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), SUBDOMAIN_WORDLIST.len());
    }
}
