// src/core/scanner/axfr_scanner.rs

//! Zone transfer exposure: every authoritative name server of the target is
//! asked for a full AXFR over TCP.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use futures::future::join_all;
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_resolver::proto::rr::{Name, RecordType};
use hickory_resolver::proto::serialize::binary::{BinDecodable, BinEncodable};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::core::error::{ProbeError, ProbeResult};
use crate::core::models::{AnalysisFinding, AxfrCheck, CheckKind, Severity};
use crate::core::scanner::Probe;
use crate::core::scanner::dns_scanner::{build_resolver, lookup_records};
use crate::core::target::Target;

const DNS_PORT: u16 = 53;
const AXFR_QUERY_ID: u16 = 0x5a17;

#[derive(Debug, Default)]
pub struct AxfrProbe;

impl Probe for AxfrProbe {
    type Output = AxfrCheck;

    fn kind(&self) -> CheckKind {
        CheckKind::Axfr
    }

    async fn probe(&self, target: &Target, timeout: Duration) -> ProbeResult<AxfrCheck> {
        let domain = target.host();
        info!(target = %domain, "Starting zone transfer check.");
        let resolver = build_resolver(timeout);

        let name_servers: Vec<String> = lookup_records(&resolver, domain, RecordType::NS)
            .await?
            .into_iter()
            .map(|ns| ns.trim_end_matches('.').to_ascii_lowercase())
            .collect();
        debug!(count = name_servers.len(), "Resolved name servers.");

        let attempts = name_servers.iter().map(|ns| {
            let resolver = &resolver;
            async move {
                let allowed = match first_address(resolver, ns).await {
                    Some(ip) => attempt_transfer(SocketAddr::new(ip, DNS_PORT), domain, timeout).await,
                    None => false,
                };
                (ns.clone(), allowed)
            }
        });
        let outcomes = join_all(attempts).await;

        let axfr_allowed_on: Vec<String> =
            outcomes.into_iter().filter(|(_, allowed)| *allowed).map(|(ns, _)| ns).collect();
        let mut analysis = Vec::new();
        if !axfr_allowed_on.is_empty() {
            warn!(servers = ?axfr_allowed_on, "Zone transfer allowed.");
            analysis.push(AnalysisFinding::new(Severity::Critical, "DNS_AXFR_ALLOWED"));
        }
        info!(attempted = name_servers.len(), allowed = axfr_allowed_on.len(), "Zone transfer check finished.");

        Ok(AxfrCheck {
            domain: domain.to_string(),
            attempted_ns: name_servers,
            axfr_allowed_on,
            analysis,
        })
    }
}

async fn first_address(resolver: &TokioAsyncResolver, name: &str) -> Option<IpAddr> {
    match resolver.lookup_ip(name).await {
        Ok(lookup) => lookup.iter().next(),
        Err(e) => {
            debug!(name, error = %e, "Name server did not resolve.");
            None
        }
    }
}

/// Asks one server for the zone. Any failure, refusal or truncated answer reads
/// as "not allowed".
pub async fn attempt_transfer(server: SocketAddr, domain: &str, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, request_zone(server, domain)).await {
        Ok(Ok(response)) => transfer_allowed(&response),
        Ok(Err(e)) => {
            debug!(%server, error = %e, "Zone transfer attempt failed.");
            false
        }
        Err(_) => {
            debug!(%server, "Zone transfer attempt timed out.");
            false
        }
    }
}

/// A server allows the transfer when it answers without error and the answer
/// opens with the zone's SOA record.
pub fn transfer_allowed(response: &Message) -> bool {
    response.message_type() == MessageType::Response
        && response.response_code() == ResponseCode::NoError
        && response.answers().iter().any(|record| record.record_type() == RecordType::SOA)
}

pub fn axfr_query(domain: &str) -> ProbeResult<Message> {
    let name = Name::from_ascii(domain).map_err(|e| ProbeError::Malformed(e.to_string()))?;
    let mut message = Message::new();
    message
        .set_id(AXFR_QUERY_ID)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(false)
        .add_query(Query::query(name, RecordType::AXFR));
    Ok(message)
}

/// Sends the query over TCP with the two-byte length prefix and reads back the
/// first response message.
async fn request_zone(server: SocketAddr, domain: &str) -> ProbeResult<Message> {
    let query = axfr_query(domain)?
        .to_bytes()
        .map_err(|e| ProbeError::Malformed(e.to_string()))?;
    let length = u16::try_from(query.len()).map_err(|_| ProbeError::Malformed("query too long".to_string()))?;

    let mut stream = TcpStream::connect(server).await?;
    stream.write_all(&length.to_be_bytes()).await?;
    stream.write_all(&query).await?;
    stream.flush().await?;

    let response_length = stream.read_u16().await?;
    let mut buffer = vec![0u8; usize::from(response_length)];
    stream.read_exact(&mut buffer).await?;
    Message::from_bytes(&buffer).map_err(|e| ProbeError::Malformed(e.to_string()))
}
