//! LAN discovery of share servers over mDNS/DNS-SD.
//!
//! Servers advertising the file-sharing service are resolved to an IPv4
//! address and port. A response that cannot be resolved is skipped; only a
//! failure of the browse itself is reported as an error.

use std::collections::HashSet;
use std::net::IpAddr;
use std::time::Duration;

use futures_util::{pin_mut, stream::StreamExt};
use sharestream_common::{DiscoveredServer, ServerId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Port used when a service record carries none.
pub const DEFAULT_SHARE_PORT: u16 = 445;

/// How often queries are re-sent while browsing.
const QUERY_INTERVAL: Duration = Duration::from_secs(2);

/// The parts of an mDNS response discovery cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Advertisement {
    /// Full instance name, e.g. `NAS._smb._tcp.local`.
    pub instance: String,
    pub addrs: Vec<IpAddr>,
    pub port: Option<u16>,
}

impl Advertisement {
    pub fn from_response(response: &mdns::Response) -> Option<Self> {
        let instance = response.records().find_map(|r| match r.kind {
            mdns::RecordKind::PTR(ref name) => Some(name.clone()),
            _ => None,
        })?;

        let addrs = response
            .records()
            .filter_map(|r| match r.kind {
                mdns::RecordKind::A(addr) => Some(IpAddr::V4(addr)),
                mdns::RecordKind::AAAA(addr) => Some(IpAddr::V6(addr)),
                _ => None,
            })
            .collect();

        let port = response.records().find_map(|r| match r.kind {
            mdns::RecordKind::SRV { port, .. } => Some(port),
            _ => None,
        });

        Some(Self {
            instance,
            addrs,
            port,
        })
    }

    /// Resolve to a server, requiring an IPv4 address.
    pub fn resolve(&self, service_type: &str) -> Option<DiscoveredServer> {
        let host = self.addrs.iter().find_map(|addr| match addr {
            IpAddr::V4(v4) => Some(v4.to_string()),
            IpAddr::V6(_) => None,
        })?;
        let port = self.port.filter(|p| *p != 0).unwrap_or(DEFAULT_SHARE_PORT);

        let display_name = self
            .instance
            .strip_suffix(service_type)
            .map(|s| s.trim_end_matches('.'))
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.instance)
            .to_string();

        Some(DiscoveredServer {
            id: ServerId::from_endpoint(&host, port),
            display_name,
            host,
            port,
        })
    }
}

/// A running browse. Dropping the handle does not stop it; call
/// [`DiscoveryHandle::stop`].
pub struct DiscoveryHandle {
    task: JoinHandle<()>,
}

impl DiscoveryHandle {
    pub fn stop(self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[derive(Debug, Clone)]
pub struct DiscoveryService {
    service_type: String,
}

impl DiscoveryService {
    pub fn new(service_type: impl Into<String>) -> Self {
        Self {
            service_type: service_type.into(),
        }
    }

    /// Browse until stopped. Each newly seen server is passed to
    /// `on_found` once; a failure of the browse is passed to `on_error` and
    /// ends it.
    pub fn start<F, E>(&self, on_found: F, on_error: E) -> DiscoveryHandle
    where
        F: Fn(DiscoveredServer) + Send + 'static,
        E: FnOnce(String) + Send + 'static,
    {
        let service_type = self.service_type.clone();
        let task = tokio::spawn(async move {
            if let Err(e) = browse(&service_type, on_found).await {
                tracing::warn!("mDNS discovery failed: {}", e);
                on_error(e.to_string());
            }
        });
        DiscoveryHandle { task }
    }

    /// Browse for `timeout` and return every server found, sorted by name.
    pub async fn discover(&self, timeout: Duration) -> anyhow::Result<Vec<DiscoveredServer>> {
        let (found_tx, mut found_rx) = mpsc::unbounded_channel();
        let (error_tx, mut error_rx) = mpsc::unbounded_channel();

        let handle = self.start(
            move |server| {
                let _ = found_tx.send(server);
            },
            move |message| {
                let _ = error_tx.send(message);
            },
        );

        let mut servers = Vec::new();
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => break,
                Some(server) = found_rx.recv() => servers.push(server),
                Some(message) = error_rx.recv() => {
                    handle.stop();
                    anyhow::bail!("discovery failed: {}", message);
                }
            }
        }
        handle.stop();

        servers.sort_by(|a: &DiscoveredServer, b: &DiscoveredServer| {
            a.display_name.cmp(&b.display_name).then(a.id.cmp(&b.id))
        });
        Ok(servers)
    }
}

async fn browse<F>(service_type: &str, on_found: F) -> Result<(), mdns::Error>
where
    F: Fn(DiscoveredServer),
{
    tracing::info!("Browsing for {}", service_type);
    let stream = mdns::discover::all(service_type, QUERY_INTERVAL)?.listen();
    pin_mut!(stream);

    let mut seen: HashSet<ServerId> = HashSet::new();
    while let Some(response) = stream.next().await {
        let response = match response {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("Ignoring bad mDNS response: {}", e);
                continue;
            }
        };

        let Some(advertisement) = Advertisement::from_response(&response) else {
            continue;
        };
        match advertisement.resolve(service_type) {
            Some(server) => {
                if seen.insert(server.id.clone()) {
                    tracing::debug!(
                        "Found {} at {}:{}",
                        server.display_name,
                        server.host,
                        server.port
                    );
                    on_found(server);
                }
            }
            None => {
                tracing::debug!("Could not resolve {} to IPv4", advertisement.instance);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    const SMB: &str = "_smb._tcp.local";

    #[test]
    fn test_resolve_prefers_ipv4() {
        let adv = Advertisement {
            instance: "NAS._smb._tcp.local".into(),
            addrs: vec![
                IpAddr::V6(Ipv6Addr::LOCALHOST),
                IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)),
            ],
            port: Some(4450),
        };
        let server = adv.resolve(SMB).unwrap();
        assert_eq!(server.host, "192.168.1.20");
        assert_eq!(server.port, 4450);
        assert_eq!(server.display_name, "NAS");
        assert_eq!(server.id, ServerId::from_endpoint("192.168.1.20", 4450));
    }

    #[test]
    fn test_resolve_defaults_port() {
        let adv = Advertisement {
            instance: "Box._smb._tcp.local".into(),
            addrs: vec![IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2))],
            port: None,
        };
        assert_eq!(adv.resolve(SMB).unwrap().port, DEFAULT_SHARE_PORT);
    }

    #[test]
    fn test_resolve_requires_ipv4() {
        let adv = Advertisement {
            instance: "V6only._smb._tcp.local".into(),
            addrs: vec![IpAddr::V6(Ipv6Addr::LOCALHOST)],
            port: Some(445),
        };
        assert!(adv.resolve(SMB).is_none());
    }

    #[test]
    fn test_display_name_falls_back_to_instance() {
        let adv = Advertisement {
            instance: "weird-name".into(),
            addrs: vec![IpAddr::V4(Ipv4Addr::new(10, 0, 0, 3))],
            port: Some(445),
        };
        assert_eq!(adv.resolve(SMB).unwrap().display_name, "weird-name");
    }
}
