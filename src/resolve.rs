use crate::{AddressSpec, ExecErr, HostKind};
use log::{debug, info};
use std::{future::Future, net::IpAddr};

/// Name resolution service used to turn a domain into literal addresses.
pub trait NameLookup {
    fn lookup(&self, domain: &str) -> impl Future<Output = std::io::Result<Vec<IpAddr>>>;
}

/// Resolves through the operating system resolver.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLookup;

impl NameLookup for SystemLookup {
    async fn lookup(&self, domain: &str) -> std::io::Result<Vec<IpAddr>> {
        Ok(tokio::net::lookup_host((domain, 0))
            .await?
            .map(|socket_addr| socket_addr.ip())
            .collect())
    }
}

/// Target of a query session. `ip` is always a literal address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddress {
    pub ip: String,
    pub port: u16,
}

impl std::fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.ip.contains(':') {
            true => write!(f, "[{}]:{}", self.ip, self.port),
            false => write!(f, "{}:{}", self.ip, self.port),
        }
    }
}

/// Resolve `host` into a literal address.
///
/// Hosts that are already IPv4/IPv6 literals come back unchanged without
/// touching the network. Domains go through `lookup`; the first address
/// returned wins. A failed or empty lookup is a [ExecErr::ResolutionFailure].
pub async fn resolve_host<L: NameLookup>(lookup: &L, host: &str) -> Result<String, ExecErr> {
    if HostKind::classify(host).map_or(true, |kind| kind.is_literal()) {
        return Ok(host.into());
    }

    debug!("Looking up domain {}", host);

    match lookup.lookup(host).await {
        Ok(addrs) => match addrs.first() {
            Some(addr) => {
                info!("Resolved domain {} to {}", host, addr);
                Ok(addr.to_string())
            }
            None => Err(ExecErr::ResolutionFailure {
                domain: host.into(),
                cause: "lookup returned no address".into(),
            }),
        },
        Err(err) => Err(ExecErr::ResolutionFailure {
            domain: host.into(),
            cause: err.to_string(),
        }),
    }
}

/// Resolve a validated [AddressSpec] into a [ResolvedAddress].
pub async fn resolve<L: NameLookup>(
    lookup: &L,
    spec: &AddressSpec,
) -> Result<ResolvedAddress, ExecErr> {
    Ok(ResolvedAddress {
        ip: resolve_host(lookup, spec.host()).await?,
        port: spec.port_number(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        cell::Cell,
        io::{Error, ErrorKind},
        net::Ipv4Addr,
    };

    struct FakeLookup {
        answer: Option<Vec<IpAddr>>,
        calls: Cell<usize>,
    }

    impl FakeLookup {
        fn answering(answer: Option<Vec<IpAddr>>) -> Self {
            Self {
                answer,
                calls: Cell::new(0),
            }
        }
    }

    impl NameLookup for FakeLookup {
        async fn lookup(&self, domain: &str) -> std::io::Result<Vec<IpAddr>> {
            self.calls.set(self.calls.get() + 1);

            match &self.answer {
                Some(addrs) => Ok(addrs.clone()),
                None => Err(Error::new(
                    ErrorKind::NotFound,
                    format!("{} not found", domain),
                )),
            }
        }
    }

    #[tokio::test]
    async fn literals_pass_through_without_lookup() {
        let lookup = FakeLookup::answering(None);

        assert_eq!(resolve_host(&lookup, "127.0.0.1").await.unwrap(), "127.0.0.1");
        assert_eq!(resolve_host(&lookup, "fe80::1%eth0").await.unwrap(), "fe80::1%eth0");
        assert_eq!(resolve_host(&lookup, "2001:db8::1").await.unwrap(), "2001:db8::1");
        assert_eq!(lookup.calls.get(), 0);
    }

    #[tokio::test]
    async fn domain_resolves_to_first_address() {
        let lookup = FakeLookup::answering(Some(vec![
            IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34)),
            IpAddr::V4(Ipv4Addr::new(93, 184, 216, 35)),
        ]));

        assert_eq!(
            resolve_host(&lookup, "example.com").await.unwrap(),
            "93.184.216.34"
        );
        assert_eq!(lookup.calls.get(), 1);
    }

    #[tokio::test]
    async fn failed_or_empty_lookup_is_a_resolution_failure() {
        for lookup in [FakeLookup::answering(None), FakeLookup::answering(Some(vec![]))] {
            match resolve_host(&lookup, "example.com").await {
                Err(ExecErr::ResolutionFailure { domain, .. }) => {
                    assert_eq!(domain, "example.com")
                }
                other => panic!("expected resolution failure, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn resolve_keeps_port() {
        let lookup = FakeLookup::answering(Some(vec!["2001:db8::7".parse().unwrap()]));
        let spec = AddressSpec::parse("mc.example.com:00123").unwrap();
        let resolved = resolve(&lookup, &spec).await.unwrap();

        assert_eq!(
            resolved,
            ResolvedAddress {
                ip: "2001:db8::7".into(),
                port: 123,
            }
        );
        assert_eq!(resolved.to_string(), "[2001:db8::7]:123");
    }
}
