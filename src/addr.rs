use crate::ExecErr;
use std::str::FromStr;

/// Lexical class of the host segment of an `<address:port>` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
    Ipv4,
    Ipv6,
    Domain,
}

impl HostKind {
    /// Classify a host, first match wins: IPv4, then IPv6, then domain name.
    ///
    /// # Example
    ///
    /// ```
    /// # use mqe::HostKind;
    /// #
    /// assert_eq!(HostKind::classify("192.168.1.10"), Some(HostKind::Ipv4));
    /// assert_eq!(HostKind::classify("fe80::1%eth0"), Some(HostKind::Ipv6));
    /// assert_eq!(HostKind::classify("mc.example.com"), Some(HostKind::Domain));
    /// assert_eq!(HostKind::classify("localhost"), None);
    /// ```
    pub fn classify(host: &str) -> Option<HostKind> {
        if is_ipv4_literal(host) {
            Some(HostKind::Ipv4)
        } else if is_ipv6_literal(host) {
            Some(HostKind::Ipv6)
        } else if is_domain_name(host) {
            Some(HostKind::Domain)
        } else {
            None
        }
    }

    pub fn is_literal(&self) -> bool {
        !matches!(self, HostKind::Domain)
    }
}

/// A validated `<address:port>` argument.
///
/// Host and port are kept exactly as the user wrote them; the host is
/// not resolved yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressSpec {
    host: String,
    port: String,
    kind: HostKind,
    port_number: u16,
}

impl AddressSpec {
    /// Parse and validate a raw `host:port` string.
    ///
    /// Everything before the last colon is the host, which keeps
    /// IPv6 literals intact. An empty input or an input without any colon
    /// is a [ExecErr::MalformedInvocation]; a host that is neither IPv4,
    /// IPv6 nor a domain name, or a port outside `0..=65535`, is an
    /// [ExecErr::InvalidAddressPort].
    ///
    /// # Example
    ///
    /// ```
    /// # use mqe::{AddressSpec, ExecErr};
    /// #
    /// # fn main() -> Result<(), ExecErr> {
    ///     let spec = AddressSpec::parse("192.168.1.10:25565")?;
    /// #
    /// #   assert_eq!(spec.host(), "192.168.1.10");
    /// #   assert_eq!(spec.port(), "25565");
    /// #   assert!(AddressSpec::parse("localhost:25565").is_err());
    /// #   assert!(AddressSpec::parse("192.168.1.10:70000").is_err());
    /// #   Ok(())
    /// # }
    /// ```
    pub fn parse(raw: &str) -> Result<Self, ExecErr> {
        if raw.trim().is_empty() {
            return Err(ExecErr::MalformedInvocation(format!(
                "The parameter <address:port> is undefined: {:?}.",
                raw
            )));
        }

        let (host, port) = match raw.rsplit_once(':') {
            Some(split) => split,
            None => {
                return Err(ExecErr::MalformedInvocation(format!(
                    "The parameter <address:port> is invalid: {} is 1 long when it should be 2.",
                    raw
                )));
            }
        };

        let kind = match HostKind::classify(host) {
            Some(kind) => kind,
            None => {
                return Err(ExecErr::InvalidAddressPort(format!(
                    "IP address is not an IPv4 or IPv6 or domain address: {}",
                    host
                )));
            }
        };

        match parse_port(port) {
            Some(port_number) => Ok(Self {
                host: host.into(),
                port: port.into(),
                kind,
                port_number,
            }),
            None => Err(ExecErr::InvalidAddressPort(format!(
                "Port is invalid: {}",
                port
            ))),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port exactly as written, leading zeros included.
    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn port_number(&self) -> u16 {
        self.port_number
    }

    pub fn kind(&self) -> HostKind {
        self.kind
    }
}

impl FromStr for AddressSpec {
    type Err = ExecErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AddressSpec::parse(s)
    }
}

impl std::fmt::Display for AddressSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Digits only, at most five of them, value must fit in [u16].
fn parse_port(port: &str) -> Option<u16> {
    if port.is_empty() || port.len() > 5 || !port.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    port.parse::<u16>().ok()
}

fn is_ipv4_literal(host: &str) -> bool {
    let octets = host.split('.').collect::<Vec<_>>();

    octets.len() == 4 && octets.iter().all(|octet| is_octet(octet))
}

/// One to three digits, 0..=255. Leading zeros are allowed (`010`).
fn is_octet(octet: &str) -> bool {
    (1..=3).contains(&octet.len())
        && octet.bytes().all(|b| b.is_ascii_digit())
        && octet.parse::<u16>().map_or(false, |v| v <= 255)
}

/// Dotted quad embedded in an IPv6 literal. Three-digit octets may not
/// start with a zero here.
fn is_embedded_ipv4(tail: &str) -> bool {
    let octets = tail.split('.').collect::<Vec<_>>();

    octets.len() == 4
        && octets
            .iter()
            .all(|octet| is_octet(octet) && !(octet.len() == 3 && octet.starts_with('0')))
}

/// Number of colon separated hex groups, if every group has 1 to 4 hex digits.
fn hex_group_count(groups: &str) -> Option<usize> {
    let mut count = 0;

    for group in groups.split(':') {
        if !(1..=4).contains(&group.len()) || !group.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }

        count += 1;
    }

    Some(count)
}

fn is_ipv6_literal(host: &str) -> bool {
    // Zone index is only accepted on link-local addresses
    if let Some((addr, zone)) = host.split_once('%') {
        return !zone.is_empty()
            && zone.bytes().all(|b| b.is_ascii_alphanumeric())
            && is_link_local(addr);
    }

    if let Some(idx) = host.rfind(':') {
        let (head, tail) = host.split_at(idx + 1);

        if tail.contains('.') {
            return is_embedded_ipv4(tail) && is_embedded_ipv4_prefix(head);
        }
    }

    match host.split_once("::") {
        None => hex_group_count(host) == Some(8),
        Some((left, right)) => {
            let count = |groups: &str| match groups {
                "" => Some(0),
                groups => hex_group_count(groups),
            };

            match (count(left), count(right)) {
                (Some(n), Some(m)) => n + m <= 7,
                _ => false,
            }
        }
    }
}

/// `fe80:` followed by up to four `:`-prefixed groups of 0 to 4 hex digits.
fn is_link_local(addr: &str) -> bool {
    let addr = addr.to_ascii_lowercase();

    match addr.strip_prefix("fe80:") {
        Some("") => true,
        Some(rest) => match rest.strip_prefix(':') {
            Some(rest) => {
                let groups = rest.split(':').collect::<Vec<_>>();

                groups.len() <= 4
                    && groups
                        .iter()
                        .all(|g| g.len() <= 4 && g.bytes().all(|b| b.is_ascii_hexdigit()))
            }
            None => false,
        },
        None => false,
    }
}

/// Everything up to and including the last colon of an IPv4-embedded literal:
/// `::`, `::ffff:`, `::ffff:0:` or one to four groups followed by `::`.
fn is_embedded_ipv4_prefix(head: &str) -> bool {
    let head = head.to_ascii_lowercase();

    if head == "::" || head == "::ffff:" {
        return true;
    }

    if let Some(zeros) = head
        .strip_prefix("::ffff:")
        .and_then(|rest| rest.strip_suffix(':'))
    {
        return (1..=4).contains(&zeros.len()) && zeros.bytes().all(|b| b == b'0');
    }

    match head.strip_suffix("::") {
        Some(groups) => matches!(hex_group_count(groups), Some(1..=4)),
        None => false,
    }
}

/// `[sub.]name.tld[.tld]`: labels of letters, digits and underscores,
/// top level labels of 2 to 5 characters.
fn is_domain_name(host: &str) -> bool {
    let is_label = |label: &str| {
        !label.is_empty()
            && label
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_')
    };
    let is_tld = |label: &str| (2..=5).contains(&label.len()) && is_label(label);

    match host.split('.').collect::<Vec<_>>().as_slice() {
        [name, tld] => is_label(name) && is_tld(tld),
        [first, second, tld] => is_label(first) && is_label(second) && is_tld(tld),
        [sub, name, tld, second_tld] => {
            is_label(sub) && is_label(name) && is_tld(tld) && is_tld(second_tld)
        }
        _ => false,
    }
}
