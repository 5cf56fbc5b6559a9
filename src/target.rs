use crate::mac::MacAddress;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

const MAX_HOSTNAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Where to send a magic packet instead of the configured broadcast address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Destination {
    Ip(Ipv4Addr),
    Host(String),
}

#[derive(thiserror::Error, Debug, PartialEq)]
#[error("{0:?} is neither an IPv4 address nor a hostname")]
pub struct InvalidDestination(pub String);

impl FromStr for Destination {
    type Err = InvalidDestination;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(ip) = s.parse::<Ipv4Addr>() {
            return Ok(Self::Ip(ip));
        }
        if is_hostname(s) {
            Ok(Self::Host(s.to_string()))
        } else {
            Err(InvalidDestination(s.to_string()))
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Ip(ip) => write!(f, "{ip}"),
            Self::Host(host) => write!(f, "{host}"),
        }
    }
}

// RFC 1123 labels. An all-numeric last label is rejected so that "999.1.1.1"
// doesn't slip through as a hostname.
fn is_hostname(s: &str) -> bool {
    let s = s.strip_suffix('.').unwrap_or(s);
    if s.is_empty() || s.len() > MAX_HOSTNAME_LEN {
        return false;
    }
    let valid_labels = s.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    });
    let numeric_tld = s
        .rsplit('.')
        .next()
        .map_or(false, |tld| tld.bytes().all(|b| b.is_ascii_digit()));
    valid_labels && !numeric_tld
}

/// A resolved wake request. Built per message, dropped after the send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WakeTarget {
    pub mac: MacAddress,
    pub destination: Option<Destination>,
    pub label: Option<String>,
}

impl WakeTarget {
    pub fn new(mac: MacAddress) -> Self {
        Self {
            mac,
            destination: None,
            label: None,
        }
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The label, or "device-EE:FF" built from the last two octets.
    pub fn name(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => {
                let octets = self.mac.octets();
                format!("device-{:02X}:{:02X}", octets[4], octets[5])
            }
        }
    }
}
