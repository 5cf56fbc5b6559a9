use crate::directory::DeviceDirectory;
use crate::mac::{self, MacAddress};
use crate::target::{Destination, WakeTarget};
use serde::Deserialize;
use std::borrow::Cow;
use std::sync::Arc;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("invalid MAC address in {payload:?}: {source}")]
    InvalidHardwareAddress {
        payload: String,
        source: mac::ParseError,
    },
    #[error("unknown device {payload:?}")]
    UnknownDevice { payload: String },
    #[error("malformed payload {payload:?}: {reason}")]
    MalformedPayload { payload: String, reason: String },
}

/// JSON form of a wake request.
#[derive(Deserialize, Debug, PartialEq)]
pub struct WakeRequest {
    pub mac_address: Option<String>,
    pub ip_address: Option<String>,
    pub device: Option<String>,
}

/// The shape a payload was recognised as, before validation of its fields.
#[derive(Debug, PartialEq)]
pub enum Payload<'a> {
    Mac(MacAddress),
    Structured(WakeRequest),
    Label(Cow<'a, str>),
}

impl<'a> Payload<'a> {
    /// A direct MAC address wins, then a JSON object, then a directory label.
    pub fn classify(text: &'a str) -> Result<Self, Error> {
        let text = text.trim();
        if let Ok(mac) = text.parse() {
            return Ok(Self::Mac(mac));
        }
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(value @ serde_json::Value::Object(_)) => serde_json::from_value(value)
                .map(Self::Structured)
                .map_err(|e| malformed(text, e.to_string())),
            // A quoted string names a device just like a bare one.
            Ok(serde_json::Value::String(label)) => Ok(Self::Label(Cow::Owned(label))),
            _ => Ok(Self::Label(Cow::Borrowed(text))),
        }
    }
}

fn malformed(payload: &str, reason: impl Into<String>) -> Error {
    Error::MalformedPayload {
        payload: payload.to_string(),
        reason: reason.into(),
    }
}

/// Turns message payloads into wake targets.
pub struct Interpreter {
    directory: Arc<DeviceDirectory>,
}

impl Interpreter {
    pub fn new(directory: Arc<DeviceDirectory>) -> Self {
        Self { directory }
    }

    pub fn interpret(&self, payload: &[u8]) -> Result<WakeTarget, Error> {
        let text = std::str::from_utf8(payload).map_err(|e| {
            malformed(&String::from_utf8_lossy(payload), format!("not UTF-8: {e}"))
        })?;
        match Payload::classify(text)? {
            Payload::Mac(mac) => Ok(WakeTarget::new(mac)),
            Payload::Structured(request) => from_request(text.trim(), request),
            Payload::Label(label) => match self.directory.lookup(&label) {
                Some(mac) => Ok(WakeTarget::new(mac).with_label(label)),
                None => Err(Error::UnknownDevice {
                    payload: label.into_owned(),
                }),
            },
        }
    }
}

// Structured requests never fall back to a directory lookup.
fn from_request(payload: &str, request: WakeRequest) -> Result<WakeTarget, Error> {
    let mac_address = request
        .mac_address
        .ok_or_else(|| malformed(payload, "missing mac_address"))?;
    let mac = mac_address
        .trim()
        .parse::<MacAddress>()
        .map_err(|source| Error::InvalidHardwareAddress {
            payload: payload.to_string(),
            source,
        })?;
    let mut target = WakeTarget::new(mac);
    if let Some(ip) = request.ip_address.as_deref().map(str::trim) {
        if !ip.is_empty() {
            let destination = ip
                .parse::<Destination>()
                .map_err(|e| malformed(payload, format!("ip_address: {e}")))?;
            target = target.with_destination(destination);
        }
    }
    if let Some(device) = request.device {
        target = target.with_label(device);
    }
    Ok(target)
}
