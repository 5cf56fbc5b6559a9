use crate::message::{self, Interpreter};
use crate::metrics::{MESSAGES_RECEIVED, WAKE_REQUESTS};
use crate::wol::{self, Sender, Transmit};
use log::{error, info, warn};
use std::net::SocketAddr;

const USAGE_HINT: &str = "send a MAC address ('AA:BB:CC:DD:EE:FF'), \
    JSON ('{\"mac_address\": \"AA:BB:CC:DD:EE:FF\"}') or a configured device name";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Message(#[from] message::Error),
    #[error(transparent)]
    Wol(#[from] wol::Error),
}

impl Error {
    /// Value of the `result` label on the wake request counter.
    pub fn result(&self) -> &'static str {
        match self {
            Self::Message(message::Error::InvalidHardwareAddress { .. }) => {
                "invalid_hardware_address"
            }
            Self::Message(message::Error::UnknownDevice { .. }) => "unknown_device",
            Self::Message(message::Error::MalformedPayload { .. }) => "malformed_payload",
            Self::Wol(_) => "transmission_error",
        }
    }
}

/// Handles one message at a time: interpret, send, log, count.
pub struct Dispatcher<T> {
    interpreter: Interpreter,
    sender: Sender<T>,
}

impl<T: Transmit> Dispatcher<T> {
    pub fn new(interpreter: Interpreter, sender: Sender<T>) -> Self {
        Self {
            interpreter,
            sender,
        }
    }

    /// Never fails the caller's loop; the result is returned for inspection only.
    pub fn handle(&self, topic: &str, payload: &[u8]) -> Result<SocketAddr, Error> {
        MESSAGES_RECEIVED.inc();
        info!(
            "Received message on topic '{}': {}",
            topic,
            String::from_utf8_lossy(payload)
        );
        let result = self.dispatch(payload);
        match &result {
            Ok(_) => WAKE_REQUESTS.with_label_values(&["sent"]).inc(),
            Err(e) => {
                WAKE_REQUESTS.with_label_values(&[e.result()]).inc();
                match e {
                    Error::Message(message::Error::UnknownDevice { .. }) => {
                        warn!("{}", e);
                        info!("{}", USAGE_HINT);
                    }
                    Error::Message(_) => warn!("{}", e),
                    // Logged by `dispatch`, where the target is known.
                    Error::Wol(_) => {}
                }
            }
        }
        result
    }

    fn dispatch(&self, payload: &[u8]) -> Result<SocketAddr, Error> {
        let target = self.interpreter.interpret(payload)?;
        let name = target.name();
        let destination = target
            .destination
            .as_ref()
            .map_or_else(|| "broadcast".to_string(), |d| d.to_string());
        info!(
            "Sending WOL packet to device '{name}' ({mac}) via {destination}",
            mac = target.mac,
        );
        let addr = self.sender.wake(&target).map_err(|e| {
            error!("{}", send_failure(&name, &target.mac.to_string(), &destination, &e));
            e
        })?;
        info!("WOL packet sent to {name} at {addr}");
        Ok(addr)
    }
}

fn send_failure(name: &str, mac: &str, destination: &str, e: &wol::Error) -> String {
    format!(
        "Failed to send WOL packet to device '{name}' ({mac}) via {destination}: {}",
        error_chain(e)
    )
}

fn error_chain(e: &dyn std::error::Error) -> String {
    let mut msg = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
