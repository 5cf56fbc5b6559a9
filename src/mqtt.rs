use log::{error, info, warn};
use rumqttc::{
    Client, Connection, ConnectionError, Event, MqttOptions, Packet, QoS, SubscribeReasonCode,
    Transport,
};
use std::thread;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 1883;
pub const DEFAULT_TOPIC: &str = "home/wake";

const KEEP_ALIVE: Duration = Duration::from_secs(60);
const REQUEST_CAPACITY: usize = 10;
const MIN_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

#[derive(Clone, Debug)]
pub struct Config {
    pub client_id: String,
    pub broker: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub use_tls: bool,
    pub topic: String,
}

impl Config {
    pub fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.broker, self.port);
        options.set_keep_alive(KEEP_ALIVE);
        if let Some(username) = &self.username {
            options.set_credentials(username, self.password.as_deref().unwrap_or_default());
        }
        if self.use_tls {
            options.set_transport(Transport::tls_with_default_config());
        }
        options
    }
}

/// Doubles the reconnect delay after each failure, up to a ceiling.
#[derive(Debug)]
struct Backoff {
    next: Duration,
}

impl Backoff {
    fn new() -> Self {
        Self { next: MIN_BACKOFF }
    }

    fn reset(&mut self) {
        self.next = MIN_BACKOFF;
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(MAX_BACKOFF);
        delay
    }
}

pub struct Subscriber {
    client: Client,
    connection: Connection,
    topic: String,
}

impl Subscriber {
    /// Doesn't touch the network; the connection is made by `run`.
    pub fn new(config: &Config) -> Self {
        let (client, connection) = Client::new(config.options(), REQUEST_CAPACITY);
        Self {
            client,
            connection,
            topic: config.topic.clone(),
        }
    }

    /// Calls `on_message` for every publish on the topic, in order. Reconnects
    /// and resubscribes after connection errors, so this never returns.
    pub fn run<F>(mut self, mut on_message: F)
    where
        F: FnMut(&str, &[u8]),
    {
        let mut backoff = Backoff::new();
        for event in self.connection.iter() {
            if let Some(delay) =
                handle_event(&self.client, &self.topic, event, &mut backoff, &mut on_message)
            {
                thread::sleep(delay);
            }
        }
    }
}

/// Returns how long to wait before polling again, if at all.
fn handle_event<F>(
    client: &Client,
    topic: &str,
    event: Result<Event, ConnectionError>,
    backoff: &mut Backoff,
    on_message: &mut F,
) -> Option<Duration>
where
    F: FnMut(&str, &[u8]),
{
    match event {
        Ok(Event::Incoming(Packet::ConnAck(_))) => {
            info!("Connected to MQTT broker");
            backoff.reset();
            // The session is clean, so subscriptions don't survive a reconnect.
            if let Err(e) = client.try_subscribe(topic, QoS::AtMostOnce) {
                error!("Failed to subscribe to {}: {}", topic, e);
            }
        }
        Ok(Event::Incoming(Packet::SubAck(ack))) => {
            if ack
                .return_codes
                .iter()
                .any(|code| matches!(code, SubscribeReasonCode::Failure))
            {
                error!("Broker rejected subscription to {}", topic);
            } else {
                info!("Subscribed to topic: {}", topic);
            }
        }
        Ok(Event::Incoming(Packet::Publish(publish))) => {
            on_message(publish.topic.as_str(), &publish.payload[..]);
        }
        Ok(Event::Incoming(Packet::Disconnect)) => {
            warn!("Broker closed the connection");
        }
        Ok(_) => {}
        Err(ConnectionError::ConnectionRefused(code)) => {
            let delay = backoff.next_delay();
            error!(
                "MQTT broker refused connection: {:?}; retrying in {:?}",
                code, delay
            );
            return Some(delay);
        }
        Err(e) => {
            let delay = backoff.next_delay();
            warn!("MQTT connection error: {}; retrying in {:?}", e, delay);
            return Some(delay);
        }
    }
    None
}
