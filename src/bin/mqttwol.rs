use mqttwol::directory::{DeviceDirectory, DeviceEntry};
use mqttwol::dispatch::Dispatcher;
use mqttwol::message::Interpreter;
use mqttwol::metrics;
use mqttwol::mqtt;
use mqttwol::wol;

use clap::builder::{BoolishValueParser, NonEmptyStringValueParser};
use clap::Parser;
use log::info;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// MQTT broker hostname or address.
    #[arg(long, env = "MQTT_BROKER")]
    mqtt_broker: String,

    /// MQTT broker port.
    #[arg(long, env = "MQTT_PORT", default_value_t = mqtt::DEFAULT_PORT)]
    mqtt_port: u16,

    /// MQTT username. Credentials are only sent when this is set.
    #[arg(long, env = "MQTT_USERNAME")]
    mqtt_username: Option<String>,

    /// MQTT password.
    #[arg(long, env = "MQTT_PASSWORD", hide_env_values = true)]
    mqtt_password: Option<String>,

    /// If true, connect to the broker over TLS using the system's root certificates.
    #[arg(long, env = "MQTT_USE_TLS", value_parser = BoolishValueParser::new())]
    mqtt_use_tls: bool,

    /// Topic to listen on for wake commands.
    #[arg(long, env = "MQTT_TOPIC", default_value = mqtt::DEFAULT_TOPIC)]
    mqtt_topic: String,

    /// MQTT client id. Defaults to mqttwol-<pid>.
    #[arg(long, env = "MQTT_CLIENT_ID", value_parser = NonEmptyStringValueParser::new())]
    mqtt_client_id: Option<String>,

    /// Log level, overridden by RUST_LOG.
    #[arg(long, env = "LOG_LEVEL", default_value = "INFO")]
    log_level: String,

    /// UDP port magic packets are sent to.
    #[arg(long, env = "WOL_PORT", default_value_t = wol::DEFAULT_PORT)]
    wol_port: u16,

    /// Destination for requests that don't name an ip_address.
    #[arg(long, env = "WOL_BROADCAST_ADDR", default_value_t = wol::DEFAULT_BROADCAST_ADDR)]
    broadcast_addr: Ipv4Addr,

    /// Known device, in name=xx:xx:xx:xx:xx:xx form. May be repeated.
    #[arg(long = "device", env = "WOL_DEVICES", value_delimiter = ',')]
    devices: Vec<DeviceEntry>,

    /// JSON file mapping device names to MAC addresses.
    #[arg(long, env = "WOL_DEVICES_FILE")]
    devices_file: Option<PathBuf>,

    /// Address to serve /varz on, e.g. 0.0.0.0:9090.
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<String>,

    /// If true, log magic packets instead of sending them.
    #[arg(long, env = "WOL_DRY_RUN", value_parser = BoolishValueParser::new())]
    dry_run: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .format_timestamp(Some(env_logger::fmt::TimestampPrecision::Millis))
        .init();

    info!("Starting MQTT Wake-on-LAN service");

    let mut directory = match &args.devices_file {
        Some(path) => DeviceDirectory::from_json_file(path)?,
        None => DeviceDirectory::new(),
    };
    directory.extend(args.devices);
    if directory.is_empty() {
        info!("No devices configured; send MAC addresses directly");
    } else {
        info!("Known devices: {}", directory.names().join(", "));
    }

    let transmitter: Box<dyn wol::Transmit> = if args.dry_run {
        info!("Dry run: magic packets will only be logged");
        Box::new(wol::noop::LogOnlyTransmitter)
    } else {
        Box::new(wol::UdpTransmitter)
    };
    let sender = wol::Sender::new(
        wol::Config {
            broadcast_addr: args.broadcast_addr,
            port: args.wol_port,
        },
        transmitter,
    );
    let dispatcher = Dispatcher::new(Interpreter::new(Arc::new(directory)), sender);

    let _varz = match &args.metrics_addr {
        Some(addr) => Some(metrics::serve(addr)?),
        None => None,
    };

    let config = mqtt::Config {
        client_id: args
            .mqtt_client_id
            .unwrap_or_else(|| format!("mqttwol-{}", std::process::id())),
        broker: args.mqtt_broker,
        port: args.mqtt_port,
        username: args.mqtt_username,
        password: args.mqtt_password,
        use_tls: args.mqtt_use_tls,
        topic: args.mqtt_topic,
    };
    info!("MQTT Broker: {}:{}", config.broker, config.port);
    info!("MQTT Topic: {}", config.topic);

    mqtt::Subscriber::new(&config).run(|topic, payload| {
        // Failures are already logged and counted.
        let _ = dispatcher.handle(topic, payload);
    });
    Ok(())
}
