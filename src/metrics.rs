use lazy_static::lazy_static;
use log::info;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};
use rouille::{Request, Response};
use std::error::Error;
use std::sync::mpsc;
use std::thread;

lazy_static! {
    pub static ref MESSAGES_RECEIVED: IntCounter = register_int_counter!(
        "mqttwol_messages_received_total",
        "Messages received on the wake topic"
    )
    .unwrap();
    pub static ref WAKE_REQUESTS: IntCounterVec = register_int_counter_vec!(
        "mqttwol_wake_requests_total",
        "Wake requests by result",
        &["result"]
    )
    .unwrap();
}

pub struct VarzServer {
    handle: thread::JoinHandle<()>,
    stop: mpsc::Sender<()>,
}

impl VarzServer {
    pub fn stop(self) {
        // The server thread may already be gone; nothing to do then.
        let _ = self.stop.send(());
        let _ = self.handle.join();
    }
}

/// Serves `/varz` on a background thread.
pub fn serve(addr: &str) -> Result<VarzServer, Box<dyn Error + Send + Sync>> {
    let server = rouille::Server::new(addr, handle)?;
    info!("Serving metrics on http://{}/varz", server.server_addr());
    let (handle, stop) = server.stoppable();
    Ok(VarzServer { handle, stop })
}

fn handle(request: &Request) -> Response {
    if request.method() == "GET" && request.url() == "/varz" {
        varz()
    } else {
        Response::empty_404()
    }
}

fn varz() -> Response {
    let encoder = prometheus::TextEncoder::new();
    match encoder.encode_to_string(&prometheus::gather()) {
        Ok(body) => Response::from_data(prometheus::TEXT_FORMAT, body),
        Err(e) => Response::text(e.to_string()).with_status_code(500),
    }
}

#[cfg(test)]
mod tests {
    use crate::metrics::*;
    use std::io::Read;

    #[test]
    fn test_varz() {
        MESSAGES_RECEIVED.inc();
        let response = handle(&Request::fake_http("GET", "/varz", vec![], vec![]));
        assert_eq!(response.status_code, 200);

        let mut body = String::new();
        let (mut reader, _) = response.data.into_reader_and_size();
        reader.read_to_string(&mut body).unwrap();
        assert!(body.contains("mqttwol_messages_received_total"), "{body}");
    }

    #[test]
    fn test_serve_and_stop() {
        let server = serve("127.0.0.1:0").unwrap();
        server.stop();
    }

    #[test]
    fn test_not_found() {
        let response = handle(&Request::fake_http("GET", "/", vec![], vec![]));
        assert_eq!(response.status_code, 404);
        let response = handle(&Request::fake_http("POST", "/varz", vec![], vec![]));
        assert_eq!(response.status_code, 404);
    }
}
