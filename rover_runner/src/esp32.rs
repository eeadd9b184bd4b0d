// THEORY:
// The rover's motor board is an ESP32 serving a tiny HTTP API on its own access
// point. Two endpoints matter:
//
//     GET /control?motor=A&speed=<i32>     one motor, signed speed
//     GET /command?dir=<TOKEN>             discrete direction (steering build)
//
// A speed pair costs two requests, one per motor, and the pair only counts as
// sent when both come back 200. Every request gets a short connect/read budget
// so a flaky link stalls a frame for at most a fraction of a second; the
// dispatcher's gate retries on the next frame anyway.
//
// Requests go through a `ureq` agent that keeps no idle connections.

use std::time::Duration;

use blob_pilot::pipeline::{CommandSink, MotorCommand};
use tracing::{info, warn};

pub const DEFAULT_ESP32_ADDR: &str = "192.168.4.1";
pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(500);
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Motor sink talking to the ESP32 over HTTP.
#[derive(Debug, Clone)]
pub struct Esp32Sink {
    base_url: String,
    agent: ureq::Agent,
    timeout: Duration,
}

impl Esp32Sink {
    /// `host` is an IP or hostname, optionally with `:port`.
    pub fn new(host: &str) -> Self {
        // The board serves one connection at a time, so nothing is kept alive.
        let agent = ureq::AgentBuilder::new().max_idle_connections(0).build();
        Self {
            base_url: format!("http://{host}"),
            agent,
            timeout: REQUEST_TIMEOUT,
        }
    }

    /// GET / with a longer budget. A miss is only a warning: the board may
    /// still be booting when the runner starts.
    pub fn test_connection(&self) -> bool {
        match self.get("/", PROBE_TIMEOUT) {
            Ok(200) => {
                info!(url = %self.base_url, "connected to motor controller");
                true
            }
            Ok(status) => {
                warn!(url = %self.base_url, status, "motor controller answered with an error");
                false
            }
            Err(error) => {
                warn!(url = %self.base_url, %error, "could not reach motor controller");
                false
            }
        }
    }

    /// Status code of `GET path`. Only transport failures are errors.
    fn get(&self, path: &str, timeout: Duration) -> Result<u16, ureq::Transport> {
        let url = format!("{}{path}", self.base_url);
        match self.agent.get(&url).timeout(timeout).call() {
            Ok(response) => Ok(response.status()),
            Err(ureq::Error::Status(status, _)) => Ok(status),
            Err(ureq::Error::Transport(transport)) => Err(transport),
        }
    }

    fn get_ok(&self, path: &str) -> bool {
        match self.get(path, self.timeout) {
            Ok(200) => true,
            Ok(status) => {
                warn!(path, status, "motor request rejected");
                false
            }
            Err(error) => {
                warn!(path, %error, "motor request failed");
                false
            }
        }
    }
}

impl CommandSink for Esp32Sink {
    fn send(&mut self, command: &MotorCommand) -> bool {
        command_paths(command).iter().all(|path| self.get_ok(path))
    }
}

/// Request paths for one command, in send order.
pub fn command_paths(command: &MotorCommand) -> Vec<String> {
    match *command {
        MotorCommand::Direction(direction) => vec![format!("/command?dir={}", direction.token())],
        MotorCommand::Speeds { left, right } => vec![
            format!("/control?motor=A&speed={left}"),
            format!("/control?motor=B&speed={right}"),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blob_pilot::pipeline::Command;
    use std::io::{BufRead, BufReader, Write};
    use std::net::{SocketAddr, TcpListener};
    use std::thread;

    #[test]
    fn speed_pairs_address_both_motors() {
        let paths = command_paths(&MotorCommand::Speeds { left: -69, right: -69 });
        assert_eq!(paths, vec!["/control?motor=A&speed=-69", "/control?motor=B&speed=-69"]);
    }

    #[test]
    fn directions_use_the_command_endpoint() {
        let paths = command_paths(&MotorCommand::Direction(Command::TurnLeft));
        assert_eq!(paths, vec!["/command?dir=TURN_LEFT"]);
    }

    fn serve(responses: Vec<&'static str>) -> (SocketAddr, thread::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for response in responses {
                let (mut stream, _) = listener.accept().expect("accept");
                let mut reader = BufReader::new(stream.try_clone().expect("clone"));
                let mut request_line = String::new();
                reader.read_line(&mut request_line).expect("request line");
                // Drain the headers so closing the socket does not reset it.
                let mut header = String::new();
                while reader.read_line(&mut header).expect("header") > 2 {
                    header.clear();
                }
                seen.push(request_line.trim_end().to_string());
                stream.write_all(response.as_bytes()).expect("respond");
            }
            seen
        });
        (addr, handle)
    }

    #[test]
    fn speed_pair_is_sent_as_two_requests() {
        let ok = "HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
        let (addr, server) = serve(vec![ok, ok]);
        let mut sink = Esp32Sink::new(&addr.to_string());

        assert!(sink.send(&MotorCommand::Speeds { left: 50, right: 50 }));
        assert_eq!(
            server.join().expect("server"),
            vec![
                "GET /control?motor=A&speed=50 HTTP/1.1",
                "GET /control?motor=B&speed=50 HTTP/1.1",
            ]
        );
    }

    #[test]
    fn a_rejected_motor_fails_the_pair() {
        let (addr, server) = serve(vec!["HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"]);
        let mut sink = Esp32Sink::new(&addr.to_string());
        assert!(!sink.send(&MotorCommand::Speeds { left: 0, right: 0 }));
        assert_eq!(server.join().expect("server").len(), 1);
    }

    #[test]
    fn connection_test_hits_the_root_page() {
        let (addr, server) = serve(vec!["HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"]);
        assert!(Esp32Sink::new(&addr.to_string()).test_connection());
        assert_eq!(server.join().expect("server"), vec!["GET / HTTP/1.1"]);
    }

    #[test]
    fn connection_test_fails_when_nobody_listens() {
        let addr = TcpListener::bind("127.0.0.1:0")
            .and_then(|listener| listener.local_addr())
            .expect("free port");
        let mut sink = Esp32Sink::new(&addr.to_string());
        assert!(!sink.test_connection());
        assert!(!sink.send(&MotorCommand::Direction(Command::Stop)));
    }
}
