//! NETCONF session client over the SSH `netconf` subsystem.
//!
//! Lifecycle: Disconnected -> Connected -> Queried -> Closed. The session
//! is released on every exit path: [`close`](NetconfClient::close) is
//! explicit and idempotent, and `Drop` is the backstop for early returns.
//!
//! One connection and one `<get>` per poll cycle serve every instance on
//! the device. Optical devices enforce small concurrent-session limits, so
//! per-instance connections silently starve most instances; the
//! single-query pattern is a hard constraint here, not an optimization.

use std::io::Read;
use std::io::Write as _;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use ssh2::{Channel, Session};

use crate::error::{NetconfError, Result};

/// Default NETCONF-over-SSH port.
pub const DEFAULT_PORT: u16 = 830;

/// RFC 4742 end-of-message delimiter.
const EOM: &str = "]]>]]>";

const BASE_NS: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";

/// A connected NETCONF session.
pub struct NetconfClient {
    _session: Session,
    channel: Channel,
    capabilities: Vec<String>,
    message_id: u32,
    buffer: String,
    timeout: Duration,
    closed: bool,
}

impl NetconfClient {
    /// Connect, authenticate, open the `netconf` subsystem and exchange
    /// hello messages. Connect and all channel I/O are bounded by
    /// `timeout`.
    pub fn connect(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|e| NetconfError::Connection(format!("Cannot resolve {host}:{port}: {e}")))?
            .next()
            .ok_or_else(|| {
                NetconfError::Connection(format!("No address found for {host}:{port}"))
            })?;

        tracing::debug!(host = %host, port = port, "Connecting");

        let stream = TcpStream::connect_timeout(&addr, timeout).map_err(|e| {
            NetconfError::Connection(format!("Failed to connect to {host}:{port}: {e}"))
        })?;

        let mut session = Session::new()?;
        session.set_timeout(timeout.as_millis() as u32);
        session.set_tcp_stream(stream);
        session.handshake()?;

        session
            .userauth_password(username, password)
            .map_err(|_| NetconfError::Auth {
                user: username.to_string(),
            })?;
        if !session.authenticated() {
            return Err(NetconfError::Auth {
                user: username.to_string(),
            });
        }

        let mut channel = session.channel_session()?;
        channel.subsystem("netconf")?;

        let mut client = Self {
            _session: session,
            channel,
            capabilities: Vec::new(),
            message_id: 0,
            buffer: String::new(),
            timeout,
            closed: false,
        };

        let server_hello = client.read_message()?;
        client.capabilities = parse_capabilities(&server_hello);
        client.send_message(&client_hello())?;

        tracing::debug!(
            host = %host,
            capabilities = client.capabilities.len(),
            "NETCONF session established"
        );

        Ok(client)
    }

    /// Server capabilities announced in its hello.
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    /// Issue a subtree-filtered `<get>` and return the raw reply XML.
    ///
    /// An `<rpc-error>` in the reply is a device-side rejection of the
    /// filter and fails the run.
    pub fn get(&mut self, filter: &str) -> Result<String> {
        let message_id = self.next_message_id();
        let rpc = build_get_rpc(message_id, filter);

        tracing::debug!(message_id = message_id, "Sending get request");
        self.send_message(&rpc)?;

        let reply = self.read_message()?;
        check_rpc_reply(&reply)?;
        Ok(reply)
    }

    /// Close the session. Idempotent; also invoked from `Drop`.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let message_id = self.next_message_id();
        // Best effort: devices may drop the channel before replying.
        if let Err(e) = self.send_message(&build_close_rpc(message_id)) {
            tracing::debug!(error = %e, "close-session send failed");
        } else {
            let _ = self.read_message();
        }
        let _ = self.channel.close();

        tracing::debug!("NETCONF session closed");
        Ok(())
    }

    fn next_message_id(&mut self) -> u32 {
        self.message_id += 1;
        self.message_id
    }

    fn send_message(&mut self, message: &str) -> Result<()> {
        self.channel.write_all(message.as_bytes())?;
        self.channel.write_all(EOM.as_bytes())?;
        self.channel.flush()?;
        Ok(())
    }

    /// Read one `]]>]]>`-delimited message, bounded by the configured
    /// timeout.
    fn read_message(&mut self) -> Result<String> {
        let deadline = Instant::now() + self.timeout;
        let mut chunk = [0u8; 4096];

        loop {
            if let Some(message) = take_frame(&mut self.buffer) {
                return Ok(message);
            }
            if Instant::now() >= deadline {
                return Err(NetconfError::Timeout(self.timeout));
            }

            let n = self.channel.read(&mut chunk)?;
            if n == 0 {
                return Err(NetconfError::Connection(
                    "Session closed before end-of-message".into(),
                ));
            }
            self.buffer.push_str(&String::from_utf8_lossy(&chunk[..n]));
        }
    }
}

impl Drop for NetconfClient {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.close();
        }
    }
}

/// Split one complete frame off the front of the buffer, if present.
fn take_frame(buffer: &mut String) -> Option<String> {
    let pos = buffer.find(EOM)?;
    let message = buffer[..pos].trim().to_string();
    buffer.drain(..pos + EOM.len());
    Some(message)
}

/// Extract capability URIs from a server hello.
///
/// Total: an unparseable hello yields no capabilities rather than failing
/// the connect.
fn parse_capabilities(hello: &str) -> Vec<String> {
    let Ok(doc) = roxmltree::Document::parse(hello) else {
        return Vec::new();
    };

    doc.descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "capability")
        .filter_map(|n| n.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Fail on an `<rpc-error>` reply, carrying the device's error message.
fn check_rpc_reply(reply: &str) -> Result<()> {
    let Ok(doc) = roxmltree::Document::parse(reply) else {
        // Unparseable replies are caught downstream; only flag explicit
        // rejections here.
        if reply.contains("<rpc-error") {
            return Err(NetconfError::Protocol("Device returned rpc-error".into()));
        }
        return Ok(());
    };

    let error = doc
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "rpc-error");

    if let Some(error) = error {
        let message = error
            .children()
            .find(|n| n.is_element() && n.tag_name().name() == "error-message")
            .and_then(|n| n.text())
            .map(|t| t.trim().to_string())
            .unwrap_or_else(|| "unspecified rpc-error".to_string());

        return Err(NetconfError::Protocol(format!(
            "Device rejected request: {message}"
        )));
    }

    Ok(())
}

fn client_hello() -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <hello xmlns=\"{BASE_NS}\">\
         <capabilities><capability>{BASE_NS}</capability></capabilities>\
         </hello>"
    )
}

fn build_get_rpc(message_id: u32, filter: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <rpc xmlns=\"{BASE_NS}\" message-id=\"{message_id}\">\
         <get><filter type=\"subtree\">{filter}</filter></get>\
         </rpc>"
    )
}

fn build_close_rpc(message_id: u32) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <rpc xmlns=\"{BASE_NS}\" message-id=\"{message_id}\">\
         <close-session/>\
         </rpc>"
    )
}
