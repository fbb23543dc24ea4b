//! ZeroMQ PUB socket.

use super::{PublishEndpoint, PublishSocket};
use crate::error::{CaptureError, Result};

/// Undelivered messages are dropped immediately on close.
const LINGER_MS: i32 = 0;

/// PUB-pattern socket backed by libzmq.
///
/// One publisher, any number of subscribers, no persistent queue: a
/// subscriber that connects late never sees earlier messages.
pub struct ZmqPublishSocket {
    context: zmq::Context,
    socket: Option<zmq::Socket>,
    last_endpoint: Option<String>,
}

impl ZmqPublishSocket {
    pub fn new() -> Self {
        Self {
            context: zmq::Context::new(),
            socket: None,
            last_endpoint: None,
        }
    }

    /// Endpoint as resolved by libzmq (wildcard ports filled in).
    pub fn last_endpoint(&self) -> Option<&str> {
        self.last_endpoint.as_deref()
    }
}

impl Default for ZmqPublishSocket {
    fn default() -> Self {
        Self::new()
    }
}

impl PublishSocket for ZmqPublishSocket {
    fn bind(&mut self, endpoint: &PublishEndpoint) -> Result<()> {
        self.close();

        let socket = self
            .context
            .socket(zmq::PUB)
            .map_err(|err| CaptureError::bind(endpoint.as_str(), err))?;
        socket
            .set_linger(LINGER_MS)
            .map_err(|err| CaptureError::bind(endpoint.as_str(), err))?;
        socket
            .bind(endpoint.as_str())
            .map_err(|err| CaptureError::bind(endpoint.as_str(), err))?;

        self.last_endpoint = match socket.get_last_endpoint() {
            Ok(Ok(resolved)) => Some(resolved),
            _ => Some(endpoint.to_string()),
        };
        self.socket = Some(socket);
        Ok(())
    }

    fn send(&mut self, payload: &[u8]) -> Result<()> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| CaptureError::Send("socket is not bound".into()))?;
        socket
            .send(payload, 0)
            .map_err(|err| CaptureError::Send(err.to_string()))
    }

    fn close(&mut self) {
        // libzmq closes sockets in the background. Terminating the context
        // waits for the listener to go away, so the endpoint can be bound
        // again right after `close` returns.
        if let Some(socket) = self.socket.take() {
            drop(socket);
            self.context = zmq::Context::new();
        }
        self.last_endpoint = None;
    }

    fn is_bound(&self) -> bool {
        self.socket.is_some()
    }
}
