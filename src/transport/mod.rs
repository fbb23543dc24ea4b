//! Outbound transport for encoded frames.
//!
//! `FramePublisher` turns frames into JPEG messages and hands them to a
//! `PublishSocket`. The production socket is a ZeroMQ PUB socket; tests use
//! an in-memory socket that records every message.

mod endpoint;
mod publisher;
mod zmq_socket;

pub use endpoint::PublishEndpoint;
pub use publisher::{FramePublisher, PublishStats};
pub use zmq_socket::ZmqPublishSocket;

use crate::error::Result;

/// A bindable, fire-and-forget message socket.
pub trait PublishSocket {
    /// Create the socket and bind it. Any previously bound socket is closed
    /// first. On failure the socket is left closed.
    fn bind(&mut self, endpoint: &PublishEndpoint) -> Result<()>;

    /// Queue one discrete message for all current subscribers.
    fn send(&mut self, payload: &[u8]) -> Result<()>;

    /// Release the socket. Safe to call more than once.
    fn close(&mut self);

    fn is_bound(&self) -> bool;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{PublishEndpoint, PublishSocket};
    use crate::error::{CaptureError, Result};

    /// Records messages instead of sending them.
    #[derive(Default)]
    pub(crate) struct MemorySocket {
        pub(crate) bound_to: Option<PublishEndpoint>,
        pub(crate) binds: Vec<PublishEndpoint>,
        pub(crate) messages: Vec<Vec<u8>>,
        /// Endpoints that refuse to bind, as if already in use.
        pub(crate) busy: Vec<PublishEndpoint>,
        pub(crate) fail_sends: bool,
    }

    impl PublishSocket for MemorySocket {
        fn bind(&mut self, endpoint: &PublishEndpoint) -> Result<()> {
            self.close();
            if self.busy.contains(endpoint) {
                return Err(CaptureError::bind(endpoint.as_str(), "address already in use"));
            }
            self.binds.push(endpoint.clone());
            self.bound_to = Some(endpoint.clone());
            Ok(())
        }

        fn send(&mut self, payload: &[u8]) -> Result<()> {
            if self.bound_to.is_none() {
                return Err(CaptureError::Send("socket is not bound".into()));
            }
            if self.fail_sends {
                return Err(CaptureError::Send("transport unavailable".into()));
            }
            self.messages.push(payload.to_vec());
            Ok(())
        }

        fn close(&mut self) {
            self.bound_to = None;
        }

        fn is_bound(&self) -> bool {
            self.bound_to.is_some()
        }
    }
}
