use super::{PublishEndpoint, PublishSocket};
use crate::codec::encode_jpeg;
use crate::error::{CaptureError, Result};
use crate::frame::Frame;

/// Counters for health logging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PublishStats {
    pub messages_sent: u64,
    pub bytes_sent: u64,
}

/// Encodes frames as JPEG and publishes each one as a single message.
///
/// The publisher is either bound (holds an endpoint and a live socket) or
/// closed; a failed bind leaves it closed.
pub struct FramePublisher<S> {
    socket: S,
    endpoint: Option<PublishEndpoint>,
    stats: PublishStats,
}

impl<S: PublishSocket> FramePublisher<S> {
    pub fn new(socket: S) -> Self {
        Self {
            socket,
            endpoint: None,
            stats: PublishStats::default(),
        }
    }

    pub fn bind(&mut self, endpoint: PublishEndpoint) -> Result<()> {
        if let Some(current) = &self.endpoint {
            return Err(CaptureError::InvalidState(format!(
                "publisher already bound to {}",
                current
            )));
        }
        self.socket.bind(&endpoint)?;
        log::info!("FramePublisher: bound to {}", endpoint);
        self.endpoint = Some(endpoint);
        Ok(())
    }

    /// Close the current socket, if any, and bind at `endpoint`.
    pub fn rebind(&mut self, endpoint: PublishEndpoint) -> Result<()> {
        self.close();
        self.bind(endpoint)
    }

    /// Encode and send one frame. The frame is consumed either way.
    ///
    /// Nothing is sent if encoding fails. Delivery is not acknowledged: with no
    /// subscribers the transport drops the message.
    pub fn publish(&mut self, frame: Frame) -> Result<()> {
        if self.endpoint.is_none() {
            return Err(CaptureError::Send("publisher is not bound".into()));
        }
        let payload = encode_jpeg(&frame)?;
        drop(frame);

        self.socket.send(&payload)?;
        self.stats.messages_sent += 1;
        self.stats.bytes_sent += payload.len() as u64;
        Ok(())
    }

    pub fn close(&mut self) {
        if let Some(endpoint) = self.endpoint.take() {
            self.socket.close();
            log::info!("FramePublisher: closed {}", endpoint);
        }
    }

    pub fn is_bound(&self) -> bool {
        self.endpoint.is_some() && self.socket.is_bound()
    }

    pub fn endpoint(&self) -> Option<&PublishEndpoint> {
        self.endpoint.as_ref()
    }

    pub fn stats(&self) -> PublishStats {
        self.stats
    }

    pub fn socket(&self) -> &S {
        &self.socket
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::MemorySocket;

    fn frame() -> Frame {
        Frame::rgb(vec![64u8; 8 * 8 * 3], 8, 8)
    }

    fn bound_publisher() -> FramePublisher<MemorySocket> {
        let mut publisher = FramePublisher::new(MemorySocket::default());
        publisher
            .bind(PublishEndpoint::all_interfaces(5555))
            .expect("bind");
        publisher
    }

    #[test]
    fn publishes_one_jpeg_message_per_frame() -> Result<()> {
        let mut publisher = bound_publisher();
        publisher.publish(frame())?;
        publisher.publish(frame())?;

        let messages = &publisher.socket().messages;
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m.starts_with(&[0xFF, 0xD8])));
        assert_eq!(publisher.stats().messages_sent, 2);
        assert_eq!(
            publisher.stats().bytes_sent,
            messages.iter().map(|m| m.len() as u64).sum::<u64>()
        );
        Ok(())
    }

    #[test]
    fn publish_after_close_and_bind_succeeds() -> Result<()> {
        let mut publisher = bound_publisher();
        publisher.publish(frame())?;
        publisher.close();
        publisher.bind(PublishEndpoint::all_interfaces(5555))?;
        publisher.publish(frame())?;

        assert_eq!(publisher.socket().messages.len(), 2);
        assert_eq!(publisher.socket().binds.len(), 2);
        Ok(())
    }

    #[test]
    fn corrupt_frame_is_not_sent() {
        let mut publisher = bound_publisher();
        let result = publisher.publish(Frame::rgb(vec![0u8; 5], 8, 8));
        assert!(matches!(result, Err(CaptureError::Encode(_))));
        assert!(publisher.socket().messages.is_empty());
        assert_eq!(publisher.stats().messages_sent, 0);
    }

    #[test]
    fn publishing_unbound_is_a_send_error() {
        let mut publisher = FramePublisher::new(MemorySocket::default());
        assert!(matches!(
            publisher.publish(frame()),
            Err(CaptureError::Send(_))
        ));
    }

    #[test]
    fn transport_failure_is_a_send_error() {
        let mut socket = MemorySocket::default();
        socket.fail_sends = true;
        let mut publisher = FramePublisher::new(socket);
        publisher
            .bind(PublishEndpoint::all_interfaces(5555))
            .expect("bind");
        assert!(matches!(
            publisher.publish(frame()),
            Err(CaptureError::Send(_))
        ));
    }

    #[test]
    fn rebind_moves_to_new_endpoint() -> Result<()> {
        let mut publisher = bound_publisher();
        publisher.rebind(PublishEndpoint::all_interfaces(6000))?;

        assert_eq!(publisher.endpoint().and_then(|e| e.port()), Some(6000));
        assert_eq!(
            publisher.socket().bound_to,
            Some(PublishEndpoint::all_interfaces(6000))
        );
        Ok(())
    }

    #[test]
    fn failed_bind_leaves_publisher_closed() {
        let mut socket = MemorySocket::default();
        socket.busy.push(PublishEndpoint::all_interfaces(6000));
        let mut publisher = FramePublisher::new(socket);
        publisher
            .bind(PublishEndpoint::all_interfaces(5555))
            .expect("bind");

        let result = publisher.rebind(PublishEndpoint::all_interfaces(6000));
        assert!(matches!(result, Err(CaptureError::Bind { .. })));
        assert!(!publisher.is_bound());
        assert!(publisher.endpoint().is_none());
    }

    #[test]
    fn double_bind_is_rejected_and_close_is_idempotent() {
        let mut publisher = bound_publisher();
        assert!(matches!(
            publisher.bind(PublishEndpoint::all_interfaces(5556)),
            Err(CaptureError::InvalidState(_))
        ));
        publisher.close();
        publisher.close();
        assert!(!publisher.is_bound());
    }
}
