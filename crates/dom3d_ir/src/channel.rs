//! Message channel between realms
//!
//! An [`Endpoint`] is one end of a bidirectional, ordered pipe carrying JSON
//! text frames. Nothing but serialized [`WireMessage`]s crosses it, so two
//! endpoints never share memory beyond the queue itself.

use crate::error::ChannelError;
use crate::message::{MutationRequest, WireMessage};
use crossbeam_channel::{Receiver, Sender, TryRecvError};

/// One end of a message channel
#[derive(Debug)]
pub struct Endpoint {
    outbound: Option<Sender<String>>,
    inbound: Option<Receiver<String>>,
}

impl Endpoint {
    /// Create a connected pair of endpoints
    pub fn pair() -> (Endpoint, Endpoint) {
        let (a_tx, a_rx) = crossbeam_channel::unbounded();
        let (b_tx, b_rx) = crossbeam_channel::unbounded();
        (
            Endpoint {
                outbound: Some(a_tx),
                inbound: Some(b_rx),
            },
            Endpoint {
                outbound: Some(b_tx),
                inbound: Some(a_rx),
            },
        )
    }

    /// Send a message to the peer
    pub fn send(&self, message: &WireMessage) -> Result<(), ChannelError> {
        let outbound = self.outbound.as_ref().ok_or(ChannelError::Closed)?;
        let frame = message.to_json().map_err(ChannelError::Encode)?;
        outbound.send(frame).map_err(|_| ChannelError::Closed)
    }

    /// Send a raw frame; used to exercise malformed input handling
    pub fn send_frame(&self, frame: impl Into<String>) -> Result<(), ChannelError> {
        let outbound = self.outbound.as_ref().ok_or(ChannelError::Closed)?;
        outbound.send(frame.into()).map_err(|_| ChannelError::Closed)
    }

    /// Take the next message if one is queued
    ///
    /// Returns `Ok(None)` when the queue is empty and the peer is still
    /// connected, and [`ChannelError::Closed`] once the peer is gone and the
    /// queue has drained.
    pub fn try_recv(&self) -> Result<Option<WireMessage>, ChannelError> {
        let inbound = self.inbound.as_ref().ok_or(ChannelError::Closed)?;
        match inbound.try_recv() {
            Ok(frame) => decode(&frame).map(Some),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(ChannelError::Closed),
        }
    }

    /// Number of frames waiting to be received
    pub fn pending(&self) -> usize {
        self.inbound.as_ref().map_or(0, Receiver::len)
    }

    /// Close this end; the peer observes `Closed` after draining
    pub fn close(&mut self) {
        self.outbound = None;
        self.inbound = None;
    }

    /// Whether [`Endpoint::close`] has been called
    pub fn is_closed(&self) -> bool {
        self.outbound.is_none()
    }
}

fn decode(frame: &str) -> Result<WireMessage, ChannelError> {
    WireMessage::from_json(frame).map_err(|source| match MutationRequest::salvage(frame) {
        Some((request_id, rejection)) => {
            log::warn!("Malformed request {}: {}", request_id, source);
            ChannelError::MalformedRequest {
                request_id,
                rejection,
                source,
            }
        }
        None => {
            log::warn!("Dropping malformed frame: {}", source);
            ChannelError::Decode(source)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MutationError;
    use crate::message::{MutationResponse, RequestId};

    #[test]
    fn test_pair_delivers_in_order() {
        let (a, b) = Endpoint::pair();
        for i in 0..3 {
            a.send(&MutationResponse::success(RequestId::new(i)).into()).unwrap();
        }
        assert_eq!(b.pending(), 3);
        for i in 0..3 {
            match b.try_recv().unwrap() {
                Some(WireMessage::MutationResponse(r)) => assert_eq!(r.request_id.raw(), i),
                other => panic!("unexpected {:?}", other),
            }
        }
        assert!(b.try_recv().unwrap().is_none());
    }

    #[test]
    fn test_close_is_observed_after_drain() {
        let (mut a, b) = Endpoint::pair();
        a.send(&MutationResponse::success(RequestId::new(1)).into()).unwrap();
        a.close();
        assert!(a.is_closed());
        assert!(matches!(a.send(&MutationResponse::success(RequestId::new(2)).into()), Err(ChannelError::Closed)));
        assert!(b.try_recv().unwrap().is_some());
        assert!(matches!(b.try_recv(), Err(ChannelError::Closed)));
    }

    #[test]
    fn test_malformed_frame_is_decode_error() {
        let (a, b) = Endpoint::pair();
        a.send_frame("{not json").unwrap();
        assert!(matches!(b.try_recv(), Err(ChannelError::Decode(_))));
        assert!(b.try_recv().unwrap().is_none());
    }

    #[test]
    fn test_malformed_request_keeps_its_request_id() {
        let (a, b) = Endpoint::pair();
        a.send_frame(
            r#"{"type":"MutationRequest","requestId":7,"id":1,"property":"metallicFactor","value":{"x":1}}"#,
        )
        .unwrap();
        a.send_frame(r#"{"type":"MutationRequest","requestId":8,"id":"one","property":"metallicFactor","value":0.5}"#)
            .unwrap();
        a.send_frame(r#"{"type":"MutationRequest","requestId":"nine"}"#).unwrap();

        match b.try_recv() {
            Err(ChannelError::MalformedRequest { request_id, rejection, .. }) => {
                assert_eq!(request_id.raw(), 7);
                assert_eq!(rejection, MutationError::UnsupportedMutation);
            }
            other => panic!("unexpected {:?}", other),
        }
        match b.try_recv() {
            Err(ChannelError::MalformedRequest { request_id, rejection, .. }) => {
                assert_eq!(request_id.raw(), 8);
                assert_eq!(rejection, MutationError::UnknownElement);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(b.try_recv(), Err(ChannelError::Decode(_))));
    }
}
