//! Model kernel - the consumer-side half of a model
//!
//! A kernel is built from a snapshot and one channel endpoint. Facade
//! elements read its arena and route writes through it: each write becomes a
//! [`MutationRequest`] and a [`MutationTicket`]. The kernel's own copy of the
//! value only changes once the graft has acknowledged the write, or when a
//! [`ChangeNotification`] arrives.
//!
//! ```text
//! Active ──deactivate()──► Deactivated
//! ```
//!
//! Same-key writes are last-write-wins: an acknowledged request only updates
//! the local value if no newer request for the same `(element, property)`
//! was sent after it. Every ticket still settles with its own outcome.

use crate::config::KernelConfig;
use crate::facade::Model;
use crate::ticket::{MutationTicket, Resolver};
use dom3d_core::{LocallyUniqueId, SubscriberId};
use dom3d_ir::{
    codec, ChangeNotification, ChannelError, CodecResult, ElementArena, Endpoint, Mutation,
    MutationError, MutationRequest, MutationResponse, Property, RequestId, SerializedModel, Value,
    WireMessage,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Callback invoked for every change notification the kernel applies
pub type ChangeHandler = Arc<dyn Fn(&ChangeNotification) + Send + Sync>;

/// Kernel lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelStatus {
    Active,
    Deactivated,
}

type MutationKey = (LocallyUniqueId, Property);

/// A mutation sent and not yet answered
#[derive(Debug)]
struct PendingMutation {
    /// `None` for an unvalidated request naming an unknown property
    key: Option<MutationKey>,
    /// Typed form to commit on acknowledgement
    mutation: Option<Mutation>,
    resolver: Resolver,
}

struct KernelState {
    arena: ElementArena,
    endpoint: Endpoint,
    config: KernelConfig,
    status: KernelStatus,
    connected: bool,
    next_request: u64,
    pending: BTreeMap<RequestId, PendingMutation>,
    latest: HashMap<MutationKey, RequestId>,
    subscribers: Vec<(SubscriberId, ChangeHandler)>,
    next_subscriber: u64,
}

impl KernelState {
    fn submit(&mut self, id: LocallyUniqueId, property: &str, value: Value) -> MutationTicket {
        if self.status == KernelStatus::Deactivated {
            return MutationTicket::settled(Err(MutationError::Deactivated));
        }
        if !self.connected {
            return MutationTicket::settled(Err(MutationError::ChannelClosed));
        }

        let Some(kind) = self.arena.kind_of(id) else {
            return MutationTicket::settled(Err(MutationError::UnknownElement));
        };
        let mutation = match Mutation::parse(kind, property, &value) {
            Ok(mutation) => Some(mutation),
            Err(e) if self.config.validate_locally => {
                log::debug!("{} {} rejected '{}' locally", kind, id, property);
                return MutationTicket::settled(Err(e));
            }
            Err(_) => None,
        };

        let request_id = RequestId::new(self.next_request);
        self.next_request += 1;

        let message = WireMessage::from(MutationRequest {
            request_id,
            id,
            property: property.to_string(),
            value,
        });
        if let Err(e) = self.endpoint.send(&message) {
            log::warn!("Failed to send {}: {}", request_id, e);
            return match e {
                ChannelError::Closed => {
                    self.close(MutationError::ChannelClosed);
                    MutationTicket::settled(Err(MutationError::ChannelClosed))
                }
                ChannelError::Encode(_)
                | ChannelError::Decode(_)
                | ChannelError::MalformedRequest { .. } => {
                    MutationTicket::settled(Err(MutationError::UnsupportedMutation))
                }
            };
        }

        // Keyed by the record written: a Material's PBR factors share a key
        // with its PBR element
        let key = mutation
            .map(|m| m.property())
            .or_else(|| Property::parse(property))
            .map(|p| (self.arena.resolve_target(id, p).unwrap_or(id), p));
        if let Some(key) = key {
            self.latest.insert(key, request_id);
        }

        let (ticket, resolver) = MutationTicket::pending(request_id);
        self.pending.insert(
            request_id,
            PendingMutation {
                key,
                mutation,
                resolver,
            },
        );
        ticket
    }

    fn settle(&mut self, response: MutationResponse) {
        let Some(pending) = self.pending.remove(&response.request_id) else {
            log::debug!("Response for unknown {}", response.request_id);
            return;
        };
        let request_id = response.request_id;
        let result = response.into_result();

        if let Some(key) = pending.key {
            if self.latest.get(&key) == Some(&request_id) {
                self.latest.remove(&key);
                if let (Ok(()), Some(mutation)) = (result, pending.mutation) {
                    if let Err(e) = self.arena.apply(key.0, &mutation) {
                        log::warn!("Acknowledged {} could not be committed: {}", request_id, e);
                    }
                }
            }
        }
        pending.resolver.settle(result);
    }

    fn notify(&mut self, notification: &ChangeNotification) -> bool {
        let Some(mutation) = notification.mutation() else {
            log::warn!(
                "Dropping notification with malformed {} value for {}",
                notification.property,
                notification.id
            );
            return false;
        };
        match self.arena.apply(notification.id, &mutation) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("Dropping notification for {}: {}", notification.id, e);
                false
            }
        }
    }

    fn close(&mut self, reason: MutationError) {
        self.connected = false;
        self.endpoint.close();
        self.latest.clear();
        let pending = std::mem::take(&mut self.pending);
        if !pending.is_empty() {
            log::info!("Rejecting {} pending mutations: {}", pending.len(), reason);
        }
        for (_, mutation) in pending {
            mutation.resolver.settle(Err(reason));
        }
    }
}

/// Consumer-side model
///
/// Cheap to clone; clones share one kernel.
#[derive(Clone)]
pub struct ModelKernel {
    state: Arc<Mutex<KernelState>>,
}

impl ModelKernel {
    /// Build a kernel from a snapshot
    pub fn new(endpoint: Endpoint, snapshot: SerializedModel) -> CodecResult<Self> {
        Self::with_config(endpoint, snapshot, KernelConfig::default())
    }

    /// Build a kernel from a snapshot with explicit configuration
    pub fn with_config(
        endpoint: Endpoint,
        snapshot: SerializedModel,
        config: KernelConfig,
    ) -> CodecResult<Self> {
        let arena = codec::deserialize(snapshot)?;
        log::debug!(
            "Kernel for '{}' holds {} elements",
            arena.model().model_uri,
            arena.len()
        );

        Ok(Self {
            state: Arc::new(Mutex::new(KernelState {
                arena,
                endpoint,
                config,
                status: KernelStatus::Active,
                connected: true,
                next_request: 1,
                pending: BTreeMap::new(),
                latest: HashMap::new(),
                subscribers: Vec::new(),
                next_subscriber: 1,
            })),
        })
    }

    /// Build a kernel from snapshot JSON
    pub fn from_json(endpoint: Endpoint, json: &str) -> CodecResult<Self> {
        Self::new(endpoint, codec::from_json(json)?)
    }

    /// The facade root
    pub fn model(&self) -> Model {
        let id = self.state.lock().arena.owner_model_id();
        Model::new(id, self.clone())
    }

    /// Send a mutation of `property` on element `id`
    ///
    /// Never blocks. The returned ticket settles on a later [`pump`](Self::pump)
    /// unless the mutation was rejected locally.
    pub fn mutate(&self, id: LocallyUniqueId, property: &str, value: Value) -> MutationTicket {
        self.state.lock().submit(id, property, value)
    }

    /// Handle queued inbound messages
    ///
    /// Returns the number of messages handled.
    pub fn pump(&self) -> usize {
        let (handled, changes, handlers) = {
            let mut state = self.state.lock();
            if state.status == KernelStatus::Deactivated || !state.connected {
                return 0;
            }

            let limit = state.config.max_messages_per_pump;
            let mut handled = 0;
            let mut changes = Vec::new();
            while limit == 0 || handled < limit {
                match state.endpoint.try_recv() {
                    Ok(Some(WireMessage::MutationResponse(response))) => {
                        handled += 1;
                        state.settle(response);
                    }
                    Ok(Some(WireMessage::ChangeNotification(notification))) => {
                        handled += 1;
                        if state.notify(&notification) {
                            changes.push(notification);
                        }
                    }
                    Ok(Some(WireMessage::MutationRequest(request))) => {
                        handled += 1;
                        log::debug!("Kernel ignoring inbound request {}", request.request_id);
                    }
                    Ok(None) => break,
                    // Kernels never answer requests, so a malformed one is just noise
                    Err(ChannelError::Decode(_) | ChannelError::MalformedRequest { .. }) => {
                        handled += 1
                    }
                    Err(e) => {
                        log::info!("Kernel channel ended: {}", e);
                        state.close(MutationError::ChannelClosed);
                        break;
                    }
                }
            }
            let handlers: Vec<ChangeHandler> =
                state.subscribers.iter().map(|(_, h)| Arc::clone(h)).collect();
            (handled, changes, handlers)
        };

        // Handlers run unlocked so they can read facades
        for change in &changes {
            for handler in &handlers {
                handler(change);
            }
        }
        handled
    }

    /// Tear down; idempotent
    ///
    /// Closes the channel and rejects every pending mutation with
    /// [`MutationError::Deactivated`].
    pub fn deactivate(&self) {
        let mut state = self.state.lock();
        if state.status == KernelStatus::Deactivated {
            return;
        }
        state.status = KernelStatus::Deactivated;
        state.close(MutationError::Deactivated);
        log::info!("Deactivated kernel for '{}'", state.arena.model().model_uri);
    }

    /// Whether the kernel still accepts mutations
    pub fn is_active(&self) -> bool {
        self.state.lock().status == KernelStatus::Active
    }

    /// Whether the channel to the graft is still open
    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    /// Current lifecycle state
    pub fn status(&self) -> KernelStatus {
        self.state.lock().status
    }

    /// Number of mutations awaiting a response
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Register a handler for applied change notifications
    pub fn subscribe<F>(&self, handler: F) -> SubscriberId
    where
        F: Fn(&ChangeNotification) + Send + Sync + 'static,
    {
        let mut state = self.state.lock();
        let id = SubscriberId(state.next_subscriber);
        state.next_subscriber += 1;
        state.subscribers.push((id, Arc::new(handler)));
        id
    }

    /// Remove a handler
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.state.lock().subscribers.retain(|(sub_id, _)| *sub_id != id);
    }

    /// Serialize the kernel's current view of the model
    pub fn snapshot(&self) -> SerializedModel {
        codec::serialize(&self.state.lock().arena)
    }

    /// Read the arena under the kernel lock
    pub(crate) fn read<R>(&self, f: impl FnOnce(&ElementArena) -> R) -> R {
        f(&self.state.lock().arena)
    }
}

impl std::fmt::Debug for ModelKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ModelKernel")
            .field("model", &state.arena.owner_model_id())
            .field("status", &state.status)
            .field("pending", &state.pending.len())
            .finish()
    }
}
