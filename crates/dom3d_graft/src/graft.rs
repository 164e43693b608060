//! Model graft - the renderer-side half of a model
//!
//! The graft owns the native scene and the correlated graph built over it.
//! It serves snapshots, applies mutation requests from attached kernels to
//! every native object in the target's group, and broadcasts a
//! [`ChangeNotification`] once a mutation has fully landed.
//!
//! Each inbound request gets exactly one [`MutationResponse`], sent before
//! the notification the same mutation produces.

use crate::config::GraftConfig;
use crate::correlation::CorrelatedSceneGraph;
use crate::native::NativeScene;
use dom3d_core::{IdAllocator, LocallyUniqueId, SubscriberId};
use dom3d_ir::{
    codec, ChangeNotification, ChannelError, ElementArena, Endpoint, Mutation, MutationError,
    MutationRequest, MutationResponse, SerializedModel, Value, WireMessage,
};

/// Callback invoked for every change the graft applies
pub type ChangeHandler = Box<dyn Fn(&ChangeNotification) + Send + Sync>;

/// Graft lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraftState {
    Active,
    Deactivated,
}

/// Renderer-side model
pub struct ModelGraft<S: NativeScene> {
    scene: S,
    model_uri: String,
    config: GraftConfig,
    allocator: IdAllocator,
    graph: CorrelatedSceneGraph,
    endpoints: Vec<Endpoint>,
    subscribers: Vec<(SubscriberId, ChangeHandler)>,
    next_subscriber: u64,
    state: GraftState,
}

impl<S: NativeScene> ModelGraft<S> {
    /// Correlate `scene` and wrap it
    pub fn new(scene: S, model_uri: impl Into<String>, config: GraftConfig) -> Self {
        let model_uri = model_uri.into();
        let allocator = IdAllocator::new();
        let graph = CorrelatedSceneGraph::build(&scene, &allocator, &model_uri, config.material_order);
        log::info!("Grafted model '{}' ({} elements)", model_uri, graph.len());

        Self {
            scene,
            model_uri,
            config,
            allocator,
            graph,
            endpoints: Vec::new(),
            subscribers: Vec::new(),
            next_subscriber: 1,
            state: GraftState::Active,
        }
    }

    /// The live element tree backed by the correlated graph
    pub fn model(&self) -> &ElementArena {
        self.graph.arena()
    }

    /// Serialize the current element tree
    pub fn snapshot(&self) -> SerializedModel {
        codec::serialize(self.graph.arena())
    }

    /// The correlated graph
    pub fn graph(&self) -> &CorrelatedSceneGraph {
        &self.graph
    }

    /// The native scene
    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// The native scene, mutable
    ///
    /// Structural edits made here are only picked up by [`rebuild`](Self::rebuild).
    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    /// Graft configuration
    pub fn config(&self) -> &GraftConfig {
        &self.config
    }

    /// Current lifecycle state
    pub fn state(&self) -> GraftState {
        self.state
    }

    /// Number of attached endpoints
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    /// Apply a mutation to every native object behind `id`
    ///
    /// On success the change is dispatched to local subscribers and every
    /// attached endpoint before this returns.
    pub fn mutate(
        &mut self,
        id: LocallyUniqueId,
        property: &str,
        value: &Value,
    ) -> Result<(), MutationError> {
        let notification = self.apply(id, property, value)?;
        self.dispatch(&notification, None);
        Ok(())
    }

    /// Register a change handler
    pub fn subscribe<F>(&mut self, handler: F) -> SubscriberId
    where
        F: Fn(&ChangeNotification) + Send + Sync + 'static,
    {
        let id = SubscriberId(self.next_subscriber);
        self.next_subscriber += 1;
        self.subscribers.push((id, Box::new(handler)));
        id
    }

    /// Remove a change handler
    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
    }

    /// Attach a kernel's channel
    pub fn attach(&mut self, mut endpoint: Endpoint) {
        if self.state == GraftState::Deactivated {
            log::warn!("Refusing endpoint on deactivated graft '{}'", self.model_uri);
            endpoint.close();
            return;
        }
        self.endpoints.push(endpoint);
    }

    /// Handle queued requests on every endpoint
    ///
    /// Returns the number of messages handled. Endpoints whose peer has gone
    /// away are dropped.
    pub fn pump(&mut self) -> usize {
        if self.state == GraftState::Deactivated {
            return 0;
        }

        let limit = self.config.max_messages_per_pump;
        let mut handled = 0;
        let mut index = 0;
        while index < self.endpoints.len() {
            let mut taken = 0;
            let mut closed = false;
            while limit == 0 || taken < limit {
                match self.endpoints[index].try_recv() {
                    Ok(Some(WireMessage::MutationRequest(request))) => {
                        taken += 1;
                        self.handle_request(index, request);
                    }
                    Ok(Some(other)) => {
                        taken += 1;
                        log::debug!("Graft ignoring unexpected {:?}", other);
                    }
                    Ok(None) => break,
                    Err(ChannelError::MalformedRequest {
                        request_id,
                        rejection,
                        ..
                    }) => {
                        taken += 1;
                        let response = MutationResponse::failure(request_id, rejection);
                        if let Err(e) = self.endpoints[index].send(&response.into()) {
                            log::warn!("Failed to answer {}: {}", request_id, e);
                        }
                    }
                    Err(ChannelError::Decode(_)) => taken += 1,
                    Err(e) => {
                        log::debug!("Endpoint {} gone: {}", index, e);
                        closed = true;
                        break;
                    }
                }
            }
            handled += taken;

            if closed {
                self.endpoints.remove(index);
            } else {
                index += 1;
            }
        }
        handled
    }

    /// Re-correlate the native scene
    ///
    /// Every previously issued ID becomes unknown; kernels must be rebuilt
    /// from the returned snapshot.
    pub fn rebuild(&mut self) -> SerializedModel {
        self.graph = CorrelatedSceneGraph::build(
            &self.scene,
            &self.allocator,
            &self.model_uri,
            self.config.material_order,
        );
        log::info!(
            "Rebuilt model '{}' ({} elements, ids from {})",
            self.model_uri,
            self.graph.len(),
            self.graph.model_id()
        );
        self.snapshot()
    }

    /// Tear down; idempotent
    ///
    /// Requests still queued on any endpoint are answered with
    /// [`MutationError::Deactivated`] before the endpoints close.
    pub fn deactivate(&mut self) {
        if self.state == GraftState::Deactivated {
            return;
        }
        self.state = GraftState::Deactivated;

        for endpoint in &mut self.endpoints {
            loop {
                let request_id = match endpoint.try_recv() {
                    Ok(Some(WireMessage::MutationRequest(request))) => request.request_id,
                    Err(ChannelError::MalformedRequest { request_id, .. }) => request_id,
                    Ok(Some(_)) | Err(ChannelError::Decode(_)) => continue,
                    Ok(None) | Err(_) => break,
                };
                let response = MutationResponse::failure(request_id, MutationError::Deactivated);
                if let Err(e) = endpoint.send(&response.into()) {
                    log::debug!("Could not answer {}: {}", request_id, e);
                }
            }
            endpoint.close();
        }
        self.endpoints.clear();
        log::info!("Deactivated graft '{}'", self.model_uri);
    }

    fn handle_request(&mut self, origin: usize, request: MutationRequest) {
        let result = self.apply(request.id, &request.property, &request.value);
        let response = match &result {
            Ok(_) => MutationResponse::success(request.request_id),
            Err(e) => MutationResponse::failure(request.request_id, *e),
        };
        if let Err(e) = self.endpoints[origin].send(&response.into()) {
            log::warn!("Failed to answer {}: {}", request.request_id, e);
        }

        if let Ok(notification) = result {
            let skip = (!self.config.notify_originator).then_some(origin);
            self.dispatch(&notification, skip);
        }
    }

    fn apply(
        &mut self,
        id: LocallyUniqueId,
        property: &str,
        value: &Value,
    ) -> Result<ChangeNotification, MutationError> {
        if self.state == GraftState::Deactivated {
            return Err(MutationError::Deactivated);
        }

        let kind = self.graph.kind_of(id).ok_or_else(|| {
            log::debug!("Mutation of unknown element {}", id);
            MutationError::UnknownElement
        })?;
        let mutation = Mutation::parse(kind, property, value).map_err(|e| {
            log::debug!(
                "{} {} rejected '{}' = {} {:?}",
                kind,
                id,
                property,
                value.type_name(),
                value
            );
            e
        })?;
        let target = self.graph.arena().resolve_target(id, mutation.property())?;
        let group = self.graph.group(target).ok_or(MutationError::UnknownElement)?;

        let mut failed = 0;
        for &handle in &group.members {
            if let Err(e) = self.scene.apply(handle, &mutation) {
                log::warn!("{}", e);
                failed += 1;
            }
        }
        if failed > 0 {
            log::warn!(
                "{} on {} {} reached {} of {} native objects",
                mutation.property(),
                kind,
                id,
                group.len() - failed,
                group.len()
            );
            return Err(MutationError::PartialApplication);
        }

        self.graph.arena_mut().apply(id, &mutation)?;
        Ok(ChangeNotification::new(target, &mutation))
    }

    fn dispatch(&mut self, notification: &ChangeNotification, skip: Option<usize>) {
        for (_, handler) in &self.subscribers {
            handler(notification);
        }

        let message = WireMessage::from(notification.clone());
        for (index, endpoint) in self.endpoints.iter().enumerate() {
            if Some(index) == skip {
                continue;
            }
            if let Err(e) = endpoint.send(&message) {
                log::debug!("Notification not delivered to endpoint {}: {}", index, e);
            }
        }
    }
}
