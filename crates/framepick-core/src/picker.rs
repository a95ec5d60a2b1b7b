//! Foreground orchestration: picking, rotating and restoring.
//!
//! [`ImagePicker`] remembers the current selection and the user's rotation
//! offset, and turns each request into one background decode through the
//! [`Coordinator`]. Requests made while a decode is in flight are rejected
//! and leave the remembered state untouched.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::config::PickerConfig;
use crate::coordinator::{Coordinator, RunState, Slot, SubmitError, ThreadExecutor};
use crate::decode::{DecodeError, ImageProvider, ImageSource, Origin, Rotation};
use crate::output::{Delivery, OutputAdapter};
use crate::pipeline;
use crate::transform::TargetSpec;

/// Persistable picker state: what was picked and how far it was rotated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PickerState {
    pub source: Option<String>,
    /// Rotation offset in degrees.
    pub rotation: i32,
    pub origin: Origin,
}

impl PickerState {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, Default)]
struct Selection {
    source: Option<ImageSource>,
    rotation: Rotation,
}

pub struct ImagePicker<A: OutputAdapter> {
    provider: Arc<dyn ImageProvider>,
    target: TargetSpec,
    config: Arc<PickerConfig>,
    coordinator: Coordinator,
    adapter: Arc<A>,
    delivery: Arc<dyn Delivery<A::Output>>,
    selection: Mutex<Selection>,
}

impl<A: OutputAdapter> ImagePicker<A> {
    pub fn new(
        provider: Arc<dyn ImageProvider>,
        target: TargetSpec,
        adapter: A,
        delivery: impl Delivery<A::Output> + 'static,
    ) -> Self {
        Self::with_config(provider, target, adapter, delivery, PickerConfig::default())
    }

    /// Picker whose decodes run on a thread named after `config.worker_name`.
    pub fn with_config(
        provider: Arc<dyn ImageProvider>,
        target: TargetSpec,
        adapter: A,
        delivery: impl Delivery<A::Output> + 'static,
        config: PickerConfig,
    ) -> Self {
        let coordinator = Coordinator::new(ThreadExecutor::new(config.worker_name.clone()));
        Self {
            provider,
            target,
            config: Arc::new(config),
            coordinator,
            adapter: Arc::new(adapter),
            delivery: Arc::new(delivery),
            selection: Mutex::new(Selection::default()),
        }
    }

    /// Replace the coordinator, e.g. to run decodes on a tokio runtime.
    pub fn with_coordinator(mut self, coordinator: Coordinator) -> Self {
        self.coordinator = coordinator;
        self
    }

    pub fn target(&self) -> &TargetSpec {
        &self.target
    }

    pub fn config(&self) -> &PickerConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        self.coordinator.state()
    }

    pub fn is_running(&self) -> bool {
        self.coordinator.is_running()
    }

    pub fn source(&self) -> Option<ImageSource> {
        self.selection().source.clone()
    }

    pub fn rotation(&self) -> Rotation {
        self.selection().rotation
    }

    /// Decode a newly picked image. Resets the rotation offset to 0.
    pub fn pick(&self, source: ImageSource) -> Result<(), SubmitError> {
        let slot = self.coordinator.try_acquire()?;
        log::debug!("pick {} ({:?})", source.handle(), source.origin());
        self.commit_and_dispatch(slot, source, Rotation::Deg0)
    }

    /// Turn the current image a further 90 degrees clockwise and decode it
    /// again. Returns the new rotation offset.
    pub fn rotate(&self) -> Result<Rotation, SubmitError> {
        let slot = self.coordinator.try_acquire()?;
        let (source, rotation) = {
            let selection = self.selection();
            let source = selection.source.clone().ok_or(SubmitError::NoSource)?;
            (source, selection.rotation.next())
        };
        log::debug!("rotate {} to {}", source.handle(), rotation.degrees());
        self.commit_and_dispatch(slot, source, rotation)?;
        Ok(rotation)
    }

    /// Decode the current selection again with the current rotation offset.
    ///
    /// Used after [`restore`](Self::restore) to redraw the saved state.
    pub fn refresh(&self) -> Result<(), SubmitError> {
        let slot = self.coordinator.try_acquire()?;
        let (source, rotation) = {
            let selection = self.selection();
            let source = selection.source.clone().ok_or(SubmitError::NoSource)?;
            (source, selection.rotation)
        };
        self.commit_and_dispatch(slot, source, rotation)
    }

    pub fn snapshot(&self) -> PickerState {
        let selection = self.selection();
        PickerState {
            source: selection.source.as_ref().map(|s| s.handle().to_string()),
            rotation: selection.rotation.degrees(),
            origin: selection
                .source
                .as_ref()
                .map(ImageSource::origin)
                .unwrap_or_default(),
        }
    }

    /// Reinstate a saved selection without decoding it.
    ///
    /// A rotation that is not a multiple of 90 is reset to 0.
    pub fn restore(&self, state: PickerState) {
        let rotation = Rotation::from_degrees(state.rotation).unwrap_or_else(|| {
            log::warn!("saved rotation {} is not a quarter turn, using 0", state.rotation);
            Rotation::Deg0
        });
        let mut selection = self.selection();
        selection.source = state
            .source
            .map(|handle| ImageSource::new(handle, state.origin));
        selection.rotation = rotation;
    }

    fn selection(&self) -> MutexGuard<'_, Selection> {
        self.selection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn commit_and_dispatch(
        &self,
        slot: Slot,
        source: ImageSource,
        rotation: Rotation,
    ) -> Result<(), SubmitError> {
        let previous = {
            let mut selection = self.selection();
            std::mem::replace(
                &mut *selection,
                Selection {
                    source: Some(source.clone()),
                    rotation,
                },
            )
        };

        let provider = Arc::clone(&self.provider);
        let config = Arc::clone(&self.config);
        let adapter = Arc::clone(&self.adapter);
        let delivery = Arc::clone(&self.delivery);
        let target = self.target;

        let dispatched = slot.dispatch(
            move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    pipeline::decode(&*provider, &source, &target, rotation, &config)
                        .and_then(|image| adapter.adapt(image))
                }))
                .unwrap_or_else(|payload| {
                    Err(DecodeError::DecodeFailure(format!(
                        "decoder panicked: {}",
                        panic_message(&*payload)
                    )))
                });
                if let Err(e) = &result {
                    log::warn!("decode of {} failed: {}", source.handle(), e);
                }
                (source, result)
            },
            move |(source, result)| delivery.deliver(&source, result),
        );

        if dispatched.is_err() {
            *self.selection() = previous;
        }
        dispatched
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown"
    }
}
