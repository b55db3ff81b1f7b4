use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;

use futures::channel::oneshot;
use uuid::Uuid;

use crate::client::{ActivityField, GenerationReply, GenerationRequest, GenerationService, ServiceReply};
use crate::config::GenerationConfig;
use crate::encode::{decode_base64, encode_snapshot};
use crate::error::{PipelineError, ServiceError};
use crate::raster::PixelBuffer;
use crate::summary::{build_prompt, fallback_activity, summarize, ContentDescriptor};

/// Result of one pipeline invocation
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    /// The service answered; the image is present only when it looked valid
    Success {
        activity_text: String,
        image: Option<Vec<u8>>,
    },
    /// The service could not be used; the text was produced locally
    Fallback { activity_text: String },
    /// The service answered with an error status
    Failure { message: String },
}

impl GenerationOutcome {
    pub fn activity_text(&self) -> Option<&str> {
        match self {
            Self::Success { activity_text, .. } | Self::Fallback { activity_text } => Some(activity_text),
            Self::Failure { .. } => None,
        }
    }

    pub fn image(&self) -> Option<&[u8]> {
        match self {
            Self::Success { image, .. } => image.as_deref(),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Fallback { .. } => "fallback",
            Self::Failure { .. } => "failure",
        }
    }
}

/// Summarize → prompt → encode → call → parse, with a local fallback.
///
/// Cheap to clone; clones share the injected service.
#[derive(Clone)]
pub struct GenerationPipeline {
    service: Arc<dyn GenerationService>,
    config: GenerationConfig,
}

impl std::fmt::Debug for GenerationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationPipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GenerationPipeline {
    pub fn new(service: Arc<dyn GenerationService>, config: GenerationConfig) -> Self {
        Self { service, config }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Runs every step on the calling thread and returns exactly one outcome
    pub fn run(&self, snapshot: &PixelBuffer) -> GenerationOutcome {
        let invocation = Uuid::new_v4();
        log::info!(
            "[{}] Generating activity for {}x{} snapshot",
            invocation,
            snapshot.width(),
            snapshot.height()
        );

        let descriptor = summarize(snapshot);
        let outcome = match self.attempt(invocation, snapshot, &descriptor) {
            Ok(outcome) => outcome,
            Err(err) => {
                log::warn!("[{}] Falling back to local activity: {}", invocation, err);
                GenerationOutcome::Fallback {
                    activity_text: fallback_activity(&descriptor),
                }
            }
        };

        log::info!("[{}] Generation finished: {}", invocation, outcome.kind());
        outcome
    }

    fn attempt(
        &self,
        invocation: Uuid,
        snapshot: &PixelBuffer,
        descriptor: &ContentDescriptor,
    ) -> Result<GenerationOutcome, PipelineError> {
        let prompt = build_prompt(descriptor);
        let imagen = encode_snapshot(snapshot, self.config.upload_size)?;
        log::debug!("[{}] Upload payload: {} base64 chars", invocation, imagen.len());

        let request = GenerationRequest { imagen, prompt };
        let reply = self.call_with_deadline(request)?;
        log::debug!(
            "[{}] HTTP {} -> {}",
            invocation,
            reply.status,
            reply.body.chars().take(200).collect::<String>()
        );

        if !reply.is_success() {
            return Ok(GenerationOutcome::Failure {
                message: format!("Error del servidor {}", reply.status),
            });
        }

        let parsed = GenerationReply::parse(&reply.body)?;
        let activity_text = parsed
            .actividad_generada
            .as_ref()
            .and_then(ActivityField::to_text)
            .unwrap_or_else(|| fallback_activity(descriptor));
        let image = self.accept_image(invocation, parsed.imagen_generada.as_deref());

        Ok(GenerationOutcome::Success { activity_text, image })
    }

    /// Runs the service call on its own thread so the overall deadline holds
    /// even when the transport does not honour its own timeouts.
    fn call_with_deadline(&self, request: GenerationRequest) -> Result<ServiceReply, ServiceError> {
        let deadline = self.config.call_timeout();
        let (sender, receiver) = mpsc::channel();
        let service = Arc::clone(&self.service);

        thread::Builder::new()
            .name("storypaint-call".to_owned())
            .spawn(move || {
                // The receiver is gone if the deadline already passed
                let _ = sender.send(service.generate(&request));
            })
            .map_err(|err| ServiceError::Transport(err.to_string()))?;

        match receiver.recv_timeout(deadline) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(ServiceError::Timeout(deadline)),
            Err(RecvTimeoutError::Disconnected) => Err(ServiceError::Disconnected),
        }
    }

    /// Keeps the returned image only if it is long enough to be a real image and decodes
    fn accept_image(&self, invocation: Uuid, encoded: Option<&str>) -> Option<Vec<u8>> {
        let encoded = encoded?;
        if encoded.len() <= self.config.min_image_len {
            log::warn!(
                "[{}] Returned image is too short ({} chars), showing the activity only",
                invocation,
                encoded.len()
            );
            return None;
        }
        let bytes = decode_base64(encoded);
        if bytes.is_none() {
            log::warn!("[{}] Returned image is not valid base64, showing the activity only", invocation);
        }
        bytes
    }

    /// Runs the pipeline on a worker thread.
    ///
    /// `wake` is called from the worker once the outcome is ready; it must only
    /// schedule the UI thread (e.g. `egui::Context::request_repaint`), which then
    /// collects the outcome with [`GenerationTask::poll_outcome`].
    pub fn spawn<F>(&self, snapshot: PixelBuffer, wake: F) -> GenerationTask
    where
        F: Fn() + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let pipeline = self.clone();

        let spawned = thread::Builder::new()
            .name("storypaint-generation".to_owned())
            .spawn(move || {
                let outcome = pipeline.run(&snapshot);
                if sender.send(outcome).is_err() {
                    log::debug!("Generation task was dropped before its outcome arrived");
                }
                wake();
            });

        // A failed spawn drops the sender, which the task reports as a failure
        if let Err(err) = spawned {
            log::error!("Could not start generation worker: {}", err);
        }

        GenerationTask {
            receiver: Some(receiver),
        }
    }
}

/// Handle to one in-flight invocation. Yields its outcome once.
#[derive(Debug)]
pub struct GenerationTask {
    receiver: Option<oneshot::Receiver<GenerationOutcome>>,
}

impl GenerationTask {
    /// True until the outcome has been handed out
    pub fn is_pending(&self) -> bool {
        self.receiver.is_some()
    }

    /// Non-blocking; call from the UI thread each frame
    pub fn poll_outcome(&mut self) -> Option<GenerationOutcome> {
        let receiver = self.receiver.as_mut()?;
        match receiver.try_recv() {
            Ok(Some(outcome)) => {
                self.receiver = None;
                Some(outcome)
            }
            Ok(None) => None,
            Err(oneshot::Canceled) => {
                self.receiver = None;
                Some(worker_lost())
            }
        }
    }

    /// Blocks until the outcome arrives. `None` if it was already polled.
    /// Not for the UI thread.
    pub fn wait(mut self) -> Option<GenerationOutcome> {
        let receiver = self.receiver.take()?;
        Some(futures::executor::block_on(receiver).unwrap_or_else(|_| worker_lost()))
    }
}

fn worker_lost() -> GenerationOutcome {
    log::error!("Generation worker ended without an outcome");
    GenerationOutcome::Failure {
        message: "La generación se interrumpió".to_owned(),
    }
}
