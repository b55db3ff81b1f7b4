use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use egui::Color32;
use story_paint::config::GenerationConfig;
use story_paint::error::ServiceError;
use story_paint::{GenerationOutcome, GenerationPipeline, GenerationRequest, GenerationService, PixelBuffer, ServiceReply};

/// Replies with a fixed result and records every request it sees
struct FakeService {
    reply: Box<dyn Fn() -> Result<ServiceReply, ServiceError> + Send + Sync>,
    requests: Mutex<Vec<GenerationRequest>>,
    delay: Duration,
}

impl FakeService {
    fn new(reply: impl Fn() -> Result<ServiceReply, ServiceError> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            reply: Box::new(reply),
            requests: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        })
    }

    fn slow(delay: Duration, reply: impl Fn() -> Result<ServiceReply, ServiceError> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            reply: Box::new(reply),
            requests: Mutex::new(Vec::new()),
            delay,
        })
    }

    fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl GenerationService for FakeService {
    fn generate(&self, request: &GenerationRequest) -> Result<ServiceReply, ServiceError> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        (self.reply)()
    }
}

fn pipeline(service: Arc<FakeService>) -> GenerationPipeline {
    pipeline_with(service, GenerationConfig::default())
}

fn pipeline_with(service: Arc<FakeService>, config: GenerationConfig) -> GenerationPipeline {
    GenerationPipeline::new(service, config)
}

fn blue_drawing() -> PixelBuffer {
    PixelBuffer::new(120, 80, Color32::from_rgb(0, 0, 255))
}

fn long_image_bytes() -> Vec<u8> {
    (0..300u32).map(|i| (i * 37 % 256) as u8).collect()
}

#[test]
fn test_timeout_falls_back_to_local_activity() {
    let service = FakeService::new(|| Err(ServiceError::Timeout(Duration::from_secs(120))));
    let outcome = pipeline(service).run(&blue_drawing());

    match outcome {
        GenerationOutcome::Fallback { activity_text } => {
            assert!(!activity_text.is_empty());
            assert!(activity_text.contains("azul"));
        }
        other => panic!("expected fallback, got {other:?}"),
    }
}

#[test]
fn test_transport_error_falls_back() {
    let service = FakeService::new(|| Err(ServiceError::Transport("connection refused".to_owned())));
    let outcome = pipeline(service).run(&blue_drawing());
    assert_eq!(outcome.kind(), "fallback");
    assert!(outcome.image().is_none());
}

#[test]
fn test_server_error_is_failure() {
    let service = FakeService::new(|| Ok(ServiceReply::new(500, "boom")));
    let outcome = pipeline(service).run(&blue_drawing());

    match outcome {
        GenerationOutcome::Failure { message } => assert!(message.contains("500")),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn test_short_image_is_dropped() {
    let service = FakeService::new(|| {
        Ok(ServiceReply::new(
            200,
            r#"{"actividad_generada": "Dibuja un mar", "imagen_generada": "AAAA"}"#,
        ))
    });
    let outcome = pipeline(service).run(&blue_drawing());

    assert_eq!(
        outcome,
        GenerationOutcome::Success {
            activity_text: "Dibuja un mar".to_owned(),
            image: None,
        }
    );
}

#[test]
fn test_long_image_is_decoded() {
    let encoded = STANDARD.encode(long_image_bytes());
    assert!(encoded.len() > 200);
    let body = serde_json::json!({
        "actividad_generada": "Dibuja un mar",
        "imagen_generada": encoded,
    })
    .to_string();
    let service = FakeService::new(move || Ok(ServiceReply::new(200, body.clone())));

    let outcome = pipeline(service).run(&blue_drawing());
    assert_eq!(outcome.activity_text(), Some("Dibuja un mar"));
    assert_eq!(outcome.image(), Some(long_image_bytes().as_slice()));
}

#[test]
fn test_invalid_base64_image_is_dropped() {
    let garbage = "!".repeat(400);
    let body = serde_json::json!({ "actividad_generada": "Hola", "imagen_generada": garbage }).to_string();
    let service = FakeService::new(move || Ok(ServiceReply::new(200, body.clone())));

    let outcome = pipeline(service).run(&blue_drawing());
    assert_eq!(outcome.kind(), "success");
    assert!(outcome.image().is_none());
}

#[test]
fn test_non_json_success_falls_back() {
    let service = FakeService::new(|| Ok(ServiceReply::new(200, "<html>gateway</html>")));
    let outcome = pipeline(service).run(&blue_drawing());
    assert_eq!(outcome.kind(), "fallback");
}

#[test]
fn test_missing_activity_uses_local_text() {
    let service = FakeService::new(|| Ok(ServiceReply::new(200, "{}")));
    let outcome = pipeline(service).run(&blue_drawing());

    assert_eq!(outcome.kind(), "success");
    let text = outcome.activity_text().unwrap();
    assert!(text.contains("azul"));
}

#[test]
fn test_structured_activity_is_rendered() {
    let body = r#"{"actividad_generada": {"titulo": "Reto", "instrucciones": ["Uno", "Dos"]}}"#;
    let service = FakeService::new(move || Ok(ServiceReply::new(200, body)));
    let outcome = pipeline(service).run(&blue_drawing());

    let text = outcome.activity_text().unwrap();
    assert!(text.starts_with("Reto"));
    assert!(text.contains("1. Uno"));
    assert!(text.contains("2. Dos"));
}

#[test]
fn test_call_deadline_falls_back() {
    let service = FakeService::slow(Duration::from_secs(3), || Ok(ServiceReply::new(200, "{}")));
    let config = GenerationConfig {
        call_timeout_secs: 1,
        ..GenerationConfig::default()
    };

    let outcome = pipeline_with(service, config).run(&blue_drawing());
    assert_eq!(outcome.kind(), "fallback");
}

#[test]
fn test_request_carries_prompt_and_scaled_png() {
    let service = FakeService::new(|| Ok(ServiceReply::new(200, r#"{"actividad_generada": "ok"}"#)));
    pipeline(Arc::clone(&service)).run(&blue_drawing());

    let requests = service.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].prompt.contains("azul"));

    let png = STANDARD.decode(&requests[0].imagen).unwrap();
    let decoded = image::load_from_memory(&png).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (512, 512));
}

#[test]
fn test_blank_canvas_prompt_is_colorful() {
    let service = FakeService::new(|| Ok(ServiceReply::new(200, r#"{"actividad_generada": "ok"}"#)));
    pipeline(Arc::clone(&service)).run(&PixelBuffer::new(50, 50, Color32::WHITE));
    assert!(service.requests()[0].prompt.contains("colorido"));
}

#[test]
fn test_spawn_delivers_once_and_wakes() {
    let service = FakeService::new(|| Ok(ServiceReply::new(200, r#"{"actividad_generada": "Salta"}"#)));
    let wakes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&wakes);

    let mut task = pipeline(service).spawn(blue_drawing(), move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    assert!(task.is_pending());

    let mut outcome = None;
    for _ in 0..500 {
        if let Some(delivered) = task.poll_outcome() {
            outcome = Some(delivered);
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }

    assert_eq!(outcome.unwrap().activity_text(), Some("Salta"));
    assert!(!task.is_pending());
    assert!(task.poll_outcome().is_none());

    // The wake call follows the send; give it a moment
    for _ in 0..100 {
        if wakes.load(Ordering::SeqCst) == 1 {
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(wakes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_wait_blocks_for_outcome() {
    let service = FakeService::new(|| Err(ServiceError::Disconnected));
    let task = pipeline(service).spawn(blue_drawing(), || {});
    let outcome = task.wait().unwrap();
    assert_eq!(outcome.kind(), "fallback");
}
