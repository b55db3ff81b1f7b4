//! Remote generation service: wire types and the HTTP implementation.

use std::io::{self, Read};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::config::GenerationConfig;
use crate::error::ServiceError;

/// Body of the generation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Base64 PNG of the drawing
    pub imagen: String,
    pub prompt: String,
}

/// Raw status and body returned by the service
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceReply {
    pub status: u16,
    pub body: String,
}

impl ServiceReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Anything that can answer a [`GenerationRequest`].
///
/// Implementations are shared with worker threads, so they must be `Send + Sync`.
pub trait GenerationService: Send + Sync {
    fn generate(&self, request: &GenerationRequest) -> Result<ServiceReply, ServiceError>;
}

/// Blocking HTTP client talking to the generation server. Build one per process.
///
/// Three limits apply to every call: `connect_timeout` for establishing the
/// connection, `read_timeout` for the longest silence while waiting for the
/// status line or the next chunk of body, and `total_timeout` for the whole
/// exchange.
#[derive(Debug)]
pub struct HttpGenerationService {
    client: Client,
    endpoint: String,
    upload_consent: bool,
    connect_timeout: Duration,
    read_timeout: Duration,
    total_timeout: Duration,
}

/// Progress of one exchange, reported by the transfer thread
enum Transfer {
    Status(u16),
    Chunk(Vec<u8>),
    Finished,
    Failed(ServiceError),
}

impl HttpGenerationService {
    pub fn new(config: &GenerationConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.call_timeout())
            .build()?;

        Ok(Self {
            client,
            endpoint: config.server_url.clone(),
            upload_consent: config.upload_consent,
            connect_timeout: config.connect_timeout(),
            read_timeout: config.read_timeout(),
            total_timeout: config.call_timeout(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn total_timeout(&self) -> Duration {
        self.total_timeout
    }
}

impl GenerationService for HttpGenerationService {
    fn generate(&self, request: &GenerationRequest) -> Result<ServiceReply, ServiceError> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if self.upload_consent {
            builder = builder.header("X-Upload-Consent", "true");
        }

        let (sender, receiver) = mpsc::channel();
        let total_timeout = self.total_timeout;
        thread::Builder::new()
            .name("storypaint-http".to_owned())
            .spawn(move || transfer(builder, total_timeout, sender))
            .map_err(|err| ServiceError::Transport(err.to_string()))?;

        let mut status = None;
        let mut body = Vec::new();
        loop {
            match receiver.recv_timeout(self.read_timeout) {
                Ok(Transfer::Status(code)) => status = Some(code),
                Ok(Transfer::Chunk(bytes)) => body.extend_from_slice(&bytes),
                Ok(Transfer::Finished) => break,
                Ok(Transfer::Failed(err)) => return Err(err),
                Err(RecvTimeoutError::Timeout) => {
                    log::warn!("No data from {} for {:?}", self.endpoint, self.read_timeout);
                    return Err(ServiceError::Timeout(self.read_timeout));
                }
                Err(RecvTimeoutError::Disconnected) => return Err(ServiceError::Disconnected),
            }
        }

        let status = status.ok_or(ServiceError::Disconnected)?;
        Ok(ServiceReply {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

/// Sends the request and streams the reply back chunk by chunk.
/// Stops quietly once the receiving side has given up.
fn transfer(builder: RequestBuilder, total_timeout: Duration, events: mpsc::Sender<Transfer>) {
    let classify = |err: reqwest::Error| {
        if err.is_timeout() {
            ServiceError::Timeout(total_timeout)
        } else {
            ServiceError::from(err)
        }
    };

    let mut response = match builder.send() {
        Ok(response) => response,
        Err(err) => {
            let _ = events.send(Transfer::Failed(classify(err)));
            return;
        }
    };
    if events.send(Transfer::Status(response.status().as_u16())).is_err() {
        return;
    }

    let mut buf = [0u8; 8192];
    loop {
        let event = match response.read(&mut buf) {
            Ok(0) => Transfer::Finished,
            Ok(n) => Transfer::Chunk(buf[..n].to_vec()),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => Transfer::Failed(ServiceError::Transport(err.to_string())),
        };
        let last = !matches!(event, Transfer::Chunk(_));
        if events.send(event).is_err() || last {
            return;
        }
    }
}

/// Stand-in used when no HTTP client could be built; every call fails as a transport error.
#[derive(Debug, Default)]
pub struct OfflineService;

impl GenerationService for OfflineService {
    fn generate(&self, _request: &GenerationRequest) -> Result<ServiceReply, ServiceError> {
        Err(ServiceError::Transport("generation service unavailable".to_owned()))
    }
}

/// Fields of a successful reply. Everything else is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct GenerationReply {
    #[serde(default)]
    pub actividad_generada: Option<ActivityField>,
    #[serde(default)]
    pub imagen_generada: Option<String>,
}

impl GenerationReply {
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}

/// The activity arrives either as plain text or as a structured plan
#[derive(Debug, Clone)]
pub enum ActivityField {
    Text(String),
    Plan(ActivityPlan),
    Other(Value),
}

impl<'de> Deserialize<'de> for ActivityField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Only a JSON object can be a plan
        Ok(match Value::deserialize(deserializer)? {
            Value::String(text) => Self::Text(text),
            Value::Object(map) => {
                let value = Value::Object(map);
                match ActivityPlan::deserialize(&value) {
                    Ok(plan) => Self::Plan(plan),
                    Err(_) => Self::Other(value),
                }
            }
            other => Self::Other(other),
        })
    }
}

impl ActivityField {
    /// Readable text, or `None` when there is nothing to show
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text.trim().to_owned()).filter(|text| !text.is_empty()),
            Self::Plan(plan) => plan.render(),
            Self::Other(Value::Array(items)) => {
                let lines: Vec<String> = items
                    .iter()
                    .filter_map(|item| match item {
                        Value::String(text) => Some(text.trim().to_owned()),
                        Value::Null => None,
                        other => Some(other.to_string()),
                    })
                    .filter(|line| !line.is_empty())
                    .collect();
                Some(lines.join("\n")).filter(|text| !text.is_empty())
            }
            Self::Other(Value::Null) => None,
            Self::Other(value) => Some(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ActivityPlan {
    pub titulo: Option<String>,
    pub mision: Option<String>,
    pub instrucciones: Vec<String>,
    pub duracion_minutos: Option<Value>,
    pub materiales: Vec<String>,
    pub reto_extra: Option<String>,
}

impl ActivityPlan {
    fn render(&self) -> Option<String> {
        let mut lines = Vec::new();

        if let Some(title) = non_blank(&self.titulo) {
            lines.push(title.to_owned());
        }
        if let Some(mission) = non_blank(&self.mision) {
            lines.push(format!("Misión: {mission}"));
        }
        if !self.instrucciones.is_empty() {
            lines.push("Instrucciones:".to_owned());
            for (i, step) in self.instrucciones.iter().enumerate() {
                lines.push(format!("{}. {}", i + 1, step));
            }
        }
        match &self.duracion_minutos {
            Some(Value::Number(minutes)) => lines.push(format!("Duración: {minutes} minutos")),
            Some(Value::String(minutes)) if !minutes.trim().is_empty() => {
                lines.push(format!("Duración: {} minutos", minutes.trim()))
            }
            _ => {}
        }
        if !self.materiales.is_empty() {
            lines.push(format!("Materiales: {}", self.materiales.join(", ")));
        }
        if let Some(extra) = non_blank(&self.reto_extra) {
            lines.push(format!("Reto extra: {extra}"));
        }

        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_service_reports_transport_error() {
        let request = GenerationRequest {
            imagen: String::new(),
            prompt: String::new(),
        };
        assert!(matches!(OfflineService.generate(&request), Err(ServiceError::Transport(_))));
    }

    #[test]
    fn test_request_uses_wire_field_names() {
        let request = GenerationRequest {
            imagen: "AAAA".to_owned(),
            prompt: "hola".to_owned(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({ "imagen": "AAAA", "prompt": "hola" }));
    }

    #[test]
    fn test_reply_with_text_activity() {
        let reply = GenerationReply::parse(r#"{"actividad_generada": "Dibuja un sol", "extra": 1}"#).unwrap();
        assert_eq!(reply.actividad_generada.unwrap().to_text().as_deref(), Some("Dibuja un sol"));
        assert!(reply.imagen_generada.is_none());
    }

    #[test]
    fn test_reply_with_structured_activity() {
        let body = r#"{
            "imagen_generada": null,
            "actividad_generada": {
                "titulo": "Actividad creativa",
                "mision": "Inventa una historia corta sobre el dibujo",
                "instrucciones": ["Di un nombre a tu dibujo", "Cuenta una historia en 3 frases"],
                "duracion_minutos": 5,
                "materiales": ["Papel", "Lápices"],
                "reto_extra": "Cambia el final de la historia"
            },
            "modelo_usado": "x"
        }"#;
        let reply = GenerationReply::parse(body).unwrap();
        let text = reply.actividad_generada.unwrap().to_text().unwrap();
        assert!(text.starts_with("Actividad creativa"));
        assert!(text.contains("1. Di un nombre a tu dibujo"));
        assert!(text.contains("Duración: 5 minutos"));
        assert!(text.contains("Materiales: Papel, Lápices"));
        assert!(reply.imagen_generada.is_none());
    }

    #[test]
    fn test_empty_activity_has_no_text() {
        let reply = GenerationReply::parse(r#"{"actividad_generada": "   "}"#).unwrap();
        assert!(reply.actividad_generada.unwrap().to_text().is_none());

        let reply = GenerationReply::parse(r#"{"actividad_generada": {}}"#).unwrap();
        assert!(reply.actividad_generada.unwrap().to_text().is_none());

        let reply = GenerationReply::parse(r#"{"actividad_generada": null}"#).unwrap();
        assert!(reply.actividad_generada.is_none());
    }

    #[test]
    fn test_malformed_body_is_an_error() {
        assert!(GenerationReply::parse("<html>oops</html>").is_err());
    }

    #[test]
    fn test_reply_status_classes() {
        assert!(ServiceReply::new(200, "").is_success());
        assert!(ServiceReply::new(204, "").is_success());
        assert!(!ServiceReply::new(403, "").is_success());
        assert!(!ServiceReply::new(500, "").is_success());
    }

    #[test]
    fn test_http_service_builds_from_config() {
        let service = HttpGenerationService::new(&GenerationConfig::default()).unwrap();
        assert_eq!(service.endpoint(), crate::config::DEFAULT_SERVER_URL);
    }

    #[test]
    fn test_configured_timeouts_reach_the_client() {
        let config = GenerationConfig {
            connect_timeout_secs: 7,
            read_timeout_secs: 11,
            call_timeout_secs: 13,
            ..GenerationConfig::default()
        };
        let service = HttpGenerationService::new(&config).unwrap();
        assert_eq!(service.connect_timeout(), Duration::from_secs(7));
        assert_eq!(service.read_timeout(), Duration::from_secs(11));
        assert_eq!(service.total_timeout(), Duration::from_secs(13));
    }

    /// Local server that sends headers and part of the body, then goes quiet
    fn stalling_server() -> (String, thread::JoinHandle<()>) {
        use std::io::Write;
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/generar_imagen", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0u8; 4096];
            let _ = stream.read(&mut request);
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 100\r\n\r\n{\"act")
                .unwrap();
            stream.flush().unwrap();
            thread::sleep(Duration::from_secs(4));
        });
        (url, handle)
    }

    #[test]
    fn test_stalled_body_hits_read_timeout() {
        let (url, server) = stalling_server();
        let config = GenerationConfig {
            server_url: url,
            read_timeout_secs: 1,
            call_timeout_secs: 30,
            upload_consent: false,
            ..GenerationConfig::default()
        };
        let service = HttpGenerationService::new(&config).unwrap();
        let request = GenerationRequest {
            imagen: "AAAA".to_owned(),
            prompt: "hola".to_owned(),
        };

        let started = std::time::Instant::now();
        let result = service.generate(&request);
        assert!(matches!(result, Err(ServiceError::Timeout(limit)) if limit == Duration::from_secs(1)));
        assert!(started.elapsed() < Duration::from_secs(4));
        server.join().unwrap();
    }

    #[test]
    fn test_array_activity_is_not_a_plan() {
        let reply = GenerationReply::parse(r#"{"actividad_generada": ["Dibuja", "Salta"]}"#).unwrap();
        let field = reply.actividad_generada.unwrap();
        assert!(matches!(field, ActivityField::Other(_)));
        assert_eq!(field.to_text().as_deref(), Some("Dibuja\nSalta"));
    }
}
