//! Traffic-violation lookup against the external API.
//!
//! The API takes `{"bienso": <plate>}` and answers with either an `error`
//! string, no/empty `data`, or a `data` list of violation objects keyed by
//! Vietnamese field names. [`classify_response`] turns that into a
//! [`LookupOutcome`]; transport and decode failures are folded into the same
//! type so callers never see an error from this module.
use crate::plate::Plate;
use serde_json::{json, Value};
use std::fmt;
use std::time::{Duration, Instant};

pub const DEFAULT_API_ENDPOINT: &str = "https://api.checkphatnguoi.vn/phatnguoi";

const FIELD_VEHICLE_TYPE: &str = "Loại phương tiện";
const FIELD_TIME: &str = "Thời gian vi phạm";
const FIELD_LOCATION: &str = "Địa điểm vi phạm";
const FIELD_BEHAVIOR: &str = "Hành vi vi phạm";
const FIELD_STATUS: &str = "Trạng thái";
/// Status text the API uses for a fine that has not been dealt with yet.
pub const STATUS_UNRESOLVED: &str = "Chưa xử phạt";
const MISSING: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub vehicle_type: String,
    pub time: String,
    pub location: String,
    pub behavior: String,
    pub status: String,
    pub unresolved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViolationReport {
    pub plate: Plate,
    pub violations: Vec<Violation>,
}

impl ViolationReport {
    pub fn unresolved_count(&self) -> usize {
        self.violations.iter().filter(|v| v.unresolved).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupFailure {
    /// The API answered with an explicit `error` field.
    Api(String),
    /// Network, HTTP or decode failure.
    Transport(String),
}

impl fmt::Display for LookupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupFailure::Api(text) => write!(f, "api error: {text}"),
            LookupFailure::Transport(text) => write!(f, "transport error: {text}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Report(ViolationReport),
    Clean { plate: Plate },
    Failed { plate: Plate, failure: LookupFailure },
}

impl LookupOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            LookupOutcome::Report(_) => "report",
            LookupOutcome::Clean { .. } => "clean",
            LookupOutcome::Failed { .. } => "failed",
        }
    }
}

/// Anything that can answer "what violations does this plate have".
pub trait ViolationLookup {
    fn lookup(&self, plate: &Plate) -> LookupOutcome;
}

/// Classify a decoded API response body.
pub fn classify_response(plate: &Plate, body: &Value) -> LookupOutcome {
    if let Some(error) = body.get("error") {
        return LookupOutcome::Failed {
            plate: plate.clone(),
            failure: LookupFailure::Api(value_text(error)),
        };
    }
    let entries = match body.get("data").and_then(Value::as_array) {
        Some(entries) if !entries.is_empty() => entries,
        _ => {
            return LookupOutcome::Clean {
                plate: plate.clone(),
            }
        }
    };

    let mut violations = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let Some(fields) = entry.as_object() else {
            return LookupOutcome::Failed {
                plate: plate.clone(),
                failure: LookupFailure::Transport(format!(
                    "violation entry {index} is not an object"
                )),
            };
        };
        let field = |name: &str| fields.get(name).map(value_text);
        let status = field(FIELD_STATUS);
        violations.push(Violation {
            vehicle_type: field(FIELD_VEHICLE_TYPE).unwrap_or_else(|| MISSING.to_string()),
            time: field(FIELD_TIME).unwrap_or_else(|| MISSING.to_string()),
            location: field(FIELD_LOCATION).unwrap_or_else(|| MISSING.to_string()),
            behavior: field(FIELD_BEHAVIOR).unwrap_or_else(|| MISSING.to_string()),
            unresolved: status.as_deref() == Some(STATUS_UNRESOLVED),
            status: status.unwrap_or_else(|| MISSING.to_string()),
        });
    }
    LookupOutcome::Report(ViolationReport {
        plate: plate.clone(),
        violations,
    })
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// [`ViolationLookup`] backed by one HTTP POST per plate.
pub struct HttpLookup {
    agent: ureq::Agent,
    endpoint: String,
}

impl HttpLookup {
    pub fn new(endpoint: &str, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            endpoint: endpoint.to_string(),
        }
    }

    fn fetch(&self, plate: &Plate) -> Result<Value, String> {
        let mut response = self
            .agent
            .post(self.endpoint.as_str())
            .header("Accept", "application/json")
            .send_json(json!({ "bienso": plate.as_str() }))
            .map_err(|err| err.to_string())?;
        let status = response.status();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|err| format!("read response body: {err}"))?;
        if !status.is_success() {
            // A failed status only counts as an answer when it names an `error`.
            return match serde_json::from_str::<Value>(&body) {
                Ok(value) if value.get("error").is_some() => Ok(value),
                _ => Err(format!("HTTP {}", status.as_u16())),
            };
        }
        serde_json::from_str(&body).map_err(|err| format!("malformed response: {err}"))
    }
}

impl ViolationLookup for HttpLookup {
    fn lookup(&self, plate: &Plate) -> LookupOutcome {
        let start = Instant::now();
        let outcome = match self.fetch(plate) {
            Ok(body) => classify_response(plate, &body),
            Err(detail) => LookupOutcome::Failed {
                plate: plate.clone(),
                failure: LookupFailure::Transport(detail),
            },
        };
        tracing::info!(
            plate = %plate,
            elapsed_ms = start.elapsed().as_millis() as u64,
            outcome = outcome.kind(),
            "violation lookup complete"
        );
        outcome
    }
}
