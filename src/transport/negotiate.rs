//! Header checks performed before a body is handed to the server instance

use axum::http::{header, HeaderMap};

const JSON: &str = "application/json";
const EVENT_STREAM: &str = "text/event-stream";

/// Response modes the client is willing to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptedModes {
    pub json: bool,
    pub event_stream: bool,
}

impl AcceptedModes {
    pub fn any(self) -> bool {
        self.json || self.event_stream
    }
}

/// Reads the `Accept` header. A missing or empty header admits both modes, as do
/// wildcard ranges; ranges with `q=0` are refused.
pub fn accepted_modes(headers: &HeaderMap) -> AcceptedModes {
    let values: Vec<&str> = headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|range| !range.is_empty())
        .collect();

    if values.is_empty() {
        return AcceptedModes {
            json: true,
            event_stream: true,
        };
    }

    let mut modes = AcceptedModes {
        json: false,
        event_stream: false,
    };
    for range in values {
        let mut parts = range.split(';').map(str::trim);
        let media = parts.next().unwrap_or_default().to_ascii_lowercase();
        if parts.any(is_zero_quality) {
            continue;
        }

        match media.as_str() {
            "*/*" => {
                modes.json = true;
                modes.event_stream = true;
            }
            JSON | "application/*" => modes.json = true,
            EVENT_STREAM | "text/*" => modes.event_stream = true,
            _ => {}
        }
    }
    modes
}

fn is_zero_quality(param: &str) -> bool {
    let Some((name, value)) = param.split_once('=') else {
        return false;
    };
    name.trim().eq_ignore_ascii_case("q")
        && value.trim().parse::<f32>().map(|q| q <= 0.0).unwrap_or(false)
}

pub fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|media| media.trim().eq_ignore_ascii_case(JSON))
        .unwrap_or(false)
}
