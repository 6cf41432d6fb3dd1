//! Wire protocol codec: parses the line-oriented, HTTP/1.1-shaped request
//! format into a [`ParsedRequest`], and encodes the JSON response body.
//!
//! Pure logic, no I/O — the connection front-end feeds it bytes already
//! read off the socket and gets back a value it turns into a `WorkItem`.

use serde::Serialize;
use serde_json::Value;

/// The outcome of parsing one request.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedRequest {
    /// A `PUT` with a parseable header and a JSON body.
    Push {
        producer_id: String,
        lamport: u64,
        body: Value,
    },
    /// A `GET` with a parseable header.
    Fetch { target_id: String, lamport: u64 },
    /// Anything that could not be turned into a `Push`/`Fetch`: unknown
    /// verb, malformed header, invalid JSON, or a body-less `PUT`.
    Reject { status: u16, reason: String },
}

/// Parses a raw request into a [`ParsedRequest`].
///
/// Never fails: unparseable input becomes `ParsedRequest::Reject` with an
/// appropriate status, per spec (400 for malformed/unknown, 204 for a
/// `PUT` with no body).
#[must_use]
pub fn parse_request(input: &str) -> ParsedRequest {
    let lines: Vec<&str> = input.split('\n').map(|l| l.trim_end_matches('\r')).collect();
    let Some(first_line) = lines.first() else {
        return reject(400, "empty request");
    };

    let verb = match first_line.get(..3) {
        Some("PUT") => Verb::Put,
        Some("GET") => Verb::Get,
        _ => return reject(400, "unknown or missing verb"),
    };

    let Some((target_id, lamport)) = parse_user_agent(&lines) else {
        return reject(400, "missing or malformed User-Agent header");
    };

    match verb {
        Verb::Get => ParsedRequest::Fetch {
            target_id,
            lamport,
        },
        Verb::Put => match extract_body(&lines) {
            BodyExtraction::Missing => reject(204, "PUT with no body"),
            BodyExtraction::Invalid => reject(400, "invalid JSON body"),
            BodyExtraction::Present(body) => ParsedRequest::Push {
                producer_id: target_id,
                lamport,
                body,
            },
        },
    }
}

enum Verb {
    Put,
    Get,
}

fn reject(status: u16, reason: &str) -> ParsedRequest {
    ParsedRequest::Reject {
        status,
        reason: reason.to_string(),
    }
}

/// Finds the `User-Agent:` line and extracts `(id, lamport)` from fields
/// `[2]` and `[3]` of its whitespace split. A line with fewer than 4
/// fields, or a non-integer field `[3]`, is invalid.
fn parse_user_agent(lines: &[&str]) -> Option<(String, u64)> {
    let line = lines
        .iter()
        .find(|l| l.starts_with("User-Agent:"))?;
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 4 {
        return None;
    }
    let id = fields[2].to_string();
    let lamport = fields[3].parse::<u64>().ok()?;
    Some((id, lamport))
}

enum BodyExtraction {
    Missing,
    Invalid,
    Present(Value),
}

/// The JSON body begins at the first line whose first character is `{`
/// and runs to the end of the message; all such content is concatenated
/// and parsed as one JSON value.
fn extract_body(lines: &[&str]) -> BodyExtraction {
    let Some(start) = lines.iter().position(|l| l.starts_with('{')) else {
        return BodyExtraction::Missing;
    };
    let joined = lines[start..].join("\n");
    match serde_json::from_str(&joined) {
        Ok(value) => BodyExtraction::Present(value),
        Err(_) => BodyExtraction::Invalid,
    }
}

/// Wire shape of the always-present response envelope.
#[derive(Debug, Serialize)]
struct ResponseBody<'a> {
    #[serde(rename = "statusCode")]
    status_code: u16,
    msg: String,
    #[serde(rename = "lamportClock")]
    lamport_clock: u64,
    #[serde(rename = "weatherData", skip_serializing_if = "Option::is_none")]
    weather_data: Option<&'a Value>,
}

/// Encodes a response as the JSON object spec'd in the wire protocol.
///
/// `weather_data` should only be `Some` for a successful `FETCH`.
#[must_use]
pub fn encode_response(status: u16, msg: &str, lamport: u64, weather_data: Option<&Value>) -> Vec<u8> {
    let body = ResponseBody {
        status_code: status,
        msg: msg.to_string(),
        lamport_clock: lamport,
        weather_data,
    };
    serde_json::to_vec(&body).expect("ResponseBody serialization is infallible")
}
