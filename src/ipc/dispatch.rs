//! IPC message dispatch — parse s-expressions and route to handlers.

use lexpr::Value;
use tracing::warn;

use crate::state::DaemonState;

/// Parse an s-expression message and dispatch to the appropriate handler.
/// Returns an optional response string (s-expression).
pub fn handle_message(state: &mut DaemonState, client_id: u64, raw: &str) -> Option<String> {
    let value = match lexpr::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!(client_id, "malformed s-expression: {}", e);
            return Some(error_response(0, &format!("malformed s-expression: {e}")));
        }
    };

    let msg_type = get_keyword(&value, "type");
    let msg_id = get_int(&value, "id").unwrap_or(0);

    match msg_type.as_deref() {
        Some("ping") => Some(format!("(:type :response :id {} :status :ok :pong t)", msg_id)),
        Some("status") => Some(ok_payload(msg_id, "status", &state.status_sexp())),
        Some("config") => Some(ok_payload(msg_id, "config", &state.engine.config_sexp())),
        Some("stats") => Some(ok_payload(msg_id, "stats", &state.stats_sexp())),
        Some("reset") => {
            state.engine.reset();
            Some(ok_response(msg_id))
        }
        Some(other) => Some(error_response(msg_id, &format!("unknown message type: {other}"))),
        None => Some(error_response(msg_id, "missing :type")),
    }
}

// ── Helpers ────────────────────────────────────────────────

fn ok_response(id: i64) -> String {
    format!("(:type :response :id {} :status :ok)", id)
}

fn ok_payload(id: i64, key: &str, payload: &str) -> String {
    format!("(:type :response :id {} :status :ok :{} {})", id, key, payload)
}

fn error_response(id: i64, reason: &str) -> String {
    format!(
        "(:type :response :id {} :status :error :reason \"{}\")",
        id,
        escape_string(reason)
    )
}

/// Escape a string for s-expression output.
fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Extract a keyword value from an s-expression plist.
/// Walks cons pairs directly to find `:key` followed by its value.
/// Handles both `Value::Keyword("key")` (elisp parser) and
/// `Value::Symbol(":key")` (default parser) forms.
fn get_keyword(value: &Value, key: &str) -> Option<String> {
    let prefixed = format!(":{}", key);
    let mut current = value;
    loop {
        match current {
            Value::Cons(pair) => {
                let car = pair.car();
                let is_key = match car {
                    Value::Keyword(k) => k.as_ref() == key,
                    Value::Symbol(s) => s.as_ref() == prefixed,
                    _ => false,
                };
                if is_key {
                    // Value is the car of the next cons cell
                    if let Value::Cons(next) = pair.cdr() {
                        let val = next.car();
                        return match val {
                            Value::Keyword(v) => Some(v.to_string()),
                            Value::Symbol(v) => {
                                let s = v.to_string();
                                Some(s.strip_prefix(':').unwrap_or(&s).to_string())
                            }
                            Value::String(v) => Some(v.to_string()),
                            Value::Number(n) => Some(n.to_string()),
                            Value::Bool(b) => Some(if *b { "t" } else { "nil" }.to_string()),
                            Value::Null => Some("nil".to_string()),
                            _ => Some(val.to_string()),
                        };
                    }
                    return None;
                }
                current = pair.cdr();
            }
            _ => break,
        }
    }
    None
}

/// Extract an integer value from an s-expression plist.
fn get_int(value: &Value, key: &str) -> Option<i64> {
    get_keyword(value, key).and_then(|s| s.parse().ok())
}

// ── Tests ──────────────────────────────────────────────────
