//! Health probe definitions and outcome evaluation

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Style class for a passing indicator
pub const OK_CLASS: &str = "text-success mr-3";

/// Style class for a failing or erroring indicator
pub const FAIL_CLASS: &str = "text-danger mr-3";

/// How an indicator value is produced from a probe body
#[derive(Debug, Clone, Copy)]
pub enum ProbeValue {
    /// Constant text
    Fixed(&'static str),
    /// Text of a body field, or `fallback` when it is absent
    Field {
        field: &'static str,
        fallback: &'static str,
    },
}

impl ProbeValue {
    pub fn resolve(&self, body: &Value) -> String {
        match self {
            ProbeValue::Fixed(text) => text.to_string(),
            ProbeValue::Field { field, fallback } => match body.get(*field) {
                None | Some(Value::Null) => fallback.to_string(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            },
        }
    }
}

/// One health endpoint and how to judge it
#[derive(Debug, Clone)]
pub struct Probe {
    pub url: &'static str,
    pub element_id: &'static str,
    pub label: &'static str,
    pub check: fn(&Value) -> bool,
    pub ok_value: ProbeValue,
    pub fail_value: ProbeValue,
}

fn status_is(body: &Value, expected: &str) -> bool {
    body.get("status").and_then(Value::as_str) == Some(expected)
}

/// The fixed probe battery, in the order probes are started each tick
pub fn default_probes() -> Vec<Probe> {
    vec![
        Probe {
            url: "/api/alive",
            element_id: "alive-status",
            label: "Alive",
            check: |d| status_is(d, "alive"),
            ok_value: ProbeValue::Fixed("ALIVE"),
            fail_value: ProbeValue::Field {
                field: "status",
                fallback: "DEAD",
            },
        },
        Probe {
            url: "/api/ready",
            element_id: "ready-status",
            label: "Ready",
            check: |d| status_is(d, "ready"),
            ok_value: ProbeValue::Fixed("READY"),
            fail_value: ProbeValue::Field {
                field: "status",
                fallback: "NOT READY",
            },
        },
        Probe {
            url: "/api/liveness",
            element_id: "liveness-status",
            label: "Liveness",
            check: |d| status_is(d, "ok"),
            ok_value: ProbeValue::Fixed("ALIVE"),
            fail_value: ProbeValue::Field {
                field: "status",
                fallback: "DEAD",
            },
        },
        Probe {
            url: "/api/readiness",
            element_id: "readiness-status",
            label: "Readiness",
            check: |d| status_is(d, "ok"),
            ok_value: ProbeValue::Fixed("READY"),
            fail_value: ProbeValue::Field {
                field: "status",
                fallback: "NOT READY",
            },
        },
        Probe {
            url: "/auth/whoami",
            element_id: "whoami-status",
            label: "Whoami",
            check: |d| d.get("user").is_some(),
            ok_value: ProbeValue::Field {
                field: "user",
                fallback: "Unknown Username",
            },
            fail_value: ProbeValue::Fixed("NOT LOGGED IN"),
        },
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorStatus {
    Ok,
    Fail,
    Error,
}

/// What a probe request produced
#[derive(Debug, Clone)]
pub enum ProbeOutcome {
    /// The server answered with a readable body
    Answered { success: bool, body: Value },
    /// Transport failure or unreadable body
    Errored(String),
}

/// Rendered state of one health widget
#[derive(Debug, Clone, Serialize)]
pub struct HealthIndicator {
    pub element_id: String,
    pub label: String,
    pub text: String,
    pub status: IndicatorStatus,
    pub class: String,
    pub checked_at: DateTime<Utc>,
}

impl Probe {
    /// Turn an outcome into indicator state.
    ///
    /// A non-2xx answer or a false predicate is a normal `FAIL` value, and a
    /// non-2xx answer takes the fail value of an empty body. Only a
    /// request that could not complete shows `ERROR`.
    pub fn evaluate(&self, outcome: &ProbeOutcome) -> HealthIndicator {
        let (status, value) = match outcome {
            ProbeOutcome::Answered {
                success: true,
                body,
            } => {
                if (self.check)(body) {
                    (IndicatorStatus::Ok, self.ok_value.resolve(body))
                } else {
                    (IndicatorStatus::Fail, self.fail_value.resolve(body))
                }
            }
            // A non-2xx body is not trusted for the label
            ProbeOutcome::Answered { success: false, .. } => {
                (IndicatorStatus::Fail, self.fail_value.resolve(&Value::Null))
            }
            ProbeOutcome::Errored(_) => (IndicatorStatus::Error, "ERROR".to_string()),
        };

        HealthIndicator {
            element_id: self.element_id.to_string(),
            label: self.label.to_string(),
            text: format!("{}: {}", self.label, value),
            class: match status {
                IndicatorStatus::Ok => OK_CLASS,
                _ => FAIL_CLASS,
            }
            .to_string(),
            status,
            checked_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn probe(label: &str) -> Probe {
        default_probes()
            .into_iter()
            .find(|p| p.label == label)
            .unwrap()
    }

    #[test]
    fn test_declared_order() {
        let urls: Vec<&str> = default_probes().iter().map(|p| p.url).collect();
        assert_eq!(
            urls,
            vec!["/api/alive", "/api/ready", "/api/liveness", "/api/readiness", "/auth/whoami"]
        );
    }

    #[test]
    fn test_success() {
        let indicator = probe("Alive").evaluate(&ProbeOutcome::Answered {
            success: true,
            body: json!({"status": "alive"}),
        });
        assert_eq!(indicator.text, "Alive: ALIVE");
        assert_eq!(indicator.status, IndicatorStatus::Ok);
        assert_eq!(indicator.class, OK_CLASS);
    }

    #[test]
    fn test_fail_echoes_status_field() {
        let indicator = probe("Ready").evaluate(&ProbeOutcome::Answered {
            success: true,
            body: json!({"status": "starting"}),
        });
        assert_eq!(indicator.text, "Ready: starting");
        assert_eq!(indicator.status, IndicatorStatus::Fail);
        assert_eq!(indicator.class, FAIL_CLASS);
    }

    #[test]
    fn test_fail_and_error_render_differently() {
        let liveness = probe("Liveness");
        let failed = liveness.evaluate(&ProbeOutcome::Answered {
            success: true,
            body: json!({}),
        });
        let errored = liveness.evaluate(&ProbeOutcome::Errored("connection refused".into()));

        assert_eq!(failed.text, "Liveness: DEAD");
        assert_eq!(errored.text, "Liveness: ERROR");
        assert!(errored.text.ends_with("ERROR"));
        assert_ne!(failed.text, errored.text);
        assert_eq!(failed.status, IndicatorStatus::Fail);
        assert_eq!(errored.status, IndicatorStatus::Error);
    }

    #[test]
    fn test_non_success_status_is_fail_even_if_body_matches() {
        let indicator = probe("Readiness").evaluate(&ProbeOutcome::Answered {
            success: false,
            body: json!({"status": "ok"}),
        });
        assert_eq!(indicator.status, IndicatorStatus::Fail);
        assert_eq!(indicator.text, "Readiness: NOT READY");
    }

    #[test]
    fn test_whoami_labels() {
        let whoami = probe("Whoami");
        let ok = whoami.evaluate(&ProbeOutcome::Answered {
            success: true,
            body: json!({"user": "operator"}),
        });
        assert_eq!(ok.text, "Whoami: operator");

        let null_user = whoami.evaluate(&ProbeOutcome::Answered {
            success: true,
            body: json!({"user": null}),
        });
        assert_eq!(null_user.text, "Whoami: Unknown Username");

        let anonymous = whoami.evaluate(&ProbeOutcome::Answered {
            success: false,
            body: json!({"detail": "Not authenticated"}),
        });
        assert_eq!(anonymous.text, "Whoami: NOT LOGGED IN");
    }
}
