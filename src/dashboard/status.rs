use crate::api::TransportError;
use crate::model::Health;
use serde_json::Value;

pub const STATUS_LOADING: &str = "Loading runtime status…";

/// Display region for the opaque runtime status object.
#[derive(Debug, Clone)]
pub struct StatusView {
    text: String,
    value: Option<Value>,
    refreshes: u64,
}

impl Default for StatusView {
    fn default() -> Self {
        Self {
            text: STATUS_LOADING.to_string(),
            value: None,
            refreshes: 0,
        }
    }
}

impl StatusView {
    /// Replace the whole display with one settled refresh.
    pub fn apply(&mut self, result: Result<Value, TransportError>) {
        match result {
            Ok(value) => {
                self.text = pretty_json(&value);
                self.value = Some(value);
            }
            Err(e) => {
                self.text = format!(
                    "Error loading runtime status: {e}\nIs the backend running? Start it with `uvicorn backend.app:app`."
                );
                self.value = None;
            }
        }
        self.refreshes += 1;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The status object from the last refresh, if it succeeded.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Number of refreshes that have settled so far.
    pub fn refreshes(&self) -> u64 {
        self.refreshes
    }
}

/// One-line backend liveness indicator.
#[derive(Debug, Clone, Default)]
pub enum HealthView {
    #[default]
    Unknown,
    Online(Health),
    Offline(String),
}

impl HealthView {
    pub fn apply(&mut self, result: Result<Health, TransportError>) {
        *self = match result {
            Ok(h) => HealthView::Online(h),
            Err(e) => HealthView::Offline(e.to_string()),
        };
    }

    pub fn label(&self) -> String {
        match self {
            HealthView::Unknown => "checking…".to_string(),
            HealthView::Online(h) => match h.service.as_deref() {
                Some(service) => format!("{} ({service})", h.status),
                None => h.status.clone(),
            },
            HealthView::Offline(reason) => format!("offline ({reason})"),
        }
    }
}

pub(crate) fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_status_as_indented_json() {
        let mut view = StatusView::default();
        assert_eq!(view.text(), STATUS_LOADING);
        view.apply(Ok(json!({"version": "2.0.0", "initialised": true})));
        assert!(view.text().contains("\"version\": \"2.0.0\""));
        assert!(view.text().contains('\n'));
        assert_eq!(view.refreshes(), 1);
    }

    #[test]
    fn failure_embeds_reason_and_hint() {
        let mut view = StatusView::default();
        view.apply(Err(TransportError::status(502, "bad gateway")));
        assert!(view.text().contains("HTTP 502: bad gateway"));
        assert!(view.text().contains("Is the backend running?"));
    }

    #[test]
    fn later_result_replaces_earlier_one_entirely() {
        let mut view = StatusView::default();
        view.apply(Ok(json!({"mode": "python"})));
        view.apply(Ok(json!({"mode": "micropython"})));
        assert!(view.text().contains("micropython"));
        assert!(!view.text().contains("\"python\""));
    }

    #[test]
    fn health_label_reflects_last_probe() {
        let mut health = HealthView::default();
        assert_eq!(health.label(), "checking…");
        health.apply(Ok(Health {
            status: "ok".into(),
            service: Some("polypi-pure-backend".into()),
        }));
        assert_eq!(health.label(), "ok (polypi-pure-backend)");
        health.apply(Err(TransportError::status(500, "")));
        assert!(health.label().starts_with("offline"));
    }
}
