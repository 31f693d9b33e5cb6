//! Runtime reinitialisation form and its result region.

use super::status::pretty_json;
use crate::api::TransportError;
use crate::model::{RuntimeConfig, IDES, MODES, TARGETS};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Mode,
    Ide,
    Target,
}

impl FormField {
    pub const ALL: [FormField; 3] = [FormField::Mode, FormField::Ide, FormField::Target];

    pub fn label(self) -> &'static str {
        match self {
            FormField::Mode => "Mode",
            FormField::Ide => "IDE",
            FormField::Target => "Target",
        }
    }

    fn choices(self) -> &'static [&'static str] {
        match self {
            FormField::Mode => MODES,
            FormField::Ide => IDES,
            FormField::Target => TARGETS,
        }
    }
}

/// The three selections the user is editing.
#[derive(Debug, Clone, Default)]
pub struct RuntimeForm {
    mode: usize,
    ide: usize,
    target: usize,
    pub focus: usize,
}

impl RuntimeForm {
    fn index_mut(&mut self, field: FormField) -> &mut usize {
        match field {
            FormField::Mode => &mut self.mode,
            FormField::Ide => &mut self.ide,
            FormField::Target => &mut self.target,
        }
    }

    fn index(&self, field: FormField) -> usize {
        match field {
            FormField::Mode => self.mode,
            FormField::Ide => self.ide,
            FormField::Target => self.target,
        }
    }

    pub fn focused(&self) -> FormField {
        FormField::ALL[self.focus % FormField::ALL.len()]
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % FormField::ALL.len();
    }

    pub fn focus_prev(&mut self) {
        self.focus = (self.focus + FormField::ALL.len() - 1) % FormField::ALL.len();
    }

    /// Cycle the focused field's value forward (`step = 1`) or back (`step = -1`).
    pub fn cycle(&mut self, step: isize) {
        let field = self.focused();
        let n = field.choices().len() as isize;
        let idx = self.index_mut(field);
        *idx = ((*idx as isize + step).rem_euclid(n)) as usize;
    }

    pub fn value(&self, field: FormField) -> &'static str {
        field.choices()[self.index(field)]
    }

    /// Snapshot the selections for one init request.
    pub fn capture(&self) -> RuntimeConfig {
        RuntimeConfig::from_selection(
            self.value(FormField::Mode),
            self.value(FormField::Ide),
            self.value(FormField::Target),
        )
    }
}

/// Result region for the last init request.
#[derive(Debug, Clone, Default)]
pub struct InitView {
    text: Option<String>,
    value: Option<Value>,
    pub in_flight: bool,
}

impl InitView {
    pub fn apply(&mut self, result: &Result<Value, TransportError>) {
        self.in_flight = false;
        self.text = Some(match result {
            Ok(value) => pretty_json(value),
            Err(e) => format!("Initialization failed: {e}"),
        });
        self.value = result.as_ref().ok().cloned();
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_form_captures_python_pure_without_target() {
        let form = RuntimeForm::default();
        assert_eq!(
            form.capture(),
            RuntimeConfig {
                mode: "python".into(),
                ide: "pure".into(),
                target: None,
            }
        );
    }

    #[test]
    fn cycling_wraps_in_both_directions() {
        let mut form = RuntimeForm::default();
        form.focus_next();
        form.focus_next();
        assert_eq!(form.focused(), FormField::Target);
        form.cycle(-1);
        assert_eq!(form.value(FormField::Target), "nrf52");
        form.cycle(1);
        assert_eq!(form.value(FormField::Target), "");
        form.cycle(1);
        assert_eq!(form.capture().target.as_deref(), Some("rp2040"));

        form.focus_prev();
        form.focus_prev();
        form.focus_prev();
        assert_eq!(form.focused(), FormField::Target);
    }

    #[test]
    fn result_region_shows_raw_response_or_error() {
        let mut view = InitView {
            in_flight: true,
            ..Default::default()
        };
        view.apply(&Ok(serde_json::json!({"detail": "[DYTX] ERROR: Invalid mode 'x'."})));
        assert!(!view.in_flight);
        assert!(view.text().unwrap().contains("Invalid mode"));

        view.apply(&Err(TransportError::status(502, "gateway")));
        assert!(view.text().unwrap().starts_with("Initialization failed:"));
    }
}
