//! Transient highlight for autofilled fields.

use std::time::{Duration, Instant};

use super::form::Field;

/// How long autofilled fields stay highlighted.
pub const AUTOFILL_HIGHLIGHT: Duration = Duration::from_millis(1400);

/// Tracks which fields were just autofilled, and until when.
///
/// Purely presentational; starting a new highlight replaces the old one.
#[derive(Debug, Clone, Default)]
pub struct AutofillHighlight {
    fields: Vec<Field>,
    until: Option<Instant>,
}

impl AutofillHighlight {
    /// Highlight `fields` from `now` for [`AUTOFILL_HIGHLIGHT`].
    pub fn start(&mut self, now: Instant, fields: &[Field]) {
        self.fields = fields.to_vec();
        self.until = Some(now + AUTOFILL_HIGHLIGHT);
    }

    /// Whether `field` is highlighted at `now`.
    #[must_use]
    pub fn is_active(&self, field: Field, now: Instant) -> bool {
        self.until.is_some_and(|until| now < until) && self.fields.contains(&field)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
