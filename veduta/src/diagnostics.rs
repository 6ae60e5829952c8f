//! Per-export diagnostics.
//!
//! The pipeline recovers from a lot of conditions locally (unsupported style expressions,
//! degenerate geometry, missing fonts). Each recovery is recorded here so the caller can inspect
//! what was approximated or dropped, instead of grepping logs or relying on global counters.

/// Pipeline stage a diagnostic originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Style,
    Classify,
    Convert,
    Fonts,
    Compose,
}

impl Stage {
    fn label(self) -> &'static str {
        match self {
            Self::Style => "style",
            Self::Classify => "classify",
            Self::Convert => "convert",
            Self::Fonts => "fonts",
            Self::Compose => "compose",
        }
    }
}

/// A single recovered condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub stage: Stage,
    pub message: String,
}

/// Side-effect-free sink for recovered conditions, owned by the caller of an export.
///
/// Entries are also mirrored to [`log`] at debug level, but the sink itself is the contract:
/// two exports of the same snapshot produce the same entries in the same order.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn note(&mut self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        log::debug!("{}: {}", stage.label(), message);
        self.entries.push(Diagnostic { stage, message });
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_keep_insertion_order() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.note(Stage::Classify, "first");
        diagnostics.note(Stage::Convert, "second");

        let messages: Vec<&str> = diagnostics
            .entries()
            .iter()
            .map(|entry| entry.message.as_str())
            .collect();
        assert_eq!(messages, ["first", "second"]);
    }
}
