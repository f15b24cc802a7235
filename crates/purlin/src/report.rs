//! Warning delivery.
//!
//! Non-fatal findings are handed to an injected [`Reporter`] rather than a
//! process-wide logger, so callers decide where they go and tests can
//! assert on them.

use std::fmt;
use std::sync::Mutex;

use crate::schema::TableOptions;

/// A non-fatal finding produced by the differ.
///
/// Today the only source is a table whose options differ while its
/// structure does not; the before/after option maps ride along for callers
/// that want more than the rendered text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub table: String,
    pub from: TableOptions,
    pub to: TableOptions,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "No difference of schema configuration for table `{}` but table options differ.",
            self.table
        )?;
        writeln!(f, "  from: {}", self.from.render_map())?;
        write!(f, "    to: {}", self.to.render_map())
    }
}

/// Where warnings go. Injected into the differ at construction time.
pub trait Reporter {
    fn warn(&self, warning: &Warning);
}

/// Logs each warning through `tracing::warn!`. The default reporter.
#[derive(Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn warn(&self, warning: &Warning) {
        tracing::warn!("{warning}");
    }
}

/// Collects warnings for later inspection instead of logging them.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    warnings: Mutex<Vec<Warning>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        CollectingReporter::default()
    }

    pub fn warnings(&self) -> Vec<Warning> {
        self.warnings.lock().unwrap().clone()
    }
}

impl Reporter for CollectingReporter {
    fn warn(&self, warning: &Warning) {
        self.warnings.lock().unwrap().push(warning.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::OptionValue;

    #[test]
    fn warning_renders_both_option_maps() {
        let warning = Warning {
            table: "users".into(),
            from: TableOptions {
                id: Some(OptionValue::Symbol("uuid".into())),
                default: Some(OptionValue::Expr("uuid_generate_v1()".into())),
                ..TableOptions::default()
            },
            to: TableOptions {
                id: Some(OptionValue::Symbol("uuid".into())),
                default: Some(OptionValue::Expr("uuid_generate_v4()".into())),
                ..TableOptions::default()
            },
        };
        assert_eq!(
            warning.to_string(),
            "No difference of schema configuration for table `users` but table options differ.\n  \
             from: {:id=>:uuid, :default=>\"uuid_generate_v1()\"}\n    \
             to: {:id=>:uuid, :default=>\"uuid_generate_v4()\"}"
        );
    }
}
