//!
//! Output-shaping knobs a host can tighten or loosen without touching
//! orchestrator code.
//!
use crate::shaper::ShapeOptions;

#[derive(Clone, Debug)]
pub struct QueryOptions {
    null_as: Option<String>,
    max_rows: usize,
    max_cols: usize,
    soft_row_advisory: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        let defaults = ShapeOptions::default();
        QueryOptions {
            null_as: defaults.null_as,
            max_rows: defaults.max_rows,
            max_cols: defaults.max_cols,
            soft_row_advisory: defaults.soft_row_advisory,
        }
    }
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render null cells as `text` instead of the host's empty-cell sentinel.
    pub fn set_null_as(mut self, text: impl Into<String>) -> Self {
        self.null_as = Some(text.into());
        self
    }

    pub fn set_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn set_max_cols(mut self, max_cols: usize) -> Self {
        self.max_cols = max_cols;
        self
    }

    pub fn set_soft_row_advisory(mut self, soft_row_advisory: usize) -> Self {
        self.soft_row_advisory = soft_row_advisory;
        self
    }

    pub fn to_shape_options(&self) -> ShapeOptions {
        ShapeOptions {
            null_as: self.null_as.clone(),
            max_rows: self.max_rows,
            max_cols: self.max_cols,
            soft_row_advisory: self.soft_row_advisory,
        }
    }
}
