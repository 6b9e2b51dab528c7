/// Progress update emitted by scans and queue drains.
///
/// Frontends receive these through a callback and turn them into progress
/// bars or log lines; the pipeline itself never prints.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineProgress {
    /// A new phase started (e.g. one media kind of a scan).
    Phase {
        name: String,
        /// Units of work in this phase, when known up front.
        total: Option<u64>,
    },

    /// One unit of work finished.
    Item {
        current: u64,
        total: Option<u64>,
        title: String,
    },

    /// Something worth surfacing for the current item.
    Found { description: String },

    /// The run was interrupted and its session paused.
    Paused,

    Completed,
}

impl PipelineProgress {
    pub fn phase(name: impl Into<String>, total: Option<u64>) -> Self {
        Self::Phase {
            name: name.into(),
            total,
        }
    }

    pub fn item(current: u64, total: Option<u64>, title: impl Into<String>) -> Self {
        Self::Item {
            current,
            total,
            title: title.into(),
        }
    }

    pub fn found(description: impl Into<String>) -> Self {
        Self::Found {
            description: description.into(),
        }
    }

    /// Fraction done (0.0 to 1.0) if calculable.
    pub fn percentage(&self) -> Option<f64> {
        match self {
            Self::Item {
                current,
                total: Some(total),
                ..
            } if *total > 0 => Some(*current as f64 / *total as f64),
            Self::Completed => Some(1.0),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_needs_a_total() {
        assert_eq!(PipelineProgress::item(1, Some(4), "x").percentage(), Some(0.25));
        assert_eq!(PipelineProgress::item(1, None, "x").percentage(), None);
        assert_eq!(PipelineProgress::item(0, Some(0), "x").percentage(), None);
        assert_eq!(PipelineProgress::Completed.percentage(), Some(1.0));
        assert_eq!(PipelineProgress::phase("movies", Some(3)).percentage(), None);
    }
}
