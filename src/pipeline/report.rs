use crate::domain::{PriceDisplayMode, ProductCode};

/// How processing of one code ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeOutcome {
    Completed {
        rows: usize,
        mode: PriceDisplayMode,
    },
    /// No product page could be resolved.
    Skipped,
    /// An unexpected, non-fatal error ended this code early.
    Failed(String),
}

/// Per-code outcomes of a run, in processing order.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub outcomes: Vec<(ProductCode, CodeOutcome)>,
}

impl RunReport {
    pub fn record(&mut self, code: ProductCode, outcome: CodeOutcome) {
        self.outcomes.push((code, outcome));
    }

    pub fn rows_written(&self) -> usize {
        self.outcomes
            .iter()
            .map(|(_, outcome)| match outcome {
                CodeOutcome::Completed { rows, .. } => *rows,
                _ => 0,
            })
            .sum()
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, CodeOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, CodeOutcome::Failed(_)))
    }

    /// Codes completed without a confirmed shipping-inclusive display.
    pub fn degraded(&self) -> usize {
        self.count(|o| matches!(o, CodeOutcome::Completed { mode, .. } if !mode.is_confirmed()))
    }

    fn count(&self, pred: impl Fn(&CodeOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}
