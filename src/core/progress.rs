//! Progress reporting as `(increment_percent, message)` tuples.
//!
//! The engine does not know how progress is shown; the CLI plugs in an
//! indicatif bar, tests plug in a recorder.

use indicatif::ProgressBar;

pub trait Progress
{
    fn report(
        &self,
        increment: u64,
        message: &str,
    );
}

/// Discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl Progress for Silent
{
    fn report(
        &self,
        _increment: u64,
        _message: &str,
    )
    {
    }
}

impl Progress for ProgressBar
{
    fn report(
        &self,
        increment: u64,
        message: &str,
    )
    {
        self.inc(increment);
        self.set_message(message.to_string());
    }
}

/// Turns `done / total` into monotonic percentage increments that add up
/// to exactly 100 once `done == total`.
#[derive(Debug, Clone)]
pub struct PercentSteps
{
    total: usize,
    reported: u64,
}

impl PercentSteps
{
    pub fn new(total: usize) -> Self
    {
        Self { total, reported: 0 }
    }

    /// Increment to report after `done` units finished.
    pub fn advance(
        &mut self,
        done: usize,
    ) -> u64
    {
        let pct = if self.total == 0
        {
            100
        }
        else
        {
            (done.min(self.total) * 100 / self.total) as u64
        };

        let inc = pct.saturating_sub(self.reported);
        self.reported += inc;
        inc
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_percent_steps_sum_to_hundred()
    {
        let mut steps = PercentSteps::new(3);
        let incs: Vec<u64> = (1..=3)
            .map(|d| steps.advance(d))
            .collect();

        assert_eq!(incs, vec![33, 33, 34]);
        assert_eq!(incs.iter().sum::<u64>(), 100);
    }

    #[test]
    fn test_percent_steps_never_go_backwards()
    {
        let mut steps = PercentSteps::new(4);
        assert_eq!(steps.advance(2), 50);
        assert_eq!(steps.advance(1), 0);
        assert_eq!(steps.advance(4), 50);
    }
}
