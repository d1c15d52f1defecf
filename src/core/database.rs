//! Cross-reference and tag store lifecycle.
//!
//! `ensure` builds whatever store is missing and nothing else, `rebuild`
//! builds both. A failing step is reported and the other step still runs.
//! Only one build may be in flight; a second request gets `Busy`.

use std::{
    fmt,
    path::PathBuf,
    sync::atomic::{AtomicBool, Ordering},
};

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::core::{
    error::HierarchyError,
    process::{CommandRunner, Invocation, SystemRunner, ensure_parent_dir},
    progress::{PercentSteps, Progress},
    workspace::IndexContext,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStep
{
    CrossReference,
    Tags,
}

impl BuildStep
{
    pub const ALL: [BuildStep; 2] = [BuildStep::CrossReference, BuildStep::Tags];
}

impl fmt::Display for BuildStep
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        match self
        {
            BuildStep::CrossReference => write!(f, "cross-reference"),
            BuildStep::Tags => write!(f, "tag"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DbState
{
    Missing,
    Building,
    Ready,
}

/// What a build request did.
#[derive(Debug, Default)]
pub struct BuildReport
{
    /// Steps that were attempted, in order
    pub ran: Vec<BuildStep>,

    pub failures: Vec<HierarchyError>,
}

impl BuildReport
{
    pub fn is_ok(&self) -> bool
    {
        self.failures
            .is_empty()
    }

    pub fn failed(
        &self,
        step: BuildStep,
    ) -> bool
    {
        self.failures
            .iter()
            .any(|f| matches!(f, HierarchyError::BuildStepFailed { step: s, .. } if *s == step))
    }

    /// True when both stores already existed.
    pub fn skipped(&self) -> bool
    {
        self.ran
            .is_empty()
    }
}

pub struct DatabaseManager<R = SystemRunner>
{
    ctx: IndexContext,
    runner: R,
    building: AtomicBool,
}

/// Clears the in-flight flag when the build ends, however it ends.
struct BuildGuard<'a>(&'a AtomicBool);

impl Drop for BuildGuard<'_>
{
    fn drop(&mut self)
    {
        self.0
            .store(false, Ordering::SeqCst);
    }
}

impl DatabaseManager<SystemRunner>
{
    pub fn new(ctx: IndexContext) -> Self
    {
        Self::with_runner(ctx, SystemRunner)
    }
}

impl<R: CommandRunner> DatabaseManager<R>
{
    pub fn with_runner(
        ctx: IndexContext,
        runner: R,
    ) -> Self
    {
        Self { ctx, runner, building: AtomicBool::new(false) }
    }

    pub fn context(&self) -> &IndexContext
    {
        &self.ctx
    }

    /// Absolute output path of a step.
    pub fn store_path(
        &self,
        step: BuildStep,
    ) -> PathBuf
    {
        match step
        {
            BuildStep::CrossReference => self
                .ctx
                .resolve(&self.ctx.cscope_db),
            BuildStep::Tags => self
                .ctx
                .resolve(&self.ctx.ctags_db),
        }
    }

    pub fn missing_steps(&self) -> Vec<BuildStep>
    {
        BuildStep::ALL
            .into_iter()
            .filter(|s| {
                !self
                    .store_path(*s)
                    .is_file()
            })
            .collect()
    }

    pub fn state(&self) -> DbState
    {
        if self
            .building
            .load(Ordering::SeqCst)
        {
            DbState::Building
        }
        else if self
            .missing_steps()
            .is_empty()
        {
            DbState::Ready
        }
        else
        {
            DbState::Missing
        }
    }

    /// `cscope -Rcbkf <db>` or `ctags --fields=+i -Rno <tags>`.
    pub fn invocation(
        &self,
        step: BuildStep,
    ) -> Invocation
    {
        let root = &self
            .ctx
            .root;

        match step
        {
            BuildStep::CrossReference => Invocation::new(&self.ctx.tools.cscope, root)
                .arg("-Rcbkf")
                .arg(IndexContext::tool_arg(&self.ctx.cscope_db)),
            BuildStep::Tags => Invocation::new(&self.ctx.tools.ctags, root)
                .arg("--fields=+i")
                .arg("-Rno")
                .arg(IndexContext::tool_arg(&self.ctx.ctags_db)),
        }
    }

    /// Build the stores that do not exist yet.
    #[instrument(skip_all)]
    pub fn ensure(
        &self,
        progress: &dyn Progress,
    ) -> Result<BuildReport, HierarchyError>
    {
        let _guard = self.begin()?;
        let missing = self.missing_steps();

        self.run_steps(&missing, progress)
    }

    /// Build both stores regardless of what exists.
    #[instrument(skip_all)]
    pub fn rebuild(
        &self,
        progress: &dyn Progress,
    ) -> Result<BuildReport, HierarchyError>
    {
        let _guard = self.begin()?;

        self.run_steps(&BuildStep::ALL, progress)
    }

    fn begin(&self) -> Result<BuildGuard<'_>, HierarchyError>
    {
        self.building
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| HierarchyError::Busy("database build"))?;

        Ok(BuildGuard(&self.building))
    }

    fn run_steps(
        &self,
        steps: &[BuildStep],
        progress: &dyn Progress,
    ) -> Result<BuildReport, HierarchyError>
    {
        let mut report = BuildReport::default();
        let mut pct = PercentSteps::new(steps.len());

        for (i, step) in steps
            .iter()
            .enumerate()
        {
            report
                .ran
                .push(*step);

            if let Err(e) = self.run_step(*step)
            {
                warn!("{e}");
                report
                    .failures
                    .push(e);
            }

            progress.report(pct.advance(i + 1), &format!("{step} store"));
        }

        info!(ran = report.ran.len(), failed = report.failures.len(), "build finished");
        Ok(report)
    }

    /// Builds report failure through the exit status only; both tools print
    /// progress chatter on stderr.
    fn run_step(
        &self,
        step: BuildStep,
    ) -> Result<(), HierarchyError>
    {
        let failed = |reason: String| HierarchyError::BuildStepFailed { step, reason };

        ensure_parent_dir(&self.store_path(step))
            .map_err(|e| failed(format!("cannot create store directory: {e}")))?;

        let inv = self.invocation(step);
        info!(%step, command = %inv, "building");

        let out = self
            .runner
            .run(&inv)
            .map_err(|e| failed(format!("cannot start `{inv}`: {e}")))?;

        if out.success
        {
            Ok(())
        }
        else
        {
            Err(failed(out.reason()))
        }
    }
}

#[cfg(test)]
mod tests
{
    use std::{cell::RefCell, fs};

    use tempfile::TempDir;

    use super::*;
    use crate::core::process::ProcessOutput;

    /// Records invocations; optionally fails one program.
    #[derive(Default)]
    struct Recorder
    {
        fail_program: Option<&'static str>,
        seen: RefCell<Vec<String>>,
    }

    impl CommandRunner for Recorder
    {
        fn run(
            &self,
            inv: &Invocation,
        ) -> std::io::Result<ProcessOutput>
        {
            self.seen
                .borrow_mut()
                .push(inv.to_string());

            if self
                .fail_program
                .is_some_and(|p| inv.program == PathBuf::from(p))
            {
                return Ok(ProcessOutput::failed("boom"));
            }
            Ok(ProcessOutput::ok(""))
        }
    }

    #[derive(Default)]
    struct Steps(RefCell<Vec<u64>>);

    impl Progress for Steps
    {
        fn report(
            &self,
            increment: u64,
            _message: &str,
        )
        {
            self.0
                .borrow_mut()
                .push(increment);
        }
    }

    fn manager(
        tmp: &TempDir,
        runner: Recorder,
    ) -> DatabaseManager<Recorder>
    {
        DatabaseManager::with_runner(IndexContext::new(tmp.path()), runner)
    }

    #[test]
    fn test_both_present_runs_nothing()
    {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path()
                .join("cscope.out"),
            "",
        )
        .unwrap();
        fs::write(
            tmp.path()
                .join("ctags.out"),
            "",
        )
        .unwrap();

        let mgr = manager(&tmp, Recorder::default());
        assert_eq!(mgr.state(), DbState::Ready);

        let report = mgr
            .ensure(&Steps::default())
            .unwrap();
        assert!(report.skipped());
        assert!(
            mgr.runner
                .seen
                .borrow()
                .is_empty()
        );
    }

    #[test]
    fn test_one_missing_runs_exactly_one_step()
    {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path()
                .join("cscope.out"),
            "",
        )
        .unwrap();

        let mgr = manager(&tmp, Recorder::default());
        assert_eq!(mgr.state(), DbState::Missing);

        let progress = Steps::default();
        let report = mgr
            .ensure(&progress)
            .unwrap();

        assert_eq!(report.ran, vec![BuildStep::Tags]);
        assert_eq!(
            *mgr.runner
                .seen
                .borrow(),
            vec!["ctags --fields=+i -Rno ctags.out".to_string()]
        );
        assert_eq!(*progress.0.borrow(), vec![100]);
    }

    #[test]
    fn test_failed_step_does_not_block_the_other()
    {
        let tmp = TempDir::new().unwrap();
        let mgr = manager(&tmp, Recorder { fail_program: Some("cscope"), ..Recorder::default() });

        let progress = Steps::default();
        let report = mgr
            .rebuild(&progress)
            .unwrap();

        assert_eq!(report.ran, BuildStep::ALL.to_vec());
        assert_eq!(
            report.failures,
            vec![HierarchyError::BuildStepFailed {
                step: BuildStep::CrossReference,
                reason: "boom".into()
            }]
        );
        assert!(report.failed(BuildStep::CrossReference));
        assert!(!report.failed(BuildStep::Tags));
        assert_eq!(
            mgr.runner
                .seen
                .borrow()
                .len(),
            2
        );
        assert_eq!(
            progress
                .0
                .borrow()
                .iter()
                .sum::<u64>(),
            100
        );
    }

    #[test]
    fn test_store_directory_is_created_before_building()
    {
        let tmp = TempDir::new().unwrap();
        let ctx = IndexContext::new(tmp.path())
            .with_databases(".callscope/cscope.out", ".callscope/tags/ctags.out");
        let mgr = DatabaseManager::with_runner(ctx, Recorder::default());

        mgr.rebuild(&Steps::default())
            .unwrap();

        assert!(
            tmp.path()
                .join(".callscope/tags")
                .is_dir()
        );
    }

    #[test]
    fn test_request_while_building_is_rejected()
    {
        let tmp = TempDir::new().unwrap();
        let mgr = manager(&tmp, Recorder::default());

        mgr.building
            .store(true, Ordering::SeqCst);
        assert_eq!(mgr.state(), DbState::Building);

        let err = mgr
            .ensure(&Steps::default())
            .unwrap_err();
        assert_eq!(err, HierarchyError::Busy("database build"));
        assert!(
            mgr.runner
                .seen
                .borrow()
                .is_empty()
        );
    }

    #[test]
    fn test_guard_is_released_after_build()
    {
        let tmp = TempDir::new().unwrap();
        let mgr = manager(&tmp, Recorder::default());

        mgr.rebuild(&Steps::default())
            .unwrap();
        mgr.rebuild(&Steps::default())
            .unwrap();
        assert_ne!(mgr.state(), DbState::Building);
    }
}
