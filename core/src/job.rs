//! Bulk operations decomposed into individually timed tasks.
//!
//! A [`ProgressJob`] turns a count into a [`Job`] holding one [`Task`] per
//! unit of work (`setup`), then works through the tasks (`run`). Each task
//! records when it started and ended, and every completed task bumps the
//! job's progress counter and notifies a [`ProgressReporter`].
//!
//! Task lifecycle: `Pending -> Running -> Done`, or `Running -> Failed` when
//! the domain operation returns an error.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::error::{BenchError, BenchResult};
use crate::result::format_duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Done,
    Failed,
}

impl TaskState {
    pub fn name(&self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Done => "done",
            TaskState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Done | TaskState::Failed)
    }
}

#[derive(Debug, Clone)]
pub struct Task {
    id: String,
    magnitude: u64,
    state: TaskState,
    started: Option<Instant>,
    ended: Option<Instant>,
}

impl Task {
    pub fn new(id: impl Into<String>, magnitude: u64) -> Self {
        Self {
            id: id.into(),
            magnitude,
            state: TaskState::Pending,
            started: None,
            ended: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn magnitude(&self) -> u64 {
        self.magnitude
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started
    }

    pub fn ended_at(&self) -> Option<Instant> {
        self.ended
    }

    /// Time between start and end, once the task is done.
    pub fn duration(&self) -> Option<Duration> {
        Some(self.ended?.duration_since(self.started?))
    }

    fn transition(&mut self, from: TaskState, to: TaskState) -> BenchResult<()> {
        if self.state != from {
            return Err(BenchError::TaskState {
                id: self.id.clone(),
                from: self.state.name(),
                to: to.name(),
            });
        }
        self.state = to;
        Ok(())
    }

    pub fn start(&mut self) -> BenchResult<()> {
        self.transition(TaskState::Pending, TaskState::Running)?;
        self.started = Some(Instant::now());
        Ok(())
    }

    pub fn end(&mut self) -> BenchResult<()> {
        self.transition(TaskState::Running, TaskState::Done)?;
        self.ended = Some(Instant::now());
        Ok(())
    }

    /// Mark a running task as failed. The end timestamp stays unset.
    pub fn fail(&mut self) -> BenchResult<()> {
        self.transition(TaskState::Running, TaskState::Failed)
    }
}

/// Consumer of progress notifications, e.g. a progress bar.
pub trait ProgressReporter: Send + Sync {
    fn start(&self, _job: &str, _total: u64) {}

    /// Called after each completed task with the running completed magnitude.
    fn increment(&self, job: &str, done: u64, total: u64);

    fn finish(&self, _job: &str, _summary: &JobSummary) {}
}

/// Discards every notification.
#[derive(Debug, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn increment(&self, _job: &str, _done: u64, _total: u64) {}
}

/// Reports through `log` every time another tenth of the job completes.
#[derive(Debug, Default)]
pub struct LogProgress {
    last_decile: AtomicU64,
}

impl ProgressReporter for LogProgress {
    fn start(&self, job: &str, total: u64) {
        self.last_decile.store(0, Ordering::Relaxed);
        log::info!("{job}: starting {total} tasks");
    }

    fn increment(&self, job: &str, done: u64, total: u64) {
        if total == 0 {
            return;
        }
        let decile = done * 10 / total;
        if self.last_decile.fetch_max(decile, Ordering::Relaxed) < decile {
            log::info!("{job}: {}% ({done}/{total})", decile * 10);
        }
    }

    fn finish(&self, job: &str, summary: &JobSummary) {
        log::info!("{job}: {summary}");
    }
}

/// What `run_tasks` does when a task's operation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskFailurePolicy {
    /// Return the first failure immediately, leaving later tasks pending.
    #[default]
    Abort,
    /// Run every task, then report how many failed.
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Tasks exist but none has started.
    Populated,
    Running,
    Completed,
    /// Every task finished and at least one failed.
    Failed,
}

pub struct Job {
    name: String,
    tasks: HashMap<String, Task>,
    progress: u64,
    reporter: Arc<dyn ProgressReporter>,
}

impl Job {
    /// Build a job from its tasks. Task ids must be unique.
    pub fn new(name: impl Into<String>, tasks: Vec<Task>) -> BenchResult<Self> {
        let name = name.into();
        let mut by_id = HashMap::with_capacity(tasks.len());
        for task in tasks {
            if by_id.contains_key(task.id()) {
                return Err(BenchError::InvalidInput(format!(
                    "job {name}: duplicate task id {}",
                    task.id()
                )));
            }
            by_id.insert(task.id.clone(), task);
        }
        Ok(Self {
            name,
            tasks: by_id,
            progress: 0,
            reporter: Arc::new(NoProgress),
        })
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// Tasks in unspecified order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// Completed magnitude so far.
    pub fn progress(&self) -> u64 {
        self.progress
    }

    pub fn total_magnitude(&self) -> u64 {
        self.tasks.values().map(Task::magnitude).sum()
    }

    pub fn state(&self) -> JobState {
        let mut started = false;
        let mut all_terminal = true;
        let mut any_failed = false;
        for task in self.tasks.values() {
            let state = task.state();
            started |= state != TaskState::Pending;
            all_terminal &= state.is_terminal();
            any_failed |= state == TaskState::Failed;
        }
        match (started, all_terminal, any_failed) {
            (false, _, _) if !self.tasks.is_empty() => JobState::Populated,
            (_, true, true) => JobState::Failed,
            (_, true, false) => JobState::Completed,
            _ => JobState::Running,
        }
    }

    /// Run `op` once per task, in unspecified order.
    ///
    /// Each task is started before `op` is called with its id and ended
    /// once `op` returns `Ok`; progress is then advanced by the task's
    /// magnitude. A failing task is marked failed and handled per `policy`.
    pub fn run_tasks<F>(&mut self, policy: TaskFailurePolicy, mut op: F) -> BenchResult<()>
    where
        F: FnMut(&str) -> BenchResult<()>,
    {
        let Job {
            name,
            tasks,
            progress,
            reporter,
        } = self;
        let total: u64 = tasks.values().map(Task::magnitude).sum();
        let task_count = tasks.len();
        let mut failed = 0;
        let mut first_failure = None;

        for (id, task) in tasks.iter_mut() {
            if task.state() != TaskState::Pending {
                continue;
            }
            task.start()?;
            match op(id) {
                Ok(()) => {
                    task.end()?;
                    *progress += task.magnitude();
                    reporter.increment(name.as_str(), *progress, total);
                }
                Err(source) => {
                    task.fail()?;
                    let err = BenchError::Task {
                        id: id.clone(),
                        source: Box::new(source),
                    };
                    match policy {
                        TaskFailurePolicy::Abort => return Err(err),
                        TaskFailurePolicy::Continue => {
                            failed += 1;
                            first_failure.get_or_insert(err);
                        }
                    }
                }
            }
        }

        match first_failure {
            None => Ok(()),
            Some(first) => Err(BenchError::TasksFailed {
                failed,
                total: task_count,
                first: Box::new(first),
            }),
        }
    }

    pub fn summary(&self, elapsed: Duration) -> JobSummary {
        let durations: Vec<(&str, Duration)> = self
            .tasks
            .values()
            .filter_map(|t| Some((t.id(), t.duration()?)))
            .collect();
        let failed = self
            .tasks
            .values()
            .filter(|t| t.state() == TaskState::Failed)
            .count();
        let mean_task = if durations.is_empty() {
            None
        } else {
            let sum: Duration = durations.iter().map(|(_, d)| *d).sum();
            Some(sum / durations.len() as u32)
        };
        let slowest = durations
            .iter()
            .max_by_key(|(_, d)| *d)
            .map(|(id, d)| (id.to_string(), *d));

        JobSummary {
            name: self.name.clone(),
            tasks: self.tasks.len(),
            completed: durations.len(),
            failed,
            elapsed,
            mean_task,
            slowest,
        }
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("tasks", &self.tasks.len())
            .field("progress", &self.progress)
            .finish_non_exhaustive()
    }
}

/// Per-task timing digest of a finished (or aborted) job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSummary {
    pub name: String,
    pub tasks: usize,
    pub completed: usize,
    pub failed: usize,
    pub elapsed: Duration,
    pub mean_task: Option<Duration>,
    pub slowest: Option<(String, Duration)>,
}

impl std::fmt::Display for JobSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} tasks done, {} failed in {}",
            self.completed,
            self.tasks,
            self.failed,
            format_duration(self.elapsed, 2)
        )?;
        if let Some(mean) = self.mean_task {
            write!(f, ", mean {}", format_duration(mean, 2))?;
        }
        if let Some((id, d)) = &self.slowest {
            write!(f, ", slowest #{id} {}", format_duration(*d, 2))?;
        }
        Ok(())
    }
}

/// Build a job holding one magnitude-1 task per unit, ids `"0"..="count"`.
///
/// The upper bound is inclusive, so a count of `n` yields `n + 1` tasks.
pub fn setup_counted_job(name: &str, count: i64) -> BenchResult<Job> {
    if count < 0 {
        return Err(BenchError::InvalidInput(format!(
            "job {name}: expected a non-negative task count, got {count}"
        )));
    }
    let tasks = (0..=count).map(|i| Task::new(i.to_string(), 1)).collect();
    Job::new(name, tasks)
}

/// A bulk operation driven as a job: `setup` builds the tasks from a count,
/// `run` performs them against `I` (typically a connection).
pub trait ProgressJob<I: ?Sized> {
    fn setup(&self, name: &str, count: i64) -> BenchResult<Job> {
        setup_counted_job(name, count)
    }

    fn run(&self, job: &mut Job, input: &I) -> BenchResult<()>;
}

/// Set up and run `job` end to end, reporting progress to `reporter`.
///
/// Returns the timing summary when every task succeeded; otherwise the
/// error from `run` (the summary is still handed to the reporter).
pub fn run_job<I, J>(
    name: &str,
    job: &J,
    count: i64,
    input: &I,
    reporter: Arc<dyn ProgressReporter>,
) -> BenchResult<JobSummary>
where
    I: ?Sized,
    J: ProgressJob<I> + ?Sized,
{
    let mut tracked = job.setup(name, count)?.with_reporter(reporter.clone());
    reporter.start(name, tracked.total_magnitude());

    let started = Instant::now();
    let outcome = job.run(&mut tracked, input);
    let summary = tracked.summary(started.elapsed());
    reporter.finish(name, &summary);

    outcome.map(|()| summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::thread;

    #[derive(Default)]
    struct Recorder {
        increments: Mutex<Vec<(u64, u64)>>,
        finished: Mutex<Option<JobSummary>>,
    }

    impl ProgressReporter for Recorder {
        fn increment(&self, _job: &str, done: u64, total: u64) {
            self.increments.lock().unwrap().push((done, total));
        }

        fn finish(&self, _job: &str, summary: &JobSummary) {
            *self.finished.lock().unwrap() = Some(summary.clone());
        }
    }

    struct SleepJob;

    impl ProgressJob<Duration> for SleepJob {
        fn run(&self, job: &mut Job, pause: &Duration) -> BenchResult<()> {
            job.run_tasks(TaskFailurePolicy::Abort, |_| {
                thread::sleep(*pause);
                Ok(())
            })
        }
    }

    #[test]
    fn setup_builds_inclusive_pending_tasks() {
        let job = setup_counted_job("bench", 5).unwrap();
        assert_eq!(job.name(), "bench");
        assert_eq!(job.len(), 6);
        for i in 0..=5 {
            let task = job.task(&i.to_string()).expect("task exists");
            assert_eq!(task.magnitude(), 1);
            assert_eq!(task.state(), TaskState::Pending);
            assert!(task.started_at().is_none());
            assert!(task.ended_at().is_none());
        }
        assert_eq!(job.state(), JobState::Populated);
        assert_eq!(job.progress(), 0);
    }

    #[test]
    fn setup_rejects_negative_counts() {
        let err = setup_counted_job("bench", -1).unwrap_err();
        assert!(matches!(err, BenchError::InvalidInput(_)));
    }

    #[test]
    fn duplicate_task_ids_are_rejected() {
        let err = Job::new("dup", vec![Task::new("a", 1), Task::new("a", 1)]).unwrap_err();
        assert!(matches!(err, BenchError::InvalidInput(_)));
    }

    #[test]
    fn run_times_every_task_and_counts_progress() {
        let mut job = Job::new(
            "three",
            vec![Task::new("a", 1), Task::new("b", 1), Task::new("c", 1)],
        )
        .unwrap();

        job.run_tasks(TaskFailurePolicy::Abort, |_| {
            thread::sleep(Duration::from_micros(50));
            Ok(())
        })
        .unwrap();

        for task in job.tasks() {
            assert_eq!(task.state(), TaskState::Done);
            assert!(task.started_at().unwrap() < task.ended_at().unwrap());
        }
        assert_eq!(job.progress(), 3);
        assert_eq!(job.state(), JobState::Completed);
    }

    #[test]
    fn abort_policy_stops_at_first_failure() {
        let mut job = setup_counted_job("abort", 9).unwrap();
        let mut calls = 0;
        let err = job
            .run_tasks(TaskFailurePolicy::Abort, |_| {
                calls += 1;
                if calls == 3 {
                    Err(BenchError::Database("insert failed".into()))
                } else {
                    Ok(())
                }
            })
            .unwrap_err();

        assert!(matches!(err, BenchError::Task { .. }));
        assert_eq!(calls, 3);
        assert_eq!(job.progress(), 2);
        assert_eq!(
            job.tasks().filter(|t| t.state() == TaskState::Pending).count(),
            7
        );
        assert_eq!(job.state(), JobState::Running);
    }

    #[test]
    fn continue_policy_runs_everything_and_counts_failures() {
        let mut job = setup_counted_job("continue", 9).unwrap();
        let err = job
            .run_tasks(TaskFailurePolicy::Continue, |id| {
                if id.parse::<u32>().unwrap() % 2 == 0 {
                    Err(BenchError::NoRows)
                } else {
                    Ok(())
                }
            })
            .unwrap_err();

        match err {
            BenchError::TasksFailed { failed, total, .. } => {
                assert_eq!(failed, 5);
                assert_eq!(total, 10);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(job.progress(), 5);
        assert_eq!(job.state(), JobState::Failed);
        for task in job.tasks().filter(|t| t.state() == TaskState::Failed) {
            assert!(task.started_at().is_some());
            assert!(task.ended_at().is_none());
        }
    }

    #[test]
    fn task_cannot_end_twice_or_before_starting() {
        let mut task = Task::new("t", 1);
        assert!(matches!(task.end(), Err(BenchError::TaskState { .. })));
        task.start().unwrap();
        assert!(matches!(task.start(), Err(BenchError::TaskState { .. })));
        task.end().unwrap();
        let ended = task.ended_at();
        assert!(task.end().is_err());
        assert_eq!(task.ended_at(), ended);
    }

    #[test]
    fn run_job_reports_progress_and_summary() {
        let recorder = Arc::new(Recorder::default());
        let summary = run_job(
            "sleepy",
            &SleepJob,
            2,
            &Duration::from_micros(10),
            recorder.clone(),
        )
        .unwrap();

        assert_eq!(summary.tasks, 3);
        assert_eq!(summary.completed, 3);
        assert_eq!(summary.failed, 0);
        assert!(summary.mean_task.is_some());
        assert_eq!(
            *recorder.increments.lock().unwrap(),
            vec![(1, 3), (2, 3), (3, 3)]
        );
        assert_eq!(recorder.finished.lock().unwrap().as_ref(), Some(&summary));
    }

    #[test]
    fn run_job_surfaces_setup_errors() {
        let err = run_job(
            "bad",
            &SleepJob,
            -3,
            &Duration::ZERO,
            Arc::new(NoProgress),
        )
        .unwrap_err();
        assert!(matches!(err, BenchError::InvalidInput(_)));
    }

    #[test]
    fn log_progress_tolerates_empty_totals() {
        let progress = LogProgress::default();
        progress.increment("empty", 0, 0);
        progress.increment("some", 5, 10);
        progress.increment("some", 6, 10);
    }
}
