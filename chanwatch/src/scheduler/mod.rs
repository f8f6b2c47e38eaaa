//! Named periodic tasks checked against a single clock sample per tick.

use chrono::{DateTime, TimeDelta, Utc};

/// Background activities driven by the host tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Scan opted-in channels for new followers.
    FollowerScan,
    /// Persist the notification list when it changed.
    Autosave,
}

#[derive(Debug, Clone)]
struct PeriodicTask {
    kind: TaskKind,
    interval: TimeDelta,
    last_run: DateTime<Utc>,
}

/// Table of periodic tasks with their last run.
///
/// A task is due once strictly more than its interval has passed since it
/// last ran. Tasks start as if they had just run.
#[derive(Debug, Clone, Default)]
pub struct TaskTable {
    tasks: Vec<PeriodicTask>,
}

impl TaskTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or reconfigure) a task, counting `start` as its last run.
    pub fn register(&mut self, kind: TaskKind, interval: TimeDelta, start: DateTime<Utc>) {
        self.tasks.retain(|task| task.kind != kind);
        self.tasks.push(PeriodicTask {
            kind,
            interval,
            last_run: start,
        });
    }

    pub fn is_due(&self, kind: TaskKind, now: DateTime<Utc>) -> bool {
        self.task(kind)
            .is_some_and(|task| now - task.last_run > task.interval)
    }

    pub fn mark_run(&mut self, kind: TaskKind, now: DateTime<Utc>) {
        if let Some(task) = self.tasks.iter_mut().find(|task| task.kind == kind) {
            task.last_run = now;
        }
    }

    pub fn last_run(&self, kind: TaskKind) -> Option<DateTime<Utc>> {
        self.task(kind).map(|task| task.last_run)
    }

    fn task(&self, kind: TaskKind) -> Option<&PeriodicTask> {
        self.tasks.iter().find(|task| task.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(secs)
    }

    #[test]
    fn test_due_after_interval() {
        let mut table = TaskTable::new();
        table.register(TaskKind::FollowerScan, TimeDelta::seconds(60), at(0));

        assert!(!table.is_due(TaskKind::FollowerScan, at(60)));
        assert!(table.is_due(TaskKind::FollowerScan, at(61)));

        table.mark_run(TaskKind::FollowerScan, at(61));
        assert!(!table.is_due(TaskKind::FollowerScan, at(100)));
        assert_eq!(table.last_run(TaskKind::FollowerScan), Some(at(61)));
        assert!(table.is_due(TaskKind::FollowerScan, at(122)));
    }

    #[test]
    fn test_unregistered_task_never_due() {
        let table = TaskTable::new();
        assert!(!table.is_due(TaskKind::Autosave, at(1_000_000)));
        assert_eq!(table.last_run(TaskKind::Autosave), None);
    }

    #[test]
    fn test_tasks_are_independent() {
        let mut table = TaskTable::new();
        table.register(TaskKind::FollowerScan, TimeDelta::seconds(60), at(0));
        table.register(TaskKind::Autosave, TimeDelta::seconds(300), at(0));
        assert!(table.is_due(TaskKind::FollowerScan, at(120)));
        assert!(!table.is_due(TaskKind::Autosave, at(120)));
    }
}
