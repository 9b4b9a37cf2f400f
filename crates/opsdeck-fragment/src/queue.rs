use opsdeck_core::ScriptTaskError;
use thiserror::Error;

use crate::container::ScriptTask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Dispatched,
    Completed,
    Failed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("no task at position {0}")]
    Unknown(usize),
    #[error("task {order}: invalid transition {from:?} -> {to:?}")]
    InvalidTransition {
        order: usize,
        from: TaskState,
        to: TaskState,
    },
    #[error("task {order} dispatched out of turn (next is {next:?})")]
    OutOfTurn { order: usize, next: Option<usize> },
}

const VALID_TRANSITIONS: &[(TaskState, &[TaskState])] = &[
    (TaskState::Pending, &[TaskState::Dispatched]),
    (
        TaskState::Dispatched,
        &[TaskState::Completed, TaskState::Failed],
    ),
    // Completed and Failed are terminal
];

fn is_valid_transition(from: TaskState, to: TaskState) -> bool {
    VALID_TRANSITIONS
        .iter()
        .any(|(f, targets)| *f == from && targets.contains(&to))
}

/// Strictly sequential script pipeline. At most one task is in flight, and
/// task N+1 is only handed out once task N has completed or failed.
#[derive(Debug)]
pub struct TaskQueue {
    tasks: Vec<ScriptTask>,
    states: Vec<TaskState>,
    failures: Vec<(usize, ScriptTaskError)>,
}

impl TaskQueue {
    pub fn new(tasks: Vec<ScriptTask>) -> Self {
        let states = vec![TaskState::Pending; tasks.len()];
        Self {
            tasks,
            states,
            failures: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn state(&self, pos: usize) -> Option<TaskState> {
        self.states.get(pos).copied()
    }

    /// Position of the next task to dispatch, or `None` while one is in
    /// flight or when everything has advanced.
    pub fn next_pending(&self) -> Option<usize> {
        if self.states.contains(&TaskState::Dispatched) {
            return None;
        }
        self.states.iter().position(|s| *s == TaskState::Pending)
    }

    pub fn dispatch(&mut self, pos: usize) -> Result<&ScriptTask, QueueError> {
        let next = self.next_pending();
        if next != Some(pos) {
            let order = self.tasks.get(pos).ok_or(QueueError::Unknown(pos))?.order;
            return Err(QueueError::OutOfTurn { order, next });
        }
        self.set(pos, TaskState::Dispatched)?;
        Ok(&self.tasks[pos])
    }

    pub fn complete(&mut self, pos: usize) -> Result<(), QueueError> {
        self.set(pos, TaskState::Completed)
    }

    pub fn fail(&mut self, pos: usize, error: ScriptTaskError) -> Result<(), QueueError> {
        self.set(pos, TaskState::Failed)?;
        self.failures.push((self.tasks[pos].order, error));
        Ok(())
    }

    /// True once every task has completed or failed.
    pub fn is_done(&self) -> bool {
        self.states
            .iter()
            .all(|s| matches!(s, TaskState::Completed | TaskState::Failed))
    }

    pub fn completed(&self) -> usize {
        self.states
            .iter()
            .filter(|s| **s == TaskState::Completed)
            .count()
    }

    pub fn failures(&self) -> &[(usize, ScriptTaskError)] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<(usize, ScriptTaskError)> {
        self.failures
    }

    fn set(&mut self, pos: usize, to: TaskState) -> Result<(), QueueError> {
        let from = *self.states.get(pos).ok_or(QueueError::Unknown(pos))?;
        if !is_valid_transition(from, to) {
            return Err(QueueError::InvalidTransition {
                order: self.tasks[pos].order,
                from,
                to,
            });
        }
        self.states[pos] = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ScriptKind;

    fn tasks(n: usize) -> Vec<ScriptTask> {
        (0..n)
            .map(|order| ScriptTask {
                order,
                kind: ScriptKind::Inline {
                    code: format!("step({order})"),
                },
                attributes: vec![],
            })
            .collect()
    }

    #[test]
    fn hands_out_tasks_one_at_a_time() {
        let mut q = TaskQueue::new(tasks(3));
        assert_eq!(q.next_pending(), Some(0));
        q.dispatch(0).unwrap();
        assert_eq!(q.next_pending(), None);
        q.complete(0).unwrap();
        assert_eq!(q.next_pending(), Some(1));
    }

    #[test]
    fn refuses_out_of_turn_dispatch() {
        let mut q = TaskQueue::new(tasks(3));
        assert_eq!(
            q.dispatch(1).unwrap_err(),
            QueueError::OutOfTurn {
                order: 1,
                next: Some(0)
            }
        );
        q.dispatch(0).unwrap();
        assert!(matches!(q.dispatch(1), Err(QueueError::OutOfTurn { .. })));
    }

    #[test]
    fn failure_is_terminal_and_does_not_block_successors() {
        let mut q = TaskQueue::new(tasks(2));
        q.dispatch(0).unwrap();
        q.fail(
            0,
            ScriptTaskError::Load {
                src: "a.js".into(),
                reason: "404".into(),
            },
        )
        .unwrap();
        assert_eq!(q.state(0), Some(TaskState::Failed));
        assert!(matches!(
            q.complete(0),
            Err(QueueError::InvalidTransition { .. })
        ));
        assert_eq!(q.next_pending(), Some(1));
        q.dispatch(1).unwrap();
        q.complete(1).unwrap();
        assert!(q.is_done());
        assert_eq!(q.completed(), 1);
        assert_eq!(q.failures().len(), 1);
        assert_eq!(q.failures()[0].0, 0);
    }

    #[test]
    fn cannot_complete_before_dispatch() {
        let mut q = TaskQueue::new(tasks(1));
        assert_eq!(
            q.complete(0).unwrap_err(),
            QueueError::InvalidTransition {
                order: 0,
                from: TaskState::Pending,
                to: TaskState::Completed
            }
        );
        assert_eq!(q.complete(7).unwrap_err(), QueueError::Unknown(7));
    }

    #[test]
    fn empty_queue_is_done() {
        let q = TaskQueue::new(Vec::new());
        assert!(q.is_empty());
        assert!(q.is_done());
        assert_eq!(q.next_pending(), None);
    }
}
