use crate::model::task::{Task, TaskId};

/// Error type for task list operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("position {index} is out of range (list has {len} tasks)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Position of the task with the given id
pub fn find_index(tasks: &[Task], id: TaskId) -> Option<usize> {
    tasks.iter().position(|t| t.id == id)
}

pub fn find_task_mut(tasks: &mut [Task], id: TaskId) -> Option<&mut Task> {
    tasks.iter_mut().find(|t| t.id == id)
}

/// Remove and return the task at `index`.
pub fn remove_at(tasks: &mut Vec<Task>, index: usize) -> Result<Task, TaskError> {
    if index >= tasks.len() {
        return Err(TaskError::IndexOutOfRange {
            index,
            len: tasks.len(),
        });
    }
    Ok(tasks.remove(index))
}

/// Move the task at `from` so that it ends up at index `to`, shifting the
/// tasks in between. `to == len` means "move to the end". Nothing changes
/// on error.
pub fn move_task(tasks: &mut Vec<Task>, from: usize, to: usize) -> Result<(), TaskError> {
    let len = tasks.len();
    if from >= len {
        return Err(TaskError::IndexOutOfRange { index: from, len });
    }
    if to > len {
        return Err(TaskError::IndexOutOfRange { index: to, len });
    }
    let task = tasks.remove(from);
    let dest = to.min(tasks.len());
    tasks.insert(dest, task);
    Ok(())
}

/// Tasks to display: everything, or only uncompleted tasks when
/// `hide_completed` is set. Order is preserved.
pub fn visible_tasks(tasks: &[Task], hide_completed: bool) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|t| !(hide_completed && t.completed))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn abc() -> Vec<Task> {
        vec![Task::new("A"), Task::new("B"), Task::new("C")]
    }

    fn titles(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn move_first_to_last() {
        let mut tasks = abc();
        move_task(&mut tasks, 0, 2).unwrap();
        assert_eq!(titles(&tasks), vec!["B", "C", "A"]);
    }

    #[test]
    fn move_last_to_first() {
        let mut tasks = abc();
        move_task(&mut tasks, 2, 0).unwrap();
        assert_eq!(titles(&tasks), vec!["C", "A", "B"]);
    }

    #[test]
    fn move_to_len_means_end() {
        let mut tasks = abc();
        move_task(&mut tasks, 0, 3).unwrap();
        assert_eq!(titles(&tasks), vec!["B", "C", "A"]);
    }

    #[test]
    fn move_to_same_position_is_identity() {
        let mut tasks = abc();
        let before = tasks.clone();
        move_task(&mut tasks, 1, 1).unwrap();
        assert_eq!(tasks, before);
    }

    #[test]
    fn move_out_of_range_leaves_list_alone() {
        let mut tasks = abc();
        let before = tasks.clone();
        assert_eq!(
            move_task(&mut tasks, 3, 0),
            Err(TaskError::IndexOutOfRange { index: 3, len: 3 })
        );
        assert_eq!(
            move_task(&mut tasks, 0, 4),
            Err(TaskError::IndexOutOfRange { index: 4, len: 3 })
        );
        assert_eq!(tasks, before);
    }

    #[test]
    fn remove_middle() {
        let mut tasks = abc();
        let removed = remove_at(&mut tasks, 1).unwrap();
        assert_eq!(removed.title, "B");
        assert_eq!(titles(&tasks), vec!["A", "C"]);
    }

    #[test]
    fn remove_out_of_range() {
        let mut tasks = abc();
        assert!(matches!(
            remove_at(&mut tasks, 3),
            Err(TaskError::IndexOutOfRange { index: 3, len: 3 })
        ));
        assert_eq!(tasks.len(), 3);
    }

    #[test]
    fn visible_respects_hide_completed() {
        let mut tasks = abc();
        tasks[1].completed = true;

        let shown: Vec<&str> = visible_tasks(&tasks, true)
            .iter()
            .map(|t| t.title.as_str())
            .collect();
        assert_eq!(shown, vec!["A", "C"]);

        assert_eq!(visible_tasks(&tasks, false).len(), 3);
    }

    #[test]
    fn find_by_id() {
        let mut tasks = abc();
        let id = tasks[2].id;
        assert_eq!(find_index(&tasks, id), Some(2));
        find_task_mut(&mut tasks, id).unwrap().title = "Z".into();
        assert_eq!(tasks[2].title, "Z");
        assert_eq!(find_index(&tasks, uuid::Uuid::nil()), None);
    }
}
