//! Named collections of tasks sharing state

use std::fmt;

use crate::task::{Task, TaskIo, TaskSpec};
use crate::{Error, Noise};

/// Behaviour shared by the tasks of a module
///
/// A stage declares its tasks once, at module construction, and is then called with the index of
/// the task to execute and access to that task's sockets. State kept in the stage is shared by all
/// of its tasks and persists across frames.
pub trait Stage {
    /// Returns the tasks of the stage, with their sockets.
    fn tasks(&self) -> Vec<TaskSpec>;

    /// Executes the task with given index.
    ///
    /// # Errors
    ///
    /// Returns an error if a socket cannot be accessed or the computation fails.
    fn execute(&mut self, task: usize, io: &TaskIo<'_>) -> Result<(), Error>;

    /// Updates the noise parameters used by the stage.
    fn set_noise(&mut self, _noise: &Noise) {}

    /// Clears state accumulated over frames.
    fn reset(&mut self) {}

    /// Returns `true` if the stage owns an interleaver that needs initialization.
    fn has_interleaver(&self) -> bool {
        false
    }

    /// Initializes the interleaver of the stage.
    ///
    /// # Errors
    ///
    /// Returns an error if the interleaver cannot be initialized.
    fn init_interleaver(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

/// Named processing stage exposing a fixed set of tasks
pub struct Module {
    name: String,
    tasks: Vec<Task>,
    stage: Box<dyn Stage>,
}

impl Module {
    /// Returns module with given name, whose tasks are those declared by the stage.
    ///
    /// # Examples
    ///
    /// ```
    /// use fecsim::{Module, Source};
    ///
    /// let source = Module::new("src", Source::new(16, 0));
    /// assert_eq!(source.task_index("generate"), Some(0));
    /// ```
    pub fn new(name: &str, stage: impl Stage + 'static) -> Self {
        let tasks = stage.tasks().into_iter().map(Task::new).collect();
        Self {
            name: name.to_string(),
            tasks,
            stage: Box::new(stage),
        }
    }

    /// Returns module name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns tasks of the module.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Returns mutable access to the tasks of the module (to configure modes and statistics).
    pub fn tasks_mut(&mut self) -> &mut [Task] {
        &mut self.tasks
    }

    /// Returns index of the task with given name.
    #[must_use]
    pub fn task_index(&self, name: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.name() == name)
    }

    /// Executes the task with given index once.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is invalid, if an input of the task is unbound, or if the
    /// execution itself fails.
    pub fn exec(&mut self, task: usize) -> Result<(), Error> {
        let Some(t) = self.tasks.get_mut(task) else {
            return Err(Error::InvalidSocket(format!(
                "Module {} has no task with index {task}",
                self.name
            )));
        };
        t.exec(&self.name, task, self.stage.as_mut())
    }

    /// Forwards noise parameters to the stage.
    pub fn set_noise(&mut self, noise: &Noise) {
        self.stage.set_noise(noise);
    }

    /// Clears state accumulated by the stage.
    pub fn reset(&mut self) {
        self.stage.reset();
    }

    /// Returns `true` if the stage owns an interleaver.
    #[must_use]
    pub fn has_interleaver(&self) -> bool {
        self.stage.has_interleaver()
    }

    /// Initializes the interleaver of the stage, if there is one.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage fails to initialize its interleaver.
    pub fn init_interleaver(&mut self) -> Result<(), Error> {
        if self.stage.has_interleaver() {
            self.stage.init_interleaver()?;
        }
        Ok(())
    }

    pub(crate) fn task_mut(&mut self, index: usize) -> &mut Task {
        &mut self.tasks[index]
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("tasks", &self.tasks)
            .finish_non_exhaustive()
    }
}
