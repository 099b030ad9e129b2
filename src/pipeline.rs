//! Per-frame execution of a compiled binding graph

use serde::Serialize;

use crate::graph::{task_name, Binding, ModuleId, TaskRef};
use crate::module::Module;
use crate::task::{Task, TaskStats};
use crate::{Error, Noise};

/// Timing statistics of one task, labelled with its module and task names
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct TaskStatsRow {
    /// Module name
    pub module: String,
    /// Task name
    pub task: String,
    /// Statistics collected so far
    pub stats: TaskStats,
}

/// Compiled binding graph with a fixed task sequence
///
/// Obtained from [`Graph::compile`](crate::Graph::compile); bindings cannot change anymore, but
/// task modes and statistics can still be configured.
#[derive(Debug)]
pub struct Pipeline {
    modules: Vec<Module>,
    bindings: Vec<Binding>,
    sequence: Vec<TaskRef>,
}

impl Pipeline {
    pub(crate) fn new(modules: Vec<Module>, bindings: Vec<Binding>, sequence: Vec<TaskRef>) -> Self {
        Self {
            modules,
            bindings,
            sequence,
        }
    }

    /// Runs one frame through the pipeline, executing each scheduled task exactly once, in order.
    ///
    /// # Errors
    ///
    /// Returns an error as soon as a task fails; later tasks of the frame are not executed.
    pub fn execute_frame(&mut self) -> Result<(), Error> {
        for &TaskRef { module, task } in &self.sequence {
            self.modules[module.0].exec(task)?;
        }
        Ok(())
    }

    /// Returns the task sequence executed by each frame.
    #[must_use]
    pub fn sequence(&self) -> &[TaskRef] {
        &self.sequence
    }

    /// Returns the `module::task` names of the task sequence.
    #[must_use]
    pub fn sequence_names(&self) -> Vec<String> {
        self.sequence
            .iter()
            .map(|&t| task_name(&self.modules, t))
            .collect()
    }

    /// Returns the bindings of the pipeline.
    #[must_use]
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Returns module with given identifier.
    #[must_use]
    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id.0)
    }

    /// Returns all modules.
    #[must_use]
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Returns mutable access to a task, for configuring its mode or statistics.
    pub fn task_mut(&mut self, task: TaskRef) -> Option<&mut Task> {
        self.modules
            .get_mut(task.module.0)?
            .tasks_mut()
            .get_mut(task.task)
    }

    /// Applies a configuration function to every task of every module.
    pub fn configure_tasks(&mut self, mut configure: impl FnMut(&mut Task)) {
        for module in &mut self.modules {
            for task in module.tasks_mut() {
                configure(task);
            }
        }
    }

    /// Forwards noise parameters to every module.
    pub fn set_noise(&mut self, noise: &Noise) {
        for module in &mut self.modules {
            module.set_noise(noise);
        }
    }

    /// Clears state accumulated by every module.
    pub fn reset(&mut self) {
        for module in &mut self.modules {
            module.reset();
        }
    }

    /// Initializes the interleavers of the modules that have one, returning their number.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing interleaver fails to initialize.
    pub fn init_interleavers(&mut self) -> Result<usize, Error> {
        let mut count = 0;
        for module in self.modules.iter_mut().filter(|m| m.has_interleaver()) {
            module.init_interleaver()?;
            tracing::debug!("initialized interleaver of {}", module.name());
            count += 1;
        }
        Ok(count)
    }

    /// Returns timing statistics of the tasks for which statistics are enabled.
    #[must_use]
    pub fn task_stats(&self) -> Vec<TaskStatsRow> {
        self.modules
            .iter()
            .flat_map(|m| {
                m.tasks()
                    .iter()
                    .filter(|t| t.is_stats())
                    .map(move |t| TaskStatsRow {
                        module: m.name().to_string(),
                        task: t.name().to_string(),
                        stats: t.stats(),
                    })
            })
            .collect()
    }
}
