//! Construction of the binding graph
//!
//! A [`Graph`] collects modules and the bindings between their sockets. Every binding is checked
//! when it is made, and the graph is compiled into an executable [`Pipeline`] together with a task
//! sequence in which each producer runs before its consumers. A compiled pipeline cannot be
//! rebound.

use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use crate::module::Module;
use crate::socket::{Direction, Socket};
use crate::{Error, Pipeline};

/// Identifier of a module within a graph
#[derive(Clone, Eq, PartialEq, Debug, Copy, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub usize);

/// Identifier of a task within a graph
#[derive(Clone, Eq, PartialEq, Debug, Copy, Hash, PartialOrd, Ord)]
pub struct TaskRef {
    /// Module owning the task
    pub module: ModuleId,
    /// Index of the task within its module
    pub task: usize,
}

/// Identifier of a socket within a graph
#[derive(Clone, Eq, PartialEq, Debug, Copy, Hash, PartialOrd, Ord)]
pub struct SocketRef {
    /// Module owning the socket
    pub module: ModuleId,
    /// Index of the task within its module
    pub task: usize,
    /// Index of the socket within its task
    pub socket: usize,
}

impl SocketRef {
    /// Returns the task owning the socket.
    #[must_use]
    pub fn task_ref(self) -> TaskRef {
        TaskRef {
            module: self.module,
            task: self.task,
        }
    }
}

/// Link from a producer output socket to a consumer input socket
#[derive(Clone, Eq, PartialEq, Debug, Copy, Hash)]
pub struct Binding {
    /// Output socket written by the producer task
    pub producer: SocketRef,
    /// Input socket read by the consumer task
    pub consumer: SocketRef,
}

/// Modules and socket bindings under construction
#[derive(Debug, Default)]
pub struct Graph {
    modules: Vec<Module>,
    bindings: Vec<Binding>,
}

impl Graph {
    /// Returns empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a module to the graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph already has a module with the same name.
    pub fn add(&mut self, module: Module) -> Result<ModuleId, Error> {
        if self.modules.iter().any(|m| m.name() == module.name()) {
            return Err(Error::InvalidInput(format!(
                "Graph already has a module named {}",
                module.name()
            )));
        }
        self.modules.push(module);
        Ok(ModuleId(self.modules.len() - 1))
    }

    /// Returns module with given identifier.
    #[must_use]
    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id.0)
    }

    /// Returns mutable access to the module with given identifier.
    pub fn module_mut(&mut self, id: ModuleId) -> Option<&mut Module> {
        self.modules.get_mut(id.0)
    }

    /// Returns bindings made so far.
    #[must_use]
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Returns identifier of a task given the names of its module and of the task.
    ///
    /// # Errors
    ///
    /// Returns an error if the module has no task with the given name.
    pub fn task(&self, module: ModuleId, task: &str) -> Result<TaskRef, Error> {
        let m = self.module_or_err(module)?;
        let index = m.task_index(task).ok_or_else(|| {
            Error::InvalidSocket(format!("Module {} has no task named {task}", m.name()))
        })?;
        Ok(TaskRef {
            module,
            task: index,
        })
    }

    /// Returns identifier of a socket given the names of its task and of the socket.
    ///
    /// # Errors
    ///
    /// Returns an error if the module has no such task or the task has no such socket.
    pub fn socket(&self, module: ModuleId, task: &str, socket: &str) -> Result<SocketRef, Error> {
        let task_ref = self.task(module, task)?;
        let t = &self.modules[module.0].tasks()[task_ref.task];
        let index = t.socket_index(socket).ok_or_else(|| {
            Error::InvalidSocket(format!(
                "Task {} has no socket named {socket}",
                self.task_name(task_ref)
            ))
        })?;
        Ok(SocketRef {
            module,
            task: task_ref.task,
            socket: index,
        })
    }

    /// Binds a consumer input socket to a producer output socket.
    ///
    /// After binding, the consumer reads whatever the producer last wrote; no data is copied.
    ///
    /// # Errors
    ///
    /// Returns an error if `producer` is not an output socket or `consumer` is not an input
    /// socket, if their element types or counts differ, or if `consumer` is already bound.
    ///
    /// # Examples
    ///
    /// ```
    /// use fecsim::{BpskModem, Graph, Module, Source};
    ///
    /// let mut graph = Graph::new();
    /// let src = graph.add(Module::new("src", Source::new(8, 0)))?;
    /// let mdm = graph.add(Module::new("mdm", BpskModem::new(8)))?;
    /// graph.bind(
    ///     graph.socket(src, "generate", "U_K")?,
    ///     graph.socket(mdm, "modulate", "X_N1")?,
    /// )?;
    /// // Element types differ
    /// assert!(graph
    ///     .bind(
    ///         graph.socket(src, "generate", "U_K")?,
    ///         graph.socket(mdm, "demodulate", "Y_N1")?,
    ///     )
    ///     .is_err());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn bind(&mut self, producer: SocketRef, consumer: SocketRef) -> Result<(), Error> {
        let producer_name = self.socket_name(producer);
        let consumer_name = self.socket_name(consumer);
        let out = self.socket_at(producer)?;
        let inp = self.socket_at(consumer)?;
        if out.direction() != Direction::Output {
            return Err(Error::InvalidSocket(format!(
                "{producer_name} is not an output socket"
            )));
        }
        if inp.direction() != Direction::Input {
            return Err(Error::InvalidSocket(format!(
                "{consumer_name} is not an input socket"
            )));
        }
        if out.element_type() != inp.element_type() {
            return Err(Error::TypeMismatch {
                producer: producer_name,
                consumer: consumer_name,
                expected: out.element_type().to_string(),
                found: inp.element_type().to_string(),
            });
        }
        if out.len() != inp.len() {
            return Err(Error::SizeMismatch {
                producer: producer_name,
                consumer: consumer_name,
                producer_len: out.len(),
                consumer_len: inp.len(),
            });
        }
        if let Some(existing) = inp.producer() {
            return Err(Error::AlreadyBound {
                consumer: consumer_name,
                producer: existing.to_string(),
            });
        }
        let buffer = out.buffer().map(Rc::clone).ok_or_else(|| {
            Error::InvalidSocket(format!("{producer_name} has no buffer"))
        })?;
        self.modules[consumer.module.0]
            .task_mut(consumer.task)
            .socket_mut(consumer.socket)
            .attach(producer_name.clone(), buffer);
        tracing::debug!("bound {consumer_name} to {producer_name}");
        self.bindings.push(Binding { producer, consumer });
        Ok(())
    }

    /// Returns a task sequence derived from the bindings.
    ///
    /// Every task of every module is included, bound or not, so that a later
    /// [`Graph::compile`] reports any input left unbound. Among tasks whose producers have all
    /// been scheduled, the one declared first (by module, then by task) runs first.
    ///
    /// # Errors
    ///
    /// Returns an error if the bindings form a cycle.
    pub fn topological_order(&self) -> Result<Vec<TaskRef>, Error> {
        let nodes: BTreeSet<TaskRef> = self
            .modules
            .iter()
            .enumerate()
            .flat_map(|(m, module)| {
                (0 .. module.tasks().len()).map(move |task| TaskRef {
                    module: ModuleId(m),
                    task,
                })
            })
            .collect();
        let mut in_degree: HashMap<TaskRef, usize> = nodes.iter().map(|&t| (t, 0)).collect();
        let mut successors: HashMap<TaskRef, Vec<TaskRef>> = HashMap::new();
        for b in &self.bindings {
            *in_degree.entry(b.consumer.task_ref()).or_default() += 1;
            successors
                .entry(b.producer.task_ref())
                .or_default()
                .push(b.consumer.task_ref());
        }
        let mut ready: BTreeSet<TaskRef> = nodes
            .iter()
            .copied()
            .filter(|t| in_degree[t] == 0)
            .collect();
        let mut order = Vec::with_capacity(nodes.len());
        while let Some(task) = ready.pop_first() {
            order.push(task);
            for next in successors.get(&task).into_iter().flatten() {
                let degree = in_degree.entry(*next).or_default();
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(*next);
                }
            }
        }
        if order.len() == nodes.len() {
            Ok(order)
        } else {
            let stuck = nodes
                .iter()
                .find(|t| in_degree[t] > 0)
                .map(|&t| self.task_name(t))
                .unwrap_or_default();
            Err(Error::CycleDetected(stuck))
        }
    }

    /// Compiles the graph into a pipeline executing the given task sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if a task is unknown or appears twice, if a scheduled task has an
    /// unbound input, or if a scheduled consumer does not come strictly after its producer.
    pub fn compile(self, sequence: Vec<TaskRef>) -> Result<Pipeline, Error> {
        let mut position = HashMap::with_capacity(sequence.len());
        for (pos, &task) in sequence.iter().enumerate() {
            let module = self.module_or_err(task.module)?;
            let t = module.tasks().get(task.task).ok_or_else(|| {
                Error::InvalidSocket(format!(
                    "Module {} has no task with index {}",
                    module.name(),
                    task.task
                ))
            })?;
            if position.insert(task, pos).is_some() {
                return Err(Error::InvalidInput(format!(
                    "Task {} is scheduled more than once",
                    self.task_name(task)
                )));
            }
            if let Some(socket) = t.first_unbound_input() {
                return Err(Error::UnboundRequiredInput {
                    module: module.name().to_string(),
                    task: t.name().to_string(),
                    socket: socket.name().to_string(),
                });
            }
        }
        for b in &self.bindings {
            let consumer = b.consumer.task_ref();
            let Some(&consumer_pos) = position.get(&consumer) else {
                continue;
            };
            let producer = b.producer.task_ref();
            match position.get(&producer) {
                Some(&producer_pos) if producer_pos < consumer_pos => {}
                _ => {
                    return Err(Error::SequenceOrder {
                        producer: self.task_name(producer),
                        consumer: self.task_name(consumer),
                    })
                }
            }
        }
        tracing::debug!(
            "compiled pipeline of {} tasks over {} bindings",
            sequence.len(),
            self.bindings.len()
        );
        Ok(Pipeline::new(self.modules, self.bindings, sequence))
    }

    /// Compiles the graph into a pipeline executing the sequence returned by
    /// [`Graph::topological_order`].
    ///
    /// # Errors
    ///
    /// Returns an error if the bindings form a cycle or any task has an unbound input.
    pub fn compile_topological(self) -> Result<Pipeline, Error> {
        let sequence = self.topological_order()?;
        self.compile(sequence)
    }

    fn module_or_err(&self, id: ModuleId) -> Result<&Module, Error> {
        self.modules
            .get(id.0)
            .ok_or_else(|| Error::InvalidSocket(format!("Graph has no module with index {}", id.0)))
    }

    fn socket_at(&self, r: SocketRef) -> Result<&Socket, Error> {
        self.module_or_err(r.module)?
            .tasks()
            .get(r.task)
            .and_then(|t| t.sockets().get(r.socket))
            .ok_or_else(|| Error::InvalidSocket(format!("Graph has no socket {r:?}")))
    }

    fn task_name(&self, r: TaskRef) -> String {
        task_name(&self.modules, r)
    }

    fn socket_name(&self, r: SocketRef) -> String {
        self.modules
            .get(r.module.0)
            .and_then(|m| {
                let t = m.tasks().get(r.task)?;
                let s = t.sockets().get(r.socket)?;
                Some(format!("{}::{}::{}", m.name(), t.name(), s.name()))
            })
            .unwrap_or_else(|| format!("{r:?}"))
    }
}

/// Returns `module::task` name of a task.
pub(crate) fn task_name(modules: &[Module], r: TaskRef) -> String {
    modules
        .get(r.module.0)
        .and_then(|m| Some(format!("{}::{}", m.name(), m.tasks().get(r.task)?.name())))
        .unwrap_or_else(|| format!("{r:?}"))
}
