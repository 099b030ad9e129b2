//! Atomic units of computation with a fixed set of sockets

use std::cell::{Ref, RefMut};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::socket::{Buffer, Direction, Socket, SocketSpec};
use crate::{Bit, Error, Stage};

/// Declared name and sockets of a task
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct TaskSpec {
    /// Task name, unique within its module
    pub name: &'static str,
    /// Sockets, in the order the task's execution function indexes them
    pub sockets: Vec<SocketSpec>,
}

impl TaskSpec {
    /// Returns task specification with given name and sockets.
    #[must_use]
    pub fn new(name: &'static str, sockets: Vec<SocketSpec>) -> Self {
        Self { name, sockets }
    }
}

/// Enumeration of execution modes of a task
#[derive(Clone, Eq, PartialEq, Debug, Copy, Default)]
pub enum TaskMode {
    /// Socket contents are checked against their declared shapes around each execution
    #[default]
    Checked,
    /// Shape checks are skipped
    Fast,
}

/// Timing statistics of a task
#[derive(Clone, Eq, PartialEq, Debug, Copy, Default, Serialize)]
pub struct TaskStats {
    /// Number of executions
    pub n_calls: u64,
    /// Total execution time
    pub total: Duration,
    /// Shortest execution time
    pub min: Duration,
    /// Longest execution time
    pub max: Duration,
}

impl TaskStats {
    /// Returns average execution time (zero if the task never ran).
    #[must_use]
    pub fn average(&self) -> Duration {
        match u32::try_from(self.n_calls) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.total / n,
            Err(_) => Duration::from_secs_f64(self.total.as_secs_f64() / self.n_calls as f64),
        }
    }

    fn record(&mut self, elapsed: Duration) {
        self.min = if self.n_calls == 0 {
            elapsed
        } else {
            self.min.min(elapsed)
        };
        self.max = self.max.max(elapsed);
        self.total += elapsed;
        self.n_calls += 1;
    }
}

/// Atomic unit of computation
#[derive(Debug)]
pub struct Task {
    name: &'static str,
    sockets: Vec<Socket>,
    mode: TaskMode,
    debug: bool,
    debug_limit: usize,
    stats_enabled: bool,
    stats: TaskStats,
}

impl Task {
    pub(crate) fn new(spec: TaskSpec) -> Self {
        Self {
            name: spec.name,
            sockets: spec.sockets.into_iter().map(Socket::new).collect(),
            mode: TaskMode::default(),
            debug: false,
            debug_limit: 16,
            stats_enabled: false,
            stats: TaskStats::default(),
        }
    }

    /// Returns task name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns sockets of the task.
    #[must_use]
    pub fn sockets(&self) -> &[Socket] {
        &self.sockets
    }

    /// Returns index of the socket with given name.
    #[must_use]
    pub fn socket_index(&self, name: &str) -> Option<usize> {
        self.sockets.iter().position(|s| s.name() == name)
    }

    pub(crate) fn socket_mut(&mut self, index: usize) -> &mut Socket {
        &mut self.sockets[index]
    }

    /// Returns execution mode.
    #[must_use]
    pub fn mode(&self) -> TaskMode {
        self.mode
    }

    /// Sets execution mode.
    pub fn set_mode(&mut self, mode: TaskMode) {
        self.mode = mode;
    }

    /// Enables or disables logging of socket contents (at most `limit` elements per socket).
    pub fn set_debug(&mut self, debug: bool, limit: usize) {
        self.debug = debug;
        self.debug_limit = limit;
    }

    /// Enables or disables collection of timing statistics.
    pub fn set_stats(&mut self, enabled: bool) {
        self.stats_enabled = enabled;
    }

    /// Returns `true` if timing statistics are collected.
    #[must_use]
    pub fn is_stats(&self) -> bool {
        self.stats_enabled
    }

    /// Returns timing statistics collected so far.
    #[must_use]
    pub fn stats(&self) -> TaskStats {
        self.stats
    }

    /// Returns the first input socket that has no producer.
    pub(crate) fn first_unbound_input(&self) -> Option<&Socket> {
        self.sockets
            .iter()
            .find(|s| s.direction() == Direction::Input && !s.is_bound())
    }

    /// Executes the task once on behalf of the given stage.
    pub(crate) fn exec(
        &mut self,
        module: &str,
        index: usize,
        stage: &mut dyn Stage,
    ) -> Result<(), Error> {
        if let Some(socket) = self.first_unbound_input() {
            return Err(Error::UnboundRequiredInput {
                module: module.to_string(),
                task: self.name.to_string(),
                socket: socket.name().to_string(),
            });
        }
        if self.mode == TaskMode::Checked {
            self.check_shapes(module, Direction::Input)?;
        }
        if self.debug {
            self.log_sockets(module, Direction::Input);
        }
        let io = TaskIo {
            module,
            task: self.name,
            sockets: &self.sockets,
        };
        if self.stats_enabled {
            let start = Instant::now();
            stage.execute(index, &io)?;
            self.stats.record(start.elapsed());
        } else {
            stage.execute(index, &io)?;
        }
        if self.mode == TaskMode::Checked {
            self.check_shapes(module, Direction::Output)?;
        }
        if self.debug {
            self.log_sockets(module, Direction::Output);
        }
        Ok(())
    }

    /// Checks buffers of all sockets in one direction against their declared shapes.
    fn check_shapes(&self, module: &str, direction: Direction) -> Result<(), Error> {
        for socket in self.sockets.iter().filter(|s| s.direction() == direction) {
            let Some(buffer) = socket.buffer() else {
                continue;
            };
            let buffer = buffer.try_borrow().map_err(|_| {
                Error::InvalidSocket(format!(
                    "{module}::{}::{} is borrowed elsewhere",
                    self.name,
                    socket.name()
                ))
            })?;
            if buffer.element_type() != socket.element_type() || buffer.len() != socket.len() {
                return Err(Error::InvalidSocket(format!(
                    "{module}::{}::{} holds {} {} elements (declared {} {} elements)",
                    self.name,
                    socket.name(),
                    buffer.len(),
                    buffer.element_type(),
                    socket.len(),
                    socket.element_type()
                )));
            }
        }
        Ok(())
    }

    fn log_sockets(&self, module: &str, direction: Direction) {
        for socket in self.sockets.iter().filter(|s| s.direction() == direction) {
            if let Some(Ok(buffer)) = socket.buffer().map(|b| b.try_borrow()) {
                tracing::trace!(
                    "{module}::{}::{} [{}] = {}",
                    self.name,
                    socket.name(),
                    buffer.len(),
                    buffer.preview(self.debug_limit)
                );
            }
        }
    }
}

/// Socket access handed to a stage while one of its tasks executes
///
/// Sockets are addressed by their index in the task's [`TaskSpec`]. Inputs can only be read and
/// outputs can only be written.
#[derive(Debug)]
pub struct TaskIo<'a> {
    module: &'a str,
    task: &'a str,
    sockets: &'a [Socket],
}

impl<'a> TaskIo<'a> {
    /// Returns bits held in the given input socket.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket is not a bound bit input.
    pub fn bits(&self, index: usize) -> Result<Ref<'a, [Bit]>, Error> {
        let buffer = self.read(index)?;
        Ref::filter_map(buffer, Buffer::as_bits).map_err(|_| self.wrong_type(index))
    }

    /// Returns real values held in the given input socket.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket is not a bound real-valued input.
    pub fn f64s(&self, index: usize) -> Result<Ref<'a, [f64]>, Error> {
        let buffer = self.read(index)?;
        Ref::filter_map(buffer, Buffer::as_f64s).map_err(|_| self.wrong_type(index))
    }

    /// Returns mutable access to the bits of the given output socket.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket is not a bit output.
    pub fn bits_mut(&self, index: usize) -> Result<RefMut<'a, [Bit]>, Error> {
        let buffer = self.write(index)?;
        RefMut::filter_map(buffer, Buffer::as_bits_mut).map_err(|_| self.wrong_type(index))
    }

    /// Returns mutable access to the real values of the given output socket.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket is not a real-valued output.
    pub fn f64s_mut(&self, index: usize) -> Result<RefMut<'a, [f64]>, Error> {
        let buffer = self.write(index)?;
        RefMut::filter_map(buffer, Buffer::as_f64s_mut).map_err(|_| self.wrong_type(index))
    }

    fn socket(&self, index: usize, direction: Direction) -> Result<&'a Socket, Error> {
        match self.sockets.get(index) {
            Some(socket) if socket.direction() == direction => Ok(socket),
            Some(socket) => Err(Error::InvalidSocket(format!(
                "{}::{}::{} is not an {} socket",
                self.module,
                self.task,
                socket.name(),
                match direction {
                    Direction::Input => "input",
                    Direction::Output => "output",
                }
            ))),
            None => Err(Error::InvalidSocket(format!(
                "{}::{} has no socket with index {index}",
                self.module, self.task
            ))),
        }
    }

    fn read(&self, index: usize) -> Result<Ref<'a, Buffer>, Error> {
        let socket = self.socket(index, Direction::Input)?;
        let buffer = socket.buffer().ok_or_else(|| Error::UnboundRequiredInput {
            module: self.module.to_string(),
            task: self.task.to_string(),
            socket: socket.name().to_string(),
        })?;
        buffer.try_borrow().map_err(|_| self.busy(socket))
    }

    fn write(&self, index: usize) -> Result<RefMut<'a, Buffer>, Error> {
        let socket = self.socket(index, Direction::Output)?;
        match socket.buffer() {
            Some(buffer) => buffer.try_borrow_mut().map_err(|_| self.busy(socket)),
            None => Err(self.busy(socket)),
        }
    }

    fn busy(&self, socket: &Socket) -> Error {
        Error::InvalidSocket(format!(
            "{}::{}::{} is borrowed elsewhere",
            self.module,
            self.task,
            socket.name()
        ))
    }

    fn wrong_type(&self, index: usize) -> Error {
        let socket = &self.sockets[index];
        Error::InvalidSocket(format!(
            "{}::{}::{} carries {} elements",
            self.module,
            self.task,
            socket.name(),
            socket.element_type()
        ))
    }
}
