//! Typed, sized data endpoints of tasks
//!
//! An output socket owns a [`Buffer`] allocated with its declared element type and count. Binding
//! an input socket to an output socket makes the input share that buffer, so a consumer task
//! always reads what its producer wrote most recently; no data is copied.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::Bit;

/// Enumeration of element types that sockets can carry
#[derive(Clone, Eq, PartialEq, Debug, Copy, Hash, Deserialize, Serialize)]
pub enum ElementType {
    /// Binary symbols
    Bit,
    /// Real values (symbols, LLR values)
    F64,
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Bit => write!(f, "bit"),
            ElementType::F64 => write!(f, "f64"),
        }
    }
}

/// Socket data, tagged with its element type
#[derive(Clone, PartialEq, Debug)]
pub enum Buffer {
    /// Buffer of binary symbols
    Bit(Vec<Bit>),
    /// Buffer of real values
    F64(Vec<f64>),
}

impl Buffer {
    /// Returns zero-filled buffer with given element type and count.
    #[must_use]
    pub fn zeros(element_type: ElementType, len: usize) -> Self {
        match element_type {
            ElementType::Bit => Buffer::Bit(vec![Bit::Zero; len]),
            ElementType::F64 => Buffer::F64(vec![0.0; len]),
        }
    }

    /// Returns element type of the buffer.
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        match self {
            Buffer::Bit(_) => ElementType::Bit,
            Buffer::F64(_) => ElementType::F64,
        }
    }

    /// Returns number of elements in the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Buffer::Bit(v) => v.len(),
            Buffer::F64(v) => v.len(),
        }
    }

    /// Returns `true` if the buffer holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the bits held in the buffer, if it is a bit buffer.
    #[must_use]
    pub fn as_bits(&self) -> Option<&[Bit]> {
        match self {
            Buffer::Bit(v) => Some(v),
            Buffer::F64(_) => None,
        }
    }

    /// Returns the real values held in the buffer, if it is a real-valued buffer.
    #[must_use]
    pub fn as_f64s(&self) -> Option<&[f64]> {
        match self {
            Buffer::F64(v) => Some(v),
            Buffer::Bit(_) => None,
        }
    }

    /// Returns mutable access to the bits held in the buffer, if it is a bit buffer.
    pub fn as_bits_mut(&mut self) -> Option<&mut [Bit]> {
        match self {
            Buffer::Bit(v) => Some(v),
            Buffer::F64(_) => None,
        }
    }

    /// Returns mutable access to the real values held in the buffer, if it is a real-valued
    /// buffer.
    pub fn as_f64s_mut(&mut self) -> Option<&mut [f64]> {
        match self {
            Buffer::F64(v) => Some(v),
            Buffer::Bit(_) => None,
        }
    }

    /// Renders at most `limit` leading elements for debug output.
    pub(crate) fn preview(&self, limit: usize) -> String {
        let shown = limit.min(self.len());
        let mut text = match self {
            Buffer::Bit(v) => v[.. shown]
                .iter()
                .map(|b| b.value().to_string())
                .join(" "),
            Buffer::F64(v) => v[.. shown]
                .iter()
                .map(|x| format!("{x:.3}"))
                .join(" "),
        };
        if shown < self.len() {
            text.push_str(" ...");
        }
        text
    }
}

/// Direction of data flow through a socket
#[derive(Clone, Eq, PartialEq, Debug, Copy, Hash)]
pub enum Direction {
    /// Socket read by its task
    Input,
    /// Socket written by its task
    Output,
}

/// Declared shape of a socket
#[derive(Clone, Eq, PartialEq, Debug, Copy)]
pub struct SocketSpec {
    /// Socket name, unique within its task
    pub name: &'static str,
    /// Direction of data flow
    pub direction: Direction,
    /// Element type
    pub element_type: ElementType,
    /// Element count
    pub len: usize,
}

impl SocketSpec {
    /// Returns specification of an input socket.
    #[must_use]
    pub fn input(name: &'static str, element_type: ElementType, len: usize) -> Self {
        Self {
            name,
            direction: Direction::Input,
            element_type,
            len,
        }
    }

    /// Returns specification of an output socket.
    #[must_use]
    pub fn output(name: &'static str, element_type: ElementType, len: usize) -> Self {
        Self {
            name,
            direction: Direction::Output,
            element_type,
            len,
        }
    }
}

/// Shared handle to the buffer behind an output socket
pub(crate) type SharedBuffer = Rc<RefCell<Buffer>>;

/// Data endpoint owned by a task
#[derive(Debug)]
pub struct Socket {
    /// Declared shape
    spec: SocketSpec,
    /// Own buffer (output socket) or buffer of the bound producer (input socket)
    buffer: Option<SharedBuffer>,
    /// Fully-qualified name of the bound producer (input socket only)
    producer: Option<String>,
}

impl Socket {
    /// Returns socket with given shape; output sockets get a zero-filled buffer.
    pub(crate) fn new(spec: SocketSpec) -> Self {
        let buffer = match spec.direction {
            Direction::Output => Some(Rc::new(RefCell::new(Buffer::zeros(
                spec.element_type,
                spec.len,
            )))),
            Direction::Input => None,
        };
        Self {
            spec,
            buffer,
            producer: None,
        }
    }

    /// Returns socket name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    /// Returns direction of the socket.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.spec.direction
    }

    /// Returns element type of the socket.
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        self.spec.element_type
    }

    /// Returns element count of the socket.
    #[must_use]
    pub fn len(&self) -> usize {
        self.spec.len
    }

    /// Returns `true` if the socket carries no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spec.len == 0
    }

    /// Returns `true` for an output socket, or for an input socket with a producer.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.buffer.is_some()
    }

    /// Returns fully-qualified name of the producer bound to this input socket.
    #[must_use]
    pub fn producer(&self) -> Option<&str> {
        self.producer.as_deref()
    }

    pub(crate) fn buffer(&self) -> Option<&SharedBuffer> {
        self.buffer.as_ref()
    }

    /// Makes this input socket read from the given producer buffer.
    pub(crate) fn attach(&mut self, producer: String, buffer: SharedBuffer) {
        self.producer = Some(producer);
        self.buffer = Some(buffer);
    }
}

#[cfg(test)]
mod tests_of_buffer {
    use super::*;

    #[test]
    fn test_zeros() {
        let buffer = Buffer::zeros(ElementType::Bit, 4);
        assert_eq!(buffer, Buffer::Bit(vec![Bit::Zero; 4]));
        assert_eq!(buffer.element_type(), ElementType::Bit);
        let buffer = Buffer::zeros(ElementType::F64, 3);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.element_type(), ElementType::F64);
        assert!(Buffer::zeros(ElementType::F64, 0).is_empty());
    }

    #[test]
    fn test_typed_access() {
        let mut buffer = Buffer::zeros(ElementType::Bit, 2);
        assert!(buffer.as_f64s().is_none());
        assert!(buffer.as_f64s_mut().is_none());
        buffer.as_bits_mut().unwrap()[1] = Bit::One;
        assert_eq!(buffer.as_bits().unwrap(), [Bit::Zero, Bit::One]);
    }

    #[test]
    fn test_preview() {
        let buffer = Buffer::Bit(vec![Bit::One, Bit::Zero, Bit::One]);
        assert_eq!(buffer.preview(16), "1 0 1");
        assert_eq!(buffer.preview(2), "1 0 ...");
        let buffer = Buffer::F64(vec![0.5, -1.25]);
        assert_eq!(buffer.preview(16), "0.500 -1.250");
    }
}

#[cfg(test)]
mod tests_of_socket {
    use super::*;

    #[test]
    fn test_spec() {
        let spec = SocketSpec::input("Y_N", ElementType::F64, 8);
        let socket = Socket::new(spec);
        assert_eq!(socket.name(), spec.name);
        assert_eq!(socket.direction(), Direction::Input);
        assert_eq!(socket.len(), spec.len);
    }

    #[test]
    fn test_new() {
        let socket = Socket::new(SocketSpec::output("X_N", ElementType::F64, 8));
        assert!(socket.is_bound());
        assert_eq!(socket.buffer().unwrap().borrow().len(), 8);
        let socket = Socket::new(SocketSpec::input("Y_N", ElementType::F64, 8));
        assert!(!socket.is_bound());
        assert!(socket.producer().is_none());
    }

    #[test]
    fn test_attach() {
        let producer = Socket::new(SocketSpec::output("X_N", ElementType::Bit, 2));
        let mut consumer = Socket::new(SocketSpec::input("X_N1", ElementType::Bit, 2));
        consumer.attach(
            "enc::encode::X_N".to_string(),
            Rc::clone(producer.buffer().unwrap()),
        );
        assert!(consumer.is_bound());
        assert_eq!(consumer.producer(), Some("enc::encode::X_N"));
        producer.buffer().unwrap().borrow_mut().as_bits_mut().unwrap()[0] = Bit::One;
        assert_eq!(
            consumer.buffer().unwrap().borrow().as_bits().unwrap(),
            [Bit::One, Bit::Zero]
        );
    }
}
