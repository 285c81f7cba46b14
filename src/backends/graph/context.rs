use crate::backends::graph::symbolic::{Executable, SymbolicGraph, SymbolicTensorId, SymbolicTensorInfo};
use crate::backends::graph::GraphError;
use crate::op_kind::BinaryOp;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug)]
pub struct Device {
    name: String,
}

impl Device {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug)]
pub struct CommandQueue {
    label: String,
}

impl CommandQueue {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

#[derive(Debug)]
pub struct CommandBuffer {
    label: String,
}

impl CommandBuffer {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

#[derive(Debug)]
pub struct ComputeEncoder {
    label: String,
}

impl ComputeEncoder {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

#[derive(Debug)]
pub struct SerialQueue {
    label: String,
}

impl SerialQueue {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Upper bound on the bytes an executable may hold live during one run.
#[derive(Debug)]
pub struct Heap {
    capacity: usize,
}

impl Heap {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Session objects shared by every graph tensor created in one device session.
///
/// Tensors only hold references; the session that created the objects owns
/// their lifetime. The symbolic graph is the one mutable member and is only
/// ever appended to.
#[derive(Debug, Clone)]
pub struct GraphContext {
    device: Arc<Device>,
    queue: Arc<CommandQueue>,
    command_buffer: Option<Arc<CommandBuffer>>,
    encoder: Option<Arc<ComputeEncoder>>,
    executable: Option<Arc<Executable>>,
    serial_queue: Option<Arc<SerialQueue>>,
    heap: Option<Arc<Heap>>,
    graph: Arc<Mutex<SymbolicGraph>>,
}

impl GraphContext {
    /// A fresh context with an empty symbolic graph and nothing else attached.
    pub fn new(device: Arc<Device>, queue: Arc<CommandQueue>) -> Self {
        Self {
            device,
            queue,
            command_buffer: None,
            encoder: None,
            executable: None,
            serial_queue: None,
            heap: None,
            graph: Arc::new(Mutex::new(SymbolicGraph::new())),
        }
    }

    /// A context for a result produced in the same session as `parent`.
    pub fn derive(parent: &GraphContext) -> Self {
        Self {
            device: parent.device.clone(),
            queue: parent.queue.clone(),
            command_buffer: parent.command_buffer.clone(),
            encoder: parent.encoder.clone(),
            executable: parent.executable.clone(),
            serial_queue: parent.serial_queue.clone(),
            heap: parent.heap.clone(),
            graph: parent.graph.clone(),
        }
    }

    pub fn with_command_buffer(mut self, command_buffer: Arc<CommandBuffer>) -> Self {
        self.command_buffer = Some(command_buffer);
        self
    }

    pub fn with_encoder(mut self, encoder: Arc<ComputeEncoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn with_executable(mut self, executable: Arc<Executable>) -> Self {
        self.executable = Some(executable);
        self
    }

    pub fn with_serial_queue(mut self, serial_queue: Arc<SerialQueue>) -> Self {
        self.serial_queue = Some(serial_queue);
        self
    }

    pub fn with_heap(mut self, heap: Arc<Heap>) -> Self {
        self.heap = Some(heap);
        self
    }

    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<CommandQueue> {
        &self.queue
    }

    pub fn command_buffer(&self) -> Option<&Arc<CommandBuffer>> {
        self.command_buffer.as_ref()
    }

    pub fn encoder(&self) -> Option<&Arc<ComputeEncoder>> {
        self.encoder.as_ref()
    }

    pub fn executable(&self) -> Option<&Arc<Executable>> {
        self.executable.as_ref()
    }

    pub fn serial_queue(&self) -> Option<&Arc<SerialQueue>> {
        self.serial_queue.as_ref()
    }

    pub fn heap(&self) -> Option<&Arc<Heap>> {
        self.heap.as_ref()
    }

    pub fn same_session(&self, other: &GraphContext) -> bool {
        Arc::ptr_eq(&self.graph, &other.graph)
    }

    pub(crate) fn lock_graph(&self) -> Result<MutexGuard<'_, SymbolicGraph>, GraphError> {
        self.graph.lock().map_err(|_| GraphError::Poisoned)
    }

    pub fn info(&self, id: SymbolicTensorId) -> Result<SymbolicTensorInfo, GraphError> {
        self.lock_graph()?.info(id)
    }

    /// Appends `op(left, right)` to the session graph without computing it.
    pub fn emit_symbolic_binary(
        &self,
        op: BinaryOp,
        left: SymbolicTensorId,
        right: SymbolicTensorId,
    ) -> Result<SymbolicTensorId, GraphError> {
        let out = self.lock_graph()?.binary(op, left, right)?;
        log::trace!("emitted {out} = {op}({left}, {right}) on {}", self.device.name());
        Ok(out)
    }
}
