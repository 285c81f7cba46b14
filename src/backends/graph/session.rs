use crate::backends::graph::context::{
    CommandBuffer, CommandQueue, ComputeEncoder, Device, Heap, SerialQueue,
};
use crate::backends::graph::observer::SymbolicGraphObserver;
use crate::backends::graph::symbolic::{Executable, SymbolicTensorId, SymbolicTensorInfo};
use crate::backends::graph::{Graph, GraphContext, GraphError, GraphStorage};
use crate::backends::host::HostBuffer;
use crate::dtype::{DType, DTypeOfPrimitive};
use crate::shape::Shape;
use crate::tensor::{Tensor, TensorError};
use crate::tensor_rank::Rank;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSessionConfig {
    pub device_name: String,
    pub queue_label: String,
    /// Byte limit for one executable run. `None` disables the check.
    pub heap_capacity: Option<usize>,
    pub serial_execution: bool,
}

impl Default for GraphSessionConfig {
    fn default() -> Self {
        Self {
            device_name: "host-reference".to_string(),
            queue_label: "default".to_string(),
            heap_capacity: None,
            serial_execution: true,
        }
    }
}

/// Owns the device objects of one graph session and drives compilation and
/// execution of the symbolic graph its tensors build up.
#[derive(Debug, Clone)]
pub struct GraphSession {
    context: GraphContext,
}

impl GraphSession {
    pub fn new(config: GraphSessionConfig) -> Self {
        let device = Arc::new(Device::new(config.device_name.clone()));
        let queue = Arc::new(CommandQueue::new(config.queue_label.clone()));
        let mut context = GraphContext::new(device, queue)
            .with_command_buffer(Arc::new(CommandBuffer::new(format!(
                "{}-commands",
                config.queue_label
            ))))
            .with_encoder(Arc::new(ComputeEncoder::new(format!(
                "{}-encoder",
                config.queue_label
            ))));
        if config.serial_execution {
            context = context.with_serial_queue(Arc::new(SerialQueue::new(format!(
                "{}-serial",
                config.queue_label
            ))));
        }
        if let Some(capacity) = config.heap_capacity {
            context = context.with_heap(Arc::new(Heap::new(capacity)));
        }
        log::info!(
            "Opened graph session on {} (queue {}, heap {:?})",
            config.device_name,
            config.queue_label,
            config.heap_capacity
        );
        Self { context }
    }

    pub fn context(&self) -> &GraphContext {
        &self.context
    }

    /// Records `values` as a constant of the session graph.
    pub fn constant<T: bytemuck::Pod + DTypeOfPrimitive>(
        &self,
        values: &[T],
    ) -> Result<GraphStorage, GraphError> {
        let info = SymbolicTensorInfo {
            dtype: T::DTYPE,
            num_elements: values.len() as u64,
        };
        let id = self
            .context
            .lock_graph()?
            .constant(info, HostBuffer::from_values(values)?)?;
        Ok(GraphStorage::new(id, GraphContext::derive(&self.context)))
    }

    /// Records an input whose value is supplied when the graph runs.
    pub fn placeholder(&self, dtype: DType, num_elements: u64) -> Result<GraphStorage, GraphError> {
        let id = self.context.lock_graph()?.placeholder(SymbolicTensorInfo {
            dtype,
            num_elements,
        })?;
        Ok(GraphStorage::new(id, GraphContext::derive(&self.context)))
    }

    pub fn constant_tensor<T: bytemuck::Pod + DTypeOfPrimitive, R: Rank>(
        &self,
        values: &[T],
        shape: Shape<R>,
    ) -> Result<Tensor<Graph, R>, TensorError> {
        Tensor::leaf(self.constant(values)?, shape, T::DTYPE, false, None)
    }

    pub fn placeholder_tensor<R: Rank>(
        &self,
        dtype: DType,
        shape: Shape<R>,
        name: Option<String>,
    ) -> Result<Tensor<Graph, R>, TensorError> {
        let num_elements = shape.num_elements().ok_or(TensorError::SizeOverflow)?;
        let storage = self.placeholder(dtype, num_elements)?;
        Tensor::leaf(storage, shape, dtype, false, name)
    }

    pub fn compile(&self, outputs: &[SymbolicTensorId]) -> Result<Arc<Executable>, GraphError> {
        Ok(Arc::new(self.context.lock_graph()?.compile(outputs)?))
    }

    /// Compiles everything `tensor` depends on and returns a context carrying
    /// the executable.
    pub fn prepare<R: Rank>(&self, tensor: &Tensor<Graph, R>) -> Result<GraphContext, GraphError> {
        let storage = tensor.storage();
        if !storage.context().same_session(&self.context) {
            return Err(GraphError::SessionMismatch);
        }
        let id = storage.data().ok_or(GraphError::Unmaterialized)?;
        let executable = self.compile(&[id])?;
        Ok(GraphContext::derive(&self.context).with_executable(executable))
    }

    /// Runs the executable attached to `context`.
    pub fn execute(
        &self,
        context: &GraphContext,
        feeds: &HashMap<SymbolicTensorId, HostBuffer>,
    ) -> Result<HashMap<SymbolicTensorId, HostBuffer>, GraphError> {
        let executable = context.executable().ok_or(GraphError::NoExecutable)?;
        self.run(executable, feeds, &mut ())
    }

    pub fn run<T: SymbolicGraphObserver>(
        &self,
        executable: &Executable,
        feeds: &HashMap<SymbolicTensorId, HostBuffer>,
        observer: &mut T,
    ) -> Result<HashMap<SymbolicTensorId, HostBuffer>, GraphError> {
        log::debug!(
            "Running {} steps on {}",
            executable.num_steps(),
            self.context.device().name()
        );
        executable.run(feeds, self.context.heap().map(|x| x.as_ref()), observer)
    }

    /// Computes the value of `tensor` from the given placeholder feeds.
    pub fn evaluate<R: Rank>(
        &self,
        tensor: &Tensor<Graph, R>,
        feeds: &HashMap<SymbolicTensorId, HostBuffer>,
    ) -> Result<HostBuffer, GraphError> {
        let context = self.prepare(tensor)?;
        let id = tensor.storage().data().ok_or(GraphError::Unmaterialized)?;
        let mut outputs = self.execute(&context, feeds)?;
        outputs.remove(&id).ok_or(GraphError::UnknownTensor(id))
    }
}
