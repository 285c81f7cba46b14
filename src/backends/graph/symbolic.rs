use crate::backends::cpu::Cpu;
use crate::backends::graph::observer::SymbolicGraphObserver;
use crate::backends::graph::context::Heap;
use crate::backends::graph::GraphError;
use crate::backends::host::{HostBuffer, HostKernel, HOST_BUFFER_ALIGN};
use crate::dtype::DType;
use crate::op_kind::BinaryOp;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, Hash, Ord, PartialOrd, Eq, PartialEq, Serialize, Deserialize)]
pub struct SymbolicTensorId {
    inner: usize,
}

impl std::fmt::Display for SymbolicTensorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.inner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolicTensorInfo {
    pub dtype: DType,
    pub num_elements: u64,
}

impl SymbolicTensorInfo {
    pub fn byte_len(&self) -> Result<usize, GraphError> {
        self.dtype
            .buffer_byte_len(self.num_elements)
            .ok_or(GraphError::SizeOverflow)
    }
}

#[derive(Debug)]
pub enum SymbolicNode {
    Placeholder,
    Constant(HostBuffer),
    Binary {
        op: BinaryOp,
        a: SymbolicTensorId,
        b: SymbolicTensorId,
    },
}

#[derive(Debug)]
struct SymbolicEntry {
    info: SymbolicTensorInfo,
    node: SymbolicNode,
}

/// Append-only graph of symbolic tensors. Each tensor is produced by exactly
/// one node, and operands always precede the nodes that consume them.
#[derive(Debug, Default)]
pub struct SymbolicGraph {
    entries: Vec<SymbolicEntry>,
}

impl SymbolicGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, info: SymbolicTensorInfo, node: SymbolicNode) -> SymbolicTensorId {
        let id = SymbolicTensorId {
            inner: self.entries.len(),
        };
        self.entries.push(SymbolicEntry { info, node });
        id
    }

    fn entry(&self, id: SymbolicTensorId) -> Result<&SymbolicEntry, GraphError> {
        self.entries
            .get(id.inner)
            .ok_or(GraphError::UnknownTensor(id))
    }

    pub fn info(&self, id: SymbolicTensorId) -> Result<SymbolicTensorInfo, GraphError> {
        Ok(self.entry(id)?.info)
    }

    pub fn node(&self, id: SymbolicTensorId) -> Result<&SymbolicNode, GraphError> {
        Ok(&self.entry(id)?.node)
    }

    pub fn placeholder(&mut self, info: SymbolicTensorInfo) -> Result<SymbolicTensorId, GraphError> {
        info.byte_len()?;
        Ok(self.push(info, SymbolicNode::Placeholder))
    }

    pub fn constant(
        &mut self,
        info: SymbolicTensorInfo,
        value: HostBuffer,
    ) -> Result<SymbolicTensorId, GraphError> {
        let expected = info.byte_len()?;
        if value.len() != expected {
            return Err(GraphError::ValueSizeMismatch {
                expected,
                actual: value.len(),
            });
        }
        Ok(self.push(info, SymbolicNode::Constant(value)))
    }

    pub fn binary(
        &mut self,
        op: BinaryOp,
        a: SymbolicTensorId,
        b: SymbolicTensorId,
    ) -> Result<SymbolicTensorId, GraphError> {
        let a_info = self.info(a)?;
        let b_info = self.info(b)?;
        if a_info.dtype != b_info.dtype {
            return Err(GraphError::DTypeMismatch(a_info.dtype, b_info.dtype));
        }
        if a_info.num_elements != b_info.num_elements {
            return Err(GraphError::ElementCountMismatch(
                a_info.num_elements,
                b_info.num_elements,
            ));
        }
        Ok(self.push(a_info, SymbolicNode::Binary { op, a, b }))
    }

    /// Snapshots everything `outputs` depend on into a standalone executable.
    pub fn compile(&self, outputs: &[SymbolicTensorId]) -> Result<Executable, GraphError> {
        let mut needed = HashSet::new();
        let mut stack = outputs.to_vec();
        while let Some(id) = stack.pop() {
            if !needed.insert(id) {
                continue;
            }
            if let SymbolicNode::Binary { a, b, .. } = self.node(id)? {
                stack.push(*a);
                stack.push(*b);
            }
        }
        let mut order = needed.into_iter().collect::<Vec<_>>();
        order.sort();

        let mut steps = Vec::with_capacity(order.len());
        for id in order {
            let entry = self.entry(id)?;
            let kind = match &entry.node {
                SymbolicNode::Placeholder => StepKind::Feed,
                SymbolicNode::Constant(value) => StepKind::Constant(value.try_clone()?),
                SymbolicNode::Binary { op, a, b } => StepKind::Binary {
                    op: *op,
                    a: *a,
                    b: *b,
                },
            };
            steps.push(Step {
                output: id,
                info: entry.info,
                kind,
            });
        }
        log::debug!(
            "Compiled {} of {} symbolic tensors for {} outputs",
            steps.len(),
            self.len(),
            outputs.len()
        );
        Ok(Executable {
            steps,
            outputs: outputs.to_vec(),
        })
    }
}

#[derive(Debug)]
enum StepKind {
    Feed,
    Constant(HostBuffer),
    Binary {
        op: BinaryOp,
        a: SymbolicTensorId,
        b: SymbolicTensorId,
    },
}

#[derive(Debug)]
struct Step {
    output: SymbolicTensorId,
    info: SymbolicTensorInfo,
    kind: StepKind,
}

/// A compiled, self-contained slice of a [`SymbolicGraph`].
#[derive(Debug)]
pub struct Executable {
    steps: Vec<Step>,
    outputs: Vec<SymbolicTensorId>,
}

impl Executable {
    pub fn outputs(&self) -> &[SymbolicTensorId] {
        &self.outputs
    }

    pub fn placeholders(&self) -> impl Iterator<Item = SymbolicTensorId> + '_ {
        self.steps
            .iter()
            .filter(|x| matches!(x.kind, StepKind::Feed))
            .map(|x| x.output)
    }

    pub fn num_steps(&self) -> usize {
        self.steps.len()
    }

    /// Bytes needed to hold every intermediate value at once.
    pub fn required_bytes(&self) -> Result<usize, GraphError> {
        self.steps.iter().try_fold(0usize, |acc, x| {
            acc.checked_add(x.info.byte_len()?)
                .ok_or(GraphError::SizeOverflow)
        })
    }

    pub fn run<T: SymbolicGraphObserver>(
        &self,
        feeds: &HashMap<SymbolicTensorId, HostBuffer>,
        heap: Option<&Heap>,
        observer: &mut T,
    ) -> Result<HashMap<SymbolicTensorId, HostBuffer>, GraphError> {
        if let Some(heap) = heap {
            let required = self.required_bytes()?;
            if required > heap.capacity() {
                return Err(GraphError::HeapExhausted {
                    required,
                    capacity: heap.capacity(),
                });
            }
        }

        let mut values: HashMap<SymbolicTensorId, HostBuffer> = HashMap::new();
        for step in &self.steps {
            let value = match &step.kind {
                StepKind::Feed => {
                    let feed = feeds
                        .get(&step.output)
                        .ok_or(GraphError::MissingFeed(step.output))?;
                    let expected = step.info.byte_len()?;
                    if feed.len() != expected {
                        return Err(GraphError::ValueSizeMismatch {
                            expected,
                            actual: feed.len(),
                        });
                    }
                    HostBuffer::from_bytes(feed.as_bytes(), HOST_BUFFER_ALIGN)?
                }
                StepKind::Constant(value) => value.try_clone()?,
                StepKind::Binary { op, a, b } => {
                    let a = values.get(a).ok_or(GraphError::UnknownTensor(*a))?;
                    let b = values.get(b).ok_or(GraphError::UnknownTensor(*b))?;
                    <Cpu as HostKernel>::elementwise_binary(*op, step.info.dtype, a, b)?
                }
            };
            observer.on_step_executed(step.output);
            observer.on_tensor_assigned(step.output, &value);
            values.insert(step.output, value);
        }

        let mut outputs = HashMap::new();
        for id in &self.outputs {
            if outputs.contains_key(id) {
                continue;
            }
            let value = values.remove(id).ok_or(GraphError::UnknownTensor(*id))?;
            outputs.insert(*id, value);
        }
        Ok(outputs)
    }
}
