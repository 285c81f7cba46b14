use crate::backends::graph::SymbolicTensorId;
use crate::backends::host::HostBuffer;

pub trait SymbolicGraphObserver {
    fn on_tensor_assigned(&mut self, tensor_id: SymbolicTensorId, value: &HostBuffer);
    fn on_step_executed(&mut self, tensor_id: SymbolicTensorId);
}

impl SymbolicGraphObserver for () {
    fn on_tensor_assigned(&mut self, _tensor_id: SymbolicTensorId, _value: &HostBuffer) {}
    fn on_step_executed(&mut self, _tensor_id: SymbolicTensorId) {}
}
