pub mod compiled;
pub mod compiler;
pub mod graph;
pub mod init;

pub use compiled::{CompiledLayer, CompiledNetwork};
pub use compiler::compile;
pub use graph::{EdgeSpec, LayerGraph, LayerKind, LayerSpec, NodeSpec};
pub use init::WeightInit;
