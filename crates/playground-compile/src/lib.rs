//! Pipeline assembly and compilation for the playground.
//!
//! The transform, format and evaluate services are external; this crate
//! decides what to ask them and folds their answers into a [`CompileResult`].

pub mod engine;
pub mod error;
pub mod evaluator;
pub mod formatter;
pub mod pipeline;
pub mod report;
pub mod services;

pub use engine::{CompileEngine, CompileResult};
pub use error::{EvalError, FormatError, TransformError};
pub use evaluator::SandboxEvaluator;
pub use formatter::SandboxFormatter;
pub use pipeline::{
    assemble, EnvOptions, EnvTargets, PipelineInputs, PipelineSpec, PresetEntry, TargetSelection,
};
pub use report::EnvReport;
pub use services::{
    Evaluator, FormatConfig, Formatter, TrailingComma, TransformOutput, TransformRequest,
    TransformService,
};
