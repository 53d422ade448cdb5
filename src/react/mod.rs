//! 认知层：推理引擎边界、Planner、工具循环

pub mod engine;
pub mod loop_;
pub mod planner;

pub use engine::ReasoningEngine;
pub use loop_::{ToolLoopEngine, DEFAULT_MAX_STEPS};
pub use planner::{parse_llm_output, Planner, PlannerOutput, ToolCall};
