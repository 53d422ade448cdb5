//! 挂起状态机
//!
//! RUNNING → SUSPENDED → RUNNING → … → DONE。
//! 挂起阶段没有超时或自动重试：会话会一直停留在 SUSPENDED，直到外部投递一条关联的恢复消息。

use serde::{Deserialize, Serialize};

use crate::core::context::{StopSignal, WaitKind};

/// 会话（某个 agent 视角下）的阶段；SUSPENDED / DONE 会随记录持久化
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SessionPhase {
    /// 推理引擎正在运行（只存在于调用内部）
    Running,
    /// 等待外部异步步骤的结果
    Suspended {
        tool_use_id: String,
        waiting_on: WaitKind,
    },
    /// 推理完成，没有隐含的下一步（或已把结果交还委派方）
    Done,
}

impl SessionPhase {
    /// 收到任务（新建或恢复）后进入 RUNNING
    pub fn start() -> Self {
        SessionPhase::Running
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self, SessionPhase::Suspended { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Done)
    }

    /// 推理结束后根据调用上下文中的停止信号决定下一阶段
    pub fn after_reasoning(self, signal: Option<&StopSignal>) -> Self {
        debug_assert!(matches!(self, SessionPhase::Running));
        match signal {
            Some(StopSignal::Suspend {
                tool_use_id,
                waiting_on,
            }) => SessionPhase::Suspended {
                tool_use_id: tool_use_id.clone(),
                waiting_on: *waiting_on,
            },
            Some(StopSignal::Handoff) | None => SessionPhase::Done,
        }
    }

    /// 恢复消息是否与挂起的工具调用对得上；不匹配不阻止处理，只用于告警
    pub fn matches_resume(&self, tool_use_ids: &[&str]) -> bool {
        match self {
            SessionPhase::Suspended { tool_use_id, .. } => {
                tool_use_ids.iter().any(|id| id == tool_use_id)
            }
            _ => false,
        }
    }
}
