//! 单次调用的可变执行上下文
//!
//! 以 &mut 形式贯穿推理循环与每一次工具调用；工具通过它请求挂起 / 交还，
//! harness 在推理结束后读取停止信号决定是否持久化为 SUSPENDED。
//! 作用域仅限一次调用，不能在并发调用之间共享。

use serde::{Deserialize, Serialize};

use crate::task::{ParentRecord, SessionId};

/// Agent 身份：参与存储键，也是委派时的回调地址
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentIdentity {
    pub name: String,
    /// 本 agent 的收件地址（队列 / 通道名或 URL）
    pub callback_address: String,
}

impl AgentIdentity {
    pub fn new(name: impl Into<String>, callback_address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            callback_address: callback_address.into(),
        }
    }
}

/// 挂起等待的外部步骤类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitKind {
    HumanApproval,
    Delegation,
    Evaluation,
}

/// 工具写入的停止信号
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StopSignal {
    /// 发起了外部异步动作，等待 tool_use_id 对应的结果
    Suspend {
        tool_use_id: String,
        waiting_on: WaitKind,
    },
    /// 已把结果回报给委派方，本 agent 无需再等待
    Handoff,
}

/// 单次调用上下文
#[derive(Debug)]
pub struct InvocationContext {
    agent: AgentIdentity,
    session_id: SessionId,
    parent: Option<ParentRecord>,
    stop: Option<StopSignal>,
}

impl InvocationContext {
    pub fn new(agent: AgentIdentity, session_id: SessionId, parent: Option<ParentRecord>) -> Self {
        Self {
            agent,
            session_id,
            parent,
            stop: None,
        }
    }

    pub fn agent(&self) -> &AgentIdentity {
        &self.agent
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// 本 agent 的委派方（根 agent 为 None）
    pub fn parent(&self) -> Option<&ParentRecord> {
        self.parent.as_ref()
    }

    /// 请求挂起；同一次调用内只保留第一个停止信号
    pub fn request_suspend(&mut self, tool_use_id: impl Into<String>, waiting_on: WaitKind) {
        if self.stop.is_none() {
            self.stop = Some(StopSignal::Suspend {
                tool_use_id: tool_use_id.into(),
                waiting_on,
            });
        }
    }

    /// 结果已交还委派方，本次推理应停止
    pub fn request_handoff(&mut self) {
        if self.stop.is_none() {
            self.stop = Some(StopSignal::Handoff);
        }
    }

    pub fn should_stop(&self) -> bool {
        self.stop.is_some()
    }

    pub fn is_suspend_requested(&self) -> bool {
        matches!(self.stop, Some(StopSignal::Suspend { .. }))
    }

    pub fn stop_signal(&self) -> Option<&StopSignal> {
        self.stop.as_ref()
    }

    /// 有委派方，却既没有交还结果也没有挂起：委派方会一直停在 SUSPENDED
    pub fn leaves_parent_waiting(&self) -> bool {
        self.parent.is_some() && self.stop.is_none()
    }

    /// 构造委派时携带的父记录：本 agent 身份 + 当前 session_id + 回调地址 + 待解决的 tool_use_id
    pub fn delegation_parent(&self, tool_use_id: &str, tool_name: &str) -> ParentRecord {
        ParentRecord {
            agent_name: self.agent.name.clone(),
            session_id: self.session_id.clone(),
            callback_address: self.agent.callback_address.clone(),
            tool_use_id: tool_use_id.to_string(),
            tool_name: Some(tool_name.to_string()),
        }
    }
}
