//! 任务分发：把一条原始入站消息解析为 TaskEnvelope
//!
//! 缺少 type / body / session_id 直接返回校验错误；
//! type 存在但无法识别时不硬失败（非严格模式），回退为一个匿名新会话 + 通用问候语，
//! 保证管线不会被格式异常但非空的输入卡住。

use crate::core::ValidationError;
use crate::task::envelope::{ParentRecord, TaskEnvelope, TaskMessage};

/// 分发结果
#[derive(Clone, Debug, PartialEq)]
pub enum Dispatch {
    Task(TaskEnvelope),
    /// 无法识别的 type，按回退路径处理
    Unrecognized {
        kind: String,
        parent: Option<ParentRecord>,
    },
}

/// 任务分发器
#[derive(Clone, Debug, Default)]
pub struct Dispatcher {
    strict: bool,
}

impl Dispatcher {
    pub fn new(strict_task_types: bool) -> Self {
        Self {
            strict: strict_task_types,
        }
    }

    /// 从原始 JSON 文本解析
    pub fn parse(&self, raw: &str) -> Result<Dispatch, ValidationError> {
        let msg: TaskMessage = serde_json::from_str(raw)
            .map_err(|e| ValidationError::Malformed(e.to_string()))?;
        self.dispatch(msg)
    }

    pub fn dispatch(&self, msg: TaskMessage) -> Result<Dispatch, ValidationError> {
        let kind = msg
            .kind_str()
            .filter(|k| !k.is_empty())
            .ok_or(ValidationError::MissingType)?
            .to_string();
        tracing::info!("Preparing agent for {} task", kind);
        match kind.as_str() {
            "new" => Ok(Dispatch::Task(TaskEnvelope::new_from_message(msg)?)),
            "existing" => Ok(Dispatch::Task(TaskEnvelope::existing_from_message(msg)?)),
            _ if self.strict => Err(ValidationError::UnsupportedType(kind)),
            _ => {
                tracing::warn!("Unknown task type: {}", kind);
                Ok(Dispatch::Unrecognized {
                    kind,
                    parent: msg.parent,
                })
            }
        }
    }
}
