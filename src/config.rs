//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `HIVE__*` 覆盖（双下划线表示嵌套，如 `HIVE__LLM__PROVIDER=openai`）。
//! 每个字段都有默认值，空配置即可运行（Mock LLM + data/hive.db 下的 SQLite 存储）。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::core::AgentIdentity;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub agent: AgentSection,
    pub store: StoreSection,
    pub dispatch: DispatchSection,
    pub llm: LlmSection,
    pub tools: ToolsSection,
    pub bridge: BridgeSection,
}

/// [agent] 段：身份、回调地址、system prompt、推理步数上限
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    /// 参与存储键的 agent 名
    pub name: String,
    /// 本 agent 的收件地址；委派出去的任务完成后回调到这里
    pub callback_address: String,
    pub system_prompt: Option<String>,
    /// 从文件读取 system prompt（优先于 system_prompt）
    pub system_prompt_path: Option<PathBuf>,
    pub max_steps: usize,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            name: "hive-agent".to_string(),
            callback_address: "http://127.0.0.1:8080/tasks".to_string(),
            system_prompt: None,
            system_prompt_path: None,
            max_steps: crate::react::DEFAULT_MAX_STEPS,
        }
    }
}

impl AgentSection {
    pub fn identity(&self) -> AgentIdentity {
        AgentIdentity::new(self.name.clone(), self.callback_address.clone())
    }

    /// 解析最终使用的 system prompt：文件 > 内联 > 默认
    pub fn resolve_system_prompt(&self) -> String {
        if let Some(path) = &self.system_prompt_path {
            match std::fs::read_to_string(path) {
                Ok(s) => return s,
                Err(e) => tracing::warn!("Failed to read system prompt {:?}: {}", path, e),
            }
        }
        self.system_prompt
            .clone()
            .unwrap_or_else(|| "You are a helpful assistant.".to_string())
    }
}

/// [store] 段：后端、路径与保留策略
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// sqlite / memory（memory 只适合测试与常驻进程）
    pub backend: String,
    pub path: Option<PathBuf>,
    /// DONE 记录的保留时长（秒）；SUSPENDED 记录不受影响
    pub retention_secs: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            path: Some(PathBuf::from("data/hive.db")),
            retention_secs: 7 * 24 * 3600,
        }
    }
}

impl StoreSection {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}

/// [dispatch] 段
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DispatchSection {
    /// 为 true 时无法识别的任务类型直接校验失败，而不是回退到问候语
    pub strict_task_types: bool,
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// openai / mock
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    /// 未设置时读取 OPENAI_API_KEY
    pub api_key: Option<String>,
    /// 单次请求超时（秒）
    pub timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            api_key: None,
            timeout_secs: 60,
        }
    }
}

/// [tools] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    pub tool_timeout_secs: u64,
    pub approval: ApprovalSection,
    /// 委派工具列表
    pub delegates: Vec<DelegateEntry>,
    /// 结果回报工具名；为空字符串时不注册
    pub report_tool: String,
    /// 是否注册 echo
    pub echo: bool,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 30,
            approval: ApprovalSection::default(),
            delegates: Vec::new(),
            report_tool: crate::tools::DEFAULT_REPORT_TOOL.to_string(),
            echo: true,
        }
    }
}

/// [tools.approval] 段
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ApprovalSection {
    /// 审批桥的基础地址（以 / 结尾）；未设置时不注册 human_approval
    pub endpoint: Option<String>,
    /// 审批通知 webhook；未设置时只写日志
    pub notify_url: Option<String>,
}

/// [[tools.delegates]] 条目
#[derive(Debug, Clone, Deserialize)]
pub struct DelegateEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// 被委派 agent 的收件地址
    pub destination: String,
    /// 是否按评估请求记录等待类型
    #[serde(default)]
    pub evaluation: bool,
}

/// [bridge] 段：人工决定桥
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeSection {
    pub listen: String,
    /// 决定转成 Existing 任务后投递到的地址
    pub agent_inbox: String,
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8090".to_string(),
            agent_inbox: "http://127.0.0.1:8080/tasks".to_string(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 HIVE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 HIVE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    for name in ["config/default", "../config/default", "default"] {
        if std::path::Path::new(&format!("{}.toml", name)).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("HIVE")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_has_defaults() {
        let cfg: AppConfig = config::Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(cfg.store.backend, "sqlite");
        assert_eq!(cfg.store.path, Some(PathBuf::from("data/hive.db")));
        assert_eq!(cfg.store.retention_secs, 604_800);
        assert_eq!(cfg.agent.max_steps, crate::react::DEFAULT_MAX_STEPS);
        assert_eq!(cfg.llm.provider, "mock");
        assert_eq!(cfg.tools.report_tool, "report_result");
        assert!(!cfg.dispatch.strict_task_types);
    }

    #[test]
    fn test_file_with_delegates() {
        let mut f = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            f,
            r#"
[agent]
name = "post-generator-agent"
callback_address = "mem://post-generator"

[store]
backend = "sqlite"
path = "data/hive.db"

[[tools.delegates]]
name = "evaluator_agent"
description = "Request evaluation of a social media post"
destination = "mem://evaluator"
evaluation = true
"#
        )
        .unwrap();
        let cfg = load_config(Some(f.path().to_path_buf())).unwrap();
        assert_eq!(cfg.agent.name, "post-generator-agent");
        assert_eq!(cfg.store.backend, "sqlite");
        assert_eq!(cfg.tools.delegates.len(), 1);
        assert!(cfg.tools.delegates[0].evaluation);
        assert_eq!(cfg.agent.identity().callback_address, "mem://post-generator");
    }
}
