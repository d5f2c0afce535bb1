//! 容器配置
//!
//! ```toml
//! allow_bean_definition_overriding = false
//! allow_circular_references = true
//!
//! [logging]
//! level = "debug"
//! format = "compact"
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ContainerError, ContainerResult};
use crate::logging::LoggingConfig;

/// Bean 工厂配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    /// 是否允许同名定义覆盖（默认：false）
    pub allow_bean_definition_overriding: bool,

    /// 是否通过提前暴露引用解决单例间的循环依赖（默认：true）
    pub allow_circular_references: bool,

    pub logging: Option<LoggingConfig>,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            allow_bean_definition_overriding: false,
            allow_circular_references: true,
            logging: None,
        }
    }
}

impl FactoryConfig {
    /// 从 TOML 字符串解析
    pub fn from_toml_str(content: &str) -> ContainerResult<Self> {
        toml::from_str(content).map_err(|e| ContainerError::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// 从 TOML 文件加载
    pub fn from_file(path: impl AsRef<Path>) -> ContainerResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ContainerError::Config(format!("Failed to read config file {:?}: {}", path, e)))?;
        Self::from_toml_str(&content)
    }

    pub fn allow_bean_definition_overriding(mut self, allow: bool) -> Self {
        self.allow_bean_definition_overriding = allow;
        self
    }

    pub fn allow_circular_references(mut self, allow: bool) -> Self {
        self.allow_circular_references = allow;
        self
    }

    /// 按 `[logging]` 段初始化日志，未配置时不做任何事
    pub fn init_logging(&self) -> ContainerResult<()> {
        match &self.logging {
            Some(logging) => logging.clone().with_env_overrides().init(),
            None => Ok(()),
        }
    }
}
