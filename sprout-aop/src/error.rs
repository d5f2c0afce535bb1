//! AOP 错误类型
//!
//! 被拦截的方法调用本身返回 `anyhow::Result`，目标方法的错误原样穿过通知链；
//! 这里只描述代理配置和调用链本身的问题。

use sprout_core::ContainerError;
use thiserror::Error;

pub type AopResult<T> = Result<T, AopError>;

#[derive(Debug, Error)]
pub enum AopError {
    /// 代理工厂没有设置目标对象
    #[error("No target set on proxy factory for '{0}'")]
    NoTarget(&'static str),

    /// 调用链已经到达目标方法后再次调用 `proceed`
    #[error("Invocation of '{0}' has already reached its target; proceed() cannot be called again")]
    ProceedAfterCompletion(String),

    /// 返回值类型与调用方期望的类型不一致
    #[error("Return value of type '{actual}' is not of expected type '{expected}'")]
    ReturnTypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// 参数不存在或类型不一致
    #[error("Argument {index} is missing or not of type '{expected}'")]
    ArgumentMismatch { index: usize, expected: &'static str },

    /// Bean 名称匹配模式无效
    #[error("Invalid bean name pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// 从容器获取目标对象失败
    #[error(transparent)]
    Container(#[from] ContainerError),
}

impl From<AopError> for ContainerError {
    fn from(error: AopError) -> Self {
        match error {
            AopError::Container(inner) => inner,
            other => ContainerError::Other(other.into()),
        }
    }
}
