//! 容器错误类型
//!
//! 所有解析失败都会原样返回给 `get_bean` 的调用方，容器内部不做重试。
//! 创建流水线中的失败统一包装为 [`ContainerError::BeanCreation`]，
//! 通过 [`ContainerError::root_cause`] 可以拿到最内层的原因。

use thiserror::Error;

/// 容器统一结果类型
pub type ContainerResult<T> = Result<T, ContainerError>;

/// 容器错误
#[derive(Debug, Error)]
pub enum ContainerError {
    /// 名称（或别名）没有绑定任何 Bean
    #[error("No bean named '{0}' is defined")]
    NameNotFound(String),

    /// 名称已经被另一个定义或单例占用
    #[error("Cannot register '{name}': {reason}")]
    DuplicateDefinition { name: String, reason: String },

    /// 别名链会形成环
    #[error("Cannot register alias '{alias}' for name '{name}': circular reference")]
    AliasCycle { name: String, alias: String },

    /// 按类型查找时存在多个候选且无法裁决
    #[error("No qualifying bean of type '{type_name}': expected single matching bean but found {}: {}", candidates.len(), candidates.join(", "))]
    AmbiguousType {
        type_name: String,
        candidates: Vec<String>,
    },

    /// 按类型查找时没有任何候选
    #[error("No qualifying bean of type '{0}' available")]
    NoSuchType(String),

    /// 找不到可用的构造器
    #[error("No suitable constructor found for bean '{name}': {reason}")]
    NoSuitableConstructor { name: String, reason: String },

    /// 属性值无法转换为目标类型
    #[error("Failed to convert value for '{property}' to required type '{required}'")]
    TypeMismatch { property: String, required: String },

    /// 属性路径无法写入（属性不存在、不是嵌套属性、路径格式错误）
    #[error("Invalid property '{property}' of bean type '{bean_type}': {reason}")]
    InvalidProperty {
        property: String,
        bean_type: String,
        reason: String,
    },

    /// Bean 无法转换为调用方要求的类型
    #[error("Bean named '{name}' is expected to be of type '{required}'")]
    BeanNotOfRequiredType { name: String, required: String },

    /// 无法解析的循环引用（原型 Bean 之间的环、构造器注入环等）
    #[error("Requested bean '{name}' is currently in creation: {reason}")]
    UnresolvableCircularReference { name: String, reason: String },

    /// 以 `&` 访问的 Bean 不是工厂对象
    #[error("Bean named '{0}' is not a factory bean")]
    NotAFactory(String),

    /// 配置已冻结或 Bean 已创建，不能再修改定义
    #[error("Bean definition '{0}' can no longer be modified")]
    ConfigurationFrozen(String),

    /// 创建 Bean 的流水线失败
    #[error("Error creating bean with name '{name}': {source}")]
    BeanCreation {
        name: String,
        #[source]
        source: Box<ContainerError>,
    },

    /// 配置加载失败
    #[error("Configuration error: {0}")]
    Config(String),

    /// 日志初始化失败
    #[error("Failed to initialize logging: {0}")]
    LoggingInitFailed(String),

    /// 用户代码（构造器、setter、钩子）返回的错误
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ContainerError {
    /// 将错误包装为某个 Bean 的创建失败
    ///
    /// 如果错误已经是同名 Bean 的创建失败，则不重复包装
    pub fn creation(name: &str, source: ContainerError) -> Self {
        if matches!(&source, ContainerError::BeanCreation { name: inner, .. } if inner == name) {
            return source;
        }
        ContainerError::BeanCreation {
            name: name.to_string(),
            source: Box::new(source),
        }
    }

    /// 剥离所有 `BeanCreation` 包装后的最内层错误
    pub fn root_cause(&self) -> &ContainerError {
        let mut current = self;
        while let ContainerError::BeanCreation { source, .. } = current {
            current = source;
        }
        current
    }

    /// 是否为循环引用错误（考虑包装）
    pub fn is_circular_reference(&self) -> bool {
        matches!(
            self.root_cause(),
            ContainerError::UnresolvableCircularReference { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_cause_unwraps_nested_creation() {
        let err = ContainerError::creation(
            "userService",
            ContainerError::creation(
                "userDao",
                ContainerError::UnresolvableCircularReference {
                    name: "userService".to_string(),
                    reason: "prototype".to_string(),
                },
            ),
        );

        assert!(err.is_circular_reference());
        assert!(err.to_string().contains("userService"));
        match err {
            ContainerError::BeanCreation { name, source } => {
                assert_eq!(name, "userService");
                assert!(matches!(*source, ContainerError::BeanCreation { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_creation_does_not_double_wrap_same_name() {
        let inner = ContainerError::creation("user", ContainerError::NameNotFound("dao".into()));
        let outer = ContainerError::creation("user", inner);

        match outer {
            ContainerError::BeanCreation { source, .. } => {
                assert!(matches!(*source, ContainerError::NameNotFound(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_ambiguous_message_lists_candidates() {
        let err = ContainerError::AmbiguousType {
            type_name: "User".to_string(),
            candidates: vec!["a".to_string(), "b".to_string()],
        };
        assert!(err.to_string().contains("found 2: a, b"));
    }
}
