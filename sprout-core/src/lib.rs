// sprout-core: 类似 Spring 的 Bean 容器
//
// 提供类型安全的依赖注入功能，支持：
// - 单例和原型作用域
// - 构造器注入、属性注入（嵌套与下标路径）
// - 按名称、按类型、按构造器自动装配
// - 工厂 Bean、别名、后置处理器
// - 单例之间的循环依赖（提前暴露引用）
// - 生命周期管理（init/destroy 方法）

pub mod bean;
pub mod bean_factory;
pub mod bean_post_processor;
pub mod config;
pub mod convert;
pub mod error;
pub mod logging;
pub mod property;
pub mod registry;
pub mod scope;
pub mod singleton;
pub mod types;
pub mod utils;
pub mod value;

use error::ContainerResult;

// Helper trait for setters, init/destroy methods
// Allows (), ContainerResult<()> and anyhow::Result<()> return types
pub trait IntoResult {
    fn into_result(self) -> ContainerResult<()>;
}

impl IntoResult for () {
    fn into_result(self) -> ContainerResult<()> {
        Ok(())
    }
}

impl IntoResult for ContainerResult<()> {
    fn into_result(self) -> ContainerResult<()> {
        self
    }
}

impl IntoResult for anyhow::Result<()> {
    fn into_result(self) -> ContainerResult<()> {
        self.map_err(Into::into)
    }
}

// 重新导出常用类型
pub use bean::{BeanDefinition, BeanDefinitionBuilder, ConstructorArgs, ConstructorParam, FactoryBean};
pub use bean_factory::{
    BeanFactory, BeanFactoryExt, ConfigurableBeanFactory, ConfigurableListableBeanFactory,
    DefaultListableBeanFactory, ListableBeanFactory,
};
pub use bean_post_processor::{BeanPostProcessor, DependencyComparator};
pub use config::FactoryConfig;
pub use convert::{SimpleTypeConverter, TypeConverter};
pub use error::ContainerError;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use property::{PropertyTable, PropertyValue, PropertyValues};
pub use scope::{AutowireMode, Scope};
pub use types::{BeanType, BeanView, Object, TypeKey};
pub use value::{Literal, Value};

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use crate::bean::{BeanDefinition, ConstructorArgs, ConstructorParam, FactoryBean};
    pub use crate::bean_factory::{
        BeanFactory, BeanFactoryExt, ConfigurableBeanFactory, ConfigurableListableBeanFactory,
        DefaultListableBeanFactory, ListableBeanFactory,
    };
    pub use crate::bean_post_processor::{BeanPostProcessor, DependencyComparator};
    pub use crate::config::FactoryConfig;
    pub use crate::convert::TypeConverter;
    pub use crate::error::{ContainerError, ContainerResult};
    pub use crate::logging::{LogFormat, LogLevel, LoggingConfig};
    pub use crate::property::{PropertyTable, PropertyValue, PropertyValues};
    pub use crate::scope::{AutowireMode, Scope};
    pub use crate::types::{BeanType, BeanView, Object, TypeKey};
    pub use crate::utils;
    pub use crate::value::{Literal, Value};
    // Re-export anyhow for convenience
    pub use anyhow::{anyhow, Context};
}
