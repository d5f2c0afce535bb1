//! Sprout AOP - 方法拦截代理
//!
//! 提供类似 Spring AOP 的代理功能，支持：
//! - 环绕通知（MethodInterceptor）与拦截器链
//! - 前置、返回后、异常通知
//! - 通过 ProxyFactory 手动创建代理
//! - 通过 ProxyFactoryBean 把容器中的 Bean 暴露为代理
//! - 通过 BeanPostProcessor 按 Bean 名称自动创建代理

pub mod advice;
pub mod bean_post_processor;
pub mod error;
pub mod factory_bean;
pub mod interceptors;
pub mod joinpoint;
pub mod proxy;

// 重新导出核心类型
pub use advice::{Advice, AdviceType, AfterReturningAdvice, AfterThrowingAdvice, BeforeAdvice};
pub use bean_post_processor::{BeanNameAutoProxyCreator, NamePattern};
pub use error::{AopError, AopResult};
pub use factory_bean::ProxyFactoryBean;
pub use interceptors::{ExceptionLoggingAdvice, LoggingInterceptor, PerformanceInterceptor};
pub use joinpoint::{Arguments, Method, MethodInterceptor, MethodInvocation, ReturnValue};
pub use proxy::{AopProxy, ProxyFactory};

/// 预导入模块
pub mod prelude {
    pub use crate::advice::*;
    pub use crate::bean_post_processor::BeanNameAutoProxyCreator;
    pub use crate::error::{AopError, AopResult};
    pub use crate::factory_bean::ProxyFactoryBean;
    pub use crate::interceptors::*;
    pub use crate::joinpoint::{Arguments, Method, MethodInterceptor, MethodInvocation, ReturnValue};
    pub use crate::proxy::{AopProxy, ProxyFactory};
}
