//! 拦截代理
//!
//! Rust 没有运行时动态代理，代理由两部分组成：
//! - [`AopProxy`]：持有目标对象和拦截器链，负责驱动一次调用
//! - 手写的包装类型：实现目标接口，每个方法通过 [`AopProxy::invoke`] 转发
//!
//! ```
//! use std::sync::Arc;
//! use sprout_aop::prelude::*;
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self, name: String) -> anyhow::Result<String>;
//! }
//!
//! struct English;
//!
//! impl Greeter for English {
//!     fn greet(&self, name: String) -> anyhow::Result<String> {
//!         Ok(format!("hello {name}"))
//!     }
//! }
//!
//! struct GreeterProxy(AopProxy<dyn Greeter>);
//!
//! impl Greeter for GreeterProxy {
//!     fn greet(&self, name: String) -> anyhow::Result<String> {
//!         self.0.call(Method::new("Greeter", "greet"), Arguments::new().with(name), |target, args| {
//!             target.greet(args.take(0)?)
//!         })
//!     }
//! }
//!
//! let target: Arc<dyn Greeter> = Arc::new(English);
//! let proxy = ProxyFactory::with_target(target)
//!     .add_advice(Advice::around(LoggingInterceptor::new()))
//!     .get_proxy_with(|proxy| Arc::new(GreeterProxy(proxy)) as Arc<dyn Greeter>)
//!     .unwrap();
//! assert_eq!(proxy.greet("bob".into()).unwrap(), "hello bob");
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::advice::Advice;
use crate::error::{AopError, AopResult};
use crate::joinpoint::{Arguments, Method, MethodInterceptor, MethodInvocation, ReturnValue};

/// 拦截代理的调用核心
pub struct AopProxy<T: ?Sized> {
    target: Arc<T>,
    interceptors: Arc<[Arc<dyn MethodInterceptor>]>,
}

impl<T: ?Sized> Clone for AopProxy<T> {
    fn clone(&self) -> Self {
        Self {
            target: Arc::clone(&self.target),
            interceptors: Arc::clone(&self.interceptors),
        }
    }
}

impl<T: ?Sized> AopProxy<T> {
    pub fn new(target: Arc<T>, interceptors: Vec<Arc<dyn MethodInterceptor>>) -> Self {
        Self {
            target,
            interceptors: interceptors.into(),
        }
    }

    pub fn target(&self) -> &Arc<T> {
        &self.target
    }

    pub fn interceptor_count(&self) -> usize {
        self.interceptors.len()
    }

    /// 沿拦截器链执行一次方法调用，`joinpoint` 在目标对象上执行真正的方法
    pub fn invoke<F>(&self, method: Method, arguments: Arguments, joinpoint: F) -> anyhow::Result<ReturnValue>
    where
        F: FnOnce(&T, &mut Arguments) -> anyhow::Result<ReturnValue>,
    {
        let target = &*self.target;
        let mut invocation = MethodInvocation::new(method, arguments, &self.interceptors, |args: &mut Arguments| {
            joinpoint(target, args)
        });
        invocation.proceed()
    }

    /// 调用并取出具体类型的返回值
    pub fn call<R, F>(&self, method: Method, arguments: Arguments, joinpoint: F) -> anyhow::Result<R>
    where
        R: Any + Send,
        F: FnOnce(&T, &mut Arguments) -> anyhow::Result<R>,
    {
        let value = self.invoke(method, arguments, |target, args| {
            joinpoint(target, args).map(ReturnValue::new)
        })?;
        Ok(value.into_inner::<R>()?)
    }
}

impl<T: ?Sized> fmt::Debug for AopProxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AopProxy")
            .field("target", &std::any::type_name::<T>())
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}

/// 代理工厂
///
/// 代理的接口由类型参数决定：`ProxyFactory<dyn UserService>` 代理接口，
/// 具体类型参数则直接代理该类型
pub struct ProxyFactory<T: ?Sized> {
    target: Option<Arc<T>>,
    advice: Vec<Advice>,
}

impl<T: ?Sized> Default for ProxyFactory<T> {
    fn default() -> Self {
        Self {
            target: None,
            advice: Vec::new(),
        }
    }
}

impl<T: ?Sized> ProxyFactory<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(target: Arc<T>) -> Self {
        Self {
            target: Some(target),
            advice: Vec::new(),
        }
    }

    pub fn set_target(&mut self, target: Arc<T>) {
        self.target = Some(target);
    }

    /// 追加一条通知，按追加顺序由外向内执行
    pub fn add_advice(mut self, advice: Advice) -> Self {
        self.advice.push(advice);
        self
    }

    /// 替换全部通知
    pub fn set_advice(&mut self, advice: Vec<Advice>) {
        self.advice = advice;
    }

    pub fn advice(&self) -> &[Advice] {
        &self.advice
    }

    pub fn get_proxy(&self) -> AopResult<AopProxy<T>> {
        let target = self
            .target
            .as_ref()
            .ok_or(AopError::NoTarget(std::any::type_name::<T>()))?;
        let interceptors = self.advice.iter().map(Advice::to_interceptor).collect();
        tracing::debug!(
            "Creating proxy for '{}' with {} advice",
            std::any::type_name::<T>(),
            self.advice.len()
        );
        Ok(AopProxy::new(Arc::clone(target), interceptors))
    }

    /// 创建代理并包装为接口对象
    pub fn get_proxy_with<I, W>(&self, wrap: W) -> AopResult<Arc<I>>
    where
        I: ?Sized,
        W: FnOnce(AopProxy<T>) -> Arc<I>,
    {
        self.get_proxy().map(wrap)
    }
}
