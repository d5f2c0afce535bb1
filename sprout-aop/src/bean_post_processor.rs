//! 按 Bean 名称自动创建代理
//!
//! 通过实现 BeanPostProcessor，在 Bean 初始化后为名称匹配的 Bean 包装代理。
//!
//! ## 工作原理
//!
//! 1. 检查 Bean 名称是否匹配任一模式（支持 `*` 通配符）
//! 2. 检查 Bean 是否为目标类型 `T`
//! 3. 匹配时用拦截器链创建代理，以 `Arc<I>` 的形式替换原 Bean
//!
//! 处于循环依赖中的 Bean 会在提前暴露时被代理，初始化完成后不再重复包装，
//! 保证注入到其他 Bean 的引用与最终的 Bean 是同一个代理。
//! 提前代理按名称和原始对象记录，创建失败后重新创建的对象仍会被代理。

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use regex::Regex;
use sprout_core::prelude::*;

use crate::advice::Advice;
use crate::error::{AopError, AopResult};
use crate::joinpoint::MethodInterceptor;
use crate::proxy::AopProxy;

type Wrap<T, I> = Arc<dyn Fn(AopProxy<T>) -> Arc<I> + Send + Sync>;

/// Bean 名称匹配模式
#[derive(Debug, Clone)]
pub struct NamePattern {
    pattern: String,
    regex: Regex,
}

impl NamePattern {
    /// 编译模式，`*` 匹配任意字符序列，其余字符按字面匹配
    pub fn new(pattern: &str) -> AopResult<Self> {
        let source = format!(
            "^{}$",
            pattern.split('*').map(regex::escape).collect::<Vec<_>>().join(".*")
        );
        let regex = Regex::new(&source).map_err(|source| AopError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, bean_name: &str) -> bool {
        self.regex.is_match(bean_name)
    }
}

/// 按名称自动代理的 BeanPostProcessor
///
/// - `T`：被代理 Bean 的类型（具体类型，或以 `Arc<T>` 形式存放的 trait 对象）
/// - `I`：代理暴露的接口
pub struct BeanNameAutoProxyCreator<T: ?Sized, I: ?Sized> {
    patterns: Vec<NamePattern>,
    target_key: TypeKey,
    interceptors: Vec<Arc<dyn MethodInterceptor>>,
    wrap: Wrap<T, I>,
    /// 提前暴露时已经代理过的原始对象
    early_proxied: Mutex<HashMap<String, Weak<dyn Any + Send + Sync>>>,
}

impl<T: Any + Send + Sync, I: ?Sized> BeanNameAutoProxyCreator<T, I> {
    pub fn new<W>(wrap: W) -> Self
    where
        W: Fn(AopProxy<T>) -> Arc<I> + Send + Sync + 'static,
    {
        Self::with_key(TypeKey::of::<T>(), wrap)
    }
}

impl<T: ?Sized + Send + Sync + 'static, I: ?Sized> BeanNameAutoProxyCreator<T, I> {
    /// 代理以 `Arc<T>` 形式存放的 Bean（例如 trait 对象单例）
    pub fn shared<W>(wrap: W) -> Self
    where
        W: Fn(AopProxy<T>) -> Arc<I> + Send + Sync + 'static,
    {
        Self::with_key(TypeKey::shared::<T>(), wrap)
    }

    fn with_key<W>(target_key: TypeKey, wrap: W) -> Self
    where
        W: Fn(AopProxy<T>) -> Arc<I> + Send + Sync + 'static,
    {
        Self {
            patterns: Vec::new(),
            target_key,
            interceptors: Vec::new(),
            wrap: Arc::new(wrap),
            early_proxied: Mutex::new(HashMap::new()),
        }
    }

    /// 添加 Bean 名称模式
    pub fn bean_name(mut self, pattern: &str) -> AopResult<Self> {
        self.patterns.push(NamePattern::new(pattern)?);
        Ok(self)
    }

    pub fn add_advice(mut self, advice: Advice) -> Self {
        self.interceptors.push(advice.to_interceptor());
        self
    }

    pub fn patterns(&self) -> &[NamePattern] {
        &self.patterns
    }

    /// 检查 Bean 名称是否应该被代理
    fn should_proxy(&self, bean_name: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(bean_name))
    }
}

impl<T, I> BeanNameAutoProxyCreator<T, I>
where
    T: ?Sized + Send + Sync + 'static,
    I: ?Sized + Send + Sync + 'static,
{
    /// 为匹配的 Bean 创建代理，不匹配时返回 `None`
    fn wrap_if_necessary(&self, bean: &Object, bean_name: &str) -> Option<Object> {
        if !self.should_proxy(bean_name) {
            return None;
        }
        let Some(target) = self
            .target_key
            .extract(bean)
            .and_then(|view| view.into_arc::<T>().ok())
        else {
            tracing::trace!(
                "Bean '{}' matches a proxy pattern but is not of type '{}'",
                bean_name,
                self.target_key
            );
            return None;
        };

        tracing::debug!(
            "Creating proxy for bean '{}' with {} interceptor(s)",
            bean_name,
            self.interceptors.len()
        );
        let proxy = (self.wrap)(AopProxy::new(target, self.interceptors.clone()));
        Some(Arc::new(proxy))
    }
}

impl<T, I> BeanPostProcessor for BeanNameAutoProxyCreator<T, I>
where
    T: ?Sized + Send + Sync + 'static,
    I: ?Sized + Send + Sync + 'static,
{
    fn early_bean_reference(&self, bean: Object, bean_name: &str) -> ContainerResult<Object> {
        match self.wrap_if_necessary(&bean, bean_name) {
            Some(proxy) => {
                self.early_proxied
                    .lock()
                    .insert(bean_name.to_string(), Arc::downgrade(&bean));
                Ok(proxy)
            }
            None => Ok(bean),
        }
    }

    fn post_process_after_initialization(&self, bean: Object, bean_name: &str) -> ContainerResult<Object> {
        // 同一个原始对象在提前暴露时已经代理过，容器会使用提前暴露的代理
        let early = self.early_proxied.lock().remove(bean_name);
        if early.is_some_and(|early| Weak::ptr_eq(&early, &Arc::downgrade(&bean))) {
            return Ok(bean);
        }
        Ok(self.wrap_if_necessary(&bean, bean_name).unwrap_or(bean))
    }

    fn name(&self) -> &str {
        "BeanNameAutoProxyCreator"
    }
}

impl<T: ?Sized, I: ?Sized> fmt::Debug for BeanNameAutoProxyCreator<T, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanNameAutoProxyCreator")
            .field(
                "patterns",
                &self.patterns.iter().map(NamePattern::as_str).collect::<Vec<_>>(),
            )
            .field("target_key", &self.target_key)
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}
