//! 代理工厂 Bean
//!
//! 把容器中的某个 Bean 包装为代理后以工厂产物的形式暴露，
//! 对应 Spring 的 `ProxyFactoryBean`。

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use sprout_core::prelude::*;

use crate::advice::Advice;
use crate::joinpoint::MethodInterceptor;
use crate::proxy::AopProxy;

type Wrap<T, I> = Arc<dyn Fn(AopProxy<T>) -> Arc<I> + Send + Sync>;

/// 代理工厂 Bean
///
/// - `T`：目标 Bean 的类型（具体类型或 trait 对象）
/// - `I`：产物暴露的接口
///
/// 产物以 `Arc<I>` 的形式存放，可以通过 `get_bean_as_dyn::<I>` 获取
pub struct ProxyFactoryBean<T: ?Sized, I: ?Sized> {
    bean_factory: Weak<dyn BeanFactory>,
    target_name: String,
    target_key: TypeKey,
    interceptors: Vec<Arc<dyn MethodInterceptor>>,
    wrap: Wrap<T, I>,
    singleton: bool,
}

impl<T: Any + Send + Sync, I: ?Sized> ProxyFactoryBean<T, I> {
    /// 代理具体类型的目标 Bean
    pub fn new<F, W>(bean_factory: &Arc<F>, target_name: impl Into<String>, wrap: W) -> Self
    where
        F: BeanFactory + 'static,
        W: Fn(AopProxy<T>) -> Arc<I> + Send + Sync + 'static,
    {
        Self::with_key(bean_factory, target_name, TypeKey::of::<T>(), wrap)
    }
}

impl<T: ?Sized + Send + Sync + 'static, I: ?Sized> ProxyFactoryBean<T, I> {
    /// 代理以接口形式获取的目标 Bean
    pub fn shared<F, W>(bean_factory: &Arc<F>, target_name: impl Into<String>, wrap: W) -> Self
    where
        F: BeanFactory + 'static,
        W: Fn(AopProxy<T>) -> Arc<I> + Send + Sync + 'static,
    {
        Self::with_key(bean_factory, target_name, TypeKey::shared::<T>(), wrap)
    }

    fn with_key<F, W>(bean_factory: &Arc<F>, target_name: impl Into<String>, target_key: TypeKey, wrap: W) -> Self
    where
        F: BeanFactory + 'static,
        W: Fn(AopProxy<T>) -> Arc<I> + Send + Sync + 'static,
    {
        let bean_factory: Weak<dyn BeanFactory> = Arc::downgrade(bean_factory) as Weak<dyn BeanFactory>;
        Self {
            bean_factory,
            target_name: target_name.into(),
            target_key,
            interceptors: Vec::new(),
            wrap: Arc::new(wrap),
            singleton: true,
        }
    }

    pub fn add_advice(mut self, advice: Advice) -> Self {
        self.interceptors.push(advice.to_interceptor());
        self
    }

    /// 每次获取都创建新的代理
    pub fn prototype(mut self) -> Self {
        self.singleton = false;
        self
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }
}

impl<T, I> FactoryBean for ProxyFactoryBean<T, I>
where
    T: ?Sized + Send + Sync + 'static,
    I: ?Sized + Send + Sync + 'static,
{
    fn get_object(&self) -> ContainerResult<Object> {
        let bean_factory = self.bean_factory.upgrade().ok_or_else(|| {
            ContainerError::Other(anyhow!(
                "Bean factory of proxy target '{}' is no longer available",
                self.target_name
            ))
        })?;

        let target = bean_factory
            .get_bean_view(&self.target_name, &self.target_key)?
            .into_arc::<T>()
            .map_err(|_| ContainerError::BeanNotOfRequiredType {
                name: self.target_name.clone(),
                required: self.target_key.name().to_string(),
            })?;

        tracing::debug!(
            "Creating proxy for bean '{}' with {} interceptor(s)",
            self.target_name,
            self.interceptors.len()
        );
        let proxy = (self.wrap)(AopProxy::new(target, self.interceptors.clone()));
        Ok(Arc::new(proxy))
    }

    fn object_type(&self) -> Option<BeanType> {
        Some(BeanType::shared::<I>())
    }

    fn is_singleton(&self) -> bool {
        self.singleton
    }
}

impl<T: ?Sized, I: ?Sized> fmt::Debug for ProxyFactoryBean<T, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyFactoryBean")
            .field("target_name", &self.target_name)
            .field("target_key", &self.target_key)
            .field("interceptors", &self.interceptors.len())
            .field("singleton", &self.singleton)
            .finish()
    }
}
