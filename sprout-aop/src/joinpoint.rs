//! 连接点（JoinPoint）定义
//!
//! 一次被拦截的方法调用由 [`MethodInvocation`] 表示：方法标识、参数，
//! 以及沿拦截器链继续执行的能力。拦截器按注册顺序执行，链的末端是目标方法。

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::{AopError, AopResult};

/// 方法标识
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Method {
    target_type: &'static str,
    name: &'static str,
}

impl Method {
    pub const fn new(target_type: &'static str, name: &'static str) -> Self {
        Self { target_type, name }
    }

    /// 目标类型名称
    pub fn target_type(&self) -> &'static str {
        self.target_type
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 完整的方法签名
    pub fn signature(&self) -> String {
        format!("{}::{}", self.target_type, self.name)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.target_type, self.name)
    }
}

/// 方法参数，按位置保存的类型擦除值
///
/// 拦截器可以读取、修改或替换参数，目标方法通过 [`Arguments::take`] 取走参数
#[derive(Default)]
pub struct Arguments {
    values: Vec<Option<Box<dyn Any + Send>>>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个参数
    pub fn with<T: Any + Send>(mut self, value: T) -> Self {
        self.push(value);
        self
    }

    pub fn push<T: Any + Send>(&mut self, value: T) {
        self.values.push(Some(Box::new(value)));
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get<T: Any>(&self, index: usize) -> Option<&T> {
        self.values.get(index)?.as_ref()?.downcast_ref::<T>()
    }

    pub fn get_mut<T: Any>(&mut self, index: usize) -> Option<&mut T> {
        self.values.get_mut(index)?.as_mut()?.downcast_mut::<T>()
    }

    /// 替换第 `index` 个参数，位置不存在时返回 `false`
    pub fn set<T: Any + Send>(&mut self, index: usize, value: T) -> bool {
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = Some(Box::new(value));
                true
            }
            None => false,
        }
    }

    /// 取走第 `index` 个参数
    pub fn take<T: Any>(&mut self, index: usize) -> AopResult<T> {
        let mismatch = || AopError::ArgumentMismatch {
            index,
            expected: std::any::type_name::<T>(),
        };
        let slot = self.values.get_mut(index).ok_or_else(mismatch)?;
        match slot.take().map(|value| value.downcast::<T>()) {
            Some(Ok(value)) => Ok(*value),
            Some(Err(value)) => {
                *slot = Some(value);
                Err(mismatch())
            }
            None => Err(mismatch()),
        }
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arguments").field("len", &self.values.len()).finish()
    }
}

/// 方法返回值
pub struct ReturnValue {
    value: Box<dyn Any + Send>,
    type_name: &'static str,
}

impl ReturnValue {
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self {
            value: Box::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// 无返回值的方法
    pub fn unit() -> Self {
        Self::new(())
    }

    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.value.downcast_mut::<T>()
    }

    /// 取出具体类型的返回值
    pub fn into_inner<T: Any>(self) -> AopResult<T> {
        let actual = self.type_name;
        self.value
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| AopError::ReturnTypeMismatch {
                expected: std::any::type_name::<T>(),
                actual,
            })
    }
}

impl fmt::Debug for ReturnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReturnValue({})", self.type_name)
    }
}

/// 方法拦截器（环绕通知）
///
/// 调用 [`MethodInvocation::proceed`] 继续执行链上的下一个拦截器或目标方法；
/// 不调用则短路，自己返回的值作为方法的结果
pub trait MethodInterceptor: Send + Sync {
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> anyhow::Result<ReturnValue>;

    /// 拦截器名称（用于日志）
    fn name(&self) -> &str {
        "MethodInterceptor"
    }
}

impl<F> MethodInterceptor for F
where
    F: Fn(&mut MethodInvocation<'_>) -> anyhow::Result<ReturnValue> + Send + Sync,
{
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> anyhow::Result<ReturnValue> {
        self(invocation)
    }
}

type Joinpoint<'a> = Box<dyn FnOnce(&mut Arguments) -> anyhow::Result<ReturnValue> + 'a>;

/// 一次方法调用的执行链
pub struct MethodInvocation<'a> {
    method: Method,
    arguments: Arguments,
    interceptors: &'a [Arc<dyn MethodInterceptor>],
    current: usize,
    joinpoint: Option<Joinpoint<'a>>,
}

impl<'a> MethodInvocation<'a> {
    pub fn new<F>(
        method: Method,
        arguments: Arguments,
        interceptors: &'a [Arc<dyn MethodInterceptor>],
        joinpoint: F,
    ) -> Self
    where
        F: FnOnce(&mut Arguments) -> anyhow::Result<ReturnValue> + 'a,
    {
        Self {
            method,
            arguments,
            interceptors,
            current: 0,
            joinpoint: Some(Box::new(joinpoint)),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    pub fn arguments_mut(&mut self) -> &mut Arguments {
        &mut self.arguments
    }

    /// 继续执行下一个拦截器，链的末端调用目标方法
    ///
    /// 目标方法只会被调用一次
    pub fn proceed(&mut self) -> anyhow::Result<ReturnValue> {
        let interceptors = self.interceptors;
        if let Some(interceptor) = interceptors.get(self.current) {
            self.current += 1;
            tracing::trace!(
                "Invoking interceptor '{}' ({} of {}) for {}",
                interceptor.name(),
                self.current,
                interceptors.len(),
                self.method
            );
            return interceptor.invoke(self);
        }

        let joinpoint = self
            .joinpoint
            .take()
            .ok_or_else(|| AopError::ProceedAfterCompletion(self.method.signature()))?;
        tracing::trace!("Invoking target method {}", self.method);
        joinpoint(&mut self.arguments)
    }
}

impl fmt::Debug for MethodInvocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodInvocation")
            .field("method", &self.method)
            .field("arguments", &self.arguments)
            .field("current", &self.current)
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}
