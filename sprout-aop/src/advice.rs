//! 通知（Advice）定义
//!
//! 前置、返回后、异常通知都会被适配为 [`MethodInterceptor`]，
//! 代理内部只有一条拦截器链。

use std::fmt;
use std::sync::Arc;

use crate::joinpoint::{Arguments, Method, MethodInterceptor, MethodInvocation, ReturnValue};

/// 通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdviceType {
    /// 前置通知
    Before,
    /// 返回后通知（成功返回时执行）
    AfterReturning,
    /// 异常通知（返回错误时执行）
    AfterThrowing,
    /// 环绕通知（可以控制方法执行）
    Around,
}

/// 前置通知
///
/// 在目标方法执行前调用，可以修改参数；返回错误时目标方法不会执行
pub trait BeforeAdvice: Send + Sync {
    fn before(&self, method: &Method, args: &mut Arguments) -> anyhow::Result<()>;
}

/// 返回后通知
///
/// 在目标方法成功返回后调用；返回错误时该错误替代原来的返回值
pub trait AfterReturningAdvice: Send + Sync {
    fn after_returning(&self, method: &Method, value: &ReturnValue) -> anyhow::Result<()>;
}

/// 异常通知
///
/// 在目标方法返回错误时调用，错误随后原样传播
pub trait AfterThrowingAdvice: Send + Sync {
    fn after_throwing(&self, method: &Method, error: &anyhow::Error);
}

/// 加入代理的一条通知
#[derive(Clone)]
pub enum Advice {
    Around(Arc<dyn MethodInterceptor>),
    Before(Arc<dyn BeforeAdvice>),
    AfterReturning(Arc<dyn AfterReturningAdvice>),
    AfterThrowing(Arc<dyn AfterThrowingAdvice>),
}

impl Advice {
    pub fn around(interceptor: impl MethodInterceptor + 'static) -> Self {
        Advice::Around(Arc::new(interceptor))
    }

    pub fn before(advice: impl BeforeAdvice + 'static) -> Self {
        Advice::Before(Arc::new(advice))
    }

    pub fn after_returning(advice: impl AfterReturningAdvice + 'static) -> Self {
        Advice::AfterReturning(Arc::new(advice))
    }

    pub fn after_throwing(advice: impl AfterThrowingAdvice + 'static) -> Self {
        Advice::AfterThrowing(Arc::new(advice))
    }

    pub fn advice_type(&self) -> AdviceType {
        match self {
            Advice::Around(_) => AdviceType::Around,
            Advice::Before(_) => AdviceType::Before,
            Advice::AfterReturning(_) => AdviceType::AfterReturning,
            Advice::AfterThrowing(_) => AdviceType::AfterThrowing,
        }
    }

    /// 转换为拦截器
    pub fn to_interceptor(&self) -> Arc<dyn MethodInterceptor> {
        match self {
            Advice::Around(interceptor) => Arc::clone(interceptor),
            Advice::Before(advice) => Arc::new(BeforeAdviceInterceptor(Arc::clone(advice))),
            Advice::AfterReturning(advice) => Arc::new(AfterReturningAdviceInterceptor(Arc::clone(advice))),
            Advice::AfterThrowing(advice) => Arc::new(AfterThrowingAdviceInterceptor(Arc::clone(advice))),
        }
    }
}

impl fmt::Debug for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Advice({:?})", self.advice_type())
    }
}

struct BeforeAdviceInterceptor(Arc<dyn BeforeAdvice>);

impl MethodInterceptor for BeforeAdviceInterceptor {
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> anyhow::Result<ReturnValue> {
        let method = *invocation.method();
        self.0.before(&method, invocation.arguments_mut())?;
        invocation.proceed()
    }

    fn name(&self) -> &str {
        "BeforeAdviceInterceptor"
    }
}

struct AfterReturningAdviceInterceptor(Arc<dyn AfterReturningAdvice>);

impl MethodInterceptor for AfterReturningAdviceInterceptor {
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> anyhow::Result<ReturnValue> {
        let value = invocation.proceed()?;
        self.0.after_returning(invocation.method(), &value)?;
        Ok(value)
    }

    fn name(&self) -> &str {
        "AfterReturningAdviceInterceptor"
    }
}

struct AfterThrowingAdviceInterceptor(Arc<dyn AfterThrowingAdvice>);

impl MethodInterceptor for AfterThrowingAdviceInterceptor {
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> anyhow::Result<ReturnValue> {
        invocation.proceed().inspect_err(|error| {
            self.0.after_throwing(invocation.method(), error);
        })
    }

    fn name(&self) -> &str {
        "AfterThrowingAdviceInterceptor"
    }
}
