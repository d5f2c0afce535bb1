//! 预定义的常用通知

use std::time::{Duration, Instant};

use crate::advice::AfterThrowingAdvice;
use crate::joinpoint::{Method, MethodInterceptor, MethodInvocation, ReturnValue};

/// 日志拦截器 - 记录方法进入、退出及耗时
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingInterceptor {
    log_args: bool,
}

impl LoggingInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 同时记录参数个数
    pub fn with_args(mut self) -> Self {
        self.log_args = true;
        self
    }
}

impl MethodInterceptor for LoggingInterceptor {
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> anyhow::Result<ReturnValue> {
        let method = *invocation.method();
        if self.log_args {
            tracing::info!("→ Entering: {} with {} argument(s)", method, invocation.arguments().len());
        } else {
            tracing::info!("→ Entering: {}", method);
        }

        let started = Instant::now();
        let result = invocation.proceed();
        match &result {
            Ok(value) => tracing::info!(
                "← Exiting: {} returning {} (took {:?})",
                method,
                value.type_name(),
                started.elapsed()
            ),
            Err(_) => tracing::info!("← Exiting: {} with error (took {:?})", method, started.elapsed()),
        }
        result
    }

    fn name(&self) -> &str {
        "LoggingInterceptor"
    }
}

/// 性能监控拦截器
///
/// 方法耗时超过阈值时输出警告
#[derive(Debug, Clone, Copy)]
pub struct PerformanceInterceptor {
    threshold: Duration,
}

impl PerformanceInterceptor {
    pub fn new(threshold: Duration) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }
}

impl MethodInterceptor for PerformanceInterceptor {
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> anyhow::Result<ReturnValue> {
        let started = Instant::now();
        let result = invocation.proceed();
        let elapsed = started.elapsed();
        if elapsed > self.threshold {
            tracing::warn!(
                "Slow method detected: {} took {:?} (threshold: {:?})",
                invocation.method(),
                elapsed,
                self.threshold
            );
        }
        result
    }

    fn name(&self) -> &str {
        "PerformanceInterceptor"
    }
}

/// 异常日志通知
#[derive(Debug, Default, Clone, Copy)]
pub struct ExceptionLoggingAdvice;

impl AfterThrowingAdvice for ExceptionLoggingAdvice {
    fn after_throwing(&self, method: &Method, error: &anyhow::Error) {
        tracing::error!("Exception in {}: {:#}", method, error);
    }
}
