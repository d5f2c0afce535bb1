//! BeanPostProcessor - Bean 工厂扩展机制
//!
//! 提供在 Bean 创建各阶段进行自定义处理的钩子，类似 Spring 的
//! `InstantiationAwareBeanPostProcessor` / `SmartInstantiationAwareBeanPostProcessor`。
//!
//! 所有钩子都有默认的空实现，处理器按注册顺序依次调用。

use crate::error::ContainerResult;
use crate::property::PropertyValues;
use crate::types::{BeanType, Object};

/// 依赖比较器
///
/// 按类型查找存在多个候选且没有 primary 时，选择优先级数值最小的候选
pub trait DependencyComparator: Send + Sync {
    /// 返回候选的优先级，`None` 表示不参与比较
    fn priority(&self, bean_name: &str, bean: &Object) -> Option<i32>;
}

/// BeanPostProcessor trait
///
/// 使用场景：
/// - AOP 代理创建
/// - Bean 包装
/// - 属性注入增强
///
/// # 示例
///
/// ```
/// use sprout_core::prelude::*;
///
/// struct LoggingBeanPostProcessor;
///
/// impl BeanPostProcessor for LoggingBeanPostProcessor {
///     fn post_process_after_initialization(
///         &self,
///         bean: Object,
///         bean_name: &str,
///     ) -> ContainerResult<Object> {
///         tracing::info!("After initialization: {}", bean_name);
///         Ok(bean)
///     }
/// }
/// ```
pub trait BeanPostProcessor: Send + Sync {
    /// 实例化之前调用
    ///
    /// 返回 `Some` 时跳过构造、属性注入和初始化方法，该对象直接作为 Bean，
    /// 之后仍会经过 `post_process_after_initialization`
    fn post_process_before_instantiation(
        &self,
        _bean_type: &BeanType,
        _bean_name: &str,
    ) -> ContainerResult<Option<Object>> {
        Ok(None)
    }

    /// 实例化之后、属性注入之前调用，返回 `false` 跳过属性注入
    fn post_process_after_instantiation(&self, _bean: &Object, _bean_name: &str) -> ContainerResult<bool> {
        Ok(true)
    }

    /// 属性值写入之前调用，可以增删或替换属性值
    fn post_process_properties(
        &self,
        values: PropertyValues,
        _bean: &Object,
        _bean_name: &str,
    ) -> ContainerResult<PropertyValues> {
        Ok(values)
    }

    /// 循环引用中提前暴露 Bean 时调用
    ///
    /// 会包装 Bean 的处理器需要在这里返回同样的包装，
    /// 否则注入到其他 Bean 中的是原始对象
    fn early_bean_reference(&self, bean: Object, _bean_name: &str) -> ContainerResult<Object> {
        Ok(bean)
    }

    /// 在初始化方法之前调用
    ///
    /// # 返回
    /// 返回处理后的 Bean 实例（可以是原始 Bean，也可以是包装后的 Bean）
    fn post_process_before_initialization(&self, bean: Object, _bean_name: &str) -> ContainerResult<Object> {
        Ok(bean)
    }

    /// 在初始化方法之后调用
    ///
    /// # 典型用途
    /// - 创建 AOP 代理
    /// - 包装 Bean
    fn post_process_after_initialization(&self, bean: Object, _bean_name: &str) -> ContainerResult<Object> {
        Ok(bean)
    }

    /// 获取处理器的名称（用于日志和调试）
    fn name(&self) -> &str {
        "BeanPostProcessor"
    }
}
