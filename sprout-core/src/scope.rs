use serde::Deserialize;

/// Bean 的作用域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// 单例模式 - 容器中只有一个实例
    #[default]
    Singleton,

    /// 原型模式 - 每次请求都创建新实例
    Prototype,
}

/// 自动装配模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutowireMode {
    /// 不自动装配，只使用显式属性值
    #[default]
    No,

    /// 按属性名查找同名 Bean
    ByName,

    /// 按属性类型查找唯一候选
    ByType,

    /// 选择能被满足的参数最多的构造器
    Constructor,
}
