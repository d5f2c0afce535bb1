//! 声明式的值
//!
//! 属性值和构造器参数都以 [`Value`] 描述：字面量、对其他 Bean 的引用或内部 Bean 定义。
//! 字面量在解析时交给类型转换器，转换为属性要求的类型。

use std::fmt;

use crate::bean::BeanDefinition;

/// 字面量
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<Literal>),
}

impl Literal {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// 转换为整数
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Literal::Int(i) => Some(*i),
            Literal::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// 转换为浮点数
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Float(f) => Some(*f),
            Literal::Int(i) => Some(*i as f64),
            Literal::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// 转换为布尔值
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Literal::Bool(b) => Some(*b),
            Literal::Str(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Some(true),
                "false" | "no" | "off" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// 作为列表处理，逗号分隔的字符串会被拆开
    pub fn as_list(&self) -> Vec<Literal> {
        match self {
            Literal::List(items) => items.clone(),
            Literal::Str(s) => s
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| Literal::Str(item.to_string()))
                .collect(),
            other => vec![other.clone()],
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(s) => f.write_str(s),
            Literal::Int(i) => write!(f, "{i}"),
            Literal::Float(v) => write!(f, "{v}"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::List(items) => {
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Str(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Str(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Int(i64::from(value))
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl<T: Into<Literal>> From<Vec<T>> for Literal {
    fn from(values: Vec<T>) -> Self {
        Literal::List(values.into_iter().map(Into::into).collect())
    }
}

/// 属性值或构造器参数的声明
#[derive(Debug, Clone)]
pub enum Value {
    /// 字面量，按目标类型转换
    Literal(Literal),

    /// 对另一个 Bean 的引用（名称或别名）
    Ref(String),

    /// 内部 Bean，每次解析都会新建，不注册到容器
    Inner(Box<BeanDefinition>),
}

impl Value {
    pub fn literal(value: impl Into<Literal>) -> Self {
        Value::Literal(value.into())
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Value::Ref(name.into())
    }

    pub fn inner(definition: BeanDefinition) -> Self {
        Value::Inner(Box::new(definition))
    }
}
