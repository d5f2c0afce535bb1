//! 类型转换
//!
//! 属性值、构造器参数以及 `get_bean_as` 的返回值在类型不匹配时会经过类型转换器。
//! 容器先尝试用户注入的转换器，再尝试内置的 [`SimpleTypeConverter`]。

use crate::types::{BeanView, Object, TypeKey};
use crate::value::Literal;

/// 类型转换器
pub trait TypeConverter: Send + Sync {
    /// 把对象转换为 `required` 类型，无法转换时返回 `None`
    fn convert(&self, value: &Object, required: &TypeKey) -> Option<BeanView>;
}

/// 内置转换器，负责字面量到常见值类型的转换
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleTypeConverter;

macro_rules! convert_integer {
    ($literal:expr, $required:expr, $($ty:ty),+) => {
        $(
            if $required.is::<$ty>() {
                return $literal
                    .as_i64()
                    .and_then(|value| <$ty>::try_from(value).ok())
                    .map(BeanView::owned);
            }
        )+
    };
}

impl SimpleTypeConverter {
    pub fn convert_literal(&self, literal: &Literal, required: &TypeKey) -> Option<BeanView> {
        if required.is::<Literal>() {
            return Some(BeanView::owned(literal.clone()));
        }
        if required.is::<String>() {
            return Some(BeanView::owned(literal.to_string()));
        }
        convert_integer!(literal, required, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
        if required.is::<f64>() {
            return literal.as_f64().map(BeanView::owned);
        }
        if required.is::<f32>() {
            return literal.as_f64().map(|value| BeanView::owned(value as f32));
        }
        if required.is::<bool>() {
            return literal.as_bool().map(BeanView::owned);
        }
        if required.is::<Vec<String>>() {
            let items: Vec<String> = literal.as_list().iter().map(Literal::to_string).collect();
            return Some(BeanView::owned(items));
        }
        if required.is::<Vec<i64>>() {
            let items: Option<Vec<i64>> = literal.as_list().iter().map(Literal::as_i64).collect();
            return items.map(BeanView::owned);
        }
        None
    }
}

impl TypeConverter for SimpleTypeConverter {
    fn convert(&self, value: &Object, required: &TypeKey) -> Option<BeanView> {
        let literal = (**value).downcast_ref::<Literal>()?;
        self.convert_literal(literal, required)
    }
}
