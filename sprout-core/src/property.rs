//! 属性表与属性值
//!
//! Rust 没有运行时反射，每个 Bean 类型在定义时声明自己的可写属性：
//! 名称、值类型和 setter。容器通过属性表完成属性注入和按名称/类型自动装配。
//!
//! 属性路径支持嵌套和下标：`address.name`、`hobbies[0]`、`owner.address.region`。
//! 只有最后一段可以带下标。
//!
//! setter 接收 `&T`，Bean 需要通过内部可变性（`RwLock`、`Mutex` 等）保存可注入的字段，
//! 这样提前暴露出去的引用和最终完成初始化的对象是同一个 `Arc`。

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{ContainerError, ContainerResult};
use crate::types::{BeanType, BeanView, Object, TypeKey};
use crate::IntoResult;

type Setter = Arc<dyn Fn(&dyn Any, BeanView) -> ContainerResult<()> + Send + Sync>;
type IndexedSetter = Arc<dyn Fn(&dyn Any, usize, BeanView) -> ContainerResult<()> + Send + Sync>;

/// 把解析后的值转换为属性要求的类型
pub(crate) type Coerce<'a> = &'a dyn Fn(&Object, Option<&BeanType>, &TypeKey) -> Option<BeanView>;

trait NestedAccess: Send + Sync {
    fn get<'a>(&self, target: &'a dyn Any) -> Option<&'a dyn Any>;
}

struct FieldAccess<T, N> {
    getter: fn(&T) -> &N,
}

impl<T: Any, N: Any> NestedAccess for FieldAccess<T, N> {
    fn get<'a>(&self, target: &'a dyn Any) -> Option<&'a dyn Any> {
        target
            .downcast_ref::<T>()
            .map(|bean| (self.getter)(bean) as &dyn Any)
    }
}

#[derive(Clone)]
struct PropertyDescriptor {
    name: String,
    value_type: Option<TypeKey>,
    setter: Option<Setter>,
    element_type: Option<TypeKey>,
    indexed_setter: Option<IndexedSetter>,
    nested: Option<(Arc<dyn NestedAccess>, PropertyTable)>,
}

impl PropertyDescriptor {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            value_type: None,
            setter: None,
            element_type: None,
            indexed_setter: None,
            nested: None,
        }
    }
}

/// 某个 Bean 类型的属性表
#[derive(Clone)]
pub struct PropertyTable {
    bean_type: &'static str,
    properties: Vec<PropertyDescriptor>,
}

#[derive(Debug, PartialEq, Eq)]
struct PathSegment {
    name: String,
    index: Option<usize>,
}

impl PropertyTable {
    pub fn builder<T: Any + Send + Sync>() -> PropertyTableBuilder<T> {
        PropertyTableBuilder {
            table: PropertyTable::empty(std::any::type_name::<T>()),
            _marker: PhantomData,
        }
    }

    pub(crate) fn empty(bean_type: &'static str) -> Self {
        Self {
            bean_type,
            properties: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// 所有可整体写入的属性及其值类型（自动装配的候选）
    pub fn writable_properties(&self) -> impl Iterator<Item = (&str, &TypeKey)> {
        self.properties.iter().filter_map(|property| {
            match (&property.value_type, &property.setter) {
                (Some(key), Some(_)) => Some((property.name.as_str(), key)),
                _ => None,
            }
        })
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    fn find(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|property| property.name == name)
    }

    fn entry(&mut self, name: &str) -> &mut PropertyDescriptor {
        let position = match self.properties.iter().position(|property| property.name == name) {
            Some(position) => position,
            None => {
                self.properties.push(PropertyDescriptor::new(name));
                self.properties.len() - 1
            }
        };
        &mut self.properties[position]
    }

    fn invalid(&self, path: &str, reason: impl Into<String>) -> ContainerError {
        ContainerError::InvalidProperty {
            property: path.to_string(),
            bean_type: self.bean_type.to_string(),
            reason: reason.into(),
        }
    }

    /// 按属性路径写入一个值
    pub(crate) fn apply(
        &self,
        target: &dyn Any,
        path: &str,
        value: &Object,
        source: Option<&BeanType>,
        coerce: Coerce<'_>,
    ) -> ContainerResult<()> {
        let segments = parse_path(path).ok_or_else(|| self.invalid(path, "malformed property path"))?;
        let Some((last, parents)) = segments.split_last() else {
            return Err(self.invalid(path, "empty property path"));
        };

        let mut table = self;
        let mut current = target;
        for segment in parents {
            if segment.index.is_some() {
                return Err(table.invalid(path, "only the last path segment may be indexed"));
            }
            let descriptor = table
                .find(&segment.name)
                .ok_or_else(|| table.invalid(path, format!("no property '{}'", segment.name)))?;
            let (access, nested) = descriptor.nested.as_ref().ok_or_else(|| {
                table.invalid(path, format!("property '{}' is not a nested property", segment.name))
            })?;
            current = access
                .get(current)
                .ok_or_else(|| table.invalid(path, format!("cannot read nested property '{}'", segment.name)))?;
            table = nested;
        }

        let descriptor = table
            .find(&last.name)
            .ok_or_else(|| table.invalid(path, format!("no property '{}'", last.name)))?;

        match last.index {
            Some(index) => {
                let (Some(element), Some(setter)) = (&descriptor.element_type, &descriptor.indexed_setter) else {
                    return Err(table.invalid(path, "property is not indexed"));
                };
                let view = coerce(value, source, element).ok_or_else(|| ContainerError::TypeMismatch {
                    property: path.to_string(),
                    required: element.name().to_string(),
                })?;
                setter(current, index, view)
            }
            None => {
                let (Some(key), Some(setter)) = (&descriptor.value_type, &descriptor.setter) else {
                    return Err(table.invalid(path, "property is not writable"));
                };
                let view = coerce(value, source, key).ok_or_else(|| ContainerError::TypeMismatch {
                    property: path.to_string(),
                    required: key.name().to_string(),
                })?;
                setter(current, view)
            }
        }
    }
}

impl fmt::Debug for PropertyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyTable")
            .field("bean_type", &self.bean_type)
            .field(
                "properties",
                &self.properties.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

fn parse_path(path: &str) -> Option<Vec<PathSegment>> {
    path.split('.').map(parse_segment).collect()
}

fn parse_segment(segment: &str) -> Option<PathSegment> {
    let Some(open) = segment.find('[') else {
        return (!segment.is_empty()).then(|| PathSegment {
            name: segment.to_string(),
            index: None,
        });
    };
    let name = &segment[..open];
    let index = segment[open + 1..].strip_suffix(']')?.trim().parse().ok()?;
    if name.is_empty() {
        return None;
    }
    Some(PathSegment {
        name: name.to_string(),
        index: Some(index),
    })
}

fn downcast_target<'a, T: Any>(target: &'a dyn Any, property: &str) -> ContainerResult<&'a T> {
    target
        .downcast_ref::<T>()
        .ok_or_else(|| ContainerError::InvalidProperty {
            property: property.to_string(),
            bean_type: std::any::type_name::<T>().to_string(),
            reason: "target object has a different type".to_string(),
        })
}

fn view_mismatch<V: ?Sized>(property: &str) -> ContainerError {
    ContainerError::TypeMismatch {
        property: property.to_string(),
        required: std::any::type_name::<V>().to_string(),
    }
}

/// 属性表构建器
pub struct PropertyTableBuilder<T> {
    table: PropertyTable,
    _marker: PhantomData<fn(&T)>,
}

impl<T: Any + Send + Sync> PropertyTableBuilder<T> {
    /// 声明一个值类型为 `V` 的属性
    pub fn property<V, F, R>(self, name: &str, setter: F) -> Self
    where
        V: Any + Send + Sync,
        F: Fn(&T, Arc<V>) -> R + Send + Sync + 'static,
        R: IntoResult,
    {
        self.add_setter(name, TypeKey::of::<V>(), setter)
    }

    /// 声明一个值类型为 trait 对象 `I` 的属性
    pub fn property_dyn<I, F, R>(self, name: &str, setter: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(&T, Arc<I>) -> R + Send + Sync + 'static,
        R: IntoResult,
    {
        self.add_setter(name, TypeKey::shared::<I>(), setter)
    }

    fn add_setter<V, F, R>(mut self, name: &str, key: TypeKey, setter: F) -> Self
    where
        V: ?Sized + 'static,
        F: Fn(&T, Arc<V>) -> R + Send + Sync + 'static,
        R: IntoResult,
    {
        let property = name.to_string();
        let erased: Setter = Arc::new(move |target: &dyn Any, value: BeanView| {
            let bean = downcast_target::<T>(target, &property)?;
            let value = value.into_arc::<V>().map_err(|_| view_mismatch::<V>(&property))?;
            setter(bean, value).into_result()
        });
        let descriptor = self.table.entry(name);
        descriptor.value_type = Some(key);
        descriptor.setter = Some(erased);
        self
    }

    /// 声明一个可按下标写入的属性（`name[i]`），元素类型为 `V`
    pub fn indexed<V, F, R>(mut self, name: &str, setter: F) -> Self
    where
        V: Any + Send + Sync,
        F: Fn(&T, usize, Arc<V>) -> R + Send + Sync + 'static,
        R: IntoResult,
    {
        let property = name.to_string();
        let erased: IndexedSetter = Arc::new(move |target: &dyn Any, index: usize, value: BeanView| {
            let bean = downcast_target::<T>(target, &property)?;
            let value = value.into_arc::<V>().map_err(|_| view_mismatch::<V>(&property))?;
            setter(bean, index, value).into_result()
        });
        let descriptor = self.table.entry(name);
        descriptor.element_type = Some(TypeKey::of::<V>());
        descriptor.indexed_setter = Some(erased);
        self
    }

    /// 声明一个嵌套属性（`name.child`），通过 `getter` 访问内部对象
    pub fn nested<N>(mut self, name: &str, getter: fn(&T) -> &N, table: PropertyTable) -> Self
    where
        N: Any + Send + Sync,
    {
        let access: Arc<dyn NestedAccess> = Arc::new(FieldAccess { getter });
        self.table.entry(name).nested = Some((access, table));
        self
    }

    pub fn build(self) -> PropertyTable {
        self.table
    }
}

/// 已解析的属性值
#[derive(Clone)]
pub struct PropertyValue {
    name: String,
    value: Object,
    source: Option<BeanType>,
}

impl PropertyValue {
    pub fn new(name: impl Into<String>, value: Object) -> Self {
        Self {
            name: name.into(),
            value,
            source: None,
        }
    }

    pub(crate) fn resolved(name: impl Into<String>, value: Object, source: Option<BeanType>) -> Self {
        Self {
            name: name.into(),
            value,
            source,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Object {
        &self.value
    }

    /// 值来源 Bean 的类型信息，用于接口转换
    pub fn source_type(&self) -> Option<&BeanType> {
        self.source.as_ref()
    }
}

impl fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyValue").field("name", &self.name).finish()
    }
}

/// 即将写入 Bean 的属性值集合
///
/// 在写入之前交给后置处理器的 `post_process_properties`，可以增删或替换
#[derive(Debug, Clone, Default)]
pub struct PropertyValues {
    values: Vec<PropertyValue>,
}

impl PropertyValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加属性值，同名的旧值会被替换
    pub fn add(&mut self, value: PropertyValue) {
        match self.values.iter_mut().find(|existing| existing.name == value.name) {
            Some(existing) => *existing = value,
            None => self.values.push(value),
        }
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.values.iter().find(|value| value.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<PropertyValue> {
        let position = self.values.iter().position(|value| value.name == name)?;
        Some(self.values.remove(position))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertyValue> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
