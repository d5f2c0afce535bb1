//! 类型标识与类型视图
//!
//! 容器内部以 [`Object`]（`Arc<dyn Any + Send + Sync>`）保存所有 Bean。
//! 调用方需要的往往是某个具体类型或 trait 对象的 `Arc`，
//! 这里通过 [`TypeKey`] 描述目标类型，通过 [`BeanView`] 承载转换后的 `Arc<X>`。

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::bean::FactoryBean;
use crate::value::Literal;

/// 容器管理的对象
pub type Object = Arc<dyn Any + Send + Sync>;

type Extractor = fn(&Object) -> Option<BeanView>;
type InstanceCheck = fn(&Object) -> bool;

/// 类型标识
///
/// 除了 `TypeId` 和类型名，还携带一个提取函数，用于把 [`Object`] 转换为对应类型的视图：
/// - [`TypeKey::of`]：具体类型 `T`，对象本身是 `T`（或 `Arc<T>`）
/// - [`TypeKey::shared`]：任意 `?Sized` 类型（通常是 trait 对象），对象以 `Arc<I>` 形式存放
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
    extract: Extractor,
    is_instance: InstanceCheck,
}

impl TypeKey {
    /// 具体类型的标识
    pub fn of<T: Any + Send + Sync>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            extract: extract_owned::<T>,
            is_instance: is_instance_of::<T>,
        }
    }

    /// 共享类型（trait 对象等）的标识
    pub fn shared<I: ?Sized + Send + Sync + 'static>() -> Self {
        Self {
            id: TypeId::of::<I>(),
            name: std::any::type_name::<I>(),
            extract: extract_shared::<I>,
            is_instance: is_instance_of::<Arc<I>>,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 是否表示类型 `X`
    pub fn is<X: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<X>()
    }

    /// 尝试直接从对象中提取该类型的视图（不经过类型转换）
    pub fn extract(&self, object: &Object) -> Option<BeanView> {
        (self.extract)(object)
    }

    /// 对象的实际类型是否就是该类型
    pub fn is_instance(&self, object: &Object) -> bool {
        (self.is_instance)(object)
    }

    /// 是否为简单值类型（字符串、数字、布尔、字面量列表）
    ///
    /// 按类型自动装配时会跳过这些属性
    pub fn is_simple_value(&self) -> bool {
        let simple = [
            TypeId::of::<String>(),
            TypeId::of::<bool>(),
            TypeId::of::<char>(),
            TypeId::of::<i8>(),
            TypeId::of::<i16>(),
            TypeId::of::<i32>(),
            TypeId::of::<i64>(),
            TypeId::of::<isize>(),
            TypeId::of::<u8>(),
            TypeId::of::<u16>(),
            TypeId::of::<u32>(),
            TypeId::of::<u64>(),
            TypeId::of::<usize>(),
            TypeId::of::<f32>(),
            TypeId::of::<f64>(),
            TypeId::of::<Literal>(),
            TypeId::of::<Vec<String>>(),
            TypeId::of::<Vec<i64>>(),
        ];
        simple.contains(&self.id)
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

fn extract_owned<T: Any + Send + Sync>(object: &Object) -> Option<BeanView> {
    match Arc::clone(object).downcast::<T>() {
        Ok(typed) => Some(BeanView::new(typed)),
        Err(_) => extract_shared::<T>(object),
    }
}

fn extract_shared<I: ?Sized + Send + Sync + 'static>(object: &Object) -> Option<BeanView> {
    (**object)
        .downcast_ref::<Arc<I>>()
        .map(|shared| BeanView::new(Arc::clone(shared)))
}

fn is_instance_of<T: Any>(object: &Object) -> bool {
    (**object).is::<T>()
}

/// 类型视图 - 装箱的 `Arc<X>`
///
/// 由类型转换、接口转换产生，最终被 setter、构造器和按类型查找消费
pub struct BeanView {
    inner: Box<dyn Any>,
    type_name: &'static str,
}

impl BeanView {
    pub fn new<X: ?Sized + 'static>(value: Arc<X>) -> Self {
        Self {
            inner: Box::new(value),
            type_name: std::any::type_name::<X>(),
        }
    }

    /// 包装一个新值
    pub fn owned<X: Any>(value: X) -> Self {
        Self::new(Arc::new(value))
    }

    pub fn is<X: ?Sized + 'static>(&self) -> bool {
        self.inner.is::<Arc<X>>()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// 取出 `Arc<X>`，类型不符时原样返回
    pub fn into_arc<X: ?Sized + 'static>(self) -> Result<Arc<X>, BeanView> {
        let type_name = self.type_name;
        self.inner
            .downcast::<Arc<X>>()
            .map(|shared| *shared)
            .map_err(|inner| BeanView { inner, type_name })
    }
}

impl fmt::Debug for BeanView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BeanView({})", self.type_name)
    }
}

type Caster = Arc<dyn Fn(&Object) -> Option<BeanView> + Send + Sync>;
type FactoryAccessor = fn(&Object) -> Option<Arc<dyn FactoryBean>>;

/// Bean 的类型信息
///
/// 记录 Bean 的自然类型、它声明实现的接口（trait 对象）以及是否为工厂对象。
/// 按类型查找时，自然类型或任一接口与目标类型相同即视为可赋值。
#[derive(Clone)]
pub struct BeanType {
    natural: TypeKey,
    interfaces: Vec<(TypeKey, Caster)>,
    factory: Option<FactoryAccessor>,
}

impl BeanType {
    pub fn of<T: Any + Send + Sync>() -> Self {
        Self {
            natural: TypeKey::of::<T>(),
            interfaces: Vec::new(),
            factory: None,
        }
    }

    /// 以 `Arc<I>` 形式存放的对象（trait 对象单例、代理）的类型信息
    pub fn shared<I: ?Sized + Send + Sync + 'static>() -> Self {
        Self {
            natural: TypeKey::shared::<I>(),
            interfaces: Vec::new(),
            factory: None,
        }
    }

    /// 工厂对象的类型信息
    pub fn factory<F: FactoryBean + 'static>() -> Self {
        Self {
            factory: Some(factory_accessor::<F>),
            ..Self::of::<F>()
        }
    }

    /// 声明该类型可以作为接口 `I` 使用
    ///
    /// `T` 必须与自然类型一致；被后置处理器替换为 `Arc<I>` 的对象同样可以转换
    pub fn with_interface<T, I, F>(mut self, cast: F) -> Self
    where
        T: Any + Send + Sync,
        I: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        let key = TypeKey::shared::<I>();
        let caster: Caster = Arc::new(move |object: &Object| {
            match Arc::clone(object).downcast::<T>() {
                Ok(typed) => Some(BeanView::new(cast(typed))),
                Err(_) => extract_shared::<I>(object),
            }
        });
        self.interfaces.retain(|(existing, _)| *existing != key);
        self.interfaces.push((key, caster));
        self
    }

    /// 以工厂访问器补充已有的类型信息（保留声明的接口）
    pub fn with_factory<F: FactoryBean + 'static>(mut self) -> Self {
        self.factory = Some(factory_accessor::<F>);
        self
    }

    pub fn natural(&self) -> &TypeKey {
        &self.natural
    }

    /// 声明的接口类型
    pub fn interfaces(&self) -> impl Iterator<Item = &TypeKey> {
        self.interfaces.iter().map(|(key, _)| key)
    }

    pub fn is_assignable_to(&self, key: &TypeKey) -> bool {
        self.natural == *key || self.interfaces.iter().any(|(existing, _)| existing == key)
    }

    /// 按该类型信息把对象转换为目标类型视图
    pub fn cast(&self, object: &Object, key: &TypeKey) -> Option<BeanView> {
        if self.natural == *key {
            return self.natural.extract(object);
        }
        self.interfaces
            .iter()
            .find(|(existing, _)| existing == key)
            .and_then(|(_, caster)| caster(object))
    }

    pub fn is_factory(&self) -> bool {
        self.factory.is_some()
    }

    /// 以工厂接口访问对象
    pub fn as_factory(&self, object: &Object) -> Option<Arc<dyn FactoryBean>> {
        self.factory.and_then(|accessor| accessor(object))
    }
}

impl fmt::Debug for BeanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanType")
            .field("natural", &self.natural)
            .field("interfaces", &self.interfaces().collect::<Vec<_>>())
            .field("factory", &self.is_factory())
            .finish()
    }
}

fn factory_accessor<F: FactoryBean + 'static>(object: &Object) -> Option<Arc<dyn FactoryBean>> {
    Arc::clone(object)
        .downcast::<F>()
        .ok()
        .map(|factory| factory as Arc<dyn FactoryBean>)
}
