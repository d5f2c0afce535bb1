use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{ContainerError, ContainerResult};
use crate::property::{PropertyTable, PropertyTableBuilder};
use crate::scope::{AutowireMode, Scope};
use crate::types::{BeanType, BeanView, Object, TypeKey};
use crate::value::Value;
use crate::IntoResult;

/// 工厂 Bean - 容器中以自身名称暴露其产出的对象
///
/// 通过名称获取时得到 [`FactoryBean::get_object`] 的结果，
/// 以 `&name` 获取时得到工厂本身。
pub trait FactoryBean: Send + Sync {
    /// 产出对象
    fn get_object(&self) -> ContainerResult<Object>;

    /// 产出对象的类型信息，用于按类型查找和类型转换
    fn object_type(&self) -> Option<BeanType> {
        None
    }

    /// 产出对象是否可以缓存复用
    fn is_singleton(&self) -> bool {
        true
    }
}

type Instantiate = Arc<dyn Fn(&mut ConstructorArgs) -> ContainerResult<Object> + Send + Sync>;

/// 生命周期方法（init/destroy），以类型擦除的形式保存
pub(crate) type LifecycleMethod = Arc<dyn Fn(&dyn Any) -> ContainerResult<()> + Send + Sync>;

/// 构造器参数声明
#[derive(Debug, Clone)]
pub struct ConstructorParam {
    name: String,
    key: TypeKey,
}

impl ConstructorParam {
    pub fn of<T: Any + Send + Sync>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: TypeKey::of::<T>(),
        }
    }

    /// trait 对象类型的参数
    pub fn shared<I: ?Sized + Send + Sync + 'static>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: TypeKey::shared::<I>(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_key(&self) -> &TypeKey {
        &self.key
    }
}

/// 构造器
#[derive(Clone)]
pub struct Constructor {
    params: Vec<ConstructorParam>,
    instantiate: Instantiate,
}

impl Constructor {
    pub fn params(&self) -> &[ConstructorParam] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub(crate) fn invoke(&self, bean_name: &str, values: Vec<BeanView>) -> ContainerResult<Object> {
        let mut args = ConstructorArgs {
            bean_name: bean_name.to_string(),
            values: values.into_iter().map(Some).collect(),
        };
        (self.instantiate)(&mut args)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor").field("params", &self.params).finish()
    }
}

/// 传给构造器闭包的已解析参数
pub struct ConstructorArgs {
    bean_name: String,
    values: Vec<Option<BeanView>>,
}

impl ConstructorArgs {
    pub fn bean_name(&self) -> &str {
        &self.bean_name
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 取出第 `index` 个参数
    pub fn take<X: ?Sized + 'static>(&mut self, index: usize) -> ContainerResult<Arc<X>> {
        let view = self
            .values
            .get_mut(index)
            .and_then(Option::take)
            .ok_or_else(|| self.mismatch::<X>(index))?;
        view.into_arc::<X>().map_err(|_| self.mismatch::<X>(index))
    }

    /// 取出第 `index` 个参数的副本
    pub fn value<X: Clone + 'static>(&mut self, index: usize) -> ContainerResult<X> {
        self.take::<X>(index).map(|value| (*value).clone())
    }

    fn mismatch<X: ?Sized>(&self, index: usize) -> ContainerError {
        ContainerError::TypeMismatch {
            property: format!("constructor argument {index} of '{}'", self.bean_name),
            required: std::any::type_name::<X>().to_string(),
        }
    }
}

/// Bean 定义 - 描述如何创建和管理 Bean
#[derive(Clone)]
pub struct BeanDefinition {
    pub(crate) bean_type: BeanType,
    pub(crate) constructors: Vec<Constructor>,
    pub(crate) constructor_args: Vec<Value>,
    pub(crate) property_values: Vec<(String, Value)>,
    pub(crate) properties: PropertyTable,
    pub(crate) methods: HashMap<String, LifecycleMethod>,

    /// Bean 的作用域
    pub scope: Scope,

    /// 自动装配模式
    pub autowire_mode: AutowireMode,

    /// 按类型查找存在多个候选时优先选择
    pub primary: bool,

    /// 是否延迟初始化（仅对单例有效）
    pub lazy_init: bool,

    pub init_method_name: Option<String>,
    pub destroy_method_name: Option<String>,
}

impl BeanDefinition {
    /// 开始构建类型为 `T` 的 Bean 定义
    pub fn builder<T: Any + Send + Sync>() -> BeanDefinitionBuilder<T> {
        BeanDefinitionBuilder {
            definition: BeanDefinition {
                bean_type: BeanType::of::<T>(),
                constructors: Vec::new(),
                constructor_args: Vec::new(),
                property_values: Vec::new(),
                properties: PropertyTable::empty(std::any::type_name::<T>()),
                methods: HashMap::new(),
                scope: Scope::default(),
                autowire_mode: AutowireMode::default(),
                primary: false,
                lazy_init: false,
                init_method_name: None,
                destroy_method_name: None,
            },
            properties: PropertyTable::builder::<T>(),
        }
    }

    /// 只有无参构造器的简单定义
    pub fn new<T, F>(constructor: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::builder::<T>().default_constructor(constructor).build()
    }

    pub fn bean_type(&self) -> &BeanType {
        &self.bean_type
    }

    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    pub fn constructor_args(&self) -> &[Value] {
        &self.constructor_args
    }

    pub fn property_values(&self) -> &[(String, Value)] {
        &self.property_values
    }

    pub fn property_table(&self) -> &PropertyTable {
        &self.properties
    }

    pub fn is_singleton(&self) -> bool {
        self.scope == Scope::Singleton
    }

    pub fn is_prototype(&self) -> bool {
        self.scope == Scope::Prototype
    }

    pub fn has_property_value(&self, name: &str) -> bool {
        self.property_values.iter().any(|(existing, _)| existing == name)
    }

    /// 设置属性值，同名的旧值会被替换
    pub fn add_property_value(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.property_values.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.property_values.push((name, value)),
        }
    }

    pub fn remove_property_value(&mut self, name: &str) -> Option<Value> {
        let position = self.property_values.iter().position(|(existing, _)| existing == name)?;
        Some(self.property_values.remove(position).1)
    }

    pub fn add_constructor_arg(&mut self, value: Value) {
        self.constructor_args.push(value);
    }

    pub(crate) fn lifecycle_method(&self, name: &str) -> Option<&LifecycleMethod> {
        self.methods.get(name)
    }
}

impl fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("type_name", &self.bean_type.natural().name())
            .field("scope", &self.scope)
            .field("autowire_mode", &self.autowire_mode)
            .field("primary", &self.primary)
            .field("lazy_init", &self.lazy_init)
            .field("constructors", &self.constructors.len())
            .field(
                "property_values",
                &self.property_values.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .field("init_method_name", &self.init_method_name)
            .field("destroy_method_name", &self.destroy_method_name)
            .finish()
    }
}

/// Bean 定义构建器
pub struct BeanDefinitionBuilder<T> {
    definition: BeanDefinition,
    properties: PropertyTableBuilder<T>,
}

impl<T: Any + Send + Sync> BeanDefinitionBuilder<T> {
    /// 添加一个构造器
    pub fn constructor<F>(mut self, params: Vec<ConstructorParam>, constructor: F) -> Self
    where
        F: Fn(&mut ConstructorArgs) -> ContainerResult<T> + Send + Sync + 'static,
    {
        let instantiate: Instantiate = Arc::new(move |args: &mut ConstructorArgs| {
            constructor(args).map(|bean| Arc::new(bean) as Object)
        });
        self.definition.constructors.push(Constructor { params, instantiate });
        self
    }

    /// 添加无参构造器
    pub fn default_constructor<F>(self, constructor: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.constructor(Vec::new(), move |_: &mut ConstructorArgs| Ok(constructor()))
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.definition.scope = scope;
        self
    }

    pub fn prototype(self) -> Self {
        self.scope(Scope::Prototype)
    }

    pub fn primary(mut self) -> Self {
        self.definition.primary = true;
        self
    }

    pub fn lazy_init(mut self) -> Self {
        self.definition.lazy_init = true;
        self
    }

    pub fn autowire(mut self, mode: AutowireMode) -> Self {
        self.definition.autowire_mode = mode;
        self
    }

    /// 显式的构造器参数（按位置）
    pub fn constructor_arg(mut self, value: Value) -> Self {
        self.definition.constructor_args.push(value);
        self
    }

    /// 显式的属性值，`path` 可以是嵌套或下标路径
    pub fn property_value(mut self, path: impl Into<String>, value: Value) -> Self {
        self.definition.add_property_value(path, value);
        self
    }

    pub fn property<V, F, R>(mut self, name: &str, setter: F) -> Self
    where
        V: Any + Send + Sync,
        F: Fn(&T, Arc<V>) -> R + Send + Sync + 'static,
        R: IntoResult,
    {
        self.properties = self.properties.property(name, setter);
        self
    }

    pub fn property_dyn<I, F, R>(mut self, name: &str, setter: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(&T, Arc<I>) -> R + Send + Sync + 'static,
        R: IntoResult,
    {
        self.properties = self.properties.property_dyn(name, setter);
        self
    }

    pub fn indexed<V, F, R>(mut self, name: &str, setter: F) -> Self
    where
        V: Any + Send + Sync,
        F: Fn(&T, usize, Arc<V>) -> R + Send + Sync + 'static,
        R: IntoResult,
    {
        self.properties = self.properties.indexed(name, setter);
        self
    }

    pub fn nested<N>(mut self, name: &str, getter: fn(&T) -> &N, table: PropertyTable) -> Self
    where
        N: Any + Send + Sync,
    {
        self.properties = self.properties.nested(name, getter, table);
        self
    }

    /// 声明该类型实现接口 `I`
    pub fn implements<I, F>(mut self, cast: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        self.definition.bean_type = self.definition.bean_type.with_interface::<T, I, F>(cast);
        self
    }

    /// 注册一个具名的生命周期方法
    pub fn method<F, R>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&T) -> R + Send + Sync + 'static,
        R: IntoResult,
    {
        let name = name.into();
        let method_name = name.clone();
        let erased: LifecycleMethod = Arc::new(move |target: &dyn Any| {
            let bean = target.downcast_ref::<T>().ok_or_else(|| {
                ContainerError::Other(anyhow::anyhow!(
                    "Method '{}' cannot be invoked on an object that is not of type '{}'",
                    method_name,
                    std::any::type_name::<T>()
                ))
            })?;
            method(bean).into_result()
        });
        self.definition.methods.insert(name, erased);
        self
    }

    /// 注册并指定初始化方法（@PostConstruct）
    pub fn init_method<F, R>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&T) -> R + Send + Sync + 'static,
        R: IntoResult,
    {
        let name = name.into();
        self.definition.init_method_name = Some(name.clone());
        self.method(name, method)
    }

    /// 注册并指定销毁方法（@PreDestroy）
    pub fn destroy_method<F, R>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&T) -> R + Send + Sync + 'static,
        R: IntoResult,
    {
        let name = name.into();
        self.definition.destroy_method_name = Some(name.clone());
        self.method(name, method)
    }

    pub fn build(mut self) -> BeanDefinition {
        self.definition.properties = self.properties.build();
        self.definition
    }
}

impl<T: FactoryBean + Any> BeanDefinitionBuilder<T> {
    /// 标记为工厂 Bean，容器以名称暴露其产出对象
    pub fn factory_bean(mut self) -> Self {
        self.definition.bean_type = self.definition.bean_type.with_factory::<T>();
        self
    }
}
