//! Bean Factory - 核心容器接口
//!
//! 参考 Spring 的 BeanFactory 架构设计

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::{
    bean::{BeanDefinition, Constructor, FactoryBean},
    bean_post_processor::{BeanPostProcessor, DependencyComparator},
    config::FactoryConfig,
    convert::{SimpleTypeConverter, TypeConverter},
    error::{ContainerError, ContainerResult},
    property::{PropertyValue, PropertyValues},
    registry::{BeanRegistry, RegisteredSingleton},
    scope::{AutowireMode, Scope},
    singleton::SingletonRegistry,
    types::{BeanType, BeanView, Object, TypeKey},
    utils::{
        dependency::CreationTracker,
        naming::{default_bean_name, factory_reference, transformed_bean_name},
    },
    value::Value,
};

#[cfg(test)]
mod tests;

/// BeanFactory - 最基础的容器接口
///
/// 注意：此 trait 不包含泛型方法，因此可以作为 trait object 使用
pub trait BeanFactory: Send + Sync {
    /// 通过名称获取 Bean
    ///
    /// 名称可以是别名；以 `&` 开头时返回工厂 Bean 本身而不是它的产出对象
    fn get_bean(&self, name: &str) -> ContainerResult<Object>;

    /// 通过名称获取 Bean，并转换为要求的类型
    fn get_bean_view(&self, name: &str, required: &TypeKey) -> ContainerResult<BeanView>;

    /// 通过类型获取唯一的 Bean
    fn get_bean_view_by_type(&self, required: &TypeKey) -> ContainerResult<BeanView>;

    /// 检查是否包含指定名称的 Bean
    fn contains_bean(&self, name: &str) -> bool;

    fn is_singleton(&self, name: &str) -> ContainerResult<bool>;

    fn is_prototype(&self, name: &str) -> ContainerResult<bool> {
        self.is_singleton(name).map(|singleton| !singleton)
    }

    /// 指向该名称的所有别名
    fn get_aliases(&self, name: &str) -> Vec<String>;
}

/// BeanFactoryExt - BeanFactory 的扩展 trait
///
/// 提供泛型方法，不能作为 trait object 使用
pub trait BeanFactoryExt: BeanFactory {
    /// 通过名称获取指定类型的 Bean
    fn get_bean_as<T: Any + Send + Sync>(&self, name: &str) -> ContainerResult<Arc<T>> {
        let view = self.get_bean_view(name, &TypeKey::of::<T>())?;
        into_typed(view, name)
    }

    /// 通过名称获取 trait 对象形式的 Bean
    fn get_bean_as_dyn<I: ?Sized + Send + Sync + 'static>(&self, name: &str) -> ContainerResult<Arc<I>> {
        let view = self.get_bean_view(name, &TypeKey::shared::<I>())?;
        into_typed(view, name)
    }

    /// 通过类型获取 Bean
    fn get_bean_by_type<T: Any + Send + Sync>(&self) -> ContainerResult<Arc<T>> {
        let view = self.get_bean_view_by_type(&TypeKey::of::<T>())?;
        into_typed(view, std::any::type_name::<T>())
    }

    /// 通过 trait 对象类型获取 Bean
    fn get_bean_by_type_dyn<I: ?Sized + Send + Sync + 'static>(&self) -> ContainerResult<Arc<I>> {
        let view = self.get_bean_view_by_type(&TypeKey::shared::<I>())?;
        into_typed(view, std::any::type_name::<I>())
    }
}

impl<F: BeanFactory + ?Sized> BeanFactoryExt for F {}

fn into_typed<X: ?Sized + 'static>(view: BeanView, name: &str) -> ContainerResult<Arc<X>> {
    view.into_arc::<X>()
        .map_err(|_| ContainerError::BeanNotOfRequiredType {
            name: name.to_string(),
            required: std::any::type_name::<X>().to_string(),
        })
}

/// ListableBeanFactory - 可列举的 Bean 工厂
pub trait ListableBeanFactory: BeanFactory {
    /// 获取所有 Bean 的名称（定义在前，直接单例在后，各自按注册顺序）
    fn get_bean_names(&self) -> Vec<String>;

    /// 获取指定类型的所有 Bean 名称
    ///
    /// 工厂 Bean 按产出对象的类型匹配；工厂本身匹配时返回 `&name`
    fn get_bean_names_for_type(&self, required: &TypeKey) -> Vec<String>;

    /// 获取 Bean 定义的数量
    fn get_bean_definition_count(&self) -> usize;

    fn contains_bean_definition(&self, name: &str) -> bool;
}

/// ConfigurableBeanFactory - 可配置的 Bean 工厂
pub trait ConfigurableBeanFactory: BeanFactory {
    /// 注册 Bean 定义
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> ContainerResult<()>;

    /// 注册现成的单例对象
    fn register_singleton_object(&self, name: &str, object: Object, bean_type: BeanType) -> ContainerResult<()>;

    fn register_alias(&self, name: &str, alias: &str) -> ContainerResult<()>;

    fn remove_alias(&self, alias: &str) -> ContainerResult<()>;

    /// 移除 Bean 定义
    fn remove_bean_definition(&self, name: &str) -> ContainerResult<()>;

    /// 获取单个 Bean 定义
    fn get_bean_definition(&self, name: &str) -> ContainerResult<BeanDefinition>;

    /// 修改 Bean 定义
    fn modify_bean_definition<F>(&self, name: &str, modifier: F) -> ContainerResult<()>
    where
        Self: Sized,
        F: FnOnce(&mut BeanDefinition);

    /// 添加 BeanPostProcessor，按添加顺序调用
    fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>);

    /// 获取所有 BeanPostProcessor
    fn get_bean_post_processors(&self) -> Vec<Arc<dyn BeanPostProcessor>>;

    fn set_type_converter(&self, converter: Arc<dyn TypeConverter>);

    fn set_dependency_comparator(&self, comparator: Arc<dyn DependencyComparator>);

    fn set_allow_bean_definition_overriding(&self, allow: bool);

    fn set_allow_circular_references(&self, allow: bool);
}

/// ConfigurableListableBeanFactory - 可配置且可列举的 Bean 工厂
pub trait ConfigurableListableBeanFactory: ListableBeanFactory + ConfigurableBeanFactory {
    /// 预实例化所有非延迟的单例 Bean
    fn preinstantiate_singletons(&self) -> ContainerResult<()>;

    /// 冻结配置（不再允许修改 Bean 定义）
    fn freeze_configuration(&self);

    /// 检查配置是否已冻结
    fn is_configuration_frozen(&self) -> bool;

    /// 销毁所有单例 Bean（按创建顺序的逆序调用 destroy 方法）
    fn destroy_singletons(&self) -> ContainerResult<()>;
}

/// 解析出的 Bean 及其类型信息
struct Resolved {
    object: Object,
    bean_type: Option<BeanType>,
}

/// 创建流水线的产物
struct Created {
    /// 经过后置处理器之后暴露给外部的对象
    exposed: Object,
    /// 构造器产出的原始对象，生命周期方法在它上面调用
    raw: Object,
}

/// DefaultListableBeanFactory - ConfigurableListableBeanFactory 的默认实现
///
/// 类似 Spring 的 DefaultListableBeanFactory
pub struct DefaultListableBeanFactory {
    /// Bean 定义、直接单例与别名
    registry: BeanRegistry,

    /// 单例缓存
    singletons: SingletonRegistry,

    /// 原型 Bean 的循环依赖检测（按线程）
    prototypes_in_creation: CreationTracker,

    /// Bean 后置处理器列表（按添加顺序）
    bean_post_processors: RwLock<Vec<Arc<dyn BeanPostProcessor>>>,

    type_converter: RwLock<Option<Arc<dyn TypeConverter>>>,
    simple_converter: SimpleTypeConverter,
    dependency_comparator: RwLock<Option<Arc<dyn DependencyComparator>>>,

    allow_circular_references: RwLock<bool>,

    /// 至少被请求过一次的定义名称
    already_created: RwLock<HashSet<String>>,

    /// 需要在销毁时调用 destroy 方法的单例（原始对象）
    disposable_beans: Mutex<HashMap<String, Object>>,
}

impl DefaultListableBeanFactory {
    /// 创建新的 Bean 工厂
    pub fn new() -> Self {
        Self::with_config(&FactoryConfig::default())
    }

    /// 按配置创建 Bean 工厂
    pub fn with_config(config: &FactoryConfig) -> Self {
        let registry = BeanRegistry::new();
        registry.set_allow_overriding(config.allow_bean_definition_overriding);

        Self {
            registry,
            singletons: SingletonRegistry::new(),
            prototypes_in_creation: CreationTracker::new(),
            bean_post_processors: RwLock::new(Vec::new()),
            type_converter: RwLock::new(None),
            simple_converter: SimpleTypeConverter,
            dependency_comparator: RwLock::new(None),
            allow_circular_references: RwLock::new(config.allow_circular_references),
            already_created: RwLock::new(HashSet::new()),
            disposable_beans: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_allow_bean_definition_overriding(&self) -> bool {
        self.registry.is_allow_overriding()
    }

    pub fn is_allow_circular_references(&self) -> bool {
        *self.allow_circular_references.read()
    }

    /// 注册现成的单例
    pub fn register_singleton<T: Any + Send + Sync>(&self, name: &str, bean: Arc<T>) -> ContainerResult<()> {
        self.register_singleton_object(name, bean, BeanType::of::<T>())
    }

    /// 以 trait 对象形式注册现成的单例
    pub fn register_singleton_dyn<I: ?Sized + Send + Sync + 'static>(
        &self,
        name: &str,
        bean: Arc<I>,
    ) -> ContainerResult<()> {
        self.register_singleton_object(name, Arc::new(bean), BeanType::shared::<I>())
    }

    /// 注册现成的工厂 Bean
    pub fn register_factory_singleton<F: FactoryBean + 'static>(
        &self,
        name: &str,
        factory: Arc<F>,
    ) -> ContainerResult<()> {
        self.register_singleton_object(name, factory, BeanType::factory::<F>())
    }

    /// 以自动生成的名称注册 Bean 定义
    ///
    /// 名称取类型名的 camelCase 形式，被占用时追加 `#序号`
    pub fn register_bean(&self, definition: BeanDefinition) -> ContainerResult<String> {
        let base = default_bean_name(definition.bean_type().natural().name());
        let mut name = base.clone();
        let mut counter = 0;
        while self.registry.is_bound(&name) {
            name = format!("{base}#{counter}");
            counter += 1;
        }
        self.register_bean_definition(&name, definition)?;
        Ok(name)
    }

    /// 已创建的单例名称（创建顺序）
    pub fn get_singleton_names(&self) -> Vec<String> {
        self.singletons.singleton_names()
    }

    /// 把别名（可以是别名链）解析为规范名称，`&` 前缀会被保留
    pub fn canonical_name(&self, name: &str) -> ContainerResult<String> {
        let (bare, dereference) = transformed_bean_name(name);
        let canonical = self.registry.canonical_name(bare)?;
        Ok(if dereference { factory_reference(&canonical) } else { canonical })
    }

    fn post_processors(&self) -> Vec<Arc<dyn BeanPostProcessor>> {
        self.bean_post_processors.read().clone()
    }

    fn do_get_bean(&self, name: &str) -> ContainerResult<Resolved> {
        let (bare, dereference) = transformed_bean_name(name);
        let canonical = self.registry.canonical_name(bare)?;
        tracing::trace!("Requesting bean '{}' (canonical '{}')", name, canonical);

        if let Some(entry) = self.registry.singleton(&canonical) {
            return self.object_for_instance(&canonical, entry.object, &entry.bean_type, dereference, true);
        }

        let definition = self
            .registry
            .definition(&canonical)
            .ok_or_else(|| ContainerError::NameNotFound(canonical.clone()))?;
        self.already_created.write().insert(canonical.clone());

        let instance = match definition.scope {
            Scope::Singleton => self.get_singleton(&canonical, &definition)?,
            Scope::Prototype => self.create_prototype(&canonical, &definition)?,
        };

        self.object_for_instance(
            &canonical,
            instance,
            &definition.bean_type,
            dereference,
            definition.is_singleton(),
        )
    }

    /// 根据是否以 `&` 访问，返回工厂本身、工厂产出对象或普通 Bean
    ///
    /// 只有单例工厂（`shared`）的产出对象才会按名称缓存
    fn object_for_instance(
        &self,
        name: &str,
        instance: Object,
        bean_type: &BeanType,
        dereference: bool,
        shared: bool,
    ) -> ContainerResult<Resolved> {
        let factory = bean_type.as_factory(&instance);

        if dereference {
            return match factory {
                Some(_) => Ok(Resolved {
                    object: instance,
                    bean_type: Some(bean_type.clone()),
                }),
                None => Err(ContainerError::NotAFactory(name.to_string())),
            };
        }

        let Some(factory) = factory else {
            return Ok(Resolved {
                object: instance,
                bean_type: Some(bean_type.clone()),
            });
        };

        let object = if shared {
            self.object_from_factory(name, &factory)?
        } else {
            self.produce(name, &factory)?
        };
        Ok(Resolved {
            object,
            bean_type: factory.object_type(),
        })
    }

    fn object_from_factory(&self, name: &str, factory: &Arc<dyn FactoryBean>) -> ContainerResult<Object> {
        if !factory.is_singleton() {
            return self.produce(name, factory);
        }
        if let Some(product) = self.singletons.factory_product(name) {
            tracing::trace!("Returning cached object from factory bean '{}'", name);
            return Ok(product);
        }

        let _lock = self.singletons.lock_creation();
        if let Some(product) = self.singletons.factory_product(name) {
            return Ok(product);
        }
        let product = self.produce(name, factory)?;
        self.singletons.cache_factory_product(name, Arc::clone(&product));
        Ok(product)
    }

    fn produce(&self, name: &str, factory: &Arc<dyn FactoryBean>) -> ContainerResult<Object> {
        tracing::debug!("Obtaining object from factory bean '{}'", name);
        factory
            .get_object()
            .and_then(|product| self.apply_after_initialization(product, name))
            .map_err(|e| ContainerError::creation(name, e))
    }

    fn get_singleton(&self, name: &str, definition: &BeanDefinition) -> ContainerResult<Object> {
        if let Some(bean) = self.singletons.get(name) {
            tracing::trace!("Returning cached instance of singleton bean '{}'", name);
            return Ok(bean);
        }

        let _lock = self.singletons.lock_creation();
        if let Some(bean) = self.singletons.get(name) {
            return Ok(bean);
        }

        let early = self
            .singletons
            .early_reference(name, |raw| self.apply_early_bean_reference(raw, name))?;
        if let Some(early) = early {
            tracing::debug!(
                "Returning eagerly cached instance of singleton bean '{}' that is not fully initialized yet - a consequence of a circular reference",
                name
            );
            return Ok(early);
        }

        let _creation = self.singletons.begin_creation(name)?;
        tracing::info!("Creating shared instance of singleton bean '{}'", name);

        let created = match self.create_bean(name, definition, self.is_allow_circular_references()) {
            Ok(created) => created,
            Err(e) => {
                self.discard_early_dependents(name);
                return Err(e);
            }
        };
        if definition.destroy_method_name.is_some() {
            self.disposable_beans
                .lock()
                .insert(name.to_string(), Arc::clone(&created.raw));
        }
        self.singletons.add_singleton(name, Arc::clone(&created.exposed));
        Ok(created.exposed)
    }

    fn create_prototype(&self, name: &str, definition: &BeanDefinition) -> ContainerResult<Object> {
        if !self.prototypes_in_creation.start_creating(name) {
            let chain = self.prototypes_in_creation.current_creating();
            return Err(ContainerError::UnresolvableCircularReference {
                name: name.to_string(),
                reason: format!("prototype bean is already in creation on this thread ({})", chain.join(", ")),
            });
        }

        struct PrototypeGuard<'a> {
            tracker: &'a CreationTracker,
            name: &'a str,
        }

        impl Drop for PrototypeGuard<'_> {
            fn drop(&mut self) {
                self.tracker.finish_creating(self.name);
            }
        }

        let _guard = PrototypeGuard {
            tracker: &self.prototypes_in_creation,
            name,
        };

        tracing::debug!("Creating new instance of prototype bean '{}'", name);
        self.create_bean(name, definition, false).map(|created| created.exposed)
    }

    fn create_bean(&self, name: &str, definition: &BeanDefinition, expose_early: bool) -> ContainerResult<Created> {
        self.do_create_bean(name, definition, expose_early).map_err(|e| {
            tracing::debug!("Creation of bean '{}' failed: {}", name, e);
            ContainerError::creation(name, e)
        })
    }

    /// 创建流水线
    ///
    /// 1. 实例化前钩子（可替换整个创建过程）
    /// 2. 构造
    /// 3. 登记提前引用
    /// 4. 实例化后钩子
    /// 5. 计算属性值、自动装配、属性钩子、写入属性
    /// 6. 初始化前钩子、初始化方法、初始化后钩子
    /// 7. 校验提前引用与最终对象一致
    fn do_create_bean(&self, name: &str, definition: &BeanDefinition, expose_early: bool) -> ContainerResult<Created> {
        if let Some(substitute) = self.apply_before_instantiation(&definition.bean_type, name)? {
            tracing::debug!("Bean '{}' was supplied by a post-processor before instantiation", name);
            let exposed = self.apply_after_initialization(Arc::clone(&substitute), name)?;
            return Ok(Created { exposed, raw: substitute });
        }

        let raw = self.instantiate(name, definition)?;

        if expose_early {
            tracing::trace!("Eagerly caching bean '{}' to allow for resolving potential circular references", name);
            self.singletons.add_early_reference(name, Arc::clone(&raw));
        }

        self.populate_bean(name, definition, &raw)?;
        let exposed = self.initialize_bean(name, definition, Arc::clone(&raw))?;

        let exposed = if expose_early {
            self.reconcile_early_reference(name, &raw, exposed)?
        } else {
            exposed
        };

        Ok(Created { exposed, raw })
    }

    fn reconcile_early_reference(&self, name: &str, raw: &Object, exposed: Object) -> ContainerResult<Object> {
        let Some(early) = self.singletons.exposed_early_reference(name) else {
            return Ok(exposed);
        };
        if Arc::ptr_eq(&exposed, raw) || Arc::ptr_eq(&exposed, &early) {
            return Ok(early);
        }
        Err(ContainerError::UnresolvableCircularReference {
            name: name.to_string(),
            reason: "bean has been injected into other beans in its raw version as part of a circular reference, but has eventually been wrapped".to_string(),
        })
    }

    fn instantiate(&self, name: &str, definition: &BeanDefinition) -> ContainerResult<Object> {
        if !definition.constructor_args.is_empty() {
            let arity = definition.constructor_args.len();
            let constructor = definition
                .constructors
                .iter()
                .find(|constructor| constructor.arity() == arity)
                .ok_or_else(|| ContainerError::NoSuitableConstructor {
                    name: name.to_string(),
                    reason: format!("no constructor takes {arity} argument(s)"),
                })?;

            let mut values = Vec::with_capacity(arity);
            for (index, (value, param)) in definition
                .constructor_args
                .iter()
                .zip(constructor.params())
                .enumerate()
            {
                let resolved = self.resolve_value(name, &format!("constructor argument {index}"), value)?;
                values.push(self.coerce_param(&resolved, param.name(), param.type_key())?);
            }
            tracing::debug!("Instantiating bean '{}' with {} explicit constructor argument(s)", name, arity);
            return constructor.invoke(name, values);
        }

        if definition.autowire_mode == AutowireMode::Constructor {
            return self.autowire_constructor(name, definition);
        }

        let constructor = definition
            .constructors
            .iter()
            .find(|constructor| constructor.arity() == 0)
            .ok_or_else(|| ContainerError::NoSuitableConstructor {
                name: name.to_string(),
                reason: "no default constructor".to_string(),
            })?;
        constructor.invoke(name, Vec::new())
    }

    /// 选择参数都能被满足、且参数最多的构造器
    fn autowire_constructor(&self, name: &str, definition: &BeanDefinition) -> ContainerResult<Object> {
        let mut candidates: Vec<&Constructor> = definition.constructors.iter().collect();
        candidates.sort_by(|a, b| b.arity().cmp(&a.arity()));

        for constructor in candidates {
            let Some(targets) = self.match_constructor(name, constructor)? else {
                continue;
            };
            tracing::debug!(
                "Autowiring bean '{}' through constructor with {} parameter(s)",
                name,
                constructor.arity()
            );

            let mut values = Vec::with_capacity(targets.len());
            for (param, target) in constructor.params().iter().zip(&targets) {
                let resolved = self.do_get_bean(target)?;
                values.push(self.coerce_param(&resolved, param.name(), param.type_key())?);
            }
            return constructor.invoke(name, values);
        }

        Err(ContainerError::NoSuitableConstructor {
            name: name.to_string(),
            reason: "no constructor has all of its parameters satisfiable".to_string(),
        })
    }

    fn match_constructor(&self, name: &str, constructor: &Constructor) -> ContainerResult<Option<Vec<String>>> {
        let mut targets = Vec::with_capacity(constructor.arity());
        for param in constructor.params() {
            match self.find_autowire_candidate(name, param.type_key(), Some(param.name()), true) {
                Ok(Some(target)) => targets.push(target),
                Ok(None) | Err(ContainerError::AmbiguousType { .. }) => return Ok(None),
                Err(e) => return Err(e),
            }
        }
        Ok(Some(targets))
    }

    fn coerce_param(&self, resolved: &Resolved, param: &str, key: &TypeKey) -> ContainerResult<BeanView> {
        self.coerce(&resolved.object, resolved.bean_type.as_ref(), key)
            .ok_or_else(|| ContainerError::TypeMismatch {
                property: param.to_string(),
                required: key.name().to_string(),
            })
    }

    /// 为 `owner` 的某个依赖查找唯一候选
    ///
    /// 多个候选时依次按 primary、名称、依赖比较器裁决；
    /// 没有候选且 `fallback_by_name` 时尝试同名 Bean
    fn find_autowire_candidate(
        &self,
        owner: &str,
        key: &TypeKey,
        preferred_name: Option<&str>,
        fallback_by_name: bool,
    ) -> ContainerResult<Option<String>> {
        let candidates: Vec<String> = self
            .get_bean_names_for_type(key)
            .into_iter()
            .filter(|candidate| transformed_bean_name(candidate).0 != owner)
            .collect();

        match candidates.len() {
            0 => {
                let by_name = preferred_name
                    .filter(|_| fallback_by_name)
                    .filter(|name| *name != owner && self.contains_bean(name));
                Ok(by_name.map(str::to_string))
            }
            1 => Ok(candidates.into_iter().next()),
            _ => self.determine_candidate(key, candidates, preferred_name).map(Some),
        }
    }

    fn resolve_named_bean(&self, key: &TypeKey) -> ContainerResult<String> {
        let mut candidates = self.get_bean_names_for_type(key);
        match candidates.len() {
            0 => Err(ContainerError::NoSuchType(key.name().to_string())),
            1 => Ok(candidates.remove(0)),
            _ => self.determine_candidate(key, candidates, None),
        }
    }

    fn determine_candidate(
        &self,
        key: &TypeKey,
        candidates: Vec<String>,
        preferred_name: Option<&str>,
    ) -> ContainerResult<String> {
        let primaries: Vec<&String> = candidates
            .iter()
            .filter(|candidate| self.is_primary(candidate))
            .collect();
        match primaries.len() {
            1 => return Ok(primaries[0].clone()),
            0 => {}
            _ => {
                return Err(ContainerError::AmbiguousType {
                    type_name: key.name().to_string(),
                    candidates: primaries.into_iter().cloned().collect(),
                })
            }
        }

        if let Some(preferred) = preferred_name {
            if let Some(matched) = candidates.iter().find(|candidate| *candidate == preferred) {
                return Ok(matched.clone());
            }
        }

        let comparator = self.dependency_comparator.read().clone();
        if let Some(comparator) = comparator {
            let mut best: Option<(i32, &String)> = None;
            let mut tied = false;
            for candidate in &candidates {
                let resolved = self.do_get_bean(candidate)?;
                let Some(priority) = comparator.priority(candidate, &resolved.object) else {
                    continue;
                };
                match best {
                    Some((current, _)) if priority > current => {}
                    Some((current, _)) if priority == current => tied = true,
                    _ => {
                        best = Some((priority, candidate));
                        tied = false;
                    }
                }
            }
            if let (Some((_, winner)), false) = (best, tied) {
                return Ok(winner.clone());
            }
        }

        Err(ContainerError::AmbiguousType {
            type_name: key.name().to_string(),
            candidates,
        })
    }

    fn is_primary(&self, candidate: &str) -> bool {
        let (bare, _) = transformed_bean_name(candidate);
        self.registry
            .definition(bare)
            .is_some_and(|definition| definition.primary)
    }

    /// 工厂产出对象的类型是否匹配，检查失败时视为不匹配
    fn factory_product_matches(&self, name: &str, key: &TypeKey) -> bool {
        match self.do_get_bean(&factory_reference(name)) {
            Ok(resolved) => resolved
                .bean_type
                .and_then(|bean_type| bean_type.as_factory(&resolved.object))
                .and_then(|factory| factory.object_type())
                .is_some_and(|product_type| product_type.is_assignable_to(key)),
            Err(e) => {
                tracing::debug!(
                    "Ignoring factory bean '{}' during type matching because it could not be obtained: {}",
                    name,
                    e
                );
                false
            }
        }
    }

    fn populate_bean(&self, name: &str, definition: &BeanDefinition, bean: &Object) -> ContainerResult<()> {
        let processors = self.post_processors();
        for processor in &processors {
            if !processor.post_process_after_instantiation(bean, name)? {
                tracing::debug!(
                    "Post-processor '{}' skipped property population of bean '{}'",
                    processor.name(),
                    name
                );
                return Ok(());
            }
        }

        let mut values = PropertyValues::new();
        for (property, value) in &definition.property_values {
            let resolved = self.resolve_value(name, property, value)?;
            values.add(PropertyValue::resolved(property.as_str(), resolved.object, resolved.bean_type));
        }

        match definition.autowire_mode {
            AutowireMode::ByName => self.autowire_by_name(name, definition, &mut values)?,
            AutowireMode::ByType => self.autowire_by_type(name, definition, &mut values)?,
            AutowireMode::No | AutowireMode::Constructor => {}
        }

        for processor in &processors {
            values = processor.post_process_properties(values, bean, name)?;
        }

        if values.is_empty() {
            return Ok(());
        }

        let target: &dyn Any = &**bean;
        let coerce = |object: &Object, source: Option<&BeanType>, key: &TypeKey| self.coerce(object, source, key);
        for value in values.iter() {
            tracing::trace!("Applying property '{}' to bean '{}'", value.name(), name);
            definition
                .properties
                .apply(target, value.name(), value.value(), value.source_type(), &coerce)?;
        }
        Ok(())
    }

    fn autowire_by_name(&self, name: &str, definition: &BeanDefinition, values: &mut PropertyValues) -> ContainerResult<()> {
        for (property, _) in definition.properties.writable_properties() {
            if values.contains(property) {
                continue;
            }
            if !self.contains_bean(property) {
                tracing::trace!(
                    "Not autowiring property '{}' of bean '{}' by name: no matching bean found",
                    property,
                    name
                );
                continue;
            }
            let resolved = self.do_get_bean(property)?;
            tracing::debug!("Added autowiring by name from bean name '{}' via property '{}'", name, property);
            values.add(PropertyValue::resolved(property, resolved.object, resolved.bean_type));
        }
        Ok(())
    }

    fn autowire_by_type(&self, name: &str, definition: &BeanDefinition, values: &mut PropertyValues) -> ContainerResult<()> {
        for (property, key) in definition.properties.writable_properties() {
            if values.contains(property) || key.is_simple_value() {
                continue;
            }
            let Some(target) = self.find_autowire_candidate(name, key, Some(property), false)? else {
                tracing::trace!(
                    "Not autowiring property '{}' of bean '{}' by type: no candidate of type '{}'",
                    property,
                    name,
                    key
                );
                continue;
            };
            let resolved = self.do_get_bean(&target)?;
            tracing::debug!(
                "Autowiring by type from bean name '{}' via property '{}' to bean named '{}'",
                name,
                property,
                target
            );
            values.add(PropertyValue::resolved(property, resolved.object, resolved.bean_type));
        }
        Ok(())
    }

    fn resolve_value(&self, owner: &str, property: &str, value: &Value) -> ContainerResult<Resolved> {
        match value {
            Value::Literal(literal) => Ok(Resolved {
                object: Arc::new(literal.clone()),
                bean_type: None,
            }),
            Value::Ref(target) => self.do_get_bean(target),
            Value::Inner(definition) => {
                let inner_name = format!("{owner}#{property}");
                tracing::trace!("Creating inner bean '{}'", inner_name);
                let created = self.create_bean(&inner_name, definition, false)?;
                self.object_for_instance(&inner_name, created.exposed, &definition.bean_type, false, false)
            }
        }
    }

    /// 把对象转换为目标类型：先按来源类型信息，再直接提取，最后经过类型转换器
    fn coerce(&self, object: &Object, source: Option<&BeanType>, required: &TypeKey) -> Option<BeanView> {
        if let Some(view) = source.and_then(|bean_type| bean_type.cast(object, required)) {
            return Some(view);
        }
        if let Some(view) = required.extract(object) {
            return Some(view);
        }
        let custom = self.type_converter.read().clone();
        if let Some(view) = custom.and_then(|converter| converter.convert(object, required)) {
            return Some(view);
        }
        self.simple_converter.convert(object, required)
    }

    fn initialize_bean(&self, name: &str, definition: &BeanDefinition, raw: Object) -> ContainerResult<Object> {
        let bean = self.apply_before_initialization(Arc::clone(&raw), name)?;
        self.invoke_init_method(name, definition, &bean, &raw)?;
        self.apply_after_initialization(bean, name)
    }

    fn invoke_init_method(&self, name: &str, definition: &BeanDefinition, bean: &Object, raw: &Object) -> ContainerResult<()> {
        let Some(method_name) = &definition.init_method_name else {
            return Ok(());
        };
        let method = definition.lifecycle_method(method_name).ok_or_else(|| {
            ContainerError::Other(anyhow::anyhow!(
                "Could not find an init method named '{}' on bean with name '{}'",
                method_name,
                name
            ))
        })?;

        let target: &dyn Any = if definition.bean_type.natural().is_instance(bean) {
            &**bean
        } else {
            &**raw
        };
        tracing::debug!("Invoking init method '{}' on bean with name '{}'", method_name, name);
        method(target)
    }

    fn apply_before_instantiation(&self, bean_type: &BeanType, name: &str) -> ContainerResult<Option<Object>> {
        for processor in self.post_processors() {
            if let Some(bean) = processor.post_process_before_instantiation(bean_type, name)? {
                return Ok(Some(bean));
            }
        }
        Ok(None)
    }

    fn apply_early_bean_reference(&self, bean: Object, name: &str) -> ContainerResult<Object> {
        self.post_processors()
            .iter()
            .try_fold(bean, |current, processor| processor.early_bean_reference(current, name))
    }

    fn apply_before_initialization(&self, bean: Object, name: &str) -> ContainerResult<Object> {
        self.post_processors()
            .iter()
            .try_fold(bean, |current, processor| processor.post_process_before_initialization(current, name))
    }

    fn apply_after_initialization(&self, bean: Object, name: &str) -> ContainerResult<Object> {
        self.post_processors()
            .iter()
            .try_fold(bean, |current, processor| processor.post_process_after_initialization(current, name))
    }
}

impl Default for DefaultListableBeanFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl BeanFactory for DefaultListableBeanFactory {
    fn get_bean(&self, name: &str) -> ContainerResult<Object> {
        self.do_get_bean(name).map(|resolved| resolved.object)
    }

    fn get_bean_view(&self, name: &str, required: &TypeKey) -> ContainerResult<BeanView> {
        let resolved = self.do_get_bean(name)?;
        self.coerce(&resolved.object, resolved.bean_type.as_ref(), required)
            .ok_or_else(|| ContainerError::BeanNotOfRequiredType {
                name: name.to_string(),
                required: required.name().to_string(),
            })
    }

    fn get_bean_view_by_type(&self, required: &TypeKey) -> ContainerResult<BeanView> {
        let name = self.resolve_named_bean(required)?;
        tracing::trace!("Resolved type '{}' to bean '{}'", required, name);
        self.get_bean_view(&name, required)
    }

    fn contains_bean(&self, name: &str) -> bool {
        self.registry.is_bound(transformed_bean_name(name).0)
    }

    fn is_singleton(&self, name: &str) -> ContainerResult<bool> {
        let (bare, dereference) = transformed_bean_name(name);
        let canonical = self.registry.canonical_name(bare)?;

        if let Some(entry) = self.registry.singleton(&canonical) {
            return Ok(dereference
                || entry
                    .bean_type
                    .as_factory(&entry.object)
                    .map_or(true, |factory| factory.is_singleton()));
        }

        let definition = self
            .registry
            .definition(&canonical)
            .ok_or_else(|| ContainerError::NameNotFound(canonical.clone()))?;
        if !definition.is_singleton() {
            return Ok(false);
        }
        if dereference || !definition.bean_type.is_factory() {
            return Ok(true);
        }

        let factory = self.do_get_bean(&factory_reference(&canonical))?;
        Ok(definition
            .bean_type
            .as_factory(&factory.object)
            .map_or(true, |factory| factory.is_singleton()))
    }

    fn get_aliases(&self, name: &str) -> Vec<String> {
        let (bare, dereference) = transformed_bean_name(name);
        let Ok(canonical) = self.registry.canonical_name(bare) else {
            return Vec::new();
        };

        let mut aliases = Vec::new();
        if canonical != bare {
            aliases.push(canonical.clone());
        }
        aliases.extend(
            self.registry
                .aliases_for(&canonical)
                .into_iter()
                .filter(|alias| alias != bare),
        );
        if dereference {
            aliases = aliases.iter().map(|alias| factory_reference(alias)).collect();
        }
        aliases
    }
}

impl ListableBeanFactory for DefaultListableBeanFactory {
    fn get_bean_names(&self) -> Vec<String> {
        let mut names = self.registry.definition_names();
        names.extend(self.registry.singleton_names());
        names
    }

    fn get_bean_names_for_type(&self, required: &TypeKey) -> Vec<String> {
        let mut result = Vec::new();

        for name in self.registry.definition_names() {
            let Some(definition) = self.registry.definition(&name) else {
                continue;
            };
            if definition.bean_type.is_factory() {
                if self.factory_product_matches(&name, required) {
                    result.push(name.clone());
                }
                if definition.bean_type.is_assignable_to(required) {
                    result.push(factory_reference(&name));
                }
            } else if definition.bean_type.is_assignable_to(required) {
                result.push(name);
            }
        }

        for name in self.registry.singleton_names() {
            let Some(RegisteredSingleton { object, bean_type }) = self.registry.singleton(&name) else {
                continue;
            };
            match bean_type.as_factory(&object) {
                Some(factory) => {
                    if factory
                        .object_type()
                        .is_some_and(|product_type| product_type.is_assignable_to(required))
                    {
                        result.push(name.clone());
                    }
                    if bean_type.is_assignable_to(required) {
                        result.push(factory_reference(&name));
                    }
                }
                None if bean_type.is_assignable_to(required) || required.extract(&object).is_some() => {
                    result.push(name);
                }
                None => {}
            }
        }

        result
    }

    fn get_bean_definition_count(&self) -> usize {
        self.registry.definition_count()
    }

    fn contains_bean_definition(&self, name: &str) -> bool {
        self.registry.contains_definition(name)
    }
}

impl ConfigurableBeanFactory for DefaultListableBeanFactory {
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> ContainerResult<()> {
        if self.registry.is_frozen() {
            return Err(ContainerError::ConfigurationFrozen(name.to_string()));
        }

        tracing::trace!(
            "Registering bean definition: name='{}', type='{}', scope={:?}",
            name,
            definition.bean_type().natural(),
            definition.scope
        );

        let replaced = self.registry.register_definition(name, definition)?;
        if replaced.is_some() {
            self.reset_bean(name);
        }
        Ok(())
    }

    fn register_singleton_object(&self, name: &str, object: Object, bean_type: BeanType) -> ContainerResult<()> {
        self.registry
            .register_singleton(name, RegisteredSingleton { object, bean_type })
    }

    fn register_alias(&self, name: &str, alias: &str) -> ContainerResult<()> {
        self.registry.register_alias(name, alias)
    }

    fn remove_alias(&self, alias: &str) -> ContainerResult<()> {
        self.registry.remove_alias(alias)
    }

    fn remove_bean_definition(&self, name: &str) -> ContainerResult<()> {
        if self.registry.is_frozen() {
            return Err(ContainerError::ConfigurationFrozen(name.to_string()));
        }
        self.registry.remove_definition(name)?;
        self.reset_bean(name);
        Ok(())
    }

    fn get_bean_definition(&self, name: &str) -> ContainerResult<BeanDefinition> {
        let canonical = self.registry.canonical_name(name)?;
        self.registry
            .definition(&canonical)
            .map(|definition| (*definition).clone())
            .ok_or(ContainerError::NameNotFound(canonical))
    }

    fn modify_bean_definition<F>(&self, name: &str, modifier: F) -> ContainerResult<()>
    where
        F: FnOnce(&mut BeanDefinition),
    {
        if self.already_created.read().contains(name) {
            return Err(ContainerError::ConfigurationFrozen(name.to_string()));
        }
        self.registry.modify_definition(name, modifier)?;
        tracing::debug!("Bean definition '{}' modified successfully", name);
        Ok(())
    }

    fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        tracing::debug!("Adding bean post-processor '{}'", processor.name());
        self.bean_post_processors.write().push(processor);
    }

    fn get_bean_post_processors(&self) -> Vec<Arc<dyn BeanPostProcessor>> {
        self.post_processors()
    }

    fn set_type_converter(&self, converter: Arc<dyn TypeConverter>) {
        *self.type_converter.write() = Some(converter);
    }

    fn set_dependency_comparator(&self, comparator: Arc<dyn DependencyComparator>) {
        *self.dependency_comparator.write() = Some(comparator);
    }

    fn set_allow_bean_definition_overriding(&self, allow: bool) {
        self.registry.set_allow_overriding(allow);
    }

    fn set_allow_circular_references(&self, allow: bool) {
        *self.allow_circular_references.write() = allow;
    }
}

impl DefaultListableBeanFactory {
    /// 单例创建失败后，销毁那些在它的提前引用暴露之后完成的单例
    fn discard_early_dependents(&self, name: &str) {
        for (dependent, _) in self.singletons.discard_early_reference(name) {
            tracing::debug!(
                "Discarded singleton '{}' that may hold an early reference to failed bean '{}'",
                dependent,
                name
            );
            let raw = self.disposable_beans.lock().remove(&dependent);
            if let Some(raw) = raw {
                self.invoke_destroy_method(&dependent, &raw);
            }
        }
    }

    fn invoke_destroy_method(&self, name: &str, raw: &Object) {
        let Some(definition) = self.registry.definition(name) else {
            return;
        };
        let Some(method_name) = &definition.destroy_method_name else {
            return;
        };
        let Some(method) = definition.lifecycle_method(method_name) else {
            tracing::warn!("Could not find a destroy method named '{}' on bean with name '{}'", method_name, name);
            return;
        };

        tracing::debug!("Invoking destroy method '{}' on bean with name '{}'", method_name, name);
        let target: &dyn Any = &**raw;
        if let Err(e) = method(target) {
            tracing::warn!("Destroy method '{}' on bean with name '{}' failed: {}", method_name, name, e);
        }
    }

    /// 定义被覆盖或删除后，丢弃旧定义创建的单例
    fn reset_bean(&self, name: &str) {
        if self.singletons.remove_singleton(name).is_some() {
            tracing::debug!("Discarded cached singleton '{}' of a replaced definition", name);
        }
        self.disposable_beans.lock().remove(name);
        self.already_created.write().remove(name);
    }
}

impl ConfigurableListableBeanFactory for DefaultListableBeanFactory {
    fn preinstantiate_singletons(&self) -> ContainerResult<()> {
        let names = self.registry.definition_names();
        tracing::debug!("Pre-instantiating singletons among {} bean definitions", names.len());

        for name in names {
            let Some(definition) = self.registry.definition(&name) else {
                continue;
            };
            if !definition.is_singleton() || definition.lazy_init {
                continue;
            }
            if definition.bean_type.is_factory() {
                self.get_bean(&factory_reference(&name))?;
            } else {
                self.get_bean(&name)?;
            }
        }

        Ok(())
    }

    fn freeze_configuration(&self) {
        self.registry.freeze();
        tracing::debug!("Bean factory configuration frozen");
    }

    fn is_configuration_frozen(&self) -> bool {
        self.registry.is_frozen()
    }

    fn destroy_singletons(&self) -> ContainerResult<()> {
        tracing::info!("Destroying singleton beans");

        let destroyed = self.singletons.drain_for_destruction();
        let mut disposable = std::mem::take(&mut *self.disposable_beans.lock());
        self.already_created.write().clear();

        for (name, _) in destroyed {
            if let Some(raw) = disposable.remove(&name) {
                self.invoke_destroy_method(&name, &raw);
            }
        }

        tracing::info!("Singleton beans destruction completed");
        Ok(())
    }
}
