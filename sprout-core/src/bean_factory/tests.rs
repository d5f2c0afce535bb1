use super::*;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crate::bean::{BeanDefinitionBuilder, ConstructorParam};
use crate::property::PropertyTable;
use crate::value::Literal;

#[derive(Default)]
struct UserDao {
    url: RwLock<String>,
}

impl UserDao {
    fn url(&self) -> String {
        self.url.read().clone()
    }
}

#[derive(Default)]
struct UserService {
    dao: RwLock<Option<Arc<UserDao>>>,
    name: RwLock<String>,
    age: RwLock<u32>,
}

impl UserService {
    fn dao(&self) -> Option<Arc<UserDao>> {
        self.dao.read().clone()
    }
}

fn user_dao_definition() -> BeanDefinition {
    user_dao_builder().build()
}

fn user_dao_builder() -> BeanDefinitionBuilder<UserDao> {
    BeanDefinition::builder::<UserDao>()
        .default_constructor(UserDao::default)
        .property("url", |dao: &UserDao, url: Arc<String>| *dao.url.write() = (*url).clone())
}

fn user_service_builder() -> BeanDefinitionBuilder<UserService> {
    BeanDefinition::builder::<UserService>()
        .default_constructor(UserService::default)
        .property("dao", |service: &UserService, dao: Arc<UserDao>| *service.dao.write() = Some(dao))
        .property("name", |service: &UserService, name: Arc<String>| *service.name.write() = (*name).clone())
        .property("age", |service: &UserService, age: Arc<u32>| *service.age.write() = *age)
}

trait Repository: Send + Sync {
    fn id(&self) -> &'static str;
}

struct MemoryRepository;
struct JdbcRepository;

impl Repository for MemoryRepository {
    fn id(&self) -> &'static str {
        "memory"
    }
}

impl Repository for JdbcRepository {
    fn id(&self) -> &'static str {
        "jdbc"
    }
}

fn memory_repository() -> BeanDefinitionBuilder<MemoryRepository> {
    BeanDefinition::builder::<MemoryRepository>()
        .default_constructor(|| MemoryRepository)
        .implements::<dyn Repository, _>(|repo: Arc<MemoryRepository>| repo as Arc<dyn Repository>)
}

fn jdbc_repository() -> BeanDefinitionBuilder<JdbcRepository> {
    BeanDefinition::builder::<JdbcRepository>()
        .default_constructor(|| JdbcRepository)
        .implements::<dyn Repository, _>(|repo: Arc<JdbcRepository>| repo as Arc<dyn Repository>)
}

trait Node: Send + Sync {
    fn label(&self) -> String;
    fn peer(&self) -> Option<Arc<dyn Node>>;
}

struct PeerNode {
    label: String,
    peer: RwLock<Option<Arc<dyn Node>>>,
}

impl Node for PeerNode {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn peer(&self) -> Option<Arc<dyn Node>> {
        self.peer.read().clone()
    }
}

fn node_builder(label: &'static str) -> BeanDefinitionBuilder<PeerNode> {
    BeanDefinition::builder::<PeerNode>()
        .default_constructor(move || PeerNode {
            label: label.to_string(),
            peer: RwLock::new(None),
        })
        .implements::<dyn Node, _>(|node: Arc<PeerNode>| node as Arc<dyn Node>)
        .property_dyn::<dyn Node, _, _>("peer", |node: &PeerNode, peer: Arc<dyn Node>| {
            *node.peer.write() = Some(peer)
        })
}

fn node_pair(factory: &DefaultListableBeanFactory, scope: Scope) {
    factory
        .register_bean_definition(
            "a",
            node_builder("a")
                .scope(scope)
                .property_value("peer", Value::reference("b"))
                .build(),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "b",
            node_builder("b")
                .scope(scope)
                .property_value("peer", Value::reference("a"))
                .build(),
        )
        .unwrap();
}

fn same_object<A: ?Sized, B: ?Sized>(a: &Arc<A>, b: &Arc<B>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

#[test]
fn test_singleton_returns_same_instance() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_bean_definition("userDao", user_dao_definition()).unwrap();

    let first = factory.get_bean("userDao").unwrap();
    let second = factory.get_bean("userDao").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(factory.get_singleton_names(), vec!["userDao".to_string()]);
}

#[test]
fn test_prototype_returns_new_instance() {
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition("userDao", user_dao_builder().prototype().build())
        .unwrap();

    let first = factory.get_bean_as::<UserDao>("userDao").unwrap();
    let second = factory.get_bean_as::<UserDao>("userDao").unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(factory.is_prototype("userDao").unwrap());
    assert!(factory.get_singleton_names().is_empty());
}

#[test]
fn test_unknown_name() {
    let factory = DefaultListableBeanFactory::new();
    let err = factory.get_bean("missing").unwrap_err();
    assert!(matches!(err, ContainerError::NameNotFound(name) if name == "missing"));
    assert!(!factory.contains_bean("missing"));
}

#[test]
fn test_alias_resolves_to_same_singleton() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_bean_definition("userDao", user_dao_definition()).unwrap();
    factory.register_alias("userDao", "dao").unwrap();
    factory.register_alias("dao", "repo").unwrap();

    let by_name = factory.get_bean("userDao").unwrap();
    let by_alias = factory.get_bean("repo").unwrap();
    assert!(Arc::ptr_eq(&by_name, &by_alias));
    assert_eq!(factory.canonical_name("repo").unwrap(), "userDao");
    assert_eq!(factory.canonical_name("&dao").unwrap(), "&userDao");

    assert_eq!(factory.get_aliases("userDao"), vec!["dao".to_string(), "repo".to_string()]);
    assert_eq!(factory.get_aliases("dao"), vec!["userDao".to_string(), "repo".to_string()]);

    let err = factory.register_alias("repo", "userDao").unwrap_err();
    assert!(matches!(err, ContainerError::DuplicateDefinition { .. }));
}

#[test]
fn test_explicit_property_values() {
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition(
            "userDao",
            user_dao_builder()
                .property_value("url", Value::literal("jdbc:h2:mem"))
                .build(),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "userService",
            user_service_builder()
                .property_value("name", Value::literal("alice"))
                .property_value("age", Value::literal(30))
                .property_value("dao", Value::reference("userDao"))
                .build(),
        )
        .unwrap();

    let service = factory.get_bean_as::<UserService>("userService").unwrap();
    let dao = factory.get_bean_as::<UserDao>("userDao").unwrap();
    assert_eq!(*service.name.read(), "alice");
    assert_eq!(*service.age.read(), 30);
    assert!(Arc::ptr_eq(&service.dao().unwrap(), &dao));
    assert_eq!(dao.url(), "jdbc:h2:mem");
}

#[test]
fn test_literal_conversion_failure() {
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition(
            "userService",
            user_service_builder()
                .property_value("age", Value::literal("thirty"))
                .build(),
        )
        .unwrap();

    let err = factory.get_bean("userService").unwrap_err();
    assert!(matches!(err, ContainerError::BeanCreation { ref name, .. } if name == "userService"));
    assert!(matches!(
        err.root_cause(),
        ContainerError::TypeMismatch { property, .. } if property == "age"
    ));
    assert!(factory.get_singleton_names().is_empty());
}

#[test]
fn test_unknown_property() {
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition(
            "userDao",
            user_dao_builder()
                .property_value("password", Value::literal("secret"))
                .build(),
        )
        .unwrap();

    let err = factory.get_bean("userDao").unwrap_err();
    assert!(matches!(
        err.root_cause(),
        ContainerError::InvalidProperty { property, .. } if property == "password"
    ));
}

#[derive(Default)]
struct Address {
    city: RwLock<String>,
}

#[derive(Default)]
struct Person {
    address: Address,
    hobbies: RwLock<Vec<String>>,
}

fn person_address(person: &Person) -> &Address {
    &person.address
}

#[test]
fn test_nested_and_indexed_properties() {
    let address = PropertyTable::builder::<Address>()
        .property("city", |address: &Address, city: Arc<String>| {
            *address.city.write() = (*city).clone()
        })
        .build();

    let definition = BeanDefinition::builder::<Person>()
        .default_constructor(Person::default)
        .nested("address", person_address, address)
        .indexed("hobbies", |person: &Person, index: usize, hobby: Arc<String>| {
            let mut hobbies = person.hobbies.write();
            if hobbies.len() <= index {
                hobbies.resize(index + 1, String::new());
            }
            hobbies[index] = (*hobby).clone();
        })
        .property_value("address.city", Value::literal("Hangzhou"))
        .property_value("hobbies[1]", Value::literal("chess"))
        .build();

    let factory = DefaultListableBeanFactory::new();
    factory.register_bean_definition("person", definition).unwrap();

    let person = factory.get_bean_as::<Person>("person").unwrap();
    assert_eq!(*person.address.city.read(), "Hangzhou");
    assert_eq!(*person.hobbies.read(), vec![String::new(), "chess".to_string()]);
}

#[test]
fn test_inner_bean_is_not_registered() {
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition(
            "userService",
            user_service_builder()
                .prototype()
                .property_value(
                    "dao",
                    Value::inner(
                        user_dao_builder()
                            .property_value("url", Value::literal("inner"))
                            .build(),
                    ),
                )
                .build(),
        )
        .unwrap();

    let first = factory.get_bean_as::<UserService>("userService").unwrap();
    let second = factory.get_bean_as::<UserService>("userService").unwrap();
    let first_dao = first.dao().unwrap();
    assert_eq!(first_dao.url(), "inner");
    assert!(!Arc::ptr_eq(&first_dao, &second.dao().unwrap()));
    assert!(!factory.contains_bean("userService#dao"));
    assert!(factory.get_bean_names_for_type(&TypeKey::of::<UserDao>()).is_empty());
}

#[test]
fn test_autowire_by_type() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_bean_definition("userDao", user_dao_definition()).unwrap();
    factory
        .register_bean_definition(
            "userService",
            user_service_builder().autowire(AutowireMode::ByType).build(),
        )
        .unwrap();

    let service = factory.get_bean_as::<UserService>("userService").unwrap();
    let dao = factory.get_bean_as::<UserDao>("userDao").unwrap();
    assert!(Arc::ptr_eq(&service.dao().unwrap(), &dao));
    // 简单类型不参与按类型装配
    assert!(service.name.read().is_empty());
}

#[test]
fn test_autowire_by_type_ambiguity() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_bean_definition("primaryDao", user_dao_definition()).unwrap();
    factory.register_bean_definition("backupDao", user_dao_definition()).unwrap();
    factory
        .register_bean_definition(
            "userService",
            user_service_builder().autowire(AutowireMode::ByType).build(),
        )
        .unwrap();

    let err = factory.get_bean("userService").unwrap_err();
    match err.root_cause() {
        ContainerError::AmbiguousType { candidates, .. } => {
            assert_eq!(candidates, &vec!["primaryDao".to_string(), "backupDao".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }

    factory
        .modify_bean_definition("primaryDao", |definition| definition.primary = true)
        .unwrap();
    let service = factory.get_bean_as::<UserService>("userService").unwrap();
    let primary = factory.get_bean_as::<UserDao>("primaryDao").unwrap();
    assert!(Arc::ptr_eq(&service.dao().unwrap(), &primary));
}

#[test]
fn test_autowire_by_type_prefers_property_name() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_bean_definition("dao", user_dao_definition()).unwrap();
    factory.register_bean_definition("otherDao", user_dao_definition()).unwrap();
    factory
        .register_bean_definition(
            "userService",
            user_service_builder().autowire(AutowireMode::ByType).build(),
        )
        .unwrap();

    let service = factory.get_bean_as::<UserService>("userService").unwrap();
    let dao = factory.get_bean_as::<UserDao>("dao").unwrap();
    assert!(Arc::ptr_eq(&service.dao().unwrap(), &dao));
}

#[test]
fn test_autowire_by_name() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_bean_definition("dao", user_dao_definition()).unwrap();
    factory.register_bean_definition("otherDao", user_dao_definition()).unwrap();
    factory.register_singleton("name", Arc::new("bob".to_string())).unwrap();
    factory
        .register_bean_definition(
            "userService",
            user_service_builder()
                .autowire(AutowireMode::ByName)
                .property_value("name", Value::literal("alice"))
                .build(),
        )
        .unwrap();

    let service = factory.get_bean_as::<UserService>("userService").unwrap();
    let dao = factory.get_bean_as::<UserDao>("dao").unwrap();
    assert!(Arc::ptr_eq(&service.dao().unwrap(), &dao));
    // 显式值优先于自动装配
    assert_eq!(*service.name.read(), "alice");
}

struct DataSource {
    url: String,
    pool_size: usize,
}

fn data_source_builder() -> BeanDefinitionBuilder<DataSource> {
    BeanDefinition::builder::<DataSource>().constructor(
        vec![ConstructorParam::of::<String>("url"), ConstructorParam::of::<usize>("poolSize")],
        |args| {
            Ok(DataSource {
                url: args.value::<String>(0)?,
                pool_size: args.value::<usize>(1)?,
            })
        },
    )
}

#[test]
fn test_explicit_constructor_arguments() {
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition(
            "dataSource",
            data_source_builder()
                .constructor_arg(Value::literal("jdbc:h2:mem"))
                .constructor_arg(Value::literal(8))
                .build(),
        )
        .unwrap();

    let data_source = factory.get_bean_as::<DataSource>("dataSource").unwrap();
    assert_eq!(data_source.url, "jdbc:h2:mem");
    assert_eq!(data_source.pool_size, 8);
}

#[test]
fn test_constructor_argument_errors() {
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition(
            "wrongArity",
            data_source_builder().constructor_arg(Value::literal("jdbc")).build(),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "wrongType",
            data_source_builder()
                .constructor_arg(Value::literal("jdbc"))
                .constructor_arg(Value::literal("eight"))
                .build(),
        )
        .unwrap();

    let err = factory.get_bean("wrongArity").unwrap_err();
    assert!(matches!(err.root_cause(), ContainerError::NoSuitableConstructor { .. }));

    let err = factory.get_bean("wrongType").unwrap_err();
    assert!(matches!(
        err.root_cause(),
        ContainerError::TypeMismatch { property, .. } if property == "poolSize"
    ));
}

struct OrderService {
    dao: Option<Arc<UserDao>>,
}

fn order_service_definition() -> BeanDefinition {
    BeanDefinition::builder::<OrderService>()
        .default_constructor(|| OrderService { dao: None })
        .constructor(vec![ConstructorParam::of::<UserDao>("userDao")], |args| {
            Ok(OrderService {
                dao: Some(args.take::<UserDao>(0)?),
            })
        })
        .autowire(AutowireMode::Constructor)
        .build()
}

#[test]
fn test_constructor_autowiring_prefers_greediest_satisfiable() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_bean_definition("orderService", order_service_definition()).unwrap();
    factory.register_bean_definition("userDao", user_dao_definition()).unwrap();

    let order = factory.get_bean_as::<OrderService>("orderService").unwrap();
    let dao = factory.get_bean_as::<UserDao>("userDao").unwrap();
    assert!(Arc::ptr_eq(order.dao.as_ref().unwrap(), &dao));

    let empty = DefaultListableBeanFactory::new();
    empty.register_bean_definition("orderService", order_service_definition()).unwrap();
    let order = empty.get_bean_as::<OrderService>("orderService").unwrap();
    assert!(order.dao.is_none());
}

#[test]
fn test_circular_singletons_are_resolved() {
    let factory = DefaultListableBeanFactory::new();
    node_pair(&factory, Scope::Singleton);

    let a = factory.get_bean_as_dyn::<dyn Node>("a").unwrap();
    let b = a.peer().unwrap();
    assert_eq!(a.label(), "a");
    assert_eq!(b.label(), "b");
    assert!(same_object(&b.peer().unwrap(), &a));
    assert!(same_object(&factory.get_bean_as::<PeerNode>("b").unwrap(), &b));
}

#[test]
fn test_circular_singletons_rejected_when_disallowed() {
    let config = FactoryConfig::default().allow_circular_references(false);
    let factory = DefaultListableBeanFactory::with_config(&config);
    node_pair(&factory, Scope::Singleton);

    let err = factory.get_bean("a").unwrap_err();
    assert!(err.is_circular_reference());
    assert!(factory.get_singleton_names().is_empty());
}

#[test]
fn test_circular_prototypes_are_rejected() {
    let factory = DefaultListableBeanFactory::new();
    node_pair(&factory, Scope::Prototype);

    let err = factory.get_bean("a").unwrap_err();
    assert!(err.is_circular_reference());

    // 失败后检测状态被清理，可以再次请求
    let err = factory.get_bean("a").unwrap_err();
    assert!(err.is_circular_reference());
}

struct Left {
    _right: Arc<Right>,
}

struct Right {
    _left: Arc<Left>,
}

#[test]
fn test_constructor_cycle_is_rejected() {
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition(
            "left",
            BeanDefinition::builder::<Left>()
                .constructor(vec![ConstructorParam::of::<Right>("right")], |args| {
                    Ok(Left { _right: args.take(0)? })
                })
                .autowire(AutowireMode::Constructor)
                .build(),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "right",
            BeanDefinition::builder::<Right>()
                .constructor(vec![ConstructorParam::of::<Left>("left")], |args| {
                    Ok(Right { _left: args.take(0)? })
                })
                .autowire(AutowireMode::Constructor)
                .build(),
        )
        .unwrap();

    let err = factory.get_bean("left").unwrap_err();
    assert!(err.is_circular_reference());
}

struct Traced {
    inner: Arc<dyn Node>,
}

impl Node for Traced {
    fn label(&self) -> String {
        format!("traced({})", self.inner.label())
    }

    fn peer(&self) -> Option<Arc<dyn Node>> {
        self.inner.peer()
    }
}

/// 把 PeerNode 包装为 Traced，`consistent` 时提前引用也返回同一个包装
struct TracingProcessor {
    consistent: bool,
    early: Mutex<HashSet<String>>,
}

impl TracingProcessor {
    fn new(consistent: bool) -> Self {
        Self {
            consistent,
            early: Mutex::new(HashSet::new()),
        }
    }

    fn wrap(bean: &Object) -> Option<Object> {
        let node = Arc::clone(bean).downcast::<PeerNode>().ok()?;
        let traced: Arc<dyn Node> = Arc::new(Traced { inner: node });
        Some(Arc::new(traced))
    }
}

impl BeanPostProcessor for TracingProcessor {
    fn early_bean_reference(&self, bean: Object, bean_name: &str) -> ContainerResult<Object> {
        if !self.consistent {
            return Ok(bean);
        }
        self.early.lock().insert(bean_name.to_string());
        Ok(Self::wrap(&bean).unwrap_or(bean))
    }

    fn post_process_after_initialization(&self, bean: Object, bean_name: &str) -> ContainerResult<Object> {
        if self.early.lock().contains(bean_name) {
            return Ok(bean);
        }
        Ok(Self::wrap(&bean).unwrap_or(bean))
    }
}

#[test]
fn test_wrapped_circular_singletons_share_early_reference() {
    let factory = DefaultListableBeanFactory::new();
    factory.add_bean_post_processor(Arc::new(TracingProcessor::new(true)));
    node_pair(&factory, Scope::Singleton);

    let a = factory.get_bean_as_dyn::<dyn Node>("a").unwrap();
    assert_eq!(a.label(), "traced(a)");
    let b = a.peer().unwrap();
    assert_eq!(b.label(), "traced(b)");
    assert!(same_object(&b.peer().unwrap(), &a));
}

#[test]
fn test_wrapped_circular_singleton_without_early_wrapping_fails() {
    let factory = DefaultListableBeanFactory::new();
    factory.add_bean_post_processor(Arc::new(TracingProcessor::new(false)));
    node_pair(&factory, Scope::Singleton);

    let err = factory.get_bean("a").unwrap_err();
    assert!(err.is_circular_reference());
    // b 持有 a 的原始对象，随 a 一起被移出缓存
    assert!(factory.get_singleton_names().is_empty());
}

#[test]
fn test_failed_singleton_in_cycle_discards_dependents() {
    let factory = DefaultListableBeanFactory::new();
    let opened = Arc::new(AtomicUsize::new(0));
    let closed = Arc::new(AtomicUsize::new(0));

    let attempts = Arc::clone(&opened);
    factory
        .register_bean_definition(
            "a",
            node_builder("a")
                .property_value("peer", Value::reference("b"))
                .init_method("open", move |_: &PeerNode| -> anyhow::Result<()> {
                    if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                        anyhow::bail!("connection refused");
                    }
                    Ok(())
                })
                .build(),
        )
        .unwrap();
    let destroyed = Arc::clone(&closed);
    factory
        .register_bean_definition(
            "b",
            node_builder("b")
                .property_value("peer", Value::reference("a"))
                .destroy_method("close", move |_: &PeerNode| {
                    destroyed.fetch_add(1, Ordering::SeqCst);
                })
                .build(),
        )
        .unwrap();

    let err = factory.get_bean("a").unwrap_err();
    assert!(matches!(err, ContainerError::BeanCreation { .. }));
    assert!(factory.get_singleton_names().is_empty());
    assert_eq!(closed.load(Ordering::SeqCst), 1);

    // 重试得到一致的对象图
    let a = factory.get_bean_as_dyn::<dyn Node>("a").unwrap();
    let b = factory.get_bean_as_dyn::<dyn Node>("b").unwrap();
    assert!(same_object(&a.peer().unwrap(), &b));
    assert!(same_object(&b.peer().unwrap(), &a));
    assert_eq!(opened.load(Ordering::SeqCst), 2);
}

struct Connection {
    id: usize,
}

struct ConnectionFactory {
    singleton: bool,
    produced: AtomicUsize,
}

impl FactoryBean for ConnectionFactory {
    fn get_object(&self) -> ContainerResult<Object> {
        let id = self.produced.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(Connection { id }))
    }

    fn object_type(&self) -> Option<BeanType> {
        Some(BeanType::of::<Connection>())
    }

    fn is_singleton(&self) -> bool {
        self.singleton
    }
}

fn connection_factory(singleton: bool) -> BeanDefinition {
    BeanDefinition::builder::<ConnectionFactory>()
        .default_constructor(move || ConnectionFactory {
            singleton,
            produced: AtomicUsize::new(0),
        })
        .factory_bean()
        .build()
}

#[test]
fn test_factory_bean_exposes_product() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_bean_definition("connection", connection_factory(true)).unwrap();

    let first = factory.get_bean_as::<Connection>("connection").unwrap();
    let second = factory.get_bean_as::<Connection>("connection").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.id, 0);

    let producer = factory.get_bean_as::<ConnectionFactory>("&connection").unwrap();
    assert_eq!(producer.produced.load(Ordering::SeqCst), 1);
    assert!(factory.is_singleton("connection").unwrap());

    assert_eq!(
        factory.get_bean_names_for_type(&TypeKey::of::<Connection>()),
        vec!["connection".to_string()]
    );
    assert_eq!(
        factory.get_bean_names_for_type(&TypeKey::of::<ConnectionFactory>()),
        vec!["&connection".to_string()]
    );
    let by_type = factory.get_bean_by_type::<Connection>().unwrap();
    assert!(Arc::ptr_eq(&by_type, &first));
}

#[test]
fn test_non_singleton_factory_bean() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_bean_definition("connection", connection_factory(false)).unwrap();

    let first = factory.get_bean_as::<Connection>("connection").unwrap();
    let second = factory.get_bean_as::<Connection>("connection").unwrap();
    assert_eq!((first.id, second.id), (0, 1));
    assert!(factory.is_prototype("connection").unwrap());
    assert!(factory.is_singleton("&connection").unwrap());
}

#[test]
fn test_prototype_factory_bean_products_are_not_cached() {
    let factory = DefaultListableBeanFactory::new();
    let mut definition = connection_factory(true);
    definition.scope = Scope::Prototype;
    factory.register_bean_definition("connection", definition).unwrap();

    // 每次请求都会创建新的工厂，产出对象不能按名称复用
    let first = factory.get_bean_as::<Connection>("connection").unwrap();
    let second = factory.get_bean_as::<Connection>("connection").unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(factory.is_prototype("connection").unwrap());
}

#[test]
fn test_factory_prefix_on_plain_bean() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_bean_definition("userDao", user_dao_definition()).unwrap();

    let err = factory.get_bean("&userDao").unwrap_err();
    assert!(matches!(err, ContainerError::NotAFactory(name) if name == "userDao"));
}

#[test]
fn test_registered_factory_singleton() {
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_factory_singleton(
            "connection",
            Arc::new(ConnectionFactory {
                singleton: true,
                produced: AtomicUsize::new(5),
            }),
        )
        .unwrap();

    let connection = factory.get_bean_as::<Connection>("connection").unwrap();
    assert_eq!(connection.id, 5);
    assert!(factory.get_bean_as::<ConnectionFactory>("&connection").is_ok());
}

#[test]
fn test_get_bean_by_type() {
    let factory = DefaultListableBeanFactory::new();
    let err = factory.get_bean_by_type_dyn::<dyn Repository>().err().unwrap();
    assert!(matches!(err, ContainerError::NoSuchType(_)));

    factory.register_bean_definition("memory", memory_repository().build()).unwrap();
    assert_eq!(factory.get_bean_by_type_dyn::<dyn Repository>().unwrap().id(), "memory");

    factory.register_bean_definition("jdbc", jdbc_repository().build()).unwrap();
    let err = factory.get_bean_by_type_dyn::<dyn Repository>().err().unwrap();
    assert!(matches!(err, ContainerError::AmbiguousType { .. }));

    factory
        .modify_bean_definition("jdbc", |definition| definition.primary = true)
        .unwrap();
    assert_eq!(factory.get_bean_by_type_dyn::<dyn Repository>().unwrap().id(), "jdbc");
}

#[test]
fn test_multiple_primary_candidates_are_ambiguous() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_bean_definition("memory", memory_repository().primary().build()).unwrap();
    factory.register_bean_definition("jdbc", jdbc_repository().primary().build()).unwrap();

    let err = factory.get_bean_by_type_dyn::<dyn Repository>().err().unwrap();
    assert!(matches!(err, ContainerError::AmbiguousType { candidates, .. } if candidates.len() == 2));
}

struct RepositoryPriority;

impl DependencyComparator for RepositoryPriority {
    fn priority(&self, bean_name: &str, _bean: &Object) -> Option<i32> {
        match bean_name {
            "jdbc" => Some(1),
            "memory" => Some(10),
            _ => None,
        }
    }
}

#[test]
fn test_dependency_comparator_breaks_ties() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_bean_definition("memory", memory_repository().build()).unwrap();
    factory.register_bean_definition("jdbc", jdbc_repository().build()).unwrap();
    factory.set_dependency_comparator(Arc::new(RepositoryPriority));

    assert_eq!(factory.get_bean_by_type_dyn::<dyn Repository>().unwrap().id(), "jdbc");
}

#[test]
fn test_registered_singletons() {
    let factory = DefaultListableBeanFactory::new();
    let dao = Arc::new(UserDao::default());
    factory.register_singleton("userDao", Arc::clone(&dao)).unwrap();
    factory
        .register_singleton_dyn::<dyn Repository>("repository", Arc::new(MemoryRepository))
        .unwrap();

    assert!(Arc::ptr_eq(&factory.get_bean_as::<UserDao>("userDao").unwrap(), &dao));
    assert!(Arc::ptr_eq(&factory.get_bean_by_type::<UserDao>().unwrap(), &dao));
    assert_eq!(factory.get_bean_by_type_dyn::<dyn Repository>().unwrap().id(), "memory");

    let err = factory
        .register_bean_definition("userDao", user_dao_definition())
        .unwrap_err();
    assert!(matches!(err, ContainerError::DuplicateDefinition { .. }));
    assert_eq!(
        factory.get_bean_names(),
        vec!["userDao".to_string(), "repository".to_string()]
    );
}

struct DaoToUrl;

impl TypeConverter for DaoToUrl {
    fn convert(&self, value: &Object, required: &TypeKey) -> Option<BeanView> {
        if !required.is::<String>() {
            return None;
        }
        (**value)
            .downcast_ref::<UserDao>()
            .map(|dao| BeanView::owned(dao.url()))
    }
}

#[test]
fn test_type_converter_on_typed_lookup() {
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition(
            "userDao",
            user_dao_builder()
                .property_value("url", Value::literal("jdbc:mysql"))
                .build(),
        )
        .unwrap();

    let err = factory.get_bean_as::<String>("userDao").unwrap_err();
    assert!(matches!(err, ContainerError::BeanNotOfRequiredType { .. }));

    factory.set_type_converter(Arc::new(DaoToUrl));
    assert_eq!(*factory.get_bean_as::<String>("userDao").unwrap(), "jdbc:mysql");
}

#[test]
fn test_init_and_destroy_methods() {
    let events = Arc::new(Mutex::new(Vec::new()));

    let factory = DefaultListableBeanFactory::new();
    for name in ["first", "second"] {
        let init_events = Arc::clone(&events);
        let destroy_events = Arc::clone(&events);
        let mut builder = user_dao_builder()
            .init_method("init", move |dao: &UserDao| {
                init_events.lock().push(format!("init:{}", dao.url()));
            })
            .destroy_method("close", move |dao: &UserDao| {
                destroy_events.lock().push(format!("destroy:{}", dao.url()));
            })
            .property_value("url", Value::literal(name));
        if name == "second" {
            builder = builder.lazy_init();
        }
        factory.register_bean_definition(name, builder.build()).unwrap();
    }

    factory.preinstantiate_singletons().unwrap();
    factory.get_bean("second").unwrap();
    factory.destroy_singletons().unwrap();

    assert_eq!(
        *events.lock(),
        vec![
            "init:first".to_string(),
            "init:second".to_string(),
            "destroy:second".to_string(),
            "destroy:first".to_string(),
        ]
    );
    assert!(factory.get_singleton_names().is_empty());
}

#[test]
fn test_destroy_failure_does_not_stop_others() {
    let closed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&closed);

    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition(
            "good",
            user_dao_builder()
                .destroy_method("close", move |_: &UserDao| {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .build(),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "bad",
            user_dao_builder()
                .destroy_method("close", |_: &UserDao| -> anyhow::Result<()> {
                    Err(anyhow::anyhow!("connection already closed"))
                })
                .build(),
        )
        .unwrap();

    factory.preinstantiate_singletons().unwrap();
    factory.destroy_singletons().unwrap();
    assert_eq!(closed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_missing_init_method() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_bean_definition("userDao", user_dao_definition()).unwrap();
    factory
        .modify_bean_definition("userDao", |definition| {
            definition.init_method_name = Some("start".to_string())
        })
        .unwrap();

    let err = factory.get_bean("userDao").unwrap_err();
    assert!(matches!(err.root_cause(), ContainerError::Other(_)));
}

#[test]
fn test_lazy_init_and_preinstantiation() {
    let created = Arc::new(AtomicUsize::new(0));
    let eager = Arc::clone(&created);
    let lazy = Arc::clone(&created);

    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition(
            "eager",
            BeanDefinition::new(move || {
                eager.fetch_add(1, Ordering::SeqCst);
                UserDao::default()
            }),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "lazy",
            BeanDefinition::builder::<UserDao>()
                .default_constructor(move || {
                    lazy.fetch_add(10, Ordering::SeqCst);
                    UserDao::default()
                })
                .lazy_init()
                .build(),
        )
        .unwrap();
    factory.register_bean_definition("connection", connection_factory(true)).unwrap();

    factory.preinstantiate_singletons().unwrap();
    assert_eq!(created.load(Ordering::SeqCst), 1);

    let producer = factory.get_bean_as::<ConnectionFactory>("&connection").unwrap();
    assert_eq!(producer.produced.load(Ordering::SeqCst), 0);
}

#[test]
fn test_concurrent_singleton_is_created_once() {
    let created = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&created);

    let factory = Arc::new(DefaultListableBeanFactory::new());
    factory
        .register_bean_definition(
            "slow",
            BeanDefinition::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(50));
                UserDao::default()
            }),
        )
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let factory = Arc::clone(&factory);
            thread::spawn(move || factory.get_bean("slow").unwrap())
        })
        .collect();
    let beans: Vec<Object> = handles.into_iter().map(|handle| handle.join().unwrap()).collect();

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert!(beans.iter().all(|bean| Arc::ptr_eq(bean, &beans[0])));
}

#[test]
fn test_definition_overriding() {
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition(
            "userDao",
            user_dao_builder().property_value("url", Value::literal("old")).build(),
        )
        .unwrap();
    assert_eq!(factory.get_bean_as::<UserDao>("userDao").unwrap().url(), "old");

    let err = factory
        .register_bean_definition("userDao", user_dao_definition())
        .unwrap_err();
    assert!(matches!(err, ContainerError::DuplicateDefinition { .. }));

    factory.set_allow_bean_definition_overriding(true);
    factory
        .register_bean_definition(
            "userDao",
            user_dao_builder().property_value("url", Value::literal("new")).build(),
        )
        .unwrap();
    assert_eq!(factory.get_bean_as::<UserDao>("userDao").unwrap().url(), "new");
    assert_eq!(factory.get_bean_definition_count(), 1);
}

#[test]
fn test_modify_and_freeze() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_bean_definition("userDao", user_dao_definition()).unwrap();
    factory
        .modify_bean_definition("userDao", |definition| {
            definition.add_property_value("url", Value::literal("modified"))
        })
        .unwrap();
    assert!(factory.get_bean_definition("userDao").unwrap().has_property_value("url"));

    assert_eq!(factory.get_bean_as::<UserDao>("userDao").unwrap().url(), "modified");
    let err = factory
        .modify_bean_definition("userDao", |definition| definition.lazy_init = true)
        .unwrap_err();
    assert!(matches!(err, ContainerError::ConfigurationFrozen(_)));

    factory.freeze_configuration();
    assert!(factory.is_configuration_frozen());
    let err = factory
        .register_bean_definition("another", user_dao_definition())
        .unwrap_err();
    assert!(matches!(err, ContainerError::ConfigurationFrozen(_)));
}

#[test]
fn test_remove_bean_definition() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_bean_definition("userDao", user_dao_definition()).unwrap();
    factory.register_alias("userDao", "dao").unwrap();
    factory.get_bean("userDao").unwrap();

    factory.remove_bean_definition("userDao").unwrap();
    assert!(!factory.contains_bean("userDao"));
    assert!(!factory.contains_bean("dao"));
    assert!(factory.get_singleton_names().is_empty());
}

#[test]
fn test_register_bean_generates_names() {
    let factory = DefaultListableBeanFactory::new();
    assert_eq!(factory.register_bean(user_dao_definition()).unwrap(), "userDao");
    assert_eq!(factory.register_bean(user_dao_definition()).unwrap(), "userDao#0");
    assert_eq!(factory.get_bean_definition_count(), 2);
}

/// 记录每个钩子的调用
struct RecordingProcessor {
    tag: &'static str,
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingProcessor {
    fn record(&self, hook: &str, bean_name: &str) {
        self.calls.lock().push(format!("{}:{}:{}", self.tag, hook, bean_name));
    }
}

impl BeanPostProcessor for RecordingProcessor {
    fn post_process_before_instantiation(
        &self,
        _bean_type: &BeanType,
        bean_name: &str,
    ) -> ContainerResult<Option<Object>> {
        self.record("before_instantiation", bean_name);
        Ok(None)
    }

    fn post_process_after_instantiation(&self, _bean: &Object, bean_name: &str) -> ContainerResult<bool> {
        self.record("after_instantiation", bean_name);
        Ok(true)
    }

    fn post_process_properties(
        &self,
        values: PropertyValues,
        _bean: &Object,
        bean_name: &str,
    ) -> ContainerResult<PropertyValues> {
        self.record("properties", bean_name);
        Ok(values)
    }

    fn post_process_before_initialization(&self, bean: Object, bean_name: &str) -> ContainerResult<Object> {
        self.record("before_initialization", bean_name);
        Ok(bean)
    }

    fn post_process_after_initialization(&self, bean: Object, bean_name: &str) -> ContainerResult<Object> {
        self.record("after_initialization", bean_name);
        Ok(bean)
    }

    fn name(&self) -> &str {
        self.tag
    }
}

#[test]
fn test_post_processor_hooks_run_in_order() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let factory = DefaultListableBeanFactory::new();
    for tag in ["first", "second"] {
        factory.add_bean_post_processor(Arc::new(RecordingProcessor {
            tag,
            calls: Arc::clone(&calls),
        }));
    }
    let init_calls = Arc::clone(&calls);
    factory
        .register_bean_definition(
            "userDao",
            user_dao_builder()
                .init_method("init", move |_: &UserDao| init_calls.lock().push("init".to_string()))
                .build(),
        )
        .unwrap();

    factory.get_bean("userDao").unwrap();

    let expected: Vec<String> = [
        "first:before_instantiation:userDao",
        "second:before_instantiation:userDao",
        "first:after_instantiation:userDao",
        "second:after_instantiation:userDao",
        "first:properties:userDao",
        "second:properties:userDao",
        "first:before_initialization:userDao",
        "second:before_initialization:userDao",
        "init",
        "first:after_initialization:userDao",
        "second:after_initialization:userDao",
    ]
    .iter()
    .map(|call| call.to_string())
    .collect();
    assert_eq!(*calls.lock(), expected);
    assert_eq!(factory.get_bean_post_processors().len(), 2);
}

struct Substitute {
    after_initialization: AtomicUsize,
}

impl BeanPostProcessor for Substitute {
    fn post_process_before_instantiation(
        &self,
        _bean_type: &BeanType,
        bean_name: &str,
    ) -> ContainerResult<Option<Object>> {
        if bean_name != "userDao" {
            return Ok(None);
        }
        let dao = UserDao::default();
        *dao.url.write() = "substitute".to_string();
        Ok(Some(Arc::new(dao)))
    }

    fn post_process_after_initialization(&self, bean: Object, _bean_name: &str) -> ContainerResult<Object> {
        self.after_initialization.fetch_add(1, Ordering::SeqCst);
        Ok(bean)
    }
}

#[test]
fn test_before_instantiation_short_circuits() {
    let factory = DefaultListableBeanFactory::new();
    let substitute = Arc::new(Substitute {
        after_initialization: AtomicUsize::new(0),
    });
    factory.add_bean_post_processor(substitute.clone());
    factory
        .register_bean_definition(
            "userDao",
            BeanDefinition::builder::<UserDao>()
                .default_constructor(|| -> UserDao { panic!("constructor must not run") })
                .build(),
        )
        .unwrap();

    let dao = factory.get_bean_as::<UserDao>("userDao").unwrap();
    assert_eq!(dao.url(), "substitute");
    assert_eq!(substitute.after_initialization.load(Ordering::SeqCst), 1);
}

struct SkipPopulation;

impl BeanPostProcessor for SkipPopulation {
    fn post_process_after_instantiation(&self, _bean: &Object, bean_name: &str) -> ContainerResult<bool> {
        Ok(bean_name != "userService")
    }
}

struct DefaultName;

impl BeanPostProcessor for DefaultName {
    fn post_process_properties(
        &self,
        mut values: PropertyValues,
        _bean: &Object,
        _bean_name: &str,
    ) -> ContainerResult<PropertyValues> {
        if !values.contains("name") {
            values.add(PropertyValue::new("name", Arc::new(Literal::from("anonymous"))));
        }
        Ok(values)
    }
}

#[test]
fn test_property_hooks() {
    let factory = DefaultListableBeanFactory::new();
    factory.add_bean_post_processor(Arc::new(DefaultName));
    factory
        .register_bean_definition("userService", user_service_builder().build())
        .unwrap();
    let service = factory.get_bean_as::<UserService>("userService").unwrap();
    assert_eq!(*service.name.read(), "anonymous");

    let skipping = DefaultListableBeanFactory::new();
    skipping.add_bean_post_processor(Arc::new(SkipPopulation));
    skipping.add_bean_post_processor(Arc::new(DefaultName));
    skipping
        .register_bean_definition(
            "userService",
            user_service_builder()
                .property_value("age", Value::literal(7))
                .build(),
        )
        .unwrap();
    let service = skipping.get_bean_as::<UserService>("userService").unwrap();
    assert!(service.name.read().is_empty());
    assert_eq!(*service.age.read(), 0);
}

#[test]
fn test_bean_factory_as_trait_object() {
    let factory = Arc::new(DefaultListableBeanFactory::new());
    factory.register_bean_definition("memory", memory_repository().build()).unwrap();

    let shared: Arc<dyn BeanFactory> = factory;
    let repository = shared.get_bean_as_dyn::<dyn Repository>("memory").unwrap();
    assert_eq!(repository.id(), "memory");
    assert!(shared.is_singleton("memory").unwrap());
}
