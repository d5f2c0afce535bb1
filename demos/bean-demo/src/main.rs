use parking_lot::RwLock;
use sprout_aop::prelude::*;
use sprout_core::prelude::*;
use std::sync::Arc;
use std::time::Duration;

const CONFIG: &str = r#"
allow_bean_definition_overriding = false
allow_circular_references = true

[logging]
level = "info"
format = "compact"
"#;

// ==================== 数据访问 ====================

#[derive(Debug, Default)]
struct UserDao {
    url: RwLock<String>,
    users: RwLock<Vec<String>>,
}

impl UserDao {
    fn set_url(&self, url: Arc<String>) {
        *self.url.write() = url.to_string();
    }

    fn connect(&self) {
        tracing::info!("UserDao connected to {}", self.url.read());
        self.users.write().extend(["alice".to_string(), "bob".to_string()]);
    }

    fn close(&self) {
        tracing::info!("UserDao closing connection to {}", self.url.read());
    }

    fn find(&self, id: usize) -> Option<String> {
        self.users.read().get(id).cloned()
    }
}

// ==================== 业务服务 ====================

trait IUserService: Send + Sync {
    fn find_user(&self, id: usize) -> anyhow::Result<String>;
}

#[derive(Default)]
struct UserService {
    dao: RwLock<Option<Arc<UserDao>>>,
    greeting: RwLock<String>,
}

impl UserService {
    fn set_dao(&self, dao: Arc<UserDao>) {
        *self.dao.write() = Some(dao);
    }

    fn set_greeting(&self, greeting: Arc<String>) {
        *self.greeting.write() = greeting.to_string();
    }
}

impl IUserService for UserService {
    fn find_user(&self, id: usize) -> anyhow::Result<String> {
        let dao = self.dao.read().clone().context("UserDao has not been injected")?;
        let user = dao.find(id).with_context(|| format!("no user with id {id}"))?;
        Ok(format!("{}, {}", self.greeting.read(), user))
    }
}

/// 手写代理：每个接口方法都经过拦截器链
struct UserServiceProxy(AopProxy<UserService>);

impl IUserService for UserServiceProxy {
    fn find_user(&self, id: usize) -> anyhow::Result<String> {
        self.0.call(
            Method::new("UserService", "find_user"),
            Arguments::new().with(id),
            |target, args| target.find_user(args.take(0)?),
        )
    }
}

// ==================== 循环依赖 ====================

#[derive(Default)]
struct Husband {
    wife: RwLock<Option<Arc<Wife>>>,
}

#[derive(Default)]
struct Wife {
    husband: RwLock<Option<Arc<Husband>>>,
}

fn register_definitions(factory: &Arc<DefaultListableBeanFactory>) -> ContainerResult<()> {
    factory.register_bean_definition(
        "userDao",
        BeanDefinition::builder::<UserDao>()
            .default_constructor(UserDao::default)
            .property("url", |dao: &UserDao, url: Arc<String>| dao.set_url(url))
            .property_value("url", Value::literal("memory://users"))
            .init_method("connect", UserDao::connect)
            .destroy_method("close", UserDao::close)
            .build(),
    )?;

    factory.register_bean_definition(
        "userServiceTarget",
        BeanDefinition::builder::<UserService>()
            .default_constructor(UserService::default)
            .property("dao", |service: &UserService, dao: Arc<UserDao>| service.set_dao(dao))
            .property("greeting", |service: &UserService, greeting: Arc<String>| {
                service.set_greeting(greeting)
            })
            .property_value("greeting", Value::literal("Hello"))
            .autowire(AutowireMode::ByType)
            .build(),
    )?;
    factory.register_alias("userServiceTarget", "userServiceImpl")?;

    let proxy = ProxyFactoryBean::<UserService, dyn IUserService>::new(factory, "userServiceTarget", |proxy| {
        Arc::new(UserServiceProxy(proxy)) as Arc<dyn IUserService>
    })
    .add_advice(Advice::around(LoggingInterceptor::new().with_args()))
    .add_advice(Advice::around(PerformanceInterceptor::new(Duration::from_millis(50))))
    .add_advice(Advice::after_throwing(ExceptionLoggingAdvice));
    factory.register_factory_singleton("userService", Arc::new(proxy))?;

    factory.register_bean_definition(
        "husband",
        BeanDefinition::builder::<Husband>()
            .default_constructor(Husband::default)
            .property("wife", |husband: &Husband, wife: Arc<Wife>| {
                *husband.wife.write() = Some(wife);
            })
            .property_value("wife", Value::reference("wife"))
            .build(),
    )?;
    factory.register_bean_definition(
        "wife",
        BeanDefinition::builder::<Wife>()
            .default_constructor(Wife::default)
            .property("husband", |wife: &Wife, husband: Arc<Husband>| {
                *wife.husband.write() = Some(husband);
            })
            .property_value("husband", Value::reference("husband"))
            .build(),
    )?;

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let config = FactoryConfig::from_toml_str(CONFIG)?;
    config.init_logging()?;

    tracing::info!("Starting bean demo");
    let factory = Arc::new(DefaultListableBeanFactory::with_config(&config));
    register_definitions(&factory)?;

    factory.preinstantiate_singletons()?;
    tracing::info!("Singletons: {:?}", factory.get_singleton_names());

    // 通过代理调用
    let service = factory.get_bean_as_dyn::<dyn IUserService>("userService")?;
    tracing::info!("{}", service.find_user(0)?);
    if let Err(e) = service.find_user(7) {
        tracing::info!("Lookup failed as expected: {:#}", e);
    }

    // 别名与按类型查找
    let target = factory.get_bean_as::<UserService>("userServiceImpl")?;
    let by_type = factory.get_bean_by_type::<UserService>()?;
    tracing::info!("Alias resolves to the same target: {}", Arc::ptr_eq(&target, &by_type));
    tracing::info!("Aliases of userServiceTarget: {:?}", factory.get_aliases("userServiceTarget"));

    // 循环依赖
    let husband = factory.get_bean_as::<Husband>("husband")?;
    let wife = husband.wife.read().clone().context("wife was not injected")?;
    let back = wife.husband.read().clone().context("husband was not injected")?;
    tracing::info!("Circular reference resolved: {}", Arc::ptr_eq(&husband, &back));

    factory.destroy_singletons()?;
    tracing::info!("Bean demo finished");
    Ok(())
}
