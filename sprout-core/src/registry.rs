//! Bean 注册表
//!
//! 保存 Bean 定义、直接注册的单例和别名，并维护以下约束：
//! - 一个名称最多对应一个定义或一个直接单例，不会同时存在
//! - 别名不会与已有的 Bean 名称相同
//! - 沿别名链一定能到达一个已绑定的名称，且不会成环
//!
//! 定义和直接单例都按注册顺序保存，按类型查找时按注册顺序遍历。

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::bean::BeanDefinition;
use crate::error::{ContainerError, ContainerResult};
use crate::types::{BeanType, Object};

/// 直接注册的单例对象
#[derive(Clone)]
pub struct RegisteredSingleton {
    pub object: Object,
    pub bean_type: BeanType,
}

#[derive(Default)]
pub struct BeanRegistry {
    definitions: RwLock<HashMap<String, Arc<BeanDefinition>>>,
    definition_names: RwLock<Vec<String>>,
    singletons: RwLock<HashMap<String, RegisteredSingleton>>,
    singleton_names: RwLock<Vec<String>>,
    aliases: RwLock<HashMap<String, String>>,

    /// 注册操作串行化，保证检查和写入之间没有其他注册插入
    registration: Mutex<()>,

    allow_overriding: RwLock<bool>,
    configuration_frozen: RwLock<bool>,
}

impl BeanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_allow_overriding(&self, allow: bool) {
        *self.allow_overriding.write() = allow;
    }

    pub fn is_allow_overriding(&self) -> bool {
        *self.allow_overriding.read()
    }

    pub fn freeze(&self) {
        *self.configuration_frozen.write() = true;
    }

    pub fn is_frozen(&self) -> bool {
        *self.configuration_frozen.read()
    }

    /// 注册 Bean 定义
    ///
    /// 返回被替换的旧定义（仅在允许覆盖时可能存在）
    pub fn register_definition(
        &self,
        name: &str,
        definition: BeanDefinition,
    ) -> ContainerResult<Option<Arc<BeanDefinition>>> {
        if name.is_empty() {
            return Err(ContainerError::DuplicateDefinition {
                name: name.to_string(),
                reason: "bean name must not be empty".to_string(),
            });
        }

        let _registration = self.registration.lock();

        if self.singletons.read().contains_key(name) {
            return Err(duplicate(name, "a singleton object is already registered under this name"));
        }
        if self.aliases.read().contains_key(name) {
            return Err(duplicate(name, "the name is already in use as an alias"));
        }

        let existing = self.definitions.read().get(name).cloned();
        if existing.is_some() && !self.is_allow_overriding() {
            return Err(duplicate(
                name,
                "a bean definition is already registered and overriding is not allowed",
            ));
        }

        self.definitions
            .write()
            .insert(name.to_string(), Arc::new(definition));

        match &existing {
            Some(_) => {
                tracing::info!("Overriding bean definition for bean '{}'", name);
            }
            None => {
                self.definition_names.write().push(name.to_string());
                tracing::debug!("Registered bean definition '{}'", name);
            }
        }

        Ok(existing)
    }

    /// 注册一个现成的单例对象
    pub fn register_singleton(&self, name: &str, singleton: RegisteredSingleton) -> ContainerResult<()> {
        let _registration = self.registration.lock();

        if self.singletons.read().contains_key(name) {
            return Err(duplicate(name, "a singleton object is already registered under this name"));
        }
        if self.definitions.read().contains_key(name) {
            return Err(duplicate(name, "a bean definition is already registered under this name"));
        }
        if self.aliases.read().contains_key(name) {
            return Err(duplicate(name, "the name is already in use as an alias"));
        }

        self.singletons.write().insert(name.to_string(), singleton);
        self.singleton_names.write().push(name.to_string());
        tracing::debug!("Registered singleton object '{}'", name);
        Ok(())
    }

    /// 注册别名
    pub fn register_alias(&self, name: &str, alias: &str) -> ContainerResult<()> {
        let _registration = self.registration.lock();

        if !self.is_bound(name) {
            return Err(ContainerError::NameNotFound(name.to_string()));
        }
        if alias == name {
            self.aliases.write().remove(alias);
            return Ok(());
        }
        if self.is_bean_name(alias) {
            return Err(duplicate(alias, "the alias is already used as a bean name"));
        }
        if self.resolves_through(name, alias) {
            return Err(ContainerError::AliasCycle {
                name: name.to_string(),
                alias: alias.to_string(),
            });
        }

        let existing = self.aliases.read().get(alias).cloned();
        match existing {
            Some(target) if target == name => return Ok(()),
            Some(target) if !self.is_allow_overriding() => {
                return Err(duplicate(
                    alias,
                    &format!("the alias is already registered for bean '{target}'"),
                ));
            }
            _ => {}
        }

        self.aliases.write().insert(alias.to_string(), name.to_string());
        tracing::debug!("Registered alias '{}' for bean '{}'", alias, name);
        Ok(())
    }

    pub fn remove_alias(&self, alias: &str) -> ContainerResult<()> {
        self.aliases
            .write()
            .remove(alias)
            .map(|_| ())
            .ok_or_else(|| ContainerError::NameNotFound(alias.to_string()))
    }

    /// 从 `name` 出发沿别名链是否会经过 `alias`
    fn resolves_through(&self, name: &str, alias: &str) -> bool {
        let aliases = self.aliases.read();
        let mut current = name;
        for _ in 0..=aliases.len() {
            match aliases.get(current) {
                Some(next) if next == alias => return true,
                Some(next) => current = next,
                None => return false,
            }
        }
        true
    }

    /// 把名称或别名解析为规范名称
    pub fn canonical_name(&self, name: &str) -> ContainerResult<String> {
        let aliases = self.aliases.read();
        let mut current = name;
        let mut hops = 0;
        while let Some(next) = aliases.get(current) {
            hops += 1;
            if hops > aliases.len() {
                return Err(ContainerError::AliasCycle {
                    name: name.to_string(),
                    alias: current.to_string(),
                });
            }
            current = next;
        }
        let resolved = current.to_string();
        drop(aliases);

        if self.is_bean_name(&resolved) {
            Ok(resolved)
        } else {
            Err(ContainerError::NameNotFound(name.to_string()))
        }
    }

    fn is_bean_name(&self, name: &str) -> bool {
        self.definitions.read().contains_key(name) || self.singletons.read().contains_key(name)
    }

    /// 名称或别名是否绑定到某个 Bean
    pub fn is_bound(&self, name: &str) -> bool {
        self.canonical_name(name).is_ok()
    }

    pub fn definition(&self, name: &str) -> Option<Arc<BeanDefinition>> {
        self.definitions.read().get(name).cloned()
    }

    pub fn singleton(&self, name: &str) -> Option<RegisteredSingleton> {
        self.singletons.read().get(name).cloned()
    }

    pub fn contains_definition(&self, name: &str) -> bool {
        self.definitions.read().contains_key(name)
    }

    /// 定义名称（注册顺序）
    pub fn definition_names(&self) -> Vec<String> {
        self.definition_names.read().clone()
    }

    /// 直接单例名称（注册顺序）
    pub fn singleton_names(&self) -> Vec<String> {
        self.singleton_names.read().clone()
    }

    pub fn definition_count(&self) -> usize {
        self.definition_names.read().len()
    }

    /// 指向 `name` 的所有别名（包括间接别名）
    pub fn aliases_for(&self, name: &str) -> Vec<String> {
        let aliases = self.aliases.read();
        let mut result = Vec::new();
        let mut frontier = vec![name.to_string()];
        while let Some(target) = frontier.pop() {
            let mut direct: Vec<&String> = aliases
                .iter()
                .filter(|(_, points_to)| **points_to == target)
                .map(|(alias, _)| alias)
                .collect();
            direct.sort();
            for alias in direct {
                if !result.contains(alias) {
                    result.push(alias.clone());
                    frontier.push(alias.clone());
                }
            }
        }
        result
    }

    /// 删除 Bean 定义，指向它的别名一并删除
    pub fn remove_definition(&self, name: &str) -> ContainerResult<Arc<BeanDefinition>> {
        let _registration = self.registration.lock();

        let removed = self
            .definitions
            .write()
            .remove(name)
            .ok_or_else(|| ContainerError::NameNotFound(name.to_string()))?;
        self.definition_names.write().retain(|existing| existing != name);

        let dangling = self.aliases_for(name);
        let mut aliases = self.aliases.write();
        for alias in dangling {
            aliases.remove(&alias);
        }

        tracing::debug!("Removed bean definition '{}'", name);
        Ok(removed)
    }

    /// 原地修改 Bean 定义
    pub fn modify_definition<F>(&self, name: &str, modify: F) -> ContainerResult<()>
    where
        F: FnOnce(&mut BeanDefinition),
    {
        if self.is_frozen() {
            return Err(ContainerError::ConfigurationFrozen(name.to_string()));
        }
        let mut definitions = self.definitions.write();
        let definition = definitions
            .get_mut(name)
            .ok_or_else(|| ContainerError::NameNotFound(name.to_string()))?;
        modify(Arc::make_mut(definition));
        Ok(())
    }
}

fn duplicate(name: &str, reason: &str) -> ContainerError {
    ContainerError::DuplicateDefinition {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}
