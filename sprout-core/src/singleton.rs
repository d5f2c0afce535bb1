//! 单例缓存
//!
//! - 完成初始化的单例
//! - 提前暴露的引用（创建中的单例，用于解决循环依赖）
//! - 正在创建的单例名称
//! - 工厂 Bean 产出对象的缓存
//!
//! 一个名称不会同时出现在完成缓存和提前引用中，写入完成缓存时会原子地移除提前引用。
//! 创建失败时，在提前引用暴露之后完成的单例会一并从缓存中移除。
//! 单例创建在一把可重入锁下进行，同一个单例在并发请求下最多构造一次。

use std::collections::{HashMap, HashSet};

use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard, RwLock};

use crate::error::{ContainerError, ContainerResult};
use crate::types::Object;

struct EarlyReference {
    raw: Object,
    exposed: Option<Object>,
    /// 提前引用暴露之后完成的单例，它们可能持有这个未完成的对象
    dependents: Vec<String>,
}

#[derive(Default)]
struct CacheState {
    singletons: HashMap<String, Object>,
    early_references: HashMap<String, EarlyReference>,
    creation_order: Vec<String>,
}

#[derive(Default)]
pub struct SingletonRegistry {
    state: RwLock<CacheState>,
    in_creation: Mutex<HashSet<String>>,
    factory_products: RwLock<HashMap<String, Object>>,
    creation_lock: ReentrantMutex<()>,
}

/// 正在创建的标记，释放时移除标记和未完成的提前引用
pub struct CreationGuard<'a> {
    registry: &'a SingletonRegistry,
    name: String,
}

impl Drop for CreationGuard<'_> {
    fn drop(&mut self) {
        self.registry.in_creation.lock().remove(&self.name);
        self.registry.state.write().early_references.remove(&self.name);
    }
}

impl SingletonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取单例创建锁
    pub fn lock_creation(&self) -> ReentrantMutexGuard<'_, ()> {
        self.creation_lock.lock()
    }

    pub fn get(&self, name: &str) -> Option<Object> {
        self.state.read().singletons.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state.read().singletons.contains_key(name)
    }

    pub fn is_in_creation(&self, name: &str) -> bool {
        self.in_creation.lock().contains(name)
    }

    /// 标记开始创建，已在创建中说明出现了无法通过提前引用解决的循环
    pub fn begin_creation(&self, name: &str) -> ContainerResult<CreationGuard<'_>> {
        if !self.in_creation.lock().insert(name.to_string()) {
            return Err(ContainerError::UnresolvableCircularReference {
                name: name.to_string(),
                reason: "is there an unresolvable circular reference?".to_string(),
            });
        }
        Ok(CreationGuard {
            registry: self,
            name: name.to_string(),
        })
    }

    /// 登记原始对象，供循环依赖中提前获取
    pub fn add_early_reference(&self, name: &str, raw: Object) {
        let mut state = self.state.write();
        if !state.singletons.contains_key(name) {
            state
                .early_references
                .insert(
                    name.to_string(),
                    EarlyReference {
                        raw,
                        exposed: None,
                        dependents: Vec::new(),
                    },
                );
        }
    }

    /// 获取提前引用
    ///
    /// 第一次获取时通过 `expose` 计算暴露的对象（例如代理），之后复用同一个对象
    pub fn early_reference<F>(&self, name: &str, expose: F) -> ContainerResult<Option<Object>>
    where
        F: FnOnce(Object) -> ContainerResult<Object>,
    {
        let raw = {
            let state = self.state.read();
            match state.early_references.get(name) {
                None => return Ok(None),
                Some(EarlyReference { exposed: Some(exposed), .. }) => return Ok(Some(exposed.clone())),
                Some(EarlyReference { raw, .. }) => raw.clone(),
            }
        };

        let exposed = expose(raw)?;

        let mut state = self.state.write();
        match state.early_references.get_mut(name) {
            Some(reference) => Ok(Some(reference.exposed.get_or_insert(exposed).clone())),
            None => Ok(Some(exposed)),
        }
    }

    /// 已经暴露出去的提前引用
    pub fn exposed_early_reference(&self, name: &str) -> Option<Object> {
        self.state
            .read()
            .early_references
            .get(name)
            .and_then(|reference| reference.exposed.clone())
    }

    /// 写入完成缓存，同时移除提前引用
    pub fn add_singleton(&self, name: &str, object: Object) {
        let mut state = self.state.write();
        state.early_references.remove(name);
        for reference in state.early_references.values_mut() {
            if reference.exposed.is_some() {
                reference.dependents.push(name.to_string());
            }
        }
        if state.singletons.insert(name.to_string(), object).is_none() {
            state.creation_order.push(name.to_string());
        }
    }

    /// 创建失败后丢弃提前引用，并把暴露之后完成的单例移出缓存
    ///
    /// 返回被移除的单例，调用方负责销毁它们
    pub fn discard_early_reference(&self, name: &str) -> Vec<(String, Object)> {
        let dependents = match self.state.write().early_references.remove(name) {
            Some(reference) => reference.dependents,
            None => return Vec::new(),
        };
        dependents
            .into_iter()
            .rev()
            .filter_map(|dependent| self.remove_singleton(&dependent).map(|object| (dependent, object)))
            .collect()
    }

    /// 移除某个单例及其工厂产出（定义被覆盖或删除时）
    pub fn remove_singleton(&self, name: &str) -> Option<Object> {
        self.factory_products.write().remove(name);
        let mut state = self.state.write();
        state.early_references.remove(name);
        state.creation_order.retain(|existing| existing != name);
        state.singletons.remove(name)
    }

    pub fn factory_product(&self, name: &str) -> Option<Object> {
        self.factory_products.read().get(name).cloned()
    }

    pub fn cache_factory_product(&self, name: &str, product: Object) {
        self.factory_products.write().insert(name.to_string(), product);
    }

    /// 单例名称（创建顺序）
    pub fn singleton_names(&self) -> Vec<String> {
        self.state.read().creation_order.clone()
    }

    pub fn singleton_count(&self) -> usize {
        self.state.read().singletons.len()
    }

    /// 清空所有缓存，按创建顺序的逆序返回单例
    pub fn drain_for_destruction(&self) -> Vec<(String, Object)> {
        let _lock = self.lock_creation();
        self.factory_products.write().clear();
        let mut state = self.state.write();
        state.early_references.clear();
        let order = std::mem::take(&mut state.creation_order);
        let mut singletons = std::mem::take(&mut state.singletons);
        order
            .into_iter()
            .rev()
            .filter_map(|name| singletons.remove(&name).map(|object| (name, object)))
            .collect()
    }
}
