//! Utility functions for the container
//!
//! Bean naming conventions and bookkeeping for beans currently in creation.

/// Naming convention utilities for bean names
pub mod naming {
    /// Prefix used to address a factory bean itself rather than its product.
    pub const FACTORY_BEAN_PREFIX: &str = "&";

    /// Converts a PascalCase type name to camelCase for bean naming.
    ///
    /// Follows the JavaBeans decapitalize rule: when the first two characters
    /// are both uppercase the name is left unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use sprout_core::utils::naming::to_camel_case;
    ///
    /// assert_eq!(to_camel_case("UserService"), "userService");
    /// assert_eq!(to_camel_case("URLResolver"), "URLResolver");
    /// assert_eq!(to_camel_case("A"), "a");
    /// assert_eq!(to_camel_case(""), "");
    /// ```
    pub fn to_camel_case(s: &str) -> String {
        let mut chars = s.chars();
        match chars.next() {
            None => String::new(),
            Some(first) => {
                if first.is_uppercase() && chars.clone().next().is_some_and(char::is_uppercase) {
                    return s.to_string();
                }
                let mut result = String::with_capacity(s.len());
                result.extend(first.to_lowercase());
                result.push_str(chars.as_str());
                result
            }
        }
    }

    /// Derives the default bean name from a full Rust type name.
    ///
    /// Module paths and generic arguments are dropped before decapitalizing,
    /// so `my_app::service::UserService<Foo>` becomes `userService`.
    pub fn default_bean_name(type_name: &str) -> String {
        let without_generics = type_name.split('<').next().unwrap_or(type_name);
        let short = without_generics.rsplit("::").next().unwrap_or(without_generics);
        to_camel_case(short)
    }

    /// Strips every leading factory prefix from a requested name.
    ///
    /// Returns the bare name and whether the factory itself was requested.
    pub fn transformed_bean_name(name: &str) -> (&str, bool) {
        let bare = name.trim_start_matches(FACTORY_BEAN_PREFIX);
        (bare, bare.len() != name.len())
    }

    /// Builds the name that addresses a factory bean itself.
    pub fn factory_reference(name: &str) -> String {
        format!("{FACTORY_BEAN_PREFIX}{name}")
    }
}

/// Dependency resolution utilities
pub mod dependency {
    use parking_lot::Mutex;
    use std::collections::{HashMap, HashSet};
    use std::thread::{self, ThreadId};

    /// Tracks beans currently being created on each thread.
    ///
    /// Prototype beans are never cached, so a second request for the same
    /// prototype on the same thread while it is still being built means the
    /// dependency graph loops back on itself.
    #[derive(Debug, Default)]
    pub struct CreationTracker {
        creating: Mutex<HashMap<ThreadId, HashSet<String>>>,
    }

    impl CreationTracker {
        /// Creates a new empty creation tracker.
        pub fn new() -> Self {
            Self::default()
        }

        /// Checks if a bean is currently being created on this thread.
        pub fn is_creating(&self, name: &str) -> bool {
            self.creating
                .lock()
                .get(&thread::current().id())
                .is_some_and(|names| names.contains(name))
        }

        /// Marks a bean as being created on this thread.
        ///
        /// Returns `false` if it was already in the creating set (circular dependency detected).
        pub fn start_creating(&self, name: &str) -> bool {
            self.creating
                .lock()
                .entry(thread::current().id())
                .or_default()
                .insert(name.to_string())
        }

        /// Marks a bean as finished being created on this thread.
        pub fn finish_creating(&self, name: &str) {
            let mut creating = self.creating.lock();
            let id = thread::current().id();
            if let Some(names) = creating.get_mut(&id) {
                names.remove(name);
                if names.is_empty() {
                    creating.remove(&id);
                }
            }
        }

        /// Gets a snapshot of the beans being created on this thread.
        pub fn current_creating(&self) -> Vec<String> {
            self.creating
                .lock()
                .get(&thread::current().id())
                .map(|names| names.iter().cloned().collect())
                .unwrap_or_default()
        }
    }
}

#[cfg(test)]
mod tests {
    mod naming_tests {
        use super::super::naming::*;

        #[test]
        fn test_to_camel_case() {
            assert_eq!(to_camel_case("UserService"), "userService");
            assert_eq!(to_camel_case("DatabaseService"), "databaseService");
            assert_eq!(to_camel_case("A"), "a");
            assert_eq!(to_camel_case("AB"), "AB");
            assert_eq!(to_camel_case(""), "");
            assert_eq!(to_camel_case("lowerCase"), "lowerCase");
        }

        #[test]
        fn test_default_bean_name() {
            assert_eq!(default_bean_name("demo::service::UserService"), "userService");
            assert_eq!(default_bean_name("demo::Wrapper<demo::User>"), "wrapper");
            assert_eq!(default_bean_name("User"), "user");
        }

        #[test]
        fn test_transformed_bean_name() {
            assert_eq!(transformed_bean_name("userFactory"), ("userFactory", false));
            assert_eq!(transformed_bean_name("&userFactory"), ("userFactory", true));
            assert_eq!(transformed_bean_name("&&userFactory"), ("userFactory", true));
            assert_eq!(factory_reference("userFactory"), "&userFactory");
        }
    }

    mod dependency_tests {
        use super::super::dependency::*;
        use std::sync::Arc;
        use std::thread;

        #[test]
        fn test_creation_tracker() {
            let tracker = CreationTracker::new();

            assert!(!tracker.is_creating("serviceA"));
            assert!(tracker.start_creating("serviceA"));
            assert!(tracker.is_creating("serviceA"));

            // Second start on the same thread is a cycle
            assert!(!tracker.start_creating("serviceA"));

            tracker.finish_creating("serviceA");
            assert!(!tracker.is_creating("serviceA"));
            assert!(tracker.current_creating().is_empty());
        }

        #[test]
        fn test_creation_tracker_is_per_thread() {
            let tracker = Arc::new(CreationTracker::new());
            assert!(tracker.start_creating("prototype"));

            let other = Arc::clone(&tracker);
            let started_elsewhere = thread::spawn(move || {
                let started = other.start_creating("prototype");
                other.finish_creating("prototype");
                started
            })
            .join()
            .unwrap();

            assert!(started_elsewhere);
            assert_eq!(tracker.current_creating(), vec!["prototype".to_string()]);
        }
    }
}
