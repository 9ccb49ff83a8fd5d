//! Dependency bundle injected into factory and class tool modules.
//!
//! ```rust
//! use ttooling::Dependencies;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! let deps = Dependencies::new()
//!     .with(Database { url: "mongodb://localhost".to_string() })
//!     .with_setting("github_token", "ghp_example");
//!
//! let db = deps.require::<Database>().expect("database is registered");
//! assert_eq!(db.url, "mongodb://localhost");
//! assert_eq!(deps.setting("github_token"), Some("ghp_example"));
//! ```

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use tcommon::MetadataMap;

use crate::ToolError;

#[derive(Clone, Default)]
pub struct Dependencies {
    services: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    settings: MetadataMap,
}

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T>(self, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        self.with_shared(Arc::new(value))
    }

    pub fn with_shared<T>(mut self, value: Arc<T>) -> Self
    where
        T: Any + Send + Sync,
    {
        self.services.insert(TypeId::of::<T>(), value);
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn get<T>(&self) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let service = self.services.get(&TypeId::of::<T>())?;
        Arc::clone(service).downcast::<T>().ok()
    }

    pub fn require<T>(&self) -> Result<Arc<T>, ToolError>
    where
        T: Any + Send + Sync,
    {
        self.get::<T>().ok_or_else(|| {
            ToolError::registration(format!("missing dependency: {}", type_name::<T>()))
        })
    }

    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }

    pub fn require_setting(&self, key: &str) -> Result<&str, ToolError> {
        self.setting(key)
            .ok_or_else(|| ToolError::registration(format!("missing setting: '{key}'")))
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty() && self.settings.is_empty()
    }
}

impl Debug for Dependencies {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&str> = self.settings.keys().map(String::as_str).collect();
        keys.sort_unstable();

        f.debug_struct("Dependencies")
            .field("services", &self.services.len())
            .field("settings", &keys)
            .finish()
    }
}
