//! TypeRegistry - task class ごとの解決済み型キャッシュ
//!
//! - 起動時に runner ごとに 1 回書き込まれる
//! - 以後はメッセージ処理ワーカーから並行に読まれるだけ
//!
//! `RwLock` の read guard は共有なので、lookup 同士は互いを待ちません。

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{info, warn};

use super::descriptor::TypeDescriptor;
use super::resolver::TypeResolver;
use super::runner::{Payload, TaskRunner};
use crate::config::ConflictPolicy;
use crate::domain::errors::ConfigurationError;

/// What `register` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Inserted,
    /// The same descriptor was already there.
    Unchanged,
    /// A different descriptor was overwritten (`ConflictPolicy::Replace`).
    Replaced,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("task class '{task_class}' is registered as {existing}, refusing {incoming}")]
    Conflict {
        task_class: String,
        existing: Box<TypeDescriptor>,
        incoming: Box<TypeDescriptor>,
    },

    #[error("a runner for task class '{0}' is already registered")]
    DuplicateRunner(String),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Shared by reference between registration code and every decoder.
///
/// # 使用例
/// ```ignore
/// let registry = Arc::new(TypeRegistry::default());
/// registry.register_runner("billing.ChargeTask", &ChargeRunner, &TypeResolver::default())?;
///
/// let descriptor = registry.lookup("billing.ChargeTask");
/// ```
#[derive(Debug, Default)]
pub struct TypeRegistry {
    entries: RwLock<HashMap<String, Arc<TypeDescriptor>>>,
    on_conflict: ConflictPolicy,
}

impl TypeRegistry {
    pub fn new(on_conflict: ConflictPolicy) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            on_conflict,
        }
    }

    pub fn register(
        &self,
        task_class: impl Into<String>,
        descriptor: TypeDescriptor,
    ) -> Result<Registration, RegistryError> {
        let task_class = task_class.into();
        // ロック中に panic しても map は常に整合しているので、poison は無視する
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        let registration = match entries.get(&task_class) {
            None => Registration::Inserted,
            Some(existing) if **existing == descriptor => return Ok(Registration::Unchanged),
            Some(existing) => match self.on_conflict {
                ConflictPolicy::Reject => {
                    return Err(RegistryError::Conflict {
                        task_class,
                        existing: Box::new(existing.as_ref().clone()),
                        incoming: Box::new(descriptor),
                    });
                }
                ConflictPolicy::Replace => {
                    warn!(task_class = %task_class, old = %existing, new = %descriptor, "replacing task class shape");
                    Registration::Replaced
                }
            },
        };

        if registration == Registration::Inserted {
            info!(task_class = %task_class, descriptor = %descriptor, "registered task class");
        }
        entries.insert(task_class, Arc::new(descriptor));
        Ok(registration)
    }

    /// Resolve `runner`'s envelope shape and register it under `task_class`.
    pub fn register_runner<TP, RD, R>(
        &self,
        task_class: impl Into<String>,
        runner: &R,
        resolver: &TypeResolver,
    ) -> Result<Registration, RegistryError>
    where
        TP: Payload,
        RD: Payload,
        R: TaskRunner<TP, RD>,
    {
        let descriptor = resolver.resolve_envelope(&runner.ancestry())?;
        self.register(task_class, descriptor)
    }

    pub fn lookup(&self, task_class: &str) -> Option<Arc<TypeDescriptor>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(task_class)
            .cloned()
    }

    pub fn contains(&self, task_class: &str) -> bool {
        self.lookup(task_class).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered task classes, sorted.
    pub fn task_classes(&self) -> Vec<String> {
        let mut classes: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        classes.sort();
        classes
    }
}
