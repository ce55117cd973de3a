//! Startup behavior registry
//!
//! Maps the entry reference named in a module descriptor to the startup
//! behavior that implements it.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::module::registry::definition::EntryRef;
use crate::module::traits::{ModuleContext, ModuleError, ModuleStartup};

/// Registry of startup behaviors keyed by entry reference
pub struct StartupRegistry<C: Send + 'static> {
    behaviors: HashMap<EntryRef, Arc<dyn ModuleStartup<C>>>,
}

impl<C: Send + 'static> StartupRegistry<C> {
    pub fn new() -> Self {
        Self {
            behaviors: HashMap::new(),
        }
    }

    /// Register a startup behavior under an entry reference
    pub fn register<S>(
        &mut self,
        entry: impl Into<EntryRef>,
        behavior: S,
    ) -> Result<(), ModuleError>
    where
        S: ModuleStartup<C> + 'static,
    {
        self.register_arc(entry, Arc::new(behavior))
    }

    /// Register an already shared startup behavior
    pub fn register_arc(
        &mut self,
        entry: impl Into<EntryRef>,
        behavior: Arc<dyn ModuleStartup<C>>,
    ) -> Result<(), ModuleError> {
        let entry = entry.into();
        if self.behaviors.contains_key(&entry) {
            return Err(ModuleError::AlreadyRegistered(entry.to_string()));
        }
        debug!(entry = %entry, "Registered startup behavior");
        self.behaviors.insert(entry, behavior);
        Ok(())
    }

    /// Register an async closure as a startup behavior
    ///
    /// ```no_run
    /// use futures::FutureExt;
    /// use modhost::module::StartupRegistry;
    ///
    /// let mut registry: StartupRegistry<Vec<String>> = StartupRegistry::new();
    /// registry
    ///     .register_fn("users", |ctx| {
    ///         async move {
    ///             let name = ctx.module_id().to_string();
    ///             ctx.registration().push(name);
    ///             Ok(())
    ///         }
    ///         .boxed()
    ///     })
    ///     .unwrap();
    /// ```
    pub fn register_fn<F>(&mut self, entry: impl Into<EntryRef>, f: F) -> Result<(), ModuleError>
    where
        F: for<'a, 'b> Fn(&'a mut ModuleContext<'b, C>) -> BoxFuture<'a, Result<(), ModuleError>>
            + Send
            + Sync
            + 'static,
    {
        self.register(entry, FnStartup(f))
    }

    pub fn get(&self, entry: &EntryRef) -> Option<&Arc<dyn ModuleStartup<C>>> {
        self.behaviors.get(entry)
    }

    pub fn contains(&self, entry: &EntryRef) -> bool {
        self.behaviors.contains_key(entry)
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }

    /// Registered entry references, sorted
    pub fn entries(&self) -> Vec<&EntryRef> {
        let mut entries: Vec<_> = self.behaviors.keys().collect();
        entries.sort();
        entries
    }
}

impl<C: Send + 'static> Default for StartupRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Send + 'static> fmt::Debug for StartupRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartupRegistry")
            .field("entries", &self.entries())
            .finish()
    }
}

/// Adapter turning an async closure into a `ModuleStartup`
struct FnStartup<F>(F);

#[async_trait]
impl<C, F> ModuleStartup<C> for FnStartup<F>
where
    C: Send + 'static,
    F: for<'a, 'b> Fn(&'a mut ModuleContext<'b, C>) -> BoxFuture<'a, Result<(), ModuleError>>
        + Send
        + Sync,
{
    async fn on_startup(&self, ctx: &mut ModuleContext<'_, C>) -> Result<(), ModuleError> {
        (self.0)(ctx).await
    }
}
