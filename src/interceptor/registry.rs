use std::sync::Arc;

use super::chain::Chain;
use super::noop::NoOp;
use super::Interceptor;

/// Registry is a collector for interceptors.
///
/// A registry belongs to exactly one connection: interceptors are added while the
/// connection is being configured and [`Registry::build`] consumes it when the connection
/// is constructed.
#[derive(Default)]
pub struct Registry {
    interceptors: Vec<Arc<dyn Interceptor + Send + Sync>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            interceptors: vec![],
        }
    }

    /// add appends an Interceptor to the registry. Duplicates are kept.
    pub fn add(&mut self, icpr: Arc<dyn Interceptor + Send + Sync>) {
        self.interceptors.push(icpr);
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// build constructs a single Interceptor from the registry: a pass-through [`NoOp`]
    /// when nothing was added, otherwise a [`Chain`] in insertion order.
    pub fn build(self) -> Arc<dyn Interceptor + Send + Sync> {
        if self.interceptors.is_empty() {
            return Arc::new(NoOp);
        }

        Arc::new(self.build_chain())
    }

    /// build_chain constructs a non-type erased Chain from the registry.
    pub fn build_chain(self) -> Chain {
        Chain::new(self.interceptors)
    }
}
