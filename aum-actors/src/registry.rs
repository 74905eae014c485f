use crate::actor::{Actor, Addr};
use dashmap::DashMap;
use std::{any::Any, sync::Arc};

/// Thread-safe registry of typed addresses, keyed by actor type and name.
#[derive(Default, Clone)]
pub struct Registry {
    by_name: Arc<DashMap<String, Box<dyn Any + Send + Sync>>>,
}

fn addr_key<A: Actor>(name: &str) -> String {
    format!("{}::{}", std::any::type_name::<Addr<A>>(), name)
}

impl Registry {
    pub fn insert_addr<A: Actor>(&self, name: &str, addr: Addr<A>)
    where
        Addr<A>: Send + Sync,
    {
        self.by_name.insert(addr_key::<A>(name), Box::new(addr));
    }

    pub fn get_addr<A: Actor>(&self, name: &str) -> Option<Addr<A>>
    where
        Addr<A>: Send + Sync,
    {
        self.by_name
            .get(&addr_key::<A>(name))?
            .downcast_ref::<Addr<A>>()
            .cloned()
    }

    /// Addresses of type `A` whose name starts with `prefix`, sorted by name.
    pub fn addrs_with_prefix<A: Actor>(&self, prefix: &str) -> Vec<Addr<A>>
    where
        Addr<A>: Send + Sync,
    {
        let key_prefix = addr_key::<A>(prefix);
        let mut found: Vec<(String, Addr<A>)> = self
            .by_name
            .iter()
            .filter(|e| e.key().starts_with(&key_prefix))
            .filter_map(|e| {
                e.value()
                    .downcast_ref::<Addr<A>>()
                    .map(|a| (e.key().clone(), a.clone()))
            })
            .collect();
        found.sort_by(|a, b| a.0.cmp(&b.0));
        found.into_iter().map(|(_, a)| a).collect()
    }

    pub fn remove(&self, name: &str) -> bool {
        let suffix = format!("::{name}");
        let before = self.by_name.len();
        self.by_name.retain(|k, _| !k.ends_with(&suffix));
        self.by_name.len() != before
    }

    pub fn clear(&self) {
        self.by_name.clear();
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
