// In: src/services/mod.rs

// ====================================================================================
// ARCHITECTURAL OVERVIEW: The Run Context
// ====================================================================================
//
// Links never talk to each other. Everything they share goes through a small set of
// services (the `ConfigObject` and the `DataStore`), held by a `ServiceRegistry`.
//
// The registry is owned by the `ProcessManager` and handed to every lifecycle call
// as `&mut ServiceRegistry`:
//
//   ProcessManager
//     |-- services: ServiceRegistry  --(&mut)-->  Chain::run(ctx)
//     |                                             |
//     |                                             `--(&mut)--> Link::execute(ctx)
//     `-- chains: Vec<Chain>
//
// At most one instance per service type exists. A service is created lazily with its
// `Default` the first time it is asked for, can be replaced with `register`, and is
// dropped by `remove` or `reset`.
//
// ====================================================================================

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;

use crate::config::ConfigObject;
use crate::error::ChainrunError;

pub mod data_store;

pub use data_store::DataStore;

/// Anything the registry can hold. The blanket impl makes every
/// `'static + Default` type a service.
pub trait Service: Any + Default {}

impl<T: Any + Default> Service for T {}

struct Slot {
    name: &'static str,
    instance: Box<dyn Any>,
}

/// Holds at most one instance per service type.
#[derive(Default)]
pub struct ServiceRegistry {
    slots: HashMap<TypeId, Slot>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the singleton for `T`, constructing `T::default()` if absent.
    pub fn service<T: Service>(&mut self) -> &mut T {
        let slot = self.slots.entry(TypeId::of::<T>()).or_insert_with(|| {
            log::debug!("Creating default service {}", type_name::<T>());
            Slot {
                name: type_name::<T>(),
                instance: Box::new(T::default()),
            }
        });
        match slot.instance.downcast_mut::<T>() {
            Some(instance) => instance,
            // Slots are keyed by the TypeId of the value they hold.
            None => unreachable!("service slot for {} holds a foreign type", slot.name),
        }
    }

    /// Read-only access that never constructs anything.
    pub fn get<T: Service>(&self) -> Option<&T> {
        self.slots
            .get(&TypeId::of::<T>())
            .and_then(|slot| slot.instance.downcast_ref::<T>())
    }

    /// Replaces the singleton for `T`, returning the previous instance.
    pub fn register<T: Service>(&mut self, instance: T) -> Option<T> {
        log::debug!("Registering service {}", type_name::<T>());
        self.slots
            .insert(
                TypeId::of::<T>(),
                Slot {
                    name: type_name::<T>(),
                    instance: Box::new(instance),
                },
            )
            .and_then(|old| old.instance.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    /// Drops the singleton for `T`. Fails with `NotRegistered` unless `silent`.
    pub fn remove<T: Service>(&mut self, silent: bool) -> Result<Option<T>, ChainrunError> {
        match self.slots.remove(&TypeId::of::<T>()) {
            Some(slot) => Ok(slot.instance.downcast::<T>().ok().map(|boxed| *boxed)),
            None if silent => Ok(None),
            None => Err(ChainrunError::NotRegistered(type_name::<T>())),
        }
    }

    pub fn contains<T: Service>(&self) -> bool {
        self.slots.contains_key(&TypeId::of::<T>())
    }

    /// Clears every service except the listed types.
    pub fn reset(&mut self, preserve: &[TypeId]) {
        self.slots.retain(|type_id, slot| {
            let keep = preserve.contains(type_id);
            if !keep {
                log::debug!("Removing service {}", slot.name);
            }
            keep
        });
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    //==============================================================================
    // Shorthands for the two services every link uses
    //==============================================================================

    pub fn config(&self) -> Option<&ConfigObject> {
        self.get::<ConfigObject>()
    }

    pub fn config_mut(&mut self) -> &mut ConfigObject {
        self.service::<ConfigObject>()
    }

    pub fn store(&self) -> Option<&DataStore> {
        self.get::<DataStore>()
    }

    pub fn store_mut(&mut self) -> &mut DataStore {
        self.service::<DataStore>()
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.slots.values().map(|slot| slot.name).collect();
        names.sort_unstable();
        f.debug_struct("ServiceRegistry").field("services", &names).finish()
    }
}
