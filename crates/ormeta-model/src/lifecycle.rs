//! Lifecycle callbacks
//!
//! - [`LifecycleEvent`]: the seven entity lifecycle events
//! - [`CallbackAdapter`]: one method to invoke for an event
//! - [`CallbackBucket`]: ordered callbacks with the listener-sourced count
//! - [`LifecycleDescriptor`]: per-event buckets split into declared and
//!   non-persistent-superclass partitions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// Entity lifecycle event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleEvent {
    PrePersist,
    PostPersist,
    PreRemove,
    PostRemove,
    PreUpdate,
    PostUpdate,
    PostLoad,
}

impl LifecycleEvent {
    /// Every event in invocation-table order
    pub const ALL: [Self; 7] = [
        Self::PrePersist,
        Self::PostPersist,
        Self::PreRemove,
        Self::PostRemove,
        Self::PreUpdate,
        Self::PostUpdate,
        Self::PostLoad,
    ];

    /// Kebab-case name, also the directive name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PrePersist => "pre-persist",
            Self::PostPersist => "post-persist",
            Self::PreRemove => "pre-remove",
            Self::PostRemove => "post-remove",
            Self::PreUpdate => "pre-update",
            Self::PostUpdate => "post-update",
            Self::PostLoad => "post-load",
        }
    }

    /// Parse a kebab-case name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.as_str() == name)
    }
}

impl Display for LifecycleEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A method invoked for a lifecycle event
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallbackAdapter {
    /// Type whose instance receives the call (entity or listener type)
    pub target_type: String,
    /// Type on which the method is declared
    pub declaring_type: String,
    pub method: String,
    /// Parameter type names; listener methods take the entity
    #[serde(default)]
    pub params: Vec<String>,
    /// Sourced from an external listener type
    pub listener: bool,
}

impl CallbackAdapter {
    /// Callback on the entity instance itself
    #[must_use]
    pub fn method(
        target_type: impl Into<String>,
        declaring_type: impl Into<String>,
        method: impl Into<String>,
        params: Vec<String>,
    ) -> Self {
        Self {
            target_type: target_type.into(),
            declaring_type: declaring_type.into(),
            method: method.into(),
            params,
            listener: false,
        }
    }

    /// Callback on an external listener instance
    #[must_use]
    pub fn listener(
        listener_type: impl Into<String>,
        declaring_type: impl Into<String>,
        method: impl Into<String>,
        params: Vec<String>,
    ) -> Self {
        Self {
            target_type: listener_type.into(),
            declaring_type: declaring_type.into(),
            method: method.into(),
            params,
            listener: true,
        }
    }

    /// Name plus parameter shape; the dedup key across a hierarchy
    #[must_use]
    pub fn signature(&self) -> (&str, &[String]) {
        (self.method.as_str(), self.params.as_slice())
    }
}

impl Display for CallbackAdapter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}::{}({})",
            self.declaring_type,
            self.method,
            self.params.join(", ")
        )
    }
}

/// Callbacks for one event
///
/// Entity methods come first, listener callbacks last. `listener_count`
/// counts the tail so an overlay can replace one subset without touching the
/// other.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CallbackBucket {
    pub callbacks: Vec<CallbackAdapter>,
    pub listener_count: usize,
}

impl CallbackBucket {
    /// Build from the two subsets
    #[must_use]
    pub fn new(methods: Vec<CallbackAdapter>, listeners: Vec<CallbackAdapter>) -> Self {
        let listener_count = listeners.len();
        let mut callbacks = methods;
        callbacks.extend(listeners);
        Self {
            callbacks,
            listener_count,
        }
    }

    /// Entity-method subset
    #[must_use]
    pub fn methods(&self) -> &[CallbackAdapter] {
        let split = self.callbacks.len().saturating_sub(self.listener_count);
        &self.callbacks[..split]
    }

    /// Listener-sourced subset
    #[must_use]
    pub fn listeners(&self) -> &[CallbackAdapter] {
        let split = self.callbacks.len().saturating_sub(self.listener_count);
        &self.callbacks[split..]
    }

    /// Replace the entity-method subset, keeping listeners
    pub fn replace_methods(&mut self, methods: Vec<CallbackAdapter>) {
        let listeners = self.listeners().to_vec();
        *self = Self::new(methods, listeners);
    }

    /// Replace the listener subset, keeping entity methods
    pub fn replace_listeners(&mut self, listeners: Vec<CallbackAdapter>) {
        let methods = self.methods().to_vec();
        *self = Self::new(methods, listeners);
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

/// Per-event callback buckets of one entity
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LifecycleDescriptor {
    /// Declared on the entity type or its listeners
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub declared: BTreeMap<LifecycleEvent, CallbackBucket>,
    /// Inherited from non-persistent superclasses
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub superclass: BTreeMap<LifecycleEvent, CallbackBucket>,
}

impl LifecycleDescriptor {
    /// Declared bucket for an event, if any
    #[must_use]
    pub fn declared(&self, event: LifecycleEvent) -> Option<&CallbackBucket> {
        self.declared.get(&event)
    }

    /// Superclass bucket for an event, if any
    #[must_use]
    pub fn superclass(&self, event: LifecycleEvent) -> Option<&CallbackBucket> {
        self.superclass.get(&event)
    }

    /// Mutable declared bucket, created on demand
    pub fn declared_mut(&mut self, event: LifecycleEvent) -> &mut CallbackBucket {
        self.declared.entry(event).or_default()
    }

    /// Set or clear the declared bucket for an event
    pub fn set_declared(&mut self, event: LifecycleEvent, bucket: CallbackBucket) {
        if bucket.is_empty() {
            self.declared.remove(&event);
        } else {
            self.declared.insert(event, bucket);
        }
    }

    /// Set or clear the superclass bucket for an event
    pub fn set_superclass(&mut self, event: LifecycleEvent, bucket: CallbackBucket) {
        if bucket.is_empty() {
            self.superclass.remove(&event);
        } else {
            self.superclass.insert(event, bucket);
        }
    }

    /// Entity-level invocation order: declared callbacks, then superclass ones
    #[must_use]
    pub fn invocation_order(&self, event: LifecycleEvent) -> Vec<&CallbackAdapter> {
        self.declared(event)
            .into_iter()
            .chain(self.superclass(event))
            .flat_map(|bucket| bucket.callbacks.iter())
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declared.is_empty() && self.superclass.is_empty()
    }
}
