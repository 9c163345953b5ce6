//! Endpoint registry: fixed-capacity table of named, categorised callbacks.
//!
//! Bindings are keyed by `(name, category)`; the same name may appear once
//! per category. Storage keeps registration order, which is also the order
//! the index endpoint lists them in.

use core::net::SocketAddr;

use log::debug;

use crate::config::{MAX_BINDINGS, NAME_MAX_LEN};
use crate::error::RegistryError;

use super::emitter::{EventCategory, EventSink};
use super::response::{Response, Value};

/// Endpoint / event category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Action,
    Condition,
    Capability,
    System,
    Trigger,
    Raw,
}

impl Category {
    /// Lookup order for inbound calls. Action wins over condition wins
    /// over capability when a name is bound in more than one.
    pub const DISPATCH_ORDER: [Category; 3] =
        [Category::Action, Category::Condition, Category::Capability];

    /// Wire tag.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Action => "act",
            Self::Condition => "con",
            Self::Capability => "cap",
            Self::System => "sys",
            Self::Trigger => "trg",
            Self::Raw => "raw",
        }
    }
}

/// Context handed to a callback for one invocation.
pub struct Call<'a> {
    argument: Option<&'a str>,
    source: SocketAddr,
    events: &'a mut dyn EventSink,
}

impl<'a> Call<'a> {
    pub fn new(
        argument: Option<&'a str>,
        source: SocketAddr,
        events: &'a mut dyn EventSink,
    ) -> Self {
        Self {
            argument,
            source,
            events,
        }
    }

    /// Decoded request argument, if the caller supplied one.
    pub fn argument(&self) -> Option<&str> {
        self.argument
    }

    /// Address the request came from.
    pub fn source(&self) -> SocketAddr {
        self.source
    }

    /// Fire a flow trigger on the master.
    pub fn trigger<'v>(&mut self, name: &str, value: impl Into<Value<'v>>) -> bool {
        self.events
            .emit(name, EventCategory::Trigger, value.into())
            .is_ok()
    }

    /// Push a capability value to the master.
    pub fn set_capability_value<'v>(&mut self, name: &str, value: impl Into<Value<'v>>) -> bool {
        self.events
            .emit(name, EventCategory::Capability, value.into())
            .is_ok()
    }

    /// Send a raw event, ignored by the stock hub app.
    pub fn emit_raw<'v>(&mut self, name: &str, value: impl Into<Value<'v>>) -> bool {
        self.events
            .emit(name, EventCategory::Raw, value.into())
            .is_ok()
    }
}

/// A remote-callable unit bound in the registry.
pub trait Endpoint {
    fn invoke(&mut self, call: &mut Call<'_>) -> Response;
}

impl<F> Endpoint for F
where
    F: FnMut(&mut Call<'_>) -> Response,
{
    fn invoke(&mut self, call: &mut Call<'_>) -> Response {
        self(call)
    }
}

/// Binding name storage.
pub type Name = heapless::String<NAME_MAX_LEN>;

/// One registered `(name, category) → endpoint` association.
pub struct Binding {
    name: Name,
    category: Category,
    endpoint: Box<dyn Endpoint>,
}

impl Binding {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn invoke(&mut self, call: &mut Call<'_>) -> Response {
        self.endpoint.invoke(call)
    }

    fn matches(&self, name: &str, category: Category) -> bool {
        self.category == category && self.name.as_str() == name
    }
}

impl core::fmt::Debug for Binding {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Binding")
            .field("name", &self.name)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

/// Fixed-capacity binding table.
pub struct Registry<const N: usize = MAX_BINDINGS> {
    bindings: heapless::Vec<Binding, N>,
}

impl<const N: usize> Default for Registry<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Registry<N> {
    pub fn new() -> Self {
        Self {
            bindings: heapless::Vec::new(),
        }
    }

    /// Bind `endpoint` under `(name, category)`.
    ///
    /// Fails without touching the table when the name is invalid, the
    /// pair is already bound, or every slot is taken.
    pub fn register(
        &mut self,
        name: &str,
        category: Category,
        endpoint: impl Endpoint + 'static,
    ) -> Result<(), RegistryError> {
        if name.is_empty() || name.len() > NAME_MAX_LEN {
            return Err(RegistryError::InvalidName);
        }
        if self.find(name, category).is_some() {
            return Err(RegistryError::Duplicate);
        }
        if self.bindings.is_full() {
            return Err(RegistryError::Full);
        }

        let mut stored = Name::new();
        stored
            .push_str(name)
            .map_err(|()| RegistryError::InvalidName)?;

        self.bindings
            .push(Binding {
                name: stored,
                category,
                endpoint: Box::new(endpoint),
            })
            .map_err(|_| RegistryError::Full)?;

        debug!("HOMEY: registered {}/{}", category.tag(), name);
        Ok(())
    }

    pub fn find(&self, name: &str, category: Category) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.matches(name, category))
    }

    pub fn find_mut(&mut self, name: &str, category: Category) -> Option<&mut Binding> {
        self.bindings.iter_mut().find(|b| b.matches(name, category))
    }

    /// Resolve an inbound call across the dispatchable categories.
    pub fn resolve(&mut self, name: &str) -> Option<&mut Binding> {
        let idx = Category::DISPATCH_ORDER.iter().find_map(|&category| {
            self.bindings
                .iter()
                .position(|b| b.matches(name, category))
        })?;
        self.bindings.get_mut(idx)
    }

    pub fn remove(&mut self, name: &str, category: Category) -> Result<(), RegistryError> {
        let idx = self
            .bindings
            .iter()
            .position(|b| b.matches(name, category))
            .ok_or(RegistryError::NotFound)?;
        self.bindings.remove(idx);
        debug!("HOMEY: removed {}/{}", category.tag(), name);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}
