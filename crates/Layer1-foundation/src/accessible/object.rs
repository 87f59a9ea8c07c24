//! Handles to objects living on the accessibility bus
//!
//! The bus owns every object. Beacon only holds [`AxObject`] handles, which
//! carry a stable id and a weak pointer. Reading anything from an object
//! requires [`AxObject::node`], which fails once the object is gone.

use super::role::{Role, StateSet};
use crate::{Error, Result};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

/// Stable identity of a bus object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "obj-{}", self.0)
    }
}

/// Live view of a bus object, implemented by the bus binding
pub trait AccessibleNode: Send + Sync {
    /// `false` once the remote object has been destroyed
    fn is_alive(&self) -> bool {
        true
    }

    fn role(&self) -> Role;

    fn states(&self) -> StateSet;

    fn name(&self) -> String {
        String::new()
    }

    /// Application object owning this node
    fn application(&self) -> Option<AxObject>;

    fn parent(&self) -> Option<AxObject> {
        None
    }

    /// UI toolkit of the owning application (`"GTK"`, `"Qt"`, `"VCL"`, ...)
    fn toolkit_name(&self) -> Option<String> {
        None
    }
}

/// Weak handle to a bus object
#[derive(Clone)]
pub struct AxObject {
    id: ObjectId,
    node: Weak<dyn AccessibleNode>,
}

impl AxObject {
    pub fn new(id: ObjectId, node: &Arc<dyn AccessibleNode>) -> Self {
        Self {
            id,
            node: Arc::downgrade(node),
        }
    }

    /// A handle whose object is already gone
    pub fn dangling(id: ObjectId) -> Self {
        let node: Weak<DeadNode> = Weak::new();
        Self { id, node }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn is_live(&self) -> bool {
        self.node.upgrade().map(|n| n.is_alive()).unwrap_or(false)
    }

    /// Upgrade to the live node
    pub fn node(&self) -> Result<Arc<dyn AccessibleNode>> {
        match self.node.upgrade() {
            Some(node) if node.is_alive() => Ok(node),
            _ => Err(Error::DeadObject(self.id.0)),
        }
    }

    pub fn role(&self) -> Result<Role> {
        Ok(self.node()?.role())
    }

    pub fn states(&self) -> Result<StateSet> {
        Ok(self.node()?.states())
    }

    pub fn has_state(&self, state: StateSet) -> Result<bool> {
        Ok(self.states()?.contains(state))
    }

    pub fn name(&self) -> Result<String> {
        Ok(self.node()?.name())
    }

    pub fn application(&self) -> Result<Option<AxObject>> {
        Ok(self.node()?.application())
    }

    pub fn parent(&self) -> Result<Option<AxObject>> {
        Ok(self.node()?.parent())
    }

    pub fn toolkit_name(&self) -> Result<Option<String>> {
        Ok(self.node()?.toolkit_name())
    }

    /// Live and not reporting DEFUNCT
    pub fn is_usable(&self) -> bool {
        self.states()
            .map(|s| !s.contains(StateSet::DEFUNCT))
            .unwrap_or(false)
    }

    /// Role check that treats dead objects as "no"
    pub fn role_is(&self, role: Role) -> bool {
        self.role().map(|r| r == role).unwrap_or(false)
    }
}

impl PartialEq for AxObject {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for AxObject {}

impl Hash for AxObject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Debug for AxObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.node() {
            Ok(node) => write!(f, "[{} {} '{}']", self.id, node.role(), node.name()),
            Err(_) => write!(f, "[{} DEAD]", self.id),
        }
    }
}

struct DeadNode;

impl AccessibleNode for DeadNode {
    fn is_alive(&self) -> bool {
        false
    }

    fn role(&self) -> Role {
        Role::Unknown
    }

    fn states(&self) -> StateSet {
        StateSet::empty()
    }

    fn application(&self) -> Option<AxObject> {
        None
    }
}
