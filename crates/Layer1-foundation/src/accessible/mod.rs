//! Accessible objects - handles, roles and states of bus objects

mod object;
mod role;

pub use object::{AccessibleNode, AxObject, ObjectId};
pub use role::{Role, StateSet};
