//! # Idling resource abstractions.
//!
//! This module provides the resource-related types:
//! - [`IdlingResource`] - trait implemented by anything the registry can wait for
//! - [`ResourceRef`] - shared reference to a resource (`Arc<dyn IdlingResource>`)
//! - [`ResourceCallback`] - transition notifier handed to each resource
//! - [`CountingResource`] - counter-backed built-in implementation

mod counting;
mod resource;

pub use counting::CountingResource;
pub use resource::{IdlingResource, ResourceCallback, ResourceRef};
