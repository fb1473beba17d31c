//! Component catalog for skinforge.
//!
//! This crate knows which optional UI components exist, which of them every
//! site must include, and how a site's selection turns into stylesheet flags.

pub mod registry;
pub mod resolver;
pub mod variables;

pub use registry::{Catalog, ComponentDescriptor, ComponentError, ComponentRegistry};
pub use resolver::{ActiveComponentSet, ComponentResolver};
pub use variables::{flag_name, synthesize};
