//! `flowpipe` core: left-to-right stage pipelines and a keyed dispatcher.
//!
//! - [`pipe`] / [`pipe!`] compose unary stages into a [`Pipeline`].
//! - [`branch`] builds a [`Branch`] that picks a handler by the value of a
//!   request property.
//!
//! Both produce stateless, cloneable function values; either can be used as
//! a stage of the other.

pub mod branch;
pub mod error;
pub mod key;
pub mod pipeline;
pub mod stage;
pub mod types;

pub use branch::{branch, Branch, BranchConfig, Routes};
pub use error::{FlowError, FlowResult};
pub use key::{Inspect, Key};
pub use pipeline::{pipe, Pipeline};
pub use stage::{IntoStage, Stage, Step};
pub use types::Value;
