//! `flowpipe` service: `tower` adapter, middleware and line-oriented runner for flows.

pub mod flows;
pub mod runner;
pub mod service;

pub use service::{
    build_flow_pipeline, FlowRouter, Invocation, InvocationContext, InvocationError,
    InvocationFactory, ServiceConfig,
};
