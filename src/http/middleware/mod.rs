//! Request middleware.

pub mod access_control;

pub use access_control::{
    access_control_middleware, AccessControlState, GateContext, GatePolicy, PolicyHandle,
};
