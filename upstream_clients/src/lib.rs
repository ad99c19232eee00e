//! HTTP clients for the upstream collaborators this system depends on:
//! Bytemark passes, ParkMobile OAuth/parking, and push-notification queue
//! dispatch.

pub mod bytemark;
pub mod errors;
pub mod parkmobile;
pub mod queue;
