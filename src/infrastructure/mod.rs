//! Infrastructure layer - Backend clients and logging

pub mod backend;
pub mod logging;
