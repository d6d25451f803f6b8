pub mod rbac;

pub use rbac::*;
