pub mod deploy;
pub mod plan;
pub mod state;
pub mod up;
pub mod validate;
