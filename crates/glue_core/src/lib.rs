pub mod assets;
pub mod chrome;
pub mod config;
pub mod error;
pub mod fontconfig;
pub mod lifecycle;
pub mod provision;

pub use crate::config::{BootstrapConfig, CompletionMarker};
pub use crate::lifecycle::{AppContext, LifecycleState, Phase};
pub use crate::provision::{FontPaths, ProvisionOutcome, Provisioner};
