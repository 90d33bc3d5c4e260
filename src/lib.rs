pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::{CliConfig, Command};

pub use adapters::credentials::{PasswordLogin, SessionCredentials, StaticToken};
pub use adapters::xapi::XapiClient;
pub use config::SyncSettings;
pub use crate::core::reconciler::Reconciler;
pub use domain::model::{ReconcileReport, Stage, TrunkId};
pub use utils::error::{Result, SyncError};
