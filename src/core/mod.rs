pub mod merge;
pub mod reconciler;

pub use crate::domain::model::{ReconcileReport, Stage, TrunkId};
pub use crate::domain::ports::{ConfigProvider, CredentialProvider, PbxApi};
pub use crate::utils::error::Result;
