pub mod born;
pub mod color;
pub mod common;
pub mod multi;
pub mod real;

use thiserror::Error;

use crate::feyngen::FeynGenError;
use crate::process::ProcessError;

pub use born::{FksProcessFromBorn, StartProcess};
pub use multi::{DiagramCounts, FksMultiProcessFromBorn};
pub use real::{FksBornProcess, FksRealProcess};

#[cfg(test)]
mod test;

#[derive(Error, Debug)]
pub enum FksError {
    #[error("Invalid FKS configuration | {0}")]
    Configuration(String),
    #[error("Could not construct FKS process | {0}")]
    Construction(String),
    #[error("Inconsistent FKS process | {0}")]
    Consistency(String),
    #[error(transparent)]
    FeynGen(#[from] FeynGenError),
    #[error(transparent)]
    Process(#[from] ProcessError),
}
