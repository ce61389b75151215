//! Facts engine shared by the hostfacts agent.
//!
//! Turns cluster configuration and runtime dumps into typed `FactValue`
//! trees and answers dotted-path fact requests against them.

pub mod entities;
pub mod executor;
pub mod gatherers;
pub mod parsers;
pub mod value;

pub use entities::{Fact, FactGatheringError, FactRequest, FactResult};
pub use executor::{CommandExecutor, ExecError, FileReader, FsReader, SystemExecutor};
pub use gatherers::{FactsGatherer, GathererOptions, GathererRegistry};
pub use value::{FactValue, FactValueMap, PathNotFound};
