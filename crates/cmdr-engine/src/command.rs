//! Command contracts
//!
//! One trait per pipeline shape. Implementations receive a `RunContext`
//! for every step, which carries the run's inputs, its database
//! connection, its execution log and the result cache.

use crate::context::RunContext;
use cmdr_core::errors::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Lazily yielded units of work
pub type Units<T> = Box<dyn Iterator<Item = T>>;

/// A command with a single `run` step
pub trait BasicCommand {
    type Output: Serialize;

    fn run(&mut self, ctx: &RunContext<'_>) -> Result<Self::Output>;
}

/// Acquire-then-expand: one download, expanded into units
///
/// Units and outputs cross thread boundaries as JSON in the parallel
/// variant, so every associated type must round-trip through serde.
pub trait DownloadIterateCommand {
    type Downloaded: Serialize + DeserializeOwned;
    type Unit: Serialize + DeserializeOwned;
    type Output: Serialize + DeserializeOwned;

    fn download(&mut self, ctx: &RunContext<'_>) -> Result<Self::Downloaded>;

    fn iterate(
        &mut self,
        ctx: &RunContext<'_>,
        downloaded: Self::Downloaded,
    ) -> Result<Units<Self::Unit>>;

    fn parse_and_save(&mut self, ctx: &RunContext<'_>, unit: Self::Unit) -> Result<Self::Output>;

    /// Runs once after every unit; results are unordered in the parallel variant
    fn cleanup(&mut self, _ctx: &RunContext<'_>, _results: &[Self::Output]) -> Result<()> {
        Ok(())
    }
}

/// Expand-then-acquire: units first, one download per unit
pub trait IterateDownloadCommand {
    type Unit: Serialize + DeserializeOwned;
    type Downloaded: Serialize + DeserializeOwned;
    type Output: Serialize + DeserializeOwned;

    fn iterate(&mut self, ctx: &RunContext<'_>) -> Result<Units<Self::Unit>>;

    fn download(&mut self, ctx: &RunContext<'_>, unit: &Self::Unit) -> Result<Self::Downloaded>;

    fn parse_and_save(
        &mut self,
        ctx: &RunContext<'_>,
        downloaded: Self::Downloaded,
        unit: &Self::Unit,
    ) -> Result<Self::Output>;

    fn cleanup(&mut self, _ctx: &RunContext<'_>, _results: &[Self::Output]) -> Result<()> {
        Ok(())
    }
}
