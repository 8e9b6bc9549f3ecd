mod balance;
mod expense;
mod group;
mod integrity;
mod money;
mod settlement;

pub use balance::*;
pub use expense::*;
pub use group::*;
pub use integrity::*;
pub use money::*;
pub use settlement::*;
