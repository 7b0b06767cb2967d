//! The file-producing half of fontplan.
//!
//! Every function here takes resolved inputs from [planir] and writes files,
//! either directly or by running an external tool. None of them decide
//! whether work is needed; that is the driver's job.

pub mod archive;
pub mod css;
pub mod error;
pub mod fonts;
pub mod params;
pub mod paths;
pub mod release;
pub mod tools;
pub mod ttc;

pub use error::Error;
