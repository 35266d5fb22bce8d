//! Everything around the external transfer tool: measuring the source, validating the
//! environment, assembling the command line and following the tool's output.

pub mod command;
pub mod completion;
pub mod guard;
pub mod heartbeat;
pub mod prerequisite;
pub mod scan;
pub mod uploader;

pub use command::TransferCommand;
pub use scan::SourceTotals;
pub use uploader::{UploadOutcome, Uploader};
