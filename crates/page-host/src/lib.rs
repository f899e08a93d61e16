//! Page host seam for PagePilot.
//!
//! The concrete browser integration lives outside this workspace; the
//! execution core only depends on the [`PageHost`] trait defined here.
//! [`MockPageHost`] provides the offline implementation used by the test
//! suites and the CLI's dry-run mode.

pub mod errors;
pub mod host;
pub mod mock;

pub use errors::HostError;
pub use host::PageHost;
pub use mock::{HostCall, MockPageHost};
