//! Chartsmith Transform - the object-to-template engine
//!
//! Decoded Kubernetes objects enter the [`App`] dispatcher one at a time and
//! are routed to exactly one per-kind [`Processor`] (or the passthrough
//! default). Each processor produces a [`Fragment`]: template text plus the
//! values subtree it owns. Fragments are grouped by destination file and
//! values are merged into one chart-wide tree.

pub mod app;
pub mod error;
pub mod meta;
pub mod object;
pub mod pod;
pub mod processors;

pub use app::{App, Chart};
pub use error::{Result, TransformError};
pub use object::{Gvk, ManifestObject};
pub use processors::{Fragment, Processor};
