//! Persistent storage services: a re-probable writability check and the
//! reconciler that removes artifacts nothing references anymore.

pub mod probe;
pub mod reconcile;

pub use probe::{StorageProbe, DEFAULT_TTL};
pub use reconcile::{ReconcileFailure, ReconcileReport, Reconciler, ReferenceSource, StaticReferences};
