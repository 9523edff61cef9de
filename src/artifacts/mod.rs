//! Versioned artifact bundle consumed by the scoring side: encoders, scaler
//! bounds, final feature order, decision threshold and classifier.

mod bundle;

pub use bundle::{checksum_path, ArtifactBundle, StagedBundle, BUNDLE_FORMAT_VERSION};
