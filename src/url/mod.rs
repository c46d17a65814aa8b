//! URL handling module for Sumi-Harvest
//!
//! This module provides URL normalization, same-site confinement, and file-type
//! classification of discovered links.

mod classify;
mod domain;
mod normalize;

pub use classify::{check_content_type, expected_mime, FileCheck, FileClassifier};
pub use domain::{extract_domain, is_same_site, site_root};
pub use normalize::{normalize, NormalizedUrl};
