//! Value-transform DSL
//!
//! - `syntax`: parse `Verb(args)` text into a [`Transform`] (at profile load)
//! - `operations`: apply a [`Transform`] to one cell (per row)
//!
//! ```rust,ignore
//! use crmload::transform::dsl::Transform;
//!
//! let zip = Transform::parse("Zip5", "Zip")?;
//! assert_eq!(zip.apply("12345-6789", &row), "12345");
//! ```

pub mod operations;
pub mod syntax;

pub use operations::{transforms_description, Transform};

use crate::models::RowView;

/// Apply an optional transform; `None` leaves the value untouched.
pub fn apply(raw: &str, transform: Option<&Transform>, row: &RowView<'_>) -> String {
    match transform {
        Some(t) => t.apply(raw, row),
        None => raw.to_string(),
    }
}
