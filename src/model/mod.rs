//! CycloneDX document model.
//!
//! The structures mirror CycloneDX JSON closely. Keys that the merge engine
//! reasons about are typed; everything else is preserved in ordered
//! `extensions` maps so that unknown or vendor-specific data survives a merge.
//!
//! ```ignore
//! let bom = parse_bom_str(&content)?;
//! for component in bom.all_components() {
//!     println!("{}", component.display_name());
//! }
//! ```

mod bom;
mod component;
mod identifiers;
mod spec_version;
mod vulnerability;

pub use bom::*;
pub use component::*;
pub use identifiers::*;
pub use spec_version::*;
pub use vulnerability::*;
