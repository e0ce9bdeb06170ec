//! Workflow setup: pseudopotential resolution and first-snapshot preparation.

pub mod preparer;
pub mod pseudos;

pub use preparer::{DefaultPreparer, InputPreparer, PrepareError};
pub use pseudos::{PseudoError, PseudoFamilyLookup, StaticPseudoLibrary, kind_names, resolve_pseudos};
