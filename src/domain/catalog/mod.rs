// ============================================================================
// Catalog - restaurants and their menus
// ============================================================================

pub mod errors;
pub mod model;
pub mod service;

pub use errors::*;
pub use model::*;
pub use service::*;
