//! External service integrations.

pub mod directory {
    pub use crate::directory::*;
}

pub mod enrichment {
    pub use crate::enrichment::*;
}
