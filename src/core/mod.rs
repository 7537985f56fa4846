// Domain-layer modules and shared errors/models
pub mod domain {
    pub use crate::domain::*;
}

pub mod evaluation {
    pub use crate::evaluation::*;
}

pub mod pipeline {
    pub use crate::pipeline::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
