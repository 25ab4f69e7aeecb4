// Domain-layer modules and shared errors/models
pub mod scoring {
    pub use crate::scoring::*;
}

pub mod orchestrator {
    pub use crate::orchestrator::*;
}

pub mod composer {
    pub use crate::composer::*;
}

pub mod followup {
    pub use crate::followup::*;
}

pub mod catalog {
    pub use crate::catalog::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
