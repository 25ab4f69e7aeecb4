//! External service integrations.

pub mod providers {
    pub use crate::providers::*;
}

pub mod notifier {
    pub use crate::notifier::*;
}
