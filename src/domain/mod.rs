// Domain layer - Value types shared by every other layer
pub mod error;
pub mod format;
pub mod series;
pub mod views;
