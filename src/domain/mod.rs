// Market data domain
pub mod market;

// Feature and model definitions
pub mod ml;

// Port interfaces
pub mod ports;

// Repository traits
pub mod repositories;

// Data integrity checks
pub mod validation;

// Domain-specific error types
pub mod errors;
