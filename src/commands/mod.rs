// Declarative commands
pub mod reconcile;

// Inspection commands
pub mod doctor;
pub mod list;
