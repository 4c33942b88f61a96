pub mod analysis;
pub mod call;
pub mod campaign;
pub mod email;
pub mod lead;
pub mod strategy;
