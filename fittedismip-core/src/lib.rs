pub mod artifact;
pub mod climate;
pub mod clock;
pub mod fingerprint;
pub mod locations;
pub mod parameters;
pub mod rng;
pub mod years;

pub mod errors;
