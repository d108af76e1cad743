//! The simulation engine (C2-C5): propagators, rule expansion, the
//! fixed-point scheduler, and the resimulation policy that ties them
//! together. This is the hard part the specification is about; the HTTP
//! adapter in `api` is a thin shell around [`resim::resimulate`].

pub mod expansion;
pub mod propagator;
pub mod resim;
pub mod scheduler;
