// Adapters layer: concrete implementations of the domain ports (XAPI over http, credentials).

pub mod credentials;
pub mod xapi;
