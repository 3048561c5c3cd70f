//! Domain services. Transport code calls into these; they never touch sockets.

pub mod registry;
