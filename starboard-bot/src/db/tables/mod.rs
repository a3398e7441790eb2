//! Database table modules - extends Database with domain-specific methods
//!
//! Each module adds `impl Database` blocks with methods for a specific table group.

mod guilds; // guilds (board channel, watch list, pin mirror map)
