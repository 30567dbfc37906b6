//! Command-line front end for the Omphalos hunt toolkit.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Layered TOML / env / flag configuration |
//! | [`files`] | Reading hunt data, writing results, appending jumps |
//! | [`commands`] | One handler per subcommand |

pub mod commands;
pub mod config;
pub mod files;
