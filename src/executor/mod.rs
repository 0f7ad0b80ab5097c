pub mod builtins;
pub mod engine;
pub mod path_resolver;
pub mod redirect;
pub mod spawn;

pub use builtins::{BuiltinCommand, BuiltinManager};
pub use engine::Engine;
pub use path_resolver::PathResolver;
pub use spawn::{Launcher, OsLauncher, StageIo, Stream};
