/// Tools Module
///
/// Each tool lives in its own module and exports a `register` function that
/// adds it to the registry during startup.

pub mod echo;
pub mod hello_world;

use crate::core::registry::ToolRegistry;

/// Build the static tool registry.
///
/// Registration order is the order `tools/list` reports. Add new tools here:
/// `your_tool::register(&mut registry);`
pub fn registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    hello_world::register(&mut registry);
    echo::register(&mut registry);
    registry
}
