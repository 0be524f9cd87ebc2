//! Node resolution and shortest-path computation

pub mod finder;
pub mod resolver;
pub mod transition;

pub use finder::{default_start, find_path_in, shortest_path, PathFinder, ResolvedPath};
pub use resolver::{resolve_node, resolve_with, Resolution, ResolutionStrategy};
pub use transition::Transition;
