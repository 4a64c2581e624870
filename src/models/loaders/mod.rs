pub mod roster_loader;

pub use roster_loader::{load_roster, load_roster_file};
