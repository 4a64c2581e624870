pub mod headless;

pub use headless::{find_chrome_executable, launch_headless_browser};
