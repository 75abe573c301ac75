pub mod installer;
pub mod registry;

pub use installer::InstallCoordinator;
pub use registry::{LanguageRegistry, LanguageSnapshot};
