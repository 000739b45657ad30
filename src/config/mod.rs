pub mod crypto;
pub mod document;
pub mod settings;
pub mod store;

pub use document::ConfigDocument;
pub use settings::Settings;
pub use store::ConfigStore;
