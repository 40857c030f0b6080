pub mod json_file;
pub mod memory;
pub mod settings;
pub mod traits;
