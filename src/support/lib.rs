pub mod app;
pub mod camera;
pub mod input;
pub mod logger;
pub mod settings;
pub mod vulkan;
