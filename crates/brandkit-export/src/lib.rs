pub mod docx;
pub mod html;
pub mod pdf;
pub mod renderer;

pub use renderer::DocumentRenderer;
