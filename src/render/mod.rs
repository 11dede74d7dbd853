//! Output renderers over the render model.

pub mod dot;
pub mod html;

pub use dot::render_dot;
pub use html::render_html_viewer;
