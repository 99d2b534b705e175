pub mod input;
pub mod list;
pub mod progress;
pub mod viewer;

pub use input::InputField;
pub use list::VideoList;
pub use progress::ProgressBar;
pub use viewer::Viewer;
