mod state;
mod view;

pub use state::HighlightApp;
