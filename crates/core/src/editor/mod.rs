//! Editor-side coordination: dirty tracking, debounced autosave and
//! switching between documents without losing edits.

pub mod autosave;
pub mod coordinator;
pub mod state;

pub use autosave::AutosaveTimer;
pub use coordinator::{CloseOutcome, EditorCoordinator, EditorStatus, SwitchChoice, SwitchOutcome};
pub use state::{Draft, EditorState, SaveState};
