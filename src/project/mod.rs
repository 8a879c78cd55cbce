// Project persistence - JSON snapshots, single-section files and presets

pub mod manager;
pub mod presets;
pub mod snapshot;

pub use manager::{
    ProjectError, ProjectManager, load_session, read_section, read_snapshot, save_section,
    save_snapshot,
};
pub use presets::PresetLibrary;
pub use snapshot::{TrainingSnapshot, validate_sections};
