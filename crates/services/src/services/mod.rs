pub mod clip_editor;
pub mod config;
pub mod draft_store;
pub mod editor;
pub mod gesture;
pub mod notices;
pub mod progress;
pub mod remote;
pub mod schedule;
pub mod scoring;
pub mod slots;
pub mod snippets;
pub mod stage;
pub mod sync;
pub mod tags;
pub mod timeline;
pub mod workbench;
