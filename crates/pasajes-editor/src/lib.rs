//! Client-side record editor for pasajes
//!
//! Keeps one form, one table and the remote collection consistent while the
//! user filters, creates, edits and deletes records.
//!
//! - `metadata` - MetadataCache, option lists for the selects
//! - `store` - RecordStore, the last fetched snapshot
//! - `filter` - FilterController, active route scope
//! - `session` - EditorSession with its explicit Create/Edit mode
//! - `form` - FormValues and payload conversion
//! - `renderer` - ListRenderer, snapshot to table rows
//! - `controller` - EditorController, the single owner of all of the above

pub mod clock;
pub mod controller;
pub mod error;
pub mod filter;
pub mod form;
pub mod metadata;
pub mod renderer;
pub mod session;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use controller::{Confirm, DELETE_PROMPT, DeleteOutcome, EditorController, SubmitOutcome};
pub use error::EditorError;
pub use filter::FilterController;
pub use form::{FormField, FormValues};
pub use metadata::{MetadataCache, SelectOption, SelectionControls};
pub use renderer::{ListRenderer, RowAction, RowView, TableBody};
pub use session::{EditorMode, EditorSession};
pub use store::{RecordStore, Snapshot};
