//! Drawing persistence: the file codec and the on-disk store.
//!
//! The codec turns the element sequence into the durable JSON format
//! (including the backward-compatibility coercions applied on load); the
//! store handles atomic file writes, locking, enumeration and SVG export
//! targets. Scheduling of deferred saves belongs to the embedding
//! application; [`storage::DrawingStore::save_persistent`] makes those
//! writes coalesce by skipping unchanged contents.

pub mod codec;
pub mod storage;

pub use codec::{CodecError, deserialize_elements, serialize_elements};
pub use storage::{DrawingFileInfo, DrawingStore, PERSISTENT_NAME};
