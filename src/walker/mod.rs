//! Recursive enumeration of video files.
//!
//! Both walkers skip recycle-bin and system folders, keep files with a known
//! video extension and log-and-skip directories they cannot read. Results
//! are ordered sets, so duplicates collapse and output order is stable.

mod local;
mod remote;

pub use local::{list_local_video_files, list_local_video_files_blocking};
pub use remote::list_video_files;
