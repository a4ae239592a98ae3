//! 业务能力层（Services）
//!
//! - `diff_engine` - 字符级差异计算，纯函数
//! - `autosave` - 字典编辑的防抖保存
//! - `upload_service` - 字幕文件校验与上传

pub mod autosave;
pub mod diff_engine;
pub mod upload_service;

pub use autosave::AutoSaveCoordinator;
pub use diff_engine::{compute_diff, DiffSegment, SegmentKind};
pub use upload_service::{read_local_files, UploadService};
