pub mod api;
pub mod dictionary;
pub mod subtitle;
pub mod task;

pub use api::{
    DictionaryStats, FileRef, HistoricalStats, ProcessingOptions, ResultFile, ResultResponse,
    StartProcessingRequest, StatusResponse, TermCount, UploadedFile,
};
pub use dictionary::{
    CorrectionDictionary, CorrectionTerm, Dictionary, DictionaryDocument, DictionaryKind,
    SaveStatus, ShieldingDictionary,
};
pub use subtitle::{to_srt, FileStatus, SubtitleEntry, SubtitleFile};
pub use task::{ProcessingStatistics, ReplacementCount, Task, TaskStatus};
