pub mod assembler;
pub mod benchmark;
pub mod cache;
pub mod collaborators;
pub mod config;
pub mod document;
pub mod job;
pub mod metrics;
pub mod orchestrator;
pub mod processor;
pub mod progress;
pub mod quality;
pub mod testing;

pub use assembler::{AssemblyError, AssemblyPolicy, VideoAssembler};
pub use benchmark::{BenchmarkHistory, BenchmarkRecord, BenchmarkSummary, UnitBenchmark};
pub use cache::{
    open_cache, CacheEntry, CacheError, CacheKey, CacheStats, InMemoryNarrationCache,
    NarrationCache, SqliteNarrationCache,
};
pub use collaborators::{
    ClipConcatenator, CollaboratorError, Collaborators, HttpCollaborators, NarrationGenerator,
    QuizGenerator, UnitRenderer,
};
pub use config::{
    load_config, load_config_from_str, validate_config, CacheBackend, Config, ConfigError,
    SanitizedConfig,
};
pub use document::{chunk_long_form, Document, UnitContent};
pub use job::{Job, JobError, JobMode, JobRegistry, JobResult, JobStatus, JobSummary};
pub use orchestrator::{JobOrchestrator, JobRequest, OrchestratorConfig, OrchestratorError};
pub use processor::{ProcessorConfig, UnitProcessor, UnitResult};
pub use progress::{
    subscribe_with_retry, LocalProgressTransport, MergedView, ProgressBroadcaster, ProgressConfig,
    ProgressError, ProgressEvent, ProgressKind, ProgressObserver, ProgressStream,
    ProgressTransport,
};
pub use quality::NarrationMeta;
