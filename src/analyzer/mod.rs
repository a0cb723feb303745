//! Content-type detection and chunking-configuration resolution.

pub mod chunk_config;
pub mod content_type;

pub use chunk_config::{analyze_content, preview_chunking, ChunkPreview, ChunkingConfig, ChunkingStrategy};
pub use content_type::{detect_content_type, ContentType, Detection, DetectionEvidence};
