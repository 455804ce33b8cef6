//! Upstream integrations and the flows built on them

pub mod callsign_lookup;
pub mod directory;
pub mod hamqth;
pub mod llm_client;
pub mod qso_extractor;

pub use callsign_lookup::{CallsignLookup, CallsignLookupService, LookupSource};
pub use directory::{DirectoryApi, DirectoryError, DirectoryRecord, DirectorySession};
pub use hamqth::HamQthClient;
pub use llm_client::{AnthropicClient, CompletionError, CompletionModel};
pub use qso_extractor::{ExtractionError, ExtractionResult, ParsedQso, QsoExtractor};
