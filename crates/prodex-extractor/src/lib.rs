pub mod cascade;
pub mod diagnostics;
pub mod error;
pub mod fallback;
pub mod fetch;
pub mod heuristic;
pub mod meta;
pub mod normalize;
pub mod payload;
pub mod reader;
pub mod render;
mod retry;
pub mod settings;
pub mod structured;

pub use cascade::{AttemptOutcome, Extraction, ExtractionAttempt, Extractor, Stage};
pub use diagnostics::{describe_fields, FieldReport};
pub use error::{ErrorKind, ExtractorError, RenderPhase};
pub use fetch::{has_product_markers, validate_url, FetchMode, StaticFetcher};
pub use heuristic::{extract_availability, extract_price};
pub use meta::parse_meta;
pub use payload::{PayloadKind, ProductPayload};
pub use render::{ChromiumRenderer, DisabledRenderer, PageRenderer};
pub use settings::ExtractorSettings;
pub use structured::parse_structured;
