//! PDF ingestion: parsing, splitting and indexing

pub mod parser;
mod processor;
pub mod splitter;

pub use parser::{PageContent, ParsedDocument, PdfParser};
pub use processor::{IngestOutcome, IngestPipeline};
pub use splitter::{SplitChunk, TextSplitter};
