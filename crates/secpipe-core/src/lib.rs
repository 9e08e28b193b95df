// secpipe-core - Platform-agnostic security event processing
//
// Everything between "bytes arrived from the stream" and "JSON document ready
// for the data lake" lives here. No I/O, no async, no runtime dependencies:
// the Lambda adapter and the CLI both drive the same `EventProcessor`.

pub mod alert;
pub mod classify;
pub mod content;
pub mod enrich;
pub mod error;
pub mod event;
pub mod partition;
pub mod processor;
pub mod record;
pub mod risk;
pub mod samples;

// Re-export commonly used types
pub use alert::{AlertPolicy, AlertSeverity, EventSummary, SecurityAlert};
pub use content::{classify_content, ContentClassification, ContentSeverity, ThreatCategory};
pub use enrich::{Enricher, GeoInfo, ThreatIntel};
pub use error::{ProcessError, Result};
pub use event::{
    AwsEventFields, CloudTrailFields, EventDetails, GenericFields, GuardDutyFields,
    ProcessedEvent, ProcessingStats,
};
pub use partition::{partition_key, DATA_LAKE_PREFIX};
pub use processor::EventProcessor;
pub use record::{decode_base64_payload, decode_payload};
pub use samples::{validation_events, EventGenerator, SampleEvent};
