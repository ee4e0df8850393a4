//! Core modules for HoopSense

pub mod ingest;
pub mod merge;
pub mod basket;
pub mod machine;
pub mod classifier;
pub mod replay;
pub mod wire;
pub mod api;

pub use ingest::{IngestReport, SampleIngest};
pub use merge::{ChronoMerge, MergeBound, MergeMode};
pub use basket::{
    is_basket_event, BasketPolicyKind, BasketTypePolicy, ImpactPresencePolicy, SignalRatePolicy,
};
pub use machine::ShotStateMachine;
pub use classifier::{ClassifierOptions, ShotClassifier};
pub use replay::{CsvReplay, ReplayError, ReplaySummary, SessionLog};
pub use wire::{decode_packet, encode_packet, ImuReading, Packet, TofReading, WireError};
pub use api::{create_router, router, run_server, run_udp_listener, AppState, Ingested, ShotRecord};
