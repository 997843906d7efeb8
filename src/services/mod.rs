//! Domain services: the ingestion pipeline and the collaborators it drives.

pub mod aspect;
pub mod ingest;
pub mod keys;
pub mod media;
pub mod object_store;
pub mod staging;
pub mod thumbnail;
pub mod video_store;
