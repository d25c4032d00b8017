pub mod brownfield;
pub mod events;
pub mod pools;
