//! Memory card entity
//!
//! Cards are owned by the surrounding system; the draw engine only mutates
//! the two selection-statistics fields through [`MemoryCard::mark_drawn`].

pub mod models;

pub use models::MemoryCard;
