pub mod rollups;
mod segments;
