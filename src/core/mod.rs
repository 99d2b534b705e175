pub mod channels;
pub mod duration;
pub mod filter;
pub mod http;
pub mod pipeline;
pub mod records;
pub mod strategy;
pub mod youtube;
