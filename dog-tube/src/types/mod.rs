pub mod ids;
pub mod priority;
pub mod capabilities;

pub use ids::{JobId, DeliveryTag};
pub use priority::Priority;
pub use capabilities::QueueCapabilities;
