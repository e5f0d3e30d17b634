//! End-to-end tests driving a full run against an in-memory marketplace.

mod mock_marketplace;
mod pipeline;
