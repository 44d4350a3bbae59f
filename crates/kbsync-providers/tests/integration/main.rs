//! Integration tests for kbsync-providers
//!
//! Uses wiremock to simulate each provider API and verifies listing,
//! pagination, single-item fetch and error classification end to end
//! through the `IRemoteSource` port.

mod common;

mod test_azure;
mod test_dropbox;
mod test_github;
mod test_google;
mod test_notion;
mod test_registry;
