//! Contacts sync CLI - Entry Point
//!
//! Minimal entry point that delegates to the app module.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    contacts_sync::run().await
}
