/// Gavel crypto library.
///
/// The server's role is key custody only: it generates one symmetric key
/// per conversation (AES-256-GCM) and hands the same bytes to both
/// participants. Message content crosses the wire and sits in storage as
/// ciphertext the server cannot interpret.
///
/// The `client` feature adds the encrypt/decrypt half used by clients and
/// by integration tests that exercise ciphertext opacity end to end.

#[cfg(feature = "client")]
pub mod encrypt;

pub mod keys;
