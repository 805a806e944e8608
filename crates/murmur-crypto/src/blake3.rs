//! Domain-separated BLAKE3 hashing for the Murmur protocol.
//!
//! BLAKE3 is used outside the proving circuit only: deriving identity
//! secrets from a user secret, hashing signals and topic strings into the
//! scalar field. Each purpose has its own registered context string.

/// Registered BLAKE3 context strings.
/// Using an unregistered context string is a protocol violation.
pub mod contexts {
    pub const IDENTITY_TRAPDOOR: &str = "Murmur v1 identity-trapdoor";
    pub const IDENTITY_NULLIFIER: &str = "Murmur v1 identity-nullifier";
    pub const SIGNAL_HASH: &str = "Murmur v1 signal-hash";
    pub const EXTERNAL_NULLIFIER: &str = "Murmur v1 external-nullifier";

    /// All registered context strings.
    pub const ALL_CONTEXTS: &[&str] = &[
        IDENTITY_TRAPDOOR,
        IDENTITY_NULLIFIER,
        SIGNAL_HASH,
        EXTERNAL_NULLIFIER,
    ];
}

/// Derive a key using BLAKE3's built-in key derivation mode.
///
/// # Arguments
///
/// * `context` - A registered context string (must start with "Murmur v1 ")
/// * `key_material` - The input key material
pub fn derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut hasher = ::blake3::Hasher::new_derive_key(context);
    hasher.update(key_material);
    let hash = hasher.finalize();
    out.copy_from_slice(hash.as_bytes());
    out
}

/// Derive a 32-byte digest whose big-endian value always fits the scalar field.
///
/// The most significant byte is cleared, leaving a 248-bit value, which is
/// below the BLS12-381 scalar modulus.
pub fn field_digest(context: &str, data: &[u8]) -> [u8; 32] {
    let mut out = derive_key(context, data);
    out[0] = 0;
    out
}
