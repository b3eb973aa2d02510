//! Message signing keys and HMAC verification.
//!
//! The registry maps `(signer name, key version)` to a shared secret. Several
//! versions of one name may be registered at once, which is what makes
//! zero-downtime key rotation work: messages signed with a retiring version
//! stay verifiable until that version is removed, after which they fail
//! exactly like forged messages. No failure detail is surfaced to the sender;
//! distinguishing "rotated out" from "forged" would be an oracle.
//!
//! The registry is populated once at startup and only read afterwards, so
//! the hot path takes no locks.

use std::collections::HashMap;

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use tracing::debug;

use crate::config::SignerSpec;
use crate::frame::{Header, HmacHash};

type HmacMd5 = Hmac<Md5>;
type HmacSha1 = Hmac<Sha1>;

/// Registry of named, versioned signing keys.
#[derive(Default)]
pub struct SignerRegistry {
    keys: HashMap<String, HashMap<u32, Vec<u8>>>,
}

impl SignerRegistry {
    pub fn new() -> Self {
        SignerRegistry::default()
    }

    /// Build a registry from configuration entries.
    pub fn from_specs(specs: &[SignerSpec]) -> Self {
        let mut registry = SignerRegistry::new();
        for spec in specs {
            registry.insert(&spec.name, spec.version, spec.key.as_bytes());
        }
        registry
    }

    /// Register one `(name, version)` key. Existing pairs are not replaced;
    /// a registered key is immutable for its lifetime.
    pub fn insert(&mut self, name: &str, version: u32, key: &[u8]) {
        self.keys
            .entry(name.to_string())
            .or_default()
            .entry(version)
            .or_insert_with(|| key.to_vec());
    }

    pub fn contains(&self, name: &str, version: u32) -> bool {
        self.keys.get(name).is_some_and(|versions| versions.contains_key(&version))
    }

    /// Verify a frame's declared signature over `payload`.
    ///
    /// Returns the authenticated signer name, or the empty string when the
    /// header declares no signer (verification not required). `None` means
    /// the message must be dropped: unknown or rotated-out key versions,
    /// missing signature fields, and digest mismatches all land here and are
    /// indistinguishable from the sender's side.
    pub fn verify(&self, payload: &[u8], header: &Header) -> Option<String> {
        let name = match header.hmac_signer.as_deref() {
            Some(name) => name,
            None => return Some(String::new()),
        };
        let version = header.hmac_key_version.unwrap_or(0);
        let Some(key) = self.keys.get(name).and_then(|versions| versions.get(&version)) else {
            debug!(signer = name, version, "no key registered for signer version");
            return None;
        };
        let Some(hash) = header.hmac_hash_function else {
            debug!(signer = name, "signed header missing hash function");
            return None;
        };
        let Some(declared) = header.hmac.as_deref() else {
            debug!(signer = name, "signed header missing digest");
            return None;
        };

        let verified = match hash {
            HmacHash::Md5 => verify_with::<HmacMd5>(key, payload, declared),
            HmacHash::Sha1 => verify_with::<HmacSha1>(key, payload, declared),
        };
        if verified {
            Some(name.to_string())
        } else {
            debug!(signer = name, version, "digest mismatch");
            None
        }
    }
}

/// Compute the HMAC digest a sender would attach to `payload`.
pub fn hmac_digest(hash: HmacHash, key: &[u8], payload: &[u8]) -> Vec<u8> {
    match hash {
        HmacHash::Md5 => digest_with::<HmacMd5>(key, payload),
        HmacHash::Sha1 => digest_with::<HmacSha1>(key, payload),
    }
}

fn digest_with<M: Mac + KeyInit>(key: &[u8], payload: &[u8]) -> Vec<u8> {
    let Ok(mut mac) = <M as Mac>::new_from_slice(key) else {
        return Vec::new();
    };
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

fn verify_with<M: Mac + KeyInit>(key: &[u8], payload: &[u8], declared: &[u8]) -> bool {
    let Ok(mut mac) = <M as Mac>::new_from_slice(key) else {
        return false;
    };
    mac.update(payload);
    // Constant-time comparison.
    mac.verify_slice(declared).is_ok()
}
