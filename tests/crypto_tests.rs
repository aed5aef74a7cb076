//! Integration tests for the credvault crypto module.

use credvault::crypto::{derive_key, Envelope, MasterKey};
use credvault::VaultError;

// Low iteration count keeps the suite fast; the production default is
// 100,000.
const ITERATIONS: u32 = 1_000;

fn master() -> MasterKey {
    MasterKey::new("integration-master-key")
}

// ---------------------------------------------------------------------------
// Envelope round-trip
// ---------------------------------------------------------------------------

#[test]
fn seal_open_roundtrip() {
    let plaintext = r#"{"host":"db.internal","password":"s3cr3t"}"#;

    let envelope = Envelope::seal(plaintext, &master(), ITERATIONS).expect("seal should succeed");
    let recovered = envelope.open(&master()).expect("open should succeed");

    assert_eq!(recovered, plaintext);
}

#[test]
fn roundtrip_survives_json_storage() {
    let envelope = Envelope::seal("api-key-123", &master(), ITERATIONS).unwrap();
    let stored = envelope.to_json().unwrap();

    // The stored form is what lands in Credential::encrypted_data.
    let parsed = Envelope::from_json(&stored).unwrap();
    assert_eq!(parsed.open(&master()).unwrap(), "api-key-123");
}

#[test]
fn two_seals_of_same_plaintext_differ() {
    let a = Envelope::seal("same-secret", &master(), ITERATIONS).unwrap();
    let b = Envelope::seal("same-secret", &master(), ITERATIONS).unwrap();

    // Fresh salt and IV per call — no two envelopes may ever match.
    assert_ne!(a.salt, b.salt, "salts must be fresh per seal");
    assert_ne!(a.iv, b.iv, "IVs must be fresh per seal");
    assert_ne!(a.ciphertext, b.ciphertext);
}

// ---------------------------------------------------------------------------
// Fail-closed behavior
// ---------------------------------------------------------------------------

#[test]
fn wrong_master_key_fails_closed() {
    let envelope = Envelope::seal("value", &master(), ITERATIONS).unwrap();
    let result = envelope.open(&MasterKey::new("some-other-key"));
    assert!(matches!(result, Err(VaultError::DecryptionFailed)));
}

#[test]
fn flipped_ciphertext_byte_fails_closed() {
    let envelope = Envelope::seal("value", &master(), ITERATIONS).unwrap();

    for index in 0..envelope.ciphertext.len() {
        let mut tampered = envelope.clone();
        tampered.ciphertext[index] ^= 0x01;
        assert!(
            matches!(tampered.open(&master()), Err(VaultError::DecryptionFailed)),
            "flipping ciphertext byte {index} must fail the tag check"
        );
    }

    // The untouched envelope still opens.
    assert!(envelope.open(&master()).is_ok());
}

#[test]
fn flipped_auth_tag_byte_fails_closed() {
    let envelope = Envelope::seal("value", &master(), ITERATIONS).unwrap();

    for index in 0..envelope.auth_tag.len() {
        let mut tampered = envelope.clone();
        tampered.auth_tag[index] ^= 0x01;
        assert!(
            matches!(tampered.open(&master()), Err(VaultError::DecryptionFailed)),
            "flipping auth tag byte {index} must fail the tag check"
        );
    }
}

#[test]
fn malformed_envelope_json_fails_closed() {
    for blob in ["", "{", "null", "[1,2,3]", r#"{"version":1}"#] {
        assert!(
            matches!(Envelope::from_json(blob), Err(VaultError::DecryptionFailed)),
            "blob {blob:?} must fail closed"
        );
    }
}

#[test]
fn future_envelope_version_fails_closed() {
    let mut envelope = Envelope::seal("value", &master(), ITERATIONS).unwrap();
    envelope.version = 2;
    assert!(matches!(
        envelope.open(&master()),
        Err(VaultError::DecryptionFailed)
    ));
}

// ---------------------------------------------------------------------------
// Key derivation
// ---------------------------------------------------------------------------

#[test]
fn derive_key_is_deterministic() {
    let salt = [7u8; 32];
    let a = derive_key(b"master", &salt, ITERATIONS).unwrap();
    let b = derive_key(b"master", &salt, ITERATIONS).unwrap();
    assert_eq!(a, b);

    let c = derive_key(b"other-master", &salt, ITERATIONS).unwrap();
    assert_ne!(a, c);
}

#[test]
fn envelope_records_iteration_count() {
    // Envelopes sealed under an old iteration policy must stay
    // decryptable after the config changes, so the count travels with
    // the envelope.
    let envelope = Envelope::seal("value", &master(), 2_000).unwrap();
    assert_eq!(envelope.iterations, 2_000);

    let json = envelope.to_json().unwrap();
    let parsed = Envelope::from_json(&json).unwrap();
    assert_eq!(parsed.iterations, 2_000);
    assert_eq!(parsed.open(&master()).unwrap(), "value");
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[test]
fn envelope_wire_fields_are_camel_case() {
    let envelope = Envelope::seal("value", &master(), ITERATIONS).unwrap();
    let json: serde_json::Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();

    for field in ["version", "salt", "iv", "authTag", "ciphertext", "iterations"] {
        assert!(json.get(field).is_some(), "envelope must carry '{field}'");
    }
    // Binary fields are base64 strings, safe for embedding.
    assert!(json["salt"].is_string());
    assert!(json["authTag"].is_string());
}
