// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// TLS certificate generation — ECDSA P-256 key pair for the scheduler's
// IPPS listener — and local-authentication credential issuance (§5/§6).
//
// # Design note
//
// `ring` provides key generation and signing primitives but does **not**
// include an X.509 certificate builder. This module generates the ECDSA
// P-256 key pair (PKCS#8 DER) and exposes the raw material; a full
// self-signed X.509 certificate requires an additional crate such as
// `rcgen`, integrated where TLS is actually configured. The key pair
// produced here can be fed directly into `rcgen::Certificate::from_params()`
// or `rustls::pki_types::PrivateKeyDer::Pkcs8`.

use std::path::Path;

use pressline_core::PresslineError;
use ring::rand::{SecureRandom, SystemRandom};
use ring::signature::{ECDSA_P256_SHA256_ASN1_SIGNING, EcdsaKeyPair, KeyPair};
use tracing::{debug, instrument};

/// An ECDSA P-256 key pair suitable for TLS server authentication.
///
/// The private key is stored as a PKCS#8 v1 DER document. The public key is
/// the uncompressed SEC1 encoding (0x04 || x || y, 65 bytes).
pub struct SelfSignedCert {
    /// PKCS#8 v1 DER-encoded private key (includes the public key).
    pkcs8_der: Vec<u8>,
    /// Uncompressed SEC1 public key bytes.
    public_key_der: Vec<u8>,
}

impl SelfSignedCert {
    /// Generate a fresh ECDSA P-256 key pair using the OS CSPRNG.
    ///
    /// This does **not** produce an X.509 certificate — only the raw key
    /// material. See the module-level docs for how to turn this into a
    /// self-signed cert.
    #[instrument]
    pub fn generate() -> Result<Self, PresslineError> {
        let rng = SystemRandom::new();

        let pkcs8_document = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng)
            .map_err(|e| PresslineError::Certificate(format!("key generation failed: {e}")))?;

        let pkcs8_der = pkcs8_document.as_ref().to_vec();

        // Re-parse so we can extract the public key.
        let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &pkcs8_der, &rng)
            .map_err(|e| PresslineError::Certificate(format!("key parsing failed: {e}")))?;

        let public_key_der = key_pair.public_key().as_ref().to_vec();

        debug!(
            pkcs8_len = pkcs8_der.len(),
            pubkey_len = public_key_der.len(),
            "ECDSA P-256 key pair generated"
        );

        Ok(Self {
            pkcs8_der,
            public_key_der,
        })
    }

    /// The PKCS#8 v1 DER-encoded private key.
    ///
    /// Pass this to `rustls::pki_types::PrivateKeyDer::Pkcs8` or to `rcgen`
    /// for certificate generation.
    pub fn private_key_pkcs8_der(&self) -> &[u8] {
        &self.pkcs8_der
    }

    /// The uncompressed SEC1 public key (65 bytes for P-256).
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key_der
    }

    /// Sign `message` with the private key (ECDSA P-256 + SHA-256, ASN.1
    /// DER-encoded signature).
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, PresslineError> {
        let rng = SystemRandom::new();

        let key_pair =
            EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &self.pkcs8_der, &rng)
                .map_err(|e| PresslineError::Certificate(format!("key load failed: {e}")))?;

        let sig = key_pair
            .sign(&rng, message)
            .map_err(|e| PresslineError::Certificate(format!("signing failed: {e}")))?;

        Ok(sig.as_ref().to_vec())
    }
}

/// Permission policy for a local-authentication certificate file (§5):
/// owner-only read, group-readable for a configured administrative group;
/// falls back to a plain owner-only mode on platforms without group-ACL
/// support.
fn cert_file_mode(cert_group: Option<&str>) -> u32 {
    if cert_group.is_some() {
        0o640
    } else {
        0o440
    }
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: u32) -> Result<(), PresslineError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).map_err(PresslineError::Io)
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: u32) -> Result<(), PresslineError> {
    Ok(())
}

/// Issue a per-PID local-authentication credential (§4/§6): 32 hex ASCII
/// characters, written to `<state_dir>/<pid>` with the mode from
/// [`cert_file_mode`]. Group ownership itself is left to deployment
/// tooling — this crate has no dependency able to resolve a group name to a
/// platform gid, so it only sets the permission bits, not the owning group.
pub fn issue_local_auth_cert(state_dir: &Path, pid: u32, cert_group: Option<&str>) -> Result<String, PresslineError> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes).map_err(|e| PresslineError::Certificate(format!("random generation failed: {e}")))?;
    let credential = hex::encode(bytes);
    debug_assert_eq!(credential.len(), 32);

    std::fs::create_dir_all(state_dir).map_err(PresslineError::Io)?;
    let path = state_dir.join(pid.to_string());
    std::fs::write(&path, &credential).map_err(PresslineError::Io)?;
    apply_mode(&path, cert_file_mode(cert_group))?;

    debug!(pid, path = %path.display(), "local authentication certificate issued");
    Ok(credential)
}

/// Read back the credential issued for `pid`, if any.
pub fn read_local_auth_cert(state_dir: &Path, pid: u32) -> Result<String, PresslineError> {
    let path = state_dir.join(pid.to_string());
    std::fs::read_to_string(&path).map_err(PresslineError::Io)
}

/// Verify that `presented` is the 32-hex-character credential issued for
/// `pid`. Rejects anything that doesn't match exactly, including a
/// well-formed but differently-issued 32-hex-character string.
pub fn verify_local_auth_cert(state_dir: &Path, pid: u32, presented: &str) -> Result<bool, PresslineError> {
    let issued = read_local_auth_cert(state_dir, pid)?;
    Ok(issued == presented)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ring::signature::{ECDSA_P256_SHA256_ASN1, UnparsedPublicKey};

    #[test]
    fn generate_key_pair() {
        let cert = SelfSignedCert::generate().expect("key generation failed");

        // PKCS#8 for P-256 is typically ~138 bytes.
        assert!(
            cert.private_key_pkcs8_der().len() > 100,
            "PKCS#8 DER looks too short"
        );

        // Uncompressed P-256 public key: 1 (0x04) + 32 + 32 = 65 bytes.
        assert_eq!(cert.public_key_der().len(), 65);
        assert_eq!(cert.public_key_der()[0], 0x04, "must be uncompressed point");
    }

    #[test]
    fn sign_and_verify() {
        let cert = SelfSignedCert::generate().expect("key generation failed");
        let message = b"Pressline TLS handshake test";

        let signature = cert.sign(message).expect("signing failed");

        let public_key = UnparsedPublicKey::new(&ECDSA_P256_SHA256_ASN1, cert.public_key_der());

        public_key
            .verify(message, &signature)
            .expect("signature verification failed");
    }

    #[test]
    fn different_keys_each_time() {
        let a = SelfSignedCert::generate().expect("gen a");
        let b = SelfSignedCert::generate().expect("gen b");
        assert_ne!(
            a.private_key_pkcs8_der(),
            b.private_key_pkcs8_der(),
            "two generations must produce different keys"
        );
    }

    #[test]
    fn issued_credential_is_32_hex_characters() {
        let dir = tempfile::tempdir().unwrap();
        let credential = issue_local_auth_cert(dir.path(), 4242, None).unwrap();
        assert_eq!(credential.len(), 32);
        assert!(credential.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn verify_accepts_the_issuing_pids_own_credential() {
        let dir = tempfile::tempdir().unwrap();
        let credential = issue_local_auth_cert(dir.path(), 100, None).unwrap();
        assert!(verify_local_auth_cert(dir.path(), 100, &credential).unwrap());
    }

    #[test]
    fn verify_rejects_any_other_string() {
        let dir = tempfile::tempdir().unwrap();
        issue_local_auth_cert(dir.path(), 100, None).unwrap();
        assert!(!verify_local_auth_cert(dir.path(), 100, "0".repeat(32).as_str()).unwrap());
    }

    #[test]
    fn mode_falls_back_without_a_configured_group() {
        assert_eq!(cert_file_mode(None), 0o440);
        assert_eq!(cert_file_mode(Some("lp")), 0o640);
    }
}
