//! Signature verification as a narrow, swappable interface. The PGP
//! implementation itself is treated as a black box behind `Verifier`; the
//! only concrete implementation shipped here is `sequoia`-feature-gated,
//! grounded on `paultag-deb-rs`'s `control::openpgp` (the same
//! `VerifierBuilder`/`VerificationHelper` shape, adapted from its
//! `OpenPgpValidator` to this crate's narrower two-method trait) and
//! reusing the `Cert`/`StandardPolicy` types the teacher's `src/sign.rs`
//! already depends on from the signing side.

use crate::error::Result;

/// The recovered plaintext of a clearsigned document.
pub struct InlineVerifyOutput {
    pub data: Vec<u8>,
}

/// Verifies PGP-signed repository metadata. `inline_verify` handles a
/// clearsigned document (`InRelease`) and returns its recovered plaintext;
/// `detached_verify` checks a `Release`/`Release.gpg` pair. A failed
/// verification is `Err(Error::SignatureFailure)` in both cases — nothing
/// downstream of an invalid signature is useful, so there is no separate
/// `valid: bool` to thread through.
pub trait Verifier {
    fn inline_verify(&self, signed: &[u8]) -> Result<InlineVerifyOutput>;
    fn detached_verify(&self, data: &[u8], signature: &[u8]) -> Result<()>;
}

#[cfg(feature = "sequoia")]
mod sequoia_impl {
    use std::collections::HashMap;
    use std::io::Read;
    use std::path::Path;

    use log::{info, warn};
    use sequoia_openpgp::cert::CertParser;
    use sequoia_openpgp::parse::stream::{
        DetachedVerifierBuilder, MessageLayer, MessageStructure, VerificationHelper,
        VerifierBuilder,
    };
    use sequoia_openpgp::parse::Parse;
    use sequoia_openpgp::policy::StandardPolicy;
    use sequoia_openpgp::{Cert, Fingerprint, KeyHandle};

    use crate::error::{Error, Result};

    use super::Verifier as VerifierTrait;

    /// A `Verifier` backed by a keyring of trusted certificates, loaded once
    /// at construction time.
    pub struct SequoiaVerifier {
        keys: HashMap<Fingerprint, Cert>,
    }

    struct Helper<'a> {
        keys: &'a HashMap<Fingerprint, Cert>,
        matched: bool,
    }

    impl VerificationHelper for &mut Helper<'_> {
        fn get_certs(&mut self, _ids: &[KeyHandle]) -> sequoia_openpgp::Result<Vec<Cert>> {
            Ok(self.keys.values().cloned().collect())
        }

        fn check(&mut self, structure: MessageStructure) -> sequoia_openpgp::Result<()> {
            for layer in structure.into_iter() {
                if let MessageLayer::SignatureGroup { results } = layer {
                    for result in results.into_iter().flatten() {
                        if result
                            .sig
                            .issuer_fingerprints()
                            .any(|fp| self.keys.contains_key(fp))
                        {
                            self.matched = true;
                        }
                    }
                }
            }
            Ok(())
        }
    }

    impl SequoiaVerifier {
        /// Load every certificate found in `keyring_path` (a keyring file,
        /// possibly containing several armored certs).
        pub fn from_keyring(keyring_path: impl AsRef<Path>) -> Result<Self> {
            let mut keys = HashMap::new();
            for cert in CertParser::from_file(keyring_path.as_ref())
                .map_err(|e| Error::SignatureFailure(e.to_string()))?
            {
                let cert = cert.map_err(|e| Error::SignatureFailure(e.to_string()))?;
                keys.insert(cert.fingerprint(), cert.clone());
                for key in cert.keys() {
                    keys.insert(key.key().fingerprint(), cert.clone());
                }
            }
            Ok(SequoiaVerifier { keys })
        }
    }

    impl VerifierTrait for SequoiaVerifier {
        fn inline_verify(&self, signed: &[u8]) -> Result<super::InlineVerifyOutput> {
            let policy = StandardPolicy::new();
            let mut helper = Helper {
                keys: &self.keys,
                matched: false,
            };

            let mut verifier = VerifierBuilder::from_bytes(signed)
                .map_err(|e| Error::SignatureFailure(e.to_string()))?
                .with_policy(&policy, None, &mut helper)
                .map_err(|e| Error::SignatureFailure(e.to_string()))?;

            let mut content = Vec::new();
            verifier
                .read_to_end(&mut content)
                .map_err(|e| Error::SignatureFailure(e.to_string()))?;
            drop(verifier);

            if !helper.matched {
                warn!("inline signature verification failed: no trusted key matched");
                return Err(Error::SignatureFailure(
                    "no signature matched a trusted key".to_string(),
                ));
            }
            info!("inline signature verified");
            Ok(super::InlineVerifyOutput { data: content })
        }

        fn detached_verify(&self, data: &[u8], signature: &[u8]) -> Result<()> {
            let policy = StandardPolicy::new();
            let mut helper = Helper {
                keys: &self.keys,
                matched: false,
            };

            let mut verifier = DetachedVerifierBuilder::from_bytes(signature)
                .map_err(|e| Error::SignatureFailure(e.to_string()))?
                .with_policy(&policy, None, &mut helper)
                .map_err(|e| Error::SignatureFailure(e.to_string()))?;

            verifier
                .verify_bytes(data)
                .map_err(|e| Error::SignatureFailure(e.to_string()))?;

            if !helper.matched {
                warn!("detached signature verification failed: no trusted key matched");
                return Err(Error::SignatureFailure(
                    "no signature matched a trusted key".to_string(),
                ));
            }
            info!("detached signature verified");
            Ok(())
        }
    }
}

#[cfg(feature = "sequoia")]
pub use sequoia_impl::SequoiaVerifier;

#[cfg(all(test, feature = "sequoia"))]
mod tests {
    // A true round-trip test needs a generated keypair and a signed
    // message; exercising `sign_message` from the teacher's retained
    // `sign.rs` against `SequoiaVerifier::inline_verify` is left as an
    // integration test once a fixture keyring is checked in.
}
