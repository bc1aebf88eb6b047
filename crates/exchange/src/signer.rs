use exlink_core::{ExLinkError, Result, VenueCredentials};
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};

/// Produces the authentication headers for a private request body.
pub trait RequestSigner: Send + Sync {
    /// Hex-encoded signature over the exact body bytes.
    fn sign(&self, payload: &[u8]) -> Result<String>;
    fn api_key_header(&self) -> &str;
    fn signature_header(&self) -> &str;
    fn api_key(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HmacAlgorithm {
    Sha256,
    Sha512,
}

#[derive(Clone)]
pub struct HmacSigner {
    credentials: VenueCredentials,
    algorithm: HmacAlgorithm,
    key_header: String,
    sign_header: String,
}

impl HmacSigner {
    pub fn new(
        credentials: VenueCredentials,
        algorithm: HmacAlgorithm,
        key_header: impl Into<String>,
        sign_header: impl Into<String>,
    ) -> Result<Self> {
        if credentials.api_key.is_empty() || credentials.api_secret.is_empty() {
            return Err(ExLinkError::Authentication(
                "API key and secret must both be set".to_string(),
            ));
        }

        Ok(Self {
            credentials,
            algorithm,
            key_header: key_header.into(),
            sign_header: sign_header.into(),
        })
    }

    pub fn sha512(
        credentials: VenueCredentials,
        key_header: impl Into<String>,
        sign_header: impl Into<String>,
    ) -> Result<Self> {
        Self::new(credentials, HmacAlgorithm::Sha512, key_header, sign_header)
    }

    pub fn algorithm(&self) -> HmacAlgorithm {
        self.algorithm
    }
}

impl std::fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSigner")
            .field("credentials", &self.credentials)
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

impl RequestSigner for HmacSigner {
    fn sign(&self, payload: &[u8]) -> Result<String> {
        let secret = self.credentials.api_secret.as_bytes();

        let signature = match self.algorithm {
            HmacAlgorithm::Sha256 => {
                let mut mac = Hmac::<Sha256>::new_from_slice(secret).map_err(|e| {
                    ExLinkError::Authentication(format!("Invalid secret key: {}", e))
                })?;
                mac.update(payload);
                hex::encode(mac.finalize().into_bytes())
            }
            HmacAlgorithm::Sha512 => {
                let mut mac = Hmac::<Sha512>::new_from_slice(secret).map_err(|e| {
                    ExLinkError::Authentication(format!("Invalid secret key: {}", e))
                })?;
                mac.update(payload);
                hex::encode(mac.finalize().into_bytes())
            }
        };

        Ok(signature)
    }

    fn api_key_header(&self) -> &str {
        &self.key_header
    }

    fn signature_header(&self) -> &str {
        &self.sign_header
    }

    fn api_key(&self) -> &str {
        &self.credentials.api_key
    }
}

/// An ordered `application/x-www-form-urlencoded` body.
///
/// Field order is part of what gets signed, so pairs are emitted exactly in
/// insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormBody {
    pairs: Vec<(String, String)>,
}

impl FormBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl ToString) {
        self.pairs.push((key.into(), value.to_string()));
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish()
    }
}
