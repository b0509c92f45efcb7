use {
  crate::engine::Error,
  bitcoin::{
    base58,
    secp256k1::{rand, Secp256k1, SecretKey, XOnlyPublicKey},
    Network,
  },
  std::fmt::{self, Debug, Formatter},
};

const MAINNET_VERSION: u8 = 0x80;
const TESTNET_VERSION: u8 = 0xef;
const COMPRESSED_FLAG: u8 = 0x01;
const PAYLOAD_LEN: usize = 34;

/// One-time private key owned by a single inscription, together with its
/// checksummed textual form and its plain hex form.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
  secret_key: SecretKey,
  wif: String,
  hex: String,
}

impl KeyPair {
  pub fn generate(network: Network) -> Self {
    Self::from_secret_key(SecretKey::new(&mut rand::thread_rng()), network)
  }

  /// Decodes `encoded` when present, otherwise generates a fresh key. Both
  /// WIF and 64 character hex are accepted.
  pub fn import(encoded: Option<&str>, network: Network) -> Result<Self, Error> {
    match encoded.map(str::trim) {
      Some(encoded) if encoded.len() == 64 && encoded.bytes().all(|b| b.is_ascii_hexdigit()) => {
        Self::from_hex(encoded, network)
      }
      Some(encoded) => Self::from_wif(encoded, network),
      None => Ok(Self::generate(network)),
    }
  }

  pub fn from_hex(encoded: &str, network: Network) -> Result<Self, Error> {
    let raw = hex::decode(encoded.trim())
      .map_err(|err| Error::InvalidKeyEncoding(format!("key is not hex: {err}")))?;

    Self::from_raw(&raw, network)
  }

  pub fn from_raw(raw: &[u8], network: Network) -> Result<Self, Error> {
    if raw.len() != 32 {
      return Err(Error::InvalidKeyLength(raw.len()));
    }

    let secret_key = SecretKey::from_slice(raw)
      .map_err(|err| Error::InvalidKeyEncoding(format!("key is not a valid scalar: {err}")))?;

    Ok(Self::from_secret_key(secret_key, network))
  }

  pub fn from_wif(encoded: &str, network: Network) -> Result<Self, Error> {
    let payload = base58::decode_check(encoded.trim())
      .map_err(|err| Error::InvalidKeyEncoding(err.to_string()))?;

    if payload.len() != PAYLOAD_LEN || payload[PAYLOAD_LEN - 1] != COMPRESSED_FLAG {
      return Err(Error::InvalidKeyEncoding(format!(
        "expected {PAYLOAD_LEN} byte compressed key payload, found {} bytes",
        payload.len()
      )));
    }

    let expected = version_byte(network);
    if payload[0] != expected {
      return Err(Error::InvalidKeyEncoding(format!(
        "network version mismatch: expected {expected:#04x}, found {:#04x}",
        payload[0]
      )));
    }

    let secret_key = SecretKey::from_slice(&payload[1..33])
      .map_err(|err| Error::InvalidKeyEncoding(format!("key is not a valid scalar: {err}")))?;

    Ok(Self {
      secret_key,
      wif: encoded.trim().to_owned(),
      hex: hex::encode(secret_key.secret_bytes()),
    })
  }

  fn from_secret_key(secret_key: SecretKey, network: Network) -> Self {
    Self {
      secret_key,
      wif: encode_wif(&secret_key.secret_bytes(), network),
      hex: hex::encode(secret_key.secret_bytes()),
    }
  }

  pub fn raw(&self) -> [u8; 32] {
    self.secret_key.secret_bytes()
  }

  pub fn secret_key(&self) -> SecretKey {
    self.secret_key
  }

  pub fn wif(&self) -> &str {
    &self.wif
  }

  pub fn hex(&self) -> &str {
    &self.hex
  }

  pub fn public_key(&self) -> XOnlyPublicKey {
    self.secret_key.x_only_public_key(&Secp256k1::new()).0
  }
}

impl Debug for KeyPair {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    f.debug_struct("KeyPair")
      .field("public_key", &self.public_key())
      .finish_non_exhaustive()
  }
}

/// Schnorr (BIP340) x-only public key for a raw 32 byte private key.
pub fn x_only_public_key(raw: &[u8]) -> Result<XOnlyPublicKey, Error> {
  if raw.len() != 32 {
    return Err(Error::InvalidKeyLength(raw.len()));
  }

  let secret_key = SecretKey::from_slice(raw)
    .map_err(|err| Error::InvalidKeyEncoding(format!("key is not a valid scalar: {err}")))?;

  Ok(secret_key.x_only_public_key(&Secp256k1::new()).0)
}

fn version_byte(network: Network) -> u8 {
  match network {
    Network::Bitcoin => MAINNET_VERSION,
    _ => TESTNET_VERSION,
  }
}

fn encode_wif(raw: &[u8; 32], network: Network) -> String {
  let mut payload = Vec::with_capacity(PAYLOAD_LEN);
  payload.push(version_byte(network));
  payload.extend_from_slice(raw);
  payload.push(COMPRESSED_FLAG);
  base58::encode_check(&payload)
}
