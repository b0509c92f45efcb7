use {
  crate::codec::{sniff_content_type, x_only_public_key, KeyPair},
  bitcoin::{
    absolute::LockTime,
    address::{Address, NetworkUnchecked},
    consensus::encode::serialize_hex,
    secp256k1::{self, Secp256k1, XOnlyPublicKey},
    sighash::{Prevouts, SighashCache, TapSighashType},
    taproot::{self, ControlBlock, LeafVersion, TapLeafHash, TaprootBuilder, TaprootSpendInfo},
    Network, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness,
  },
};

pub use self::{
  envelope::Envelope,
  error::Error,
  fee::{required_amount, reveal_fee},
};

mod envelope;
mod error;
mod fee;

pub const DUST_LIMIT: u64 = 546;

/// BIP341 NUMS point: nobody knows its discrete log, so the commit output can
/// only be spent through the content-carrying leaf.
const UNSPENDABLE_INTERNAL_KEY: [u8; 32] = [
  0x50, 0x92, 0x9b, 0x74, 0xc1, 0xa0, 0x49, 0x54, 0xb7, 0x8b, 0x4b, 0x60, 0x35, 0xe9, 0x7a, 0x5e,
  0x07, 0x8a, 0x5a, 0x0f, 0x28, 0xec, 0x96, 0xd5, 0x47, 0xbf, 0xee, 0x9a, 0xce, 0x80, 0x3a, 0xc0,
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
  pub network: Network,
  pub dust_limit: u64,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      network: Network::Bitcoin,
      dust_limit: DUST_LIMIT,
    }
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Engine {
  config: EngineConfig,
}

impl Engine {
  pub fn new(config: EngineConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> EngineConfig {
    self.config
  }

  pub fn network(&self) -> Network {
    self.config.network
  }

  /// Builds the funding side of an inscription. Deterministic for a fixed
  /// `(content, fee_rate, key)`; a fresh key is generated when none is given.
  pub fn build_commit(
    &self,
    content: &[u8],
    fee_rate: f64,
    recipient: &str,
    existing_key: Option<&str>,
  ) -> Result<Commit, Error> {
    let key = KeyPair::import(existing_key, self.config.network)?;
    let public_key = x_only_public_key(&key.raw())?;
    let recipient = parse_address(recipient, self.config.network)?;

    let content_type = sniff_content_type(content);
    let reveal_script = Envelope {
      content_type,
      body: content,
    }
    .reveal_script(&public_key)?;

    let secp256k1 = Secp256k1::new();

    let internal_key = XOnlyPublicKey::from_slice(&UNSPENDABLE_INTERNAL_KEY)
      .map_err(|err| Error::Taproot(err.to_string()))?;

    let spend_info = TaprootBuilder::new()
      .add_leaf(0, reveal_script.clone())
      .map_err(|err| Error::Taproot(err.to_string()))?
      .finalize(&secp256k1, internal_key)
      .map_err(|_| Error::Taproot("single leaf tree could not be finalized".into()))?;

    let control_block = spend_info
      .control_block(&(reveal_script.clone(), LeafVersion::TapScript))
      .ok_or_else(|| Error::Taproot("missing control block for reveal leaf".into()))?;

    let address = Address::p2tr_tweaked(spend_info.output_key(), self.config.network);

    let fee = reveal_fee(content.len(), fee_rate)?;

    log::debug!(
      "built commit {address}: {} bytes of {content_type}, fee {fee} sats",
      content.len()
    );

    Ok(Commit {
      key,
      recipient,
      content_type,
      content_len: content.len(),
      reveal_script,
      spend_info,
      control_block,
      address,
      fee,
      required_amount: required_amount(fee, self.config.dust_limit),
      dust_limit: self.config.dust_limit,
    })
  }
}

/// Immutable result of [`Engine::build_commit`]. Everything the reveal needs
/// is captured here, and the whole value can be rebuilt from the stored key,
/// content and fee rate.
#[derive(Debug, Clone)]
pub struct Commit {
  key: KeyPair,
  recipient: Address,
  content_type: &'static str,
  content_len: usize,
  reveal_script: ScriptBuf,
  spend_info: TaprootSpendInfo,
  control_block: ControlBlock,
  address: Address,
  fee: u64,
  required_amount: u64,
  dust_limit: u64,
}

impl Commit {
  pub fn address(&self) -> &Address {
    &self.address
  }

  pub fn recipient(&self) -> &Address {
    &self.recipient
  }

  pub fn key(&self) -> &KeyPair {
    &self.key
  }

  pub fn content_type(&self) -> &'static str {
    self.content_type
  }

  pub fn content_len(&self) -> usize {
    self.content_len
  }

  pub fn fee(&self) -> u64 {
    self.fee
  }

  pub fn required_amount(&self) -> u64 {
    self.required_amount
  }

  pub fn reveal_script(&self) -> &ScriptBuf {
    &self.reveal_script
  }

  pub fn spend_info(&self) -> &TaprootSpendInfo {
    &self.spend_info
  }

  /// Spends `commit_txid:vout` (holding `funded` sats) through the content
  /// leaf and pays what is left after the fee to the recipient.
  pub fn build_reveal(&self, commit_txid: Txid, vout: u32, funded: u64) -> Result<Transaction, Error> {
    let output_amount = funded
      .checked_sub(self.fee)
      .filter(|amount| *amount >= self.dust_limit)
      .ok_or(Error::DustOutput {
        funded,
        fee: self.fee,
        dust_limit: self.dust_limit,
      })?;

    let prevout = TxOut {
      value: funded,
      script_pubkey: self.address.script_pubkey(),
    };

    let mut reveal_tx = Transaction {
      version: 2,
      lock_time: LockTime::ZERO,
      input: vec![TxIn {
        previous_output: OutPoint {
          txid: commit_txid,
          vout,
        },
        script_sig: ScriptBuf::new(),
        sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
        witness: Witness::new(),
      }],
      output: vec![TxOut {
        value: output_amount,
        script_pubkey: self.recipient.script_pubkey(),
      }],
    };

    let signature_hash = SighashCache::new(&reveal_tx)
      .taproot_script_spend_signature_hash(
        0,
        &Prevouts::All(&[prevout]),
        TapLeafHash::from_script(&self.reveal_script, LeafVersion::TapScript),
        TapSighashType::Default,
      )
      .map_err(|err| Error::Signing(err.to_string()))?;

    let secp256k1 = Secp256k1::new();
    let key_pair = secp256k1::KeyPair::from_secret_key(&secp256k1, &self.key.secret_key());

    let message = secp256k1::Message::from_slice(signature_hash.as_ref())
      .map_err(|err| Error::Signing(err.to_string()))?;

    let signature = taproot::Signature {
      sig: secp256k1.sign_schnorr_no_aux_rand(&message, &key_pair),
      hash_ty: TapSighashType::Default,
    };

    reveal_tx.input[0].witness = Witness::from_slice(&[
      signature.to_vec(),
      self.reveal_script.to_bytes(),
      self.control_block.serialize(),
    ]);

    log::debug!(
      "built reveal {} spending {commit_txid}:{vout}, {output_amount} sats to {}",
      reveal_tx.txid(),
      self.recipient
    );

    Ok(reveal_tx)
  }

  /// Byte-exact hex serialization of [`Commit::build_reveal`].
  pub fn build_reveal_hex(&self, commit_txid: Txid, vout: u32, funded: u64) -> Result<String, Error> {
    Ok(serialize_hex(&self.build_reveal(commit_txid, vout, funded)?))
  }
}

pub fn parse_address(address: &str, network: Network) -> Result<Address, Error> {
  address
    .trim()
    .parse::<Address<NetworkUnchecked>>()
    .and_then(|address| address.require_network(network))
    .map_err(|err| Error::InvalidAddress {
      address: address.to_owned(),
      message: err.to_string(),
    })
}

pub fn parse_txid(txid: &str) -> Result<Txid, Error> {
  txid.trim().parse().map_err(|err: bitcoin::hashes::hex::Error| Error::InvalidTxid {
    txid: txid.to_owned(),
    message: err.to_string(),
  })
}
