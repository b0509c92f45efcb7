#![no_main]

use {
  arbitrary::Arbitrary,
  bitcoin::{hashes::Hash, Network, Txid},
  inscriber::{Engine, EngineConfig},
  libfuzzer_sys::fuzz_target,
};

const RECIPIENT: &str = "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx";

#[derive(Clone, Debug, Arbitrary)]
struct Input {
  content: Vec<u8>,
  fee_rate: u16,
  key: [u8; 32],
  vout: u32,
  funded: u64,
}

fuzz_target!(|input: Input| {
  let engine = Engine::new(EngineConfig {
    network: Network::Testnet,
    ..Default::default()
  });

  let key = inscriber::codec::KeyPair::from_raw(&input.key, Network::Testnet)
    .ok()
    .map(|key| key.wif().to_owned());

  let Ok(commit) = engine.build_commit(
    &input.content,
    f64::from(input.fee_rate) / 8.0,
    RECIPIENT,
    key.as_deref(),
  ) else {
    return;
  };

  assert!(commit.required_amount() > commit.fee());

  if let Ok(reveal) = commit.build_reveal(Txid::all_zeros(), input.vout, input.funded) {
    assert_eq!(reveal.output[0].value, input.funded - commit.fee());
  }

  commit
    .build_reveal(Txid::all_zeros(), input.vout, commit.required_amount())
    .unwrap();
});
