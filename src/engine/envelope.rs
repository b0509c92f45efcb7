use {
  super::Error,
  bitcoin::{
    blockdata::{
      constants::MAX_SCRIPT_ELEMENT_SIZE,
      opcodes::{self, all::*},
    },
    script::{self, PushBytesBuf},
    secp256k1::XOnlyPublicKey,
    ScriptBuf,
  },
};

pub(crate) const PROTOCOL_ID: [u8; 3] = *b"ord";
pub(crate) const CONTENT_TYPE_TAG: [u8; 1] = [1];
pub(crate) const BODY_TAG: [u8; 0] = [];

/// The record embedded in the content-carrying leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope<'a> {
  pub content_type: &'a str,
  pub body: &'a [u8],
}

impl<'a> Envelope<'a> {
  /// `<pubkey> OP_CHECKSIG OP_FALSE OP_IF "ord" 1 <content type> 0 <body...> OP_ENDIF`
  pub fn reveal_script(&self, public_key: &XOnlyPublicKey) -> Result<ScriptBuf, Error> {
    let builder = script::Builder::new()
      .push_slice(public_key.serialize())
      .push_opcode(OP_CHECKSIG);

    Ok(self.append_to_builder(builder)?.into_script())
  }

  fn append_to_builder(&self, mut builder: script::Builder) -> Result<script::Builder, Error> {
    builder = builder
      .push_opcode(opcodes::OP_FALSE)
      .push_opcode(OP_IF)
      .push_slice(PROTOCOL_ID)
      .push_slice(CONTENT_TYPE_TAG)
      .push_slice(push_bytes(self.content_type.as_bytes())?)
      .push_slice(BODY_TAG);

    for chunk in self.body.chunks(MAX_SCRIPT_ELEMENT_SIZE) {
      builder = builder.push_slice(push_bytes(chunk)?);
    }

    Ok(builder.push_opcode(OP_ENDIF))
  }
}

fn push_bytes(data: &[u8]) -> Result<PushBytesBuf, Error> {
  let mut buf = PushBytesBuf::new();
  buf
    .extend_from_slice(data)
    .map_err(|err| Error::Script(err.to_string()))?;
  Ok(buf)
}

#[cfg(test)]
mod tests {
  use {super::*, crate::codec::x_only_public_key, bitcoin::script::Instruction};

  fn public_key() -> XOnlyPublicKey {
    x_only_public_key(&[7; 32]).unwrap()
  }

  fn pushes(script: &ScriptBuf) -> Vec<Vec<u8>> {
    script
      .instructions()
      .filter_map(|instruction| match instruction.unwrap() {
        Instruction::PushBytes(bytes) => Some(bytes.as_bytes().to_vec()),
        Instruction::Op(_) => None,
      })
      .collect()
  }

  #[test]
  fn reveal_script_layout() {
    let script = Envelope {
      content_type: "text/plain;charset=utf-8",
      body: b"ord",
    }
    .reveal_script(&public_key())
    .unwrap();

    pretty_assertions::assert_eq!(
      pushes(&script),
      vec![
        public_key().serialize().to_vec(),
        Vec::new(),
        b"ord".to_vec(),
        vec![1],
        b"text/plain;charset=utf-8".to_vec(),
        Vec::new(),
        b"ord".to_vec(),
      ]
    );

    let bytes = script.as_bytes();
    assert_eq!(bytes[33], OP_CHECKSIG.to_u8());
    assert_eq!(bytes[bytes.len() - 1], OP_ENDIF.to_u8());
  }

  #[test]
  fn body_is_chunked() {
    let body = vec![0xab; MAX_SCRIPT_ELEMENT_SIZE * 2 + 1];
    let script = Envelope {
      content_type: "application/octet-stream",
      body: &body,
    }
    .reveal_script(&public_key())
    .unwrap();

    let pushes = pushes(&script);
    let chunks = &pushes[pushes.len() - 3..];
    assert_eq!(chunks[0].len(), MAX_SCRIPT_ELEMENT_SIZE);
    assert_eq!(chunks[1].len(), MAX_SCRIPT_ELEMENT_SIZE);
    assert_eq!(chunks[2].len(), 1);
    assert_eq!(chunks.concat(), body);
  }

  #[test]
  fn empty_body() {
    let script = Envelope {
      content_type: "text/plain;charset=utf-8",
      body: &[],
    }
    .reveal_script(&public_key())
    .unwrap();

    assert_eq!(pushes(&script).len(), 6);
  }
}
