use super::*;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Status {
  #[display(fmt = "pending")]
  Pending,
  #[display(fmt = "scanning")]
  Scanning,
  #[display(fmt = "paid")]
  Paid,
  #[display(fmt = "reveal_ready")]
  RevealReady,
  #[display(fmt = "completed")]
  Completed,
}

impl Status {
  pub const ALL: [Status; 5] = [
    Self::Pending,
    Self::Scanning,
    Self::Paid,
    Self::RevealReady,
    Self::Completed,
  ];

  fn rank(self) -> u8 {
    match self {
      Self::Pending | Self::Scanning => 0,
      Self::Paid => 1,
      Self::RevealReady => 2,
      Self::Completed => 3,
    }
  }

  /// Payment has been observed, nothing left to poll for.
  pub fn is_paid(self) -> bool {
    self.rank() > 0
  }

  /// Forward moves only. `scanning` is entered from `pending` and always
  /// returns to it.
  pub fn can_transition_to(self, next: Status) -> bool {
    match (self, next) {
      (Self::Pending, Self::Scanning) | (Self::Scanning, Self::Pending) => true,
      (Self::Scanning, _) | (_, Self::Scanning) => false,
      (current, next) => next.rank() > current.rank(),
    }
  }
}

impl FromStr for Status {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|status| status.to_string() == s)
      .ok_or_else(|| anyhow!("invalid status: {s}"))
  }
}

/// Durable record of one inscription. Everything needed to rebuild the
/// commit and the reveal, except the content bytes, lives here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inscription {
  pub id: u64,
  pub key_wif: String,
  pub address: String,
  pub required_amount: u64,
  pub fee: u64,
  pub content_len: u64,
  pub recipient_address: String,
  pub sender_address: String,
  pub fee_rate: f64,
  pub created_at: i64,
  pub created_block: u64,
  pub last_checked_block: u64,
  pub commit_txid: Option<String>,
  pub reveal_tx_hex: Option<String>,
  pub reveal_txid: Option<String>,
  pub status: Status,
}

impl Inscription {
  pub fn created_at(&self) -> DateTime<Utc> {
    timestamp(self.created_at)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewInscription {
  pub key_wif: String,
  pub address: String,
  pub required_amount: u64,
  pub fee: u64,
  pub content_len: u64,
  pub recipient_address: String,
  pub sender_address: String,
  pub fee_rate: f64,
  pub created_at: i64,
  pub created_block: u64,
}

impl NewInscription {
  pub(crate) fn into_inscription(self, id: u64) -> Inscription {
    Inscription {
      id,
      key_wif: self.key_wif,
      address: self.address,
      required_amount: self.required_amount,
      fee: self.fee,
      content_len: self.content_len,
      recipient_address: self.recipient_address,
      sender_address: self.sender_address,
      fee_rate: self.fee_rate,
      created_at: self.created_at,
      created_block: self.created_block,
      last_checked_block: self.created_block,
      commit_txid: None,
      reveal_tx_hex: None,
      reveal_txid: None,
      status: Status::Pending,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
  pub old: Status,
  pub new: Status,
  pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockCheck {
  pub height: u64,
  pub timestamp: i64,
}
