use super::*;

#[derive(Deserialize, Default, PartialEq, Debug)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
  pub(crate) bitcoin_rpc_pass: Option<String>,
  pub(crate) bitcoin_rpc_user: Option<String>,
  pub(crate) wallet_prefix: Option<String>,
  pub(crate) dust_limit: Option<u64>,
  pub(crate) rpc_retries: Option<u32>,
  pub(crate) rpc_retry_delay_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn example_config_file_is_valid() {
    let config: Config = serde_yaml::from_str(
      "
bitcoin_rpc_user: alice
bitcoin_rpc_pass: hunter2
wallet_prefix: staging
dust_limit: 600
rpc_retries: 5
rpc_retry_delay_ms: 250
",
    )
    .unwrap();

    assert_eq!(
      config,
      Config {
        bitcoin_rpc_pass: Some("hunter2".into()),
        bitcoin_rpc_user: Some("alice".into()),
        wallet_prefix: Some("staging".into()),
        dust_limit: Some(600),
        rpc_retries: Some(5),
        rpc_retry_delay_ms: Some(250),
      }
    );
  }

  #[test]
  fn missing_fields_default() {
    assert_eq!(
      serde_yaml::from_str::<Config>("wallet_prefix: x").unwrap(),
      Config {
        wallet_prefix: Some("x".into()),
        ..Default::default()
      }
    );
  }

  #[test]
  fn unknown_fields_are_rejected() {
    assert!(serde_yaml::from_str::<Config>("hidden: []").is_err());
  }
}
