use {
  super::*,
  crate::{
    engine::DUST_LIMIT,
    reconcile::DEFAULT_WALLET_PREFIX,
    store::RedbStore,
  },
  bitcoincore_rpc::Auth,
  clap::ArgGroup,
  std::fs::File,
};

const DEFAULT_RPC_RETRIES: u32 = 3;
const DEFAULT_RPC_RETRY_DELAY_MS: u64 = 500;
const DATABASE_FILE: &str = "inscriptions.redb";
const CONFIG_FILE: &str = "inscriber.yaml";

#[derive(Clone, Default, Debug, Parser)]
#[clap(group(
  ArgGroup::new("chains")
    .required(false)
    .args(&["chain_argument", "signet", "regtest", "testnet"]),
))]
pub(crate) struct Options {
  #[arg(long, help = "Load Bitcoin Core data dir from <BITCOIN_DATA_DIR>.")]
  pub(crate) bitcoin_data_dir: Option<PathBuf>,
  #[arg(long, help = "Authenticate to Bitcoin Core RPC with <RPC_PASS>.")]
  pub(crate) bitcoin_rpc_pass: Option<String>,
  #[arg(long, help = "Authenticate to Bitcoin Core RPC as <RPC_USER>.")]
  pub(crate) bitcoin_rpc_user: Option<String>,
  #[arg(
    long = "chain",
    value_enum,
    default_value = "mainnet",
    help = "Use <CHAIN>."
  )]
  pub(crate) chain_argument: Chain,
  #[arg(long, help = "Load configuration from <CONFIG>.")]
  pub(crate) config: Option<PathBuf>,
  #[arg(long, help = "Load configuration from <CONFIG_DIR>.")]
  pub(crate) config_dir: Option<PathBuf>,
  #[arg(long, help = "Load Bitcoin Core RPC cookie file from <COOKIE_FILE>.")]
  pub(crate) cookie_file: Option<PathBuf>,
  #[arg(long, help = "Store the inscription database in <DATA_DIR>.")]
  pub(crate) data_dir: Option<PathBuf>,
  #[arg(long, help = "Write log files to <LOG_DIR>.")]
  pub(crate) log_dir: Option<PathBuf>,
  #[arg(
    long,
    default_value = "info",
    help = "Log at <LOG_LEVEL>: error, warn, info, debug or trace."
  )]
  pub(crate) log_level: String,
  #[arg(long, short, help = "Use regtest. Equivalent to `--chain regtest`.")]
  pub(crate) regtest: bool,
  #[arg(long, help = "Connect to Bitcoin Core RPC at <RPC_URL>.")]
  pub(crate) rpc_url: Option<String>,
  #[arg(long, short, help = "Use signet. Equivalent to `--chain signet`.")]
  pub(crate) signet: bool,
  #[arg(long, short, help = "Use testnet. Equivalent to `--chain testnet`.")]
  pub(crate) testnet: bool,
  #[arg(long, help = "Name watch-only wallets <WALLET_PREFIX>_insc_wallet_<ID>.")]
  pub(crate) wallet_prefix: Option<String>,
}

impl Options {
  pub(crate) fn chain(&self) -> Chain {
    if self.signet {
      Chain::Signet
    } else if self.regtest {
      Chain::Regtest
    } else if self.testnet {
      Chain::Testnet
    } else {
      self.chain_argument
    }
  }

  pub(crate) fn rpc_url(&self) -> String {
    self
      .rpc_url
      .clone()
      .unwrap_or_else(|| format!("127.0.0.1:{}", self.chain().default_rpc_port()))
  }

  pub(crate) fn cookie_file(&self) -> Result<PathBuf> {
    if let Some(cookie_file) = &self.cookie_file {
      return Ok(cookie_file.clone());
    }

    let path = if let Some(bitcoin_data_dir) = &self.bitcoin_data_dir {
      bitcoin_data_dir.clone()
    } else if cfg!(target_os = "linux") {
      dirs::home_dir()
        .ok_or_else(|| anyhow!("failed to retrieve home dir"))?
        .join(".bitcoin")
    } else {
      dirs::data_dir()
        .ok_or_else(|| anyhow!("failed to retrieve data dir"))?
        .join("Bitcoin")
    };

    let path = self.chain().join_with_data_dir(&path);

    Ok(path.join(".cookie"))
  }

  pub(crate) fn data_dir(&self) -> Result<PathBuf> {
    let base = match &self.data_dir {
      Some(base) => base.clone(),
      None => dirs::data_dir()
        .ok_or_else(|| anyhow!("failed to retrieve data dir"))?
        .join("inscriber"),
    };

    Ok(self.chain().join_with_data_dir(&base))
  }

  pub(crate) fn log_dir(&self) -> Result<PathBuf> {
    match &self.log_dir {
      Some(dir) => Ok(dir.clone()),
      None => Ok(self.data_dir()?.join("logs")),
    }
  }

  pub(crate) fn log_level(&self) -> &str {
    &self.log_level
  }

  pub(crate) fn load_config(&self) -> Result<Config> {
    let path = match &self.config {
      Some(path) => path.clone(),
      None => match &self.config_dir {
        Some(dir) if dir.join(CONFIG_FILE).exists() => dir.join(CONFIG_FILE),
        Some(_) | None => return Ok(Default::default()),
      },
    };

    let file =
      File::open(&path).with_context(|| format!("failed to open config {}", path.display()))?;

    serde_yaml::from_reader(file)
      .with_context(|| format!("failed to parse config {}", path.display()))
  }

  fn derive_var(
    arg_value: Option<&str>,
    env_key: Option<&str>,
    config_value: Option<&str>,
    default_value: Option<&str>,
  ) -> Result<Option<String>> {
    let env_value = match env_key {
      Some(env_key) => match env::var(format!("INSCRIBER_{env_key}")) {
        Ok(env_value) => Some(env_value),
        Err(err @ env::VarError::NotUnicode(_)) => return Err(err.into()),
        Err(env::VarError::NotPresent) => None,
      },
      None => None,
    };

    Ok(
      arg_value
        .or(env_value.as_deref())
        .or(config_value)
        .or(default_value)
        .map(str::to_string),
    )
  }

  fn auth(&self, config: &Config) -> Result<Auth> {
    let rpc_user = Options::derive_var(
      self.bitcoin_rpc_user.as_deref(),
      Some("BITCOIN_RPC_USER"),
      config.bitcoin_rpc_user.as_deref(),
      None,
    )?;

    let rpc_pass = Options::derive_var(
      self.bitcoin_rpc_pass.as_deref(),
      Some("BITCOIN_RPC_PASS"),
      config.bitcoin_rpc_pass.as_deref(),
      None,
    )?;

    match (rpc_user, rpc_pass) {
      (Some(rpc_user), Some(rpc_pass)) => Ok(Auth::UserPass(rpc_user, rpc_pass)),
      (None, Some(_rpc_pass)) => Err(anyhow!("no bitcoind rpc user specified")),
      (Some(_rpc_user), None) => Err(anyhow!("no bitcoind rpc password specified")),
      _ => Ok(Auth::CookieFile(self.cookie_file()?)),
    }
  }

  pub(crate) fn engine_config(&self, config: &Config) -> EngineConfig {
    EngineConfig {
      network: self.chain().network(),
      dust_limit: config.dust_limit.unwrap_or(DUST_LIMIT),
    }
  }

  pub(crate) fn node_client_config(&self, config: &Config) -> Result<NodeClientConfig> {
    Ok(NodeClientConfig {
      rpc_url: self.rpc_url(),
      auth: self.auth(config)?,
      retries: config.rpc_retries.unwrap_or(DEFAULT_RPC_RETRIES),
      retry_delay: Duration::from_millis(
        config
          .rpc_retry_delay_ms
          .unwrap_or(DEFAULT_RPC_RETRY_DELAY_MS),
      ),
    })
  }

  pub(crate) fn reconciler_config(&self, config: &Config) -> Result<ReconcilerConfig> {
    let wallet_prefix = Options::derive_var(
      self.wallet_prefix.as_deref(),
      Some("WALLET_PREFIX"),
      config.wallet_prefix.as_deref(),
      Some(DEFAULT_WALLET_PREFIX),
    )?
    .unwrap_or_else(|| DEFAULT_WALLET_PREFIX.into());

    Ok(ReconcilerConfig { wallet_prefix })
  }

  pub(crate) fn bitcoin_rpc_client(&self, config: &Config) -> Result<BitcoinRpcClient> {
    let node_config = self.node_client_config(config)?;

    match &node_config.auth {
      Auth::CookieFile(cookie_file) => log::info!(
        "Connecting to Bitcoin Core at {} using credentials from `{}`",
        node_config.rpc_url,
        cookie_file.display()
      ),
      Auth::UserPass(..) | Auth::None => {
        log::info!("Connecting to Bitcoin Core at {}", node_config.rpc_url)
      }
    }

    BitcoinRpcClient::new(node_config).with_context(|| {
      format!(
        "failed to connect to Bitcoin Core RPC at {}",
        self.rpc_url()
      )
    })
  }

  pub(crate) fn open_store(&self) -> Result<RedbStore> {
    let data_dir = self.data_dir()?;

    fs::create_dir_all(&data_dir)
      .with_context(|| format!("failed to create data dir `{}`", data_dir.display()))?;

    let path = data_dir.join(DATABASE_FILE);

    log::info!("Opening inscription database at {}", path.display());

    RedbStore::open(&path)
      .with_context(|| format!("failed to open inscription database `{}`", path.display()))
  }

  pub(crate) fn reconciler(&self) -> Result<Reconciler<BitcoinRpcClient, RedbStore>> {
    let config = self.load_config()?;

    Ok(Reconciler::new(
      Engine::new(self.engine_config(&config)),
      self.bitcoin_rpc_client(&config)?,
      self.open_store()?,
      self.reconciler_config(&config)?,
    ))
  }

  pub(crate) fn service(&self) -> Result<Service<BitcoinRpcClient, RedbStore>> {
    Ok(Service::new(self.reconciler()?))
  }
}
