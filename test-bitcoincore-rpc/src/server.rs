use {
  super::state::State,
  jsonrpc_core::{futures::future, MetaIoHandler, Metadata, Params, Value},
  jsonrpc_http_server::hyper,
  std::sync::{Arc, Mutex},
};

const METHODS: &[&str] = &[
  "createwallet",
  "getbalance",
  "getblockcount",
  "getblockhash",
  "getblockheader",
  "getdescriptorinfo",
  "importdescriptors",
  "listunspent",
  "listwallets",
  "loadwallet",
  "rescanblockchain",
  "sendrawtransaction",
  "unloadwallet",
];

/// Wallet named by the request path, `/wallet/<name>`.
#[derive(Clone, Debug, Default)]
pub(crate) struct Wallet(pub(crate) Option<String>);

impl Metadata for Wallet {}

impl Wallet {
  pub(crate) fn from_request(request: &hyper::Request<hyper::Body>) -> Self {
    Self(
      request
        .uri()
        .path()
        .strip_prefix("/wallet/")
        .filter(|name| !name.is_empty())
        .map(str::to_owned),
    )
  }
}

pub(crate) fn io(state: Arc<Mutex<State>>) -> MetaIoHandler<Wallet> {
  let mut io = MetaIoHandler::default();

  for &method in METHODS {
    let state = state.clone();
    io.add_method_with_meta(method, move |params: Params, wallet: Wallet| {
      let params = match params {
        Params::Array(values) => values,
        Params::Map(map) => vec![Value::Object(map)],
        Params::None => Vec::new(),
      };

      future::ready(state.lock().unwrap().call(method, wallet.0, params))
    });
  }

  io
}
