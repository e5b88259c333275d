//! Bearer-token managers and authenticators for IBM Cloud service SDKs.
//!
//! Token managers cache short-lived tokens, let only one refresh run at a time, and refresh
//! ahead of expiry in the background. Authenticators stamp outbound request headers with the
//! resulting tokens.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod authenticator;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod manager;
pub mod obs;
pub mod scheme;
pub mod token;

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value as JsonValue;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use ::http as http_types;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, tempfile as _};
