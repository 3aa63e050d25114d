use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Vehicle manufacturer whose connected-car service the client talks to.
///
/// Determines which login flow and endpoint family the remote service uses.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Brand {
    #[default]
    Hyundai,
    Kia,
    Genesis,
}

/// Service region of the account.
///
/// Each region is a separate deployment of the vehicle service with its
/// own account database, so credentials are only valid in one region.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
    EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Region {
    #[default]
    Us,
    Ca,
    Eu,
    Cn,
    Au,
    In,
}

/// Credentials for authenticating with the vehicle service.
///
/// The password and PIN are kept as [`SecretString`] so they never leak
/// through `Debug` output or logs.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Account login (usually an e-mail address).
    pub username: String,
    /// Account password.
    pub password: SecretString,
    /// Service region the account is registered in.
    pub region: Region,
    /// Remote-command PIN.
    pub pin: SecretString,
    /// Vehicle manufacturer.
    pub brand: Brand,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: SecretString,
        region: Region,
        pin: SecretString,
        brand: Brand,
    ) -> Self {
        Self {
            username: username.into(),
            password,
            region,
            pin,
            brand,
        }
    }
}
