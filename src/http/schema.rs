//! JSON request and response bodies of the HTTP API.

use crate::error::GatewayError;
use crate::gateway::{ConnectOutcome, LinkStats, SendReceipt, StatsReport};
use crate::radio::{RadioConfig, RadioConfigUpdate};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/lora/connect`. Every field is optional.
///
/// Numbers arrive as JSON numbers of any kind; integer fields must be integral.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    /// MHz
    pub frequency: Option<f64>,
    /// kHz
    pub bandwidth: Option<f64>,
    pub spreading_factor: Option<f64>,
    pub coding_rate: Option<f64>,
    /// dBm
    pub tx_power: Option<f64>,
}

impl ConnectRequest {
    /// Convert to radio units, rejecting values that don't fit the target field.
    pub fn into_update(self) -> Result<RadioConfigUpdate, GatewayError> {
        let frequency_mhz = match self.frequency {
            Some(mhz) if !mhz.is_finite() => {
                return Err(GatewayError::config("frequency must be a finite number"))
            }
            other => other,
        };

        let bandwidth_hz = self
            .bandwidth
            .map(|khz| {
                let hz = (khz * 1000.0).round();
                if hz.is_finite() && hz > 0.0 && hz <= f64::from(u32::MAX) {
                    Ok(hz as u32)
                } else {
                    Err(GatewayError::config(format!("bandwidth {khz} kHz is out of range")))
                }
            })
            .transpose()?;

        Ok(RadioConfigUpdate {
            frequency_mhz,
            bandwidth_hz,
            coding_rate: self.coding_rate.map(|v| integral("codingRate", v)).transpose()?,
            spreading_factor: self
                .spreading_factor
                .map(|v| integral("spreadingFactor", v))
                .transpose()?,
            tx_power_dbm: self.tx_power.map(|v| integral("txPower", v)).transpose()?,
        })
    }
}

fn integral<T: TryFrom<i64>>(field: &str, value: f64) -> Result<T, GatewayError> {
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(GatewayError::config(format!("{field} must be an integer, got {value}")));
    }
    T::try_from(value as i64)
        .map_err(|_| GatewayError::config(format!("{field} {value} is out of range")))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResponse {
    pub success: bool,
    pub device_name: String,
    pub config: RadioConfig,
}

impl From<ConnectOutcome> for ConnectResponse {
    fn from(outcome: ConnectOutcome) -> Self {
        Self {
            success: true,
            device_name: outcome.device_name,
            config: outcome.config,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DisconnectResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub success: bool,
    pub bytes_sent: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mock: Option<bool>,
}

impl From<SendReceipt> for SendResponse {
    fn from(receipt: SendReceipt) -> Self {
        Self {
            success: true,
            bytes_sent: receipt.bytes_sent,
            mock: receipt.simulated.then_some(true),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: LinkStats,
    pub config: RadioConfig,
    pub connected: bool,
}

impl From<StatsReport> for StatsResponse {
    fn from(report: StatsReport) -> Self {
        Self {
            success: true,
            stats: report.stats,
            config: report.config,
            connected: report.connected,
        }
    }
}

/// Failure body shared by every fallible endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}
