/// Failure of a single upstream HTTP call. Never shown to the caller as-is.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Upstream returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Unexpected response body: {0}")]
    Decode(String),
}

/// Failures surfaced to the caller. Messages are localized for the target audience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WeatherError {
    #[error("พิกัดไม่ถูกต้อง")]
    InvalidCoordinates,
    #[error("ไม่สามารถดึงข้อมูลอากาศได้")]
    UpstreamUnavailable,
}

impl WeatherError {
    pub fn status_code(&self) -> u16 {
        match self {
            WeatherError::InvalidCoordinates => 400,
            WeatherError::UpstreamUnavailable => 502,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_error_kind() {
        assert_eq!(WeatherError::InvalidCoordinates.status_code(), 400);
        assert_eq!(WeatherError::UpstreamUnavailable.status_code(), 502);
    }

    #[test]
    fn messages_are_localized() {
        assert_eq!(WeatherError::InvalidCoordinates.to_string(), "พิกัดไม่ถูกต้อง");
    }
}
