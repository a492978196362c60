use axum::{
    Json,
    http::{Request, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use governor::{clock::QuantaInstant, middleware::NoOpMiddleware};
use std::{
    net::{IpAddr, Ipv4Addr},
    sync::Arc,
    time::Duration,
};
use tower_governor::{
    errors::GovernorError,
    governor::{GovernorConfig, GovernorConfigBuilder},
    key_extractor::KeyExtractor,
};

/// Keys the login limiter by client IP.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IpKeyExtractor;

impl KeyExtractor for IpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let headers = req.headers();

        // 1. Cloudflare puts the real client IP in 'cf-connecting-ip'.
        if let Some(ip) = headers
            .get("cf-connecting-ip")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.parse::<IpAddr>().ok())
        {
            return Ok(ip);
        }

        // 2. Any other proxy: first entry of X-Forwarded-For is the client.
        if let Some(ip) = headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
        {
            return Ok(ip);
        }

        // 3. No headers (local dev, mostly). Everyone unknown shares one bucket,
        // which is stricter, not looser.
        Ok(IpAddr::V4(Ipv4Addr::LOCALHOST))
    }
}

pub type LoginConfig = GovernorConfig<IpKeyExtractor, NoOpMiddleware<QuantaInstant>>;

/// Login limiter: `burst` attempts up front, then one more every 3 minutes.
///
/// With the default burst of 5 that's 5 tries per 15 minutes per IP. Enough
/// for typos, annoying for anybody guessing passwords.
pub fn create_login_config(burst: u32) -> anyhow::Result<Arc<LoginConfig>> {
    let config = GovernorConfigBuilder::default()
        .key_extractor(IpKeyExtractor)
        .period(Duration::from_secs(180))
        .burst_size(burst)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("invalid login rate limit (burst = {burst})"))?;

    Ok(Arc::new(config))
}

/// tower_governor answers a throttled request with a plain-text 429. Swap
/// the body for the usual `{"message": ...}` envelope, keeping its
/// `retry-after` and `x-ratelimit-*` headers.
pub async fn rate_limit_envelope(response: Response) -> Response {
    if response.status() != StatusCode::TOO_MANY_REQUESTS {
        return response;
    }

    let (parts, _) = response.into_parts();
    let mut wrapped = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({ "message": "Too many login attempts, try again later" })),
    )
        .into_response();

    for (name, value) in &parts.headers {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            wrapped.headers_mut().append(name.clone(), value.clone());
        }
    }
    wrapped
}
