use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{header::USER_AGENT, request::Parts, HeaderMap},
};
use std::convert::Infallible;
use std::net::SocketAddr;

pub const UNKNOWN_IP: &str = "unknown";

/// Caller details recorded alongside an activity log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip_address: String,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn from_parts(parts: &Parts) -> Self {
        let ip_address = extract_ip(&parts.headers)
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
            .unwrap_or_else(|| UNKNOWN_IP.to_string());

        Self {
            ip_address,
            user_agent: extract_user_agent(&parts.headers),
        }
    }
}

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

fn extract_ip(headers: &HeaderMap) -> Option<String> {
    header_ip(headers, "x-forwarded-for").or_else(|| header_ip(headers, "x-real-ip"))
}

fn header_ip(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(',').next().unwrap_or(value).trim().to_string())
        .filter(|value| !value.is_empty())
}

fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn prefers_first_forwarded_hop() {
        let mut parts = parts(
            Request::builder()
                .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
                .header("x-real-ip", "10.0.0.2")
                .header(USER_AGENT, "ProteQ-Mobile/2.1"),
        );
        let info = ClientInfo::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(info.ip_address, "203.0.113.9");
        assert_eq!(info.user_agent.as_deref(), Some("ProteQ-Mobile/2.1"));
    }

    #[test]
    fn falls_back_to_real_ip_then_peer_address() {
        let info = ClientInfo::from_parts(&parts(
            Request::builder().header("x-real-ip", "198.51.100.4"),
        ));
        assert_eq!(info.ip_address, "198.51.100.4");

        let mut peer = parts(Request::builder());
        peer.extensions
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 7], 51234))));
        assert_eq!(ClientInfo::from_parts(&peer).ip_address, "192.0.2.7");
    }

    #[test]
    fn blank_forwarded_for_falls_through_to_real_ip() {
        let info = ClientInfo::from_parts(&parts(
            Request::builder()
                .header("x-forwarded-for", " ")
                .header("x-real-ip", "198.51.100.4"),
        ));
        assert_eq!(info.ip_address, "198.51.100.4");

        let info = ClientInfo::from_parts(&parts(
            Request::builder()
                .header("x-forwarded-for", "")
                .header("x-real-ip", "198.51.100.5"),
        ));
        assert_eq!(info.ip_address, "198.51.100.5");
    }

    #[test]
    fn reports_unknown_without_any_source() {
        let info = ClientInfo::from_parts(&parts(Request::builder()));
        assert_eq!(info.ip_address, UNKNOWN_IP);
        assert!(info.user_agent.is_none());
    }
}
