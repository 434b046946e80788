/// Resolves the client key a request is accounted against.
///
/// Implemented for any `Fn(&Req) -> String`, so a closure is usually enough:
///
/// ```rust
/// use tower_guard::KeyResolver;
///
/// let by_tenant = |req: &(String, u32)| req.0.clone();
/// assert_eq!(by_tenant.resolve(&("acme".to_string(), 7)), "acme");
/// ```
pub trait KeyResolver<Req> {
    fn resolve(&self, req: &Req) -> String;
}

impl<F, Req> KeyResolver<Req> for F
where
    F: Fn(&Req) -> String,
{
    fn resolve(&self, req: &Req) -> String {
        self(req)
    }
}

#[cfg(feature = "axum")]
pub use real_ip::RealIp;

#[cfg(feature = "axum")]
mod real_ip {
    use std::net::SocketAddr;

    use axum::extract::ConnectInfo;
    use http::HeaderMap;
    use http::Request;

    use super::KeyResolver;

    const X_REAL_IP: &str = "x-real-ip";
    const X_FORWARDED_FOR: &str = "x-forwarded-for";
    const UNKNOWN: &str = "unknown";

    /// Keys requests by the originating IP address.
    ///
    /// Looks at `X-Real-Ip`, then the first hop of `X-Forwarded-For`, then the
    /// peer address recorded by `into_make_service_with_connect_info`.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct RealIp;

    impl<B> KeyResolver<Request<B>> for RealIp {
        fn resolve(&self, req: &Request<B>) -> String {
            from_headers(req.headers())
                .or_else(|| {
                    req.extensions()
                        .get::<ConnectInfo<SocketAddr>>()
                        .map(|ConnectInfo(addr)| addr.ip().to_string())
                })
                .unwrap_or_else(|| UNKNOWN.to_string())
        }
    }

    fn from_headers(headers: &HeaderMap) -> Option<String> {
        let header = |name: &'static str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        header(X_REAL_IP)
            .or_else(|| header(X_FORWARDED_FOR).and_then(|v| v.split(',').next()).map(str::trim))
            .map(str::to_string)
    }

}
