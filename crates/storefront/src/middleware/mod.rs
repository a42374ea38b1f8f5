//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, performance transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers (CSP, cache policy, isolation)
//! 5. Rate limiting on checkout endpoints (governor)

pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use rate_limit::checkout_rate_limiter;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
