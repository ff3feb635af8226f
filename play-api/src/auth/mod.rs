pub mod middleware;

/// FID pulled out of the `x-user-fid` header by the auth middleware and
/// stashed in request extensions.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedFid(pub i64);
